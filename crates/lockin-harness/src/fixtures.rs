#![forbid(unsafe_code)]

//! Capability doubles and ready-made snapshots.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use lockin_core::{
    ApiClient, ApiHandle, StorageError, StorageFuture, StorageHandle, ToggleCallback, WidgetConfig,
    WidgetStorage,
};
use serde_json::Value;

/// Api client that only carries a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeApi {
    pub base_url: String,
}

impl FakeApi {
    pub fn handle(base_url: impl Into<String>) -> ApiHandle {
        Rc::new(Self {
            base_url: base_url.into(),
        })
    }
}

impl ApiClient for FakeApi {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Key/value storage held in memory. Futures resolve immediately.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<BTreeMap<String, Value>>,
    reject_writes: Cell<bool>,
}

impl MemoryStorage {
    #[must_use]
    pub fn handle() -> StorageHandle {
        Rc::new(Self::default())
    }

    /// Make every subsequent `set` fail.
    pub fn reject_writes(&self) {
        self.reject_writes.set(true);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl WidgetStorage for MemoryStorage {
    fn get(&self, key: &str) -> StorageFuture<'_, Option<Value>> {
        let value = self.entries.borrow().get(key).cloned();
        Box::pin(async move { Ok(value) })
    }

    fn set(&self, key: &str, value: Value) -> StorageFuture<'_, ()> {
        let key = key.to_owned();
        Box::pin(async move {
            if self.reject_writes.get() {
                return Err(StorageError::backend("set", key, "writes rejected"));
            }
            self.entries.borrow_mut().insert(key, value);
            Ok(())
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Toggle callback counting its invocations.
#[must_use]
pub fn counting_toggle() -> (ToggleCallback, Rc<Cell<u32>>) {
    let hits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&hits);
    let toggle = ToggleCallback::new(move || counter.set(counter.get() + 1));
    (toggle, hits)
}

/// Closed, read-mode snapshot with a fake client and a no-op toggle.
#[must_use]
pub fn widget_config() -> WidgetConfig {
    WidgetConfig::new(
        FakeApi::handle("https://api.lockin.test"),
        ToggleCallback::noop(),
    )
}
