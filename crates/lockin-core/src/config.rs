#![forbid(unsafe_code)]

//! Configuration snapshot driving each render of the widget.
//!
//! [`WidgetConfig`] is the full set of inputs the widget renders from. It is
//! immutable by convention: the controller never edits fields in place but
//! replaces the stored snapshot with a merged copy.
//!
//! [`ConfigPatch`] is a partial configuration. Merging is a shallow
//! field-level overwrite: every field present in the patch replaces the
//! snapshot's field, every absent field is kept. Optional snapshot fields are
//! `Option<Option<T>>` in the patch so that "clear this field" and "leave this
//! field alone" stay distinguishable.
//!
//! Shared capabilities (api client, toggle callback, storage) are
//! reference-counted handles. Two snapshots compare equal when they point at
//! the same capability instances.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, StorageError};

// ─── Capabilities ────────────────────────────────────────────────────────────

/// Opaque network client handed through to the widget.
///
/// The lifecycle never calls into the client. Renderers downcast through
/// [`as_any`](ApiClient::as_any) to the concrete client they were built for.
pub trait ApiClient: fmt::Debug {
    fn as_any(&self) -> &dyn Any;
}

/// Shared reference to the widget's api client.
pub type ApiHandle = Rc<dyn ApiClient>;

/// Boxed future returned by [`WidgetStorage`] operations.
pub type StorageFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StorageError>> + 'a>>;

/// Asynchronous key/value storage capability exposed to the widget.
pub trait WidgetStorage: fmt::Debug {
    /// Read the value stored under `key`, `None` when nothing is stored.
    fn get(&self, key: &str) -> StorageFuture<'_, Option<Value>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: Value) -> StorageFuture<'_, ()>;

    fn as_any(&self) -> &dyn Any;
}

impl dyn WidgetStorage {
    /// Read and deserialize the value under `key`.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.get(key).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|err| StorageError::Decode {
                    key: key.to_owned(),
                    reason: err.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Serialize `value` and store it under `key`.
    pub async fn set_as<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let value = serde_json::to_value(value)
            .map_err(|err| StorageError::backend("set", key, err.to_string()))?;
        self.set(key, value).await
    }
}

/// Shared reference to the widget's storage capability.
pub type StorageHandle = Rc<dyn WidgetStorage>;

/// Implementation behind a [`ToggleCallback`].
///
/// Backends that receive the callback from a foreign runtime implement this
/// directly so they can recover their own handle through
/// [`ToggleCallback::downcast_ref`] instead of wrapping it again.
pub trait ToggleHandler {
    fn toggle(&self);

    fn as_any(&self) -> &dyn Any;
}

struct FnToggle<F>(F);

impl<F: Fn() + 'static> ToggleHandler for FnToggle<F> {
    fn toggle(&self) {
        (self.0)();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Callback the widget invokes to flip its open/closed state.
#[derive(Clone)]
pub struct ToggleCallback(Rc<dyn ToggleHandler>);

impl ToggleCallback {
    pub fn new(f: impl Fn() + 'static) -> Self {
        Self(Rc::new(FnToggle(f)))
    }

    pub fn from_handler(handler: impl ToggleHandler + 'static) -> Self {
        Self(Rc::new(handler))
    }

    /// A callback that does nothing.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    pub fn invoke(&self) {
        self.0.toggle();
    }

    /// The handler, if it was built by [`from_handler`](Self::from_handler)
    /// with a `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref()
    }

    /// Whether both callbacks are the same instance.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for ToggleCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ToggleCallback")
            .field(&Rc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

// ─── Plain data ──────────────────────────────────────────────────────────────

/// Which feature panel the widget shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetMode {
    #[default]
    Read,
    Chat,
    Notes,
}

impl WidgetMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Chat => "chat",
            Self::Notes => "notes",
        }
    }
}

impl fmt::Display for WidgetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WidgetMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Self::Read),
            "chat" => Ok(Self::Chat),
            "notes" => Ok(Self::Notes),
            other => Err(ConfigError::UnknownMode(other.to_owned())),
        }
    }
}

/// Description of the page the widget was opened on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl PageContext {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            description: None,
            language: None,
        }
    }
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Full configuration the widget renders from.
#[derive(Debug, Clone)]
pub struct WidgetConfig {
    pub api: ApiHandle,
    pub is_open: bool,
    pub on_toggle: ToggleCallback,
    pub mode: WidgetMode,
    pub selected_text: Option<String>,
    pub page_context: Option<PageContext>,
    pub storage: Option<StorageHandle>,
}

impl WidgetConfig {
    /// Closed widget in [`WidgetMode::Read`] with no optional fields set.
    pub fn new(api: ApiHandle, on_toggle: ToggleCallback) -> Self {
        Self {
            api,
            is_open: false,
            on_toggle,
            mode: WidgetMode::default(),
            selected_text: None,
            page_context: None,
            storage: None,
        }
    }

    #[must_use]
    pub fn with_open(mut self, is_open: bool) -> Self {
        self.is_open = is_open;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: WidgetMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_selected_text(mut self, text: impl Into<String>) -> Self {
        self.selected_text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_page_context(mut self, context: PageContext) -> Self {
        self.page_context = Some(context);
        self
    }

    #[must_use]
    pub fn with_storage(mut self, storage: StorageHandle) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Shallow-merge `patch` over this snapshot.
    #[must_use]
    pub fn merge(self, patch: ConfigPatch) -> Self {
        Self {
            api: patch.api.unwrap_or(self.api),
            is_open: patch.is_open.unwrap_or(self.is_open),
            on_toggle: patch.on_toggle.unwrap_or(self.on_toggle),
            mode: patch.mode.unwrap_or(self.mode),
            selected_text: patch.selected_text.unwrap_or(self.selected_text),
            page_context: patch.page_context.unwrap_or(self.page_context),
            storage: patch.storage.unwrap_or(self.storage),
        }
    }
}

impl PartialEq for WidgetConfig {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.api, &other.api)
            && self.is_open == other.is_open
            && ToggleCallback::ptr_eq(&self.on_toggle, &other.on_toggle)
            && self.mode == other.mode
            && self.selected_text == other.selected_text
            && self.page_context == other.page_context
            && match (&self.storage, &other.storage) {
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

// ─── Patch ───────────────────────────────────────────────────────────────────

/// Partial configuration applied by `update_props`.
#[derive(Debug, Clone, Default)]
pub struct ConfigPatch {
    pub api: Option<ApiHandle>,
    pub is_open: Option<bool>,
    pub on_toggle: Option<ToggleCallback>,
    pub mode: Option<WidgetMode>,
    pub selected_text: Option<Option<String>>,
    pub page_context: Option<Option<PageContext>>,
    pub storage: Option<Option<StorageHandle>>,
}

impl ConfigPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the patch carries no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.api.is_none()
            && self.is_open.is_none()
            && self.on_toggle.is_none()
            && self.mode.is_none()
            && self.selected_text.is_none()
            && self.page_context.is_none()
            && self.storage.is_none()
    }

    #[must_use]
    pub fn with_api(mut self, api: ApiHandle) -> Self {
        self.api = Some(api);
        self
    }

    #[must_use]
    pub fn with_open(mut self, is_open: bool) -> Self {
        self.is_open = Some(is_open);
        self
    }

    #[must_use]
    pub fn with_on_toggle(mut self, on_toggle: ToggleCallback) -> Self {
        self.on_toggle = Some(on_toggle);
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: WidgetMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set (`Some`) or clear (`None`) the selected text.
    #[must_use]
    pub fn with_selected_text(mut self, text: Option<String>) -> Self {
        self.selected_text = Some(text);
        self
    }

    /// Set (`Some`) or clear (`None`) the page context.
    #[must_use]
    pub fn with_page_context(mut self, context: Option<PageContext>) -> Self {
        self.page_context = Some(context);
        self
    }

    /// Set (`Some`) or clear (`None`) the storage capability.
    #[must_use]
    pub fn with_storage(mut self, storage: Option<StorageHandle>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Names of the fields this patch carries, in declaration order.
    #[must_use]
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.api.is_some() {
            names.push("apiClient");
        }
        if self.is_open.is_some() {
            names.push("isOpen");
        }
        if self.on_toggle.is_some() {
            names.push("onToggle");
        }
        if self.mode.is_some() {
            names.push("mode");
        }
        if self.selected_text.is_some() {
            names.push("selectedText");
        }
        if self.page_context.is_some() {
            names.push("pageContext");
        }
        if self.storage.is_some() {
            names.push("storage");
        }
        names
    }
}
