#![forbid(unsafe_code)]

//! Renderer that records every root creation, render and unmount.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use lockin_core::{RenderError, RenderRoot, Renderer, WidgetConfig};

use crate::page::NodeId;

/// Identifier of a root created by a [`RecordingRenderer`], in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RootId(pub usize);

/// One recorded renderer call.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    RootCreated { root: RootId, container: NodeId },
    Rendered { root: RootId, config: WidgetConfig },
    Unmounted { root: RootId },
}

/// Shared, append-only record of renderer calls.
#[derive(Debug, Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<RenderEvent>>>);

impl Journal {
    fn push(&self, event: RenderEvent) {
        self.0.borrow_mut().push(event);
    }

    #[must_use]
    pub fn events(&self) -> Vec<RenderEvent> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    /// Configs rendered so far, with the root each went to.
    #[must_use]
    pub fn renders(&self) -> Vec<(RootId, WidgetConfig)> {
        self.0
            .borrow()
            .iter()
            .filter_map(|event| match event {
                RenderEvent::Rendered { root, config } => Some((*root, config.clone())),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn last_render(&self) -> Option<(RootId, WidgetConfig)> {
        self.renders().pop()
    }

    #[must_use]
    pub fn render_count(&self) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|event| matches!(event, RenderEvent::Rendered { .. }))
            .count()
    }

    /// Roots created and not yet unmounted.
    #[must_use]
    pub fn live_roots(&self) -> Vec<RootId> {
        let mut live = Vec::new();
        for event in self.0.borrow().iter() {
            match event {
                RenderEvent::RootCreated { root, .. } => live.push(*root),
                RenderEvent::Unmounted { root } => live.retain(|r| r != root),
                RenderEvent::Rendered { .. } => {}
            }
        }
        live
    }

    /// Container each root was bound to.
    #[must_use]
    pub fn container_of(&self, root: RootId) -> Option<NodeId> {
        self.0.borrow().iter().find_map(|event| match event {
            RenderEvent::RootCreated { root: r, container } if *r == root => Some(*container),
            _ => None,
        })
    }

    /// Number of times `root` was unmounted.
    #[must_use]
    pub fn unmount_count(&self, root: RootId) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|event| matches!(event, RenderEvent::Unmounted { root: r } if *r == root))
            .count()
    }
}

type HookFn = Rc<dyn Fn(&WidgetConfig)>;

/// Callback run by every root after it records a render, standing in for
/// component code (effects, event handlers) that reacts to new props.
#[derive(Clone, Default)]
struct RenderHook(Rc<RefCell<Option<HookFn>>>);

impl RenderHook {
    fn run(&self, config: &WidgetConfig) {
        // Released before the call so the hook may replace itself.
        let hook = self.0.borrow().clone();
        if let Some(hook) = hook {
            hook(config);
        }
    }
}

impl fmt::Debug for RenderHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RenderHook")
            .field(&self.0.borrow().is_some())
            .finish()
    }
}

/// [`Renderer`] over [`MemoryPage`](crate::MemoryPage) nodes that writes
/// every call to a [`Journal`].
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    journal: Journal,
    next_root: Cell<usize>,
    fail_next: Cell<bool>,
    hook: RenderHook,
}

impl RecordingRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle on the journal that stays valid after the renderer is moved.
    #[must_use]
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// Make the next `create_root` call fail.
    pub fn fail_next_root(&self) {
        self.fail_next.set(true);
    }

    /// Run `hook` from inside every subsequent render, on every root.
    pub fn on_render(&self, hook: impl Fn(&WidgetConfig) + 'static) {
        *self.hook.0.borrow_mut() = Some(Rc::new(hook));
    }

    /// Remove the render hook.
    pub fn clear_hook(&self) {
        self.hook.0.borrow_mut().take();
    }
}

impl Renderer for RecordingRenderer {
    type Node = NodeId;
    type Root = RecordingRoot;

    fn create_root(&self, container: &NodeId) -> Result<RecordingRoot, RenderError> {
        if self.fail_next.replace(false) {
            return Err(RenderError::RootCreation {
                reason: "injected fault".into(),
            });
        }
        let root = RootId(self.next_root.get());
        self.next_root.set(root.0 + 1);
        self.journal.push(RenderEvent::RootCreated {
            root,
            container: *container,
        });
        Ok(RecordingRoot {
            id: root,
            journal: self.journal.clone(),
            hook: self.hook.clone(),
        })
    }
}

/// Root handed out by [`RecordingRenderer`].
#[derive(Debug)]
pub struct RecordingRoot {
    id: RootId,
    journal: Journal,
    hook: RenderHook,
}

impl RecordingRoot {
    #[must_use]
    pub fn id(&self) -> RootId {
        self.id
    }
}

impl RenderRoot for RecordingRoot {
    fn render(&mut self, config: &WidgetConfig) {
        self.journal.push(RenderEvent::Rendered {
            root: self.id,
            config: config.clone(),
        });
        self.hook.run(config);
    }

    fn unmount(&mut self) {
        self.journal.push(RenderEvent::Unmounted { root: self.id });
    }
}
