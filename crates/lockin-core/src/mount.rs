#![forbid(unsafe_code)]

//! One-off mounting of the widget into a caller-owned container.
//!
//! [`attach`] always creates a fresh rendering root for the given container
//! and performs the initial render. It does not look at prior calls: attaching
//! twice to the same container produces two roots, and keeping that from
//! happening is the caller's job.
//!
//! The returned [`MountHandle`] owns the root. Disposing it (explicitly or by
//! dropping the handle) unmounts the root but never touches the container
//! node, whose place in the page stays the caller's responsibility.

use std::fmt;

use tracing::debug;

use crate::config::WidgetConfig;
use crate::error::{RenderError, Result};
use crate::render::{RenderRoot, Renderer};

/// Create a rendering root bound to `container` without rendering into it.
pub fn bind_root<R: Renderer>(
    renderer: &R,
    container: &R::Node,
) -> std::result::Result<R::Root, RenderError> {
    let root = renderer.create_root(container)?;
    debug!("rendering root bound");
    Ok(root)
}

/// Mount the widget into `container` and render it once with `config`.
pub fn attach<R>(
    renderer: &R,
    container: &R::Node,
    config: &WidgetConfig,
) -> Result<MountHandle<R>>
where
    R: Renderer,
    R::Node: Clone,
{
    let mut root = bind_root(renderer, container)?;
    root.render(config);
    debug!(mode = %config.mode, is_open = config.is_open, "widget attached");
    Ok(MountHandle {
        container: container.clone(),
        root: Some(root),
    })
}

/// Container reference plus the root mounted into it.
///
/// Dropping the handle disposes it.
pub struct MountHandle<R: Renderer> {
    container: R::Node,
    root: Option<R::Root>,
}

impl<R: Renderer> MountHandle<R> {
    /// The container the root is bound to.
    #[must_use]
    pub fn container(&self) -> &R::Node {
        &self.container
    }

    /// Re-render the mounted root with a new snapshot.
    pub fn render(&mut self, config: &WidgetConfig) {
        if let Some(root) = self.root.as_mut() {
            root.render(config);
        }
    }

    /// Unmount the root. The container stays in the page.
    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut root) = self.root.take() {
            root.unmount();
            debug!("widget detached from one-off mount");
        }
    }
}

impl<R: Renderer> Drop for MountHandle<R> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<R> fmt::Debug for MountHandle<R>
where
    R: Renderer,
    R::Node: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountHandle")
            .field("container", &self.container)
            .field("mounted", &self.root.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiClient, ToggleCallback, WidgetMode};
    use std::any::Any;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug)]
    struct NullClient;

    impl ApiClient for NullClient {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Create(u32),
        Render(u32, WidgetMode),
        Unmount(u32),
    }

    #[derive(Default)]
    struct Log(Rc<RefCell<Vec<Call>>>);

    struct LogRoot {
        container: u32,
        calls: Rc<RefCell<Vec<Call>>>,
    }

    impl RenderRoot for LogRoot {
        fn render(&mut self, config: &WidgetConfig) {
            self.calls
                .borrow_mut()
                .push(Call::Render(self.container, config.mode));
        }

        fn unmount(&mut self) {
            self.calls.borrow_mut().push(Call::Unmount(self.container));
        }
    }

    impl Renderer for Log {
        type Node = u32;
        type Root = LogRoot;

        fn create_root(&self, container: &u32) -> std::result::Result<LogRoot, RenderError> {
            if *container == 0 {
                return Err(RenderError::RootCreation {
                    reason: "container 0 is reserved".into(),
                });
            }
            self.0.borrow_mut().push(Call::Create(*container));
            Ok(LogRoot {
                container: *container,
                calls: Rc::clone(&self.0),
            })
        }
    }

    fn config() -> WidgetConfig {
        WidgetConfig::new(Rc::new(NullClient), ToggleCallback::noop())
    }

    #[test]
    fn attach_creates_root_and_renders_once() {
        let log = Log::default();
        let handle = attach(&log, &7, &config()).unwrap();
        assert_eq!(*handle.container(), 7);
        assert_eq!(
            *log.0.borrow(),
            vec![Call::Create(7), Call::Render(7, WidgetMode::Read)]
        );
        handle.dispose();
        assert_eq!(log.0.borrow().last(), Some(&Call::Unmount(7)));
    }

    #[test]
    fn handle_rerenders_with_new_snapshot() {
        let log = Log::default();
        let mut handle = attach(&log, &3, &config()).unwrap();
        handle.render(&config().with_mode(WidgetMode::Notes));
        assert_eq!(
            log.0.borrow().last(),
            Some(&Call::Render(3, WidgetMode::Notes))
        );
    }

    #[test]
    fn drop_disposes_exactly_once() {
        let log = Log::default();
        {
            let _handle = attach(&log, &1, &config()).unwrap();
        }
        let unmounts = log
            .0
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::Unmount(_)))
            .count();
        assert_eq!(unmounts, 1);
    }

    #[test]
    fn attaching_twice_creates_two_roots() {
        let log = Log::default();
        let first = attach(&log, &5, &config()).unwrap();
        let second = attach(&log, &5, &config()).unwrap();
        let creates = log
            .0
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::Create(5)))
            .count();
        assert_eq!(creates, 2);
        drop(first);
        drop(second);
    }

    #[test]
    fn root_creation_failure_is_reported() {
        let log = Log::default();
        let err = attach(&log, &0, &config()).unwrap_err();
        assert!(err.to_string().contains("reserved"));
        assert!(log.0.borrow().is_empty());
    }
}
