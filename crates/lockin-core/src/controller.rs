#![forbid(unsafe_code)]

//! Singleton lifecycle controller.
//!
//! A [`WidgetController`] owns at most one container node, one rendering root
//! and one configuration snapshot at a time. It is constructed once per
//! execution context and shared by cloning; every clone and every
//! [`WidgetHandle`] it returns act on the same state.
//!
//! # State machine
//!
//! ```text
//! Absent --create--> Live
//! Live   --create (container detached)--> Live   (new container and root, full replace)
//! Live   --create--> Live                         (same container and root, full replace)
//! Live   --update_props--> Live                   (same container and root, merged snapshot)
//! Live   --unmount--> Absent
//! Absent --unmount--> Absent                      (no-op)
//! ```
//!
//! # Invariants
//!
//! 1. At most one container carrying the configured identifier is attached
//!    after any sequence of `create` calls.
//! 2. Every render uses the full current snapshot.
//! 3. Within one epoch `update_props` calls are applied in call order, each on
//!    top of the previous merge.
//! 4. `unmount` leaves no attached container and no live root behind.
//!
//! # Failure Modes
//!
//! - **Container removed by the host page**: detected on the next `create`,
//!   which rebuilds instead of reporting an error.
//! - **Backend refuses an operation during rebuild**: `create` returns the
//!   error and the controller is left Absent, with any half-built container
//!   removed again.
//! - **Contract misuse** (`update_props` with nothing mounted): silently
//!   ignored, reported through [`UpdateOutcome::NoRoot`] and a debug event.
//!
//! Shared state lives in an `Rc<RefCell<..>>`. It is never borrowed while a
//! root renders, unmounts or is created, so the widget may call back into the
//! controller from any of those. Snapshot changes made during a render are
//! rendered by the outermost render loop right after it returns.

use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::config::{ConfigPatch, WidgetConfig};
use crate::error::Result;
use crate::mount::bind_root;
use crate::page::HostPage;
use crate::render::{RenderRoot, Renderer};

/// Identifier given to the singleton container node.
///
/// External styling targets it, and a newer build must find containers left
/// by an older one, so this value never changes.
pub const CONTAINER_ID: &str = "lockin-root";

// ─── Options ─────────────────────────────────────────────────────────────────

/// Construction-time settings for a [`WidgetController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerOptions {
    container_id: Cow<'static, str>,
    sweep_orphans: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            container_id: Cow::Borrowed(CONTAINER_ID),
            sweep_orphans: true,
        }
    }
}

impl ControllerOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different container identifier. Intended for tests and embedders
    /// running more than one independent controller on a page.
    #[must_use]
    pub fn with_container_id(mut self, id: impl Into<Cow<'static, str>>) -> Self {
        self.container_id = id.into();
        self
    }

    /// Remove containers carrying our identifier that this controller did not
    /// create (leftovers of a previous script instance) before inserting a new
    /// one. On by default.
    #[must_use]
    pub fn with_sweep_orphans(mut self, sweep: bool) -> Self {
        self.sweep_orphans = sweep;
        self
    }

    #[must_use]
    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    #[must_use]
    pub fn sweep_orphans(&self) -> bool {
        self.sweep_orphans
    }
}

/// Result of [`WidgetHandle::update_props`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The patch was merged and the root re-rendered.
    Applied,
    /// Nothing is mounted; the patch was dropped.
    NoRoot,
}

impl UpdateOutcome {
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

// ─── Shared state ────────────────────────────────────────────────────────────

struct ControllerState<N, Root> {
    container: Option<N>,
    root: Option<Root>,
    config: Option<WidgetConfig>,
    /// Number of container/root pairs built so far.
    epoch: u64,
    /// Number of renders issued through the singleton root.
    renders: u64,
    /// Epoch of the root currently lent out to a `render` call. Cleared when
    /// the root is torn down or replaced while lent; the render loop then
    /// unmounts it instead of putting it back.
    lent: Option<u64>,
    /// A render loop is running further up the stack.
    rendering: bool,
    /// The snapshot changed while a render was running.
    pending: bool,
}

impl<N, Root> ControllerState<N, Root> {
    fn empty() -> Self {
        Self {
            container: None,
            root: None,
            config: None,
            epoch: 0,
            renders: 0,
            lent: None,
            rendering: false,
            pending: false,
        }
    }

    fn mounted(&self) -> bool {
        self.root.is_some() || self.lent.is_some()
    }
}

struct Shared<P: HostPage, R: Renderer<Node = P::Node>> {
    page: P,
    renderer: R,
    options: ControllerOptions,
    state: RefCell<ControllerState<P::Node, R::Root>>,
}

impl<P, R> Shared<P, R>
where
    P: HostPage,
    R: Renderer<Node = P::Node>,
{
    /// Return the live container, rebuilding the container/root pair when
    /// either is missing or the container left the page.
    fn ensure_live(&self) -> Result<P::Node> {
        let (stale_root, stale_container) = {
            let mut state = self.state.borrow_mut();
            if let Some(container) = &state.container {
                if state.mounted() {
                    if self.page.contains(container) {
                        debug!(epoch = state.epoch, "reusing live widget container");
                        return Ok(container.clone());
                    }
                    warn!(
                        container_id = self.options.container_id(),
                        epoch = state.epoch,
                        "widget container was detached by the page; rebuilding"
                    );
                }
            }
            // A lent root is released by the render loop that holds it.
            state.lent = None;
            state.config = None;
            (state.root.take(), state.container.take())
        };

        // The previous root, if any, is bound to a node that is gone.
        if let Some(mut stale) = stale_root {
            stale.unmount();
        }
        if let Some(stale) = stale_container {
            self.detach(&stale);
        }
        self.build()
    }

    fn build(&self) -> Result<P::Node> {
        if self.options.sweep_orphans() {
            self.sweep_orphans()?;
        }

        let id = self.options.container_id();
        let container = self.page.create_container(id)?;
        self.page.append_to_body(&container)?;

        let mut root = match bind_root(&self.renderer, &container) {
            Ok(root) => root,
            Err(err) => {
                warn!(container_id = id, %err, "rendering root creation failed; removing container");
                self.detach(&container);
                return Err(err.into());
            }
        };

        let mut state = self.state.borrow_mut();
        if let Some(existing) = state.container.clone() {
            // The root factory re-entered `create` and that call built first.
            drop(state);
            debug!(container_id = id, "discarding container superseded by a nested create");
            root.unmount();
            self.detach(&container);
            return Ok(existing);
        }
        state.container = Some(container.clone());
        state.root = Some(root);
        state.epoch += 1;
        debug!(container_id = id, epoch = state.epoch, "widget container created");
        Ok(container)
    }

    fn sweep_orphans(&self) -> Result<()> {
        let id = self.options.container_id();
        while let Some(orphan) = self.page.find_by_id(id) {
            warn!(container_id = id, "removing orphaned widget container");
            self.page.remove(&orphan)?;
            if self.page.contains(&orphan) {
                warn!(container_id = id, "orphaned widget container survived removal");
                break;
            }
        }
        Ok(())
    }

    /// Remove `node` from the page when it is still attached. Failures are
    /// logged, never surfaced.
    fn detach(&self, node: &P::Node) -> bool {
        if !self.page.contains(node) {
            return false;
        }
        match self.page.remove(node) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "failed to remove widget container");
                false
            }
        }
    }

    /// Render the stored snapshot into the root until no further change
    /// arrives. The state is not borrowed while the root runs, so a root may
    /// call back into the controller; a nested call only marks the snapshot
    /// pending and the outermost loop renders it.
    fn flush(&self) {
        let mut state = self.state.borrow_mut();
        if state.rendering {
            state.pending = true;
            return;
        }
        state.rendering = true;

        loop {
            state.pending = false;
            let Some(config) = state.config.clone() else {
                break;
            };
            let Some(mut root) = state.root.take() else {
                break;
            };
            let epoch = state.epoch;
            state.lent = Some(epoch);
            drop(state);

            root.render(&config);

            state = self.state.borrow_mut();
            state.renders += 1;
            if state.lent == Some(epoch) {
                state.lent = None;
                state.root = Some(root);
            } else {
                drop(state);
                debug!(epoch, "root released during its own render");
                root.unmount();
                state = self.state.borrow_mut();
            }
            if !state.pending {
                break;
            }
        }
        state.rendering = false;
    }

    fn update(&self, patch: ConfigPatch) -> UpdateOutcome {
        {
            let mut state = self.state.borrow_mut();
            if !state.mounted() {
                debug!(fields = ?patch.field_names(), "update_props ignored: widget is not mounted");
                return UpdateOutcome::NoRoot;
            }
            // A mounted root always has a snapshot; `create` stores one before rendering.
            let Some(current) = state.config.take() else {
                return UpdateOutcome::NoRoot;
            };
            let fields = patch.field_names();
            state.config = Some(current.merge(patch));
            debug!(?fields, epoch = state.epoch, "widget props updated");
        }
        self.flush();
        UpdateOutcome::Applied
    }

    fn teardown(&self) -> bool {
        let (root, container, was_lent, epoch) = {
            let mut state = self.state.borrow_mut();
            state.config = None;
            (
                state.root.take(),
                state.container.take(),
                state.lent.take().is_some(),
                state.epoch,
            )
        };

        let mut released = was_lent;
        if let Some(mut root) = root {
            root.unmount();
            released = true;
        }
        if let Some(container) = container {
            released |= self.detach(&container);
        }

        if released {
            debug!(epoch, "widget unmounted");
        }
        released
    }
}

// ─── Controller ──────────────────────────────────────────────────────────────

/// Process-wide owner of the single widget instance.
///
/// Cloning a `WidgetController` creates a new handle to the **same** state.
pub struct WidgetController<P: HostPage, R: Renderer<Node = P::Node>> {
    shared: Rc<Shared<P, R>>,
}

impl<P, R> Clone for WidgetController<P, R>
where
    P: HostPage,
    R: Renderer<Node = P::Node>,
{
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<P, R> fmt::Debug for WidgetController<P, R>
where
    P: HostPage,
    R: Renderer<Node = P::Node>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("WidgetController")
            .field("options", &self.shared.options)
            .field("container", &state.container)
            .field("mounted", &state.mounted())
            .field("epoch", &state.epoch)
            .field("renders", &state.renders)
            .finish()
    }
}

impl<P, R> WidgetController<P, R>
where
    P: HostPage,
    R: Renderer<Node = P::Node>,
{
    pub fn new(page: P, renderer: R) -> Self {
        Self::with_options(page, renderer, ControllerOptions::default())
    }

    pub fn with_options(page: P, renderer: R, options: ControllerOptions) -> Self {
        Self {
            shared: Rc::new(Shared {
                page,
                renderer,
                options,
                state: RefCell::new(ControllerState::empty()),
            }),
        }
    }

    /// Mount the widget, or re-render the live one, with `config`.
    ///
    /// Reuses the current container and root while the container is still
    /// attached to the page; otherwise builds a fresh pair. The stored
    /// snapshot is replaced by `config` in full, never merged.
    pub fn create(&self, config: WidgetConfig) -> Result<WidgetHandle<P, R>> {
        let container = self.shared.ensure_live()?;
        {
            let mut state = self.shared.state.borrow_mut();
            debug!(
                mode = %config.mode,
                is_open = config.is_open,
                epoch = state.epoch,
                "widget rendered"
            );
            state.config = Some(config);
        }
        self.shared.flush();

        Ok(WidgetHandle {
            shared: Rc::clone(&self.shared),
            container,
        })
    }

    /// Whether a root is mounted into a container that is still attached.
    #[must_use]
    pub fn is_live(&self) -> bool {
        let state = self.shared.state.borrow();
        match &state.container {
            Some(container) if state.mounted() => self.shared.page.contains(container),
            _ => false,
        }
    }

    /// The container currently held, attached or not.
    #[must_use]
    pub fn container(&self) -> Option<P::Node> {
        self.shared.state.borrow().container.clone()
    }

    /// Copy of the snapshot the widget was last rendered with.
    #[must_use]
    pub fn snapshot(&self) -> Option<WidgetConfig> {
        self.shared.state.borrow().config.clone()
    }

    /// Number of container/root pairs built over the controller's lifetime.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.shared.state.borrow().epoch
    }

    /// Number of renders issued through the singleton root.
    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.shared.state.borrow().renders
    }

    #[must_use]
    pub fn options(&self) -> &ControllerOptions {
        &self.shared.options
    }

    #[must_use]
    pub fn page(&self) -> &P {
        &self.shared.page
    }

    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.shared.renderer
    }
}

// ─── Handle ──────────────────────────────────────────────────────────────────

/// Returned by [`WidgetController::create`].
///
/// Every handle acts on the controller's live state: unmounting through an
/// old handle tears down the current widget, even if it was rebuilt since.
pub struct WidgetHandle<P: HostPage, R: Renderer<Node = P::Node>> {
    shared: Rc<Shared<P, R>>,
    container: P::Node,
}

impl<P, R> Clone for WidgetHandle<P, R>
where
    P: HostPage,
    R: Renderer<Node = P::Node>,
{
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
            container: self.container.clone(),
        }
    }
}

impl<P, R> fmt::Debug for WidgetHandle<P, R>
where
    P: HostPage,
    R: Renderer<Node = P::Node>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetHandle")
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}

impl<P, R> WidgetHandle<P, R>
where
    P: HostPage,
    R: Renderer<Node = P::Node>,
{
    /// Container the widget was mounted into when this handle was created.
    #[must_use]
    pub fn container(&self) -> &P::Node {
        &self.container
    }

    /// Whether this handle's container is still the controller's live one.
    #[must_use]
    pub fn is_current(&self) -> bool {
        let state = self.shared.state.borrow();
        state.mounted() && state.container.as_ref() == Some(&self.container)
    }

    /// Shallow-merge `patch` over the current snapshot and re-render.
    ///
    /// Does nothing when no root is mounted. Called from inside a render, the
    /// patch is merged immediately and rendered once that render returns.
    pub fn update_props(&self, patch: ConfigPatch) -> UpdateOutcome {
        self.shared.update(patch)
    }

    /// Unmount the root, remove the container and clear the snapshot.
    ///
    /// Returns whether anything was torn down. Calling it again is a no-op.
    pub fn unmount(&self) -> bool {
        self.shared.teardown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiClient, ToggleCallback, WidgetMode};
    use crate::error::{PageError, RenderError};
    use pretty_assertions::assert_eq;
    use std::any::Any;
    use std::cell::Cell;

    #[derive(Debug)]
    struct NullClient;

    impl ApiClient for NullClient {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Page of numbered nodes; `attached` lists body children in order.
    #[derive(Default)]
    struct FlatPage {
        next: Cell<u32>,
        attached: RefCell<Vec<(u32, String)>>,
        fail_append: Cell<bool>,
    }

    impl HostPage for FlatPage {
        type Node = u32;

        fn create_container(&self, _id: &str) -> std::result::Result<u32, PageError> {
            self.next.set(self.next.get() + 1);
            Ok(self.next.get())
        }

        fn append_to_body(&self, node: &u32) -> std::result::Result<(), PageError> {
            if self.fail_append.get() {
                return Err(PageError::InsertFailed {
                    reason: "body is frozen".into(),
                });
            }
            self.attached.borrow_mut().push((*node, CONTAINER_ID.to_owned()));
            Ok(())
        }

        fn contains(&self, node: &u32) -> bool {
            self.attached.borrow().iter().any(|(n, _)| n == node)
        }

        fn remove(&self, node: &u32) -> std::result::Result<(), PageError> {
            self.attached.borrow_mut().retain(|(n, _)| n != node);
            Ok(())
        }

        fn find_by_id(&self, id: &str) -> Option<u32> {
            self.attached
                .borrow()
                .iter()
                .find(|(_, node_id)| node_id == id)
                .map(|(n, _)| *n)
        }
    }

    #[derive(Default)]
    struct Modes {
        rendered: Rc<RefCell<Vec<(u32, bool, WidgetMode)>>>,
        unmounted: Rc<RefCell<Vec<u32>>>,
        fail: Cell<bool>,
    }

    struct ModesRoot {
        node: u32,
        rendered: Rc<RefCell<Vec<(u32, bool, WidgetMode)>>>,
        unmounted: Rc<RefCell<Vec<u32>>>,
    }

    impl RenderRoot for ModesRoot {
        fn render(&mut self, config: &WidgetConfig) {
            self.rendered
                .borrow_mut()
                .push((self.node, config.is_open, config.mode));
        }

        fn unmount(&mut self) {
            self.unmounted.borrow_mut().push(self.node);
        }
    }

    impl Renderer for Modes {
        type Node = u32;
        type Root = ModesRoot;

        fn create_root(&self, node: &u32) -> std::result::Result<ModesRoot, RenderError> {
            if self.fail.get() {
                return Err(RenderError::RootCreation {
                    reason: "no renderer".into(),
                });
            }
            Ok(ModesRoot {
                node: *node,
                rendered: Rc::clone(&self.rendered),
                unmounted: Rc::clone(&self.unmounted),
            })
        }
    }

    fn config() -> WidgetConfig {
        WidgetConfig::new(Rc::new(NullClient), ToggleCallback::noop())
    }

    fn controller() -> WidgetController<FlatPage, Modes> {
        WidgetController::new(FlatPage::default(), Modes::default())
    }

    #[test]
    fn create_then_update_then_unmount() {
        let ctl = controller();
        let handle = ctl.create(config().with_mode(WidgetMode::Read)).unwrap();
        assert!(ctl.is_live());
        assert_eq!(ctl.epoch(), 1);

        assert_eq!(
            handle.update_props(ConfigPatch::new().with_open(true)),
            UpdateOutcome::Applied
        );
        assert_eq!(
            ctl.shared.renderer.rendered.borrow().last(),
            Some(&(1, true, WidgetMode::Read))
        );

        assert!(handle.unmount());
        assert!(!ctl.is_live());
        assert!(ctl.page().attached.borrow().is_empty());
        assert_eq!(*ctl.shared.renderer.unmounted.borrow(), vec![1]);
        assert_eq!(
            handle.update_props(ConfigPatch::new().with_open(false)),
            UpdateOutcome::NoRoot
        );
        assert!(!handle.unmount());
    }

    #[test]
    fn repeated_create_reuses_container_and_replaces_snapshot() {
        let ctl = controller();
        let first = ctl.create(config().with_open(true)).unwrap();
        let replacement = config().with_mode(WidgetMode::Chat);
        let second = ctl.create(replacement.clone()).unwrap();

        assert_eq!(first.container(), second.container());
        assert_eq!(ctl.epoch(), 1);
        assert_eq!(ctl.snapshot(), Some(replacement));
        assert_eq!(
            *ctl.shared.renderer.rendered.borrow(),
            vec![(1, true, WidgetMode::Read), (1, false, WidgetMode::Chat)]
        );
    }

    #[test]
    fn detached_container_is_rebuilt() {
        let ctl = controller();
        let first = ctl.create(config()).unwrap();
        ctl.page().remove(first.container()).unwrap();
        assert!(!ctl.is_live());

        let second = ctl.create(config().with_mode(WidgetMode::Notes)).unwrap();
        assert_ne!(first.container(), second.container());
        assert!(ctl.is_live());
        assert_eq!(ctl.epoch(), 2);
        assert!(!first.is_current());
        assert!(second.is_current());
        // The stale root is released when its container is replaced.
        assert_eq!(*ctl.shared.renderer.unmounted.borrow(), vec![1]);
    }

    #[test]
    fn old_handle_unmounts_live_widget() {
        let ctl = controller();
        let first = ctl.create(config()).unwrap();
        ctl.page().remove(first.container()).unwrap();
        let _second = ctl.create(config()).unwrap();

        assert!(first.unmount());
        assert!(ctl.page().attached.borrow().is_empty());
        assert_eq!(ctl.container(), None);
    }

    #[test]
    fn append_failure_leaves_controller_absent() {
        let ctl = controller();
        ctl.page().fail_append.set(true);
        let err = ctl.create(config()).unwrap_err();
        assert!(err.to_string().contains("frozen"));
        assert!(!ctl.is_live());
        assert_eq!(ctl.snapshot(), None);

        ctl.page().fail_append.set(false);
        assert!(ctl.create(config()).is_ok());
        assert!(ctl.is_live());
    }

    #[test]
    fn root_failure_removes_inserted_container() {
        let ctl = controller();
        ctl.shared.renderer.fail.set(true);
        assert!(ctl.create(config()).is_err());
        assert!(ctl.page().attached.borrow().is_empty());
        assert_eq!(ctl.epoch(), 0);
    }

    #[test]
    fn clones_share_state() {
        let ctl = controller();
        let other = ctl.clone();
        let _handle = ctl.create(config()).unwrap();
        assert!(other.is_live());
        assert_eq!(other.render_count(), 1);
    }

    #[test]
    fn options_builder() {
        let opts = ControllerOptions::new()
            .with_container_id("lockin-test")
            .with_sweep_orphans(false);
        assert_eq!(opts.container_id(), "lockin-test");
        assert!(!opts.sweep_orphans());
        assert_eq!(ControllerOptions::default().container_id(), CONTAINER_ID);
    }
}
