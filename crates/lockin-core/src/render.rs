#![forbid(unsafe_code)]

//! Rendering capability.
//!
//! A [`Renderer`] binds the widget component to container nodes. Each binding
//! is a [`RenderRoot`]: it can be re-rendered with a new snapshot any number
//! of times and is torn down with [`RenderRoot::unmount`].

use crate::config::WidgetConfig;
use crate::error::RenderError;

/// Live binding between a container node and a rendered widget tree.
pub trait RenderRoot {
    /// Render the widget with `config`. Re-rendering with a new snapshot needs
    /// no cleanup in between. May be scheduled rather than synchronous.
    ///
    /// May call back into the controller that owns the root. Snapshot changes
    /// made that way are rendered after this call returns.
    fn render(&mut self, config: &WidgetConfig);

    /// Release the rendered tree and every resource it holds. The container
    /// node itself stays where it is.
    fn unmount(&mut self);
}

/// Factory for rendering roots.
pub trait Renderer {
    type Node;
    type Root: RenderRoot;

    /// Create a fresh root bound to `container`. Nothing is rendered yet.
    fn create_root(&self, container: &Self::Node) -> Result<Self::Root, RenderError>;
}
