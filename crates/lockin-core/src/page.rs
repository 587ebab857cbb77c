#![forbid(unsafe_code)]

//! Host page capability.
//!
//! The controller only needs a handful of node-tree operations from the page
//! it is injected into. Backends implement [`HostPage`] over a real DOM
//! (`lockin-web`) or an in-memory tree (`lockin-harness`).

use std::fmt;

use crate::error::PageError;

/// Node-tree operations the lifecycle relies on.
///
/// `Node` is a reference to a page node. Cloning must be cheap and equality
/// must be identity: two references compare equal only when they point at the
/// same node.
pub trait HostPage {
    type Node: Clone + PartialEq + fmt::Debug;

    /// Create a detached element carrying `id`.
    fn create_container(&self, id: &str) -> Result<Self::Node, PageError>;

    /// Insert `node` as the last child of the page body.
    fn append_to_body(&self, node: &Self::Node) -> Result<(), PageError>;

    /// Whether `node` is currently a descendant of the page's root node.
    fn contains(&self, node: &Self::Node) -> bool;

    /// Detach `node` from its parent. Detaching a detached node is not an error.
    fn remove(&self, node: &Self::Node) -> Result<(), PageError>;

    /// First attached element carrying `id`, if any.
    fn find_by_id(&self, id: &str) -> Option<Self::Node>;
}
