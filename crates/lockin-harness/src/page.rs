#![forbid(unsafe_code)]

//! In-memory host page.
//!
//! [`MemoryPage`] is an arena node tree with a document root and a body. Node
//! references are arena indices, so equality is identity. Removed nodes stay
//! in the arena (detached) exactly like DOM nodes a script still references.
//!
//! Host-page behaviour the lifecycle must survive is scripted through
//! [`MemoryPage::wipe_body`] (a full-page re-render by the host) and
//! [`MemoryPage::insert_element`] (markup left behind by someone else).

use std::cell::{Cell, RefCell};
use std::fmt;

use lockin_core::{HostPage, PageError};

/// Reference to a node in a [`MemoryPage`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    id: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Which page operation should fail next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFault {
    Create,
    Append,
    Remove,
}

/// Arena-backed page used in place of a browser DOM.
pub struct MemoryPage {
    nodes: RefCell<Vec<NodeData>>,
    fault: Cell<Option<PageFault>>,
}

const ROOT: NodeId = NodeId(0);
const BODY: NodeId = NodeId(1);

impl Default for MemoryPage {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPage")
            .field("nodes", &self.nodes.borrow().len())
            .field("body_children", &self.children(BODY))
            .finish()
    }
}

impl MemoryPage {
    /// Page with an `html` root and an empty `body`.
    #[must_use]
    pub fn new() -> Self {
        let nodes = vec![
            NodeData {
                tag: "html".into(),
                id: None,
                parent: None,
                children: vec![BODY],
            },
            NodeData {
                tag: "body".into(),
                id: None,
                parent: Some(ROOT),
                children: Vec::new(),
            },
        ];
        Self {
            nodes: RefCell::new(nodes),
            fault: Cell::new(None),
        }
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        ROOT
    }

    #[must_use]
    pub fn body(&self) -> NodeId {
        BODY
    }

    /// Make the next matching operation fail. The fault is consumed.
    pub fn inject_fault(&self, fault: PageFault) {
        self.fault.set(Some(fault));
    }

    fn take_fault(&self, op: PageFault) -> bool {
        if self.fault.get() == Some(op) {
            self.fault.set(None);
            true
        } else {
            false
        }
    }

    fn new_node(&self, tag: &str, id: Option<&str>) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(NodeData {
            tag: tag.to_owned(),
            id: id.map(str::to_owned),
            parent: None,
            children: Vec::new(),
        });
        NodeId(nodes.len() - 1)
    }

    /// Create an element and append it to `parent`, the way host-page markup
    /// or another script instance would.
    pub fn insert_element(&self, parent: NodeId, tag: &str, id: Option<&str>) -> NodeId {
        let node = self.new_node(tag, id);
        self.append_child(parent, node);
        node
    }

    /// Move `child` to the end of `parent`'s children.
    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        self.detach(child);
        let mut nodes = self.nodes.borrow_mut();
        nodes[child.0].parent = Some(parent);
        nodes[parent.0].children.push(child);
    }

    fn detach(&self, node: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(parent) = nodes[node.0].parent.take() {
            nodes[parent.0].children.retain(|&c| c != node);
        }
    }

    /// Remove every child of the body, as a host page that re-renders itself
    /// wholesale would.
    pub fn wipe_body(&self) {
        for child in self.children(BODY) {
            self.detach(child);
        }
    }

    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes.borrow()[node.0].children.clone()
    }

    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.borrow()[node.0].parent
    }

    #[must_use]
    pub fn tag(&self, node: NodeId) -> String {
        self.nodes.borrow()[node.0].tag.clone()
    }

    #[must_use]
    pub fn element_id(&self, node: NodeId) -> Option<String> {
        self.nodes.borrow()[node.0].id.clone()
    }

    /// Attached elements carrying `id`, in document order.
    #[must_use]
    pub fn attached_with_id(&self, id: &str) -> Vec<NodeId> {
        let nodes = self.nodes.borrow();
        let mut found = Vec::new();
        let mut stack = vec![ROOT];
        while let Some(node) = stack.pop() {
            let data = &nodes[node.0];
            if data.id.as_deref() == Some(id) {
                found.push(node);
            }
            stack.extend(data.children.iter().rev().copied());
        }
        found
    }

    /// Number of attached elements carrying `id`.
    #[must_use]
    pub fn count_with_id(&self, id: &str) -> usize {
        self.attached_with_id(id).len()
    }
}

impl HostPage for MemoryPage {
    type Node = NodeId;

    fn create_container(&self, id: &str) -> Result<NodeId, PageError> {
        if self.take_fault(PageFault::Create) {
            return Err(PageError::CreateFailed {
                id: id.to_owned(),
                reason: "injected fault".into(),
            });
        }
        Ok(self.new_node("div", Some(id)))
    }

    fn append_to_body(&self, node: &NodeId) -> Result<(), PageError> {
        if self.take_fault(PageFault::Append) {
            return Err(PageError::InsertFailed {
                reason: "injected fault".into(),
            });
        }
        self.append_child(BODY, *node);
        Ok(())
    }

    fn contains(&self, node: &NodeId) -> bool {
        let nodes = self.nodes.borrow();
        let mut current = Some(*node);
        while let Some(n) = current {
            if n == ROOT {
                return true;
            }
            current = nodes[n.0].parent;
        }
        false
    }

    fn remove(&self, node: &NodeId) -> Result<(), PageError> {
        if self.take_fault(PageFault::Remove) {
            return Err(PageError::RemoveFailed {
                reason: "injected fault".into(),
            });
        }
        self.detach(*node);
        Ok(())
    }

    fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.attached_with_id(id).into_iter().next()
    }
}
