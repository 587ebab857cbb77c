#![forbid(unsafe_code)]

//! [`HostPage`] over the browser document.

use js_sys::Error as JsSysError;
use lockin_core::{HostPage, PageError};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, Node};

/// Best-effort human-readable text for a thrown JS value.
pub(crate) fn js_reason(err: &JsValue) -> String {
    if let Some(error) = err.dyn_ref::<JsSysError>() {
        return String::from(error.message());
    }
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

/// The document of the current window.
#[derive(Debug, Clone)]
pub struct DomPage {
    document: Document,
}

impl DomPage {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// Page for the global `window.document`.
    pub fn from_window() -> Result<Self, PageError> {
        web_sys::window()
            .and_then(|window| window.document())
            .map(Self::new)
            .ok_or(PageError::MissingBody)
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }
}

impl HostPage for DomPage {
    type Node = Element;

    fn create_container(&self, id: &str) -> Result<Element, PageError> {
        let element = self
            .document
            .create_element("div")
            .map_err(|err| PageError::CreateFailed {
                id: id.to_owned(),
                reason: js_reason(&err),
            })?;
        element.set_id(id);
        Ok(element)
    }

    fn append_to_body(&self, node: &Element) -> Result<(), PageError> {
        let body = self.document.body().ok_or(PageError::MissingBody)?;
        body.append_child(node)
            .map(drop)
            .map_err(|err| PageError::InsertFailed {
                reason: js_reason(&err),
            })
    }

    fn contains(&self, node: &Element) -> bool {
        let node: &Node = node;
        self.document
            .document_element()
            .is_some_and(|root| root.contains(Some(node)))
    }

    fn remove(&self, node: &Element) -> Result<(), PageError> {
        node.remove();
        Ok(())
    }

    fn find_by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }
}
