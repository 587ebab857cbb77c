#![forbid(unsafe_code)]

//! Browser backend for the Lock-in widget lifecycle.
//!
//! Wires [`lockin_core`] to the real page: a `web-sys` [`HostPage`] over the
//! document, a renderer that drives a JS root factory, JS-backed api client and
//! storage capabilities, and the `wasm-bindgen` exports the content script
//! uses.
//!
//! Only [`props`] compiles natively; everything touching JS is gated on
//! `wasm32`.
//!
//! [`HostPage`]: lockin_core::HostPage

pub mod props;

#[cfg(target_arch = "wasm32")]
pub mod bridge;
#[cfg(target_arch = "wasm32")]
pub mod dom;
#[cfg(target_arch = "wasm32")]
mod exports;

#[cfg(target_arch = "wasm32")]
pub use bridge::{
    JsApiClient, JsRenderer, JsRoot, JsStorage, JsToggle, config_from_js, config_to_js,
    patch_from_js,
};
#[cfg(target_arch = "wasm32")]
pub use dom::DomPage;
#[cfg(target_arch = "wasm32")]
pub use exports::{
    DEFAULT_GLOBAL_NAME, LockinHandle, LockinMount, LockinWidget, register_globals,
};
