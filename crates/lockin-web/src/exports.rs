#![forbid(unsafe_code)]

//! `wasm-bindgen` surface and the global registration step.
//!
//! Injected scripts call [`register_globals`] once. It builds the single
//! [`LockinWidget`] for this execution context and publishes it on `window`,
//! where the extension's activation logic finds it. Nothing else in the crate
//! touches the global object.
//!
//! `LockinWidget` has no JS constructor. Two controllers in one context would
//! each treat the other's container as an orphan, so the instance is kept in a
//! thread local and every registration hands out that same controller.

use std::cell::RefCell;

use js_sys::{Function, Reflect};
use lockin_core::{
    ControllerOptions, MountHandle, WidgetController, WidgetHandle, attach as attach_widget,
};
use tracing::{debug, info};
use wasm_bindgen::prelude::*;
use web_sys::Element;

use crate::bridge::{JsRenderer, config_from_js, patch_from_js};
use crate::dom::DomPage;

/// Default property name the widget is published under on `window`.
pub const DEFAULT_GLOBAL_NAME: &str = "LockInWidget";

type DomController = WidgetController<DomPage, JsRenderer>;

thread_local! {
    static INSTANCE: RefCell<Option<LockinWidget>> = const { RefCell::new(None) };
}

/// Singleton widget lifecycle for one page.
///
/// Clones share one controller.
#[wasm_bindgen]
#[derive(Clone)]
pub struct LockinWidget {
    controller: DomController,
    renderer: JsRenderer,
}

impl LockinWidget {
    /// `render_root` is called with a container element and must return
    /// `{ render(props), unmount() }`.
    fn new(render_root: Function) -> Result<Self, JsError> {
        let page = DomPage::from_window()?;
        let renderer = JsRenderer::new(render_root);
        Ok(Self {
            controller: WidgetController::with_options(
                page,
                renderer.clone(),
                ControllerOptions::default(),
            ),
            renderer,
        })
    }

    /// The context's instance, built with `render_root` on first use.
    fn shared(render_root: Function) -> Result<Self, JsError> {
        INSTANCE.with(|slot| {
            if let Some(existing) = slot.borrow().as_ref() {
                debug!("reusing the widget instance of this context");
                return Ok(existing.clone());
            }
            let widget = Self::new(render_root)?;
            *slot.borrow_mut() = Some(widget.clone());
            Ok(widget)
        })
    }
}

#[wasm_bindgen]
impl LockinWidget {
    /// Mount the widget, or re-render the live one, with `config`.
    pub fn create(&self, config: JsValue) -> Result<LockinHandle, JsError> {
        let config = config_from_js(&config)?;
        let inner = self.controller.create(config)?;
        Ok(LockinHandle { inner })
    }

    /// Mount a separate, caller-owned instance into `container`.
    pub fn attach(&self, container: Element, config: JsValue) -> Result<LockinMount, JsError> {
        let config = config_from_js(&config)?;
        let inner = attach_widget(&self.renderer, &container, &config)?;
        Ok(LockinMount { inner: Some(inner) })
    }

    #[wasm_bindgen(getter, js_name = isLive)]
    pub fn is_live(&self) -> bool {
        self.controller.is_live()
    }

    /// Number of times the singleton container was (re)built.
    #[wasm_bindgen(getter)]
    pub fn epoch(&self) -> f64 {
        self.controller.epoch() as f64
    }

    #[wasm_bindgen(getter, js_name = containerId)]
    pub fn container_id(&self) -> String {
        self.controller.options().container_id().to_owned()
    }
}

/// Handle returned by `LockinWidget.create`.
#[wasm_bindgen]
pub struct LockinHandle {
    inner: WidgetHandle<DomPage, JsRenderer>,
}

#[wasm_bindgen]
impl LockinHandle {
    #[wasm_bindgen(getter, js_name = containerRef)]
    pub fn container_ref(&self) -> Element {
        self.inner.container().clone()
    }

    /// Merge `partial` into the current props and re-render. Returns `false`
    /// when nothing is mounted.
    #[wasm_bindgen(js_name = updateProps)]
    pub fn update_props(&self, partial: JsValue) -> Result<bool, JsError> {
        let patch = patch_from_js(&partial)?;
        Ok(self.inner.update_props(patch).is_applied())
    }

    /// Tear the widget down. Returns `false` when there was nothing to tear down.
    pub fn unmount(&self) -> bool {
        self.inner.unmount()
    }
}

/// Disposer returned by `LockinWidget.attach`.
#[wasm_bindgen]
pub struct LockinMount {
    inner: Option<MountHandle<JsRenderer>>,
}

#[wasm_bindgen]
impl LockinMount {
    pub fn render(&mut self, config: JsValue) -> Result<(), JsError> {
        let config = config_from_js(&config)?;
        if let Some(handle) = self.inner.as_mut() {
            handle.render(&config);
        }
        Ok(())
    }

    /// Unmount the root. The container element is left in place.
    pub fn dispose(&mut self) {
        if let Some(handle) = self.inner.take() {
            handle.dispose();
        }
    }
}

/// Publish a [`LockinWidget`] on `window[globalName]`.
///
/// If a widget is already published under that name (the script was injected
/// twice into the same context), the existing one is kept and returned.
/// Registering under another name publishes the same controller again;
/// `render_root` only takes effect on the first registration.
#[wasm_bindgen(js_name = registerGlobals)]
pub fn register_globals(
    render_root: Function,
    global_name: Option<String>,
) -> Result<JsValue, JsError> {
    let window = web_sys::window().ok_or_else(|| JsError::new("no window"))?;
    let name = JsValue::from_str(global_name.as_deref().unwrap_or(DEFAULT_GLOBAL_NAME));

    let existing =
        Reflect::get(&window, &name).map_err(|_| JsError::new("window is not readable"))?;
    if !existing.is_undefined() && !existing.is_null() {
        debug!(global = ?name.as_string(), "widget already registered; keeping existing instance");
        return Ok(existing);
    }

    let widget: JsValue = LockinWidget::shared(render_root)?.into();
    Reflect::set(&window, &name, &widget).map_err(|_| JsError::new("window is not writable"))?;
    info!(global = ?name.as_string(), "widget registered");
    Ok(widget)
}
