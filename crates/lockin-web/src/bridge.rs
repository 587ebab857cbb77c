#![forbid(unsafe_code)]

//! JavaScript-side capabilities and props marshalling.
//!
//! The renderable component lives in JS. It is reached through a factory
//! function `(container) => ({ render(props), unmount() })`, which is the
//! shape a `createRoot`-style rendering library already exposes.

use std::any::Any;
use std::rc::Rc;

use js_sys::{Array, Function, JSON, Object, Promise, Reflect};
use lockin_core::{
    ApiClient, ConfigError, ConfigPatch, RenderError, RenderRoot, Renderer, StorageError,
    StorageFuture, StorageHandle, ToggleCallback, ToggleHandler, WidgetConfig, WidgetStorage,
};
use serde_json::{Map, Value};
use tracing::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::Element;

use crate::dom::js_reason;
use crate::props::{
    PROP_API_CLIENT, PROP_ON_TOGGLE, PROP_STORAGE, SCALAR_PROPS, ScalarProps, scalar_props,
};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn get(target: &JsValue, key: &str) -> Result<JsValue, String> {
    Reflect::get(target, &JsValue::from_str(key)).map_err(|err| js_reason(&err))
}

/// Call `target[name](...args)` with `this` bound to `target`.
fn call_method(target: &JsValue, name: &str, args: &[JsValue]) -> Result<JsValue, String> {
    let method = get(target, name)?
        .dyn_into::<Function>()
        .map_err(|_| format!("{name} is not a function"))?;
    let argv: Array = args.iter().collect();
    Reflect::apply(&method, target, &argv).map_err(|err| js_reason(&err))
}

fn to_json_text(value: &JsValue) -> Result<String, String> {
    JSON::stringify(value)
        .map(String::from)
        .map_err(|err| js_reason(&err))
}

fn from_json_text(text: &str) -> Result<JsValue, String> {
    JSON::parse(text).map_err(|err| js_reason(&err))
}

// ─── Capabilities ────────────────────────────────────────────────────────────

/// Api client object supplied by the extension.
#[derive(Debug, Clone)]
pub struct JsApiClient(JsValue);

impl JsApiClient {
    pub fn new(value: JsValue) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn value(&self) -> &JsValue {
        &self.0
    }
}

impl ApiClient for JsApiClient {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Storage object with promise-returning `get(key)` and `set(key, value)`.
#[derive(Debug, Clone)]
pub struct JsStorage(JsValue);

impl JsStorage {
    pub fn new(value: JsValue) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn value(&self) -> &JsValue {
        &self.0
    }

    async fn call(
        &self,
        op: &'static str,
        args: &[JsValue],
        key: &str,
    ) -> Result<JsValue, StorageError> {
        let returned = call_method(&self.0, op, args)
            .map_err(|reason| StorageError::backend(op, key, reason))?;
        JsFuture::from(Promise::resolve(&returned))
            .await
            .map_err(|err| StorageError::backend(op, key, js_reason(&err)))
    }
}

impl WidgetStorage for JsStorage {
    fn get(&self, key: &str) -> StorageFuture<'_, Option<Value>> {
        let key = key.to_owned();
        Box::pin(async move {
            let stored = self.call("get", &[JsValue::from_str(&key)], &key).await?;
            if stored.is_undefined() || stored.is_null() {
                return Ok(None);
            }
            let text = to_json_text(&stored).map_err(|reason| StorageError::Decode {
                key: key.clone(),
                reason,
            })?;
            serde_json::from_str(&text)
                .map(Some)
                .map_err(|err| StorageError::Decode {
                    key,
                    reason: err.to_string(),
                })
        })
    }

    fn set(&self, key: &str, value: Value) -> StorageFuture<'_, ()> {
        let key = key.to_owned();
        Box::pin(async move {
            let js_value = from_json_text(&value.to_string())
                .map_err(|reason| StorageError::backend("set", key.as_str(), reason))?;
            self.call("set", &[JsValue::from_str(&key), js_value], &key)
                .await
                .map(drop)
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `onToggle` function supplied by the extension.
///
/// Kept as-is so every render hands the component the same function.
#[derive(Debug, Clone)]
pub struct JsToggle(Function);

impl JsToggle {
    pub fn new(function: Function) -> Self {
        Self(function)
    }

    #[must_use]
    pub fn function(&self) -> &Function {
        &self.0
    }
}

impl ToggleHandler for JsToggle {
    fn toggle(&self) {
        if let Err(err) = self.0.call0(&JsValue::NULL) {
            warn!(reason = %js_reason(&err), "onToggle threw");
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn toggle_from_js(value: JsValue) -> Result<ToggleCallback, ConfigError> {
    let function = value
        .dyn_into::<Function>()
        .map_err(|_| ConfigError::InvalidField {
            field: PROP_ON_TOGGLE,
            reason: "expected a function".into(),
        })?;
    Ok(ToggleCallback::from_handler(JsToggle::new(function)))
}

/// The JS function for `toggle`. Callbacks that came from JS are returned
/// unchanged; Rust callbacks are wrapped in a fresh closure.
fn toggle_to_js(toggle: &ToggleCallback) -> JsValue {
    if let Some(js) = toggle.downcast_ref::<JsToggle>() {
        return js.function().clone().into();
    }
    let toggle = toggle.clone();
    Closure::<dyn Fn()>::new(move || toggle.invoke()).into_js_value()
}

fn storage_from_js(value: JsValue) -> Option<StorageHandle> {
    if value.is_undefined() || value.is_null() {
        None
    } else {
        Some(Rc::new(JsStorage::new(value)))
    }
}

// ─── Props in ────────────────────────────────────────────────────────────────

fn read_key(props: &JsValue, key: &'static str) -> Result<JsValue, ConfigError> {
    get(props, key).map_err(|reason| ConfigError::InvalidField { field: key, reason })
}

fn read_scalars(props: &JsValue) -> Result<ScalarProps, ConfigError> {
    if !props.is_object() {
        return Err(ConfigError::InvalidField {
            field: "props",
            reason: "expected an object".into(),
        });
    }
    let mut map = Map::new();
    for key in SCALAR_PROPS {
        let value = read_key(props, key)?;
        if value.is_undefined() {
            continue;
        }
        let parsed = to_json_text(&value)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .ok_or_else(|| ConfigError::InvalidField {
                field: key,
                reason: "not JSON-representable".into(),
            })?;
        map.insert(key.to_owned(), parsed);
    }
    ScalarProps::from_json(Value::Object(map))
}

/// Decode a full props object passed to `create` or `attach`.
pub fn config_from_js(props: &JsValue) -> Result<WidgetConfig, ConfigError> {
    let scalars = read_scalars(props)?;
    let api = read_key(props, PROP_API_CLIENT)?;
    if api.is_undefined() {
        return Err(ConfigError::MissingField(PROP_API_CLIENT));
    }
    let toggle = read_key(props, PROP_ON_TOGGLE)?;
    if toggle.is_undefined() {
        return Err(ConfigError::MissingField(PROP_ON_TOGGLE));
    }
    let storage = storage_from_js(read_key(props, PROP_STORAGE)?);
    scalars.into_config(
        Rc::new(JsApiClient::new(api)),
        toggle_from_js(toggle)?,
        storage,
    )
}

/// Decode a partial props object passed to `updateProps`.
pub fn patch_from_js(props: &JsValue) -> Result<ConfigPatch, ConfigError> {
    let mut patch = read_scalars(props)?.into_patch(ConfigPatch::new());
    let api = read_key(props, PROP_API_CLIENT)?;
    if !api.is_undefined() {
        patch = patch.with_api(Rc::new(JsApiClient::new(api)));
    }
    let toggle = read_key(props, PROP_ON_TOGGLE)?;
    if !toggle.is_undefined() {
        patch = patch.with_on_toggle(toggle_from_js(toggle)?);
    }
    let storage = read_key(props, PROP_STORAGE)?;
    if !storage.is_undefined() {
        patch = patch.with_storage(storage_from_js(storage));
    }
    Ok(patch)
}

// ─── Props out ───────────────────────────────────────────────────────────────

/// Build the props object handed to the JS component.
pub fn config_to_js(config: &WidgetConfig) -> Result<Object, String> {
    let props: Object = from_json_text(&scalar_props(config).to_string())?.unchecked_into();

    let api = match config.api.as_any().downcast_ref::<JsApiClient>() {
        Some(client) => client.value().clone(),
        None => {
            warn!("api client is not a JS object; passing undefined");
            JsValue::UNDEFINED
        }
    };
    set(&props, PROP_API_CLIENT, &api)?;

    set(&props, PROP_ON_TOGGLE, &toggle_to_js(&config.on_toggle))?;

    let storage = match &config.storage {
        Some(storage) => match storage.as_any().downcast_ref::<JsStorage>() {
            Some(js) => js.value().clone(),
            None => {
                warn!("storage is not a JS object; passing undefined");
                JsValue::UNDEFINED
            }
        },
        None => JsValue::UNDEFINED,
    };
    set(&props, PROP_STORAGE, &storage)?;
    Ok(props)
}

fn set(target: &Object, key: &str, value: &JsValue) -> Result<(), String> {
    Reflect::set(target, &JsValue::from_str(key), value)
        .map(drop)
        .map_err(|err| js_reason(&err))
}

// ─── Renderer ────────────────────────────────────────────────────────────────

/// Renderer backed by a JS root factory.
#[derive(Debug, Clone)]
pub struct JsRenderer {
    factory: Function,
}

impl JsRenderer {
    pub fn new(factory: Function) -> Self {
        Self { factory }
    }
}

impl Renderer for JsRenderer {
    type Node = Element;
    type Root = JsRoot;

    fn create_root(&self, container: &Element) -> Result<JsRoot, RenderError> {
        let root = self
            .factory
            .call1(&JsValue::NULL, container)
            .map_err(|err| RenderError::RootCreation {
                reason: js_reason(&err),
            })?;
        if !root.is_object() {
            return Err(RenderError::RootCreation {
                reason: "root factory did not return an object".into(),
            });
        }
        Ok(JsRoot { root })
    }
}

/// Root object returned by the JS factory.
#[derive(Debug)]
pub struct JsRoot {
    root: JsValue,
}

impl RenderRoot for JsRoot {
    fn render(&mut self, config: &WidgetConfig) {
        let result = config_to_js(config)
            .and_then(|props| call_method(&self.root, "render", &[props.into()]));
        if let Err(reason) = result {
            warn!(%reason, "widget render failed");
        }
    }

    fn unmount(&mut self) {
        if let Err(reason) = call_method(&self.root, "unmount", &[]) {
            warn!(%reason, "widget unmount failed");
        }
    }
}
