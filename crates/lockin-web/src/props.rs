#![forbid(unsafe_code)]

//! Shape of the props object exchanged with JavaScript.
//!
//! Capability fields (`apiClient`, `onToggle`, `storage`) are JS objects and
//! are handled by the wasm bridge. The plain-data fields travel as JSON and
//! are decoded here, so their rules are testable natively.

use lockin_core::{
    ApiHandle, ConfigError, ConfigPatch, PageContext, StorageHandle, ToggleCallback, WidgetConfig,
    WidgetMode,
};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value, json};

pub const PROP_API_CLIENT: &str = "apiClient";
pub const PROP_IS_OPEN: &str = "isOpen";
pub const PROP_ON_TOGGLE: &str = "onToggle";
pub const PROP_MODE: &str = "mode";
pub const PROP_SELECTED_TEXT: &str = "selectedText";
pub const PROP_PAGE_CONTEXT: &str = "pageContext";
pub const PROP_STORAGE: &str = "storage";

/// Plain-data props, in the order they are read from a JS object.
pub const SCALAR_PROPS: [&str; 4] = [PROP_IS_OPEN, PROP_MODE, PROP_SELECTED_TEXT, PROP_PAGE_CONTEXT];

/// `Some(..)` whenever the key is present, including an explicit `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Plain-data fields of a props object. Absent keys are `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalarProps {
    #[serde(default)]
    pub is_open: Option<bool>,
    #[serde(default)]
    pub mode: Option<WidgetMode>,
    #[serde(default, deserialize_with = "present")]
    pub selected_text: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub page_context: Option<Option<PageContext>>,
}

impl ScalarProps {
    /// Decode from a JSON object holding any subset of [`SCALAR_PROPS`].
    pub fn from_json(value: Value) -> Result<Self, ConfigError> {
        let Value::Object(map) = value else {
            return Err(ConfigError::InvalidField {
                field: "props",
                reason: "expected an object".into(),
            });
        };
        // Report unknown modes with their own error rather than a serde message.
        if let Some(Value::String(mode)) = map.get(PROP_MODE) {
            mode.parse::<WidgetMode>()?;
        }
        for key in SCALAR_PROPS {
            if let Some(field) = map.get(key) {
                check_type(key, field)?;
            }
        }
        serde_json::from_value(Value::Object(map)).map_err(|err| ConfigError::InvalidField {
            field: "props",
            reason: err.to_string(),
        })
    }

    /// Build a full snapshot. `isOpen` and `mode` must be present.
    pub fn into_config(
        self,
        api: ApiHandle,
        on_toggle: ToggleCallback,
        storage: Option<StorageHandle>,
    ) -> Result<WidgetConfig, ConfigError> {
        let is_open = self.is_open.ok_or(ConfigError::MissingField(PROP_IS_OPEN))?;
        let mode = self.mode.ok_or(ConfigError::MissingField(PROP_MODE))?;
        Ok(WidgetConfig {
            api,
            is_open,
            on_toggle,
            mode,
            selected_text: self.selected_text.flatten(),
            page_context: self.page_context.flatten(),
            storage,
        })
    }

    /// Fold these fields into `patch`.
    #[must_use]
    pub fn into_patch(self, mut patch: ConfigPatch) -> ConfigPatch {
        patch.is_open = self.is_open.or(patch.is_open);
        patch.mode = self.mode.or(patch.mode);
        patch.selected_text = self.selected_text.or(patch.selected_text);
        patch.page_context = self.page_context.or(patch.page_context);
        patch
    }
}

fn check_type(key: &'static str, value: &Value) -> Result<(), ConfigError> {
    let ok = match key {
        PROP_IS_OPEN => value.is_boolean(),
        PROP_MODE => value.is_string(),
        PROP_SELECTED_TEXT => value.is_string() || value.is_null(),
        PROP_PAGE_CONTEXT => value.is_object() || value.is_null(),
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidField {
            field: key,
            reason: format!("unexpected value {value}"),
        })
    }
}

/// Plain-data props for `config`, as handed to the JS renderer. Unset
/// optional fields are `null`.
#[must_use]
pub fn scalar_props(config: &WidgetConfig) -> Value {
    let mut map = Map::new();
    map.insert(PROP_IS_OPEN.into(), json!(config.is_open));
    map.insert(PROP_MODE.into(), json!(config.mode));
    map.insert(PROP_SELECTED_TEXT.into(), json!(config.selected_text));
    map.insert(
        PROP_PAGE_CONTEXT.into(),
        serde_json::to_value(&config.page_context).unwrap_or(Value::Null),
    );
    Value::Object(map)
}
