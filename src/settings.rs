//! Report settings
//!
//! Settings are persisted by the host as one object per category inside the
//! dataview's `objects` bag. Each category is a plain serde struct whose
//! field names match the persisted property names, so reading them is an
//! overlay of the stored properties onto the category defaults.
//!
//! The property pane asks for each object separately. [`SettingsObject`]
//! dispatches that request to the matching category, which decides which of
//! its properties are visible.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config::{self, VisualFeatures};
use crate::dataview::{DataView, DataViewObjects};
use crate::grammar::{Provider, RenderMode};
use crate::host::VisualObjectInstance;
use crate::naming;

/// Valid range for the top-level padding, in pixels
const PADDING_MIN: u32 = 0;
const PADDING_MAX: u32 = 9999;

// ============================================================================
// Categories
// ============================================================================

/// `dataLimit`: fetching past the host's data reduction window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataLimitSettings {
    pub enabled: bool,
    #[serde(rename = "override")]
    pub override_limit: bool,
    pub show_custom_visual_notes: bool,
}

impl Default for DataLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            override_limit: false,
            show_custom_visual_notes: true,
        }
    }
}

/// `vega`: the spec text and how to interpret and draw it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VegaSettings {
    pub json_spec: String,
    pub provider: Provider,
    pub render_mode: RenderMode,
    pub auto_save: bool,
}

impl Default for VegaSettings {
    fn default() -> Self {
        Self {
            json_spec: config::to_pretty_json(&config::vega_lite_template()),
            provider: Provider::VegaLite,
            render_mode: RenderMode::Svg,
            auto_save: false,
        }
    }
}

/// `vegaLiteTopLevelConfig`: theme knobs merged beneath the user's spec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VegaLiteTopLevelConfigSettings {
    pub background: String,
    pub font: String,
    pub padding: f64,
}

impl Default for VegaLiteTopLevelConfigSettings {
    fn default() -> Self {
        Self {
            background: "white".to_string(),
            font: "\"Segoe UI\", wf_segoe-ui_normal, helvetica, arial, sans-serif".to_string(),
            padding: 10.0,
        }
    }
}

/// All settings categories
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisualSettings {
    pub data_limit: DataLimitSettings,
    pub vega: VegaSettings,
    pub vega_lite_top_level_config: VegaLiteTopLevelConfigSettings,
}

impl VisualSettings {
    /// Read settings from a dataview's persisted objects, falling back to
    /// defaults for anything absent or unreadable.
    pub fn parse(data_view: Option<&DataView>) -> Self {
        let Some(objects) = data_view.and_then(|dv| dv.metadata.objects.as_ref()) else {
            return Self::default();
        };
        Self {
            data_limit: overlay(objects, naming::DATA_LIMIT_OBJECT),
            vega: overlay(objects, naming::VEGA_OBJECT),
            vega_lite_top_level_config: overlay(objects, naming::TOP_LEVEL_CONFIG_OBJECT),
        }
    }

    /// Compiled-in value of `object.property`, if both are known
    pub fn default_property(object_name: &str, property_name: &str) -> Option<Value> {
        let defaults = serde_json::to_value(Self::default()).ok()?;
        defaults
            .get(object_name)
            .and_then(|object| object.get(property_name))
            .cloned()
    }

    /// Instances the property pane should show for `object_name`
    pub fn enumerate_object_instances(
        &self,
        object_name: &str,
        features: &VisualFeatures,
    ) -> Vec<VisualObjectInstance> {
        let Some(object) = SettingsObject::from_name(object_name, self) else {
            tracing::debug!(object = object_name, "No settings object to enumerate");
            return Vec::new();
        };
        let context = EnumerationContext {
            developer_mode: features.developer_mode,
            provider: self.vega.provider,
        };
        let instance = VisualObjectInstance::new(object_name, object.properties());
        object.filter_visible_properties(vec![instance], &context)
    }
}

/// Overlay stored properties for one object onto the category defaults
fn overlay<T>(objects: &DataViewObjects, object_name: &str) -> T
where
    T: Default + Serialize + DeserializeOwned,
{
    let defaults = T::default();
    let Some(stored) = objects.get(object_name) else {
        return defaults;
    };
    let mut merged = match serde_json::to_value(&defaults) {
        Ok(Value::Object(map)) => map,
        _ => return defaults,
    };
    for (key, value) in stored {
        merged.insert(key.clone(), value.clone());
    }
    match serde_json::from_value(Value::Object(merged)) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(object = object_name, error = %e, "Ignoring unreadable settings object");
            defaults
        }
    }
}

// ============================================================================
// Property Pane Enumeration
// ============================================================================

/// What the visibility rules depend on besides the category itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumerationContext {
    pub developer_mode: bool,
    pub provider: Provider,
}

/// One settings category, selected by object name
#[derive(Debug, Clone, Copy)]
pub enum SettingsObject<'a> {
    DataLimit(&'a DataLimitSettings),
    Vega(&'a VegaSettings),
    VegaLiteTopLevelConfig(&'a VegaLiteTopLevelConfigSettings),
}

impl<'a> SettingsObject<'a> {
    pub fn from_name(object_name: &str, settings: &'a VisualSettings) -> Option<Self> {
        match object_name {
            naming::DATA_LIMIT_OBJECT => Some(SettingsObject::DataLimit(&settings.data_limit)),
            naming::VEGA_OBJECT => Some(SettingsObject::Vega(&settings.vega)),
            naming::TOP_LEVEL_CONFIG_OBJECT => Some(SettingsObject::VegaLiteTopLevelConfig(
                &settings.vega_lite_top_level_config,
            )),
            _ => None,
        }
    }

    /// Current property values, keyed by persisted property name
    pub fn properties(&self) -> Map<String, Value> {
        let value = match self {
            SettingsObject::DataLimit(s) => serde_json::to_value(s),
            SettingsObject::Vega(s) => serde_json::to_value(s),
            SettingsObject::VegaLiteTopLevelConfig(s) => serde_json::to_value(s),
        };
        match value {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Apply the category's visibility rules to the enumerated instances
    pub fn filter_visible_properties(
        &self,
        mut instances: Vec<VisualObjectInstance>,
        context: &EnumerationContext,
    ) -> Vec<VisualObjectInstance> {
        match self {
            SettingsObject::DataLimit(s) => {
                if !s.enabled {
                    return Vec::new();
                }
                if !s.override_limit {
                    for instance in &mut instances {
                        instance.properties.remove(naming::SHOW_NOTES_PROPERTY);
                    }
                }
            }
            SettingsObject::Vega(_) => {
                if !context.developer_mode {
                    for instance in &mut instances {
                        instance.properties.remove(naming::JSON_SPEC_PROPERTY);
                        instance.properties.remove(naming::AUTO_SAVE_PROPERTY);
                    }
                }
            }
            SettingsObject::VegaLiteTopLevelConfig(_) => {
                if context.provider != Provider::VegaLite {
                    return Vec::new();
                }
                let mut valid = Map::new();
                valid.insert(
                    naming::PADDING_PROPERTY.to_string(),
                    json!({"numberRange": {"min": PADDING_MIN, "max": PADDING_MAX}}),
                );
                for instance in &mut instances {
                    instance.valid_values = Some(valid.clone());
                }
            }
        }
        instances
    }
}
