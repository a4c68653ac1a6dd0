//! Host collaborator contracts
//!
//! The visual runs inside a report host that owns data delivery, settings
//! storage, tooltips and localisation. This module describes what the core
//! consumes from the host; an embedding supplies the implementation.
//!
//! All host calls are synchronous acknowledgements. Anything the host does
//! asynchronously (applying persisted properties, delivering the next data
//! segment) arrives later as a separate `update` call.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dataview::VisualUpdateOptions;

// ============================================================================
// Host API Types
// ============================================================================

/// Request for the next data segment of the current query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFetchRequest {
    /// Query generation the request belongs to; hosts that echo it back on
    /// the continuation update let stale segments be recognised
    pub generation: u64,
}

/// Properties of one settings object, as persisted or enumerated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualObjectInstance {
    pub object_name: String,
    pub selector: Option<Value>,
    pub properties: Map<String, Value>,
    /// Validation hints for the property pane, keyed by property name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_values: Option<Map<String, Value>>,
}

impl VisualObjectInstance {
    pub fn new(object_name: impl Into<String>, properties: Map<String, Value>) -> Self {
        Self {
            object_name: object_name.into(),
            selector: None,
            properties,
            valid_values: None,
        }
    }
}

/// Property mutation submitted to the host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualObjectInstancesToPersist {
    pub replace: Vec<VisualObjectInstance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualTooltipDataItem {
    pub display_name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TooltipShowOptions {
    pub coordinates: [f64; 2],
    pub data_items: Vec<VisualTooltipDataItem>,
    pub is_touch_event: bool,
    pub identities: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TooltipHideOptions {
    pub immediately: bool,
    pub is_touch_event: bool,
}

// ============================================================================
// Traits
// ============================================================================

/// Localised UI strings
pub trait LocalizationManager {
    fn get_display_name(&self, key: &str) -> String;
}

/// Fallback that shows the lookup key itself
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyLocalizationManager;

impl LocalizationManager for KeyLocalizationManager {
    fn get_display_name(&self, key: &str) -> String {
        key.to_string()
    }
}

/// Services the report host provides to the visual
pub trait VisualHost {
    /// Ask for the next segment of the current query.
    ///
    /// Returns whether the host accepted; `false` means no more data will come.
    fn fetch_more_data(&self, request: DataFetchRequest) -> bool;

    /// Write property changes into report storage. The host applies them
    /// asynchronously and reflects them in a later update.
    fn persist_properties(&self, changes: &VisualObjectInstancesToPersist);

    fn rendering_started(&self, _options: &VisualUpdateOptions) {}

    fn rendering_finished(&self, _options: &VisualUpdateOptions) {}

    fn rendering_failed(&self, _options: &VisualUpdateOptions, _reason: &str) {}

    fn show_tooltip(&self, options: &TooltipShowOptions);

    fn hide_tooltip(&self, options: &TooltipHideOptions);

    fn locale(&self) -> String {
        "en-US".to_string()
    }

    fn create_localization_manager(&self) -> Box<dyn LocalizationManager> {
        Box::new(KeyLocalizationManager)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_persist_shape() {
        let mut props = Map::new();
        props.insert("jsonSpec".to_string(), json!("{}"));
        let changes = VisualObjectInstancesToPersist {
            replace: vec![VisualObjectInstance::new("vega", props)],
        };
        assert_eq!(
            serde_json::to_value(&changes).unwrap(),
            json!({"replace": [{"objectName": "vega", "selector": null, "properties": {"jsonSpec": "{}"}}]})
        );
    }

    #[test]
    fn test_key_localization_fallback() {
        assert_eq!(
            KeyLocalizationManager.get_display_name("Button_Apply"),
            "Button_Apply"
        );
    }
}
