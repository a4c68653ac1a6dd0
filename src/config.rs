//! Compiled-in configuration for the visual
//!
//! Everything here is fixed at build time: identity metadata, feature flags,
//! the spec templates offered to new reports and the editor pane geometry.
//! Report-level settings that authors can change live in [`crate::settings`].

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::grammar::Provider;
use crate::naming;

/// Pixels subtracted from each viewport dimension before handing it to the renderer
pub const RENDER_INSET: f64 = 10.0;

/// Identity of the packaged visual
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualMetadata {
    pub name: &'static str,
    pub display_name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
}

impl Default for VisualMetadata {
    fn default() -> Self {
        Self {
            name: "deneb",
            display_name: "Deneb",
            version: crate::VERSION,
            description: "Declarative visualization using Vega and Vega-Lite",
        }
    }
}

/// Feature switches
///
/// An embedding host can supply these as JSON (`{"developerMode": true}`);
/// missing keys keep their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisualFeatures {
    /// Exposes raw settings in the property pane and raises the default log level
    pub developer_mode: bool,
    /// Allows requesting further data windows past the host's initial reduction
    pub fetch_more_data: bool,
}

impl Default for VisualFeatures {
    fn default() -> Self {
        Self {
            developer_mode: false,
            fetch_more_data: true,
        }
    }
}

/// Geometry of the resizable editor pane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitPaneConfig {
    /// Fraction of the viewport width the pane opens at
    pub default_size_percent: f64,
    /// Smallest expanded width, in pixels
    pub min_size: f64,
    /// Largest expanded width as a fraction of the viewport width
    pub max_size_percent: f64,
    /// Width of the pane when collapsed, in pixels
    pub collapsed_size: f64,
}

impl Default for SplitPaneConfig {
    fn default() -> Self {
        Self {
            default_size_percent: 0.4,
            min_size: 300.0,
            max_size_percent: 0.6,
            collapsed_size: 36.0,
        }
    }
}

/// Complete compiled-in configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualConfiguration {
    pub metadata: VisualMetadata,
    pub features: VisualFeatures,
    pub split_pane: SplitPaneConfig,
}

impl VisualConfiguration {
    pub fn with_features(features: VisualFeatures) -> Self {
        Self {
            features,
            ..Self::default()
        }
    }
}

// ============================================================================
// Spec Templates
// ============================================================================

/// Autosize block shared by both templates so the chart fills the visual
fn autosize() -> Value {
    json!({
        "type": "fit",
        "contains": "padding"
    })
}

/// Starter Vega-Lite spec: a horizontal bar chart bound to the dataset
pub fn vega_lite_template() -> Value {
    json!({
        "$schema": naming::VEGA_LITE_SCHEMA,
        "config": {
            "autosize": autosize()
        },
        "data": {
            "name": naming::DATASET_NAME
        },
        "mark": "bar",
        "encoding": {
            "x": {
                "field": "add a measure name here",
                "type": "quantitative"
            },
            "y": {
                "field": "add a category column name here",
                "type": "nominal"
            }
        }
    })
}

/// Starter Vega spec equivalent to the Vega-Lite template
pub fn vega_template() -> Value {
    json!({
        "$schema": naming::VEGA_SCHEMA,
        "config": {
            "autosize": autosize()
        },
        "description": "Simple bar char with Vega.",
        "data": [
            {
                "name": naming::DATASET_NAME
            }
        ],
        "scales": [
            {
                "name": "xscale",
                "type": "band",
                "domain": {
                    "data": naming::DATASET_NAME,
                    "field": "category"
                },
                "range": "width",
                "padding": 0.05,
                "round": true
            },
            {
                "name": "yscale",
                "domain": {
                    "data": naming::DATASET_NAME,
                    "field": "measure"
                },
                "nice": true,
                "range": "height"
            }
        ],
        "axes": [
            {
                "scale": "xscale",
                "orient": "bottom",
                "labelAngle": -90,
                "tickOffset": 0,
                "labelAlign": "right",
                "labelBaseline": "middle"
            },
            {
                "orient": "left",
                "scale": "yscale"
            }
        ],
        "marks": [
            {
                "type": "rect",
                "from": {
                    "data": naming::DATASET_NAME
                },
                "encode": {
                    "enter": {
                        "x": {
                            "scale": "xscale",
                            "field": "category"
                        },
                        "width": {
                            "scale": "xscale",
                            "band": 1
                        },
                        "y": {
                            "scale": "yscale",
                            "field": "measure"
                        },
                        "y2": {
                            "scale": "yscale",
                            "value": 0
                        }
                    },
                    "update": {
                        "fill": {
                            "value": "steelblue"
                        }
                    }
                }
            }
        ]
    })
}

/// Template for a provider
pub fn template(provider: Provider) -> Value {
    match provider {
        Provider::Vega => vega_template(),
        Provider::VegaLite => vega_lite_template(),
    }
}

/// Serialise a spec the way the editor shows it: pretty-printed, 4-space indent
pub fn to_pretty_json(value: &Value) -> String {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    match value.serialize(&mut ser) {
        Ok(()) => String::from_utf8(buf).unwrap_or_else(|_| value.to_string()),
        Err(_) => value.to_string(),
    }
}
