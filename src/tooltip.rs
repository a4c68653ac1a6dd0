//! Tooltip forwarding
//!
//! The renderer reports pointer activity over chart items; the host owns the
//! tooltip display. Hover and move show the hovered item's tooltip fields,
//! leaving hides it immediately.

use std::rc::Rc;

use serde_json::Value;

use crate::host::{TooltipHideOptions, TooltipShowOptions, VisualHost, VisualTooltipDataItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventKind {
    Over,
    Move,
    Out,
    /// Anything else the renderer reports; ignored
    Other,
}

impl PointerEventKind {
    /// Map a DOM event type name (`mouseover`, `mousemove`, `mouseout`)
    pub fn from_event_type(event_type: &str) -> Self {
        match event_type {
            "mouseover" => PointerEventKind::Over,
            "mousemove" => PointerEventKind::Move,
            "mouseout" => PointerEventKind::Out,
            _ => PointerEventKind::Other,
        }
    }
}

/// Pointer event as seen by the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub client_x: f64,
    pub client_y: f64,
}

/// Handler the renderer calls for every pointer event over a chart item
pub struct TooltipHandler {
    host: Rc<dyn VisualHost>,
}

impl TooltipHandler {
    pub fn new(host: Rc<dyn VisualHost>) -> Self {
        Self { host }
    }

    /// `item` is the hovered scene item; its `tooltip` field holds the values to show
    pub fn call(&self, event: &PointerEvent, item: &Value) {
        match event.kind {
            PointerEventKind::Over | PointerEventKind::Move => {
                let options = TooltipShowOptions {
                    coordinates: [event.client_x, event.client_y],
                    data_items: data_items(item.get("tooltip").unwrap_or(&Value::Null)),
                    is_touch_event: false,
                    identities: Vec::new(),
                };
                self.host.show_tooltip(&options);
            }
            PointerEventKind::Out => {
                self.host.hide_tooltip(&TooltipHideOptions {
                    immediately: true,
                    is_touch_event: false,
                });
            }
            PointerEventKind::Other => {}
        }
    }
}

/// One item per tooltip field. A bare value becomes a single unnamed item.
fn data_items(tooltip: &Value) -> Vec<VisualTooltipDataItem> {
    match tooltip {
        Value::Null => Vec::new(),
        Value::Object(fields) => fields
            .iter()
            .map(|(key, value)| VisualTooltipDataItem {
                display_name: key.clone(),
                value: display_value(value),
            })
            .collect(),
        other => vec![VisualTooltipDataItem {
            display_name: String::new(),
            value: display_value(other),
        }],
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
