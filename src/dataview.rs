//! Host dataview model and validation
//!
//! The host delivers each bound query result as a dataview: a table of rows,
//! column descriptors carrying role tags, an optional continuation marker
//! when more segments are available, and the persisted settings objects.
//! All types deserialise from the host's camelCase JSON so recorded updates
//! can be replayed.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Properties of one persisted settings object
pub type DataViewObject = Map<String, Value>;

/// Persisted settings objects, keyed by object name
pub type DataViewObjects = IndexMap<String, DataViewObject>;

// ============================================================================
// Dataview
// ============================================================================

/// Physical type flags of a column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValueTypeDescriptor {
    pub text: bool,
    pub numeric: bool,
    pub integer: bool,
    #[serde(rename = "bool")]
    pub boolean: bool,
    pub date_time: bool,
}

/// Column descriptor as supplied by the host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataViewMetadataColumn {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default)]
    pub is_measure: bool,
    /// Role name → whether this column carries it
    #[serde(default)]
    pub roles: IndexMap<String, bool>,
    #[serde(default, rename = "type")]
    pub value_type: ValueTypeDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl DataViewMetadataColumn {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.get(role).copied().unwrap_or(false)
    }
}

/// Marker present when the host has further segments for the current query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataViewSegmentMetadata {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataViewMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<DataViewMetadataColumn>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<DataViewObjects>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<DataViewSegmentMetadata>,
}

/// Tabular query result: parallel column descriptors and rows of cells
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataViewTable {
    #[serde(default)]
    pub columns: Vec<DataViewMetadataColumn>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataView {
    #[serde(default)]
    pub metadata: DataViewMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<DataViewTable>,
}

impl DataView {
    /// Rows currently held in the table; 0 when there is no table
    pub fn row_count(&self) -> usize {
        self.table.as_ref().map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn has_more_segments(&self) -> bool {
        self.metadata.segment.is_some()
    }
}

// ============================================================================
// Update Options
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Reason the host is calling `update`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VisualUpdateType {
    All,
    Data,
    Resize,
    ResizeEnd,
    ViewMode,
    Style,
}

impl VisualUpdateType {
    /// Whether the update carries a new or continued dataview
    pub fn is_data(&self) -> bool {
        matches!(self, VisualUpdateType::All | VisualUpdateType::Data)
    }
}

/// Whether a data update starts a new query or continues the current one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    #[default]
    Create,
    Append,
    Segment,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewMode {
    #[default]
    View,
    Edit,
    InFocusEdit,
}

/// One host update event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualUpdateOptions {
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(rename = "type")]
    pub update_type: VisualUpdateType,
    #[serde(default)]
    pub operation_kind: OperationKind,
    #[serde(default)]
    pub data_views: Vec<DataView>,
    #[serde(default)]
    pub view_mode: ViewMode,
    #[serde(default)]
    pub is_in_focus: bool,
    /// Generation of the fetch request this continuation answers, when the host echoes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_generation: Option<u64>,
}

impl VisualUpdateOptions {
    pub fn new(update_type: VisualUpdateType) -> Self {
        Self {
            viewport: Viewport::default(),
            update_type,
            operation_kind: OperationKind::Create,
            data_views: Vec::new(),
            view_mode: ViewMode::View,
            is_in_focus: false,
            fetch_generation: None,
        }
    }

    /// The first (and only supported) dataview
    pub fn data_view(&self) -> Option<&DataView> {
        self.data_views.first()
    }

    pub fn is_edit_mode(&self) -> bool {
        self.view_mode == ViewMode::Edit && self.is_in_focus
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Check that the first dataview has a table and column metadata, and that
/// every required role is carried by at least one column.
pub fn validate_data_view(data_views: &[DataView], required_roles: &[&str]) -> bool {
    let Some(columns) = data_views
        .first()
        .filter(|dv| dv.table.is_some())
        .and_then(|dv| dv.metadata.columns.as_ref())
    else {
        tracing::debug!("Dataview has no table or column metadata");
        return false;
    };

    required_roles.iter().all(|role| {
        let found = columns.iter().any(|c| c.has_role(role));
        if !found {
            tracing::debug!(role = %role, "Required data role is not bound");
        }
        found
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming;
    use serde_json::json;

    fn column(name: &str, roles: Value) -> Value {
        json!({"displayName": name, "roles": roles})
    }

    #[test]
    fn test_deserialize_host_dataview() {
        let dv: DataView = serde_json::from_value(json!({
            "metadata": {
                "columns": [
                    {"displayName": "Region", "roles": {"values": true}, "type": {"text": true}},
                    {"displayName": "Sales", "isMeasure": true, "roles": {"values": true}, "type": {"numeric": true}}
                ],
                "segment": {}
            },
            "table": {
                "columns": [
                    {"displayName": "Region", "roles": {"values": true}},
                    {"displayName": "Sales", "isMeasure": true, "roles": {"values": true}}
                ],
                "rows": [["North", 10], ["South", 20]]
            }
        }))
        .unwrap();

        assert_eq!(dv.row_count(), 2);
        assert!(dv.has_more_segments());
        let columns = dv.metadata.columns.unwrap();
        assert!(columns[1].is_measure);
        assert!(columns[0].value_type.text);
    }

    #[test]
    fn test_deserialize_update_options() {
        let options: VisualUpdateOptions = serde_json::from_value(json!({
            "type": "data",
            "operationKind": "append",
            "viewport": {"width": 400, "height": 300},
            "viewMode": "edit",
            "isInFocus": true
        }))
        .unwrap();
        assert!(options.update_type.is_data());
        assert_eq!(options.operation_kind, OperationKind::Append);
        assert!(options.is_edit_mode());
        assert!(options.data_view().is_none());
    }

    #[test]
    fn test_edit_mode_requires_focus() {
        let mut options = VisualUpdateOptions::new(VisualUpdateType::Resize);
        options.view_mode = ViewMode::Edit;
        assert!(!options.is_edit_mode());
        options.view_mode = ViewMode::InFocusEdit;
        options.is_in_focus = true;
        assert!(!options.is_edit_mode());
    }

    #[test]
    fn test_validate_requires_table_and_columns() {
        assert!(!validate_data_view(&[], naming::REQUIRED_ROLES));

        let no_table: DataView = serde_json::from_value(json!({
            "metadata": {"columns": [column("a", json!({"values": true}))]}
        }))
        .unwrap();
        assert!(!validate_data_view(&[no_table], naming::REQUIRED_ROLES));

        let no_columns: DataView =
            serde_json::from_value(json!({"table": {"rows": []}})).unwrap();
        assert!(!validate_data_view(&[no_columns], naming::REQUIRED_ROLES));
    }

    #[test]
    fn test_validate_requires_roles() {
        let unbound: DataView = serde_json::from_value(json!({
            "metadata": {"columns": [column("a", json!({"values": false}))]},
            "table": {"rows": []}
        }))
        .unwrap();
        assert!(!validate_data_view(&[unbound.clone()], naming::REQUIRED_ROLES));
        assert!(validate_data_view(&[unbound], &[]));

        let bound: DataView = serde_json::from_value(json!({
            "metadata": {"columns": [column("a", json!({})), column("b", json!({"values": true}))]},
            "table": {"rows": []}
        }))
        .unwrap();
        assert!(validate_data_view(&[bound], naming::REQUIRED_ROLES));
    }
}
