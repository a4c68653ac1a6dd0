//! Centralized names shared between the visual and its host.
//!
//! The host stores report settings as an opaque bag of objects, each holding
//! named properties. The same identifiers are used when reading settings,
//! enumerating the property pane and persisting editor content, so they live
//! here rather than being repeated as string literals.
//!
//! # Categories
//!
//! - **Data roles**: Role names declared on dataview columns (`values`)
//! - **Dataset**: Name of the dataset the spec templates bind to (`values`)
//! - **Objects**: Settings object names (`vega`, `dataLimit`, `vegaLiteTopLevelConfig`)
//! - **Properties**: Property names within those objects
//! - **Schemas**: Published JSON schema locations for each grammar

use const_format::concatcp;

// ============================================================================
// Data Roles
// ============================================================================

/// Role carried by every column whose values are copied into dataset rows
pub const VALUES_ROLE: &str = "values";

/// Roles that must be present on at least one column for the dataview to be usable
pub const REQUIRED_ROLES: &[&str] = &[VALUES_ROLE];

/// Name the spec templates use to reference the bound dataset.
///
/// Matches the data role name, so that `{"data": {"name": "values"}}` in a
/// user's spec resolves to the mapped rows.
pub const DATASET_NAME: &str = VALUES_ROLE;

// ============================================================================
// Settings Objects
// ============================================================================

/// Object holding the grammar settings (spec text, provider, render mode, auto-save)
pub const VEGA_OBJECT: &str = "vega";

/// Object holding the data reduction override settings
pub const DATA_LIMIT_OBJECT: &str = "dataLimit";

/// Object holding report-level theme knobs merged beneath the user's spec
pub const TOP_LEVEL_CONFIG_OBJECT: &str = "vegaLiteTopLevelConfig";

// ============================================================================
// Settings Properties
// ============================================================================

/// `vega.jsonSpec` - the entire user specification as text
pub const JSON_SPEC_PROPERTY: &str = "jsonSpec";

/// `vega.provider` - `vega` or `vegaLite`
pub const PROVIDER_PROPERTY: &str = "provider";

/// `vega.renderMode` - `svg` or `canvas`
pub const RENDER_MODE_PROPERTY: &str = "renderMode";

/// `vega.autoSave` - persist on every edit rather than on Apply
pub const AUTO_SAVE_PROPERTY: &str = "autoSave";

/// `dataLimit.enabled`
pub const ENABLED_PROPERTY: &str = "enabled";

/// `dataLimit.override` - allow fetching past the host's data reduction window
pub const OVERRIDE_PROPERTY: &str = "override";

/// `dataLimit.showCustomVisualNotes`
pub const SHOW_NOTES_PROPERTY: &str = "showCustomVisualNotes";

/// `vegaLiteTopLevelConfig.padding`
pub const PADDING_PROPERTY: &str = "padding";

// ============================================================================
// Grammar Schemas
// ============================================================================

/// Base location of the published grammar schemas
const SCHEMA_BASE: &str = "https://vega.github.io/schema/";

/// Schema URL written into the Vega template: `https://vega.github.io/schema/vega/v5.json`
pub const VEGA_SCHEMA: &str = concatcp!(SCHEMA_BASE, "vega/v5.json");

/// Schema URL written into the Vega-Lite template: `https://vega.github.io/schema/vega-lite/v4.json`
pub const VEGA_LITE_SCHEMA: &str = concatcp!(SCHEMA_BASE, "vega-lite/v4.json");

// ============================================================================
// Localisation Keys
// ============================================================================

/// Completer caption for measures
pub const COMPLETER_MEASURE_KEY: &str = "Completer_Cap_Measure";

/// Completer caption for columns
pub const COMPLETER_COLUMN_KEY: &str = "Completer_Cap_Column";

/// Completer qualifier for generated raw values
pub const COMPLETER_RAW_KEY: &str = "Completer_Cap_Raw";

/// Format a fully qualified `object.property` name for log and error messages.
pub fn qualified_property(object_name: &str, property_name: &str) -> String {
    format!("{}.{}", object_name, property_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_urls() {
        assert_eq!(VEGA_SCHEMA, "https://vega.github.io/schema/vega/v5.json");
        assert_eq!(
            VEGA_LITE_SCHEMA,
            "https://vega.github.io/schema/vega-lite/v4.json"
        );
    }

    #[test]
    fn test_dataset_name_matches_values_role() {
        assert!(REQUIRED_ROLES.contains(&VALUES_ROLE));
        assert_eq!(DATASET_NAME, "values");
    }

    #[test]
    fn test_qualified_property() {
        assert_eq!(
            qualified_property(VEGA_OBJECT, JSON_SPEC_PROPERTY),
            "vega.jsonSpec"
        );
    }
}
