//! Grammar providers and structural validation
//!
//! A spec is written in one of two mutually exclusive grammars: Vega (the
//! low-level grammar) or Vega-Lite (the higher-level grammar that compiles to
//! Vega). Compiling and rendering either grammar happens outside this crate;
//! here we only need to decide whether a parsed spec is acceptable before
//! handing it on.
//!
//! # Architecture
//!
//! All validators implement the `GrammarValidator` trait, which provides:
//! - Parsed JSON → accept / reject with a user-facing message
//! - The provider the validator is responsible for
//!
//! The built-in validators (`VegaValidator`, `VegaLiteValidator`) perform the
//! structural checks the real compilers would reject first. An embedding that
//! has access to the real compilers can substitute its own implementation.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{naming, DenebError, Result};

pub mod vega;
pub mod vegalite;

pub use vega::VegaValidator;
pub use vegalite::VegaLiteValidator;

// ============================================================================
// Provider & Render Mode
// ============================================================================

/// Grammar the user's spec is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "vega")]
    Vega,
    #[default]
    #[serde(rename = "vegaLite")]
    VegaLite,
}

impl Provider {
    /// Identifier used in persisted settings (`vega` / `vegaLite`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Vega => "vega",
            Provider::VegaLite => "vegaLite",
        }
    }

    /// Human-readable grammar name
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Vega => "Vega",
            Provider::VegaLite => "Vega-Lite",
        }
    }

    /// Published JSON schema the editor validates against for this grammar
    pub fn schema_url(&self) -> &'static str {
        match self {
            Provider::Vega => naming::VEGA_SCHEMA,
            Provider::VegaLite => naming::VEGA_LITE_SCHEMA,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = DenebError;

    /// Accepts the persisted identifiers plus the kebab-case spelling used on
    /// the command line.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "vega" => Ok(Provider::Vega),
            "vegaLite" | "vega-lite" => Ok(Provider::VegaLite),
            other => Err(DenebError::SettingsError(format!(
                "Unknown grammar provider '{}'",
                other
            ))),
        }
    }
}

/// How the renderer draws into the visual's container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Svg,
    Canvas,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Svg => "svg",
            RenderMode::Canvas => "canvas",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Trait for grammar validators
///
/// Validators decide whether a syntactically valid JSON document is an
/// acceptable spec for their grammar. Only the absence of an error matters;
/// any compiled output is discarded.
pub trait GrammarValidator {
    /// The grammar this validator checks
    fn provider(&self) -> Provider;

    /// Validate a parsed spec
    ///
    /// # Errors
    ///
    /// Returns `DenebError::SpecificationError` carrying the message shown to
    /// the user when the spec is rejected.
    fn validate(&self, spec: &Value) -> Result<()>;
}

/// Matches `https://vega.github.io/schema/<grammar>/v<major>[.minor...].json`
static SCHEMA_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://vega\.github\.io/schema/(vega|vega-lite)/v\d+(\.\d+)*\.json$")
        .expect("schema pattern is a valid regex")
});

/// Determine which grammar a `$schema` URL declares, if it is a recognised one
pub fn schema_provider(schema: &str) -> Option<Provider> {
    SCHEMA_PATTERN
        .captures(schema)
        .and_then(|caps| caps.get(1))
        .map(|grammar| match grammar.as_str() {
            "vega" => Provider::Vega,
            _ => Provider::VegaLite,
        })
}

/// Reject a spec whose `$schema` declares the other grammar.
///
/// Absent or unrecognised `$schema` values are accepted; the structural checks
/// decide those cases.
pub fn check_schema(spec: &Value, provider: Provider) -> Result<()> {
    let Some(schema) = spec.get("$schema").and_then(Value::as_str) else {
        return Ok(());
    };
    match schema_provider(schema) {
        Some(declared) if declared != provider => {
            Err(DenebError::SpecificationError(format!(
                "The $schema '{}' declares a {} specification, but the {} provider is selected",
                schema,
                declared.display_name(),
                provider.display_name()
            )))
        }
        _ => Ok(()),
    }
}

/// Describe a JSON value's kind for error messages
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Shorthand for a rejected spec
pub(crate) fn invalid(message: impl Into<String>) -> DenebError {
    DenebError::SpecificationError(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_serde_names() {
        assert_eq!(serde_json::to_value(Provider::Vega).unwrap(), json!("vega"));
        assert_eq!(
            serde_json::to_value(Provider::VegaLite).unwrap(),
            json!("vegaLite")
        );
        let parsed: Provider = serde_json::from_value(json!("vegaLite")).unwrap();
        assert_eq!(parsed, Provider::VegaLite);
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("vega".parse::<Provider>().unwrap(), Provider::Vega);
        assert_eq!("vegaLite".parse::<Provider>().unwrap(), Provider::VegaLite);
        assert_eq!("vega-lite".parse::<Provider>().unwrap(), Provider::VegaLite);
        assert!("plotly".parse::<Provider>().is_err());
    }

    #[test]
    fn test_render_mode_serde_names() {
        assert_eq!(serde_json::to_value(RenderMode::Svg).unwrap(), json!("svg"));
        let parsed: RenderMode = serde_json::from_value(json!("canvas")).unwrap();
        assert_eq!(parsed, RenderMode::Canvas);
    }

    #[test]
    fn test_schema_provider_detection() {
        assert_eq!(
            schema_provider("https://vega.github.io/schema/vega/v5.json"),
            Some(Provider::Vega)
        );
        assert_eq!(
            schema_provider("https://vega.github.io/schema/vega-lite/v4.17.0.json"),
            Some(Provider::VegaLite)
        );
        assert_eq!(schema_provider("https://example.com/schema.json"), None);
    }

    #[test]
    fn test_check_schema_mismatch() {
        let spec = json!({"$schema": naming::VEGA_SCHEMA, "marks": []});
        let err = check_schema(&spec, Provider::VegaLite).unwrap_err();
        assert!(err.to_string().contains("Vega-Lite provider"));
        assert!(check_schema(&spec, Provider::Vega).is_ok());
    }

    #[test]
    fn test_check_schema_absent_or_unknown() {
        assert!(check_schema(&json!({"mark": "bar"}), Provider::VegaLite).is_ok());
        assert!(check_schema(&json!({"$schema": "local.json"}), Provider::Vega).is_ok());
    }
}
