//! Vega-Lite structural validation
//!
//! Accepts a spec when it is a unit view (`mark`) or one of the view
//! compositions, recursively:
//!
//! - `layer` → array of unit or layer specs
//! - `concat` / `hconcat` / `vconcat` → array of specs
//! - `facet` / `repeat` → inner `spec`
//!
//! Mark, encoding, data and transform shapes are checked on every unit view.

use serde_json::{Map, Value};

use super::{check_schema, invalid, kind_of, GrammarValidator, Provider};
use crate::Result;

/// Mark types understood by Vega-Lite
const MARK_TYPES: &[&str] = &[
    "arc", "area", "bar", "boxplot", "circle", "errorband", "errorbar", "geoshape", "image",
    "line", "point", "rect", "rule", "square", "text", "tick", "trail",
];

/// Encoding field types
const FIELD_TYPES: &[&str] = &["quantitative", "ordinal", "nominal", "temporal", "geojson"];

/// Composition operators holding an array of child specs
const ARRAY_COMPOSITIONS: &[&str] = &["layer", "concat", "hconcat", "vconcat"];

/// Composition operators wrapping a single inner `spec`
const WRAPPING_COMPOSITIONS: &[&str] = &["facet", "repeat"];

/// Structural validator for Vega-Lite specs
#[derive(Debug, Default, Clone)]
pub struct VegaLiteValidator;

impl VegaLiteValidator {
    pub fn new() -> Self {
        Self
    }

    fn validate_view(&self, spec: &Value, path: &str) -> Result<()> {
        let obj = spec.as_object().ok_or_else(|| {
            invalid(format!(
                "Invalid spec at {}: expected an object but found {}",
                path,
                kind_of(spec)
            ))
        })?;

        self.validate_common(obj, path)?;

        for op in ARRAY_COMPOSITIONS {
            if let Some(children) = obj.get(*op) {
                let children = children.as_array().ok_or_else(|| {
                    invalid(format!("\"{}\" at {} must be an array of specs", op, path))
                })?;
                for (idx, child) in children.iter().enumerate() {
                    self.validate_view(child, &format!("{}.{}[{}]", path, op, idx))?;
                }
                return Ok(());
            }
        }

        for op in WRAPPING_COMPOSITIONS {
            if obj.contains_key(*op) {
                let inner = obj.get("spec").ok_or_else(|| {
                    invalid(format!(
                        "\"{}\" at {} requires an inner \"spec\" to repeat",
                        op, path
                    ))
                })?;
                return self.validate_view(inner, &format!("{}.spec", path));
            }
        }

        match obj.get("mark") {
            Some(mark) => {
                self.validate_mark(mark, path)?;
                if let Some(encoding) = obj.get("encoding") {
                    self.validate_encoding(encoding, path)?;
                }
                Ok(())
            }
            None => Err(invalid(format!("Invalid spec {}", Value::Object(obj.clone())))),
        }
    }

    fn validate_common(&self, obj: &Map<String, Value>, path: &str) -> Result<()> {
        if let Some(data) = obj.get("data") {
            if !(data.is_object() || data.is_null()) {
                return Err(invalid(format!(
                    "\"data\" at {} must be an object but found {}",
                    path,
                    kind_of(data)
                )));
            }
        }
        if let Some(transform) = obj.get("transform") {
            if !transform.is_array() {
                return Err(invalid(format!(
                    "\"transform\" at {} must be an array but found {}",
                    path,
                    kind_of(transform)
                )));
            }
        }
        Ok(())
    }

    fn validate_mark(&self, mark: &Value, path: &str) -> Result<()> {
        let mark_type = match mark {
            Value::String(s) => s.as_str(),
            Value::Object(def) => def.get("type").and_then(Value::as_str).ok_or_else(|| {
                invalid(format!("Mark definition at {} is missing a \"type\"", path))
            })?,
            other => {
                return Err(invalid(format!(
                    "Mark at {} must be a string or an object but found {}",
                    path,
                    kind_of(other)
                )))
            }
        };
        if !MARK_TYPES.contains(&mark_type) {
            return Err(invalid(format!("Invalid mark type \"{}\"", mark_type)));
        }
        Ok(())
    }

    fn validate_encoding(&self, encoding: &Value, path: &str) -> Result<()> {
        let channels = encoding.as_object().ok_or_else(|| {
            invalid(format!(
                "\"encoding\" at {} must be an object but found {}",
                path,
                kind_of(encoding)
            ))
        })?;

        for (channel, def) in channels {
            match def {
                Value::Object(field_def) => self.validate_field_def(channel, field_def)?,
                Value::Array(defs) => {
                    for d in defs {
                        let field_def = d.as_object().ok_or_else(|| {
                            invalid(format!(
                                "Channel \"{}\" entries must be objects but found {}",
                                channel,
                                kind_of(d)
                            ))
                        })?;
                        self.validate_field_def(channel, field_def)?;
                    }
                }
                other => {
                    return Err(invalid(format!(
                        "Channel \"{}\" must be a field or value definition but found {}",
                        channel,
                        kind_of(other)
                    )))
                }
            }
        }
        Ok(())
    }

    fn validate_field_def(&self, channel: &str, def: &Map<String, Value>) -> Result<()> {
        if let Some(field_type) = def.get("type") {
            let valid = field_type
                .as_str()
                .map(|t| FIELD_TYPES.contains(&t))
                .unwrap_or(false);
            if !valid {
                return Err(invalid(format!(
                    "Invalid field type {} for channel \"{}\"",
                    field_type, channel
                )));
            }
        }
        Ok(())
    }
}

impl GrammarValidator for VegaLiteValidator {
    fn provider(&self) -> Provider {
        Provider::VegaLite
    }

    fn validate(&self, spec: &Value) -> Result<()> {
        check_schema(spec, Provider::VegaLite)?;
        self.validate_view(spec, "root")
    }
}
