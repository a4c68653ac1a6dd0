//! Vega structural validation
//!
//! Vega specs are a tree of scopes: the top level, and every `group` mark
//! beneath it. Each scope may declare data sets and scales, and references
//! from marks, scale domains, axes and legends resolve against the current
//! scope first, then each enclosing scope.

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::{check_schema, invalid, kind_of, GrammarValidator, Provider};
use crate::Result;

/// Mark types understood by Vega
const MARK_TYPES: &[&str] = &[
    "arc", "area", "group", "image", "line", "path", "rect", "rule", "shape", "symbol", "text",
    "trail",
];

/// Scale types understood by Vega
const SCALE_TYPES: &[&str] = &[
    "identity", "linear", "log", "pow", "sqrt", "symlog", "time", "utc", "sequential",
    "diverging", "quantile", "quantize", "threshold", "ordinal", "band", "point", "bin-ordinal",
];

/// Axis orientations
const AXIS_ORIENTS: &[&str] = &["left", "right", "top", "bottom"];

/// Top-level (and group-level) properties that must be arrays when present
const ARRAY_PROPERTIES: &[&str] = &[
    "data", "scales", "axes", "legends", "marks", "signals", "projections",
];

/// Names declared in one scope
#[derive(Debug, Default)]
struct Scope {
    data: HashSet<String>,
    scales: HashSet<String>,
}

/// Structural validator for Vega specs
#[derive(Debug, Default, Clone)]
pub struct VegaValidator;

impl VegaValidator {
    pub fn new() -> Self {
        Self
    }

    fn validate_scope(&self, obj: &Map<String, Value>, scopes: &mut Vec<Scope>) -> Result<()> {
        for prop in ARRAY_PROPERTIES {
            if let Some(value) = obj.get(*prop) {
                if !value.is_array() {
                    return Err(invalid(format!(
                        "\"{}\" must be an array but found {}",
                        prop,
                        kind_of(value)
                    )));
                }
            }
        }

        scopes.push(Scope::default());

        for entry in array_entries(obj, "signals") {
            required_name(entry, "Signal")?;
        }

        for entry in array_entries(obj, "data") {
            let name = required_name(entry, "Data set")?;
            if let Some(source) = entry.get("source").and_then(Value::as_str) {
                resolve_data(scopes, source)?;
            }
            if !declare(scopes, |scope| scope.data.insert(name.to_string())) {
                return Err(invalid(format!("Duplicate data set name: \"{}\"", name)));
            }
        }

        for entry in array_entries(obj, "scales") {
            let name = required_name(entry, "Scale")?;
            if let Some(scale_type) = entry.get("type") {
                let known = scale_type
                    .as_str()
                    .map(|t| SCALE_TYPES.contains(&t))
                    .unwrap_or(false);
                if !known {
                    return Err(invalid(format!("Unrecognized scale type: {}", scale_type)));
                }
            }
            if let Some(data) = entry
                .get("domain")
                .and_then(|d| d.get("data"))
                .and_then(Value::as_str)
            {
                resolve_data(scopes, data)?;
            }
            if !declare(scopes, |scope| scope.scales.insert(name.to_string())) {
                return Err(invalid(format!("Duplicate scale name: \"{}\"", name)));
            }
        }

        for axis in array_entries(obj, "axes") {
            let scale = axis
                .get("scale")
                .and_then(Value::as_str)
                .ok_or_else(|| invalid("Missing axis scale"))?;
            resolve_scale(scopes, scale)?;
            let orient = axis.get("orient").and_then(Value::as_str).unwrap_or("");
            if !AXIS_ORIENTS.contains(&orient) {
                return Err(invalid(format!(
                    "Invalid axis orient \"{}\" for scale \"{}\"",
                    orient, scale
                )));
            }
        }

        for legend in array_entries(obj, "legends") {
            for channel in ["fill", "stroke", "size", "shape", "opacity", "strokeDash"] {
                if let Some(scale) = legend.get(channel).and_then(Value::as_str) {
                    resolve_scale(scopes, scale)?;
                }
            }
        }

        for mark in array_entries(obj, "marks") {
            self.validate_mark(mark, scopes)?;
        }

        scopes.pop();
        Ok(())
    }

    fn validate_mark(&self, mark: &Value, scopes: &mut Vec<Scope>) -> Result<()> {
        let def = mark
            .as_object()
            .ok_or_else(|| invalid(format!("Mark must be an object but found {}", kind_of(mark))))?;
        let mark_type = def.get("type").and_then(Value::as_str).unwrap_or("");
        if !MARK_TYPES.contains(&mark_type) {
            return Err(invalid(format!("Unrecognized mark type: \"{}\"", mark_type)));
        }
        if let Some(data) = def
            .get("from")
            .and_then(|f| f.get("data"))
            .and_then(Value::as_str)
        {
            resolve_data(scopes, data)?;
        }
        if mark_type == "group" {
            self.validate_scope(def, scopes)?;
        }
        Ok(())
    }
}

impl GrammarValidator for VegaValidator {
    fn provider(&self) -> Provider {
        Provider::Vega
    }

    fn validate(&self, spec: &Value) -> Result<()> {
        let obj = spec.as_object().ok_or_else(|| {
            invalid(format!(
                "Vega spec must be an object but found {}",
                kind_of(spec)
            ))
        })?;
        check_schema(spec, Provider::Vega)?;
        self.validate_scope(obj, &mut Vec::new())
    }
}

/// Entries of an optional array property; shape was checked by the caller
fn array_entries<'a>(obj: &'a Map<String, Value>, key: &str) -> impl Iterator<Item = &'a Value> {
    obj.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn required_name<'a>(entry: &'a Value, what: &str) -> Result<&'a str> {
    entry
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(format!("{} definition is missing a name: {}", what, entry)))
}

/// Record a name in the innermost scope; false when it was already declared there
fn declare(scopes: &mut [Scope], insert: impl FnOnce(&mut Scope) -> bool) -> bool {
    scopes.last_mut().map(insert).unwrap_or(false)
}

fn resolve_data(scopes: &[Scope], name: &str) -> Result<()> {
    if scopes.iter().rev().any(|s| s.data.contains(name)) {
        Ok(())
    } else {
        Err(invalid(format!("Undefined data set name: \"{}\"", name)))
    }
}

fn resolve_scale(scopes: &[Scope], name: &str) -> Result<()> {
    if scopes.iter().rev().any(|s| s.scales.contains(name)) {
        Ok(())
    } else {
        Err(invalid(format!("Unrecognized scale name: \"{}\"", name)))
    }
}
