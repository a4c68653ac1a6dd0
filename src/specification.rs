//! Specification service
//!
//! Owns the result of parsing the user's spec text. Every parse starts from
//! scratch and produces a fresh [`CompiledSpec`]: either the parsed JSON, or
//! the message explaining why it was rejected. The raw text is always kept so
//! the editor can keep showing exactly what the user wrote.

use serde::Serialize;
use serde_json::{json, Value};

use crate::config;
use crate::editor::EditorService;
use crate::grammar::{GrammarValidator, Provider, VegaLiteValidator, VegaValidator};
use crate::property::PropertyService;
use crate::settings::VisualSettings;
use crate::{naming, DenebError, Result};

/// Outcome of one parse attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledSpec {
    pub is_valid: bool,
    pub spec: Option<Value>,
    pub raw_spec: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompiledSpec {
    fn valid(spec: Value, raw_spec: &str) -> Self {
        Self {
            is_valid: true,
            spec: Some(spec),
            raw_spec: raw_spec.to_string(),
            error: None,
        }
    }

    fn invalid(raw_spec: &str, error: String) -> Self {
        Self {
            is_valid: false,
            spec: None,
            raw_spec: raw_spec.to_string(),
            error: Some(error),
        }
    }
}

pub struct SpecificationService {
    vega: Box<dyn GrammarValidator>,
    vega_lite: Box<dyn GrammarValidator>,
    spec: Option<CompiledSpec>,
}

impl Default for SpecificationService {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecificationService {
    /// Service using the built-in structural validators
    pub fn new() -> Self {
        Self::with_validators(Box::new(VegaValidator::new()), Box::new(VegaLiteValidator::new()))
    }

    /// Service delegating grammar validation to the given validators
    pub fn with_validators(
        vega: Box<dyn GrammarValidator>,
        vega_lite: Box<dyn GrammarValidator>,
    ) -> Self {
        Self {
            vega,
            vega_lite,
            spec: None,
        }
    }

    /// Result of the most recent parse, if any
    pub fn spec(&self) -> Option<&CompiledSpec> {
        self.spec.as_ref()
    }

    /// Parse `text` as a spec for `provider`, replacing the previous result
    pub fn parse(&mut self, text: &str, provider: Provider) -> &CompiledSpec {
        let _span = tracing::debug_span!("parse_spec", provider = %provider).entered();
        let compiled = match self.compile(text, provider) {
            Ok(spec) => CompiledSpec::valid(spec, text),
            Err(message) => {
                tracing::debug!(error = %message, "Specification is invalid");
                CompiledSpec::invalid(text, message)
            }
        };
        self.spec.insert(compiled)
    }

    fn compile(&self, text: &str, provider: Provider) -> std::result::Result<Value, String> {
        let parsed: Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
        let validator = match provider {
            Provider::Vega => &self.vega,
            Provider::VegaLite => &self.vega_lite,
        };
        validator
            .validate(&parsed)
            .map_err(|e| e.message().to_string())?;
        Ok(parsed)
    }

    /// Pretty-printed template for a persisted provider name; `{}` when the
    /// name is not recognised
    pub fn get_default_spec(provider: &str) -> String {
        match provider.parse::<Provider>() {
            Ok(provider) => Self::default_spec(provider),
            Err(_) => "{}".to_string(),
        }
    }

    pub fn default_spec(provider: Provider) -> String {
        config::to_pretty_json(&config::template(provider))
    }

    /// Base config merged beneath the user's spec when rendering
    pub fn get_initial_config(settings: &VisualSettings) -> Value {
        let top_level = &settings.vega_lite_top_level_config;
        json!({
            "background": top_level.background,
            "font": top_level.font,
            "padding": top_level.padding
        })
    }

    /// Write the editor's text to `vega.jsonSpec`, then mark the editor
    /// clean and give it focus back.
    ///
    /// # Errors
    ///
    /// Returns an error when no editor is attached or the property cannot be
    /// resolved; nothing is persisted in either case.
    pub fn persist(&self, property: &PropertyService, editor: &mut EditorService) -> Result<()> {
        let text = editor
            .get_text()
            .ok_or_else(|| DenebError::InternalError("No editor is attached".to_string()))?;
        let resolution = property.get_object_property_for_value(
            naming::VEGA_OBJECT,
            naming::JSON_SPEC_PROPERTY,
            Some(Value::String(text.clone())),
        )?;
        property.update_object_properties(&resolution.properties);
        editor.resolve_dirty_status(Some(&text));
        editor.focus();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use crate::editor::TextBuffer;
    use crate::host::testing::RecordingHost;
    use crate::render_gate::RenderGate;

    #[test]
    fn test_syntax_error() {
        let mut service = SpecificationService::new();
        let spec = service.parse("{not json", Provider::Vega).clone();
        assert!(!spec.is_valid);
        assert_eq!(spec.spec, None);
        assert_eq!(spec.raw_spec, "{not json");
        assert!(spec.error.unwrap().contains("line 1"));
    }

    #[test]
    fn test_valid_vega_lite() {
        let mut service = SpecificationService::new();
        let text = r#"{"mark": "bar", "encoding": {"x": {"field": "a", "type": "quantitative"}}}"#;
        let spec = service.parse(text, Provider::VegaLite);
        assert!(spec.is_valid);
        assert_eq!(spec.error, None);
        assert_eq!(spec.spec.as_ref().unwrap()["mark"], json!("bar"));
        assert_eq!(spec.raw_spec, text);
    }

    #[test]
    fn test_grammar_rejection_keeps_raw_text() {
        let mut service = SpecificationService::new();
        let text = r#"{"mark": "pie"}"#;
        let spec = service.parse(text, Provider::VegaLite);
        assert!(!spec.is_valid);
        assert_eq!(spec.spec, None);
        assert_eq!(spec.raw_spec, text);
        assert_eq!(spec.error.as_deref(), Some("Invalid mark type \"pie\""));
    }

    #[test]
    fn test_default_specs_round_trip() {
        let mut service = SpecificationService::new();
        for provider in [Provider::Vega, Provider::VegaLite] {
            let text = SpecificationService::default_spec(provider);
            assert!(service.parse(&text, provider).is_valid, "{}", provider);
        }
    }

    #[test]
    fn test_default_spec_by_name() {
        let text = SpecificationService::get_default_spec("vegaLite");
        assert!(text.starts_with("{\n    \"$schema\""));
        assert!(SpecificationService::get_default_spec("vega").contains("xscale"));
        assert_eq!(SpecificationService::get_default_spec("plotly"), "{}");
    }

    #[test]
    fn test_parse_replaces_previous_result() {
        let mut service = SpecificationService::new();
        service.parse("{}", Provider::Vega);
        assert!(service.spec().unwrap().is_valid);
        service.parse("[", Provider::Vega);
        assert!(!service.spec().unwrap().is_valid);
    }

    #[test]
    fn test_initial_config() {
        let mut settings = VisualSettings::default();
        settings.vega_lite_top_level_config.padding = 4.0;
        let config = SpecificationService::get_initial_config(&settings);
        assert_eq!(config["background"], json!("white"));
        assert_eq!(config["padding"], json!(4.0));
        assert!(config["font"].as_str().unwrap().starts_with("\"Segoe UI\""));
    }

    #[test]
    fn test_custom_validator() {
        struct RejectAll;
        impl GrammarValidator for RejectAll {
            fn provider(&self) -> Provider {
                Provider::Vega
            }
            fn validate(&self, _spec: &Value) -> Result<()> {
                Err(DenebError::SpecificationError("rejected".to_string()))
            }
        }

        let mut service = SpecificationService::with_validators(
            Box::new(RejectAll),
            Box::new(VegaLiteValidator::new()),
        );
        assert_eq!(
            service.parse("{}", Provider::Vega).error.as_deref(),
            Some("rejected")
        );
    }

    #[test]
    fn test_persist_writes_editor_text() {
        let host = Rc::new(RecordingHost::new());
        let gate = Rc::new(RenderGate::new());
        let property = PropertyService::new(host.clone(), gate.clone());
        let buffer = TextBuffer::new("{\"marks\": []}");
        let mut editor = EditorService::new();
        editor.attach(Box::new(buffer.clone()));

        SpecificationService::new()
            .persist(&property, &mut editor)
            .unwrap();

        assert_eq!(
            host.last_persisted("vega", "jsonSpec"),
            Some(json!("{\"marks\": []}"))
        );
        assert!(!editor.is_dirty());
        assert_eq!(buffer.focus_count(), 1);
    }

    #[test]
    fn test_persist_without_editor() {
        let host = Rc::new(RecordingHost::new());
        let property = PropertyService::new(host.clone(), Rc::new(RenderGate::new()));
        let mut editor = EditorService::new();
        assert!(SpecificationService::new()
            .persist(&property, &mut editor)
            .is_err());
        assert!(host.persisted.borrow().is_empty());
    }
}
