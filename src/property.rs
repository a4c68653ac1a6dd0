//! Property persistence
//!
//! Builds replace-mutations for one settings property and submits them to
//! the host. A mutation carries the whole object: the properties currently
//! stored for it, with the target property set to the new value.

use std::rc::Rc;

use serde_json::{Map, Value};

use crate::dataview::DataViewObjects;
use crate::host::{VisualHost, VisualObjectInstance, VisualObjectInstancesToPersist};
use crate::render_gate::RenderGate;
use crate::settings::VisualSettings;
use crate::{naming, DenebError, Result};

/// A ready-to-submit mutation and the compiled-in default for the property
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPropertyResolution {
    pub properties: VisualObjectInstancesToPersist,
    pub default_value: Value,
}

pub struct PropertyService {
    host: Rc<dyn VisualHost>,
    gate: Rc<RenderGate>,
    objects: DataViewObjects,
}

impl PropertyService {
    pub fn new(host: Rc<dyn VisualHost>, gate: Rc<RenderGate>) -> Self {
        Self {
            host,
            gate,
            objects: DataViewObjects::new(),
        }
    }

    /// Replace the stored objects with the latest ones from the host
    pub fn set_objects(&mut self, objects: DataViewObjects) {
        self.objects = objects;
    }

    pub fn objects(&self) -> &DataViewObjects {
        &self.objects
    }

    /// Build a mutation setting `object.property` to `value`, or to its
    /// compiled-in default when no value is given.
    ///
    /// # Errors
    ///
    /// Returns `DenebError::PersistenceError` when the object or property is
    /// not part of the visual's settings.
    pub fn get_object_property_for_value(
        &self,
        object_name: &str,
        property_name: &str,
        value: Option<Value>,
    ) -> Result<ObjectPropertyResolution> {
        let qualified = naming::qualified_property(object_name, property_name);
        let default_value = VisualSettings::default_property(object_name, property_name)
            .ok_or_else(|| {
                let e = DenebError::PersistenceError(format!("Unknown property '{}'", qualified));
                tracing::error!(property = %qualified, "{}", e);
                e
            })?;

        let mut properties: Map<String, Value> =
            self.objects.get(object_name).cloned().unwrap_or_default();
        properties.insert(
            property_name.to_string(),
            value.unwrap_or_else(|| default_value.clone()),
        );
        tracing::debug!(property = %qualified, "Resolved object properties");

        Ok(ObjectPropertyResolution {
            properties: VisualObjectInstancesToPersist {
                replace: vec![VisualObjectInstance::new(object_name, properties)],
            },
            default_value,
        })
    }

    /// Submit a mutation. Persisted settings can change the output, so this
    /// also marks the render gate.
    pub fn update_object_properties(&self, changes: &VisualObjectInstancesToPersist) {
        let _span = tracing::info_span!("persist", objects = changes.replace.len()).entered();
        self.gate.register_persist();
        self.host.persist_properties(changes);
    }

    /// Resolve and submit in one step, logging rather than propagating a failure
    pub fn persist_value(&self, object_name: &str, property_name: &str, value: Option<Value>) {
        match self.get_object_property_for_value(object_name, property_name, value) {
            Ok(resolution) => self.update_object_properties(&resolution.properties),
            Err(e) => tracing::warn!(error = %e, "Property was not persisted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::RecordingHost;
    use serde_json::json;

    fn service(host: &Rc<RecordingHost>, gate: &Rc<RenderGate>) -> PropertyService {
        PropertyService::new(host.clone(), gate.clone())
    }

    #[test]
    fn test_resolution_seeds_from_stored_object() {
        let host = Rc::new(RecordingHost::new());
        let gate = Rc::new(RenderGate::new());
        let mut property = service(&host, &gate);
        let objects: DataViewObjects = serde_json::from_value(json!({
            "vega": {"provider": "vega", "jsonSpec": "{}"}
        }))
        .unwrap();
        property.set_objects(objects);

        let resolution = property
            .get_object_property_for_value("vega", "jsonSpec", Some(json!("{\"marks\": []}")))
            .unwrap();
        let instance = &resolution.properties.replace[0];
        assert_eq!(instance.object_name, "vega");
        assert_eq!(instance.selector, None);
        assert_eq!(instance.properties["provider"], json!("vega"));
        assert_eq!(instance.properties["jsonSpec"], json!("{\"marks\": []}"));
        assert_eq!(
            resolution.default_value,
            json!(VisualSettings::default().vega.json_spec)
        );
    }

    #[test]
    fn test_missing_value_uses_default() {
        let host = Rc::new(RecordingHost::new());
        let gate = Rc::new(RenderGate::new());
        let property = service(&host, &gate);
        let resolution = property
            .get_object_property_for_value("vega", "autoSave", None)
            .unwrap();
        assert_eq!(
            resolution.properties.replace[0].properties["autoSave"],
            json!(false)
        );
    }

    #[test]
    fn test_unknown_object_is_an_error() {
        let host = Rc::new(RecordingHost::new());
        let gate = Rc::new(RenderGate::new());
        let property = service(&host, &gate);
        let err = property
            .get_object_property_for_value("general", "jsonSpec", None)
            .unwrap_err();
        assert!(matches!(err, DenebError::PersistenceError(_)));
        assert!(err.message().contains("general.jsonSpec"));
    }

    #[test]
    fn test_update_dirties_gate_and_reaches_host() {
        let host = Rc::new(RecordingHost::new());
        let gate = Rc::new(RenderGate::new());
        let property = service(&host, &gate);
        gate.request_render();

        let resolution = property
            .get_object_property_for_value("vega", "autoSave", Some(json!(true)))
            .unwrap();
        property.update_object_properties(&resolution.properties);

        assert!(gate.request_render());
        assert_eq!(host.last_persisted("vega", "autoSave"), Some(json!(true)));
    }

    #[test]
    fn test_persist_value_swallows_unknown_property() {
        let host = Rc::new(RecordingHost::new());
        let gate = Rc::new(RenderGate::new());
        let property = service(&host, &gate);
        gate.request_render();
        property.persist_value("vega", "colour", Some(json!("red")));
        assert!(host.persisted.borrow().is_empty());
        assert!(!gate.request_render());
    }
}
