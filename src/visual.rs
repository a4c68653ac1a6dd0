//! Host entry point
//!
//! [`Visual`] is what the host constructs and calls. It owns the orchestrator
//! and the mounted presentation root, and is the only place where failures
//! from an update are observed: errors and panics alike are logged and
//! reported to the host instead of escaping into it.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::config::VisualConfiguration;
use crate::dataview::VisualUpdateOptions;
use crate::host::{VisualHost, VisualObjectInstance};
use crate::interface::{GrammarRenderer, MainInterface, MainView};
use crate::service::{VisualService, VisualState};
use crate::settings::VisualSettings;
use crate::specification::SpecificationService;
use crate::Result;

pub struct Visual {
    host: Rc<dyn VisualHost>,
    interface: MainInterface,
    service: VisualService,
}

impl Visual {
    pub fn new(host: Rc<dyn VisualHost>, configuration: VisualConfiguration) -> Self {
        let _span = tracing::info_span!("visual_init", name = configuration.metadata.name).entered();
        let service = VisualService::new(host.clone(), configuration);
        let interface = MainInterface::mount(service.interface());
        tracing::info!("Visual constructed");
        Self {
            host,
            interface,
            service,
        }
    }

    /// Replace the grammar validators used for spec parsing
    pub fn with_specification(mut self, specification: SpecificationService) -> Self {
        self.service = self.service.with_specification(specification);
        self
    }

    pub fn service(&self) -> &VisualService {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut VisualService {
        &mut self.service
    }

    pub fn interface(&self) -> &MainInterface {
        &self.interface
    }

    pub fn state(&self) -> VisualState {
        self.service.state()
    }

    /// Handle one host update. Never fails and never panics outward; the
    /// outcome is reported through the host's rendering events.
    pub fn update(&mut self, options: &VisualUpdateOptions) {
        let _span = tracing::info_span!("visual_update", update_type = ?options.update_type)
            .entered();
        self.host.rendering_started(options);

        let service = &mut self.service;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            // Updates without a dataview (e.g. a bare resize) keep the current
            // settings, and so do updates whose data is superseded
            let is_stale = service.is_stale_update(options);
            if let Some(data_view) = options.data_view().filter(|_| !is_stale) {
                service.set_settings(VisualSettings::parse(Some(data_view)));
            }
            service.resolve_update_options(options)
        }));

        match outcome {
            Ok(Ok(())) => self.host.rendering_finished(options),
            Ok(Err(e)) => {
                tracing::error!(error = %e, state = ?self.service.state(), "Update failed");
                self.host.rendering_failed(options, &e.to_string());
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                tracing::error!(reason = %reason, "Update panicked");
                self.host.rendering_failed(options, &reason);
            }
        }
    }

    /// Property-pane instances for `object_name`
    pub fn enumerate_object_instances(&self, object_name: &str) -> Vec<VisualObjectInstance> {
        self.service.settings().enumerate_object_instances(
            object_name,
            &self.service.configuration().features,
        )
    }

    /// One candidate paint; see [`MainInterface::paint`]
    pub fn paint(&self, renderer: &mut dyn GrammarRenderer) -> Result<Option<MainView>> {
        self.interface.paint(&self.service, renderer)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataview::{DataView, OperationKind, Viewport, VisualUpdateType};
    use crate::grammar::{GrammarValidator, Provider, VegaValidator};
    use crate::host::testing::RecordingHost;
    use crate::interface::{RenderRequest, RenderView};
    use crate::tooltip::TooltipHandler;
    use serde_json::{json, Value};

    #[derive(Default)]
    struct CapturingRenderer {
        requests: Vec<RenderRequest>,
    }

    impl GrammarRenderer for CapturingRenderer {
        fn render(&mut self, request: &RenderRequest, _tooltip: &TooltipHandler) -> Result<()> {
            self.requests.push(request.clone());
            Ok(())
        }
    }

    fn data_update(objects: Value) -> VisualUpdateOptions {
        let dv: DataView = serde_json::from_value(json!({
            "metadata": {
                "columns": [
                    {"displayName": "category", "roles": {"values": true}},
                    {"displayName": "measure", "isMeasure": true, "roles": {"values": true}}
                ],
                "objects": objects
            },
            "table": {
                "columns": [
                    {"displayName": "category", "roles": {"values": true}},
                    {"displayName": "measure", "isMeasure": true, "roles": {"values": true}}
                ],
                "rows": [["A", 28], ["B", 55]]
            }
        }))
        .unwrap();
        let mut options = VisualUpdateOptions::new(VisualUpdateType::Data);
        options.operation_kind = OperationKind::Create;
        options.viewport = Viewport {
            width: 400.0,
            height: 300.0,
        };
        options.data_views = vec![dv];
        options
    }

    #[test]
    fn test_update_reports_lifecycle() {
        let host = Rc::new(RecordingHost::new());
        let mut visual = Visual::new(host.clone(), VisualConfiguration::default());
        visual.update(&data_update(json!({})));

        assert_eq!(visual.state(), VisualState::Processed);
        assert_eq!(
            host.events.borrow().as_slice(),
            &["started".to_string(), "finished".to_string()]
        );
    }

    #[test]
    fn test_update_applies_stored_settings() {
        let host = Rc::new(RecordingHost::new());
        let mut visual = Visual::new(host.clone(), VisualConfiguration::default());
        let spec = SpecificationService::default_spec(Provider::Vega);
        visual.update(&data_update(json!({
            "vega": {"provider": "vega", "jsonSpec": spec}
        })));

        assert_eq!(visual.service().settings().vega.provider, Provider::Vega);
        assert!(visual.service().spec().unwrap().is_valid);

        // A resize without a dataview keeps the stored settings
        visual.update(&VisualUpdateOptions::new(VisualUpdateType::Resize));
        assert_eq!(visual.service().settings().vega.provider, Provider::Vega);
    }

    #[test]
    fn test_error_is_reported_not_raised() {
        let host = Rc::new(RecordingHost::new());
        let mut visual = Visual::new(host.clone(), VisualConfiguration::default());
        visual.update(&data_update(json!({})));

        let mut broken = data_update(json!({}));
        broken.operation_kind = OperationKind::Append;
        broken.data_views[0].table = None;
        visual.update(&broken);

        let events = host.events.borrow();
        assert!(events
            .last()
            .unwrap()
            .starts_with("failed: Dataview error:"));
        assert_eq!(visual.state(), VisualState::Processed);
    }

    #[test]
    fn test_panic_is_contained() {
        struct Exploding;
        impl GrammarValidator for Exploding {
            fn provider(&self) -> Provider {
                Provider::VegaLite
            }
            fn validate(&self, _spec: &Value) -> Result<()> {
                panic!("validator exploded");
            }
        }

        let host = Rc::new(RecordingHost::new());
        let mut visual = Visual::new(host.clone(), VisualConfiguration::default())
            .with_specification(SpecificationService::with_validators(
                Box::new(VegaValidator::new()),
                Box::new(Exploding),
            ));
        visual.update(&data_update(json!({})));

        assert_eq!(
            host.events.borrow().last().map(String::as_str),
            Some("failed: validator exploded")
        );
    }

    #[test]
    fn test_enumerate_uses_current_settings() {
        let host = Rc::new(RecordingHost::new());
        let mut visual = Visual::new(host.clone(), VisualConfiguration::default());
        assert_eq!(visual.enumerate_object_instances("dataLimit").len(), 1);

        visual.update(&data_update(json!({"dataLimit": {"enabled": false}})));
        assert!(visual.enumerate_object_instances("dataLimit").is_empty());
        assert!(visual.enumerate_object_instances("nothing").is_empty());
    }

    #[test]
    fn test_paint_renders_once_per_change() {
        let host = Rc::new(RecordingHost::new());
        let mut visual = Visual::new(host.clone(), VisualConfiguration::default());
        let mut renderer = CapturingRenderer::default();

        assert_eq!(visual.paint(&mut renderer).unwrap(), Some(MainView::Landing));
        assert_eq!(visual.paint(&mut renderer).unwrap(), None);

        visual.update(&data_update(json!({})));
        let view = visual.paint(&mut renderer).unwrap().unwrap();
        assert!(matches!(view, MainView::Render(RenderView::Chart(_))));
        assert_eq!(visual.paint(&mut renderer).unwrap(), None);

        let request = &renderer.requests[0];
        assert_eq!(request.width, 390.0);
        assert_eq!(request.height, 290.0);
        assert_eq!(request.data["values"][1]["measure"], json!(55));
    }
}
