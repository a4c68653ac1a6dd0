//! Visual service: the orchestrator
//!
//! Receives every host update, sequences validation, data loading, dataset
//! mapping and spec parsing, and keeps the single copy of visual state the
//! presentation layer reads. Also carries the editor commands (apply, reset,
//! auto-apply) since they act on the same state.
//!
//! # State machine
//!
//! ```text
//! Initial ──data──▶ Fetching ──no more segments──▶ Processed
//!                      │  ▲                            │
//!                      │  └────────── data ────────────┘
//!                      └──invalid dataview──▶ Landing
//! ```
//!
//! Non-data updates (resize, view mode, style) leave the state alone and
//! only mark the render gate.

use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

use crate::config::VisualConfiguration;
use crate::data_limit::DataLimitCoordinator;
use crate::dataset::{map_dataset, Dataset};
use crate::dataview::{validate_data_view, OperationKind, Viewport, VisualUpdateOptions};
use crate::editor::{EditorService, TextEditor};
use crate::host::{LocalizationManager, VisualHost};
use crate::interface::{InterfaceChannel, InterfaceState};
use crate::property::PropertyService;
use crate::render_gate::RenderGate;
use crate::settings::VisualSettings;
use crate::specification::{CompiledSpec, SpecificationService};
use crate::tooltip::TooltipHandler;
use crate::{naming, DenebError, Result};

/// Visual lifecycle, ordered by progress through one load
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[repr(u8)]
pub enum VisualState {
    Initial = 0,
    /// No usable data bound
    Landing = 10,
    /// Segments of the query are still arriving
    Fetching = 20,
    Processing = 30,
    /// Dataset mapped; the chart may render
    Processed = 50,
}

impl VisualState {
    pub fn value(self) -> u8 {
        self as u8
    }
}

pub struct VisualService {
    host: Rc<dyn VisualHost>,
    configuration: VisualConfiguration,
    localisation: Box<dyn LocalizationManager>,
    locale: String,
    gate: Rc<RenderGate>,
    data_limit: DataLimitCoordinator,
    specification: SpecificationService,
    property: PropertyService,
    editor: EditorService,
    interface: InterfaceChannel,
    state: VisualState,
    is_data_view_valid: bool,
    dataset: Dataset,
    settings: VisualSettings,
    viewport: Viewport,
    editor_pane_width: f64,
}

impl VisualService {
    pub fn new(host: Rc<dyn VisualHost>, configuration: VisualConfiguration) -> Self {
        let gate = Rc::new(RenderGate::new());
        tracing::debug!(version = %configuration.metadata.version, "Initialising visual service");
        Self {
            localisation: host.create_localization_manager(),
            locale: host.locale(),
            data_limit: DataLimitCoordinator::new(
                host.clone(),
                configuration.features.fetch_more_data,
            ),
            property: PropertyService::new(host.clone(), gate.clone()),
            specification: SpecificationService::new(),
            editor: EditorService::new(),
            interface: InterfaceChannel::new(),
            state: VisualState::Initial,
            is_data_view_valid: false,
            dataset: Dataset::empty(),
            settings: VisualSettings::default(),
            viewport: Viewport::default(),
            editor_pane_width: 0.0,
            gate,
            host,
            configuration,
        }
    }

    /// Swap in a specification service, e.g. one backed by the real grammar compilers
    pub fn with_specification(mut self, specification: SpecificationService) -> Self {
        self.specification = specification;
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn state(&self) -> VisualState {
        self.state
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn settings(&self) -> &VisualSettings {
        &self.settings
    }

    /// Settings for the next update, parsed by the caller from its dataview
    pub fn set_settings(&mut self, settings: VisualSettings) {
        self.settings = settings;
    }

    pub fn configuration(&self) -> &VisualConfiguration {
        &self.configuration
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn data_limit(&self) -> &DataLimitCoordinator {
        &self.data_limit
    }

    /// Result of the last spec parse
    pub fn spec(&self) -> Option<&CompiledSpec> {
        self.specification.spec()
    }

    pub fn render_gate(&self) -> &Rc<RenderGate> {
        &self.gate
    }

    pub fn property(&self) -> &PropertyService {
        &self.property
    }

    pub fn editor(&self) -> &EditorService {
        &self.editor
    }

    pub fn interface(&self) -> &InterfaceChannel {
        &self.interface
    }

    pub fn localisation(&self) -> &dyn LocalizationManager {
        self.localisation.as_ref()
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn is_data_view_valid(&self) -> bool {
        self.is_data_view_valid
    }

    pub fn editor_pane_width(&self) -> f64 {
        self.editor_pane_width
    }

    /// Record the editor pane's width; the chart loses that much width
    pub fn set_editor_pane_width(&mut self, width: f64) {
        self.editor_pane_width = width;
        self.gate.register_resize();
        self.editor.resize();
    }

    /// Width available to the chart beside the editor pane
    pub fn visual_width(&self) -> f64 {
        self.viewport.width - self.editor_pane_width
    }

    pub fn get_initial_config(&self) -> Value {
        SpecificationService::get_initial_config(&self.settings)
    }

    /// Template for the currently selected provider
    pub fn default_spec(&self) -> String {
        SpecificationService::default_spec(self.settings.vega.provider)
    }

    pub fn tooltip_handler(&self) -> TooltipHandler {
        TooltipHandler::new(self.host.clone())
    }

    // ------------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------------

    /// Apply one host update.
    ///
    /// # Errors
    ///
    /// Returns `DenebError::DataViewError` when a data update for an already
    /// validated query arrives without a dataview or table.
    pub fn resolve_update_options(&mut self, options: &VisualUpdateOptions) -> Result<()> {
        let _span = tracing::info_span!(
            "update",
            update_type = ?options.update_type,
            operation = ?options.operation_kind
        )
        .entered();

        let viewport_changed = self.viewport != options.viewport;
        self.viewport = options.viewport;

        let is_stale = self.is_stale_update(options);
        if is_stale {
            // Only the data is superseded; viewport and view mode are current
            tracing::warn!(
                generation = self.data_limit.generation(),
                "Ignoring data for a superseded query"
            );
            if viewport_changed {
                self.gate.register_resize();
            }
        } else if options.update_type.is_data() {
            self.resolve_data_update(options)?;
        } else {
            self.gate.register_resize();
        }

        if !is_stale && self.state == VisualState::Processed {
            let vega = &self.settings.vega;
            self.specification.parse(&vega.json_spec, vega.provider);
            self.sync_editor();
        }

        self.interface.publish(InterfaceState {
            is_edit_mode: options.is_edit_mode(),
        });
        Ok(())
    }

    /// Whether `options` carries data answering a query that has since been replaced
    pub fn is_stale_update(&self, options: &VisualUpdateOptions) -> bool {
        options.update_type.is_data() && self.data_limit.is_stale(options)
    }

    fn resolve_data_update(&mut self, options: &VisualUpdateOptions) -> Result<()> {
        self.gate.register_segment_load();

        // Later segments of a query share the first segment's schema
        if options.operation_kind == OperationKind::Create {
            self.is_data_view_valid = validate_data_view(&options.data_views, naming::REQUIRED_ROLES);
        }

        if !self.is_data_view_valid {
            tracing::debug!("Dataview is not usable; showing landing page");
            self.handle_visual_state_change(VisualState::Landing);
            self.dataset = Dataset::empty();
            return Ok(());
        }

        let data_view = options.data_view().ok_or_else(|| {
            DenebError::DataViewError("Data update carries no dataview".to_string())
        })?;
        let table = data_view.table.as_ref().ok_or_else(|| {
            DenebError::DataViewError("Data segment has no table".to_string())
        })?;

        self.handle_visual_state_change(VisualState::Fetching);
        self.property
            .set_objects(data_view.metadata.objects.clone().unwrap_or_default());

        let decision = self.data_limit.handle_fetch(options, &self.settings.data_limit);
        tracing::debug!(?decision, "Data limit handled");

        if !self.data_limit.can_fetch_more() {
            self.dataset = map_dataset(table, self.is_data_view_valid);
            self.handle_visual_state_change(VisualState::Processed);
        }
        Ok(())
    }

    fn handle_visual_state_change(&mut self, state: VisualState) {
        if self.state != state {
            tracing::info!(from = ?self.state, to = ?state, "Visual state change");
        }
        self.state = state;
        self.gate.register_state_change(state);
    }

    /// Point an attached editor at the current grammar and columns
    fn sync_editor(&mut self) {
        if self.editor.is_attached() {
            self.editor.set_provider(Some(self.settings.vega.provider));
            self.editor
                .update_completers(&self.dataset.metadata, self.localisation.as_ref());
        }
    }

    // ------------------------------------------------------------------------
    // Editor Commands
    // ------------------------------------------------------------------------

    /// Bind an editor widget and load the persisted spec into it
    pub fn attach_editor(&mut self, editor: Box<dyn TextEditor>) {
        self.editor.attach(editor);
        self.editor.set_text(&self.settings.vega.json_spec);
        self.sync_editor();
    }

    pub fn detach_editor(&mut self) {
        self.editor.detach();
    }

    /// Apply: write the editor text to the report
    pub fn persist_spec(&mut self) {
        if let Err(e) = self.specification.persist(&self.property, &mut self.editor) {
            tracing::warn!(error = %e, "Specification was not persisted");
        }
    }

    /// Replace the editor text with the provider's template and persist it
    pub fn reset_spec(&mut self) {
        let template = self.default_spec();
        self.editor.set_text(&template);
        self.editor.focus();
        self.property.persist_value(
            naming::VEGA_OBJECT,
            naming::JSON_SPEC_PROPERTY,
            Some(Value::String(template)),
        );
    }

    /// Turn auto-apply on or off, then apply the current text
    pub fn set_auto_apply(&mut self, checked: bool) {
        self.property.persist_value(
            naming::VEGA_OBJECT,
            naming::AUTO_SAVE_PROPERTY,
            Some(Value::Bool(checked)),
        );
        self.persist_spec();
    }

    /// React to the user editing the buffer
    pub fn handle_editor_text_change(&mut self) {
        if self.settings.vega.auto_save {
            self.persist_spec();
        } else {
            self.editor
                .resolve_dirty_status(Some(&self.settings.vega.json_spec));
        }
    }

    pub fn is_apply_disabled(&self) -> bool {
        self.settings.vega.auto_save || !self.editor.is_dirty()
    }
}
