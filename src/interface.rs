//! Presentation model
//!
//! A thin layer between the orchestrator and whatever draws the visual. It
//! never owns visual state; it reads it from [`VisualService`] and receives
//! interface flags through an explicit subscription.
//!
//! # Components
//!
//! - [`InterfaceChannel`] / [`Subscription`]: publish interface state to
//!   mounted views; dropping the subscription unmounts
//! - [`MainInterface`]: resolves which view to show and runs the paint path
//! - [`EditorPane`]: geometry of the collapsible, resizable editor pane
//! - [`GrammarRenderer`]: the external chart renderer

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::{SplitPaneConfig, RENDER_INSET};
use crate::grammar::{Provider, RenderMode};
use crate::service::{VisualService, VisualState};
use crate::tooltip::TooltipHandler;
use crate::{naming, DenebError, Result};

// ============================================================================
// Interface State Channel
// ============================================================================

/// Flags the orchestrator publishes on every update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceState {
    pub is_edit_mode: bool,
}

type Listener = Rc<dyn Fn(&InterfaceState)>;

#[derive(Default)]
struct Listeners {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(u64, Listener)>>,
}

/// Publishes [`InterfaceState`] to every live subscription
#[derive(Default)]
pub struct InterfaceChannel {
    listeners: Rc<Listeners>,
}

impl InterfaceChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` until the returned guard is dropped
    pub fn subscribe(&self, listener: impl Fn(&InterfaceState) + 'static) -> Subscription {
        let id = self.listeners.next_id.get();
        self.listeners.next_id.set(id + 1);
        self.listeners
            .entries
            .borrow_mut()
            .push((id, Rc::new(listener)));
        Subscription {
            id,
            listeners: Rc::downgrade(&self.listeners),
        }
    }

    pub fn publish(&self, state: InterfaceState) {
        // Snapshot so a listener may subscribe or unsubscribe while being notified
        let listeners: Vec<Listener> = self
            .listeners
            .entries
            .borrow()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(&state);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.entries.borrow().len()
    }
}

/// Live registration on an [`InterfaceChannel`]; unsubscribes on drop
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.entries.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

// ============================================================================
// Views
// ============================================================================

/// Content of the chart area
#[derive(Debug, Clone, PartialEq)]
pub enum RenderView {
    /// Segments are still arriving
    Fetching {
        rows_loaded: usize,
        show_creator_notes: bool,
    },
    Processing,
    Chart(RenderRequest),
    /// The spec was rejected; shows the message as content
    SpecificationError { message: String },
    /// Nothing to show yet
    Empty,
}

/// Top-level view
#[derive(Debug, Clone, PartialEq)]
pub enum MainView {
    /// No usable data bound
    Landing,
    /// Editor pane beside a live preview
    Editor(RenderView),
    Render(RenderView),
}

/// Everything the external renderer needs for one chart
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub provider: Provider,
    pub spec: Value,
    /// Named datasets: `{"values": [rows...]}`
    pub data: Value,
    pub config: Value,
    pub width: f64,
    pub height: f64,
    pub render_mode: RenderMode,
}

/// External grammar renderer
pub trait GrammarRenderer {
    /// Draw the chart, routing pointer events over items to `tooltip`
    fn render(&mut self, request: &RenderRequest, tooltip: &TooltipHandler) -> Result<()>;
}

/// Build the render request for the current spec and dataset.
///
/// Returns `Ok(None)` unless the visual is processed and the spec is valid.
pub fn build_render_request(service: &VisualService) -> Result<Option<RenderRequest>> {
    if service.state() != VisualState::Processed {
        return Ok(None);
    }
    let Some(spec) = service.spec().filter(|s| s.is_valid).and_then(|s| s.spec.clone()) else {
        return Ok(None);
    };
    let values = serde_json::to_value(&service.dataset().values)
        .map_err(|e| DenebError::InternalError(format!("Cannot serialise dataset: {}", e)))?;
    let mut data = Map::new();
    data.insert(naming::DATASET_NAME.to_string(), values);

    let vega = &service.settings().vega;
    Ok(Some(RenderRequest {
        provider: vega.provider,
        spec,
        data: Value::Object(data),
        config: service.get_initial_config(),
        width: service.visual_width() - RENDER_INSET,
        height: service.viewport().height - RENDER_INSET,
        render_mode: vega.render_mode,
    }))
}

fn resolve_render_view(service: &VisualService) -> Result<RenderView> {
    let view = match service.state() {
        VisualState::Fetching => {
            let limit = &service.settings().data_limit;
            RenderView::Fetching {
                rows_loaded: service.data_limit().rows_loaded(),
                show_creator_notes: limit.enabled
                    && limit.override_limit
                    && limit.show_custom_visual_notes,
            }
        }
        VisualState::Processing => RenderView::Processing,
        VisualState::Processed => match service.spec() {
            Some(spec) if !spec.is_valid => RenderView::SpecificationError {
                message: spec.error.clone().unwrap_or_default(),
            },
            _ => build_render_request(service)?
                .map(RenderView::Chart)
                .unwrap_or(RenderView::Empty),
        },
        VisualState::Initial | VisualState::Landing => RenderView::Empty,
    };
    Ok(view)
}

/// Root of the presentation layer, mounted against a visual's interface channel
pub struct MainInterface {
    state: Rc<Cell<InterfaceState>>,
    _subscription: Subscription,
}

impl MainInterface {
    /// Start receiving interface state; dropping the value unmounts
    pub fn mount(channel: &InterfaceChannel) -> Self {
        let state = Rc::new(Cell::new(InterfaceState::default()));
        let sink = state.clone();
        let subscription = channel.subscribe(move |s| sink.set(*s));
        Self {
            state,
            _subscription: subscription,
        }
    }

    pub fn state(&self) -> InterfaceState {
        self.state.get()
    }

    pub fn resolve_view(&self, service: &VisualService) -> Result<MainView> {
        if matches!(service.state(), VisualState::Initial | VisualState::Landing) {
            return Ok(MainView::Landing);
        }
        let render = resolve_render_view(service)?;
        Ok(if self.state().is_edit_mode {
            MainView::Editor(render)
        } else {
            MainView::Render(render)
        })
    }

    /// One candidate paint. Consumes the render gate exactly once; returns
    /// `Ok(None)` when nothing changed since the last paint, otherwise the
    /// view shown, drawing the chart through `renderer` when there is one.
    pub fn paint(
        &self,
        service: &VisualService,
        renderer: &mut dyn GrammarRenderer,
    ) -> Result<Option<MainView>> {
        if !service.render_gate().request_render() {
            return Ok(None);
        }
        let view = self.resolve_view(service)?;
        let chart = match &view {
            MainView::Editor(RenderView::Chart(request))
            | MainView::Render(RenderView::Chart(request)) => Some(request),
            _ => None,
        };
        if let Some(request) = chart {
            let _span = tracing::debug_span!("render", provider = %request.provider).entered();
            renderer.render(request, &service.tooltip_handler())?;
        }
        Ok(Some(view))
    }
}

// ============================================================================
// Editor Pane
// ============================================================================

/// Geometry of the editor pane beside the preview
#[derive(Debug, Clone, PartialEq)]
pub struct EditorPane {
    config: SplitPaneConfig,
    is_expanded: bool,
    width: f64,
    expanded_width: f64,
}

impl EditorPane {
    /// Open expanded at the default width and report it to the orchestrator
    pub fn open(service: &mut VisualService, config: SplitPaneConfig) -> Self {
        let width = service.viewport().width * config.default_size_percent;
        service.set_editor_pane_width(width);
        Self {
            config,
            is_expanded: true,
            width,
            expanded_width: width,
        }
    }

    pub fn is_expanded(&self) -> bool {
        self.is_expanded
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn min_size(&self) -> f64 {
        if self.is_expanded {
            self.config.min_size
        } else {
            self.config.collapsed_size
        }
    }

    pub fn max_size(&self, viewport_width: f64) -> f64 {
        if self.is_expanded {
            viewport_width * self.config.max_size_percent
        } else {
            self.config.collapsed_size
        }
    }

    /// Width the pane takes in its current expansion state
    pub fn size(&self) -> f64 {
        Self::size_for(self.is_expanded, self.expanded_width, &self.config)
    }

    fn size_for(is_expanded: bool, expanded_width: f64, config: &SplitPaneConfig) -> f64 {
        if is_expanded {
            expanded_width
        } else {
            config.collapsed_size
        }
    }

    /// Collapse or expand
    pub fn toggle(&mut self, service: &mut VisualService) {
        self.is_expanded = !self.is_expanded;
        self.width = Self::size_for(self.is_expanded, self.expanded_width, &self.config);
        service.set_editor_pane_width(self.width);
    }

    /// Drag resize, bounded by the current min/max
    pub fn resize(&mut self, service: &mut VisualService, width: f64) {
        if !self.is_expanded {
            return;
        }
        let min = self.min_size();
        let max = self.max_size(service.viewport().width).max(min);
        self.set_width(service, width.clamp(min, max));
    }

    /// Back to the default width; ignored while collapsed
    pub fn reset(&mut self, service: &mut VisualService) {
        if self.is_expanded {
            let width = service.viewport().width * self.config.default_size_percent;
            self.set_width(service, width);
        }
    }

    /// The pane is going away; the chart gets the full width back
    pub fn close(self, service: &mut VisualService) {
        service.set_editor_pane_width(0.0);
    }

    fn set_width(&mut self, service: &mut VisualService, width: f64) {
        self.width = width;
        self.expanded_width = width;
        service.set_editor_pane_width(width);
    }
}
