//! Render gating
//!
//! Host events arrive far more often than the chart needs redrawing. Every
//! event that could change the output marks the gate dirty; the paint path
//! asks the gate once per candidate paint and the answer clears it.
//!
//! The gate is shared by every component that reports events, so its state
//! lives in `Cell`s behind `&self`.

use std::cell::Cell;

use crate::service::VisualState;

#[derive(Debug)]
pub struct RenderGate {
    should_render: Cell<bool>,
    reference_state: Cell<VisualState>,
}

impl Default for RenderGate {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderGate {
    /// A fresh gate is dirty so the first paint always happens
    pub fn new() -> Self {
        Self {
            should_render: Cell::new(true),
            reference_state: Cell::new(VisualState::Initial),
        }
    }

    /// Dirty the gate only when `state` differs from the last state reported
    pub fn register_state_change(&self, state: VisualState) {
        if self.reference_state.replace(state) != state {
            self.register_volatile_event();
        }
    }

    pub fn register_segment_load(&self) {
        self.register_volatile_event();
    }

    pub fn register_resize(&self) {
        self.register_volatile_event();
    }

    pub fn register_persist(&self) {
        self.register_volatile_event();
    }

    /// Read and clear. Call exactly once per candidate paint: a call made
    /// anywhere else swallows the render it reports.
    pub fn request_render(&self) -> bool {
        self.should_render.replace(false)
    }

    /// Peek without consuming
    pub fn is_dirty(&self) -> bool {
        self.should_render.get()
    }

    pub fn reference_state(&self) -> VisualState {
        self.reference_state.get()
    }

    fn register_volatile_event(&self) {
        self.should_render.set(true);
    }
}
