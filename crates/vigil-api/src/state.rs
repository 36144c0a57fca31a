//! Shared application state.

use std::sync::Arc;
use vigil_core::IncidentRegistry;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Incident registry; all lifecycle operations go through it.
    pub registry: Arc<IncidentRegistry>,
}

impl AppState {
    pub fn new(registry: Arc<IncidentRegistry>) -> Self {
        Self { registry }
    }
}
