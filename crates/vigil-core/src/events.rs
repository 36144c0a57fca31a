//! Event bus for Vigil.
//!
//! A thin broadcast channel carrying typed lifecycle events for external
//! notification. Publishing is best-effort: no subscribers is not an error,
//! and event delivery is never part of the core correctness contract.

use crate::containment::ContainmentOutcome;
use crate::incident::{IncidentState, IncidentType, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Default buffer size for the broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Events published by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum IncidentEvent {
    /// An incident was created.
    Created {
        incident_id: Uuid,
        public_id: String,
        incident_type: IncidentType,
        severity: Severity,
    },
    /// An incident changed state.
    StateChanged {
        incident_id: Uuid,
        from: IncidentState,
        to: IncidentState,
        actor: String,
    },
    /// A deadline breach was recorded.
    Escalated {
        incident_id: Uuid,
        reason: String,
        deadline: DateTime<Utc>,
    },
    /// Containment finished (possibly partially).
    ContainmentFinished {
        incident_id: Uuid,
        successful: usize,
        failed: usize,
    },
    /// Recovery execution finished.
    RecoveryFinished { incident_id: Uuid, success: bool },
    /// A final report was generated.
    ReportGenerated { incident_id: Uuid, report_id: Uuid },
}

impl IncidentEvent {
    /// The incident this event concerns.
    pub fn incident_id(&self) -> Uuid {
        match self {
            IncidentEvent::Created { incident_id, .. }
            | IncidentEvent::StateChanged { incident_id, .. }
            | IncidentEvent::Escalated { incident_id, .. }
            | IncidentEvent::ContainmentFinished { incident_id, .. }
            | IncidentEvent::RecoveryFinished { incident_id, .. }
            | IncidentEvent::ReportGenerated { incident_id, .. } => *incident_id,
        }
    }
}

/// Helper used by the event constructors in the registry.
pub fn containment_event(incident_id: Uuid, outcome: &ContainmentOutcome) -> IncidentEvent {
    IncidentEvent::ContainmentFinished {
        incident_id,
        successful: outcome.successful.len(),
        failed: outcome.failed.len(),
    }
}

/// Broadcast-based event bus.
pub struct EventBus {
    tx: broadcast::Sender<IncidentEvent>,
}

impl EventBus {
    /// Creates a bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes an event. Lagging or absent subscribers are ignored.
    pub fn publish(&self, event: IncidentEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscribes to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<IncidentEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
