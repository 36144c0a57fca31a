//! Escalation monitor.
//!
//! Scans open incidents still in `Detected` whose response deadline has
//! passed and records an escalation for each. The escalation itself is
//! notification-only: state never changes, and the registry guarantees at
//! most one escalation per incident.

use crate::clock::Clock;
use crate::incident::IncidentState;
use crate::registry::{IncidentRegistry, RegistryError};
use crate::store::{IncidentFilter, Pagination};
use metrics::counter;
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Page size for each deadline scan.
const SCAN_PAGE_SIZE: u32 = 500;

pub struct EscalationMonitor {
    registry: Arc<IncidentRegistry>,
    clock: Arc<dyn Clock>,
}

impl EscalationMonitor {
    pub fn new(registry: Arc<IncidentRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    /// Runs one deadline scan. Failures on individual incidents are logged
    /// and do not stop the scan; the returned ids are the incidents
    /// escalated this tick.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> Result<Vec<Uuid>, RegistryError> {
        let now = self.clock.now();
        let filter = IncidentFilter {
            state: Some(vec![IncidentState::Detected]),
            open_only: true,
            ..IncidentFilter::default()
        };

        let mut escalated = Vec::new();
        let mut page = 1;
        loop {
            let pagination = Pagination {
                page,
                per_page: SCAN_PAGE_SIZE,
            };
            let (incidents, total) = self.registry.list_incidents(&filter, &pagination).await?;
            if incidents.is_empty() {
                break;
            }

            for incident in &incidents {
                if !incident.deadline_breached(now) || incident.escalated_at.is_some() {
                    continue;
                }
                let reason = format!(
                    "response deadline {} passed without first response",
                    incident.response_deadline
                );
                match self.registry.escalate(incident.id, &reason).await {
                    Ok(()) => escalated.push(incident.id),
                    Err(e) => {
                        warn!(incident_id = %incident.incident_id, error = %e, "escalation failed")
                    }
                }
            }

            if (page as u64) * (SCAN_PAGE_SIZE as u64) >= total {
                break;
            }
            page += 1;
        }

        if !escalated.is_empty() {
            counter!("vigil_monitor_escalations_total").increment(escalated.len() as u64);
        }
        Ok(escalated)
    }
}
