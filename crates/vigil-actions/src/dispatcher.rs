//! The containment dispatcher.
//!
//! Merges the incident type's default action list with caller-supplied
//! action names (deduplicated, defaults first), then executes each action
//! independently through the registry. A failing action never aborts the
//! rest; unknown names fail as unsupported for that action only. The
//! aggregate outcome is a value, not an error.

use crate::registry::{ActionContext, ActionError, ActionRegistry};
use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use tracing::{info, instrument, warn};
use vigil_core::{
    default_actions, ActionOutcome, ContainmentDispatcher, ContainmentOutcome, Incident,
};

/// Registry-backed dispatcher.
pub struct RegistryDispatcher {
    registry: ActionRegistry,
}

impl RegistryDispatcher {
    pub fn new(registry: ActionRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl ContainmentDispatcher for RegistryDispatcher {
    #[instrument(skip(self, incident, extra_actions), fields(incident = %incident.incident_id))]
    async fn contain(&self, incident: &Incident, extra_actions: &[String]) -> ContainmentOutcome {
        let mut names: Vec<String> = default_actions(incident.incident_type)
            .iter()
            .map(|a| a.name().to_string())
            .collect();
        for extra in extra_actions {
            if !names.contains(extra) {
                names.push(extra.clone());
            }
        }

        let context = ActionContext::from_incident(incident);
        let mut outcome = ContainmentOutcome::default();

        for name in names {
            let result = match self.registry.get(&name) {
                Some(action) => action.execute(&context).await,
                None => Err(ActionError::Unsupported(name.clone())),
            };
            match result {
                Ok(message) => {
                    counter!("vigil_containment_actions_total", "result" => "success")
                        .increment(1);
                    outcome.successful.push(ActionOutcome {
                        action: name,
                        message,
                        completed_at: Utc::now(),
                    });
                }
                Err(e) => {
                    counter!("vigil_containment_actions_total", "result" => "failure")
                        .increment(1);
                    warn!(action = %name, error = %e, "containment action failed");
                    outcome.failed.push(ActionOutcome {
                        action: name,
                        message: e.to_string(),
                        completed_at: Utc::now(),
                    });
                }
            }
        }

        info!(
            successful = outcome.successful.len(),
            failed = outcome.failed.len(),
            "containment run finished"
        );
        outcome
    }
}
