//! System isolation action.

use crate::connectors::NetworkController;
use crate::registry::{ActionContext, ActionError, ContainmentAction};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};

/// Cuts every affected system off from the network.
pub struct IsolateSystemAction {
    network: Arc<dyn NetworkController>,
}

impl IsolateSystemAction {
    pub fn new(network: Arc<dyn NetworkController>) -> Self {
        Self { network }
    }
}

#[async_trait]
impl ContainmentAction for IsolateSystemAction {
    fn name(&self) -> &str {
        "isolate_system"
    }

    fn description(&self) -> &str {
        "Isolates every affected system from the network"
    }

    #[instrument(skip(self, context), fields(incident = %context.public_id))]
    async fn execute(&self, context: &ActionContext) -> Result<String, ActionError> {
        if context.affected_systems.is_empty() {
            return Err(ActionError::NoTarget(
                "incident lists no affected systems".to_string(),
            ));
        }
        for system in &context.affected_systems {
            self.network.isolate(system).await?;
            info!(system = %system, "system isolated");
        }
        Ok(format!(
            "isolated {} system(s)",
            context.affected_systems.len()
        ))
    }
}
