//! File quarantine action.

use crate::connectors::FileQuarantine;
use crate::registry::{ActionContext, ActionError, ContainmentAction};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};

/// Quarantines a suspect file on every affected system. The optional
/// `path` parameter pins a specific file; without it the endpoint agent
/// quarantines whatever it flagged.
pub struct QuarantineFileAction {
    quarantine: Arc<dyn FileQuarantine>,
}

impl QuarantineFileAction {
    pub fn new(quarantine: Arc<dyn FileQuarantine>) -> Self {
        Self { quarantine }
    }
}

#[async_trait]
impl ContainmentAction for QuarantineFileAction {
    fn name(&self) -> &str {
        "quarantine_file"
    }

    fn description(&self) -> &str {
        "Quarantines flagged files on every affected system"
    }

    #[instrument(skip(self, context), fields(incident = %context.public_id))]
    async fn execute(&self, context: &ActionContext) -> Result<String, ActionError> {
        if context.affected_systems.is_empty() {
            return Err(ActionError::NoTarget(
                "incident lists no affected systems".to_string(),
            ));
        }
        let path = context.get_string("path");
        for system in &context.affected_systems {
            self.quarantine.quarantine(system, path.as_deref()).await?;
            info!(system = %system, "file quarantined");
        }
        Ok(format!(
            "quarantined files on {} system(s)",
            context.affected_systems.len()
        ))
    }
}
