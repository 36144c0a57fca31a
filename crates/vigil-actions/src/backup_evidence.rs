//! Evidence backup action.

use crate::connectors::EvidenceVault;
use crate::registry::{ActionContext, ActionError, ContainmentAction};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};

/// Snapshots the affected systems into the evidence vault before other
/// actions disturb their state. Runs even with no affected systems so the
/// incident always has a vault entry.
pub struct BackupEvidenceAction {
    vault: Arc<dyn EvidenceVault>,
}

impl BackupEvidenceAction {
    pub fn new(vault: Arc<dyn EvidenceVault>) -> Self {
        Self { vault }
    }
}

#[async_trait]
impl ContainmentAction for BackupEvidenceAction {
    fn name(&self) -> &str {
        "backup_evidence"
    }

    fn description(&self) -> &str {
        "Snapshots affected systems into the evidence vault"
    }

    #[instrument(skip(self, context), fields(incident = %context.public_id))]
    async fn execute(&self, context: &ActionContext) -> Result<String, ActionError> {
        let vault_ref = self
            .vault
            .backup(context.incident_id, &context.affected_systems)
            .await?;
        info!(vault_ref = %vault_ref, "evidence backed up");
        Ok(format!("evidence stored at {}", vault_ref))
    }
}
