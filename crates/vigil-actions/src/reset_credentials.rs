//! Forced credential reset action.

use crate::connectors::DirectoryService;
use crate::registry::{ActionContext, ActionError, ContainmentAction};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};

/// Forces a credential reset for every affected user.
pub struct ResetCredentialsAction {
    directory: Arc<dyn DirectoryService>,
}

impl ResetCredentialsAction {
    pub fn new(directory: Arc<dyn DirectoryService>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl ContainmentAction for ResetCredentialsAction {
    fn name(&self) -> &str {
        "reset_credentials"
    }

    fn description(&self) -> &str {
        "Forces a credential reset for every affected user"
    }

    #[instrument(skip(self, context), fields(incident = %context.public_id))]
    async fn execute(&self, context: &ActionContext) -> Result<String, ActionError> {
        if context.affected_users.is_empty() {
            return Err(ActionError::NoTarget(
                "incident lists no affected users".to_string(),
            ));
        }
        for user in &context.affected_users {
            self.directory.force_credential_reset(user).await?;
            info!(user = %user, "credential reset forced");
        }
        Ok(format!(
            "forced credential reset for {} user(s)",
            context.affected_users.len()
        ))
    }
}
