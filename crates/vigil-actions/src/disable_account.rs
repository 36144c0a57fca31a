//! Account disablement action.

use crate::connectors::DirectoryService;
use crate::registry::{ActionContext, ActionError, ContainmentAction};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};

/// Disables every affected user account in the directory.
pub struct DisableAccountAction {
    directory: Arc<dyn DirectoryService>,
}

impl DisableAccountAction {
    pub fn new(directory: Arc<dyn DirectoryService>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl ContainmentAction for DisableAccountAction {
    fn name(&self) -> &str {
        "disable_account"
    }

    fn description(&self) -> &str {
        "Disables every affected user account"
    }

    #[instrument(skip(self, context), fields(incident = %context.public_id))]
    async fn execute(&self, context: &ActionContext) -> Result<String, ActionError> {
        if context.affected_users.is_empty() {
            return Err(ActionError::NoTarget(
                "incident lists no affected users".to_string(),
            ));
        }
        for user in &context.affected_users {
            self.directory.disable_account(user).await?;
            info!(user = %user, "account disabled");
        }
        Ok(format!(
            "disabled {} account(s)",
            context.affected_users.len()
        ))
    }
}
