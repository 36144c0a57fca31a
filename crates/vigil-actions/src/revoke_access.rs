//! Resource access revocation action.

use crate::connectors::DirectoryService;
use crate::registry::{ActionContext, ActionError, ContainmentAction};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};

/// Revokes resource access for every affected user. An optional `resource`
/// parameter narrows the revocation; otherwise all grants are revoked.
pub struct RevokeAccessAction {
    directory: Arc<dyn DirectoryService>,
}

impl RevokeAccessAction {
    pub fn new(directory: Arc<dyn DirectoryService>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl ContainmentAction for RevokeAccessAction {
    fn name(&self) -> &str {
        "revoke_access"
    }

    fn description(&self) -> &str {
        "Revokes resource access for every affected user"
    }

    #[instrument(skip(self, context), fields(incident = %context.public_id))]
    async fn execute(&self, context: &ActionContext) -> Result<String, ActionError> {
        if context.affected_users.is_empty() {
            return Err(ActionError::NoTarget(
                "incident lists no affected users".to_string(),
            ));
        }
        let resource = context.get_string("resource");
        for user in &context.affected_users {
            self.directory
                .revoke_access(user, resource.as_deref())
                .await?;
            info!(user = %user, "access revoked");
        }
        Ok(format!(
            "revoked access for {} user(s)",
            context.affected_users.len()
        ))
    }
}
