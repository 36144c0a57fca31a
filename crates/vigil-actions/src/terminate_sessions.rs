//! Session termination action.

use crate::connectors::SessionBroker;
use crate::registry::{ActionContext, ActionError, ContainmentAction};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};

/// Terminates all live sessions for every affected user.
pub struct TerminateSessionsAction {
    sessions: Arc<dyn SessionBroker>,
}

impl TerminateSessionsAction {
    pub fn new(sessions: Arc<dyn SessionBroker>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl ContainmentAction for TerminateSessionsAction {
    fn name(&self) -> &str {
        "terminate_sessions"
    }

    fn description(&self) -> &str {
        "Terminates live sessions for every affected user"
    }

    #[instrument(skip(self, context), fields(incident = %context.public_id))]
    async fn execute(&self, context: &ActionContext) -> Result<String, ActionError> {
        if context.affected_users.is_empty() {
            return Err(ActionError::NoTarget(
                "incident lists no affected users".to_string(),
            ));
        }
        let mut terminated = 0;
        for user in &context.affected_users {
            terminated += self.sessions.terminate_sessions(user).await?;
            info!(user = %user, "sessions terminated");
        }
        Ok(format!("terminated {} session(s)", terminated))
    }
}
