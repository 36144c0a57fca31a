//! Source-address blocking action.

use crate::connectors::NetworkController;
use crate::registry::{ActionContext, ActionError, ContainmentAction};
use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;
use tracing::{info, instrument};

/// Default block duration when the caller does not supply one.
pub const DEFAULT_BLOCK_HOURS: i64 = 24;

/// Time-boxed block of the incident's source address.
pub struct BlockIpAction {
    network: Arc<dyn NetworkController>,
}

impl BlockIpAction {
    pub fn new(network: Arc<dyn NetworkController>) -> Self {
        Self { network }
    }
}

#[async_trait]
impl ContainmentAction for BlockIpAction {
    fn name(&self) -> &str {
        "block_ip"
    }

    fn description(&self) -> &str {
        "Blocks the incident's source address for a bounded duration (default 24h)"
    }

    #[instrument(skip(self, context), fields(incident = %context.public_id))]
    async fn execute(&self, context: &ActionContext) -> Result<String, ActionError> {
        let addr = context.source.as_deref().ok_or_else(|| {
            ActionError::NoTarget("incident has no source address".to_string())
        })?;
        let hours = context
            .get_i64("block_hours")
            .unwrap_or(DEFAULT_BLOCK_HOURS);
        self.network
            .block_address(addr, Duration::hours(hours))
            .await?;
        info!(addr = %addr, hours, "source address blocked");
        Ok(format!("blocked {} for {}h", addr, hours))
    }
}
