//! Stub connectors for tests and single-node runs.
//!
//! One object implements every connector seam, records each call, and can
//! be scripted to fail the operations behind a given action name.

use crate::connectors::{
    ConnectorError, DirectoryService, EvidenceVault, FileQuarantine, NetworkController,
    SessionBroker,
};
use async_trait::async_trait;
use chrono::Duration;
use std::collections::HashSet;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct StubConnector {
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
}

impl StubConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the operations behind `action_name` to fail.
    pub fn fail_action(&self, action_name: &str) {
        self.failing.lock().unwrap().insert(action_name.to_string());
    }

    /// Everything that was called, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, action_name: &str) -> Result<(), ConnectorError> {
        if self.failing.lock().unwrap().contains(action_name) {
            Err(ConnectorError::Unavailable(format!(
                "scripted failure for {}",
                action_name
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl NetworkController for StubConnector {
    async fn isolate(&self, system: &str) -> Result<(), ConnectorError> {
        self.check("isolate_system")?;
        self.record(format!("isolate:{}", system));
        Ok(())
    }

    async fn block_address(&self, addr: &str, duration: Duration) -> Result<(), ConnectorError> {
        self.check("block_ip")?;
        self.record(format!("block_address:{}:{}h", addr, duration.num_hours()));
        Ok(())
    }
}

#[async_trait]
impl DirectoryService for StubConnector {
    async fn disable_account(&self, user_ref: &str) -> Result<(), ConnectorError> {
        self.check("disable_account")?;
        self.record(format!("disable_account:{}", user_ref));
        Ok(())
    }

    async fn revoke_access(
        &self,
        user_ref: &str,
        resource: Option<&str>,
    ) -> Result<(), ConnectorError> {
        self.check("revoke_access")?;
        self.record(format!(
            "revoke_access:{}:{}",
            user_ref,
            resource.unwrap_or("*")
        ));
        Ok(())
    }

    async fn force_credential_reset(&self, user_ref: &str) -> Result<(), ConnectorError> {
        self.check("reset_credentials")?;
        self.record(format!("force_credential_reset:{}", user_ref));
        Ok(())
    }
}

#[async_trait]
impl SessionBroker for StubConnector {
    async fn terminate_sessions(&self, user_ref: &str) -> Result<u64, ConnectorError> {
        self.check("terminate_sessions")?;
        self.record(format!("terminate_sessions:{}", user_ref));
        Ok(1)
    }
}

#[async_trait]
impl FileQuarantine for StubConnector {
    async fn quarantine(&self, system: &str, path: Option<&str>) -> Result<(), ConnectorError> {
        self.check("quarantine_file")?;
        self.record(format!("quarantine:{}:{}", system, path.unwrap_or("*")));
        Ok(())
    }
}

#[async_trait]
impl EvidenceVault for StubConnector {
    async fn backup(
        &self,
        incident_id: Uuid,
        systems: &[String],
    ) -> Result<String, ConnectorError> {
        self.check("backup_evidence")?;
        self.record(format!("backup:{}:{}", incident_id, systems.len()));
        Ok(format!("vault://incidents/{}", incident_id))
    }
}
