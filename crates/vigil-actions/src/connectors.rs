//! Connector seams the containment actions execute through.
//!
//! Each trait fronts one class of infrastructure: network enforcement,
//! the user directory, session brokering, endpoint file quarantine, and
//! the evidence vault. Production deployments wire real connectors; tests
//! and single-node runs use [`crate::testing::StubConnector`].

use async_trait::async_trait;
use chrono::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by connectors.
#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("connector unavailable: {0}")]
    Unavailable(String),

    #[error("target not found: {0}")]
    TargetNotFound(String),

    #[error("operation rejected: {0}")]
    Rejected(String),
}

/// Network enforcement: host isolation and address blocking.
#[async_trait]
pub trait NetworkController: Send + Sync {
    /// Cuts a system off from the network.
    async fn isolate(&self, system: &str) -> Result<(), ConnectorError>;

    /// Blocks traffic from an address for a bounded duration.
    async fn block_address(&self, addr: &str, duration: Duration) -> Result<(), ConnectorError>;
}

/// User directory: account state and credential control.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    async fn disable_account(&self, user_ref: &str) -> Result<(), ConnectorError>;
    async fn revoke_access(&self, user_ref: &str, resource: Option<&str>)
        -> Result<(), ConnectorError>;
    async fn force_credential_reset(&self, user_ref: &str) -> Result<(), ConnectorError>;
}

/// Session broker: live session termination.
#[async_trait]
pub trait SessionBroker: Send + Sync {
    /// Terminates all live sessions for a user; returns the count.
    async fn terminate_sessions(&self, user_ref: &str) -> Result<u64, ConnectorError>;
}

/// Endpoint file quarantine.
#[async_trait]
pub trait FileQuarantine: Send + Sync {
    async fn quarantine(&self, system: &str, path: Option<&str>) -> Result<(), ConnectorError>;
}

/// Evidence vault: out-of-band copies of system state for later forensics.
#[async_trait]
pub trait EvidenceVault: Send + Sync {
    /// Snapshots the named systems under the incident's key; returns a
    /// vault reference.
    async fn backup(&self, incident_id: Uuid, systems: &[String])
        -> Result<String, ConnectorError>;
}
