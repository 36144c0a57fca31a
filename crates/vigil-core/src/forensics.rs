//! Forensics collection: hashed, encrypted point-in-time evidence snapshots.
//!
//! The collector pulls from a telemetry collaborator, bounds every
//! sub-collection, and never fails the parent operation: a sub-collection
//! that errors is logged and omitted from the snapshot. The evidence bundle
//! is serialized canonically, hashed with SHA-256, then encrypted; the hash
//! and row counts stay in plaintext for indexing, the body only in
//! encrypted form.

use crate::clock::Clock;
use crate::config::ForensicsConfig;
use crate::crypto::{CryptoError, DataClassification, EvidenceEncryptor};
use crate::incident::Incident;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Errors from telemetry sub-collections.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("telemetry source unavailable: {0}")]
    Unavailable(String),

    #[error("telemetry query failed: {0}")]
    QueryFailed(String),
}

/// Errors from the collector itself. Sub-collection failures never surface
/// here; only serialization/encryption of the assembled bundle can fail.
#[derive(Error, Debug)]
pub enum ForensicsError {
    #[error("failed to serialize evidence bundle: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// A live session observed on an affected system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionInfo {
    pub session_id: String,
    pub user: String,
    pub started_at: DateTime<Utc>,
}

/// An access event observed on an affected system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessEvent {
    pub user: String,
    pub action: String,
    pub resource: String,
    pub timestamp: DateTime<Utc>,
}

/// A filtered log row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogExtract {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub message: String,
    pub classification: Option<String>,
}

/// One connection in a source address's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionRecord {
    pub peer_addr: String,
    pub port: u16,
    pub bytes: u64,
    pub timestamp: DateTime<Utc>,
}

/// Point-in-time snapshot of one affected system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemSnapshot {
    pub system: String,
    pub active_sessions: Vec<SessionInfo>,
    pub recent_access: Vec<AccessEvent>,
}

/// The canonical evidence bundle that gets hashed and encrypted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EvidenceBundle {
    pub system_snapshots: Vec<SystemSnapshot>,
    pub log_extracts: Vec<LogExtract>,
    pub network_captures: Vec<ConnectionRecord>,
}

/// Persisted forensics record. Immutable once written: the hash is computed
/// over the canonical serialization of the bundle before encryption, and
/// only plaintext metadata stays unencrypted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForensicsRecord {
    pub id: Uuid,
    pub incident_id: Uuid,
    pub collection_time: DateTime<Utc>,
    pub snapshot_count: usize,
    pub log_extract_count: usize,
    pub capture_count: usize,
    /// SHA-256 hex over the canonical bundle serialization.
    pub integrity_hash: String,
    /// Base64 AES-256-GCM of the same canonical bytes.
    pub encrypted_payload: String,
}

/// Telemetry collaborator the collector reads from. Every method is a
/// bounded query against an external source.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Live sessions on a system.
    async fn active_sessions(&self, system: &str) -> Result<Vec<SessionInfo>, TelemetryError>;

    /// Access events on a system within `[since, until]`.
    async fn access_events(
        &self,
        system: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<AccessEvent>, TelemetryError>;

    /// Denied/error/high-sensitivity log rows within `[since, until]`,
    /// at most `limit` rows.
    async fn log_extracts(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<LogExtract>, TelemetryError>;

    /// Connection history for a source address within `[since, until]`.
    async fn connection_history(
        &self,
        source_addr: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ConnectionRecord>, TelemetryError>;
}

/// Computes the integrity hash over canonical bundle bytes.
pub fn integrity_hash(canonical: &[u8]) -> String {
    hex::encode(Sha256::digest(canonical))
}

/// Verifies a decrypted payload against a record's integrity hash.
pub fn verify_integrity(record: &ForensicsRecord, decrypted: &[u8]) -> bool {
    integrity_hash(decrypted) == record.integrity_hash
}

/// The forensics collector.
pub struct ForensicsCollector {
    telemetry: Arc<dyn TelemetrySource>,
    encryptor: Arc<dyn EvidenceEncryptor>,
    clock: Arc<dyn Clock>,
    config: ForensicsConfig,
}

impl ForensicsCollector {
    pub fn new(
        telemetry: Arc<dyn TelemetrySource>,
        encryptor: Arc<dyn EvidenceEncryptor>,
        clock: Arc<dyn Clock>,
        config: ForensicsConfig,
    ) -> Self {
        Self {
            telemetry,
            encryptor,
            clock,
            config,
        }
    }

    /// Collects an evidence snapshot for the incident. Individual
    /// sub-collections that error are omitted rather than aborting the
    /// snapshot.
    #[instrument(skip(self, incident), fields(incident_id = %incident.incident_id))]
    pub async fn collect(&self, incident: &Incident) -> Result<ForensicsRecord, ForensicsError> {
        let now = self.clock.now();
        let mut bundle = EvidenceBundle::default();

        let access_since = now - Duration::minutes(self.config.access_lookback_minutes);
        for system in &incident.affected_systems {
            let active_sessions = match self.telemetry.active_sessions(system).await {
                Ok(sessions) => sessions,
                Err(e) => {
                    warn!(system = %system, error = %e, "session capture omitted");
                    Vec::new()
                }
            };
            let recent_access = match self
                .telemetry
                .access_events(system, access_since, now)
                .await
            {
                Ok(events) => events,
                Err(e) => {
                    warn!(system = %system, error = %e, "access capture omitted");
                    Vec::new()
                }
            };
            bundle.system_snapshots.push(SystemSnapshot {
                system: system.clone(),
                active_sessions,
                recent_access,
            });
        }

        let window = Duration::minutes(self.config.log_window_minutes);
        match self
            .telemetry
            .log_extracts(
                incident.created_at - window,
                incident.created_at + window,
                self.config.max_log_rows,
            )
            .await
        {
            Ok(mut rows) => {
                rows.truncate(self.config.max_log_rows);
                bundle.log_extracts = rows;
            }
            Err(e) => warn!(error = %e, "log extraction omitted"),
        }

        if let Some(source) = &incident.source {
            let capture_since = now - Duration::hours(self.config.network_capture_hours);
            match self
                .telemetry
                .connection_history(source, capture_since, now)
                .await
            {
                Ok(captures) => bundle.network_captures = captures,
                Err(e) => warn!(source = %source, error = %e, "network capture omitted"),
            }
        }

        self.seal(incident, bundle, now)
    }

    /// Hashes and encrypts the assembled bundle.
    fn seal(
        &self,
        incident: &Incident,
        bundle: EvidenceBundle,
        now: DateTime<Utc>,
    ) -> Result<ForensicsRecord, ForensicsError> {
        let canonical = serde_json::to_vec(&bundle)?;
        let hash = integrity_hash(&canonical);
        let encrypted = self.encryptor.encrypt(
            &canonical,
            DataClassification::Restricted,
            &incident.incident_id,
        )?;

        Ok(ForensicsRecord {
            id: Uuid::new_v4(),
            incident_id: incident.id,
            collection_time: now,
            snapshot_count: bundle.system_snapshots.len(),
            log_extract_count: bundle.log_extracts.len(),
            capture_count: bundle.network_captures.len(),
            integrity_hash: hash,
            encrypted_payload: encrypted,
        })
    }

    /// Decrypts a record's payload back into the evidence bundle.
    pub fn open(
        &self,
        incident: &Incident,
        record: &ForensicsRecord,
    ) -> Result<EvidenceBundle, ForensicsError> {
        let plaintext = self.encryptor.decrypt(
            &record.encrypted_payload,
            DataClassification::Restricted,
            &incident.incident_id,
        )?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}

/// Telemetry source that returns nothing, for deployments without wired
/// telemetry and for tests that only care about record structure.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTelemetry;

#[async_trait]
impl TelemetrySource for NullTelemetry {
    async fn active_sessions(&self, _: &str) -> Result<Vec<SessionInfo>, TelemetryError> {
        Ok(Vec::new())
    }

    async fn access_events(
        &self,
        _: &str,
        _: DateTime<Utc>,
        _: DateTime<Utc>,
    ) -> Result<Vec<AccessEvent>, TelemetryError> {
        Ok(Vec::new())
    }

    async fn log_extracts(
        &self,
        _: DateTime<Utc>,
        _: DateTime<Utc>,
        _: usize,
    ) -> Result<Vec<LogExtract>, TelemetryError> {
        Ok(Vec::new())
    }

    async fn connection_history(
        &self,
        _: &str,
        _: DateTime<Utc>,
        _: DateTime<Utc>,
    ) -> Result<Vec<ConnectionRecord>, TelemetryError> {
        Ok(Vec::new())
    }
}
