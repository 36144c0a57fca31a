//! Persistence layer for Vigil.
//!
//! The store is a narrow collaborator: repository traits per entity family,
//! an atomic unit-of-work for incident creation, and optimistic version
//! checks on every incident write. The store is the source of truth; the
//! registry keeps no authoritative cache.

mod memory;

pub use memory::MemoryStore;

use crate::containment::ContainmentOutcome;
use crate::forensics::ForensicsRecord;
use crate::incident::{Incident, IncidentState, IncidentType, Severity};
use crate::recovery::{RecoveryExecutionResult, RecoveryPlan};
use crate::report::IncidentReport;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(Uuid),

    #[error("stale write: expected version {expected}, found {found}")]
    VersionConflict { expected: u64, found: u64 },

    #[error("report already exists for incident {0}")]
    ReportExists(Uuid),

    #[error("unit of work aborted: {0}")]
    UnitOfWorkAborted(String),

    #[error("store error: {0}")]
    Internal(String),
}

/// Filter criteria for listing incidents.
#[derive(Debug, Clone, Default)]
pub struct IncidentFilter {
    /// Filter by state (multiple allowed).
    pub state: Option<Vec<IncidentState>>,
    /// Filter by severity (multiple allowed).
    pub severity: Option<Vec<Severity>>,
    /// Filter by incident type (multiple allowed).
    pub incident_type: Option<Vec<IncidentType>>,
    /// Minimum created_at timestamp.
    pub since: Option<DateTime<Utc>>,
    /// Maximum created_at timestamp.
    pub until: Option<DateTime<Utc>>,
    /// Exact source match (used for detector dedup).
    pub source: Option<String>,
    /// Only incidents that are not closed.
    pub open_only: bool,
}

impl IncidentFilter {
    /// Whether an incident matches this filter.
    pub fn matches(&self, incident: &Incident) -> bool {
        if let Some(states) = &self.state {
            if !states.contains(&incident.state) {
                return false;
            }
        }
        if let Some(severities) = &self.severity {
            if !severities.contains(&incident.severity) {
                return false;
            }
        }
        if let Some(types) = &self.incident_type {
            if !types.contains(&incident.incident_type) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if incident.created_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if incident.created_at > until {
                return false;
            }
        }
        if let Some(source) = &self.source {
            if incident.source.as_deref() != Some(source.as_str()) {
                return false;
            }
        }
        if self.open_only && !incident.state.is_open() {
            return false;
        }
        true
    }
}

/// Page request, 1-indexed.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

impl Pagination {
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * (self.per_page as usize)
    }
}

/// Incident persistence.
#[async_trait]
pub trait IncidentRepository: Send + Sync {
    /// Persists a new incident together with its initial forensics snapshot
    /// as one atomic unit of work: either both records commit or neither.
    async fn create_incident(
        &self,
        incident: &Incident,
        initial_forensics: &ForensicsRecord,
    ) -> Result<(), StoreError>;

    /// Gets an incident by storage key.
    async fn get_incident(&self, id: Uuid) -> Result<Option<Incident>, StoreError>;

    /// Lists incidents, newest first.
    async fn list_incidents(
        &self,
        filter: &IncidentFilter,
        pagination: &Pagination,
    ) -> Result<Vec<Incident>, StoreError>;

    /// Counts incidents matching the filter.
    async fn count_incidents(&self, filter: &IncidentFilter) -> Result<u64, StoreError>;

    /// Saves a mutated incident. The caller bumps `version` before saving;
    /// the store rejects the write if another writer got there first.
    async fn save_incident(&self, incident: &Incident) -> Result<(), StoreError>;
}

/// Forensics record persistence. Records are immutable once written.
#[async_trait]
pub trait ForensicsRepository: Send + Sync {
    async fn add_forensics(&self, record: &ForensicsRecord) -> Result<(), StoreError>;
    async fn list_forensics(&self, incident_id: Uuid) -> Result<Vec<ForensicsRecord>, StoreError>;
}

/// Containment outcome persistence (latest outcome per incident).
#[async_trait]
pub trait ContainmentRepository: Send + Sync {
    async fn save_containment(
        &self,
        incident_id: Uuid,
        outcome: &ContainmentOutcome,
    ) -> Result<(), StoreError>;
    async fn get_containment(
        &self,
        incident_id: Uuid,
    ) -> Result<Option<ContainmentOutcome>, StoreError>;
}

/// Recovery plan and execution-result persistence. An incident has at most
/// one active plan; saving a new plan replaces it.
#[async_trait]
pub trait RecoveryRepository: Send + Sync {
    async fn save_recovery_plan(&self, plan: &RecoveryPlan) -> Result<(), StoreError>;
    async fn get_recovery_plan(&self, plan_id: Uuid) -> Result<Option<RecoveryPlan>, StoreError>;
    async fn active_recovery_plan(
        &self,
        incident_id: Uuid,
    ) -> Result<Option<RecoveryPlan>, StoreError>;
    async fn save_recovery_result(
        &self,
        result: &RecoveryExecutionResult,
    ) -> Result<(), StoreError>;
    async fn get_recovery_result(
        &self,
        incident_id: Uuid,
    ) -> Result<Option<RecoveryExecutionResult>, StoreError>;
}

/// Report persistence. Reports are immutable artifacts: one per incident.
#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn save_report(&self, report: &IncidentReport) -> Result<(), StoreError>;
    async fn get_report(&self, incident_id: Uuid) -> Result<Option<IncidentReport>, StoreError>;
}

/// The full persistence collaborator consumed by the registry.
pub trait Store:
    IncidentRepository
    + ForensicsRepository
    + ContainmentRepository
    + RecoveryRepository
    + ReportRepository
{
}

impl<T> Store for T where
    T: IncidentRepository
        + ForensicsRepository
        + ContainmentRepository
        + RecoveryRepository
        + ReportRepository
{
}
