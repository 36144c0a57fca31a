//! # vigil-core
//!
//! Core orchestration for Vigil, the incident lifecycle orchestrator.
//!
//! This crate provides the incident data models, the forward-only lifecycle
//! state machine, the incident registry with its injected collaborators,
//! forensics collection, recovery planning, automated pattern detection,
//! deadline escalation, and the background scheduler that drives the
//! periodic tasks.

pub mod audit;
pub mod clock;
pub mod config;
pub mod containment;
pub mod crypto;
pub mod detector;
pub mod events;
pub mod forensics;
pub mod incident;
pub mod lifecycle;
pub mod monitor;
pub mod playbooks;
pub mod recovery;
pub mod registry;
pub mod report;
pub mod scheduler;
pub mod staffing;
pub mod store;

pub use audit::{AuditSink, NoopAuditSink};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ApiConfig, ConfigError, DetectorConfig, ForensicsConfig, MonitorConfig, VigilConfig};
pub use containment::{
    default_actions, ActionOutcome, ContainmentActionKind, ContainmentDispatcher,
    ContainmentOutcome,
};
pub use crypto::{Aes256GcmEncryptor, CryptoError, DataClassification, EvidenceEncryptor};
pub use detector::{
    ActivityFeed, AuthFailure, PatternDetector, QuietFeed, SecurityAlert, TransferEvent,
};
pub use events::{EventBus, IncidentEvent};
pub use forensics::{
    EvidenceBundle, ForensicsCollector, ForensicsError, ForensicsRecord, NullTelemetry,
    TelemetryError, TelemetrySource,
};
pub use incident::{
    DetectionMethod, Findings, Incident, IncidentState, IncidentType, Responder, ResponderRole,
    Severity, StateChange,
};
pub use lifecycle::{allowed_targets, is_valid_transition, LifecycleError};
pub use monitor::EscalationMonitor;
pub use playbooks::{all_playbooks, Playbook};
pub use recovery::{
    ChecklistExecutor, RecoveryExecutionResult, RecoveryPlan, RecoveryPlanner, RecoveryStep,
    StepExecutor, StepResult,
};
pub use registry::{
    IncidentRegistry, IncidentStatistics, NewIncident, RegistryError, RegistryStats,
};
pub use report::IncidentReport;
pub use scheduler::{Scheduler, SchedulerHandle};
pub use staffing::{StaffingDirectory, StaffingError, StaticRoster};
pub use store::{
    ContainmentRepository, ForensicsRepository, IncidentFilter, IncidentRepository, MemoryStore,
    Pagination, RecoveryRepository, ReportRepository, Store, StoreError,
};
