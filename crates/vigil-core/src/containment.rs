//! Containment types and the dispatcher seam.
//!
//! The dispatcher itself lives in `vigil-actions`; this module holds the
//! action vocabulary, the type-keyed default action lists, and the trait the
//! registry calls through. Containment aggregates per-action outcomes: a
//! failing action never aborts the remaining ones, and the incident only
//! auto-advances to `Contained` when every action succeeded.

use crate::incident::{Incident, IncidentType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The known containment action kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContainmentActionKind {
    IsolateSystem,
    DisableAccount,
    BlockIp,
    RevokeAccess,
    QuarantineFile,
    ResetCredentials,
    TerminateSessions,
    BackupEvidence,
}

impl ContainmentActionKind {
    /// Registry name of the action.
    pub fn name(&self) -> &'static str {
        match self {
            ContainmentActionKind::IsolateSystem => "isolate_system",
            ContainmentActionKind::DisableAccount => "disable_account",
            ContainmentActionKind::BlockIp => "block_ip",
            ContainmentActionKind::RevokeAccess => "revoke_access",
            ContainmentActionKind::QuarantineFile => "quarantine_file",
            ContainmentActionKind::ResetCredentials => "reset_credentials",
            ContainmentActionKind::TerminateSessions => "terminate_sessions",
            ContainmentActionKind::BackupEvidence => "backup_evidence",
        }
    }
}

impl std::fmt::Display for ContainmentActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Default containment actions per incident type. Caller-supplied actions
/// are merged with (and deduplicated against) this list at dispatch time.
pub fn default_actions(incident_type: IncidentType) -> &'static [ContainmentActionKind] {
    use ContainmentActionKind::*;
    match incident_type {
        IncidentType::DataBreach => &[TerminateSessions, ResetCredentials, BackupEvidence],
        IncidentType::UnauthorizedAccess => &[TerminateSessions, DisableAccount, BlockIp],
        IncidentType::Malware => &[IsolateSystem, QuarantineFile, BackupEvidence],
        IncidentType::DenialOfService => &[BlockIp, IsolateSystem],
        IncidentType::InsiderThreat => {
            &[DisableAccount, TerminateSessions, RevokeAccess, BackupEvidence]
        }
        IncidentType::DataLoss => &[BackupEvidence, RevokeAccess],
        IncidentType::SystemCompromise => &[IsolateSystem, ResetCredentials, BackupEvidence],
        IncidentType::PolicyViolation => &[RevokeAccess],
        IncidentType::PhysicalBreach => &[DisableAccount, BackupEvidence],
    }
}

/// Outcome of a single containment action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Action name as dispatched (may be an unknown caller-supplied name).
    pub action: String,
    /// Human-readable result or error message.
    pub message: String,
    /// When the action finished.
    pub completed_at: DateTime<Utc>,
}

/// Aggregated containment result. This is a value, not an error: partial
/// failure leaves the incident in its prior state with the result persisted
/// for operator follow-up.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContainmentOutcome {
    /// Actions that completed successfully.
    pub successful: Vec<ActionOutcome>,
    /// Actions that failed, including unknown action names.
    pub failed: Vec<ActionOutcome>,
}

impl ContainmentOutcome {
    /// Containment is complete iff no action failed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The seam between the registry and the action layer.
#[async_trait]
pub trait ContainmentDispatcher: Send + Sync {
    /// Executes the default actions for the incident's type merged with
    /// `extra_actions`, each independently. Never returns an error: failures
    /// are aggregated into the outcome.
    async fn contain(&self, incident: &Incident, extra_actions: &[String]) -> ContainmentOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_type_has_defaults() {
        for incident_type in IncidentType::ALL {
            assert!(!default_actions(incident_type).is_empty());
        }
    }

    #[test]
    fn data_breach_defaults_preserve_evidence() {
        let actions = default_actions(IncidentType::DataBreach);
        assert!(actions.contains(&ContainmentActionKind::TerminateSessions));
        assert!(actions.contains(&ContainmentActionKind::ResetCredentials));
        assert!(actions.contains(&ContainmentActionKind::BackupEvidence));
    }

    #[test]
    fn outcome_completeness() {
        let mut outcome = ContainmentOutcome::default();
        assert!(outcome.is_complete());
        outcome.failed.push(ActionOutcome {
            action: "block_ip".to_string(),
            message: "firewall unreachable".to_string(),
            completed_at: Utc::now(),
        });
        assert!(!outcome.is_complete());
    }
}
