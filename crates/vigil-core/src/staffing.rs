//! Responder staffing collaborator.
//!
//! Responder assignment happens once, at incident creation, from an on-call
//! lookup. The trait keeps the lookup external; `StaticRoster` is the
//! reference implementation used by tests and single-node deployments.

use crate::incident::{IncidentType, Responder, ResponderRole, Severity};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Errors from the staffing lookup.
#[derive(Error, Debug)]
pub enum StaffingError {
    #[error("no on-call responder for role {0}")]
    NoOnCall(ResponderRole),

    #[error("staffing lookup failed: {0}")]
    LookupFailed(String),
}

/// On-call/staffing lookup used at incident creation.
#[async_trait]
pub trait StaffingDirectory: Send + Sync {
    /// Returns the responder set for a new incident of the given type and
    /// severity.
    async fn assign(
        &self,
        incident_type: IncidentType,
        severity: Severity,
        now: DateTime<Utc>,
    ) -> Result<Vec<Responder>, StaffingError>;
}

/// Which roles a severity tier staffs.
fn roles_for(severity: Severity) -> &'static [ResponderRole] {
    match severity {
        Severity::Critical => &[
            ResponderRole::IncidentCommander,
            ResponderRole::SecurityAnalyst,
            ResponderRole::LegalAdvisor,
            ResponderRole::CommunicationsLead,
        ],
        Severity::High => &[
            ResponderRole::IncidentCommander,
            ResponderRole::SecurityAnalyst,
        ],
        Severity::Medium | Severity::Low => &[ResponderRole::SecurityAnalyst],
    }
}

/// Fixed role-to-user roster.
#[derive(Debug, Clone, Default)]
pub struct StaticRoster {
    on_call: HashMap<ResponderRole, String>,
}

impl StaticRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the on-call user for a role.
    pub fn with_on_call(mut self, role: ResponderRole, user_ref: impl Into<String>) -> Self {
        self.on_call.insert(role, user_ref.into());
        self
    }

    /// A fully staffed roster for tests and local runs.
    pub fn example() -> Self {
        Self::new()
            .with_on_call(ResponderRole::IncidentCommander, "oncall-commander")
            .with_on_call(ResponderRole::SecurityAnalyst, "oncall-analyst")
            .with_on_call(ResponderRole::LegalAdvisor, "oncall-legal")
            .with_on_call(ResponderRole::CommunicationsLead, "oncall-comms")
    }
}

#[async_trait]
impl StaffingDirectory for StaticRoster {
    async fn assign(
        &self,
        _incident_type: IncidentType,
        severity: Severity,
        now: DateTime<Utc>,
    ) -> Result<Vec<Responder>, StaffingError> {
        roles_for(severity)
            .iter()
            .map(|&role| {
                let user_ref = self
                    .on_call
                    .get(&role)
                    .ok_or(StaffingError::NoOnCall(role))?
                    .clone();
                Ok(Responder {
                    user_ref,
                    role,
                    assigned_at: now,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn critical_incidents_get_full_team() {
        let roster = StaticRoster::example();
        let responders = roster
            .assign(IncidentType::DataBreach, Severity::Critical, Utc::now())
            .await
            .unwrap();
        assert_eq!(responders.len(), 4);
        assert!(responders
            .iter()
            .any(|r| r.role == ResponderRole::IncidentCommander));
    }

    #[tokio::test]
    async fn low_severity_gets_analyst_only() {
        let roster = StaticRoster::example();
        let responders = roster
            .assign(IncidentType::PolicyViolation, Severity::Low, Utc::now())
            .await
            .unwrap();
        assert_eq!(responders.len(), 1);
        assert_eq!(responders[0].role, ResponderRole::SecurityAnalyst);
    }

    #[tokio::test]
    async fn missing_on_call_is_an_error() {
        let roster = StaticRoster::new();
        let result = roster
            .assign(IncidentType::Malware, Severity::High, Utc::now())
            .await;
        assert!(matches!(result, Err(StaffingError::NoOnCall(_))));
    }
}
