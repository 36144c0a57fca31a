//! Final incident report assembly.
//!
//! Reports are immutable artifacts assembled from the incident's core
//! fields, its responder list, forensics metadata (never decrypted
//! payloads), the containment and recovery outcomes, a fixed set of
//! type-specific recommendations, and compliance annotations.

use crate::containment::ContainmentOutcome;
use crate::forensics::ForensicsRecord;
use crate::incident::{
    Incident, IncidentState, IncidentType, Responder, Severity, StateChange,
};
use crate::recovery::RecoveryExecutionResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Plaintext-only view of a forensics record, safe to embed in a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForensicsSummary {
    pub record_id: Uuid,
    pub collection_time: DateTime<Utc>,
    pub snapshot_count: usize,
    pub log_extract_count: usize,
    pub capture_count: usize,
    pub integrity_hash: String,
}

impl From<&ForensicsRecord> for ForensicsSummary {
    fn from(record: &ForensicsRecord) -> Self {
        Self {
            record_id: record.id,
            collection_time: record.collection_time,
            snapshot_count: record.snapshot_count,
            log_extract_count: record.log_extract_count,
            capture_count: record.capture_count,
            integrity_hash: record.integrity_hash.clone(),
        }
    }
}

/// Compliance annotations derived at report time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceAnnotations {
    /// Whether the exposure requires notifying external parties.
    pub external_notification_required: bool,
    /// Whether the first response beat the severity deadline.
    pub sla_met: bool,
    /// The budget the SLA was judged against, in minutes.
    pub response_budget_minutes: i64,
    /// When the incident first left `Detected`, if it did.
    pub first_response_at: Option<DateTime<Utc>>,
}

/// The assembled, immutable report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentReport {
    pub id: Uuid,
    pub incident_id: Uuid,
    pub public_id: String,
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub state: IncidentState,
    pub description: String,
    pub affected_systems: Vec<String>,
    pub affected_users: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub response_deadline: DateTime<Utc>,
    pub timeline: Vec<StateChange>,
    pub responders: Vec<Responder>,
    pub forensics: Vec<ForensicsSummary>,
    pub containment: Option<ContainmentOutcome>,
    pub recovery: Option<RecoveryExecutionResult>,
    pub recommendations: Vec<String>,
    pub compliance: ComplianceAnnotations,
    pub generated_at: DateTime<Utc>,
}

impl IncidentReport {
    #[cfg(test)]
    pub(crate) fn test_stub(incident_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            incident_id,
            public_id: "INC-test".to_string(),
            incident_type: IncidentType::Malware,
            severity: Severity::Low,
            state: IncidentState::LessonsLearned,
            description: String::new(),
            affected_systems: Vec::new(),
            affected_users: Vec::new(),
            created_at: Utc::now(),
            response_deadline: Utc::now(),
            timeline: Vec::new(),
            responders: Vec::new(),
            forensics: Vec::new(),
            containment: None,
            recovery: None,
            recommendations: Vec::new(),
            compliance: ComplianceAnnotations {
                external_notification_required: false,
                sla_met: true,
                response_budget_minutes: 0,
                first_response_at: None,
            },
            generated_at: Utc::now(),
        }
    }
}

/// Fixed recommendations per incident type.
pub fn recommendations(incident_type: IncidentType) -> Vec<String> {
    let items: &[&str] = match incident_type {
        IncidentType::DataBreach => &[
            "review data access policies and least-privilege grants",
            "enable anomaly detection on bulk export paths",
            "schedule credential rotation for adjacent systems",
        ],
        IncidentType::UnauthorizedAccess => &[
            "enforce multi-factor authentication on exposed entry points",
            "tighten source-address allowlists",
            "review dormant account hygiene",
        ],
        IncidentType::Malware | IncidentType::SystemCompromise => &[
            "verify endpoint protection coverage and signatures",
            "review patch levels on affected systems",
            "add detections for the observed execution chain",
        ],
        IncidentType::DenialOfService => &[
            "review upstream rate limiting and filtering",
            "validate capacity headroom and autoscaling triggers",
        ],
        IncidentType::InsiderThreat => &[
            "review separation-of-duties controls",
            "expand audit coverage for privileged operations",
        ],
        IncidentType::DataLoss => &[
            "verify backup cadence and restore drills",
            "review retention and replication policies",
        ],
        IncidentType::PolicyViolation => &[
            "refresh policy training for affected teams",
            "review enforcement gaps surfaced by the incident",
        ],
        IncidentType::PhysicalBreach => &[
            "review facility access controls",
            "audit badge and visitor logs handling",
        ],
    };
    items.iter().map(|s| s.to_string()).collect()
}

/// Whether the incident's exposure class requires external notification.
fn notification_required(incident: &Incident) -> bool {
    matches!(
        incident.incident_type,
        IncidentType::DataBreach | IncidentType::DataLoss
    ) && !incident.affected_users.is_empty()
}

/// Assembles the report from the incident and its associated artifacts.
pub fn assemble_report(
    incident: &Incident,
    forensics: &[ForensicsRecord],
    containment: Option<ContainmentOutcome>,
    recovery: Option<RecoveryExecutionResult>,
    now: DateTime<Utc>,
) -> IncidentReport {
    let first_response_at = incident.first_response_at();
    let sla_met = match first_response_at {
        Some(at) => at <= incident.response_deadline,
        // Never responded: SLA is met only if the deadline has not passed.
        None => now <= incident.response_deadline,
    };

    IncidentReport {
        id: Uuid::new_v4(),
        incident_id: incident.id,
        public_id: incident.incident_id.clone(),
        incident_type: incident.incident_type,
        severity: incident.severity,
        state: incident.state,
        description: incident.description.clone(),
        affected_systems: incident.affected_systems.clone(),
        affected_users: incident.affected_users.clone(),
        created_at: incident.created_at,
        response_deadline: incident.response_deadline,
        timeline: incident.state_history.clone(),
        responders: incident.responders.clone(),
        forensics: forensics.iter().map(ForensicsSummary::from).collect(),
        containment,
        recovery,
        recommendations: recommendations(incident.incident_type),
        compliance: ComplianceAnnotations {
            external_notification_required: notification_required(incident),
            sla_met,
            response_budget_minutes: incident.severity.response_minutes(),
            first_response_at,
        },
        generated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::{DetectionMethod, Findings};
    use crate::lifecycle::apply_transition;
    use chrono::Duration;

    fn incident(incident_type: IncidentType, users: Vec<String>) -> Incident {
        Incident::new(
            incident_type,
            Severity::High,
            "test".to_string(),
            None,
            vec![],
            users,
            DetectionMethod::Manual,
            Findings::None,
            Utc::now(),
        )
    }

    #[test]
    fn breach_with_affected_users_requires_notification() {
        let incident = incident(IncidentType::DataBreach, vec!["u-1".to_string()]);
        let report = assemble_report(&incident, &[], None, None, Utc::now());
        assert!(report.compliance.external_notification_required);

        let no_users = incident_no_users();
        let report = assemble_report(&no_users, &[], None, None, Utc::now());
        assert!(!report.compliance.external_notification_required);
    }

    fn incident_no_users() -> Incident {
        incident(IncidentType::DataBreach, vec![])
    }

    #[test]
    fn malware_does_not_require_notification() {
        let incident = incident(IncidentType::Malware, vec!["u-1".to_string()]);
        let report = assemble_report(&incident, &[], None, None, Utc::now());
        assert!(!report.compliance.external_notification_required);
    }

    #[test]
    fn sla_judged_against_first_departure_from_detected() {
        let mut incident = incident(IncidentType::Malware, vec![]);
        let on_time = incident.created_at + Duration::minutes(5);
        apply_transition(&mut incident, IncidentState::Triaged, "analyst", None, on_time).unwrap();
        let report = assemble_report(&incident, &[], None, None, Utc::now());
        assert!(report.compliance.sla_met);

        let mut late = incident_no_users();
        let past_deadline = late.response_deadline + Duration::minutes(5);
        apply_transition(&mut late, IncidentState::Triaged, "analyst", None, past_deadline).unwrap();
        let report = assemble_report(&late, &[], None, None, Utc::now());
        assert!(!report.compliance.sla_met);
    }

    #[test]
    fn report_carries_forensics_metadata_only() {
        let incident = incident_no_users();
        let record = ForensicsRecord {
            id: Uuid::new_v4(),
            incident_id: incident.id,
            collection_time: Utc::now(),
            snapshot_count: 2,
            log_extract_count: 10,
            capture_count: 1,
            integrity_hash: "abc123".to_string(),
            encrypted_payload: "ciphertext".to_string(),
        };
        let report = assemble_report(&incident, &[record], None, None, Utc::now());
        assert_eq!(report.forensics.len(), 1);
        assert_eq!(report.forensics[0].integrity_hash, "abc123");
        // Summaries never carry the payload.
        let json = serde_json::to_string(&report.forensics[0]).unwrap();
        assert!(!json.contains("ciphertext"));
    }

    #[test]
    fn every_type_has_recommendations() {
        for incident_type in IncidentType::ALL {
            assert!(!recommendations(incident_type).is_empty());
        }
    }
}
