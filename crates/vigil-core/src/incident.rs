//! Incident data models for Vigil.
//!
//! This module defines the central `Incident` entity together with its
//! classification, lifecycle, scope, and association types. All lifecycle
//! mutation goes through the registry; the types here only enforce local
//! invariants (append-only history, immutable deadline).

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Categories of security incidents tracked by the orchestrator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    DataBreach,
    UnauthorizedAccess,
    Malware,
    DenialOfService,
    InsiderThreat,
    DataLoss,
    SystemCompromise,
    PolicyViolation,
    PhysicalBreach,
}

impl IncidentType {
    /// All known incident types, in declaration order.
    pub const ALL: [IncidentType; 9] = [
        IncidentType::DataBreach,
        IncidentType::UnauthorizedAccess,
        IncidentType::Malware,
        IncidentType::DenialOfService,
        IncidentType::InsiderThreat,
        IncidentType::DataLoss,
        IncidentType::SystemCompromise,
        IncidentType::PolicyViolation,
        IncidentType::PhysicalBreach,
    ];

    /// Stable snake_case name used in APIs and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentType::DataBreach => "data_breach",
            IncidentType::UnauthorizedAccess => "unauthorized_access",
            IncidentType::Malware => "malware",
            IncidentType::DenialOfService => "denial_of_service",
            IncidentType::InsiderThreat => "insider_threat",
            IncidentType::DataLoss => "data_loss",
            IncidentType::SystemCompromise => "system_compromise",
            IncidentType::PolicyViolation => "policy_violation",
            IncidentType::PhysicalBreach => "physical_breach",
        }
    }

    /// Parses the snake_case name back into a type.
    pub fn parse(s: &str) -> Option<IncidentType> {
        IncidentType::ALL.iter().copied().find(|t| t.as_str() == s)
    }
}

impl std::fmt::Display for IncidentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity tiers, each mapped to a response-time budget and escalation tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Minutes allowed between detection and first response.
    pub fn response_minutes(&self) -> i64 {
        match self {
            Severity::Critical => 15,
            Severity::High => 60,
            Severity::Medium => 240,
            Severity::Low => 1440,
        }
    }

    /// Escalation tier, 1 being the most urgent.
    pub fn escalation_tier(&self) -> u8 {
        match self {
            Severity::Critical => 1,
            Severity::High => 2,
            Severity::Medium => 3,
            Severity::Low => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Parses a severity name, rejecting unknown tiers.
    pub fn parse(s: &str) -> Option<Severity> {
        match s {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle states of an incident. Transitions are forward-only and
/// validated by the state machine in [`crate::lifecycle`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IncidentState {
    Detected,
    Triaged,
    Contained,
    Eradicated,
    Recovered,
    LessonsLearned,
    Closed,
}

impl IncidentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentState::Detected => "detected",
            IncidentState::Triaged => "triaged",
            IncidentState::Contained => "contained",
            IncidentState::Eradicated => "eradicated",
            IncidentState::Recovered => "recovered",
            IncidentState::LessonsLearned => "lessons_learned",
            IncidentState::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<IncidentState> {
        match s {
            "detected" => Some(IncidentState::Detected),
            "triaged" => Some(IncidentState::Triaged),
            "contained" => Some(IncidentState::Contained),
            "eradicated" => Some(IncidentState::Eradicated),
            "recovered" => Some(IncidentState::Recovered),
            "lessons_learned" => Some(IncidentState::LessonsLearned),
            "closed" => Some(IncidentState::Closed),
            _ => None,
        }
    }

    /// Whether the incident still counts as open for detection dedup and
    /// escalation scanning.
    pub fn is_open(&self) -> bool {
        !matches!(self, IncidentState::Closed)
    }
}

impl std::fmt::Display for IncidentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the incident was first detected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    Manual,
    Automated,
    PatternAnalysis,
}

/// One entry in the append-only state history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChange {
    /// Previous state; `None` for the initial entry written at creation.
    pub from: Option<IncidentState>,
    /// State entered by this change.
    pub to: IncidentState,
    /// When the change was applied.
    pub timestamp: DateTime<Utc>,
    /// Who applied the change ("system" for automated transitions).
    pub actor: String,
    /// Free-form operator notes.
    pub notes: Option<String>,
}

/// Roles a responder can hold on an incident.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResponderRole {
    IncidentCommander,
    SecurityAnalyst,
    LegalAdvisor,
    CommunicationsLead,
    SystemOwner,
}

impl std::fmt::Display for ResponderRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResponderRole::IncidentCommander => "incident_commander",
            ResponderRole::SecurityAnalyst => "security_analyst",
            ResponderRole::LegalAdvisor => "legal_advisor",
            ResponderRole::CommunicationsLead => "communications_lead",
            ResponderRole::SystemOwner => "system_owner",
        };
        f.write_str(s)
    }
}

/// A role assignment created at incident-creation time from the staffing
/// lookup. Never silently reassigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Responder {
    /// External user identifier (directory reference, not a local user).
    pub user_ref: String,
    /// Role held on this incident.
    pub role: ResponderRole,
    /// When the assignment was made.
    pub assigned_at: DateTime<Utc>,
}

/// Initial findings captured at detection time.
///
/// Structure is predictable for the pattern-detected incident types, so those
/// get tagged variants; everything else is carried as an opaque payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Findings {
    /// Exfiltration pattern hit: per-user transfer volume over the window.
    Exfiltration {
        user: String,
        event_count: u64,
        total_bytes: u64,
        window_minutes: i64,
    },
    /// Brute-force pattern hit: failed logins from one source address.
    BruteForce {
        source_addr: String,
        failure_count: u64,
        window_minutes: i64,
    },
    /// Finding mapped from an external security alert.
    ExternalAlert {
        alert_kind: String,
        alert_id: String,
        critical: bool,
    },
    /// Genuinely free-form findings supplied by a caller.
    Opaque(serde_json::Value),
    /// Nothing captured at creation time.
    None,
}

impl Default for Findings {
    fn default() -> Self {
        Findings::None
    }
}

/// The central tracked entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    /// Storage primary key.
    pub id: Uuid,
    /// Human-legible identifier (time prefix + random suffix), distinct
    /// from the storage key.
    pub incident_id: String,
    /// Incident classification.
    pub incident_type: IncidentType,
    /// Severity tier.
    pub severity: Severity,
    /// Current lifecycle state.
    pub state: IncidentState,
    /// Append-only ordered state history; never mutated or truncated.
    pub state_history: Vec<StateChange>,
    /// Operator description.
    pub description: String,
    /// Origin of the incident: a network address, a detector tag, or a
    /// reporter reference.
    pub source: Option<String>,
    /// External identifiers of affected systems.
    pub affected_systems: Vec<String>,
    /// External identifiers of affected users.
    pub affected_users: Vec<String>,
    /// How the incident was detected.
    pub detection_method: DetectionMethod,
    /// Findings captured at detection time.
    pub initial_findings: Findings,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Response deadline, `created_at + severity budget`. Immutable once set.
    pub response_deadline: DateTime<Utc>,
    /// Timestamp of the last mutation.
    pub last_updated: DateTime<Utc>,
    /// Responder assignments made at creation.
    pub responders: Vec<Responder>,
    /// Set when the escalation monitor records a deadline breach; at most
    /// one escalation per incident.
    pub escalated_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency version, bumped on every persisted write.
    pub version: u64,
}

impl Incident {
    /// Builds a new incident in the `Detected` state with its deadline
    /// derived from the severity budget.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        incident_type: IncidentType,
        severity: Severity,
        description: String,
        source: Option<String>,
        affected_systems: Vec<String>,
        affected_users: Vec<String>,
        detection_method: DetectionMethod,
        initial_findings: Findings,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            incident_id: generate_incident_id(now),
            incident_type,
            severity,
            state: IncidentState::Detected,
            state_history: vec![StateChange {
                from: None,
                to: IncidentState::Detected,
                timestamp: now,
                actor: "system".to_string(),
                notes: None,
            }],
            description,
            source,
            affected_systems,
            affected_users,
            detection_method,
            initial_findings,
            created_at: now,
            response_deadline: now + Duration::minutes(severity.response_minutes()),
            last_updated: now,
            responders: Vec::new(),
            escalated_at: None,
            version: 0,
        }
    }

    /// When the incident first left `Detected`, if it has.
    pub fn first_response_at(&self) -> Option<DateTime<Utc>> {
        self.state_history
            .iter()
            .find(|c| c.from == Some(IncidentState::Detected))
            .map(|c| c.timestamp)
    }

    /// Whether the response deadline has passed without the incident
    /// leaving `Detected`.
    pub fn deadline_breached(&self, now: DateTime<Utc>) -> bool {
        self.state == IncidentState::Detected && now > self.response_deadline
    }
}

/// Generates a human-legible incident identifier: a UTC time prefix plus a
/// random hex suffix, e.g. `INC-20260827143015-9f3a2c`.
pub fn generate_incident_id(now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..0x0100_0000);
    format!("INC-{}-{:06x}", now.format("%Y%m%d%H%M%S"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(severity: Severity) -> Incident {
        Incident::new(
            IncidentType::DataBreach,
            severity,
            "test incident".to_string(),
            Some("10.0.0.9".to_string()),
            vec!["crm".to_string()],
            vec!["u-100".to_string()],
            DetectionMethod::Manual,
            Findings::None,
            Utc::now(),
        )
    }

    #[test]
    fn deadline_derives_from_severity_budget() {
        for severity in [
            Severity::Critical,
            Severity::High,
            Severity::Medium,
            Severity::Low,
        ] {
            let incident = sample(severity);
            assert_eq!(
                incident.response_deadline,
                incident.created_at + Duration::minutes(severity.response_minutes())
            );
        }
    }

    #[test]
    fn new_incident_starts_detected_with_history() {
        let incident = sample(Severity::High);
        assert_eq!(incident.state, IncidentState::Detected);
        assert_eq!(incident.state_history.len(), 1);
        assert_eq!(incident.state_history[0].to, IncidentState::Detected);
        assert!(incident.state_history[0].from.is_none());
    }

    #[test]
    fn incident_id_has_time_prefix_and_suffix() {
        let incident = sample(Severity::Low);
        assert!(incident.incident_id.starts_with("INC-"));
        let parts: Vec<&str> = incident.incident_id.splitn(3, '-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].len(), 14);
        assert_eq!(parts[2].len(), 6);
    }

    #[test]
    fn severity_budgets_are_ordered() {
        assert!(Severity::Critical.response_minutes() < Severity::High.response_minutes());
        assert!(Severity::High.response_minutes() < Severity::Medium.response_minutes());
        assert!(Severity::Medium.response_minutes() < Severity::Low.response_minutes());
        assert_eq!(Severity::Critical.escalation_tier(), 1);
    }

    #[test]
    fn unknown_severity_rejected() {
        assert!(Severity::parse("urgent").is_none());
        assert_eq!(Severity::parse("critical"), Some(Severity::Critical));
    }

    #[test]
    fn deadline_breach_only_applies_while_detected() {
        let mut incident = sample(Severity::Critical);
        let late = incident.response_deadline + Duration::minutes(1);
        assert!(incident.deadline_breached(late));
        incident.state = IncidentState::Triaged;
        assert!(!incident.deadline_breached(late));
    }
}
