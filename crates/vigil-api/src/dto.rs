//! Request and response DTOs for the administrative API.

use crate::error::ApiError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;
use vigil_core::{
    DetectionMethod, Findings, Incident, IncidentFilter, IncidentState, IncidentType, NewIncident,
    Pagination, RecoveryExecutionResult, RecoveryPlan, Responder, Severity, StateChange,
};

/// Maximum page size for list endpoints.
pub const MAX_PER_PAGE: u32 = 100;

/// Request to create an incident.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateIncidentRequest {
    /// Incident type name, e.g. `data_breach`.
    pub incident_type: String,
    /// Severity name, e.g. `high`.
    pub severity: String,
    #[validate(length(min = 1, max = 4000))]
    pub description: String,
    pub source: Option<String>,
    #[serde(default)]
    pub affected_systems: Vec<String>,
    #[serde(default)]
    pub affected_users: Vec<String>,
    /// Free-form findings captured at detection time.
    pub initial_findings: Option<serde_json::Value>,
}

impl CreateIncidentRequest {
    /// Validates and converts into the registry's input type.
    pub fn into_new_incident(self) -> Result<NewIncident, ApiError> {
        self.validate()?;
        let incident_type = IncidentType::parse(&self.incident_type)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown incident type: {}", self.incident_type)))?;
        let severity = Severity::parse(&self.severity)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown severity: {}", self.severity)))?;
        Ok(NewIncident {
            incident_type,
            severity,
            description: self.description,
            source: self.source,
            affected_systems: self.affected_systems,
            affected_users: self.affected_users,
            detection_method: DetectionMethod::Manual,
            initial_findings: match self.initial_findings {
                Some(value) => Findings::Opaque(value),
                None => Findings::None,
            },
        })
    }
}

/// Request to apply a lifecycle transition.
#[derive(Debug, Deserialize)]
pub struct UpdateStateRequest {
    /// Target state name, e.g. `triaged`.
    pub new_state: String,
    pub notes: Option<String>,
    /// Operator applying the change.
    pub actor: Option<String>,
}

impl UpdateStateRequest {
    pub fn parse_state(&self) -> Result<IncidentState, ApiError> {
        IncidentState::parse(&self.new_state)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown state: {}", self.new_state)))
    }
}

/// Request to run containment.
#[derive(Debug, Default, Deserialize)]
pub struct ContainRequest {
    /// Extra action names merged with the type's defaults.
    #[serde(default)]
    pub actions: Vec<String>,
}

/// Request to plan (and optionally execute) recovery.
#[derive(Debug, Default, Deserialize)]
pub struct RecoverRequest {
    #[serde(default)]
    pub execute: bool,
}

/// Query parameters for incident listing.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListIncidentsQuery {
    /// Comma-separated state names.
    pub state: Option<String>,
    /// Comma-separated severity names.
    pub severity: Option<String>,
    /// Comma-separated incident type names.
    pub incident_type: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub open_only: bool,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub per_page: Option<u32>,
}

impl ListIncidentsQuery {
    /// Validates and converts into a store filter and pagination.
    pub fn into_filter(self) -> Result<(IncidentFilter, Pagination), ApiError> {
        self.validate()?;

        let state = parse_list(self.state.as_deref(), |s| {
            IncidentState::parse(s).ok_or_else(|| format!("unknown state: {}", s))
        })?;
        let severity = parse_list(self.severity.as_deref(), |s| {
            Severity::parse(s).ok_or_else(|| format!("unknown severity: {}", s))
        })?;
        let incident_type = parse_list(self.incident_type.as_deref(), |s| {
            IncidentType::parse(s).ok_or_else(|| format!("unknown incident type: {}", s))
        })?;

        let filter = IncidentFilter {
            state,
            severity,
            incident_type,
            since: self.since,
            until: self.until,
            source: None,
            open_only: self.open_only,
        };
        let pagination = Pagination {
            page: self.page.unwrap_or(1),
            per_page: self.per_page.unwrap_or(20).min(MAX_PER_PAGE),
        };
        Ok((filter, pagination))
    }
}

fn parse_list<T>(
    raw: Option<&str>,
    parse: impl Fn(&str) -> Result<T, String>,
) -> Result<Option<Vec<T>>, ApiError> {
    match raw {
        None => Ok(None),
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| parse(s).map_err(ApiError::BadRequest))
            .collect::<Result<Vec<T>, ApiError>>()
            .map(Some),
    }
}

/// Incident summary returned by list endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct IncidentResponse {
    pub id: Uuid,
    pub incident_id: String,
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub state: IncidentState,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub response_deadline: DateTime<Utc>,
    pub escalated_at: Option<DateTime<Utc>>,
}

impl From<&Incident> for IncidentResponse {
    fn from(incident: &Incident) -> Self {
        Self {
            id: incident.id,
            incident_id: incident.incident_id.clone(),
            incident_type: incident.incident_type,
            severity: incident.severity,
            state: incident.state,
            description: incident.description.clone(),
            created_at: incident.created_at,
            response_deadline: incident.response_deadline,
            escalated_at: incident.escalated_at,
        }
    }
}

/// Full incident detail, including timeline and responders.
#[derive(Debug, Serialize, Deserialize)]
pub struct IncidentDetailResponse {
    #[serde(flatten)]
    pub summary: IncidentResponse,
    pub source: Option<String>,
    pub affected_systems: Vec<String>,
    pub affected_users: Vec<String>,
    pub timeline: Vec<StateChange>,
    pub responders: Vec<Responder>,
    pub initial_findings: Findings,
}

impl From<&Incident> for IncidentDetailResponse {
    fn from(incident: &Incident) -> Self {
        Self {
            summary: IncidentResponse::from(incident),
            source: incident.source.clone(),
            affected_systems: incident.affected_systems.clone(),
            affected_users: incident.affected_users.clone(),
            timeline: incident.state_history.clone(),
            responders: incident.responders.clone(),
            initial_findings: incident.initial_findings.clone(),
        }
    }
}

/// Response for recovery planning.
#[derive(Debug, Serialize)]
pub struct RecoverResponse {
    pub plan: RecoveryPlan,
    /// Present when the caller asked for immediate execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<RecoveryExecutionResult>,
}

/// Pagination metadata.
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u64,
}

/// A paginated list response.
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub pagination: PaginationInfo,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, pagination: &Pagination, total: u64) -> Self {
        Self {
            items,
            pagination: PaginationInfo {
                page: pagination.page,
                per_page: pagination.per_page,
                total,
                total_pages: total.div_ceil(pagination.per_page.max(1) as u64),
            },
        }
    }
}
