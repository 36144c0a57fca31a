//! Incident lifecycle endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;
use vigil_core::{ContainmentOutcome, ForensicsRecord, IncidentReport, RecoveryExecutionResult};

use crate::dto::{
    ContainRequest, CreateIncidentRequest, IncidentDetailResponse, IncidentResponse,
    ListIncidentsQuery, PaginatedResponse, RecoverRequest, RecoverResponse, UpdateStateRequest,
};
use crate::error::ApiError;
use crate::state::AppState;

/// Default actor recorded for unattributed API transitions.
const API_ACTOR: &str = "api";

/// Creates incident routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_incident).get(list_incidents))
        .route("/:id", get(get_incident))
        .route("/:id/state", put(update_state))
        .route("/:id/contain", post(contain_incident))
        .route("/:id/forensics", post(collect_forensics).get(list_forensics))
        .route("/:id/recover", post(recover_incident))
        .route("/:id/plans/:plan_id/execute", post(execute_plan))
        .route("/:id/report", get(get_report).post(get_report))
}

/// Create a new incident.
///
/// Critical incidents are contained before this returns.
async fn create_incident(
    State(state): State<AppState>,
    Json(request): Json<CreateIncidentRequest>,
) -> Result<(StatusCode, Json<IncidentDetailResponse>), ApiError> {
    let new_incident = request.into_new_incident()?;
    let incident = state.registry.create_incident(new_incident).await?;
    Ok((
        StatusCode::CREATED,
        Json(IncidentDetailResponse::from(&incident)),
    ))
}

/// List incidents with filtering and pagination.
async fn list_incidents(
    State(state): State<AppState>,
    Query(query): Query<ListIncidentsQuery>,
) -> Result<Json<PaginatedResponse<IncidentResponse>>, ApiError> {
    let (filter, pagination) = query.into_filter()?;
    let (incidents, total) = state.registry.list_incidents(&filter, &pagination).await?;
    let items = incidents.iter().map(IncidentResponse::from).collect();
    Ok(Json(PaginatedResponse::new(items, &pagination, total)))
}

/// Get a single incident, including timeline and responders.
async fn get_incident(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<IncidentDetailResponse>, ApiError> {
    let incident = state.registry.get_incident(id).await?;
    Ok(Json(IncidentDetailResponse::from(&incident)))
}

/// Apply a lifecycle transition.
///
/// Rejected transitions come back as 409 with the allowed targets.
async fn update_state(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStateRequest>,
) -> Result<Json<IncidentDetailResponse>, ApiError> {
    let new_state = request.parse_state()?;
    let actor = request.actor.as_deref().unwrap_or(API_ACTOR);
    let incident = state
        .registry
        .update_state(id, new_state, request.notes.clone(), actor)
        .await?;
    Ok(Json(IncidentDetailResponse::from(&incident)))
}

/// Run containment for an incident.
///
/// Executes the type's default actions plus any extras from the body.
async fn contain_incident(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ContainRequest>,
) -> Result<Json<ContainmentOutcome>, ApiError> {
    let outcome = state.registry.contain(id, &request.actions).await?;
    Ok(Json(outcome))
}

/// Capture a forensics snapshot now.
async fn collect_forensics(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ForensicsRecord>), ApiError> {
    let record = state.registry.collect_forensics(id).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// List forensics snapshots for an incident.
async fn list_forensics(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ForensicsRecord>>, ApiError> {
    let records = state.registry.list_forensics(id).await?;
    Ok(Json(records))
}

/// Generate a recovery plan, optionally executing it immediately.
async fn recover_incident(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecoverRequest>,
) -> Result<Json<RecoverResponse>, ApiError> {
    let (plan, execution) = state.registry.recover(id, request.execute).await?;
    Ok(Json(RecoverResponse { plan, execution }))
}

/// Execute a previously generated recovery plan.
async fn execute_plan(
    State(state): State<AppState>,
    Path((id, plan_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<RecoveryExecutionResult>, ApiError> {
    let result = state.registry.execute_plan(id, plan_id).await?;
    Ok(Json(result))
}

/// Fetch the incident report, generating it if none exists yet.
async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<IncidentReport>, ApiError> {
    let report = state.registry.generate_report(id).await?;
    Ok(Json(report))
}
