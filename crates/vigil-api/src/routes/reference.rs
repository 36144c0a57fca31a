//! Reference data endpoints: playbooks and aggregate statistics.

use axum::{extract::State, routing::get, Json, Router};
use vigil_core::{all_playbooks, IncidentStatistics, Playbook};

use crate::error::ApiError;
use crate::state::AppState;

/// Creates reference routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/playbooks", get(list_playbooks))
        .route("/statistics", get(statistics))
}

/// Response playbooks for every incident type.
async fn list_playbooks() -> Json<Vec<Playbook>> {
    Json(all_playbooks())
}

/// Aggregate incident counts and operation counters.
async fn statistics(
    State(state): State<AppState>,
) -> Result<Json<IncidentStatistics>, ApiError> {
    let stats = state.registry.statistics().await?;
    Ok(Json(stats))
}
