//! API routes.

pub mod health;
pub mod incidents;
pub mod reference;

use crate::state::AppState;
use axum::Router;

/// Creates the main API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        .merge(health::routes())
        .with_state(state)
}

/// API routes under the versioned prefix.
fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/incidents", incidents::routes())
        .merge(reference::routes())
}
