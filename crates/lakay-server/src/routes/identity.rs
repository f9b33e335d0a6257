//! Identity routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use lakay_connectors::UserIdentity;

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/identity", get(get_identity))
        .route("/identity/regenerate", post(regenerate_identity))
}

async fn get_identity(State(state): State<Arc<AppState>>) -> Json<UserIdentity> {
    Json(state.apps.identity())
}

/// Connectors already in the list keep the endpoints they were built with.
async fn regenerate_identity(State(state): State<Arc<AppState>>) -> Json<UserIdentity> {
    Json(state.apps.regenerate_identity())
}
