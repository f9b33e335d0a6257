//! Chat-runtime registration snapshot.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use lakay_connectors::sink::RegistrationSnapshot;

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/runtime/mcp-servers", get(mcp_servers))
}

async fn mcp_servers(State(state): State<Arc<AppState>>) -> Json<RegistrationSnapshot> {
    Json(state.apps.runtime().snapshot())
}
