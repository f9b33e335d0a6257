//! App connector routes — list, add, remove, probe, per-service flows.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use futures::Stream;
use lakay_connectors::{AddConnectorRequest, ConnectorRecord, ServiceInfo, ServiceKey};
use lakay_core::Error;
use serde_json::json;
use tracing::debug;

use super::{ApiError, ApiResult};
use crate::state::AppState;

type SseStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/apps", get(list_apps).post(add_app))
        .route("/apps/events", get(app_events))
        .route("/apps/services", get(list_services))
        .route("/apps/services/{key}", post(add_service))
        .route("/apps/services/{key}/regenerate", post(regenerate_service))
        .route("/apps/{index}", delete(remove_app))
        .route("/apps/{index}/probe", post(probe_app))
}

async fn list_apps(State(state): State<Arc<AppState>>) -> Json<Vec<ConnectorRecord>> {
    Json(state.apps.list())
}

async fn add_app(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddConnectorRequest>,
) -> ApiResult<Vec<ConnectorRecord>> {
    let records = state.apps.add_custom(&req.server_name, &req.endpoint).await?;
    Ok(Json(records))
}

/// Indexes outside the list, negative ones included, leave it unchanged.
async fn remove_app(
    State(state): State<Arc<AppState>>,
    Path(index): Path<i64>,
) -> ApiResult<Vec<ConnectorRecord>> {
    let Ok(index) = usize::try_from(index) else {
        debug!("Ignoring removal at index {}", index);
        return Ok(Json(state.apps.list()));
    };
    Ok(Json(state.apps.remove(index).await?))
}

async fn probe_app(
    State(state): State<Arc<AppState>>,
    Path(index): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let found = match usize::try_from(index) {
        Ok(index) => state.apps.probe(index).await,
        Err(_) => None,
    };
    let Some((record, outcome)) = found else {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("No connector at index {}", index),
        ));
    };
    Ok(Json(json!({
        "summary": outcome.summary(&record.server_name),
        "connector": record,
        "outcome": outcome,
    })))
}

async fn list_services() -> Json<Vec<ServiceInfo>> {
    Json(ServiceKey::all().iter().map(ServiceKey::info).collect())
}

async fn add_service(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Vec<ConnectorRecord>> {
    Ok(Json(state.apps.add_service(&key).await?))
}

/// Removal and re-add run on their own task; a client hanging up between
/// the two must not leave the service missing.
async fn regenerate_service(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Vec<ConnectorRecord>> {
    let task = tokio::spawn(async move { state.apps.regenerate_service(&key).await });
    let records = task
        .await
        .map_err(|e| Error::Internal(format!("regenerate task: {}", e)))??;
    Ok(Json(records))
}

/// Full list on connect, then again after every change.
async fn app_events(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut rx = state.apps.context().subscribe();

    let stream: SseStream = Box::pin(async_stream::stream! {
        loop {
            let records = rx.borrow_and_update().clone();
            if let Ok(event) = Event::default().event("apps").json_data(records.as_ref()) {
                yield Ok(event);
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
