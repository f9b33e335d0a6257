//! Voice routes — deliver recognized speech into the chat widget.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use lakay_core::Error;
use lakay_voice::{CdpPage, DeliveryOutcome, InjectorConfig, TranscriptInjector};
use serde::Deserialize;
use serde_json::json;

use super::{ApiError, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/voice/transcript", post(deliver_transcript))
        .route("/voice/prefill", post(prefill))
        .route("/voice/config", get(get_config).put(put_config))
}

#[derive(Debug, Deserialize)]
struct TranscriptRequest {
    text: String,
}

async fn deliver_transcript(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TranscriptRequest>,
) -> ApiResult<DeliveryOutcome> {
    let injector = connected(&state, &req.text).await?;
    match injector.deliver(&req.text).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => Err(transport_failure(&state, e).await),
    }
}

async fn prefill(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TranscriptRequest>,
) -> ApiResult<serde_json::Value> {
    let injector = connected(&state, &req.text).await?;
    match injector.prefill(&req.text).await {
        Ok(prefilled) => Ok(Json(json!({ "prefilled": prefilled }))),
        Err(e) => Err(transport_failure(&state, e).await),
    }
}

async fn get_config(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "cdpTarget": state.voice.target().describe(),
        "injector": state.voice.config(),
    }))
}

/// Validate, persist, then apply new injector settings.
async fn put_config(
    State(state): State<Arc<AppState>>,
    Json(mut config): Json<InjectorConfig>,
) -> ApiResult<InjectorConfig> {
    config.validate()?;
    config.config_path = state.config.data_paths.injector_config_file.clone();
    config.save()?;
    state.voice.update(config.clone()).await;
    Ok(Json(config))
}

async fn connected(
    state: &AppState,
    text: &str,
) -> Result<Arc<TranscriptInjector<CdpPage>>, ApiError> {
    if text.trim().is_empty() {
        return Err(Error::InvalidInput("text is required".into()).into());
    }
    match state.voice.injector().await {
        Ok(Some(injector)) => Ok(injector),
        Ok(None) => Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "No chat page configured for voice delivery",
        )),
        Err(e) => Err(ApiError::new(StatusCode::SERVICE_UNAVAILABLE, e.to_string())),
    }
}

async fn transport_failure(state: &AppState, err: Error) -> ApiError {
    if matches!(err, Error::Cdp(_)) {
        state.voice.reset().await;
    }
    err.into()
}
