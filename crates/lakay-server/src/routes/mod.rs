//! HTTP route handlers — the surface the Lakay UI calls.

pub mod apps;
pub mod identity;
pub mod runtime;
pub mod voice;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use lakay_core::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::state::AppState;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(apps::routes())
        .merge(identity::routes())
        .merge(runtime::routes())
        .merge(voice::routes())
}

/// Error body `{ "error": "..." }` with a status derived from the failure.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::UnknownService(_) | Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::Sink { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status != StatusCode::BAD_REQUEST {
            warn!("Request failed: {}", err);
        }
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::state::{CdpTarget, VoiceLink};
    use axum::body::Body;
    use axum::http::Request;
    use lakay_connectors::{AppManager, ConnectionProbe, MemoryStore, RuntimeRegistry};
    use lakay_core::{DataPaths, LakayConfig};
    use lakay_voice::InjectorConfig;
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    pub(crate) struct TestApp {
        pub router: Router,
        pub state: Arc<AppState>,
        _dir: tempfile::TempDir,
    }

    pub(crate) fn test_app() -> TestApp {
        test_app_with(AppManager::new(
            Arc::new(MemoryStore::new()),
            Arc::new(RuntimeRegistry::local()),
            ConnectionProbe::new(Duration::from_secs(1)),
        ))
    }

    pub(crate) fn test_app_with(apps: AppManager) -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let config = LakayConfig {
            port: 0,
            data_paths: DataPaths::new(dir.path()).unwrap(),
            cdp_url: None,
            cdp_http: None,
            runtime_url: None,
            probe_timeout_secs: 1,
        };
        let voice = VoiceLink::new(CdpTarget::None, InjectorConfig::immediate());
        let state = Arc::new(AppState::from_parts(config, apps, voice));
        TestApp {
            router: build_router(state.clone()),
            state,
            _dir: dir,
        }
    }

    pub(crate) async fn call(
        app: &TestApp,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (Error::UnknownService("fax".into()), StatusCode::BAD_REQUEST),
            (Error::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (Error::sink("runtime", "refused"), StatusCode::BAD_GATEWAY),
            (Error::Cdp("closed".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = test_app();
        let (status, _) = call(&app, "GET", "/api/nothing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
