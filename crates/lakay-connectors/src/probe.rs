//! Connection probe — single-shot HEAD reachability check.

use std::time::Duration;

use reqwest::redirect::Policy;
use tracing::{debug, warn};

use crate::types::ProbeOutcome;

/// Classifies an endpoint as reachable, unreachable or erroring.
#[derive(Clone)]
pub struct ConnectionProbe {
    client: reqwest::Client,
}

impl ConnectionProbe {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .build()
            .unwrap_or_else(|e| {
                warn!("Probe client build failed, using defaults: {}", e);
                reqwest::Client::new()
            });
        Self { client }
    }

    /// Issue one HEAD request. Failures are classified, never returned as errors.
    pub async fn probe(&self, endpoint: &str) -> ProbeOutcome {
        debug!("Probing {}", endpoint);
        match self.client.head(endpoint).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() || status.is_redirection() {
                    ProbeOutcome::Reachable
                } else {
                    ProbeOutcome::Unreachable {
                        status_code: status.as_u16(),
                    }
                }
            }
            Err(e) => ProbeOutcome::Error {
                message: e.to_string(),
            },
        }
    }
}

impl Default for ConnectionProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::Redirect;
    use axum::routing::get;
    use axum::Router;

    async fn serve() -> String {
        let app = Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route("/moved", get(|| async { Redirect::temporary("/nowhere") }))
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_success_and_redirect_are_reachable() {
        let base = serve().await;
        let probe = ConnectionProbe::default();
        assert_eq!(probe.probe(&format!("{}/ok", base)).await, ProbeOutcome::Reachable);
        assert_eq!(probe.probe(&format!("{}/moved", base)).await, ProbeOutcome::Reachable);
    }

    #[tokio::test]
    async fn test_error_status_is_unreachable() {
        let base = serve().await;
        let outcome = ConnectionProbe::default()
            .probe(&format!("{}/missing", base))
            .await;
        assert_eq!(outcome, ProbeOutcome::Unreachable { status_code: 404 });
    }

    #[tokio::test]
    async fn test_transport_failure_is_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let outcome = ConnectionProbe::default()
            .probe(&format!("http://{}/", addr))
            .await;
        assert!(matches!(outcome, ProbeOutcome::Error { .. }));
    }

    #[tokio::test]
    async fn test_timeout_is_error() {
        let base = serve().await;
        let outcome = ConnectionProbe::new(Duration::from_millis(100))
            .probe(&format!("{}/slow", base))
            .await;
        assert!(matches!(outcome, ProbeOutcome::Error { .. }));
    }

    #[tokio::test]
    async fn test_invalid_url_is_error() {
        let outcome = ConnectionProbe::default().probe("not a url").await;
        assert!(matches!(outcome, ProbeOutcome::Error { .. }));
    }
}
