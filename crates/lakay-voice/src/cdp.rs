//! CDP page — drives a browser tab over the Chrome DevTools Protocol.
//!
//! Each DOM operation is one `Runtime.evaluate` round trip. Element handles
//! are selectors and are re-resolved on every operation, so a widget that
//! re-renders between phases is followed to its new node.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use lakay_core::{Error, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::dom::{DomEvent, Element, Page};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default bound on a single evaluate round trip.
const EVALUATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Target entry from the DevTools `/json` listing.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetInfo {
    #[serde(rename = "type")]
    pub target_type: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: Option<String>,
}

struct CdpSession {
    socket: Mutex<WsStream>,
    next_id: AtomicU64,
    timeout: Duration,
}

impl CdpSession {
    async fn evaluate(&self, expression: &str) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "id": id,
            "method": "Runtime.evaluate",
            "params": {
                "expression": expression,
                "returnByValue": true,
                "awaitPromise": true,
            },
        });

        let mut socket = self.socket.lock().await;
        socket
            .send(Message::Text(request.to_string()))
            .await
            .map_err(|e| Error::Cdp(format!("send failed: {}", e)))?;

        let response = tokio::time::timeout(self.timeout, async {
            loop {
                match socket.next().await {
                    Some(Ok(Message::Text(text))) => {
                        let message: Value = match serde_json::from_str(&text) {
                            Ok(message) => message,
                            Err(e) => return Err(Error::from(e)),
                        };
                        if message.get("id").and_then(Value::as_u64) == Some(id) {
                            return Ok(message);
                        }
                        // protocol events and stale replies
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return Err(Error::Cdp("connection closed".into()))
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(Error::Cdp(format!("receive failed: {}", e))),
                }
            }
        })
        .await
        .map_err(|_| Error::Cdp(format!("no reply to request {} within {:?}", id, self.timeout)))??;

        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(Error::Cdp(message.to_string()));
        }
        let result = &response["result"];
        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception
                .pointer("/exception/description")
                .or_else(|| exception.get("text"))
                .and_then(Value::as_str)
                .unwrap_or("exception");
            return Err(Error::Cdp(format!("script threw: {}", text)));
        }
        Ok(result
            .pointer("/result/value")
            .cloned()
            .unwrap_or(Value::Null))
    }
}

/// A browser tab reached through its DevTools websocket.
#[derive(Clone)]
pub struct CdpPage {
    session: Arc<CdpSession>,
    ws_url: String,
}

impl CdpPage {
    /// Connect to a page's `webSocketDebuggerUrl`.
    pub async fn connect(ws_url: &str) -> Result<Self> {
        let (socket, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| Error::Cdp(format!("connect {} failed: {}", ws_url, e)))?;
        info!("Connected to DevTools page {}", ws_url);
        Ok(Self {
            session: Arc::new(CdpSession {
                socket: Mutex::new(socket),
                next_id: AtomicU64::new(1),
                timeout: EVALUATE_TIMEOUT,
            }),
            ws_url: ws_url.to_string(),
        })
    }

    /// Find the first page target under a DevTools HTTP endpoint
    /// (e.g. `http://127.0.0.1:9222`), preferring one whose URL contains
    /// `url_hint`, and connect to it.
    pub async fn discover(http_base: &str, url_hint: Option<&str>) -> Result<Self> {
        let list_url = format!("{}/json", http_base.trim_end_matches('/'));
        let targets: Vec<TargetInfo> = reqwest::get(&list_url)
            .await
            .map_err(|e| Error::Http(format!("{}: {}", list_url, e)))?
            .json()
            .await
            .map_err(|e| Error::Http(format!("{}: {}", list_url, e)))?;

        let ws_url = pick_target(&targets, url_hint)
            .ok_or_else(|| Error::Cdp(format!("no page target at {}", list_url)))?;
        Self::connect(&ws_url).await
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Evaluate a script in the page and return its JSON value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value> {
        self.session.evaluate(expression).await
    }
}

fn pick_target(targets: &[TargetInfo], url_hint: Option<&str>) -> Option<String> {
    let pages = targets
        .iter()
        .filter(|t| t.target_type == "page" && t.web_socket_debugger_url.is_some());
    let chosen = match url_hint {
        Some(hint) => pages
            .clone()
            .find(|t| t.url.contains(hint))
            .or_else(|| pages.clone().next()),
        None => pages.clone().next(),
    }?;
    debug!(title = %chosen.title, "Picked DevTools target {}", chosen.url);
    chosen.web_socket_debugger_url.clone()
}

/// JS string literal for `value`.
fn js_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

#[async_trait]
impl Page for CdpPage {
    type Element = CdpElement;

    async fn query(&self, selector: &str) -> Result<Option<CdpElement>> {
        let script = format!("document.querySelector({}) !== null", js_string(selector));
        let found = self.session.evaluate(&script).await?;
        Ok(found.as_bool().unwrap_or(false).then(|| CdpElement {
            session: self.session.clone(),
            selector: selector.to_string(),
        }))
    }
}

/// Element addressed by selector in a [`CdpPage`].
pub struct CdpElement {
    session: Arc<CdpSession>,
    selector: String,
}

impl CdpElement {
    /// Run `body` with `el` bound to the element; `null` when it is gone.
    async fn run(&self, body: &str) -> Result<Value> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return null; {} }})()",
            js_string(&self.selector),
            body
        );
        self.session.evaluate(&script).await
    }

    async fn run_action(&self, body: &str) -> Result<()> {
        match self.run(body).await? {
            Value::Null => Err(Error::Cdp(format!(
                "element {} is no longer in the document",
                self.selector
            ))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Element for CdpElement {
    async fn is_connected(&self) -> Result<bool> {
        Ok(self
            .run("return el.isConnected;")
            .await?
            .as_bool()
            .unwrap_or(false))
    }

    async fn value(&self) -> Result<String> {
        match self.run("return String(el.value ?? el.textContent ?? '');").await? {
            Value::String(value) => Ok(value),
            _ => Err(Error::Cdp(format!(
                "element {} is no longer in the document",
                self.selector
            ))),
        }
    }

    async fn set_value(&self, value: &str) -> Result<()> {
        self.run_action(&set_value_body(value)).await
    }

    async fn dispatch(&self, event: DomEvent) -> Result<()> {
        let event_type = js_string(event.event_type());
        let body = match event.key() {
            Some(key) => format!(
                "el.dispatchEvent(new KeyboardEvent({}, {{ key: {k}, code: {k}, keyCode: 13, which: 13, bubbles: true, cancelable: true }})); return true;",
                event_type,
                k = js_string(key)
            ),
            None => format!(
                "el.dispatchEvent(new Event({}, {{ bubbles: true }})); return true;",
                event_type
            ),
        };
        self.run_action(&body).await
    }

    async fn focus(&self) -> Result<()> {
        self.run_action("el.focus(); return true;").await
    }

    async fn click(&self) -> Result<()> {
        self.run_action("el.click(); return true;").await
    }
}

/// Script body writing `value` into `el`.
///
/// Editable regions take text content. Form controls go through their
/// prototype's setter, which bypasses framework-managed value properties so
/// the following input event is seen as a real edit.
fn set_value_body(value: &str) -> String {
    format!(
        "if (el.isContentEditable) {{ el.textContent = {value}; }} else {{ \
         const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype \
         : el instanceof HTMLInputElement ? HTMLInputElement.prototype : null; \
         const setter = proto && Object.getOwnPropertyDescriptor(proto, 'value')?.set; \
         if (setter) {{ setter.call(el, {value}); }} else {{ el.value = {value}; }} }} \
         return true;",
        value = js_string(value)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InjectorConfig;
    use crate::injector::TranscriptInjector;
    use crate::types::{DeliveryOutcome, SubmitVia};
    use tokio::net::TcpListener;

    type Responder = Arc<dyn Fn(&str) -> Value + Send + Sync>;

    /// Minimal DevTools endpoint: answers every Runtime.evaluate with
    /// `respond(expression)`, emitting an unrelated event first.
    async fn fake_devtools(respond: Responder) -> (String, Arc<parking_lot::Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let log = seen.clone();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            while let Some(Ok(Message::Text(text))) = ws.next().await {
                let request: Value = serde_json::from_str(&text).unwrap();
                let expression = request["params"]["expression"].as_str().unwrap().to_string();
                log.lock().push(expression.clone());

                let event = json!({ "method": "Runtime.consoleAPICalled", "params": {} });
                ws.send(Message::Text(event.to_string())).await.unwrap();

                let reply = match respond(&expression) {
                    Value::Object(o) if o.contains_key("exceptionDetails") => {
                        json!({ "id": request["id"], "result": Value::Object(o) })
                    }
                    value => json!({
                        "id": request["id"],
                        "result": { "result": { "type": "object", "value": value } }
                    }),
                };
                ws.send(Message::Text(reply.to_string())).await.unwrap();
            }
        });

        (format!("ws://{}/devtools/page/1", addr), seen)
    }

    fn query_of(selector: &str) -> String {
        format!("document.querySelector({})", js_string(selector))
    }

    #[tokio::test]
    async fn test_evaluate_skips_events() {
        let (url, _) = fake_devtools(Arc::new(|_: &str| json!(42))).await;
        let page = CdpPage::connect(&url).await.unwrap();
        assert_eq!(page.evaluate("6 * 7").await.unwrap(), json!(42));
        assert_eq!(page.evaluate("40 + 2").await.unwrap(), json!(42));
    }

    #[tokio::test]
    async fn test_exception_is_error() {
        let (url, _) = fake_devtools(Arc::new(|_: &str| {
            json!({ "exceptionDetails": { "text": "Uncaught", "exception": { "description": "ReferenceError: x" } } })
        }))
        .await;
        let page = CdpPage::connect(&url).await.unwrap();
        let err = page.evaluate("x").await.unwrap_err();
        assert!(err.to_string().contains("ReferenceError"));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        assert!(CdpPage::connect(&format!("ws://{}/devtools/page/1", addr))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_delivery_over_cdp() {
        let present = [
            query_of(".copilotkit-chat-input textarea"),
            query_of(r#".copilotkit-chat-input button[type="submit"]"#),
        ];
        let (url, seen) = fake_devtools(Arc::new(move |expr: &str| {
            if expr.ends_with("!== null") {
                json!(present.iter().any(|q| expr.starts_with(q.as_str())))
            } else if expr.contains("String(el.value") {
                json!("")
            } else {
                json!(true)
            }
        }))
        .await;

        let page = Arc::new(CdpPage::connect(&url).await.unwrap());
        let config = InjectorConfig {
            confirm_delay_ms: Some(0),
            ..InjectorConfig::immediate()
        };
        let outcome = TranscriptInjector::new(page, config)
            .deliver("bonjour \"Sara\"")
            .await
            .unwrap();

        match outcome {
            DeliveryOutcome::Delivered(report) => {
                assert_eq!(report.surface, "copilotkit-input");
                assert_eq!(
                    report.submitted_via,
                    SubmitVia::Control {
                        label: "copilotkit-submit".into()
                    }
                );
                assert_eq!(report.confirmed, Some(true));
            }
            other => panic!("unexpected: {:?}", other),
        }

        let seen = seen.lock();
        let set_at = seen
            .iter()
            .position(|e| e.contains(r#"setter.call(el, "bonjour \"Sara\"")"#))
            .unwrap();
        let events: Vec<&str> = seen[set_at + 1..]
            .iter()
            .filter_map(|e| {
                ["\"input\"", "\"change\"", "\"keyup\""]
                    .into_iter()
                    .find(|name| e.contains(&format!("new Event({}", name)))
            })
            .collect();
        assert_eq!(events, vec!["\"input\"", "\"change\"", "\"keyup\""]);
        assert!(seen.iter().any(|e| e.contains("el.click()")));
    }

    #[tokio::test]
    async fn test_discover_picks_page_target() {
        use axum::routing::get;
        use axum::{Json, Router};

        let (ws_url, _) = fake_devtools(Arc::new(|_: &str| json!(true))).await;
        let listing = json!([
            { "type": "service_worker", "url": "chrome://sw", "webSocketDebuggerUrl": "ws://nowhere" },
            { "type": "page", "url": "http://localhost:3000/", "title": "Lakay", "webSocketDebuggerUrl": ws_url },
        ]);
        let app = Router::new().route("/json", get(move || async move { Json(listing) }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let page = CdpPage::discover(&format!("http://{}/", addr), Some("localhost:3000"))
            .await
            .unwrap();
        assert_eq!(page.ws_url(), ws_url);
    }

    #[test]
    fn test_pick_target_prefers_hint() {
        let target = |url: &str, ws: &str| TargetInfo {
            target_type: "page".into(),
            url: url.into(),
            title: String::new(),
            web_socket_debugger_url: Some(ws.into()),
        };
        let targets = vec![target("https://other", "ws://1"), target("http://localhost:3000/chat", "ws://2")];

        assert_eq!(pick_target(&targets, Some("localhost:3000")).as_deref(), Some("ws://2"));
        assert_eq!(pick_target(&targets, Some("missing")).as_deref(), Some("ws://1"));
        assert_eq!(pick_target(&targets, None).as_deref(), Some("ws://1"));
        assert_eq!(pick_target(&[], None), None);
    }

    #[test]
    fn test_editable_regions_take_text_content() {
        let body = set_value_body("salut");
        let editable = body.find("if (el.isContentEditable)").unwrap();
        let assign = body.find(r#"el.textContent = "salut";"#).unwrap();
        let setter = body.find("setter.call(el").unwrap();
        assert!(editable < assign && assign < setter);
        // a non-control element never reaches a foreign prototype setter
        assert!(body.contains("el instanceof HTMLInputElement ? HTMLInputElement.prototype : null"));
    }
}
