//! CDP WebSocket client.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};

use super::error::CdpError;
use super::protocol::{BrowserVersion, CdpRequest, CdpResponse, TargetInfo};
use super::session::PageSession;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;
type EventHandlers = Arc<RwLock<HashMap<String, mpsc::UnboundedSender<CdpResponse>>>>;

/// Pending request waiting for response.
pub(crate) struct PendingRequest {
    pub tx: oneshot::Sender<Result<Value, CdpError>>,
}

/// Request plumbing shared by the client and every page session.
pub(crate) struct Transport {
    ws_tx: tokio::sync::Mutex<WsSink>,
    pending: Mutex<HashMap<u64, PendingRequest>>,
    request_id: AtomicU64,
    connected: AtomicBool,
    timeout: Duration,
}

impl Transport {
    /// Send a CDP command and wait for its response.
    pub(crate) async fn send(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
    ) -> Result<Value, CdpError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(CdpError::SessionClosed);
        }

        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(|s| s.to_string()),
        };

        let json = serde_json::to_string(&request)?;
        trace!("CDP send: {}", json);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, PendingRequest { tx });

        {
            let mut ws = self.ws_tx.lock().await;
            if let Err(e) = ws.send(Message::Text(json.into())).await {
                self.pending.lock().remove(&id);
                return Err(e.into());
            }
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout(format!("Request {} timed out", method)))
            }
        }
    }

    fn resolve(&self, resp: CdpResponse) {
        let Some(id) = resp.id else {
            return;
        };
        let pending_req = self.pending.lock().remove(&id);
        if let Some(req) = pending_req {
            let result = match resp.error {
                Some(error) => Err(CdpError::Protocol {
                    code: error.code,
                    message: error.message,
                }),
                None => Ok(resp.result.unwrap_or(Value::Null)),
            };
            let _ = req.tx.send(result);
        }
    }

    fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::SeqCst);
        // Dropping the senders fails every waiter with SessionClosed.
        self.pending.lock().clear();
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// CDP client for browser automation.
///
/// Connects to Chrome via WebSocket. Responses are matched to requests by
/// id; events are routed to page sessions by CDP session id, and
/// browser-level events (no session id) to a single browser event channel.
pub struct CdpClient {
    /// Browser WebSocket URL.
    browser_ws_url: String,
    transport: Arc<Transport>,
    event_handlers: EventHandlers,
    browser_events: Mutex<Option<mpsc::UnboundedReceiver<CdpResponse>>>,
    /// Background task handle.
    _recv_task: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to Chrome at the given endpoint.
    ///
    /// `endpoint` is either the debugging HTTP endpoint
    /// (e.g. `http://localhost:9222`) or a browser WebSocket URL.
    ///
    /// ```rust,ignore
    /// let client = CdpClient::connect("http://localhost:9222", Duration::from_secs(30)).await?;
    /// ```
    pub async fn connect(endpoint: &str, timeout: Duration) -> Result<Self, CdpError> {
        let browser_ws_url = Self::discover_ws_url(endpoint).await?;

        let (ws_stream, _) = tokio_tungstenite::connect_async(&browser_ws_url)
            .await
            .map_err(|e| CdpError::ConnectionFailed(format!("WebSocket: {}", e)))?;

        let (ws_sink, ws_source) = ws_stream.split();
        let transport = Arc::new(Transport {
            ws_tx: tokio::sync::Mutex::new(ws_sink),
            pending: Mutex::new(HashMap::new()),
            request_id: AtomicU64::new(1),
            connected: AtomicBool::new(true),
            timeout,
        });
        let event_handlers: EventHandlers = Arc::new(RwLock::new(HashMap::new()));
        let (browser_tx, browser_rx) = mpsc::unbounded_channel();

        let recv_task = {
            let transport = transport.clone();
            let event_handlers = event_handlers.clone();
            tokio::spawn(async move {
                Self::receive_loop(ws_source, transport, event_handlers, browser_tx).await;
            })
        };

        debug!("CDP client connected to {}", browser_ws_url);

        Ok(Self {
            browser_ws_url,
            transport,
            event_handlers,
            browser_events: Mutex::new(Some(browser_rx)),
            _recv_task: recv_task,
        })
    }

    async fn discover_ws_url(endpoint: &str) -> Result<String, CdpError> {
        if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
            url::Url::parse(endpoint)?;
            return Ok(endpoint.to_string());
        }

        let http_endpoint = endpoint.trim_end_matches('/');
        let version_url = format!("{}/json/version", http_endpoint);
        debug!("Fetching browser version from {}", version_url);

        let version: BrowserVersion = reqwest::get(&version_url)
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?
            .json()
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?;

        debug!("Connected to browser: {}", version.browser);
        Ok(version.web_socket_debugger_url)
    }

    /// WebSocket receive loop.
    async fn receive_loop(
        mut ws_source: WsSource,
        transport: Arc<Transport>,
        event_handlers: EventHandlers,
        browser_tx: mpsc::UnboundedSender<CdpResponse>,
    ) {
        while let Some(msg) = ws_source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    trace!("CDP recv: {}", text);
                    let resp = match serde_json::from_str::<CdpResponse>(&text) {
                        Ok(resp) => resp,
                        Err(e) => {
                            warn!("Failed to parse CDP message: {}", e);
                            continue;
                        }
                    };

                    if resp.id.is_some() {
                        transport.resolve(resp);
                    } else if resp.method.is_some() {
                        match resp.session_id.clone() {
                            Some(session_id) => {
                                let handlers = event_handlers.read().await;
                                if let Some(tx) = handlers.get(&session_id) {
                                    let _ = tx.send(resp);
                                }
                            }
                            None => {
                                let _ = browser_tx.send(resp);
                            }
                        }
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("WebSocket closed");
                    break;
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
        transport.mark_disconnected();
    }

    /// Send a browser-level CDP command and wait for response.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.transport.send(method, params, None).await
    }

    /// Get browser WebSocket URL.
    pub fn browser_ws_url(&self) -> &str {
        &self.browser_ws_url
    }

    /// Whether the WebSocket is still open.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Take the receiver of browser-level events. Only the first caller gets it.
    pub fn take_browser_events(&self) -> Option<mpsc::UnboundedReceiver<CdpResponse>> {
        self.browser_events.lock().take()
    }

    // ========================================================================
    // Target Management
    // ========================================================================

    /// Turn on `Target.targetCreated` / `targetDestroyed` / `targetInfoChanged` events.
    pub async fn discover_targets(&self) -> Result<(), CdpError> {
        self.call("Target.setDiscoverTargets", Some(json!({"discover": true})))
            .await?;
        Ok(())
    }

    /// Get all targets.
    pub async fn get_targets(&self) -> Result<Vec<TargetInfo>, CdpError> {
        let result = self.call("Target.getTargets", None).await?;
        let targets: Vec<TargetInfo> = serde_json::from_value(result["targetInfos"].clone())?;
        Ok(targets)
    }

    /// Create a new page target and return its id.
    pub async fn create_target(&self, url: &str) -> Result<String, CdpError> {
        let result = self
            .call("Target.createTarget", Some(json!({"url": url})))
            .await?;
        let target_id = result["targetId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing targetId".to_string()))?
            .to_string();
        debug!("Created new page: {} - {}", target_id, url);
        Ok(target_id)
    }

    /// Bring a target to the foreground.
    pub async fn activate_target(&self, target_id: &str) -> Result<(), CdpError> {
        self.call(
            "Target.activateTarget",
            Some(json!({"targetId": target_id})),
        )
        .await?;
        Ok(())
    }

    /// Attach to an existing page.
    pub async fn attach_page(&self, target_id: &str) -> Result<PageSession, CdpError> {
        let result = self
            .call(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": target_id,
                    "flatten": true
                })),
            )
            .await?;

        let session_id = result["sessionId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing sessionId".to_string()))?
            .to_string();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        self.event_handlers
            .write()
            .await
            .insert(session_id.clone(), event_tx);

        let session = PageSession::new(
            target_id.to_string(),
            session_id,
            self.transport.clone(),
        );
        session.start_event_pump(event_rx);
        session.enable_domains().await?;

        Ok(session)
    }

    /// Stop routing events to a session.
    pub async fn forget_session(&self, session_id: &str) {
        self.event_handlers.write().await.remove(session_id);
    }

    /// Close a page/target.
    pub async fn close_page(&self, target_id: &str) -> Result<(), CdpError> {
        self.call("Target.closeTarget", Some(json!({"targetId": target_id})))
            .await?;
        Ok(())
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self._recv_task.abort();
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
