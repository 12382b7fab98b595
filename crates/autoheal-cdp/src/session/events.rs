//! Session event pump: network activity tracking and JavaScript dialogs.

use std::sync::Arc;

use autoheal_config::DialogPolicy;
use autoheal_protocols::{DialogKind, WindowEvent, WindowId};
use serde_json::json;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, trace, warn};

use crate::client::Transport;
use crate::protocol::CdpResponse;

use super::core::{PageSession, SessionState};

/// Resource types that stay open indefinitely and never count as in-flight.
const LONG_LIVED_TYPES: &[&str] = &["WebSocket", "EventSource"];

/// How a session answers dialogs, and where it reports them.
#[derive(Clone)]
pub struct DialogHandler {
    pub policy: DialogPolicy,
    pub window: WindowId,
    pub events: broadcast::Sender<WindowEvent>,
}

impl PageSession {
    /// Install the dialog handler for this page.
    pub fn on_dialog(&self, handler: DialogHandler) {
        *self.state.dialogs.lock() = Some(handler);
    }

    /// Start consuming this session's events.
    pub(crate) fn start_event_pump(&self, mut event_rx: mpsc::UnboundedReceiver<CdpResponse>) {
        let state = self.state.clone();
        let transport = self.transport.clone();
        let session_id = self.session_id.clone();

        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                if event.event() == Some("Page.javascriptDialogOpening") {
                    handle_dialog(&state, &transport, &session_id, &event).await;
                } else {
                    apply_network_event(&state, &event);
                }
            }
            trace!("Event pump for session {} finished", session_id);
        });
    }
}

/// Update the in-flight request set from one event.
pub(crate) fn apply_network_event(state: &SessionState, event: &CdpResponse) {
    let request_id = || {
        event
            .param("requestId")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    };

    match event.event() {
        Some("Network.requestWillBeSent") => {
            let kind = event.param("type").and_then(|v| v.as_str()).unwrap_or("");
            if LONG_LIVED_TYPES.contains(&kind) {
                return;
            }
            if let Some(id) = request_id() {
                state.inflight.lock().insert(id);
            }
        }
        Some("Network.loadingFinished") | Some("Network.loadingFailed") => {
            if let Some(id) = request_id() {
                state.inflight.lock().remove(&id);
            }
        }
        Some("Page.frameNavigated") => {
            // A new top-level document abandons the previous page's requests.
            let is_main = event
                .param("frame")
                .map(|f| f.get("parentId").is_none())
                .unwrap_or(false);
            if is_main {
                state.inflight.lock().clear();
            }
        }
        _ => {}
    }
}

async fn handle_dialog(
    state: &Arc<SessionState>,
    transport: &Arc<Transport>,
    session_id: &str,
    event: &CdpResponse,
) {
    let message = event
        .param("message")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let kind = DialogKind::from_cdp(event.param("type").and_then(|v| v.as_str()).unwrap_or(""));

    let handler = state.dialogs.lock().clone();
    let Some(handler) = handler else {
        warn!("Dialog ({:?}) with no handler installed: {}", kind, message);
        return;
    };

    info!(window = %handler.window, ?kind, policy = ?handler.policy, "JavaScript dialog: {}", message);
    let _ = handler.events.send(WindowEvent::Dialog {
        window: handler.window.clone(),
        kind,
        message,
    });

    let accept = match handler.policy {
        DialogPolicy::Accept => true,
        DialogPolicy::Dismiss => false,
        DialogPolicy::Ignore => return,
    };
    if let Err(e) = transport
        .send(
            "Page.handleJavaScriptDialog",
            Some(json!({"accept": accept})),
            Some(session_id),
        )
        .await
    {
        warn!("Failed to answer dialog: {}", e);
    }
}
