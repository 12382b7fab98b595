//! Core session struct and CDP command dispatch.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tracing::debug;

use crate::client::Transport;
use crate::error::CdpError;
use crate::protocol::ScreenshotFormat;

use super::events::DialogHandler;

/// Page state maintained from the session's event stream.
#[derive(Default)]
pub(crate) struct SessionState {
    /// Request ids of in-flight network requests.
    pub(crate) inflight: Mutex<HashSet<String>>,
    pub(crate) dialogs: Mutex<Option<DialogHandler>>,
}

/// A session attached to a single page/target.
pub struct PageSession {
    /// Target ID.
    pub(super) target_id: String,
    /// Session ID for this target.
    pub(super) session_id: String,
    pub(super) transport: Arc<Transport>,
    pub(super) state: Arc<SessionState>,
}

impl PageSession {
    /// Create a new page session.
    pub(crate) fn new(target_id: String, session_id: String, transport: Arc<Transport>) -> Self {
        Self {
            target_id,
            session_id,
            transport,
            state: Arc::new(SessionState::default()),
        }
    }

    /// Get target ID.
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Get session ID.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Send a CDP command to this page session.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.transport
            .send(method, params, Some(&self.session_id))
            .await
    }

    /// Enable required CDP domains.
    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("Runtime.enable", None).await?;
        self.call("Network.enable", None).await?;

        debug!("Enabled CDP domains for session {}", self.session_id);
        Ok(())
    }

    /// Number of network requests currently in flight.
    pub fn inflight_requests(&self) -> usize {
        self.state.inflight.lock().len()
    }

    /// Get page HTML content.
    pub async fn get_content(&self) -> Result<String, CdpError> {
        let result = self
            .evaluate("document.documentElement ? document.documentElement.outerHTML : ''")
            .await?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    /// Take a viewport screenshot, base64 encoded.
    pub async fn screenshot(&self, format: ScreenshotFormat) -> Result<String, CdpError> {
        let params = json!({
            "format": format,
            "captureBeyondViewport": false,
        });

        let result = self.call("Page.captureScreenshot", Some(params)).await?;

        result["data"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| CdpError::InvalidResponse("Missing screenshot data".to_string()))
    }
}
