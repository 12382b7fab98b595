//! CDP error types.

use autoheal_protocols::DriverError;
use thiserror::Error;

/// CDP client errors.
#[derive(Debug, Error)]
pub enum CdpError {
    /// Failed to connect to Chrome.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Chrome not found or not running with remote debugging.
    #[error("Chrome not available at {0}. Start Chrome with: chrome --remote-debugging-port=9222")]
    ChromeNotAvailable(String),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// CDP protocol error.
    #[error("CDP error: {message} (code: {code})")]
    Protocol { code: i64, message: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error (for endpoint discovery).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Page not found.
    #[error("Page not found: {0}")]
    PageNotFound(String),

    /// Navigation failed.
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// JavaScript execution error.
    #[error("JavaScript error: {0}")]
    JavaScript(String),

    /// Timeout.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Session closed.
    #[error("Session closed")]
    SessionClosed,

    /// Invalid response.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Marker prefixes thrown by the injected page library.
pub(crate) const STALE_MARKER: &str = "STALE:";
pub(crate) const CROSS_ORIGIN_MARKER: &str = "XORIGIN:";
pub(crate) const NOT_ACTIONABLE_MARKER: &str = "NOTACTIONABLE:";

fn marker_detail<'a>(message: &'a str, marker: &str) -> Option<&'a str> {
    message.find(marker).map(|idx| {
        let rest = &message[idx + marker.len()..];
        rest.lines().next().unwrap_or("").trim()
    })
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        CdpError::Http(e.to_string())
    }
}

impl From<url::ParseError> for CdpError {
    fn from(e: url::ParseError) -> Self {
        CdpError::ConnectionFailed(format!("Invalid URL: {}", e))
    }
}

impl From<CdpError> for DriverError {
    fn from(err: CdpError) -> Self {
        match err {
            CdpError::JavaScript(msg) => {
                if let Some(detail) = marker_detail(&msg, STALE_MARKER) {
                    DriverError::StaleElement(detail.to_string())
                } else if let Some(detail) = marker_detail(&msg, CROSS_ORIGIN_MARKER) {
                    DriverError::CrossOrigin(detail.to_string())
                } else if let Some(detail) = marker_detail(&msg, NOT_ACTIONABLE_MARKER) {
                    DriverError::NotActionable(detail.to_string())
                } else {
                    DriverError::Script(msg)
                }
            }
            CdpError::Protocol { code, message } => {
                let lower = message.to_ascii_lowercase();
                if lower.contains("no target with given id")
                    || lower.contains("session with given id not found")
                    || lower.contains("target closed")
                {
                    DriverError::WindowClosed(message)
                } else if lower.contains("cannot find context with specified id")
                    || lower.contains("execution context was destroyed")
                {
                    DriverError::StaleElement(message)
                } else {
                    DriverError::Protocol(format!("{} (code: {})", message, code))
                }
            }
            CdpError::PageNotFound(id) => DriverError::WindowClosed(id),
            CdpError::Timeout(msg) => DriverError::Timeout(msg),
            CdpError::SessionClosed => DriverError::Disconnected("session closed".to_string()),
            CdpError::WebSocket(msg)
            | CdpError::ConnectionFailed(msg)
            | CdpError::ChromeNotAvailable(msg) => DriverError::Disconnected(msg),
            other => DriverError::Protocol(other.to_string()),
        }
    }
}
