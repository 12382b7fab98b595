//! Driver-level errors.

use thiserror::Error;

/// Errors reported by a [`BrowserDriver`](crate::BrowserDriver).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriverError {
    /// The frame's document cannot be accessed (cross-origin).
    #[error("Frame not accessible: {0}")]
    CrossOrigin(String),

    /// A node handle no longer refers to a connected element.
    #[error("Stale element: {0}")]
    StaleElement(String),

    /// The window behind a handle has been destroyed.
    #[error("Window closed: {0}")]
    WindowClosed(String),

    /// The element exists but failed the driver's actionability checks.
    #[error("Element not actionable: {0}")]
    NotActionable(String),

    /// Script evaluation threw inside the page.
    #[error("Script error: {0}")]
    Script(String),

    /// A driver call did not complete in time.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The browser session is gone; nothing further can be driven.
    #[error("Browser disconnected: {0}")]
    Disconnected(String),

    /// Low-level protocol failure.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The driver does not implement this capability.
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl DriverError {
    /// Whether the error means the browser session itself is unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DriverError::Disconnected(_))
    }

    /// Whether the error means a previously enumerated window or node went away.
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            DriverError::StaleElement(_) | DriverError::WindowClosed(_)
        )
    }
}
