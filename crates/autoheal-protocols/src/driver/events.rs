//! Asynchronous notifications emitted by a driver.

use serde::{Deserialize, Serialize};

use super::types::WindowId;

/// Kind of JavaScript dialog raised by a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogKind {
    Alert,
    Confirm,
    Prompt,
    BeforeUnload,
}

impl DialogKind {
    /// Parse the CDP `type` field of `Page.javascriptDialogOpening`.
    pub fn from_cdp(kind: &str) -> Self {
        match kind {
            "confirm" => DialogKind::Confirm,
            "prompt" => DialogKind::Prompt,
            "beforeunload" => DialogKind::BeforeUnload,
            _ => DialogKind::Alert,
        }
    }
}

/// Window lifecycle and dialog events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WindowEvent {
    /// A window, tab or popup was created.
    Opened {
        id: WindowId,
        opener: Option<WindowId>,
        url: String,
    },
    /// A window was destroyed.
    Closed { id: WindowId },
    /// A page raised a JavaScript dialog.
    Dialog {
        window: WindowId,
        kind: DialogKind,
        message: String,
    },
}
