//! Browser driver trait definition.

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::events::WindowEvent;
use super::types::{
    FrameInfo, FramePath, NodeQuery, NodeRef, NodeScript, NodeSnapshot, ReadyState, Scope,
    WindowId, WindowInfo,
};
use crate::error::DriverError;

/// Browser automation capability consumed by the engine.
///
/// Implementations open and focus windows, enumerate frames, query DOM
/// nodes within a [`Scope`], run actions against node handles and report
/// window lifecycle events. Calls are issued strictly sequentially by the
/// engine.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// All currently open windows.
    async fn windows(&self) -> Result<Vec<WindowInfo>, DriverError>;

    /// The window the driver currently targets, if any is open.
    async fn current_window(&self) -> Result<Option<WindowId>, DriverError>;

    /// Make `window` the driver's current window.
    async fn focus_window(&self, window: &WindowId) -> Result<(), DriverError>;

    /// Open a new top-level window at `url`.
    async fn open_window(&self, url: &str) -> Result<WindowId, DriverError>;

    /// Navigate `window` to `url` and wait for the load to start.
    async fn navigate(&self, window: &WindowId, url: &str) -> Result<(), DriverError>;

    /// Direct child frames of the frame at `frame`.
    ///
    /// Fails with [`DriverError::CrossOrigin`] when the frame's document is not accessible.
    async fn child_frames(
        &self,
        window: &WindowId,
        frame: &FramePath,
    ) -> Result<Vec<FrameInfo>, DriverError>;

    /// Nodes within `scope` matching the `query` hint, in document order.
    async fn query(&self, scope: &Scope, query: NodeQuery)
    -> Result<Vec<NodeSnapshot>, DriverError>;

    /// Structure-agnostic walk of the window's documents, shadow trees and
    /// accessible frames for nodes whose text or attributes contain `needle`.
    async fn deep_scan(
        &self,
        window: &WindowId,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<NodeSnapshot>, DriverError>;

    /// Click the node. `force` bypasses actionability checks.
    async fn click(&self, node: &NodeRef, force: bool) -> Result<(), DriverError>;

    /// Replace the node's value by typing. `force` bypasses actionability checks.
    async fn fill(&self, node: &NodeRef, value: &str, force: bool) -> Result<(), DriverError>;

    /// Choose an option of a select-like node by value or visible text.
    async fn select_option(
        &self,
        node: &NodeRef,
        value: &str,
        force: bool,
    ) -> Result<(), DriverError>;

    /// Run a state-mutation or event-dispatch script in the node's own context.
    async fn run_node_script(&self, node: &NodeRef, script: NodeScript)
    -> Result<(), DriverError>;

    /// `document.readyState` of the frame at `frame`.
    async fn ready_state(
        &self,
        window: &WindowId,
        frame: &FramePath,
    ) -> Result<ReadyState, DriverError>;

    /// Whether the window has no in-flight network requests.
    async fn network_idle(&self, window: &WindowId) -> Result<bool, DriverError>;

    /// Number of visible elements matching a CSS selector in the main document.
    async fn count_visible(&self, window: &WindowId, selector: &str) -> Result<usize, DriverError>;

    /// Visible text of the main document and accessible frames.
    async fn page_text(&self, window: &WindowId) -> Result<String, DriverError>;

    /// Serialized HTML of the main document.
    async fn page_source(&self, window: &WindowId) -> Result<String, DriverError>;

    /// PNG screenshot of the window's viewport.
    async fn screenshot(&self, window: &WindowId) -> Result<Vec<u8>, DriverError>;

    /// Subscribe to window lifecycle and dialog events.
    fn subscribe(&self) -> broadcast::Receiver<WindowEvent>;

    /// Release driver resources. The browser itself is left running.
    async fn shutdown(&self) -> Result<(), DriverError> {
        Ok(())
    }
}
