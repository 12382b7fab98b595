//! Context Enumerator.
//!
//! Turns one window into the ordered list of scopes the matcher searches:
//! overlay containers, the main document, nested frames (breadth-first,
//! capped) and shadow roots (worklist, depth-capped).

use std::collections::VecDeque;

use autoheal_config::ResolutionConfig;
use autoheal_protocols::{
    BrowserDriver, DriverError, FramePath, NodeHandle, NodeQuery, NodeSnapshot, Scope, ScopeRoot,
    WindowId,
};
use serde::Serialize;
use tracing::{debug, warn};

const OVERLAY_CLASS_HINTS: [&str; 4] = ["modal", "overlay", "dialog", "popup"];
const MIN_OVERLAY_Z: i64 = 100;
const MIN_OVERLAY_WIDTH: f64 = 200.0;
const MIN_OVERLAY_HEIGHT: f64 = 100.0;

/// What kind of scope a context is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    Overlay,
    Document,
    Frame,
    Shadow,
}

/// One searchable scope of a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchContext {
    pub scope: Scope,
    pub kind: ContextKind,
    /// Number of shadow roots crossed; 0 outside shadow trees.
    pub shadow_depth: usize,
}

impl SearchContext {
    pub fn document(window: WindowId) -> Self {
        Self {
            scope: Scope::document(window),
            kind: ContextKind::Document,
            shadow_depth: 0,
        }
    }

    pub fn frame(window: WindowId, path: FramePath) -> Self {
        Self {
            scope: Scope::frame(window, path),
            kind: ContextKind::Frame,
            shadow_depth: 0,
        }
    }

    pub fn overlay(window: WindowId, container: NodeHandle) -> Self {
        Self {
            scope: Scope::document(window).with_root(ScopeRoot::Element(container)),
            kind: ContextKind::Overlay,
            shadow_depth: 0,
        }
    }

    pub fn shadow(window: WindowId, hosts: Vec<NodeHandle>) -> Self {
        let shadow_depth = hosts.len();
        Self {
            scope: Scope::document(window).with_root(ScopeRoot::Shadow(hosts)),
            kind: ContextKind::Shadow,
            shadow_depth,
        }
    }

    pub fn window(&self) -> &WindowId {
        &self.scope.window
    }

    pub fn frame_path(&self) -> &FramePath {
        &self.scope.frame
    }

    pub fn frame_depth(&self) -> usize {
        self.scope.frame.depth()
    }

    pub fn is_overlay(&self) -> bool {
        self.kind == ContextKind::Overlay
    }

    pub fn is_shadow(&self) -> bool {
        self.kind == ContextKind::Shadow
    }

    /// Human-readable location, used in step remarks.
    pub fn describe(&self) -> String {
        match (&self.kind, &self.scope.root) {
            (ContextKind::Overlay, ScopeRoot::Element(container)) => {
                format!("overlay {}", container)
            }
            (ContextKind::Frame, _) => {
                format!("{} (depth {})", self.scope.frame, self.frame_depth())
            }
            (ContextKind::Shadow, _) => format!("shadow root (depth {})", self.shadow_depth),
            _ => "main document".to_string(),
        }
    }
}

/// Whether a node looks like a visible modal/overlay container.
pub fn is_overlay(node: &NodeSnapshot) -> bool {
    if !node.visible || node.is_zero_size() || matches!(node.tag.as_str(), "body" | "html") {
        return false;
    }
    if matches!(node.role().as_deref(), Some("dialog" | "alertdialog")) || node.tag == "dialog" {
        return true;
    }
    if node
        .attr("aria-modal")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    {
        return true;
    }
    let class = node.attr("class").unwrap_or_default().to_ascii_lowercase();
    if OVERLAY_CLASS_HINTS.iter().any(|hint| class.contains(hint)) {
        return true;
    }
    matches!(node.position.as_str(), "fixed" | "absolute")
        && node.z_index >= MIN_OVERLAY_Z
        && node.width >= MIN_OVERLAY_WIDTH
        && node.height >= MIN_OVERLAY_HEIGHT
}

/// Errors that end a walk instead of skipping one scope.
pub(crate) fn aborts_walk(e: &DriverError) -> bool {
    e.is_fatal() || matches!(e, DriverError::WindowClosed(_))
}

/// Produces the ordered contexts of a window.
#[derive(Debug, Clone)]
pub struct ContextEnumerator {
    max_frames: usize,
    max_shadow_depth: usize,
}

impl ContextEnumerator {
    pub fn new(max_frames: usize, max_shadow_depth: usize) -> Self {
        Self {
            max_frames,
            max_shadow_depth,
        }
    }

    pub fn from_config(config: &ResolutionConfig) -> Self {
        Self::new(config.max_frames, config.max_shadow_depth)
    }

    /// Every context of `window`: overlays, then main document, frames and shadow roots.
    pub async fn enumerate(
        &self,
        driver: &dyn BrowserDriver,
        window: &WindowId,
    ) -> Result<Vec<SearchContext>, DriverError> {
        let mut contexts = self.overlays(driver, window).await?;
        contexts.extend(self.documents(driver, window).await?);
        Ok(contexts)
    }

    /// Visible overlay containers of the main document, topmost first.
    pub async fn overlays(
        &self,
        driver: &dyn BrowserDriver,
        window: &WindowId,
    ) -> Result<Vec<SearchContext>, DriverError> {
        let scope = Scope::document(window.clone());
        let mut containers = match driver.query(&scope, NodeQuery::OverlayContainers).await {
            Ok(nodes) => nodes,
            Err(e) if aborts_walk(&e) => return Err(e),
            Err(e) => {
                warn!(window = %window, "Overlay detection failed: {}", e);
                return Ok(Vec::new());
            }
        };

        containers.retain(is_overlay);
        containers.sort_by(|a, b| b.z_index.cmp(&a.z_index).then(a.order.cmp(&b.order)));
        if !containers.is_empty() {
            debug!(window = %window, count = containers.len(), "Found overlay containers");
        }
        Ok(containers
            .into_iter()
            .map(|c| SearchContext::overlay(window.clone(), c.handle))
            .collect())
    }

    /// Main document, then frames, then shadow roots.
    pub async fn documents(
        &self,
        driver: &dyn BrowserDriver,
        window: &WindowId,
    ) -> Result<Vec<SearchContext>, DriverError> {
        let mut contexts = vec![SearchContext::document(window.clone())];
        contexts.extend(self.frames(driver, window).await?);
        contexts.extend(self.shadows(driver, window).await?);
        Ok(contexts)
    }

    /// Accessible nested frames, breadth-first, at most `max_frames`.
    ///
    /// A frame whose document cannot be read is skipped along with its subtree.
    pub async fn frames(
        &self,
        driver: &dyn BrowserDriver,
        window: &WindowId,
    ) -> Result<Vec<SearchContext>, DriverError> {
        let mut contexts = Vec::new();
        let mut queue = VecDeque::from([FramePath::main()]);

        while let Some(path) = queue.pop_front() {
            let children = match driver.child_frames(window, &path).await {
                Ok(children) => children,
                Err(e) if aborts_walk(&e) => return Err(e),
                Err(e) => {
                    warn!(window = %window, frame = %path, "Skipping frame: {}", e);
                    continue;
                }
            };

            if !path.is_main() {
                contexts.push(SearchContext::frame(window.clone(), path));
                if contexts.len() >= self.max_frames {
                    debug!(window = %window, cap = self.max_frames, "Frame cap reached");
                    break;
                }
            }
            queue.extend(children.into_iter().map(|f| f.path));
        }

        Ok(contexts)
    }

    /// Shadow roots reachable from the main document, up to `max_shadow_depth`.
    pub async fn shadows(
        &self,
        driver: &dyn BrowserDriver,
        window: &WindowId,
    ) -> Result<Vec<SearchContext>, DriverError> {
        let mut contexts = Vec::new();
        let mut work: VecDeque<Vec<NodeHandle>> = VecDeque::from([Vec::new()]);

        while let Some(hosts) = work.pop_front() {
            if hosts.len() >= self.max_shadow_depth {
                continue;
            }
            let scope = if hosts.is_empty() {
                Scope::document(window.clone())
            } else {
                Scope::document(window.clone()).with_root(ScopeRoot::Shadow(hosts.clone()))
            };

            let found = match driver.query(&scope, NodeQuery::ShadowHosts).await {
                Ok(found) => found,
                Err(e) if aborts_walk(&e) => return Err(e),
                Err(e) => {
                    warn!(window = %window, depth = hosts.len(), "Shadow walk failed: {}", e);
                    continue;
                }
            };

            for host in found.into_iter().filter(|n| n.has_shadow_root) {
                let mut chain = hosts.clone();
                chain.push(host.handle);
                contexts.push(SearchContext::shadow(window.clone(), chain.clone()));
                work.push_back(chain);
            }
        }

        Ok(contexts)
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
