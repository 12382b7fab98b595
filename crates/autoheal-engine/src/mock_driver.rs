//! In-memory browser for testing.
//!
//! Models windows, frames (including inaccessible cross-origin ones),
//! overlay containers, shadow trees and nodes, plus hooks for the failure
//! modes the engine has to heal from: rejected techniques, windows closing
//! mid-action, late-appearing nodes and a dropped browser connection.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use autoheal_protocols::{
    Action, BrowserDriver, DriverError, FrameInfo, FramePath, NodeHandle, NodeQuery, NodeRef,
    NodeScript, NodeSnapshot, ReadyState, Scope, ScopeRoot, WindowEvent, WindowId, WindowInfo,
};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::executor::Technique;

/// Where a node lives inside its frame's document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Document,
    /// Inside the overlay container with this handle.
    Overlay(NodeHandle),
    /// Inside the shadow root reached through these hosts.
    Shadow(Vec<NodeHandle>),
}

/// An action the mock accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct MockAction {
    pub window: WindowId,
    pub handle: NodeHandle,
    pub kind: Action,
    pub technique: Technique,
    pub value: Option<String>,
}

struct MockWindow {
    info: WindowInfo,
    closed: bool,
    ready: ReadyState,
    network_idle: bool,
    body_text: String,
    navigations: Vec<String>,
}

struct MockFrame {
    window: WindowId,
    path: FramePath,
    name: Option<String>,
    cross_origin: bool,
}

struct MockNode {
    window: WindowId,
    frame: FramePath,
    placement: Placement,
    snapshot: NodeSnapshot,
    container: bool,
    reveal_at: usize,
}

#[derive(Default)]
struct MockState {
    windows: Vec<MockWindow>,
    current: Option<WindowId>,
    frames: Vec<MockFrame>,
    nodes: Vec<MockNode>,
    values: HashMap<NodeHandle, String>,
    indicators: HashMap<(WindowId, String), usize>,
    rejections: HashSet<(NodeHandle, Technique)>,
    close_on_action: HashSet<WindowId>,
    popups_on_click: HashMap<NodeHandle, (WindowId, String)>,
    actions: Vec<MockAction>,
    queries: usize,
    next_window: usize,
    next_order: usize,
    disconnected: bool,
    screenshot_failures: bool,
    navigation_failures: usize,
}

impl MockState {
    fn ensure_connected(&self) -> Result<(), DriverError> {
        if self.disconnected {
            return Err(DriverError::Disconnected("mock browser went away".to_string()));
        }
        Ok(())
    }

    fn open_window(&self, id: &WindowId) -> Result<&MockWindow, DriverError> {
        self.ensure_connected()?;
        self.windows
            .iter()
            .find(|w| &w.info.id == id && !w.closed)
            .ok_or_else(|| DriverError::WindowClosed(id.to_string()))
    }

    fn open_window_mut(&mut self, id: &WindowId) -> Result<&mut MockWindow, DriverError> {
        self.ensure_connected()?;
        self.windows
            .iter_mut()
            .find(|w| &w.info.id == id && !w.closed)
            .ok_or_else(|| DriverError::WindowClosed(id.to_string()))
    }

    fn frame(&self, window: &WindowId, path: &FramePath) -> Option<&MockFrame> {
        self.frames
            .iter()
            .find(|f| &f.window == window && &f.path == path)
    }

    fn check_frame(&self, window: &WindowId, path: &FramePath) -> Result<(), DriverError> {
        if path.is_main() {
            return Ok(());
        }
        match self.frame(window, path) {
            Some(frame) if frame.cross_origin => {
                Err(DriverError::CrossOrigin(format!("{} in {}", path, window)))
            }
            Some(_) => Ok(()),
            None => Err(DriverError::StaleElement(format!("frame {} detached", path))),
        }
    }

    fn frame_accessible(&self, window: &WindowId, path: &FramePath) -> bool {
        self.check_frame(window, path).is_ok()
    }

    fn register_window(&mut self, id: WindowId, url: &str, opener: Option<WindowId>) {
        self.windows.push(MockWindow {
            info: WindowInfo {
                id: id.clone(),
                title: String::new(),
                url: url.to_string(),
                opener,
            },
            closed: false,
            ready: ReadyState::Complete,
            network_idle: true,
            body_text: String::new(),
            navigations: Vec::new(),
        });
        if self.current.is_none() {
            self.current = Some(id);
        }
    }

    fn close(&mut self, id: &WindowId) -> bool {
        let Some(window) = self
            .windows
            .iter_mut()
            .find(|w| &w.info.id == id && !w.closed)
        else {
            return false;
        };
        window.closed = true;
        if self.current.as_ref() == Some(id) {
            self.current = None;
        }
        true
    }

    fn add_node(
        &mut self,
        window: &WindowId,
        frame: FramePath,
        placement: Placement,
        mut snapshot: NodeSnapshot,
        container: bool,
    ) -> NodeRef {
        snapshot.order = self.next_order;
        self.next_order += 1;
        let node = NodeRef::new(window.clone(), snapshot.handle.clone());
        self.nodes.push(MockNode {
            window: window.clone(),
            frame,
            placement,
            snapshot,
            container,
            reveal_at: 0,
        });
        node
    }

    fn visible_nodes<'a>(&'a self, window: &'a WindowId) -> impl Iterator<Item = &'a MockNode> + 'a {
        let queries = self.queries;
        self.nodes.iter().filter(move |n| {
            &n.window == window
                && !n.container
                && n.reveal_at <= queries
                && self.frame_accessible(window, &n.frame)
        })
    }
}

/// In-memory [`BrowserDriver`].
pub struct MockDriver {
    state: Mutex<MockState>,
    events: broadcast::Sender<WindowEvent>,
}

impl MockDriver {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            state: Mutex::new(MockState::default()),
            events,
        }
    }

    /// Build a driver with one open window.
    pub fn with_window(id: &str, url: &str) -> Self {
        let driver = Self::new();
        driver.add_window(id, url);
        driver
    }

    fn emit(&self, event: WindowEvent) {
        // No subscriber is fine; the tracker also reconciles from `windows()`.
        let _ = self.events.send(event);
    }

    // ------------------------------------------------------------------
    // Page model
    // ------------------------------------------------------------------

    /// Open a top-level window. The first window becomes the current one.
    pub fn add_window(&self, id: &str, url: &str) -> WindowId {
        let id = WindowId::new(id);
        self.state.lock().register_window(id.clone(), url, None);
        self.emit(WindowEvent::Opened {
            id: id.clone(),
            opener: None,
            url: url.to_string(),
        });
        id
    }

    /// Open a window from `opener`, as a popup would be.
    pub fn add_popup(&self, id: &str, opener: &WindowId, url: &str) -> WindowId {
        let id = WindowId::new(id);
        self.state
            .lock()
            .register_window(id.clone(), url, Some(opener.clone()));
        self.emit(WindowEvent::Opened {
            id: id.clone(),
            opener: Some(opener.clone()),
            url: url.to_string(),
        });
        id
    }

    /// Destroy a window.
    pub fn close_window(&self, id: &WindowId) {
        let closed = self.state.lock().close(id);
        if closed {
            self.emit(WindowEvent::Closed { id: id.clone() });
        }
    }

    pub fn add_frame(&self, window: &WindowId, path: FramePath) {
        self.push_frame(window, path, false);
    }

    /// A frame whose document cannot be accessed.
    pub fn add_cross_origin_frame(&self, window: &WindowId, path: FramePath) {
        self.push_frame(window, path, true);
    }

    fn push_frame(&self, window: &WindowId, path: FramePath, cross_origin: bool) {
        let name = Some(format!("frame-{}", path));
        self.state.lock().frames.push(MockFrame {
            window: window.clone(),
            path,
            name,
            cross_origin,
        });
    }

    /// Add a node to the window's main document.
    pub fn add_node(&self, window: &WindowId, node: NodeSnapshot) -> NodeRef {
        self.state
            .lock()
            .add_node(window, FramePath::main(), Placement::Document, node, false)
    }

    /// Add a node to the document of the frame at `frame`.
    pub fn add_frame_node(&self, window: &WindowId, frame: &FramePath, node: NodeSnapshot) -> NodeRef {
        self.state
            .lock()
            .add_node(window, frame.clone(), Placement::Document, node, false)
    }

    /// Add an overlay container to the main document.
    pub fn add_overlay(&self, window: &WindowId, container: NodeSnapshot) -> NodeHandle {
        self.state
            .lock()
            .add_node(window, FramePath::main(), Placement::Document, container, true)
            .handle
    }

    /// Add a node inside an overlay container.
    pub fn add_overlay_node(
        &self,
        window: &WindowId,
        container: &NodeHandle,
        node: NodeSnapshot,
    ) -> NodeRef {
        self.state.lock().add_node(
            window,
            FramePath::main(),
            Placement::Overlay(container.clone()),
            node,
            false,
        )
    }

    /// Add a node inside the shadow root reached through `hosts`.
    pub fn add_shadow_node(
        &self,
        window: &WindowId,
        hosts: Vec<NodeHandle>,
        node: NodeSnapshot,
    ) -> NodeRef {
        self.state
            .lock()
            .add_node(window, FramePath::main(), Placement::Shadow(hosts), node, false)
    }

    /// Add a shadow host inside the shadow root reached through `hosts`.
    pub fn add_nested_shadow_host(
        &self,
        window: &WindowId,
        hosts: Vec<NodeHandle>,
        host: NodeSnapshot,
    ) -> NodeRef {
        self.add_shadow_node(window, hosts, host.with_shadow_root())
    }

    pub fn remove_node(&self, handle: &NodeHandle) {
        self.state.lock().nodes.retain(|n| &n.snapshot.handle != handle);
    }

    pub fn set_body_text(&self, window: &WindowId, text: &str) {
        let mut state = self.state.lock();
        if let Some(w) = state.windows.iter_mut().find(|w| &w.info.id == window) {
            w.body_text = text.to_string();
        }
    }

    pub fn set_title(&self, window: &WindowId, title: &str) {
        let mut state = self.state.lock();
        if let Some(w) = state.windows.iter_mut().find(|w| &w.info.id == window) {
            w.info.title = title.to_string();
        }
    }

    pub fn set_ready_state(&self, window: &WindowId, ready: ReadyState) {
        let mut state = self.state.lock();
        if let Some(w) = state.windows.iter_mut().find(|w| &w.info.id == window) {
            w.ready = ready;
        }
    }

    pub fn set_network_idle(&self, window: &WindowId, idle: bool) {
        let mut state = self.state.lock();
        if let Some(w) = state.windows.iter_mut().find(|w| &w.info.id == window) {
            w.network_idle = idle;
        }
    }

    /// Number of visible elements reported for `selector`.
    pub fn set_loading_indicator(&self, window: &WindowId, selector: &str, count: usize) {
        self.state
            .lock()
            .indicators
            .insert((window.clone(), selector.to_string()), count);
    }

    // ------------------------------------------------------------------
    // Failure hooks
    // ------------------------------------------------------------------

    /// Make `technique` fail on the node.
    pub fn reject(&self, handle: &NodeHandle, technique: Technique) {
        self.state
            .lock()
            .rejections
            .insert((handle.clone(), technique));
    }

    /// Make every technique fail on the node.
    pub fn reject_all(&self, handle: &NodeHandle) {
        let mut state = self.state.lock();
        for technique in crate::executor::TECHNIQUES {
            state.rejections.insert((handle.clone(), technique));
        }
    }

    /// Close `window` when the next action on any of its nodes arrives.
    pub fn close_window_on_action(&self, window: &WindowId) {
        self.state.lock().close_on_action.insert(window.clone());
    }

    /// Open a popup from the node's window when the node is clicked.
    pub fn open_popup_on_click(&self, handle: &NodeHandle, popup: &str, url: &str) {
        self.state
            .lock()
            .popups_on_click
            .insert(handle.clone(), (WindowId::new(popup), url.to_string()));
    }

    /// Hide the node from queries until `queries` more queries have run.
    pub fn reveal_after(&self, handle: &NodeHandle, queries: usize) {
        let mut state = self.state.lock();
        let at = state.queries + queries;
        if let Some(node) = state.nodes.iter_mut().find(|n| &n.snapshot.handle == handle) {
            node.reveal_at = at;
        }
    }

    pub fn disconnect(&self) {
        self.state.lock().disconnected = true;
    }

    pub fn fail_screenshots(&self) {
        self.state.lock().screenshot_failures = true;
    }

    /// Make the next `times` navigations time out.
    pub fn fail_navigations(&self, times: usize) {
        self.state.lock().navigation_failures = times;
    }

    // ------------------------------------------------------------------
    // Observations
    // ------------------------------------------------------------------

    pub fn actions(&self) -> Vec<MockAction> {
        self.state.lock().actions.clone()
    }

    pub fn last_action(&self) -> Option<MockAction> {
        self.state.lock().actions.last().cloned()
    }

    pub fn value_of(&self, handle: &NodeHandle) -> Option<String> {
        self.state.lock().values.get(handle).cloned()
    }

    pub fn navigations(&self, window: &WindowId) -> Vec<String> {
        self.state
            .lock()
            .windows
            .iter()
            .find(|w| &w.info.id == window)
            .map(|w| w.navigations.clone())
            .unwrap_or_default()
    }

    pub fn focused(&self) -> Option<WindowId> {
        self.state.lock().current.clone()
    }

    pub fn query_count(&self) -> usize {
        self.state.lock().queries
    }

    fn act(
        &self,
        node: &NodeRef,
        kind: Action,
        technique: Technique,
        value: Option<&str>,
    ) -> Result<(), DriverError> {
        let mut events = Vec::new();
        let result = {
            let mut state = self.state.lock();
            Self::act_locked(&mut state, node, kind, technique, value, &mut events)
        };
        for event in events {
            self.emit(event);
        }
        result
    }

    fn act_locked(
        state: &mut MockState,
        node: &NodeRef,
        kind: Action,
        technique: Technique,
        value: Option<&str>,
        events: &mut Vec<WindowEvent>,
    ) -> Result<(), DriverError> {
        state.open_window(&node.window)?;
        if state.close_on_action.remove(&node.window) {
            state.close(&node.window);
            events.push(WindowEvent::Closed {
                id: node.window.clone(),
            });
            return Err(DriverError::WindowClosed(node.window.to_string()));
        }

        let snapshot = state
            .nodes
            .iter()
            .find(|n| n.window == node.window && n.snapshot.handle == node.handle)
            .map(|n| n.snapshot.clone())
            .ok_or_else(|| DriverError::StaleElement(node.handle.to_string()))?;

        if state.rejections.contains(&(node.handle.clone(), technique)) {
            return Err(DriverError::NotActionable(format!(
                "{} rejected {}",
                node.handle, technique
            )));
        }
        if technique == Technique::Standard && (!snapshot.visible || snapshot.is_zero_size()) {
            return Err(DriverError::NotActionable(format!(
                "{} is not visible",
                node.handle
            )));
        }

        if let Some(v) = value {
            state.values.insert(node.handle.clone(), v.to_string());
        }
        state.actions.push(MockAction {
            window: node.window.clone(),
            handle: node.handle.clone(),
            kind,
            technique,
            value: value.map(str::to_string),
        });

        if kind == Action::Click {
            if let Some((popup, url)) = state.popups_on_click.remove(&node.handle) {
                state.register_window(popup.clone(), &url, Some(node.window.clone()));
                events.push(WindowEvent::Opened {
                    id: popup,
                    opener: Some(node.window.clone()),
                    url,
                });
            }
        }
        Ok(())
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

fn in_scope(node: &MockNode, scope: &Scope) -> bool {
    if node.window != scope.window || node.frame != scope.frame {
        return false;
    }
    match (&scope.root, &node.placement) {
        (ScopeRoot::Document, Placement::Document | Placement::Overlay(_)) => true,
        (ScopeRoot::Element(root), Placement::Overlay(container)) => root == container,
        (ScopeRoot::Shadow(hosts), Placement::Shadow(chain)) => hosts == chain,
        _ => false,
    }
}

fn parent_path(path: &FramePath) -> Option<FramePath> {
    let indices = path.indices();
    if indices.is_empty() {
        return None;
    }
    Some(FramePath(indices[..indices.len() - 1].to_vec()))
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn windows(&self) -> Result<Vec<WindowInfo>, DriverError> {
        let state = self.state.lock();
        state.ensure_connected()?;
        Ok(state
            .windows
            .iter()
            .filter(|w| !w.closed)
            .map(|w| w.info.clone())
            .collect())
    }

    async fn current_window(&self) -> Result<Option<WindowId>, DriverError> {
        let state = self.state.lock();
        state.ensure_connected()?;
        Ok(state.current.clone())
    }

    async fn focus_window(&self, window: &WindowId) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.open_window(window)?;
        state.current = Some(window.clone());
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<WindowId, DriverError> {
        let id = {
            let mut state = self.state.lock();
            state.ensure_connected()?;
            state.next_window += 1;
            let id = WindowId::new(format!("window-{}", state.next_window));
            state.register_window(id.clone(), url, None);
            state.current = Some(id.clone());
            id
        };
        self.emit(WindowEvent::Opened {
            id: id.clone(),
            opener: None,
            url: url.to_string(),
        });
        Ok(id)
    }

    async fn navigate(&self, window: &WindowId, url: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.ensure_connected()?;
        if state.navigation_failures > 0 {
            state.navigation_failures -= 1;
            return Err(DriverError::Timeout(format!("navigation to {} timed out", url)));
        }
        let w = state.open_window_mut(window)?;
        w.info.url = url.to_string();
        w.navigations.push(url.to_string());
        Ok(())
    }

    async fn child_frames(
        &self,
        window: &WindowId,
        frame: &FramePath,
    ) -> Result<Vec<FrameInfo>, DriverError> {
        let state = self.state.lock();
        state.open_window(window)?;
        state.check_frame(window, frame)?;
        let mut children: Vec<FrameInfo> = state
            .frames
            .iter()
            .filter(|f| &f.window == window && parent_path(&f.path).as_ref() == Some(frame))
            .map(|f| FrameInfo {
                path: f.path.clone(),
                name: f.name.clone(),
                src: None,
            })
            .collect();
        children.sort_by(|a, b| a.path.indices().cmp(b.path.indices()));
        Ok(children)
    }

    async fn query(&self, scope: &Scope, query: NodeQuery) -> Result<Vec<NodeSnapshot>, DriverError> {
        let mut state = self.state.lock();
        state.open_window(&scope.window)?;
        state.check_frame(&scope.window, &scope.frame)?;
        state.queries += 1;
        let queries = state.queries;

        Ok(state
            .nodes
            .iter()
            .filter(|n| n.reveal_at <= queries && in_scope(n, scope))
            .filter(|n| match query {
                NodeQuery::OverlayContainers => n.container,
                NodeQuery::ShadowHosts => !n.container && n.snapshot.has_shadow_root,
                NodeQuery::Interactive | NodeQuery::Fillable | NodeQuery::Selectable => {
                    !n.container
                }
            })
            .map(|n| n.snapshot.clone())
            .collect())
    }

    async fn deep_scan(
        &self,
        window: &WindowId,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<NodeSnapshot>, DriverError> {
        let mut state = self.state.lock();
        state.open_window(window)?;
        state.queries += 1;
        let needle = needle.to_lowercase();
        Ok(state
            .visible_nodes(window)
            .filter(|n| {
                n.snapshot.text.to_lowercase().contains(&needle)
                    || n
                        .snapshot
                        .attributes
                        .iter()
                        .any(|(_, v)| v.to_lowercase().contains(&needle))
            })
            .take(limit)
            .map(|n| n.snapshot.clone())
            .collect())
    }

    async fn click(&self, node: &NodeRef, force: bool) -> Result<(), DriverError> {
        let technique = if force {
            Technique::Forced
        } else {
            Technique::Standard
        };
        self.act(node, Action::Click, technique, None)
    }

    async fn fill(&self, node: &NodeRef, value: &str, force: bool) -> Result<(), DriverError> {
        let technique = if force {
            Technique::Forced
        } else {
            Technique::Standard
        };
        self.act(node, Action::Fill, technique, Some(value))
    }

    async fn select_option(&self, node: &NodeRef, value: &str, force: bool) -> Result<(), DriverError> {
        let technique = if force {
            Technique::Forced
        } else {
            Technique::Standard
        };
        self.act(node, Action::Select, technique, Some(value))
    }

    async fn run_node_script(&self, node: &NodeRef, script: NodeScript) -> Result<(), DriverError> {
        let is_select = {
            let state = self.state.lock();
            state
                .nodes
                .iter()
                .any(|n| n.snapshot.handle == node.handle && n.snapshot.tag == "select")
        };
        let input_kind = if is_select { Action::Select } else { Action::Fill };

        match script {
            NodeScript::SyntheticClick => {
                self.act(node, Action::Click, Technique::DirectMutation, None)
            }
            NodeScript::PointerSequence => {
                self.act(node, Action::Click, Technique::EventDispatch, None)
            }
            NodeScript::SetValueWithEvents(v) => {
                self.act(node, Action::Fill, Technique::DirectMutation, Some(&v))
            }
            NodeScript::SelectWithEvents(v) => {
                self.act(node, Action::Select, Technique::DirectMutation, Some(&v))
            }
            NodeScript::DispatchInput(v) => {
                self.act(node, input_kind, Technique::EventDispatch, Some(&v))
            }
        }
    }

    async fn ready_state(&self, window: &WindowId, frame: &FramePath) -> Result<ReadyState, DriverError> {
        let state = self.state.lock();
        let w = state.open_window(window)?;
        let ready = w.ready;
        state.check_frame(window, frame)?;
        Ok(ready)
    }

    async fn network_idle(&self, window: &WindowId) -> Result<bool, DriverError> {
        let state = self.state.lock();
        Ok(state.open_window(window)?.network_idle)
    }

    async fn count_visible(&self, window: &WindowId, selector: &str) -> Result<usize, DriverError> {
        let state = self.state.lock();
        state.open_window(window)?;
        Ok(state
            .indicators
            .get(&(window.clone(), selector.to_string()))
            .copied()
            .unwrap_or(0))
    }

    async fn page_text(&self, window: &WindowId) -> Result<String, DriverError> {
        let state = self.state.lock();
        let body = state.open_window(window)?.body_text.clone();
        let mut parts = vec![body];
        parts.extend(
            state
                .visible_nodes(window)
                .filter(|n| n.snapshot.visible)
                .map(|n| n.snapshot.text.clone()),
        );
        Ok(parts.join("\n"))
    }

    async fn page_source(&self, window: &WindowId) -> Result<String, DriverError> {
        let state = self.state.lock();
        let w = state.open_window(window)?;
        Ok(format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            w.info.title, w.body_text
        ))
    }

    async fn screenshot(&self, window: &WindowId) -> Result<Vec<u8>, DriverError> {
        let state = self.state.lock();
        state.open_window(window)?;
        if state.screenshot_failures {
            return Err(DriverError::Script("screenshot capture failed".to_string()));
        }
        let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
        png.extend_from_slice(window.as_str().as_bytes());
        Ok(png)
    }

    fn subscribe(&self) -> broadcast::Receiver<WindowEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_document_query_includes_overlay_contents() {
        let driver = MockDriver::with_window("main", "https://app.test/");
        let main = WindowId::new("main");
        let modal = driver.add_overlay(&main, NodeSnapshot::new("modal", "div"));
        driver.add_node(&main, NodeSnapshot::new("a", "button").with_text("A"));
        driver.add_overlay_node(&main, &modal, NodeSnapshot::new("b", "button").with_text("B"));

        let all = driver
            .query(&Scope::document(main.clone()), NodeQuery::Interactive)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let inside = driver
            .query(
                &Scope::document(main.clone()).with_root(ScopeRoot::Element(modal)),
                NodeQuery::Interactive,
            )
            .await
            .unwrap();
        assert_eq!(inside.len(), 1);
        assert_eq!(inside[0].handle.as_str(), "b");
    }

    #[tokio::test]
    async fn test_cross_origin_frame_is_inaccessible() {
        let driver = MockDriver::with_window("main", "");
        let main = WindowId::new("main");
        driver.add_cross_origin_frame(&main, FramePath::main().child(0));

        let frames = driver.child_frames(&main, &FramePath::main()).await.unwrap();
        assert_eq!(frames.len(), 1);
        let err = driver
            .child_frames(&main, &FramePath::main().child(0))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::CrossOrigin(_)));
    }

    #[tokio::test]
    async fn test_standard_click_rejects_hidden_node() {
        let driver = MockDriver::with_window("main", "");
        let main = WindowId::new("main");
        let node = driver.add_node(&main, NodeSnapshot::new("x", "button").hidden());

        assert!(matches!(
            driver.click(&node, false).await,
            Err(DriverError::NotActionable(_))
        ));
        driver.click(&node, true).await.unwrap();
        assert_eq!(driver.last_action().unwrap().technique, Technique::Forced);
    }

    #[tokio::test]
    async fn test_close_on_action_emits_event() {
        let driver = MockDriver::with_window("main", "");
        let main = WindowId::new("main");
        let node = driver.add_node(&main, NodeSnapshot::new("x", "button"));
        let mut events = driver.subscribe();
        driver.close_window_on_action(&main);

        let err = driver.click(&node, false).await.unwrap_err();
        assert!(err.is_stale());
        assert_eq!(events.try_recv().unwrap(), WindowEvent::Closed { id: main });
        assert!(driver.windows().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reveal_after_queries() {
        let driver = MockDriver::with_window("main", "");
        let main = WindowId::new("main");
        driver.add_node(&main, NodeSnapshot::new("late", "button"));
        driver.reveal_after(&NodeHandle::new("late"), 2);

        let scope = Scope::document(main);
        assert!(driver.query(&scope, NodeQuery::Interactive).await.unwrap().is_empty());
        assert_eq!(driver.query(&scope, NodeQuery::Interactive).await.unwrap().len(), 1);
    }
}
