//! `BrowserDriver` implementation over CDP.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use autoheal_config::{BrowserConfig, DialogPolicy};
use autoheal_protocols::{
    BrowserDriver, DriverError, FrameInfo, FramePath, NodeQuery, NodeRef, NodeScript,
    NodeSnapshot, ReadyState, Scope, WindowEvent, WindowId, WindowInfo,
};
use base64::Engine;
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::client::CdpClient;
use crate::error::CdpError;
use crate::protocol::{CdpResponse, ClickPoint, ScreenshotFormat, TargetInfo};
use crate::scripts;
use crate::session::{DialogHandler, PageSession};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Deserialize)]
struct RawFrame {
    index: usize,
    name: Option<String>,
    src: Option<String>,
}

/// Windows known to the driver, maintained from target events.
#[derive(Default)]
struct WindowTable {
    /// Open page targets in creation order.
    open: Vec<WindowInfo>,
    current: Option<WindowId>,
}

impl WindowTable {
    fn upsert(&mut self, info: WindowInfo) -> bool {
        if let Some(existing) = self.open.iter_mut().find(|w| w.id == info.id) {
            existing.title = info.title;
            existing.url = info.url;
            if existing.opener.is_none() {
                existing.opener = info.opener;
            }
            false
        } else {
            self.open.push(info);
            true
        }
    }

    fn remove(&mut self, id: &WindowId) -> bool {
        let before = self.open.len();
        self.open.retain(|w| &w.id != id);
        if self.current.as_ref() == Some(id) {
            self.current = None;
        }
        before != self.open.len()
    }

    fn contains(&self, id: &WindowId) -> bool {
        self.open.iter().any(|w| &w.id == id)
    }
}

fn window_info(target: &TargetInfo) -> WindowInfo {
    WindowInfo {
        id: WindowId::new(target.target_id.clone()),
        title: target.title.clone(),
        url: target.url.clone(),
        opener: target.opener_id.clone().map(WindowId::new),
    }
}

/// CDP-backed browser driver.
///
/// Attaches to page targets lazily, one [`PageSession`] per window.
pub struct CdpDriver {
    client: Arc<CdpClient>,
    sessions: tokio::sync::Mutex<HashMap<WindowId, Arc<PageSession>>>,
    windows: Arc<RwLock<WindowTable>>,
    events: broadcast::Sender<WindowEvent>,
    dialogs: DialogPolicy,
    load_timeout: Duration,
    pump: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl CdpDriver {
    /// Connect to the browser described by `config` and start tracking its windows.
    pub async fn connect(config: &BrowserConfig) -> Result<Self, CdpError> {
        let client = Arc::new(CdpClient::connect(&config.endpoint, config.request_timeout()).await?);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let mut table = WindowTable::default();
        for target in client.get_targets().await?.iter().filter(|t| t.is_page()) {
            table.upsert(window_info(target));
        }
        table.current = table.open.first().map(|w| w.id.clone());
        info!(
            "Attached to browser at {} with {} open window(s)",
            config.endpoint,
            table.open.len()
        );

        let windows = Arc::new(RwLock::new(table));
        let pump = client.take_browser_events().map(|rx| {
            let windows = windows.clone();
            let events = events.clone();
            tokio::spawn(async move { Self::target_pump(rx, windows, events).await })
        });

        client.discover_targets().await?;

        Ok(Self {
            client,
            sessions: tokio::sync::Mutex::new(HashMap::new()),
            windows,
            events,
            dialogs: config.dialogs,
            load_timeout: config.request_timeout(),
            pump: Mutex::new(pump),
        })
    }

    /// Translate browser-level target events into window events.
    async fn target_pump(
        mut rx: mpsc::UnboundedReceiver<CdpResponse>,
        windows: Arc<RwLock<WindowTable>>,
        events: broadcast::Sender<WindowEvent>,
    ) {
        while let Some(event) = rx.recv().await {
            match event.event() {
                Some("Target.targetCreated") | Some("Target.targetInfoChanged") => {
                    let Some(target) = event
                        .param("targetInfo")
                        .and_then(|v| serde_json::from_value::<TargetInfo>(v.clone()).ok())
                    else {
                        continue;
                    };
                    if !target.is_page() {
                        continue;
                    }
                    let info = window_info(&target);
                    let created = windows.write().upsert(info.clone());
                    if created {
                        debug!(window = %info.id, opener = ?info.opener, "Window opened: {}", info.url);
                        let _ = events.send(WindowEvent::Opened {
                            id: info.id,
                            opener: info.opener,
                            url: info.url,
                        });
                    }
                }
                Some("Target.targetDestroyed") => {
                    let Some(id) = event.param("targetId").and_then(|v| v.as_str()) else {
                        continue;
                    };
                    let id = WindowId::new(id);
                    if windows.write().remove(&id) {
                        debug!(window = %id, "Window closed");
                        let _ = events.send(WindowEvent::Closed { id });
                    }
                }
                _ => {}
            }
        }
        debug!("Target event pump finished");
    }

    fn ensure_connected(&self) -> Result<(), DriverError> {
        if self.client.is_connected() {
            Ok(())
        } else {
            Err(DriverError::Disconnected("browser connection lost".to_string()))
        }
    }

    /// Session for `window`, attaching on first use.
    async fn session(&self, window: &WindowId) -> Result<Arc<PageSession>, DriverError> {
        self.ensure_connected()?;
        let mut sessions = self.sessions.lock().await;
        if !self.windows.read().contains(window) {
            if let Some(stale) = sessions.remove(window) {
                self.client.forget_session(stale.session_id()).await;
            }
            return Err(DriverError::WindowClosed(window.to_string()));
        }
        if let Some(session) = sessions.get(window) {
            return Ok(session.clone());
        }

        let session = Arc::new(self.client.attach_page(window.as_str()).await?);
        session.on_dialog(DialogHandler {
            policy: self.dialogs,
            window: window.clone(),
            events: self.events.clone(),
        });
        sessions.insert(window.clone(), session.clone());
        Ok(session)
    }

    async fn eval<T: serde::de::DeserializeOwned>(
        &self,
        window: &WindowId,
        expression: String,
    ) -> Result<T, DriverError> {
        let session = self.session(window).await?;
        Ok(session.evaluate_as(&expression).await?)
    }

    async fn click_point(&self, node: &NodeRef, scroll: bool) -> Result<ClickPoint, DriverError> {
        self.eval(&node.window, scripts::click_point(&node.handle, scroll))
            .await
    }
}

#[async_trait]
impl BrowserDriver for CdpDriver {
    async fn windows(&self) -> Result<Vec<WindowInfo>, DriverError> {
        self.ensure_connected()?;
        let targets = self.client.get_targets().await?;
        let mut table = self.windows.write();
        let live: Vec<WindowId> = targets
            .iter()
            .filter(|t| t.is_page())
            .map(|t| {
                table.upsert(window_info(t));
                WindowId::new(t.target_id.clone())
            })
            .collect();
        table.open.retain(|w| live.contains(&w.id));
        Ok(table.open.clone())
    }

    async fn current_window(&self) -> Result<Option<WindowId>, DriverError> {
        self.ensure_connected()?;
        Ok(self.windows.read().current.clone())
    }

    async fn focus_window(&self, window: &WindowId) -> Result<(), DriverError> {
        if !self.windows.read().contains(window) {
            return Err(DriverError::WindowClosed(window.to_string()));
        }
        self.client.activate_target(window.as_str()).await?;
        self.windows.write().current = Some(window.clone());
        debug!(window = %window, "Focused window");
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<WindowId, DriverError> {
        self.ensure_connected()?;
        let id = WindowId::new(self.client.create_target(url).await?);
        {
            let mut table = self.windows.write();
            table.upsert(WindowInfo {
                id: id.clone(),
                title: String::new(),
                url: url.to_string(),
                opener: None,
            });
            table.current = Some(id.clone());
        }
        let session = self.session(&id).await?;
        session.wait_for_load(self.load_timeout).await?;
        Ok(id)
    }

    async fn navigate(&self, window: &WindowId, url: &str) -> Result<(), DriverError> {
        let session = self.session(window).await?;
        session.navigate(url, self.load_timeout).await?;
        Ok(())
    }

    async fn child_frames(
        &self,
        window: &WindowId,
        frame: &FramePath,
    ) -> Result<Vec<FrameInfo>, DriverError> {
        let raw: Vec<RawFrame> = self.eval(window, scripts::frames(frame)).await?;
        Ok(raw
            .into_iter()
            .map(|f| FrameInfo {
                path: frame.child(f.index),
                name: f.name,
                src: f.src,
            })
            .collect())
    }

    async fn query(
        &self,
        scope: &Scope,
        query: NodeQuery,
    ) -> Result<Vec<NodeSnapshot>, DriverError> {
        self.eval(
            &scope.window,
            scripts::query(&scope.frame, &scope.root, query),
        )
        .await
    }

    async fn deep_scan(
        &self,
        window: &WindowId,
        needle: &str,
        limit: usize,
    ) -> Result<Vec<NodeSnapshot>, DriverError> {
        self.eval(window, scripts::deep_scan(needle, limit)).await
    }

    async fn click(&self, node: &NodeRef, force: bool) -> Result<(), DriverError> {
        let point = self.click_point(node, true).await?;
        if !force {
            if !point.visible {
                return Err(DriverError::NotActionable(format!("{} is not visible", node.handle)));
            }
            if !point.enabled {
                return Err(DriverError::NotActionable(format!("{} is disabled", node.handle)));
            }
            if !point.receives_events {
                return Err(DriverError::NotActionable(format!(
                    "{} is covered by another element",
                    node.handle
                )));
            }
        } else if point.x <= 0.0 && point.y <= 0.0 && !point.visible {
            return Err(DriverError::NotActionable(format!(
                "{} has no rendered box",
                node.handle
            )));
        }

        let session = self.session(&node.window).await?;
        session.click(point.x, point.y).await?;
        Ok(())
    }

    async fn fill(&self, node: &NodeRef, value: &str, force: bool) -> Result<(), DriverError> {
        let session = self.session(&node.window).await?;
        session
            .evaluate(&scripts::prepare_fill(&node.handle, force))
            .await?;

        if value.is_empty() {
            session.press_key_combo("Backspace").await?;
        } else {
            session.type_text(value).await?;
        }

        let actual: String = session
            .evaluate_as(&scripts::commit_fill(&node.handle))
            .await?;
        if actual.trim() != value.trim() {
            return Err(DriverError::NotActionable(format!(
                "value of {} reads back as {:?}",
                node.handle, actual
            )));
        }
        Ok(())
    }

    async fn select_option(
        &self,
        node: &NodeRef,
        value: &str,
        force: bool,
    ) -> Result<(), DriverError> {
        let _: bool = self
            .eval(
                &node.window,
                scripts::select_option(&node.handle, value, force),
            )
            .await?;
        Ok(())
    }

    async fn run_node_script(
        &self,
        node: &NodeRef,
        script: NodeScript,
    ) -> Result<(), DriverError> {
        let _: bool = self
            .eval(&node.window, scripts::run_script(&node.handle, &script))
            .await?;
        Ok(())
    }

    async fn ready_state(
        &self,
        window: &WindowId,
        frame: &FramePath,
    ) -> Result<ReadyState, DriverError> {
        let state: String = self.eval(window, scripts::ready_state(frame)).await?;
        Ok(ReadyState::from_dom(&state))
    }

    async fn network_idle(&self, window: &WindowId) -> Result<bool, DriverError> {
        let session = self.session(window).await?;
        Ok(session.inflight_requests() == 0)
    }

    async fn count_visible(&self, window: &WindowId, selector: &str) -> Result<usize, DriverError> {
        self.eval(window, scripts::count_visible(selector)).await
    }

    async fn page_text(&self, window: &WindowId) -> Result<String, DriverError> {
        self.eval(window, scripts::page_text()).await
    }

    async fn page_source(&self, window: &WindowId) -> Result<String, DriverError> {
        let session = self.session(window).await?;
        Ok(session.get_content().await?)
    }

    async fn screenshot(&self, window: &WindowId) -> Result<Vec<u8>, DriverError> {
        let session = self.session(window).await?;
        let data = session.screenshot(ScreenshotFormat::Png).await?;
        base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| DriverError::Protocol(format!("screenshot decode: {}", e)))
    }

    fn subscribe(&self) -> broadcast::Receiver<WindowEvent> {
        self.events.subscribe()
    }

    async fn shutdown(&self) -> Result<(), DriverError> {
        let mut sessions = self.sessions.lock().await;
        for (_, session) in sessions.drain() {
            self.client.forget_session(session.session_id()).await;
        }
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
        }
        let params = serde_json::json!({"discover": false});
        if let Err(e) = self
            .client
            .call("Target.setDiscoverTargets", Some(params))
            .await
        {
            warn!("Failed to stop target discovery: {}", e);
        }
        Ok(())
    }
}
