//! Window Hierarchy Tracker.
//!
//! Keeps the registry of every window seen during a run as a tree rooted at
//! the main window, plus a pointer to the most recently opened one. This is
//! the only writer of the registry; everything else reads it.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use autoheal_protocols::{
    BrowserDriver, DialogKind, DriverError, FramePath, WindowEvent, WindowId, WindowInfo,
};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

const DIALOG_HISTORY: usize = 20;

/// One window in the registry.
#[derive(Debug, Clone)]
pub struct WindowNode {
    pub id: WindowId,
    /// `None` only for the root window.
    pub parent: Option<WindowId>,
    /// Children in opening order, newest last.
    pub children: Vec<WindowId>,
    pub level: usize,
    pub opened_at: DateTime<Utc>,
    /// Monotonic registration order; breaks `opened_at` ties.
    pub seq: u64,
    pub title: String,
    pub url: String,
    /// Permanently true once the window is destroyed.
    pub closed: bool,
}

/// A dialog observed during the run.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogRecord {
    pub window: WindowId,
    pub kind: DialogKind,
    pub message: String,
}

/// Registry of windows and the latest-window pointer.
pub struct WindowTracker {
    nodes: HashMap<WindowId, WindowNode>,
    root: Option<WindowId>,
    latest: Option<WindowId>,
    seq: u64,
    events: broadcast::Receiver<WindowEvent>,
    dialogs: VecDeque<DialogRecord>,
}

impl WindowTracker {
    pub fn new(events: broadcast::Receiver<WindowEvent>) -> Self {
        Self {
            nodes: HashMap::new(),
            root: None,
            latest: None,
            seq: 0,
            events,
            dialogs: VecDeque::new(),
        }
    }

    pub fn root(&self) -> Option<&WindowId> {
        self.root.as_ref()
    }

    /// The latest-window pointer, even if that window has since closed.
    pub fn latest(&self) -> Option<&WindowId> {
        self.latest.as_ref()
    }

    /// The latest window if it is still open.
    pub fn latest_open(&self) -> Option<&WindowId> {
        self.latest
            .as_ref()
            .filter(|id| self.nodes.get(*id).is_some_and(|n| !n.closed))
    }

    pub fn node(&self, id: &WindowId) -> Option<&WindowNode> {
        self.nodes.get(id)
    }

    pub fn is_open(&self, id: &WindowId) -> bool {
        self.nodes.get(id).is_some_and(|n| !n.closed)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn recent_dialogs(&self) -> impl Iterator<Item = &DialogRecord> {
        self.dialogs.iter()
    }

    /// Register a newly opened window under `parent`.
    ///
    /// An unknown or missing parent attaches the window to the root; the
    /// first window ever registered becomes the root.
    pub fn on_window_opened(&mut self, id: WindowId, parent: Option<WindowId>, url: &str) {
        if let Some(existing) = self.nodes.get_mut(&id) {
            if !url.is_empty() {
                existing.url = url.to_string();
            }
            return;
        }

        let parent = parent
            .filter(|p| p != &id && self.nodes.contains_key(p))
            .or_else(|| self.root.clone());
        let level = parent
            .as_ref()
            .and_then(|p| self.nodes.get(p))
            .map(|p| p.level + 1)
            .unwrap_or(0);

        self.seq += 1;
        let node = WindowNode {
            id: id.clone(),
            parent: parent.clone(),
            children: Vec::new(),
            level,
            opened_at: Utc::now(),
            seq: self.seq,
            title: String::new(),
            url: url.to_string(),
            closed: false,
        };

        match &parent {
            Some(p) => {
                if let Some(parent_node) = self.nodes.get_mut(p) {
                    parent_node.children.push(id.clone());
                }
            }
            None => self.root = Some(id.clone()),
        }
        debug!(window = %id, parent = ?parent, level, "Registered window");
        self.nodes.insert(id.clone(), node);
        self.latest = Some(id);
    }

    /// Mark a window destroyed. Entries are never removed.
    pub fn on_window_closed(&mut self, id: &WindowId) {
        if let Some(node) = self.nodes.get_mut(id) {
            if !node.closed {
                debug!(window = %id, "Window closed");
            }
            node.closed = true;
        }
    }

    /// Replace a torn-down session: forget every window and start a new tree.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.latest = None;
    }

    /// Apply all pending driver events.
    pub fn sync(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(WindowEvent::Opened { id, opener, url }) => {
                    self.on_window_opened(id, opener, &url);
                }
                Ok(WindowEvent::Closed { id }) => self.on_window_closed(&id),
                Ok(WindowEvent::Dialog {
                    window,
                    kind,
                    message,
                }) => {
                    info!(window = %window, ?kind, "Dialog: {}", message);
                    if self.dialogs.len() == DIALOG_HISTORY {
                        self.dialogs.pop_front();
                    }
                    self.dialogs.push_back(DialogRecord {
                        window,
                        kind,
                        message,
                    });
                }
                Err(TryRecvError::Lagged(missed)) => {
                    warn!("Window event stream lagged, {} event(s) missed", missed);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    /// Reconcile the registry with the driver's live window list.
    ///
    /// Unknown windows are registered (under their opener when known) and
    /// registered windows missing from the list are marked closed.
    pub async fn refresh(&mut self, driver: &dyn BrowserDriver) -> Result<Vec<WindowInfo>, DriverError> {
        self.sync();
        let live = driver.windows().await?;
        self.absorb(&live);
        Ok(live)
    }

    fn absorb(&mut self, live: &[WindowInfo]) {
        let replaced = !self.nodes.is_empty()
            && !live.is_empty()
            && !live.iter().any(|w| self.nodes.contains_key(&w.id));
        if replaced {
            debug!("Browser session replaced, starting a new window tree");
            self.reset();
        }

        let live_ids: HashSet<&WindowId> = live.iter().map(|w| &w.id).collect();
        let ids: Vec<WindowId> = self.nodes.keys().cloned().collect();
        for id in ids {
            if !live_ids.contains(&id) {
                self.on_window_closed(&id);
            }
        }

        for info in live {
            if !self.nodes.contains_key(&info.id) {
                self.on_window_opened(info.id.clone(), info.opener.clone(), &info.url);
            }
            if let Some(node) = self.nodes.get_mut(&info.id) {
                node.title = info.title.clone();
                node.url = info.url.clone();
            }
        }
    }

    /// Open windows, most recently opened first.
    pub fn active_windows(&self) -> Vec<WindowId> {
        let mut open: Vec<&WindowNode> = self.nodes.values().filter(|n| !n.closed).collect();
        open.sort_by(|a, b| b.opened_at.cmp(&a.opened_at).then(b.seq.cmp(&a.seq)));
        open.into_iter().map(|n| n.id.clone()).collect()
    }

    /// Focus the most recent open window if the driver is focused elsewhere,
    /// then wait (bounded by `settle`) for its document to leave `loading`.
    ///
    /// Returns the focused window, or `None` when no window is open.
    pub async fn switch_to_most_recent_active(
        &mut self,
        driver: &dyn BrowserDriver,
        settle: Duration,
    ) -> Result<Option<WindowId>, DriverError> {
        self.refresh(driver).await?;
        let Some(recent) = self.active_windows().into_iter().next() else {
            return Ok(None);
        };

        let current = driver.current_window().await?;
        if current.as_ref() != Some(&recent) {
            info!(window = %recent, previous = ?current, "Switching to most recent window");
            driver.focus_window(&recent).await?;

            let start = Instant::now();
            while start.elapsed() < settle {
                match driver.ready_state(&recent, &FramePath::main()).await {
                    Ok(state) if state.is_settled() => break,
                    Ok(_) => {}
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(_) => break,
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
        Ok(Some(recent))
    }

    /// Window search order for a cross-window search, excluding `exclude`.
    ///
    /// The latest window comes first, then the remaining windows by recency,
    /// each followed by its own descendants (depth-first, newest child first)
    /// before the next window; the root window is always last.
    pub fn search_order(&self, exclude: Option<&WindowId>) -> Vec<WindowId> {
        let mut order: Vec<WindowId> = Vec::new();
        let mut visited: HashSet<WindowId> = HashSet::new();
        let root = self.root.as_ref();

        let mut starts: Vec<WindowId> = self.latest_open().cloned().into_iter().collect();
        starts.extend(self.active_windows());

        for start in starts.into_iter().filter(|s| Some(s) != root) {
            // Explicit stack; the visited set bounds it by the registry size.
            let mut stack = vec![start];
            while let Some(id) = stack.pop() {
                if !visited.insert(id.clone()) {
                    continue;
                }
                let Some(node) = self.nodes.get(&id) else {
                    continue;
                };
                if !node.closed && Some(&id) != exclude {
                    order.push(id.clone());
                }
                let mut children: Vec<&WindowNode> = node
                    .children
                    .iter()
                    .filter_map(|c| self.nodes.get(c))
                    .collect();
                // Oldest pushed first so the newest child is popped first.
                children.sort_by_key(|c| c.seq);
                stack.extend(children.into_iter().map(|c| c.id.clone()));
            }
        }

        if let Some(root) = root {
            if self.is_open(root) && exclude != Some(root) {
                order.push(root.clone());
            }
        }
        order
    }
}

#[cfg(test)]
#[path = "hierarchy_tests.rs"]
mod tests;
