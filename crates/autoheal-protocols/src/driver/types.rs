//! Plain data types exchanged with a browser driver.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle to a browser window (tab or popup).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub String);

impl WindowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WindowId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Path of child-frame indices from a window's main document.
///
/// The empty path is the main document; `[1, 0]` is the first frame of the
/// second frame of the main document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FramePath(pub Vec<usize>);

impl FramePath {
    /// The main document.
    pub fn main() -> Self {
        Self(Vec::new())
    }

    pub fn is_main(&self) -> bool {
        self.0.is_empty()
    }

    /// Nesting depth, 0 for the main document.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Path of this frame's `index`-th child frame.
    pub fn child(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl fmt::Display for FramePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("main");
        }
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "frame[{}]", parts.join("/"))
    }
}

/// Opaque driver-issued handle to a DOM node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeHandle(pub String);

impl NodeHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A node handle qualified by the window that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub window: WindowId,
    pub handle: NodeHandle,
}

impl NodeRef {
    pub fn new(window: WindowId, handle: NodeHandle) -> Self {
        Self { window, handle }
    }
}

/// Root a query is evaluated against inside one frame's document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "handles", rename_all = "snake_case")]
pub enum ScopeRoot {
    /// The whole document.
    Document,
    /// Descendants of one element (an overlay container).
    Element(NodeHandle),
    /// The shadow root reached by descending through each host in turn.
    Shadow(Vec<NodeHandle>),
}

/// A re-queryable searchable scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub window: WindowId,
    pub frame: FramePath,
    pub root: ScopeRoot,
}

impl Scope {
    /// The main document of `window`.
    pub fn document(window: WindowId) -> Self {
        Self {
            window,
            frame: FramePath::main(),
            root: ScopeRoot::Document,
        }
    }

    /// The document of the frame at `frame` in `window`.
    pub fn frame(window: WindowId, frame: FramePath) -> Self {
        Self {
            window,
            frame,
            root: ScopeRoot::Document,
        }
    }

    pub fn with_root(mut self, root: ScopeRoot) -> Self {
        self.root = root;
        self
    }
}

/// Pre-filter hint for a driver query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeQuery {
    /// Buttons, links, inputs, ARIA widgets, click-handler and pointer-cursor nodes.
    Interactive,
    /// Input and textarea-like nodes.
    Fillable,
    /// `select` elements and ARIA listboxes/comboboxes.
    Selectable,
    /// Candidate overlay/modal containers.
    OverlayContainers,
    /// Elements exposing an open shadow root.
    ShadowHosts,
}

/// Label text associated with a form control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelFacts {
    /// `<label for="...">` pointing at the control.
    pub explicit: Option<String>,
    /// A `<label>` the control is nested in.
    pub wrapping: Option<String>,
    /// Preceding sibling label or short text node.
    pub preceding: Option<String>,
}

impl LabelFacts {
    pub fn is_empty(&self) -> bool {
        self.explicit.is_none() && self.wrapping.is_none() && self.preceding.is_none()
    }

    /// Label texts in association-strength order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        [&self.explicit, &self.wrapping, &self.preceding]
            .into_iter()
            .filter_map(|l| l.as_deref())
    }
}

fn default_true() -> bool {
    true
}

/// A DOM node as observed by a driver at query time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub handle: NodeHandle,
    /// Lower-case tag name.
    pub tag: String,
    /// Attributes in source order.
    #[serde(default)]
    pub attributes: Vec<(String, String)>,
    /// Visible text, whitespace-collapsed.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub labels: LabelFacts,
    #[serde(default)]
    pub cursor_pointer: bool,
    #[serde(default)]
    pub has_click_handler: bool,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Computed CSS `position`.
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub z_index: i64,
    #[serde(default)]
    pub has_shadow_root: bool,
    /// Document encounter order within the queried scope.
    #[serde(default)]
    pub order: usize,
}

impl NodeSnapshot {
    pub fn new(handle: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            handle: NodeHandle::new(handle),
            tag: tag.into().to_ascii_lowercase(),
            attributes: Vec::new(),
            text: String::new(),
            labels: LabelFacts::default(),
            cursor_pointer: false,
            has_click_handler: false,
            width: 100.0,
            height: 20.0,
            visible: true,
            position: "static".to_string(),
            z_index: 0,
            has_shadow_root: false,
            order: 0,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_explicit_label(mut self, label: impl Into<String>) -> Self {
        self.labels.explicit = Some(label.into());
        self
    }

    pub fn with_wrapping_label(mut self, label: impl Into<String>) -> Self {
        self.labels.wrapping = Some(label.into());
        self
    }

    pub fn with_preceding_label(mut self, label: impl Into<String>) -> Self {
        self.labels.preceding = Some(label.into());
        self
    }

    pub fn with_cursor_pointer(mut self) -> Self {
        self.cursor_pointer = true;
        self
    }

    pub fn with_click_handler(mut self) -> Self {
        self.has_click_handler = true;
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_position(mut self, position: impl Into<String>, z_index: i64) -> Self {
        self.position = position.into();
        self.z_index = z_index;
        self
    }

    pub fn with_shadow_root(mut self) -> Self {
        self.has_shadow_root = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn at_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    /// Attribute value by case-insensitive name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// `role` attribute, lower-cased.
    pub fn role(&self) -> Option<String> {
        self.attr("role").map(|r| r.trim().to_ascii_lowercase())
    }

    /// `type` attribute for inputs, lower-cased (`text` when absent).
    pub fn input_type(&self) -> String {
        self.attr("type")
            .map(|t| t.trim().to_ascii_lowercase())
            .unwrap_or_else(|| "text".to_string())
    }

    pub fn is_zero_size(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// In-page script run against one node by the action fallback chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum NodeScript {
    /// Set `value` then fire focus, input, change, blur.
    SetValueWithEvents(String),
    /// Select the option whose value or text matches, then fire input, change.
    SelectWithEvents(String),
    /// Call the node's native `click()`.
    SyntheticClick,
    /// Dispatch bubbling pointerdown, mousedown, pointerup, mouseup, click.
    PointerSequence,
    /// Set `value` through the prototype setter and dispatch a bubbling input event only.
    DispatchInput(String),
}

/// `document.readyState` of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

impl ReadyState {
    pub fn from_dom(state: &str) -> Self {
        match state {
            "complete" => ReadyState::Complete,
            "interactive" => ReadyState::Interactive,
            _ => ReadyState::Loading,
        }
    }

    /// Whether the document has left the `loading` state.
    pub fn is_settled(&self) -> bool {
        !matches!(self, ReadyState::Loading)
    }
}

/// A child frame of some document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameInfo {
    pub path: FramePath,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub src: Option<String>,
}

/// An open window as reported by a driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub id: WindowId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub opener: Option<WindowId>,
}
