//! Read-only listing of the active window's interactive elements.

use std::collections::HashSet;

use autoheal_config::ResolutionConfig;
use autoheal_protocols::{BrowserDriver, NodeQuery, NodeSnapshot, WindowId};
use serde::Serialize;

use crate::context::{ContextEnumerator, aborts_walk};
use crate::error::EngineError;
use crate::matcher::{is_fillable, is_interactive, is_selectable};

const DESCRIPTION_LIMIT: usize = 60;

/// One element as shown by the diagnostic listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
    pub window: WindowId,
    pub context: String,
    pub kind: String,
    pub tag: String,
    pub description: String,
    pub visible: bool,
}

fn element_kind(node: &NodeSnapshot) -> Option<&'static str> {
    if is_selectable(node) {
        Some("dropdown")
    } else if is_fillable(node) {
        Some("field")
    } else if node.tag == "a" || node.role().as_deref() == Some("link") {
        Some("link")
    } else if is_interactive(node) {
        Some("button")
    } else {
        None
    }
}

/// The name a person would use for `node`.
pub fn describe(node: &NodeSnapshot) -> String {
    let named = node
        .labels
        .iter()
        .chain(std::iter::once(node.text.as_str()))
        .chain(
            ["aria-label", "placeholder", "title", "value", "name", "id"]
                .into_iter()
                .filter_map(|a| node.attr(a)),
        )
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|s| !s.is_empty());

    match named {
        Some(name) if name.chars().count() > DESCRIPTION_LIMIT => {
            let cut: String = name.chars().take(DESCRIPTION_LIMIT).collect();
            format!("{}...", cut)
        }
        Some(name) => name,
        None => format!("<{}>", node.tag),
    }
}

/// List interactive, fillable and selectable nodes of the focused window.
///
/// Does not change focus or act on anything.
pub async fn list_current_elements(
    driver: &dyn BrowserDriver,
    config: &ResolutionConfig,
) -> Result<Vec<ElementInfo>, EngineError> {
    let window = match driver.current_window().await? {
        Some(window) => window,
        None => driver
            .windows()
            .await?
            .into_iter()
            .map(|w| w.id)
            .next_back()
            .ok_or_else(|| EngineError::NoWindow("no open window to inspect".to_string()))?,
    };

    let contexts = ContextEnumerator::from_config(config)
        .enumerate(driver, &window)
        .await?;

    let mut seen = HashSet::new();
    let mut elements = Vec::new();
    for context in &contexts {
        for query in [NodeQuery::Interactive, NodeQuery::Fillable, NodeQuery::Selectable] {
            let nodes = match driver.query(&context.scope, query).await {
                Ok(nodes) => nodes,
                Err(e) if aborts_walk(&e) => return Err(e.into()),
                Err(_) => continue,
            };
            for node in nodes {
                let Some(kind) = element_kind(&node) else {
                    continue;
                };
                if !seen.insert(node.handle.clone()) {
                    continue;
                }
                elements.push(ElementInfo {
                    window: window.clone(),
                    context: context.describe(),
                    kind: kind.to_string(),
                    tag: node.tag.clone(),
                    description: describe(&node),
                    visible: node.visible && !node.is_zero_size(),
                });
            }
        }
    }
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use autoheal_protocols::FramePath;

    use super::*;
    use crate::mock_driver::MockDriver;

    #[test]
    fn test_describe_prefers_label() {
        let node = NodeSnapshot::new("e", "input")
            .with_attr("placeholder", "you@example.com")
            .with_wrapping_label("Email");
        assert_eq!(describe(&node), "Email");

        let bare = NodeSnapshot::new("b", "button");
        assert_eq!(describe(&bare), "<button>");

        let long = NodeSnapshot::new("l", "a").with_text("x".repeat(80));
        assert!(describe(&long).ends_with("..."));
    }

    #[tokio::test]
    async fn test_lists_each_element_once_with_context() {
        let driver = MockDriver::with_window("main", "");
        let main = WindowId::new("main");
        let modal = driver.add_overlay(
            &main,
            NodeSnapshot::new("modal", "div").with_attr("role", "dialog"),
        );
        driver.add_node(&main, NodeSnapshot::new("save", "button").with_text("Save"));
        driver.add_overlay_node(&main, &modal, NodeSnapshot::new("ok", "button").with_text("OK"));
        driver.add_frame(&main, FramePath::main().child(0));
        driver.add_frame_node(
            &main,
            &FramePath::main().child(0),
            NodeSnapshot::new("q", "input").with_attr("name", "q"),
        );
        driver.add_node(&main, NodeSnapshot::new("plain", "div").with_text("Just text"));

        let elements = list_current_elements(&driver, &ResolutionConfig::default())
            .await
            .unwrap();

        assert_eq!(elements.len(), 3);
        assert_eq!(elements[0].description, "OK");
        assert!(elements[0].context.starts_with("overlay"));
        assert_eq!(elements[1].description, "Save");
        assert_eq!(elements[2].kind, "field");
        assert!(elements[2].context.contains("depth 1"));
    }

    #[tokio::test]
    async fn test_no_window_is_an_error() {
        let driver = MockDriver::new();
        let err = list_current_elements(&driver, &ResolutionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NoWindow(_)));
    }
}
