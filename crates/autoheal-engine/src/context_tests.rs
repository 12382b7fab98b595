use autoheal_protocols::{FramePath, NodeSnapshot};

use super::*;
use crate::mock_driver::MockDriver;

fn main_window() -> WindowId {
    WindowId::new("main")
}

fn path(indices: &[usize]) -> FramePath {
    FramePath(indices.to_vec())
}

#[test]
fn test_is_overlay_hints() {
    assert!(is_overlay(&NodeSnapshot::new("d", "div").with_attr("role", "dialog")));
    assert!(is_overlay(&NodeSnapshot::new("d", "dialog")));
    assert!(is_overlay(&NodeSnapshot::new("d", "div").with_attr("aria-modal", "true")));
    assert!(is_overlay(
        &NodeSnapshot::new("d", "div").with_attr("class", "cookie-Modal open")
    ));
    assert!(is_overlay(
        &NodeSnapshot::new("d", "div")
            .with_position("fixed", 1000)
            .with_size(400.0, 300.0)
    ));
}

#[test]
fn test_is_overlay_rejects() {
    // Hidden or empty containers never count.
    assert!(!is_overlay(
        &NodeSnapshot::new("d", "div").with_attr("role", "dialog").hidden()
    ));
    assert!(!is_overlay(
        &NodeSnapshot::new("d", "div")
            .with_attr("role", "dialog")
            .with_size(0.0, 0.0)
    ));
    assert!(!is_overlay(&NodeSnapshot::new("b", "body").with_attr("class", "modal-open")));
    // Too small or too low for the positional rule.
    assert!(!is_overlay(
        &NodeSnapshot::new("d", "div")
            .with_position("fixed", 1000)
            .with_size(50.0, 50.0)
    ));
    assert!(!is_overlay(
        &NodeSnapshot::new("d", "div")
            .with_position("absolute", 5)
            .with_size(800.0, 600.0)
    ));
}

#[test]
fn test_describe() {
    let w = main_window();
    assert_eq!(SearchContext::document(w.clone()).describe(), "main document");
    assert_eq!(
        SearchContext::overlay(w.clone(), NodeHandle::new("m1")).describe(),
        "overlay m1"
    );
    let frame = SearchContext::frame(w.clone(), path(&[0, 1]));
    assert_eq!(frame.frame_depth(), 2);
    assert!(frame.describe().ends_with("(depth 2)"));
    let shadow = SearchContext::shadow(w, vec![NodeHandle::new("a"), NodeHandle::new("b")]);
    assert!(shadow.is_shadow());
    assert_eq!(shadow.describe(), "shadow root (depth 2)");
}

#[tokio::test]
async fn test_enumerate_order() {
    let driver = MockDriver::with_window("main", "");
    let w = main_window();
    let low = driver.add_overlay(
        &w,
        NodeSnapshot::new("low", "div")
            .with_attr("role", "dialog")
            .with_position("fixed", 100),
    );
    let high = driver.add_overlay(
        &w,
        NodeSnapshot::new("high", "div")
            .with_attr("role", "dialog")
            .with_position("fixed", 900),
    );
    driver.add_frame(&w, path(&[0]));
    driver.add_node(&w, NodeSnapshot::new("host", "my-widget").with_shadow_root());

    let contexts = ContextEnumerator::new(15, 5).enumerate(&driver, &w).await.unwrap();
    let kinds: Vec<ContextKind> = contexts.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ContextKind::Overlay,
            ContextKind::Overlay,
            ContextKind::Document,
            ContextKind::Frame,
            ContextKind::Shadow,
        ]
    );
    assert_eq!(contexts[0].scope.root, ScopeRoot::Element(high));
    assert_eq!(contexts[1].scope.root, ScopeRoot::Element(low));
}

#[tokio::test]
async fn test_non_overlay_containers_are_ignored() {
    let driver = MockDriver::with_window("main", "");
    let w = main_window();
    driver.add_overlay(&w, NodeSnapshot::new("banner", "div").with_attr("class", "banner"));

    let overlays = ContextEnumerator::new(15, 5).overlays(&driver, &w).await.unwrap();
    assert!(overlays.is_empty());
}

#[tokio::test]
async fn test_frames_breadth_first() {
    let driver = MockDriver::with_window("main", "");
    let w = main_window();
    driver.add_frame(&w, path(&[0]));
    driver.add_frame(&w, path(&[0, 0]));
    driver.add_frame(&w, path(&[0, 0, 0]));
    driver.add_frame(&w, path(&[1]));

    let frames = ContextEnumerator::new(15, 5).frames(&driver, &w).await.unwrap();
    let paths: Vec<FramePath> = frames.iter().map(|c| c.frame_path().clone()).collect();
    assert_eq!(
        paths,
        vec![path(&[0]), path(&[1]), path(&[0, 0]), path(&[0, 0, 0])]
    );
    assert_eq!(frames[3].frame_depth(), 3);
}

#[tokio::test]
async fn test_frame_cap() {
    let driver = MockDriver::with_window("main", "");
    let w = main_window();
    for i in 0..20 {
        driver.add_frame(&w, path(&[i]));
    }

    let frames = ContextEnumerator::new(15, 5).frames(&driver, &w).await.unwrap();
    assert_eq!(frames.len(), 15);
}

#[tokio::test]
async fn test_cross_origin_frame_skipped_with_subtree() {
    let driver = MockDriver::with_window("main", "");
    let w = main_window();
    driver.add_cross_origin_frame(&w, path(&[0]));
    driver.add_frame(&w, path(&[0, 0]));
    driver.add_frame(&w, path(&[1]));

    let frames = ContextEnumerator::new(15, 5).frames(&driver, &w).await.unwrap();
    let paths: Vec<FramePath> = frames.iter().map(|c| c.frame_path().clone()).collect();
    assert_eq!(paths, vec![path(&[1])]);
}

#[tokio::test]
async fn test_shadow_depth_cap() {
    let driver = MockDriver::with_window("main", "");
    let w = main_window();
    let mut chain = vec![driver.add_node(&w, NodeSnapshot::new("h0", "x-a").with_shadow_root()).handle];
    for i in 1..8 {
        let host = driver
            .add_nested_shadow_host(&w, chain.clone(), NodeSnapshot::new(format!("h{}", i), "x-a"))
            .handle;
        chain.push(host);
    }

    let shadows = ContextEnumerator::new(15, 3).shadows(&driver, &w).await.unwrap();
    let depths: Vec<usize> = shadows.iter().map(|c| c.shadow_depth).collect();
    assert_eq!(depths, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_closed_window_aborts() {
    let driver = MockDriver::with_window("main", "");
    let w = main_window();
    driver.close_window(&w);

    let err = ContextEnumerator::new(15, 5).enumerate(&driver, &w).await.unwrap_err();
    assert!(matches!(err, DriverError::WindowClosed(_)));
}
