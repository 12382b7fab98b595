use super::*;

#[test]
fn test_frame_path() {
    let main = FramePath::main();
    assert!(main.is_main());
    assert_eq!(main.depth(), 0);
    assert_eq!(main.to_string(), "main");

    let nested = main.child(1).child(0);
    assert_eq!(nested.depth(), 2);
    assert_eq!(nested.indices(), &[1, 0]);
    assert_eq!(nested.to_string(), "frame[1/0]");
}

#[test]
fn test_snapshot_attr_lookup() {
    let node = NodeSnapshot::new("n1", "INPUT")
        .with_attr("Placeholder", "Your email")
        .with_attr("type", "Email");
    assert_eq!(node.tag, "input");
    assert_eq!(node.attr("placeholder"), Some("Your email"));
    assert_eq!(node.input_type(), "email");
    assert!(!node.has_attr("name"));
}

#[test]
fn test_snapshot_defaults_from_json() {
    let json = r#"{"handle": "n:3", "tag": "button", "text": "Go", "cursorPointer": true}"#;
    let node: NodeSnapshot = serde_json::from_str(json).unwrap();
    assert_eq!(node.handle.as_str(), "n:3");
    assert!(node.visible);
    assert!(node.cursor_pointer);
    assert!(node.labels.is_empty());
    assert!(node.is_zero_size());
}

#[test]
fn test_label_facts_order() {
    let labels = LabelFacts {
        explicit: None,
        wrapping: Some("Email".to_string()),
        preceding: Some("Contact".to_string()),
    };
    let all: Vec<&str> = labels.iter().collect();
    assert_eq!(all, vec!["Email", "Contact"]);
}

#[test]
fn test_ready_state() {
    assert_eq!(ReadyState::from_dom("complete"), ReadyState::Complete);
    assert_eq!(ReadyState::from_dom("interactive"), ReadyState::Interactive);
    assert_eq!(ReadyState::from_dom("loading"), ReadyState::Loading);
    assert!(!ReadyState::Loading.is_settled());
    assert!(ReadyState::Interactive.is_settled());
}

#[test]
fn test_scope_builders() {
    let w = WindowId::new("w1");
    let scope = Scope::document(w.clone());
    assert!(scope.frame.is_main());
    assert_eq!(scope.root, ScopeRoot::Document);

    let overlay = Scope::document(w).with_root(ScopeRoot::Element(NodeHandle::new("n:9")));
    assert!(matches!(overlay.root, ScopeRoot::Element(_)));
}

#[test]
fn test_dialog_kind_from_cdp() {
    assert_eq!(DialogKind::from_cdp("confirm"), DialogKind::Confirm);
    assert_eq!(DialogKind::from_cdp("beforeunload"), DialogKind::BeforeUnload);
    assert_eq!(DialogKind::from_cdp("alert"), DialogKind::Alert);
}
