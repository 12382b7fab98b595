use super::*;

#[test]
fn test_cdp_request_serialize() {
    let req = CdpRequest {
        id: 1,
        method: "Page.navigate".to_string(),
        params: Some(serde_json::json!({"url": "https://example.com"})),
        session_id: None,
    };
    let json = serde_json::to_string(&req).unwrap();
    assert!(json.contains("Page.navigate"));
    assert!(json.contains("example.com"));
    assert!(!json.contains("sessionId"));
}

#[test]
fn test_cdp_response_deserialize() {
    let json = r#"{"id": 1, "result": {"frameId": "abc"}}"#;
    let resp: CdpResponse = serde_json::from_str(json).unwrap();
    assert_eq!(resp.id, Some(1));
    assert!(resp.result.is_some());
    assert!(resp.event().is_none());
}

#[test]
fn test_event_deserialize() {
    let json = r#"{
        "method": "Target.targetCreated",
        "params": {"targetInfo": {"targetId": "T2", "type": "page", "title": "", "url": "about:blank", "openerId": "T1"}}
    }"#;
    let resp: CdpResponse = serde_json::from_str(json).unwrap();
    assert_eq!(resp.event(), Some("Target.targetCreated"));
    let info: TargetInfo =
        serde_json::from_value(resp.param("targetInfo").cloned().unwrap()).unwrap();
    assert!(info.is_page());
    assert_eq!(info.opener_id.as_deref(), Some("T1"));
}

#[test]
fn test_exception_message_prefers_description() {
    let json = r#"{
        "text": "Uncaught",
        "lineNumber": 0,
        "columnNumber": 3,
        "exception": {"type": "object", "subtype": "error", "description": "Error: STALE:n4\n    at x"}
    }"#;
    let details: ExceptionDetails = serde_json::from_str(json).unwrap();
    assert!(details.message().starts_with("Error: STALE:n4"));

    let bare: ExceptionDetails = serde_json::from_str(r#"{"text": "SyntaxError"}"#).unwrap();
    assert_eq!(bare.message(), "SyntaxError");
}

#[test]
fn test_click_point_deserialize() {
    let json = r#"{"x": 10.5, "y": 20, "visible": true, "receivesEvents": false, "enabled": true}"#;
    let point: ClickPoint = serde_json::from_str(json).unwrap();
    assert_eq!(point.x, 10.5);
    assert!(point.visible);
    assert!(!point.receives_events);
}

#[test]
fn test_mouse_button_serialize() {
    let json = serde_json::to_string(&MouseButton::Left).unwrap();
    assert_eq!(json, "\"left\"");
    let json = serde_json::to_string(&MouseEventType::MousePressed).unwrap();
    assert_eq!(json, "\"mousePressed\"");
}

#[test]
fn test_screenshot_format_serialize() {
    let json = serde_json::to_string(&ScreenshotFormat::Png).unwrap();
    assert_eq!(json, "\"png\"");
}
