use autoheal_protocols::{NodeSnapshot, WindowId};

use super::*;
use crate::mock_driver::MockDriver;

fn setup(node: NodeSnapshot) -> (MockDriver, NodeRef) {
    let driver = MockDriver::with_window("main", "https://app.test/");
    let node = driver.add_node(&WindowId::new("main"), node);
    (driver, node)
}

fn executor() -> ActionExecutor {
    ActionExecutor::new(Duration::ZERO)
}

#[tokio::test]
async fn test_standard_click_first() {
    let (driver, node) = setup(NodeSnapshot::new("btn", "button").with_text("Submit"));

    let outcome = executor()
        .perform(&driver, &node, &ElementAction::Click)
        .await
        .unwrap();

    assert_eq!(outcome, ActionOutcome::Done(Technique::Standard));
    assert_eq!(driver.actions().len(), 1);
}

#[tokio::test]
async fn test_hidden_node_falls_back_to_forced() {
    let (driver, node) = setup(NodeSnapshot::new("btn", "button").with_text("Go").hidden());

    let outcome = executor()
        .perform(&driver, &node, &ElementAction::Click)
        .await
        .unwrap();

    assert_eq!(outcome, ActionOutcome::Done(Technique::Forced));
    assert_eq!(driver.last_action().unwrap().technique, Technique::Forced);
}

#[tokio::test]
async fn test_chain_reaches_event_dispatch() {
    let (driver, node) = setup(NodeSnapshot::new("email", "input"));
    driver.reject(&node.handle, Technique::Standard);
    driver.reject(&node.handle, Technique::Forced);
    driver.reject(&node.handle, Technique::DirectMutation);

    let outcome = executor()
        .perform(&driver, &node, &ElementAction::Fill("a@b.com".to_string()))
        .await
        .unwrap();

    assert_eq!(outcome, ActionOutcome::Done(Technique::EventDispatch));
    assert_eq!(driver.value_of(&node.handle).as_deref(), Some("a@b.com"));
}

#[tokio::test]
async fn test_every_technique_rejected() {
    let (driver, node) = setup(NodeSnapshot::new("btn", "button"));
    driver.reject_all(&node.handle);

    let outcome = executor()
        .perform(&driver, &node, &ElementAction::Click)
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        ActionOutcome::Rejected(DriverError::NotActionable(_))
    ));
    assert!(driver.actions().is_empty());
}

#[tokio::test]
async fn test_closed_window_is_stale() {
    let (driver, node) = setup(NodeSnapshot::new("btn", "button"));
    driver.close_window_on_action(&node.window);

    let outcome = executor()
        .perform(&driver, &node, &ElementAction::Click)
        .await
        .unwrap();

    assert!(matches!(outcome, ActionOutcome::Stale(DriverError::WindowClosed(_))));
}

#[tokio::test]
async fn test_removed_node_is_stale() {
    let (driver, node) = setup(NodeSnapshot::new("btn", "button"));
    driver.remove_node(&node.handle);

    let outcome = executor()
        .perform(&driver, &node, &ElementAction::Click)
        .await
        .unwrap();

    assert!(matches!(outcome, ActionOutcome::Stale(DriverError::StaleElement(_))));
}

#[tokio::test]
async fn test_disconnect_is_an_error() {
    let (driver, node) = setup(NodeSnapshot::new("btn", "button"));
    driver.disconnect();

    let err = executor()
        .perform(&driver, &node, &ElementAction::Click)
        .await
        .unwrap_err();

    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_select_uses_select_scripts() {
    let (driver, node) = setup(NodeSnapshot::new("country", "select"));
    driver.reject(&node.handle, Technique::Standard);
    driver.reject(&node.handle, Technique::Forced);

    let outcome = executor()
        .perform(&driver, &node, &ElementAction::Select("Norway".to_string()))
        .await
        .unwrap();

    assert_eq!(outcome, ActionOutcome::Done(Technique::DirectMutation));
    let action = driver.last_action().unwrap();
    assert_eq!(action.kind, Action::Select);
    assert_eq!(action.value.as_deref(), Some("Norway"));
}

#[test]
fn test_node_script_table() {
    assert_eq!(
        node_script(Technique::DirectMutation, &ElementAction::Click),
        NodeScript::SyntheticClick
    );
    assert_eq!(
        node_script(Technique::EventDispatch, &ElementAction::Click),
        NodeScript::PointerSequence
    );
    assert_eq!(
        node_script(Technique::DirectMutation, &ElementAction::Fill("x".into())),
        NodeScript::SetValueWithEvents("x".into())
    );
    assert_eq!(
        node_script(Technique::EventDispatch, &ElementAction::Select("y".into())),
        NodeScript::DispatchInput("y".into())
    );
}

#[test]
fn test_element_action_from_instruction() {
    let fill = Instruction::new("1", Action::Fill, "Email").with_data("a@b.com");
    assert_eq!(
        ElementAction::from_instruction(&fill),
        Some(ElementAction::Fill("a@b.com".to_string()))
    );
    let wait = Instruction::new("2", Action::Wait, "");
    assert_eq!(ElementAction::from_instruction(&wait), None);
    assert_eq!(TECHNIQUES[0], Technique::Standard);
    assert_eq!(Technique::DirectMutation.to_string(), "direct mutation");
}
