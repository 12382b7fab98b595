use super::*;

#[test]
fn test_action_parse_case_insensitive() {
    assert_eq!("click".parse::<Action>().unwrap(), Action::Click);
    assert_eq!(" Fill ".parse::<Action>().unwrap(), Action::Fill);
    assert_eq!("SCREENSHOT".parse::<Action>().unwrap(), Action::Screenshot);
    assert!("hover".parse::<Action>().is_err());
}

#[test]
fn test_action_needs_element() {
    assert!(Action::Click.needs_element());
    assert!(Action::Fill.needs_element());
    assert!(Action::Select.needs_element());
    assert!(!Action::Open.needs_element());
    assert!(!Action::Verify.needs_element());
    assert!(!Action::Wait.needs_element());
}

#[test]
fn test_instruction_from_capitalized_json() {
    let json = r#"{"Step": 3, "Action": "click", "Target": "Submit"}"#;
    let inst: Instruction = serde_json::from_str(json).unwrap();
    assert_eq!(inst.step, "3");
    assert_eq!(inst.action, Action::Click);
    assert_eq!(inst.target, "Submit");
    assert_eq!(inst.data, "");
    assert!(inst.should_execute());
}

#[test]
fn test_instruction_from_yaml() {
    let yaml = r#"
- step: "1a"
  action: FILL
  target: Email
  data: a@b.com
  execute: "no"
"#;
    let list: Vec<Instruction> = serde_yml::from_str(yaml).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].step, "1a");
    assert_eq!(list[0].action, Action::Fill);
    assert_eq!(list[0].data, "a@b.com");
    assert!(!list[0].should_execute());
}

#[test]
fn test_execute_flag_values() {
    let base = Instruction::new("1", Action::Wait, "");
    assert!(base.should_execute());
    assert!(base.clone().with_execute("").should_execute());
    for flag in ["Y", "yes", "TRUE", "1", "x", "Run"] {
        assert!(base.clone().with_execute(flag).should_execute(), "{}", flag);
    }
    for flag in ["n", "no", "false", "0", "skip"] {
        assert!(!base.clone().with_execute(flag).should_execute(), "{}", flag);
    }
}

#[test]
fn test_status_artifact_requirement() {
    assert!(StepStatus::Pass.requires_artifacts());
    assert!(StepStatus::Fail.requires_artifacts());
    assert!(!StepStatus::Skipped.requires_artifacts());
    assert!(!StepStatus::Stopped.requires_artifacts());
}

#[test]
fn test_record_constructors() {
    let inst = Instruction::new("2", Action::Click, "Submit");

    let rec = StepRecord::fail(&inst, FailureKind::Stale, "window closed");
    assert_eq!(rec.status, StepStatus::Fail);
    assert_eq!(rec.failure, Some(FailureKind::Stale));
    assert!(!rec.is_pass());

    let rec = StepRecord::skipped(&inst);
    assert_eq!(rec.status, StepStatus::Skipped);
    assert!(rec.screenshot.is_none());
}

#[test]
fn test_record_serializes_result_columns() {
    let inst = Instruction::new("1", Action::Verify, "Welcome");
    let rec = StepRecord::pass(&inst, "found").with_output("Welcome back");
    let value = serde_json::to_value(&rec).unwrap();
    assert_eq!(value["Status"], "PASS");
    assert_eq!(value["Action"], "VERIFY");
    assert_eq!(value["ActualOutput"], "Welcome back");
    assert!(value.get("Remarks").is_some());
}
