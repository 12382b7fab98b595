use std::sync::Arc;

use autoheal_protocols::NodeSnapshot;

use super::*;
use crate::mock_driver::MockDriver;
use crate::session::RunControl;
use crate::sinks::{JsonFileSink, SharedResults};

fn config() -> Config {
    let mut config = Config::default();
    config.resolution.max_attempts = 2;
    config.resolution.dynamic_wait_ms = 30;
    config.resolution.poll_interval_ms = 5;
    config.resolution.settle_delay_ms = 0;
    config.readiness.budget_ms = 100;
    config.readiness.sub_timeout_ms = 20;
    config.readiness.poll_interval_ms = 5;
    config.run.pause_poll_ms = 5;
    config.run.open_attempts = 3;
    config
}

struct Harness {
    driver: Arc<MockDriver>,
    session: RunSession,
    controller: StepController,
    results: SharedResults,
    _dir: tempfile::TempDir,
}

fn harness(driver: MockDriver) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let config = config();
    let driver = Arc::new(driver);
    let control = Arc::new(RunControl::new(config.run.pause_poll()));
    let session = RunSession::new(driver.clone(), Arc::new(config.clone()), control);
    let results = SharedResults::new();
    let store = ArtifactStore::in_dir(dir.path().join("run"), true, true).unwrap();
    let controller = StepController::new(&config, store)
        .with_sink(results.clone())
        .with_sink(JsonFileSink::new(dir.path().join("results.json")));
    Harness {
        driver,
        session,
        controller,
        results,
        _dir: dir,
    }
}

fn login_page() -> MockDriver {
    let driver = MockDriver::with_window("main", "about:blank");
    let main = WindowId::new("main");
    driver.add_node(&main, NodeSnapshot::new("email", "input").with_wrapping_label("Email"));
    driver.add_node(&main, NodeSnapshot::new("login", "button").with_text("Log in"));
    driver.set_body_text(&main, "Welcome back");
    driver
}

#[tokio::test]
async fn test_run_records_every_step() {
    let mut h = harness(login_page());
    let steps = vec![
        Instruction::new("1", Action::Open, "https://app.test/login"),
        Instruction::new("2", Action::Fill, "Email").with_data("a@b.com"),
        Instruction::new("3", Action::Click, "Log in"),
        Instruction::new("4", Action::Click, "Delete account").with_execute("N"),
        Instruction::new("5", Action::Verify, "").with_data("WELCOME  back"),
        Instruction::new("6", Action::Wait, "").with_data("10ms"),
        Instruction::new("7", Action::Screenshot, ""),
    ];

    let summary = h.controller.run(&mut h.session, &steps).await.unwrap();

    assert_eq!(summary.total, 7);
    assert_eq!(summary.passed, 6);
    assert_eq!(summary.skipped, 1);
    assert!(summary.is_success());
    assert_eq!(
        h.driver.navigations(&WindowId::new("main")),
        vec!["https://app.test/login".to_string()]
    );
    assert_eq!(summary.records[1].actual_output, "a@b.com");
    assert_eq!(summary.records[3].status, StepStatus::Skipped);

    for record in &summary.records {
        let has_artifacts = record.screenshot.is_some() && record.page_source.is_some();
        assert_eq!(has_artifacts, record.status.requires_artifacts(), "{:?}", record);
    }
    let screenshot = summary.records[0].screenshot.as_ref().unwrap();
    assert!(screenshot.ends_with("step_1_open.png"));
    assert!(screenshot.exists());

    assert_eq!(h.results.len(), 7);
    assert!(!h.session.control.is_running());
}

#[tokio::test]
async fn test_failures_do_not_stop_the_run() {
    let mut h = harness(login_page());
    let steps = vec![
        Instruction::new("1", Action::Click, "Nonexistent"),
        Instruction::new("2", Action::Verify, "Goodbye"),
        Instruction::new("3", Action::Wait, "soon"),
        Instruction::new("4", Action::Click, "Log in"),
    ];

    let summary = h.controller.run(&mut h.session, &steps).await.unwrap();

    let statuses: Vec<StepStatus> = summary.records.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![StepStatus::Fail, StepStatus::Fail, StepStatus::Fail, StepStatus::Pass]
    );
    assert_eq!(summary.records[0].failure, Some(FailureKind::NotFound));
    assert!(summary.records[1].remarks.contains("Goodbye"));
    assert!(summary.records[2].remarks.contains("soon"));
    assert!(summary.records[0].screenshot.is_some());
    assert!(!summary.is_success());
}

#[tokio::test]
async fn test_open_retries_navigation() {
    let driver = MockDriver::with_window("main", "about:blank");
    driver.fail_navigations(2);
    let mut h = harness(driver);

    let summary = h
        .controller
        .run(
            &mut h.session,
            &[Instruction::new("1", Action::Open, "https://app.test/")],
        )
        .await
        .unwrap();
    assert_eq!(summary.records[0].status, StepStatus::Pass);
    assert_eq!(summary.records[0].actual_output, "https://app.test/");
}

#[tokio::test]
async fn test_open_gives_up_after_attempts() {
    let driver = MockDriver::with_window("main", "about:blank");
    driver.fail_navigations(5);
    let mut h = harness(driver);

    let summary = h
        .controller
        .run(
            &mut h.session,
            &[Instruction::new("1", Action::Open, "https://app.test/")],
        )
        .await
        .unwrap();
    assert_eq!(summary.records[0].failure, Some(FailureKind::Timeout));
    assert!(summary.records[0].remarks.contains("3 attempt(s)"));
}

#[tokio::test]
async fn test_open_without_window_opens_one() {
    let mut h = harness(MockDriver::new());

    let summary = h
        .controller
        .run(
            &mut h.session,
            &[Instruction::new("1", Action::Open, "https://app.test/")],
        )
        .await
        .unwrap();
    assert!(summary.records[0].is_pass());
    assert!(h.driver.focused().is_some());
}

#[tokio::test]
async fn test_stop_marks_remaining_steps() {
    let mut h = harness(login_page());
    let control = h.session.control.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        control.stop();
    });

    let steps = vec![
        Instruction::new("1", Action::Click, "Log in"),
        Instruction::new("2", Action::Wait, "5000"),
        Instruction::new("3", Action::Click, "Log in"),
    ];
    let summary = h.controller.run(&mut h.session, &steps).await.unwrap();

    let statuses: Vec<StepStatus> = summary.records.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![StepStatus::Pass, StepStatus::Stopped, StepStatus::Stopped]
    );
    assert!(summary.records[1].screenshot.is_none());
    assert_eq!(summary.aborted, None);
}

#[tokio::test]
async fn test_fatal_failure_aborts_and_keeps_results() {
    let mut h = harness(login_page());
    let steps = vec![
        Instruction::new("1", Action::Click, "Log in"),
        Instruction::new("2", Action::Click, "Log in"),
        Instruction::new("3", Action::Click, "Log in"),
    ];
    // The first click succeeds, then the browser goes away.
    let driver = h.driver.clone();
    let first = h.controller.run(&mut h.session, &steps[..1]).await.unwrap();
    assert_eq!(first.passed, 1);
    driver.disconnect();

    let summary = h.controller.run(&mut h.session, &steps).await.unwrap();

    assert_eq!(summary.records.len(), 1);
    assert_eq!(summary.records[0].failure, Some(FailureKind::Fatal));
    assert!(summary.records[0].screenshot.is_some());
    assert!(summary.aborted.is_some());
    assert_eq!(h.results.len(), 1);
}

#[tokio::test]
async fn test_concurrent_run_rejected() {
    let mut h = harness(login_page());
    h.session.control.begin(1).unwrap();

    let err = h
        .controller
        .run(&mut h.session, &[Instruction::new("1", Action::Screenshot, "")])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyRunning));
}

#[test]
fn test_parse_wait() {
    assert_eq!(parse_wait("").unwrap(), Duration::from_millis(1000));
    assert_eq!(parse_wait("250").unwrap(), Duration::from_millis(250));
    assert_eq!(parse_wait(" 40 ms").unwrap(), Duration::from_millis(40));
    assert_eq!(parse_wait("1.5s").unwrap(), Duration::from_millis(1500));
    assert!(parse_wait("soon").is_err());
    assert!(parse_wait("-1s").is_err());
}

#[test]
fn test_excerpt_truncates() {
    assert_eq!(excerpt("a\n  b"), "a b");
    let long = "word ".repeat(100);
    let cut = excerpt(&long);
    assert!(cut.ends_with("..."));
    assert_eq!(cut.chars().count(), OUTPUT_EXCERPT + 3);
}
