//! Whole-run scenarios: instruction files in, result files out.
//!
//! Run with: cargo test -p autoheal-engine --test run_scenarios

use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use autoheal_config::Config;
use autoheal_engine::{
    ArtifactStore, JsonFileSink, MockDriver, RunControl, RunSession, StepController,
    load_instructions,
};
use autoheal_protocols::{Action, Instruction, NodeSnapshot, StepRecord, StepStatus, WindowId};

fn test_config() -> Config {
    let mut config = Config::default();
    config.resolution.max_attempts = 2;
    config.resolution.dynamic_wait_ms = 40;
    config.resolution.poll_interval_ms = 5;
    config.resolution.settle_delay_ms = 0;
    config.readiness.budget_ms = 200;
    config.readiness.sub_timeout_ms = 30;
    config.readiness.poll_interval_ms = 5;
    config.run.pause_poll_ms = 5;
    config
}

fn shop() -> Arc<MockDriver> {
    let driver = Arc::new(MockDriver::with_window("main", "about:blank"));
    let main = WindowId::new("main");
    driver.add_node(&main, NodeSnapshot::new("qty", "input").with_explicit_label("Quantity"));
    driver.add_node(&main, NodeSnapshot::new("add", "button").with_text("Add to cart"));
    driver.set_body_text(&main, "Your cart has 2 items");
    driver
}

const STEPS_JSON: &str = r#"[
  {"Step": 1, "Action": "OPEN", "Target": "https://shop.test/item/7", "Execute": "Y"},
  {"Step": 2, "Action": "FILL", "Target": "Quantity", "Data": "2", "Execute": "Y"},
  {"Step": 3, "Action": "CLICK", "Target": "Add to cart", "Execute": "Y"},
  {"Step": 4, "Action": "CLICK", "Target": "Checkout", "Execute": "N"},
  {"Step": 5, "Action": "VERIFY", "Target": "", "Data": "cart has 2 items", "Execute": "Y"}
]"#;

#[tokio::test]
async fn test_instruction_file_to_results_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("steps.json");
    fs::write(&source, STEPS_JSON).unwrap();
    let results_path = dir.path().join("out").join("results.json");

    let config = test_config();
    let driver = shop();
    let control = Arc::new(RunControl::new(config.run.pause_poll()));
    let mut session = RunSession::new(driver.clone(), Arc::new(config.clone()), control);
    let store = ArtifactStore::in_dir(dir.path().join("artifacts"), true, true).unwrap();
    let controller =
        StepController::new(&config, store).with_sink(JsonFileSink::new(&results_path));

    let steps = load_instructions(&source).unwrap();
    let summary = controller.run(&mut session, &steps).await.unwrap();
    assert_eq!((summary.passed, summary.skipped), (4, 1));

    let written: Vec<StepRecord> =
        serde_json::from_str(&fs::read_to_string(&results_path).unwrap()).unwrap();
    let statuses: Vec<StepStatus> = written.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            StepStatus::Pass,
            StepStatus::Pass,
            StepStatus::Pass,
            StepStatus::Skipped,
            StepStatus::Pass
        ]
    );
    assert_eq!(written[0].step, "1");
    assert!(written[1].page_source.as_ref().unwrap().ends_with("step_2_fill.html"));

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&results_path).unwrap()).unwrap();
    assert_eq!(raw[0]["Status"], "PASS");
    assert!(raw[0]["Remarks"].as_str().unwrap().contains("shop.test"));
}

#[tokio::test]
async fn test_pause_holds_run_until_resumed() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config();
    let driver = shop();
    let control = Arc::new(RunControl::new(config.run.pause_poll()));
    let mut session = RunSession::new(driver.clone(), Arc::new(config.clone()), control.clone());
    let store = ArtifactStore::in_dir(dir.path(), false, false).unwrap();
    let controller = StepController::new(&config, store);

    let steps = vec![
        Instruction::new("1", Action::Wait, "40"),
        Instruction::new("2", Action::Click, "Add to cart"),
    ];

    let pauser = control.clone();
    let resumer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        pauser.pause();
        tokio::time::sleep(Duration::from_millis(80)).await;
        let status = pauser.status();
        pauser.resume();
        status
    });

    let start = Instant::now();
    let summary = controller.run(&mut session, &steps).await.unwrap();
    let paused_status = resumer.await.unwrap();

    assert!(start.elapsed() >= Duration::from_millis(90));
    assert!(paused_status.running);
    assert!(paused_status.paused);
    assert_eq!(paused_status.current_step, 1);
    assert_eq!(summary.passed, 2);
    assert_eq!(driver.actions().len(), 1);
}
