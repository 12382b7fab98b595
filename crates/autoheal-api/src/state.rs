//! Application state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use autoheal_config::Config;
use autoheal_engine::{
    ArtifactStore, JsonFileSink, ResultSink, RunControl, RunSession, SharedResults,
    StepController,
};
use autoheal_protocols::{BrowserDriver, Instruction};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::ApiError;
use crate::log_buffer::RecentLogs;

/// State shared across handlers.
pub struct AppState {
    pub driver: Arc<dyn BrowserDriver>,
    pub config: Arc<Config>,
    pub control: Arc<RunControl>,
    pub results: SharedResults,
    pub logs: RecentLogs,
    run_task: Mutex<Option<JoinHandle<()>>>,
    start_time: Instant,
}

impl AppState {
    pub fn new(driver: Arc<dyn BrowserDriver>, config: Arc<Config>, logs: RecentLogs) -> Self {
        let control = Arc::new(RunControl::new(config.run.pause_poll()));
        Self {
            driver,
            config,
            control,
            results: SharedResults::new(),
            logs,
            run_task: Mutex::new(None),
            start_time: Instant::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Whether a run task exists and has not completed.
    pub fn is_run_active(&self) -> bool {
        self.control.is_running()
            || self
                .run_task
                .lock()
                .as_ref()
                .is_some_and(|task| !task.is_finished())
    }

    /// Spawn a run of `steps` on the shared driver.
    ///
    /// Results of the previous run are cleared. The run writes its records
    /// to `results.json` inside its artifacts directory as well.
    pub fn start_run(&self, steps: Vec<Instruction>) -> Result<usize, ApiError> {
        let mut task = self.run_task.lock();
        if self.control.is_running() || task.as_ref().is_some_and(|t| !t.is_finished()) {
            return Err(ApiError::RunActive);
        }

        let store = ArtifactStore::create(&self.config.artifacts)?;
        let results_file = store.run_dir().join("results.json");
        let controller = StepController::new(&self.config, store)
            .with_sink(self.results.clone())
            .with_sink(JsonFileSink::new(results_file.clone()));
        let mut session =
            RunSession::new(self.driver.clone(), self.config.clone(), self.control.clone());
        self.results.publish(&[])?;

        let total = steps.len();
        *task = Some(tokio::spawn(async move {
            match controller.run(&mut session, &steps).await {
                Ok(summary) => info!(
                    "Run finished: {} passed, {} failed, {} skipped, {} stopped ({})",
                    summary.passed,
                    summary.failed,
                    summary.skipped,
                    summary.stopped,
                    results_file.display()
                ),
                Err(e) => error!("Run could not start: {}", e),
            }
        }));
        Ok(total)
    }

    /// Wait for the current run task, if any, to complete.
    pub async fn wait_for_run(&self) {
        let task = self.run_task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!("Run task failed: {}", e);
            }
        }
    }
}
