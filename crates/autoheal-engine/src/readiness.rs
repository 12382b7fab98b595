//! Readiness Gate.
//!
//! Waits, within a budget, for a window to look settled enough to search.
//! Every sub-wait is bounded by its own sub-timeout and a failed or timed out
//! sub-wait is only logged: the resolver retries anyway.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use autoheal_config::Config;
use autoheal_protocols::{BrowserDriver, DriverError, FramePath, WindowId};
use serde::Serialize;
use tracing::debug;

use crate::error::EngineError;
use crate::session::{Deadline, RunControl};

/// What the gate observed before returning.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessReport {
    pub network_idle: bool,
    pub frames_loaded: bool,
    pub indicators_gone: bool,
    pub document_ready: bool,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl ReadinessReport {
    pub fn is_settled(&self) -> bool {
        self.network_idle && self.frames_loaded && self.indicators_gone && self.document_ready
    }
}

enum Probe<'a> {
    Network,
    Frames(&'a [FramePath]),
    Indicators,
    Document,
}

impl Probe<'_> {
    fn name(&self) -> &'static str {
        match self {
            Probe::Network => "network idle",
            Probe::Frames(_) => "frames loaded",
            Probe::Indicators => "loading indicators gone",
            Probe::Document => "document ready",
        }
    }
}

/// Bounded settle wait for one window.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    sub_timeout: Duration,
    poll: Duration,
    loading_selectors: Vec<String>,
    max_frames: usize,
}

impl ReadinessGate {
    pub fn new(sub_timeout: Duration, poll: Duration, loading_selectors: Vec<String>) -> Self {
        Self {
            sub_timeout,
            poll,
            loading_selectors,
            max_frames: 15,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            sub_timeout: config.readiness.sub_timeout(),
            poll: config.readiness.poll_interval(),
            loading_selectors: config.readiness.loading_selectors.clone(),
            max_frames: config.resolution.max_frames,
        }
    }

    /// Wait for `window` to settle, for at most `budget` of unpaused time.
    ///
    /// Only a stop request is returned as an error.
    pub async fn await_settled(
        &self,
        driver: &dyn BrowserDriver,
        control: &RunControl,
        window: &WindowId,
        budget: Duration,
    ) -> Result<ReadinessReport, EngineError> {
        let start = Instant::now();
        let mut deadline = Deadline::after(budget);
        let frames = self.frame_paths(driver, window).await;

        let mut report = ReadinessReport {
            network_idle: self
                .wait_for(driver, control, window, Probe::Network, &mut deadline)
                .await?,
            ..Default::default()
        };
        report.frames_loaded = self
            .wait_for(driver, control, window, Probe::Frames(&frames), &mut deadline)
            .await?;
        report.indicators_gone = self
            .wait_for(driver, control, window, Probe::Indicators, &mut deadline)
            .await?;
        report.document_ready = self
            .wait_for(driver, control, window, Probe::Document, &mut deadline)
            .await?;
        report.elapsed = start.elapsed();

        debug!(
            window = %window,
            settled = report.is_settled(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Readiness gate passed"
        );
        Ok(report)
    }

    async fn wait_for(
        &self,
        driver: &dyn BrowserDriver,
        control: &RunControl,
        window: &WindowId,
        probe: Probe<'_>,
        deadline: &mut Deadline,
    ) -> Result<bool, EngineError> {
        let mut sub = Deadline::after(self.sub_timeout.min(deadline.remaining()));
        loop {
            let held = control.checkpoint().await?;
            sub.extend(held);
            deadline.extend(held);

            match self.probe(driver, window, &probe).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => {
                    debug!(window = %window, "{} probe failed: {}", probe.name(), e);
                    return Ok(false);
                }
            }

            if sub.expired() || deadline.expired() {
                debug!(window = %window, "Timed out waiting for {}", probe.name());
                return Ok(false);
            }
            tokio::time::sleep(self.poll.min(sub.remaining())).await;
        }
    }

    async fn probe(
        &self,
        driver: &dyn BrowserDriver,
        window: &WindowId,
        probe: &Probe<'_>,
    ) -> Result<bool, DriverError> {
        match probe {
            Probe::Network => driver.network_idle(window).await,
            Probe::Frames(paths) => {
                for path in paths.iter() {
                    match driver.ready_state(window, path).await {
                        Ok(state) if !state.is_settled() => return Ok(false),
                        Ok(_) => {}
                        // A frame that cannot be read cannot be waited on either.
                        Err(DriverError::CrossOrigin(_)) | Err(DriverError::StaleElement(_)) => {}
                        Err(e) => return Err(e),
                    }
                }
                Ok(true)
            }
            Probe::Indicators => {
                for selector in &self.loading_selectors {
                    if driver.count_visible(window, selector).await? > 0 {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Probe::Document => Ok(driver
                .ready_state(window, &FramePath::main())
                .await?
                .is_settled()),
        }
    }

    /// Nested frame paths, breadth-first, capped.
    async fn frame_paths(&self, driver: &dyn BrowserDriver, window: &WindowId) -> Vec<FramePath> {
        let mut paths = Vec::new();
        let mut queue = VecDeque::from([FramePath::main()]);
        while let Some(path) = queue.pop_front() {
            let Ok(children) = driver.child_frames(window, &path).await else {
                continue;
            };
            for child in children {
                if paths.len() >= self.max_frames {
                    return paths;
                }
                paths.push(child.path.clone());
                queue.push_back(child.path);
            }
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use autoheal_protocols::ReadyState;

    use super::*;
    use crate::mock_driver::MockDriver;

    fn gate() -> ReadinessGate {
        ReadinessGate::new(
            Duration::from_millis(60),
            Duration::from_millis(5),
            vec![".spinner".to_string()],
        )
    }

    #[tokio::test]
    async fn test_settled_page_passes_immediately() {
        let driver = MockDriver::with_window("main", "https://app.test/");
        let control = RunControl::new(Duration::from_millis(5));
        let report = gate()
            .await_settled(&driver, &control, &WindowId::new("main"), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(report.is_settled());
        assert!(report.elapsed < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_busy_page_times_out_without_error() {
        let driver = MockDriver::with_window("main", "");
        let main = WindowId::new("main");
        driver.set_network_idle(&main, false);
        driver.set_loading_indicator(&main, ".spinner", 1);
        driver.set_ready_state(&main, ReadyState::Loading);

        let control = RunControl::new(Duration::from_millis(5));
        let report = gate()
            .await_settled(&driver, &control, &main, Duration::from_millis(150))
            .await
            .unwrap();
        assert!(!report.network_idle);
        assert!(!report.indicators_gone);
        assert!(!report.document_ready);
        assert!(report.frames_loaded);
        assert!(report.elapsed < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_closed_window_does_not_fail_gate() {
        let driver = MockDriver::new();
        let control = RunControl::new(Duration::from_millis(5));
        let report = gate()
            .await_settled(&driver, &control, &WindowId::new("gone"), Duration::from_millis(100))
            .await
            .unwrap();
        assert!(!report.is_settled());
    }

    #[tokio::test]
    async fn test_stop_interrupts_gate() {
        let driver = MockDriver::with_window("main", "");
        let main = WindowId::new("main");
        driver.set_network_idle(&main, false);

        let control = Arc::new(RunControl::new(Duration::from_millis(5)));
        control.stop();
        let result = gate()
            .await_settled(&driver, &control, &main, Duration::from_secs(5))
            .await;
        assert!(matches!(result, Err(EngineError::Stopped)));
    }
}
