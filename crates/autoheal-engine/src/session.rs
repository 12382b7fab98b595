//! Run state shared between the step pipeline and the control surface.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use autoheal_config::Config;
use autoheal_protocols::BrowserDriver;
use serde::Serialize;

use crate::error::EngineError;
use crate::hierarchy::WindowTracker;

/// Pause/stop flags and progress counters of a run.
///
/// Written by the control surface (pause, resume, stop) and by the step
/// controller (progress); read everywhere else.
#[derive(Debug)]
pub struct RunControl {
    paused: AtomicBool,
    stopped: AtomicBool,
    running: AtomicBool,
    current_step: AtomicUsize,
    total_steps: AtomicUsize,
    poll: Duration,
}

/// Point-in-time view of a run's progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatus {
    pub current_step: usize,
    pub total_steps: usize,
    pub running: bool,
    pub paused: bool,
    pub stopped: bool,
}

impl RunControl {
    pub fn new(poll: Duration) -> Self {
        Self {
            paused: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            running: AtomicBool::new(false),
            current_step: AtomicUsize::new(0),
            total_steps: AtomicUsize::new(0),
            poll,
        }
    }

    /// Reset flags for a new run of `total` steps.
    ///
    /// Returns [`EngineError::AlreadyRunning`] if a run is in progress.
    pub fn begin(&self, total: usize) -> Result<(), EngineError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(EngineError::AlreadyRunning);
        }
        self.paused.store(false, Ordering::SeqCst);
        self.stopped.store(false, Ordering::SeqCst);
        self.current_step.store(0, Ordering::SeqCst);
        self.total_steps.store(total, Ordering::SeqCst);
        Ok(())
    }

    pub fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Request a cooperative stop. In-flight driver calls are not aborted.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_current_step(&self, step: usize) {
        self.current_step.store(step, Ordering::SeqCst);
    }

    pub fn status(&self) -> RunStatus {
        RunStatus {
            current_step: self.current_step.load(Ordering::SeqCst),
            total_steps: self.total_steps.load(Ordering::SeqCst),
            running: self.is_running(),
            paused: self.is_paused(),
            stopped: self.is_stopped(),
        }
    }

    /// Block while paused, polling at the configured interval.
    ///
    /// Returns how long the call was held by a pause, or
    /// [`EngineError::Stopped`] once a stop is requested.
    pub async fn checkpoint(&self) -> Result<Duration, EngineError> {
        let start = Instant::now();
        loop {
            if self.is_stopped() {
                return Err(EngineError::Stopped);
            }
            if !self.is_paused() {
                return Ok(start.elapsed());
            }
            tokio::time::sleep(self.poll).await;
        }
    }

    /// Sleep for `duration`, not counting time spent paused.
    pub async fn sleep(&self, duration: Duration) -> Result<(), EngineError> {
        let mut remaining = duration;
        while !remaining.is_zero() {
            self.checkpoint().await?;
            let chunk = remaining.min(self.poll);
            tokio::time::sleep(chunk).await;
            remaining = remaining.saturating_sub(chunk);
        }
        self.checkpoint().await?;
        Ok(())
    }
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

/// A wait budget that is extended by time spent paused.
#[derive(Debug, Clone)]
pub struct Deadline {
    end: Instant,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            end: Instant::now() + budget,
        }
    }

    pub fn extend(&mut self, by: Duration) {
        self.end += by;
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.end
    }

    pub fn remaining(&self) -> Duration {
        self.end.saturating_duration_since(Instant::now())
    }
}

/// Everything one run needs, passed explicitly to every component.
pub struct RunSession {
    pub driver: Arc<dyn BrowserDriver>,
    pub config: Arc<Config>,
    pub control: Arc<RunControl>,
    pub tracker: WindowTracker,
}

impl RunSession {
    pub fn new(driver: Arc<dyn BrowserDriver>, config: Arc<Config>, control: Arc<RunControl>) -> Self {
        let tracker = WindowTracker::new(driver.subscribe());
        Self {
            driver,
            config,
            control,
            tracker,
        }
    }
}
