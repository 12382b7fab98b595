//! Step Controller.
//!
//! Drives an instruction list one step at a time: skips steps whose execute
//! flag is off, dispatches each action, captures artifacts, publishes the
//! growing result list, and resynchronises the active window after every
//! step. Individual failures never end the run; a stop request or a fatal
//! browser failure does.

use std::time::{Duration, Instant};

use autoheal_config::Config;
use autoheal_protocols::{
    Action, DriverError, FailureKind, Instruction, StepRecord, StepStatus, WindowId,
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::artifacts::ArtifactStore;
use crate::error::EngineError;
use crate::executor::ElementAction;
use crate::matcher::normalize;
use crate::orchestrator::{ResolutionOrchestrator, ResolveOutcome};
use crate::session::{Deadline, RunSession};
use crate::sinks::ResultSink;

const DEFAULT_WAIT: Duration = Duration::from_millis(1000);
const OUTPUT_EXCERPT: usize = 200;

/// Counts and records of a finished run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub stopped: usize,
    /// Why the run ended early, when a fatal failure ended it.
    pub aborted: Option<String>,
    pub records: Vec<StepRecord>,
}

impl RunSummary {
    fn push(&mut self, record: StepRecord) {
        match record.status {
            StepStatus::Pass => self.passed += 1,
            StepStatus::Fail => self.failed += 1,
            StepStatus::Skipped => self.skipped += 1,
            StepStatus::Stopped => self.stopped += 1,
        }
        self.records.push(record);
    }

    pub fn is_success(&self) -> bool {
        self.aborted.is_none() && self.failed == 0 && self.stopped == 0
    }
}

/// How one executed step ended.
enum StepOutcome {
    Pass { remarks: String, output: String },
    Fail { kind: FailureKind, remarks: String },
    Stopped,
}

impl StepOutcome {
    fn pass(remarks: impl Into<String>, output: impl Into<String>) -> Self {
        StepOutcome::Pass {
            remarks: remarks.into(),
            output: output.into(),
        }
    }

    fn fail(kind: FailureKind, remarks: impl Into<String>) -> Self {
        StepOutcome::Fail {
            kind,
            remarks: remarks.into(),
        }
    }
}

/// Executes instruction lists against a [`RunSession`].
pub struct StepController {
    orchestrator: ResolutionOrchestrator,
    artifacts: ArtifactStore,
    sinks: Vec<Box<dyn ResultSink>>,
    open_attempts: u32,
    open_retry: Duration,
    step_delay: Duration,
    verify_wait: Duration,
    verify_poll: Duration,
}

impl StepController {
    pub fn new(config: &Config, artifacts: ArtifactStore) -> Self {
        Self {
            orchestrator: ResolutionOrchestrator::from_config(config),
            artifacts,
            sinks: Vec::new(),
            open_attempts: config.run.open_attempts.max(1),
            open_retry: config.readiness.poll_interval(),
            step_delay: config.run.step_delay(),
            verify_wait: config.resolution.dynamic_wait(),
            verify_poll: config.resolution.poll_interval(),
        }
    }

    /// Publish results to `sink` after every step.
    pub fn with_sink(mut self, sink: impl ResultSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Run `instructions` in order.
    ///
    /// Returns [`EngineError::AlreadyRunning`] if the session's control is
    /// already driving a run. A fatal browser failure ends the run early and
    /// is reported in [`RunSummary::aborted`]; records gathered up to that
    /// point are kept.
    pub async fn run(
        &self,
        session: &mut RunSession,
        instructions: &[Instruction],
    ) -> Result<RunSummary, EngineError> {
        session.control.begin(instructions.len())?;
        info!(steps = instructions.len(), "Run started");
        let summary = self.run_steps(session, instructions).await;
        session.control.finish();
        info!(
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            stopped = summary.stopped,
            aborted = summary.aborted.is_some(),
            "Run finished"
        );
        Ok(summary)
    }

    async fn run_steps(&self, session: &mut RunSession, instructions: &[Instruction]) -> RunSummary {
        let mut summary = RunSummary {
            total: instructions.len(),
            ..Default::default()
        };

        for (index, instruction) in instructions.iter().enumerate() {
            let position = index + 1;
            session.control.set_current_step(position);

            if session.control.checkpoint().await.is_err() {
                self.stop_remaining(&mut summary, &instructions[index..]);
                break;
            }

            if !instruction.should_execute() {
                debug!(step = %instruction.step, "Skipping step");
                summary.push(StepRecord::skipped(instruction));
                self.publish(&summary.records);
                continue;
            }

            info!(
                step = %instruction.step,
                action = %instruction.action,
                target = %instruction.target,
                "Executing step {}/{}", position, instructions.len()
            );
            let started = Instant::now();
            let (record, fatal) = match self.execute_step(session, instruction).await {
                Ok(StepOutcome::Stopped) | Err(EngineError::Stopped) => {
                    self.stop_remaining(&mut summary, &instructions[index..]);
                    break;
                }
                Ok(StepOutcome::Pass { remarks, output }) => {
                    (StepRecord::pass(instruction, remarks).with_output(output), None)
                }
                Ok(StepOutcome::Fail { kind, remarks }) => {
                    (StepRecord::fail(instruction, kind, remarks), None)
                }
                Err(e) => {
                    error!(step = %instruction.step, "Fatal failure, aborting run: {}", e);
                    let remarks = format!("Run aborted: {}", e);
                    (
                        StepRecord::fail(instruction, FailureKind::Fatal, remarks),
                        Some(e.to_string()),
                    )
                }
            };

            let window = self.capture_window(session).await;
            let captured = self
                .artifacts
                .capture(session.driver.as_ref(), window.as_ref(), position, instruction)
                .await;
            let mut record = record.with_artifacts(captured.screenshot, captured.page_source);
            record.duration_ms = started.elapsed().as_millis() as u64;

            match record.status {
                StepStatus::Pass => info!(step = %record.step, "PASS: {}", record.remarks),
                _ => warn!(step = %record.step, "FAIL: {}", record.remarks),
            }
            summary.push(record);
            self.publish(&summary.records);

            if fatal.is_some() {
                summary.aborted = fatal;
                break;
            }

            // A click may have opened or closed a window.
            match session
                .tracker
                .switch_to_most_recent_active(session.driver.as_ref(), self.orchestrator.switch_settle())
                .await
            {
                Ok(Some(window)) => debug!(window = %window, "Active window after step"),
                Ok(None) => debug!("No open window after step"),
                Err(e) if e.is_fatal() => {
                    error!("Browser lost after step {}: {}", instruction.step, e);
                    summary.aborted = Some(e.to_string());
                    break;
                }
                Err(e) => debug!("Window resync failed: {}", e),
            }

            if !self.step_delay.is_zero() && session.control.sleep(self.step_delay).await.is_err() {
                self.stop_remaining(&mut summary, &instructions[index + 1..]);
                break;
            }
        }

        summary
    }

    async fn execute_step(
        &self,
        session: &mut RunSession,
        instruction: &Instruction,
    ) -> Result<StepOutcome, EngineError> {
        match instruction.action {
            Action::Open => self.open(session, instruction).await,
            Action::Wait => self.wait(session, instruction).await,
            Action::Verify => self.verify(session, instruction).await,
            Action::Screenshot => Ok(StepOutcome::pass("Screenshot captured", "")),
            Action::Click | Action::Fill | Action::Select => {
                self.element_step(session, instruction).await
            }
        }
    }

    async fn open(
        &self,
        session: &mut RunSession,
        instruction: &Instruction,
    ) -> Result<StepOutcome, EngineError> {
        let url = [instruction.target.trim(), instruction.data.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string();
        if url.is_empty() {
            return Ok(StepOutcome::fail(FailureKind::ActionRejected, "OPEN has no URL"));
        }

        let driver = session.driver.clone();
        let control = session.control.clone();
        let mut last_error: Option<DriverError> = None;

        for attempt in 1..=self.open_attempts {
            control.checkpoint().await?;

            let current = match session
                .tracker
                .switch_to_most_recent_active(driver.as_ref(), self.orchestrator.switch_settle())
                .await
            {
                Ok(window) => window,
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(_) => None,
            };
            let opened = match current {
                Some(window) => driver.navigate(&window, &url).await.map(|_| window),
                None => driver.open_window(&url).await,
            };

            match opened {
                Ok(window) => {
                    if let Err(e) = session.tracker.refresh(driver.as_ref()).await {
                        if e.is_fatal() {
                            return Err(e.into());
                        }
                    }
                    let report = self
                        .orchestrator
                        .readiness()
                        .await_settled(
                            driver.as_ref(),
                            &control,
                            &window,
                            self.orchestrator.readiness_budget(),
                        )
                        .await?;
                    let remarks = if report.is_settled() {
                        format!("Opened {} in window {}", url, window)
                    } else {
                        format!("Opened {} in window {}; page did not fully settle", url, window)
                    };
                    return Ok(StepOutcome::pass(remarks, url));
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    warn!(attempt, url = %url, "Navigation failed: {}", e);
                    last_error = Some(e);
                    if attempt < self.open_attempts {
                        control.sleep(self.open_retry).await?;
                    }
                }
            }
        }

        let kind = match last_error {
            Some(DriverError::Timeout(_)) => FailureKind::Timeout,
            _ => FailureKind::ActionRejected,
        };
        let reason = last_error.map(|e| e.to_string()).unwrap_or_default();
        Ok(StepOutcome::fail(
            kind,
            format!(
                "Could not open {} after {} attempt(s): {}",
                url, self.open_attempts, reason
            ),
        ))
    }

    async fn wait(
        &self,
        session: &mut RunSession,
        instruction: &Instruction,
    ) -> Result<StepOutcome, EngineError> {
        let value = if instruction.data.trim().is_empty() {
            instruction.target.as_str()
        } else {
            instruction.data.as_str()
        };
        let duration = match parse_wait(value) {
            Ok(duration) => duration,
            Err(e) => return Ok(StepOutcome::fail(FailureKind::ActionRejected, e)),
        };

        session.control.sleep(duration).await?;
        Ok(StepOutcome::pass(
            format!("Waited {} ms", duration.as_millis()),
            "",
        ))
    }

    async fn verify(
        &self,
        session: &mut RunSession,
        instruction: &Instruction,
    ) -> Result<StepOutcome, EngineError> {
        let expected = if instruction.data.trim().is_empty() {
            instruction.target.trim()
        } else {
            instruction.data.trim()
        };
        if expected.is_empty() {
            return Ok(StepOutcome::fail(FailureKind::NotFound, "VERIFY has no expected text"));
        }
        let needle = normalize(expected);

        let driver = session.driver.clone();
        let control = session.control.clone();
        let mut deadline = Deadline::after(self.verify_wait);
        let mut last_text = String::new();
        let mut last_error: Option<DriverError> = None;

        loop {
            deadline.extend(control.checkpoint().await?);

            let window = match session
                .tracker
                .switch_to_most_recent_active(driver.as_ref(), self.orchestrator.switch_settle())
                .await
            {
                Ok(Some(window)) => Some(window),
                Ok(None) => {
                    return Err(EngineError::NoWindow(
                        "every browser window is closed".to_string(),
                    ));
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    last_error = Some(e);
                    None
                }
            };

            if let Some(window) = window {
                match driver.page_text(&window).await {
                    Ok(text) if normalize(&text).contains(&needle) => {
                        return Ok(StepOutcome::pass(
                            format!("Found text '{}' in window {}", expected, window),
                            excerpt(&text),
                        ));
                    }
                    Ok(text) => last_text = text,
                    Err(e) if e.is_fatal() => return Err(e.into()),
                    Err(e) => last_error = Some(e),
                }
            }

            if deadline.expired() {
                break;
            }
            tokio::time::sleep(self.verify_poll.min(deadline.remaining())).await;
        }

        let remarks = match (last_text.is_empty(), last_error) {
            (true, Some(e)) => format!("Text '{}' not verified: {}", expected, e),
            _ => format!("Text '{}' not found on page", expected),
        };
        Ok(StepOutcome::fail(FailureKind::NotFound, remarks))
    }

    async fn element_step(
        &self,
        session: &mut RunSession,
        instruction: &Instruction,
    ) -> Result<StepOutcome, EngineError> {
        let target = instruction.target.trim();
        if target.is_empty() {
            return Ok(StepOutcome::fail(
                FailureKind::NotFound,
                format!("{} has no target", instruction.action),
            ));
        }
        let Some(action) = ElementAction::from_instruction(instruction) else {
            return Ok(StepOutcome::fail(
                FailureKind::ActionRejected,
                format!("{} does not act on an element", instruction.action),
            ));
        };

        match self.orchestrator.resolve(session, target, &action).await? {
            ResolveOutcome::Resolved(resolution) => {
                let output = match &action {
                    ElementAction::Fill(value) | ElementAction::Select(value) => value.clone(),
                    ElementAction::Click => resolution.context.describe(),
                };
                Ok(StepOutcome::pass(resolution.remarks(), output))
            }
            ResolveOutcome::Failed { kind, detail } => Ok(StepOutcome::fail(kind, detail)),
            ResolveOutcome::Stopped => Ok(StepOutcome::Stopped),
        }
    }

    /// Window the step's artifacts are taken from.
    async fn capture_window(&self, session: &RunSession) -> Option<WindowId> {
        match session.driver.current_window().await {
            Ok(Some(window)) => Some(window),
            Ok(None) => session.tracker.latest_open().cloned(),
            Err(_) => None,
        }
    }

    fn stop_remaining(&self, summary: &mut RunSummary, remaining: &[Instruction]) {
        info!(remaining = remaining.len(), "Run stopped by request");
        for instruction in remaining {
            summary.push(StepRecord::stopped(instruction));
        }
        self.publish(&summary.records);
    }

    fn publish(&self, records: &[StepRecord]) {
        for sink in &self.sinks {
            if let Err(e) = sink.publish(records) {
                warn!("Failed to publish results: {}", e);
            }
        }
    }
}

/// Parse a WAIT duration: plain milliseconds, `<n>ms`, or `<n>s`. Empty means one second.
pub fn parse_wait(value: &str) -> Result<Duration, String> {
    let value = value.trim().to_ascii_lowercase();
    if value.is_empty() {
        return Ok(DEFAULT_WAIT);
    }
    let invalid = || format!("Invalid wait duration '{}'", value);

    if let Some(ms) = value.strip_suffix("ms") {
        return ms.trim().parse::<u64>().map(Duration::from_millis).map_err(|_| invalid());
    }
    if let Some(secs) = value.strip_suffix('s') {
        let secs: f64 = secs.trim().parse().map_err(|_| invalid())?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(invalid());
        }
        return Ok(Duration::from_secs_f64(secs));
    }
    value.parse::<u64>().map(Duration::from_millis).map_err(|_| invalid())
}

fn excerpt(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= OUTPUT_EXCERPT {
        return flat;
    }
    let cut: String = flat.chars().take(OUTPUT_EXCERPT).collect();
    format!("{}...", cut)
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
