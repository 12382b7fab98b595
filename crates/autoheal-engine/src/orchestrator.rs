//! Resolution Orchestrator.
//!
//! Runs the priority search for one element step: overlays of the active
//! window, its main document then each frame then each shadow root, a deep scan of
//! the active window, then every other open window by recency. The whole
//! chain is repeated with a dynamic-content wait in between, up to the
//! configured attempt count.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use autoheal_config::Config;
use autoheal_protocols::{
    Action, BrowserDriver, DriverError, FailureKind, NodeHandle, NodeRef, WindowId,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::context::{ContextEnumerator, SearchContext, aborts_walk};
use crate::error::EngineError;
use crate::executor::{ActionExecutor, ActionOutcome, ElementAction, Technique};
use crate::matcher::{Candidate, ElementMatcher, MatchRank, rank_candidates};
use crate::readiness::ReadinessGate;
use crate::session::{Deadline, RunControl, RunSession};

/// One stage of the per-attempt search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPhase {
    ActiveOverlays,
    ActiveDocument,
    DeepScan,
    OtherWindows,
}

impl SearchPhase {
    pub fn name(&self) -> &'static str {
        match self {
            SearchPhase::ActiveOverlays => "active overlays",
            SearchPhase::ActiveDocument => "active document",
            SearchPhase::DeepScan => "deep scan",
            SearchPhase::OtherWindows => "other windows",
        }
    }
}

impl fmt::Display for SearchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Phases of one attempt. Other windows are only searched when there are any.
pub fn plan_phases(open_windows: usize) -> Vec<SearchPhase> {
    let mut phases = vec![
        SearchPhase::ActiveOverlays,
        SearchPhase::ActiveDocument,
        SearchPhase::DeepScan,
    ];
    if open_windows > 1 {
        phases.push(SearchPhase::OtherWindows);
    }
    phases
}

/// Per-step resolution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Searching,
    Found,
    Acting,
    Done,
    Exhausted,
    Failed,
}

/// Where and how an element action succeeded.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub action: Action,
    pub target: String,
    pub phase: SearchPhase,
    pub context: SearchContext,
    pub handle: NodeHandle,
    pub rank: MatchRank,
    pub technique: Technique,
    pub attempt: u32,
}

impl Resolution {
    pub fn window(&self) -> &WindowId {
        self.context.window()
    }

    /// Remark naming where the element was found and how it was acted on.
    pub fn remarks(&self) -> String {
        let verb = match self.action {
            Action::Fill => "Filled",
            Action::Select => "Selected",
            _ => "Clicked",
        };
        let mut location = self.context.describe();
        if self.context.is_shadow() && !self.context.frame_path().is_main() {
            location = format!("{} in {}", location, self.context.frame_path());
        }
        format!(
            "{} '{}' in {} of window {}; phase: {}; match: {}; technique: {}; attempt {}",
            verb,
            self.target,
            location,
            self.window(),
            self.phase,
            self.rank.name(),
            self.technique,
            self.attempt
        )
    }
}

/// Outcome of resolving one element step.
#[derive(Debug, Clone)]
pub enum ResolveOutcome {
    Resolved(Resolution),
    Failed { kind: FailureKind, detail: String },
    Stopped,
}

enum PhaseResult {
    Resolved(Resolution),
    /// A window or node vanished; resynchronise before searching again.
    Stale,
    Nothing,
}

/// Everything observed while resolving one step.
struct Trace {
    state: ResolutionState,
    attempt: u32,
    tried: HashSet<NodeRef>,
    matched: usize,
    stale: Option<String>,
    rejection: Option<DriverError>,
    settled_once: bool,
}

impl Trace {
    fn new() -> Self {
        Self {
            state: ResolutionState::Searching,
            attempt: 0,
            tried: HashSet::new(),
            matched: 0,
            stale: None,
            rejection: None,
            settled_once: false,
        }
    }

    fn enter(&mut self, next: ResolutionState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, attempt = self.attempt, "Resolution state");
            self.state = next;
        }
    }

    /// Failure classification once every attempt is spent.
    fn classify(&self, target: &str) -> (FailureKind, String) {
        if let Some(stale) = &self.stale {
            return (
                FailureKind::Stale,
                format!("Target '{}' went stale mid-action: {}", target, stale),
            );
        }
        if let Some(rejection) = &self.rejection {
            let kind = match rejection {
                DriverError::Timeout(_) => FailureKind::Timeout,
                _ => FailureKind::ActionRejected,
            };
            return (
                kind,
                format!(
                    "Every technique failed on {} candidate(s) for '{}': {}",
                    self.matched, target, rejection
                ),
            );
        }
        let mut detail = format!("Element '{}' not found after {} attempt(s)", target, self.attempt);
        if !self.settled_once {
            detail.push_str("; page never settled");
        }
        (FailureKind::NotFound, detail)
    }
}

/// Borrowed inputs of one step's search.
struct StepSearch<'a> {
    driver: &'a dyn BrowserDriver,
    control: &'a RunControl,
    matcher: &'a ElementMatcher,
    target: &'a str,
    action: &'a ElementAction,
}

/// Composes enumeration, readiness, matching and execution into the priority search.
#[derive(Debug, Clone)]
pub struct ResolutionOrchestrator {
    enumerator: ContextEnumerator,
    executor: ActionExecutor,
    readiness: ReadinessGate,
    max_attempts: u32,
    dynamic_wait: Duration,
    poll: Duration,
    readiness_budget: Duration,
    switch_settle: Duration,
    deep_scan_limit: usize,
}

impl ResolutionOrchestrator {
    pub fn from_config(config: &Config) -> Self {
        Self {
            enumerator: ContextEnumerator::from_config(&config.resolution),
            executor: ActionExecutor::from_config(&config.resolution),
            readiness: ReadinessGate::from_config(config),
            max_attempts: config.resolution.max_attempts.max(1),
            dynamic_wait: config.resolution.dynamic_wait(),
            poll: config.resolution.poll_interval(),
            readiness_budget: config.readiness.budget(),
            switch_settle: config.readiness.sub_timeout(),
            deep_scan_limit: config.resolution.deep_scan_limit,
        }
    }

    pub fn readiness(&self) -> &ReadinessGate {
        &self.readiness
    }

    pub fn readiness_budget(&self) -> Duration {
        self.readiness_budget
    }

    pub fn switch_settle(&self) -> Duration {
        self.switch_settle
    }

    /// Find `target` and perform `action` on it.
    ///
    /// Per-step failures come back as [`ResolveOutcome::Failed`]; only a
    /// fatal browser failure is an `Err`.
    pub async fn resolve(
        &self,
        session: &mut RunSession,
        target: &str,
        action: &ElementAction,
    ) -> Result<ResolveOutcome, EngineError> {
        match self.run(session, target, action).await {
            Err(EngineError::Stopped) => {
                info!(target, "Resolution stopped by request");
                Ok(ResolveOutcome::Stopped)
            }
            other => other,
        }
    }

    async fn run(
        &self,
        session: &mut RunSession,
        target: &str,
        action: &ElementAction,
    ) -> Result<ResolveOutcome, EngineError> {
        let driver = session.driver.clone();
        let control = session.control.clone();
        let matcher = ElementMatcher::new(target, action.action());
        let search = StepSearch {
            driver: driver.as_ref(),
            control: &control,
            matcher: &matcher,
            target,
            action,
        };
        let mut trace = Trace::new();

        for attempt in 1..=self.max_attempts {
            trace.attempt = attempt;
            trace.tried.clear();
            trace.enter(ResolutionState::Searching);
            control.checkpoint().await?;

            let active = match session
                .tracker
                .switch_to_most_recent_active(search.driver, self.switch_settle)
                .await
            {
                Ok(Some(window)) => window,
                Ok(None) => {
                    return Err(EngineError::NoWindow(
                        "every browser window is closed".to_string(),
                    ));
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    debug!(attempt, "Window switch failed: {}", e);
                    trace.stale.get_or_insert_with(|| e.to_string());
                    continue;
                }
            };

            let report = self
                .readiness
                .await_settled(search.driver, &control, &active, self.readiness_budget)
                .await?;
            trace.settled_once |= report.is_settled();

            debug!(target, window = %active, attempt, "Searching");
            let open = session.tracker.active_windows().len();
            let mut stale = false;
            for phase in plan_phases(open) {
                match self.run_phase(&search, session, phase, &active, &mut trace).await? {
                    PhaseResult::Resolved(resolution) => {
                        trace.enter(ResolutionState::Done);
                        info!(target, "{}", resolution.remarks());
                        return Ok(ResolveOutcome::Resolved(resolution));
                    }
                    PhaseResult::Stale => {
                        stale = true;
                        break;
                    }
                    PhaseResult::Nothing => {}
                }
            }

            trace.enter(ResolutionState::Exhausted);
            if stale || attempt == self.max_attempts {
                continue;
            }
            self.wait_for_candidate(&search, &active).await?;
        }

        trace.enter(ResolutionState::Failed);
        let (kind, detail) = trace.classify(target);
        warn!(target, %kind, "{}", detail);
        Ok(ResolveOutcome::Failed { kind, detail })
    }

    async fn run_phase(
        &self,
        search: &StepSearch<'_>,
        session: &RunSession,
        phase: SearchPhase,
        active: &WindowId,
        trace: &mut Trace,
    ) -> Result<PhaseResult, EngineError> {
        let driver = search.driver;

        match phase {
            SearchPhase::ActiveOverlays => {
                let contexts = match self.enumerator.overlays(driver, active).await {
                    Ok(contexts) => contexts,
                    Err(e) => return stale_or_fatal(e, trace),
                };
                self.search_contexts(search, phase, &contexts, trace).await
            }
            SearchPhase::ActiveDocument => {
                // Frames are only listed once the main document has nothing
                // actionable, and shadow roots only after every frame.
                let main = [SearchContext::document(active.clone())];
                match self.search_in_order(search, phase, &main, trace).await? {
                    PhaseResult::Nothing => {}
                    other => return Ok(other),
                }
                let frames = match self.enumerator.frames(driver, active).await {
                    Ok(frames) => frames,
                    Err(e) => return stale_or_fatal(e, trace),
                };
                match self.search_in_order(search, phase, &frames, trace).await? {
                    PhaseResult::Nothing => {}
                    other => return Ok(other),
                }
                let shadows = match self.enumerator.shadows(driver, active).await {
                    Ok(shadows) => shadows,
                    Err(e) => return stale_or_fatal(e, trace),
                };
                self.search_in_order(search, phase, &shadows, trace).await
            }
            SearchPhase::DeepScan => {
                let nodes = match driver
                    .deep_scan(active, search.matcher.needle(), self.deep_scan_limit)
                    .await
                {
                    Ok(nodes) => nodes,
                    Err(e) if aborts_walk(&e) => return stale_or_fatal(e, trace),
                    Err(e) => {
                        debug!(window = %active, "Deep scan failed: {}", e);
                        return Ok(PhaseResult::Nothing);
                    }
                };
                let context = SearchContext::document(active.clone());
                let mut candidates = search.matcher.clone().relaxed().matches(&context, 0, nodes);
                rank_candidates(&mut candidates, search.matcher.action());
                self.try_candidates(search, phase, candidates, trace).await
            }
            SearchPhase::OtherWindows => {
                for window in session.tracker.search_order(Some(active)) {
                    search.control.checkpoint().await?;
                    let contexts = match self.enumerator.enumerate(driver, &window).await {
                        Ok(contexts) => contexts,
                        Err(e) if e.is_fatal() => return Err(e.into()),
                        Err(e) => {
                            debug!(window = %window, "Skipping window: {}", e);
                            continue;
                        }
                    };
                    for (index, context) in contexts.iter().enumerate() {
                        let candidates = match self.candidates_in(search, context, index).await {
                            Ok(candidates) => candidates,
                            Err(e) if e.is_fatal() => return Err(e.into()),
                            Err(e) => {
                                debug!(window = %window, "Window went away mid-search: {}", e);
                                break;
                            }
                        };
                        if candidates.is_empty() {
                            continue;
                        }

                        debug!(
                            window = %window,
                            context = %context.describe(),
                            count = candidates.len(),
                            "Candidates in other window"
                        );
                        if let Err(e) = driver.focus_window(&window).await {
                            if e.is_fatal() {
                                return Err(e.into());
                            }
                            break;
                        }
                        match self.try_candidates(search, phase, candidates, trace).await? {
                            PhaseResult::Nothing => {}
                            other => return Ok(other),
                        }
                    }
                }

                // Nothing acted on: hand focus back to the active window.
                if let Err(e) = driver.focus_window(active).await {
                    if e.is_fatal() {
                        return Err(e.into());
                    }
                }
                Ok(PhaseResult::Nothing)
            }
        }
    }

    /// Candidates of every context, ranked and deduplicated.
    async fn collect(
        &self,
        search: &StepSearch<'_>,
        contexts: &[SearchContext],
    ) -> Result<Vec<Candidate>, DriverError> {
        let mut candidates = Vec::new();
        for (index, context) in contexts.iter().enumerate() {
            candidates.extend(
                search
                    .matcher
                    .match_context(search.driver, context, index)
                    .await?,
            );
        }
        rank_candidates(&mut candidates, search.matcher.action());
        Ok(candidates)
    }

    async fn search_contexts(
        &self,
        search: &StepSearch<'_>,
        phase: SearchPhase,
        contexts: &[SearchContext],
        trace: &mut Trace,
    ) -> Result<PhaseResult, EngineError> {
        if contexts.is_empty() {
            return Ok(PhaseResult::Nothing);
        }
        let candidates = match self.collect(search, contexts).await {
            Ok(candidates) => candidates,
            Err(e) => return stale_or_fatal(e, trace),
        };
        debug!(%phase, contexts = contexts.len(), candidates = candidates.len(), "Phase searched");
        self.try_candidates(search, phase, candidates, trace).await
    }

    /// Search `contexts` one at a time, moving on only when a context has
    /// nothing that accepts the action.
    async fn search_in_order(
        &self,
        search: &StepSearch<'_>,
        phase: SearchPhase,
        contexts: &[SearchContext],
        trace: &mut Trace,
    ) -> Result<PhaseResult, EngineError> {
        for (index, context) in contexts.iter().enumerate() {
            search.control.checkpoint().await?;
            let candidates = match self.candidates_in(search, context, index).await {
                Ok(candidates) => candidates,
                Err(e) => return stale_or_fatal(e, trace),
            };
            debug!(%phase, context = %context.describe(), candidates = candidates.len(), "Context searched");
            match self.try_candidates(search, phase, candidates, trace).await? {
                PhaseResult::Nothing => {}
                other => return Ok(other),
            }
        }
        Ok(PhaseResult::Nothing)
    }

    /// Ranked candidates of a single context.
    async fn candidates_in(
        &self,
        search: &StepSearch<'_>,
        context: &SearchContext,
        index: usize,
    ) -> Result<Vec<Candidate>, DriverError> {
        let mut candidates = search
            .matcher
            .match_context(search.driver, context, index)
            .await?;
        rank_candidates(&mut candidates, search.matcher.action());
        Ok(candidates)
    }

    /// Act on candidates best first until one accepts the action.
    async fn try_candidates(
        &self,
        search: &StepSearch<'_>,
        phase: SearchPhase,
        candidates: Vec<Candidate>,
        trace: &mut Trace,
    ) -> Result<PhaseResult, EngineError> {
        for candidate in candidates {
            let node = candidate.node_ref();
            if !trace.tried.insert(node.clone()) {
                continue;
            }
            search.control.checkpoint().await?;
            trace.matched += 1;
            trace.enter(ResolutionState::Found);
            debug!(
                %phase,
                node = %node.handle,
                context = %candidate.context.describe(),
                rank = candidate.rank.name(),
                "Candidate found"
            );

            trace.enter(ResolutionState::Acting);
            match self.executor.perform(search.driver, &node, search.action).await? {
                ActionOutcome::Done(technique) => {
                    return Ok(PhaseResult::Resolved(Resolution {
                        action: search.action.action(),
                        target: search.target.to_string(),
                        phase,
                        context: candidate.context,
                        handle: candidate.node.handle,
                        rank: candidate.rank,
                        technique,
                        attempt: trace.attempt,
                    }));
                }
                ActionOutcome::Rejected(e) => {
                    debug!(node = %node.handle, "Candidate rejected every technique");
                    trace.rejection = Some(e);
                }
                ActionOutcome::Stale(e) => {
                    trace.stale = Some(e.to_string());
                    return Ok(PhaseResult::Stale);
                }
            }
        }
        Ok(PhaseResult::Nothing)
    }

    /// Poll for a matching candidate to appear in `window`, bounded by the dynamic wait.
    async fn wait_for_candidate(
        &self,
        search: &StepSearch<'_>,
        window: &WindowId,
    ) -> Result<bool, EngineError> {
        let relaxed = search.matcher.clone().relaxed();
        let context = SearchContext::document(window.clone());
        let mut deadline = Deadline::after(self.dynamic_wait);

        loop {
            let held = search.control.checkpoint().await?;
            deadline.extend(held);

            match search
                .driver
                .deep_scan(window, search.matcher.needle(), self.deep_scan_limit)
                .await
            {
                Ok(nodes) => {
                    if !relaxed.matches(&context, 0, nodes).is_empty() {
                        debug!(window = %window, "Candidate appeared");
                        return Ok(true);
                    }
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    debug!(window = %window, "Dynamic wait ended early: {}", e);
                    return Ok(false);
                }
            }

            if deadline.expired() {
                return Ok(false);
            }
            tokio::time::sleep(self.poll.min(deadline.remaining())).await;
        }
    }
}

fn stale_or_fatal(e: DriverError, trace: &mut Trace) -> Result<PhaseResult, EngineError> {
    if e.is_fatal() {
        return Err(e.into());
    }
    debug!("Active window unusable: {}", e);
    trace.stale = Some(e.to_string());
    Ok(PhaseResult::Stale)
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
