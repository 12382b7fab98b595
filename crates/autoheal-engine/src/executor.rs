//! Action Executor.
//!
//! Performs one element action through an ordered chain of interaction
//! techniques, stopping at the first that succeeds. A rejected technique
//! only moves the chain on; stale and fatal driver errors end it.

use std::fmt;
use std::time::Duration;

use autoheal_config::ResolutionConfig;
use autoheal_protocols::{Action, BrowserDriver, DriverError, Instruction, NodeRef, NodeScript};
use serde::Serialize;
use tracing::{debug, warn};

/// One way of performing an action on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Technique {
    /// The driver's own click/fill/select with its actionability checks.
    Standard,
    /// The same call with actionability checks bypassed.
    Forced,
    /// Set state in the node's own context and synthesize the events.
    DirectMutation,
    /// Dispatch a bubbling pointer or input event sequence only.
    EventDispatch,
}

/// The fallback chain, in the order it is tried.
pub const TECHNIQUES: [Technique; 4] = [
    Technique::Standard,
    Technique::Forced,
    Technique::DirectMutation,
    Technique::EventDispatch,
];

impl Technique {
    pub fn name(&self) -> &'static str {
        match self {
            Technique::Standard => "standard",
            Technique::Forced => "forced",
            Technique::DirectMutation => "direct mutation",
            Technique::EventDispatch => "event dispatch",
        }
    }
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An action that targets a resolved element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementAction {
    Click,
    Fill(String),
    Select(String),
}

impl ElementAction {
    /// The element action an instruction asks for, if it asks for one.
    pub fn from_instruction(instruction: &Instruction) -> Option<Self> {
        match instruction.action {
            Action::Click => Some(ElementAction::Click),
            Action::Fill => Some(ElementAction::Fill(instruction.data.clone())),
            Action::Select => Some(ElementAction::Select(instruction.data.clone())),
            _ => None,
        }
    }

    pub fn action(&self) -> Action {
        match self {
            ElementAction::Click => Action::Click,
            ElementAction::Fill(_) => Action::Fill,
            ElementAction::Select(_) => Action::Select,
        }
    }
}

/// Result of running the chain against one node.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The technique that succeeded.
    Done(Technique),
    /// Every technique failed; carries the last rejection.
    Rejected(DriverError),
    /// The node or its window went away mid-action.
    Stale(DriverError),
}

/// Runs [`TECHNIQUES`] against a node.
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    settle_delay: Duration,
}

impl ActionExecutor {
    pub fn new(settle_delay: Duration) -> Self {
        Self { settle_delay }
    }

    pub fn from_config(config: &ResolutionConfig) -> Self {
        Self::new(config.settle_delay())
    }

    /// Perform `action` on `node`.
    ///
    /// Only a fatal driver error is returned as `Err`.
    pub async fn perform(
        &self,
        driver: &dyn BrowserDriver,
        node: &NodeRef,
        action: &ElementAction,
    ) -> Result<ActionOutcome, DriverError> {
        let mut last_rejection = DriverError::NotActionable(format!("{} untouched", node.handle));

        for technique in TECHNIQUES {
            match attempt(driver, node, action, technique).await {
                Ok(()) => {
                    debug!(
                        node = %node.handle,
                        window = %node.window,
                        %technique,
                        "{} succeeded",
                        action.action()
                    );
                    if !self.settle_delay.is_zero() {
                        tokio::time::sleep(self.settle_delay).await;
                    }
                    return Ok(ActionOutcome::Done(technique));
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) if e.is_stale() => {
                    debug!(node = %node.handle, %technique, "Node went stale: {}", e);
                    return Ok(ActionOutcome::Stale(e));
                }
                Err(e) => {
                    warn!(node = %node.handle, %technique, "Technique failed: {}", e);
                    last_rejection = e;
                }
            }
        }

        Ok(ActionOutcome::Rejected(last_rejection))
    }
}

async fn attempt(
    driver: &dyn BrowserDriver,
    node: &NodeRef,
    action: &ElementAction,
    technique: Technique,
) -> Result<(), DriverError> {
    match (technique, action) {
        (Technique::Standard, ElementAction::Click) => driver.click(node, false).await,
        (Technique::Forced, ElementAction::Click) => driver.click(node, true).await,
        (Technique::Standard, ElementAction::Fill(v)) => driver.fill(node, v, false).await,
        (Technique::Forced, ElementAction::Fill(v)) => driver.fill(node, v, true).await,
        (Technique::Standard, ElementAction::Select(v)) => {
            driver.select_option(node, v, false).await
        }
        (Technique::Forced, ElementAction::Select(v)) => driver.select_option(node, v, true).await,
        (Technique::DirectMutation, _) | (Technique::EventDispatch, _) => {
            driver
                .run_node_script(node, node_script(technique, action))
                .await
        }
    }
}

/// Script used by the in-page techniques.
pub fn node_script(technique: Technique, action: &ElementAction) -> NodeScript {
    match (technique, action) {
        (Technique::EventDispatch, ElementAction::Click) => NodeScript::PointerSequence,
        (_, ElementAction::Click) => NodeScript::SyntheticClick,
        (Technique::EventDispatch, ElementAction::Fill(v) | ElementAction::Select(v)) => {
            NodeScript::DispatchInput(v.clone())
        }
        (_, ElementAction::Fill(v)) => NodeScript::SetValueWithEvents(v.clone()),
        (_, ElementAction::Select(v)) => NodeScript::SelectWithEvents(v.clone()),
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
