//! Instruction and result record types.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Action requested by one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Action {
    Open,
    Click,
    Fill,
    Select,
    Wait,
    Verify,
    Screenshot,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Open => "OPEN",
            Action::Click => "CLICK",
            Action::Fill => "FILL",
            Action::Select => "SELECT",
            Action::Wait => "WAIT",
            Action::Verify => "VERIFY",
            Action::Screenshot => "SCREENSHOT",
        }
    }

    /// Whether the action targets an element that must be resolved.
    pub fn needs_element(&self) -> bool {
        matches!(self, Action::Click | Action::Fill | Action::Select)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPEN" | "NAVIGATE" => Ok(Action::Open),
            "CLICK" => Ok(Action::Click),
            "FILL" | "TYPE" => Ok(Action::Fill),
            "SELECT" => Ok(Action::Select),
            "WAIT" => Ok(Action::Wait),
            "VERIFY" => Ok(Action::Verify),
            "SCREENSHOT" => Ok(Action::Screenshot),
            other => Err(format!("unknown action '{}'", other)),
        }
    }
}

impl TryFrom<String> for Action {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.as_str().to_string()
    }
}

/// Step labels arrive as numbers or strings depending on the source.
fn step_label<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Label {
        Int(i64),
        Float(f64),
        Text(String),
    }

    Ok(match Label::deserialize(deserializer)? {
        Label::Int(n) => n.to_string(),
        Label::Float(n) if n.fract() == 0.0 => format!("{}", n as i64),
        Label::Float(n) => n.to_string(),
        Label::Text(s) => s,
    })
}

/// One scripted step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    #[serde(alias = "Step", default, deserialize_with = "step_label")]
    pub step: String,
    #[serde(alias = "Action")]
    pub action: Action,
    #[serde(alias = "Target", default)]
    pub target: String,
    #[serde(alias = "Data", alias = "Value", alias = "value", default)]
    pub data: String,
    #[serde(alias = "Execute", default, skip_serializing_if = "Option::is_none")]
    pub execute: Option<String>,
}

impl Instruction {
    pub fn new(step: impl Into<String>, action: Action, target: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            action,
            target: target.into(),
            data: String::new(),
            execute: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = data.into();
        self
    }

    pub fn with_execute(mut self, flag: impl Into<String>) -> Self {
        self.execute = Some(flag.into());
        self
    }

    /// Whether the execute flag is affirmative. Absent or empty means run.
    pub fn should_execute(&self) -> bool {
        match self.execute.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(flag) => matches!(
                flag.to_ascii_lowercase().as_str(),
                "y" | "yes" | "true" | "1" | "x" | "run"
            ),
        }
    }
}

/// Outcome status of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepStatus {
    Pass,
    Fail,
    Skipped,
    Stopped,
}

impl StepStatus {
    /// Whether the record must carry screenshot and page-source artifacts.
    pub fn requires_artifacts(&self) -> bool {
        matches!(self, StepStatus::Pass | StepStatus::Fail)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepStatus::Pass => "PASS",
            StepStatus::Fail => "FAIL",
            StepStatus::Skipped => "SKIPPED",
            StepStatus::Stopped => "STOPPED",
        };
        f.write_str(s)
    }
}

/// Classification carried on failed steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// No candidate survived matching after the full search and all retries.
    NotFound,
    /// A window or node disappeared mid-step.
    Stale,
    /// Every technique failed on every matched candidate.
    ActionRejected,
    /// A wait budget elapsed.
    Timeout,
    /// The browser session is unusable.
    Fatal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::NotFound => "NotFound",
            FailureKind::Stale => "Stale",
            FailureKind::ActionRejected => "ActionRejected",
            FailureKind::Timeout => "Timeout",
            FailureKind::Fatal => "Fatal",
        };
        f.write_str(s)
    }
}

/// Recorded result of one instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StepRecord {
    pub step: String,
    pub action: Action,
    pub target: String,
    pub status: StepStatus,
    pub remarks: String,
    #[serde(default)]
    pub actual_output: String,
    #[serde(default)]
    pub screenshot: Option<PathBuf>,
    #[serde(default)]
    pub page_source: Option<PathBuf>,
    #[serde(default)]
    pub failure: Option<FailureKind>,
    #[serde(default)]
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
}

impl StepRecord {
    pub fn new(instruction: &Instruction, status: StepStatus, remarks: impl Into<String>) -> Self {
        Self {
            step: instruction.step.clone(),
            action: instruction.action,
            target: instruction.target.clone(),
            status,
            remarks: remarks.into(),
            actual_output: String::new(),
            screenshot: None,
            page_source: None,
            failure: None,
            duration_ms: 0,
            started_at: Utc::now(),
        }
    }

    pub fn pass(instruction: &Instruction, remarks: impl Into<String>) -> Self {
        Self::new(instruction, StepStatus::Pass, remarks)
    }

    pub fn fail(instruction: &Instruction, kind: FailureKind, remarks: impl Into<String>) -> Self {
        let mut record = Self::new(instruction, StepStatus::Fail, remarks);
        record.failure = Some(kind);
        record
    }

    pub fn skipped(instruction: &Instruction) -> Self {
        Self::new(instruction, StepStatus::Skipped, "Execute flag not set")
    }

    pub fn stopped(instruction: &Instruction) -> Self {
        Self::new(instruction, StepStatus::Stopped, "Run stopped by request")
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.actual_output = output.into();
        self
    }

    pub fn with_artifacts(mut self, screenshot: PathBuf, page_source: PathBuf) -> Self {
        self.screenshot = Some(screenshot);
        self.page_source = Some(page_source);
        self
    }

    pub fn is_pass(&self) -> bool {
        self.status == StepStatus::Pass
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
