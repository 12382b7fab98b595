//! Browser connection, element resolution and readiness configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do with JavaScript dialogs raised by a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogPolicy {
    #[default]
    Accept,
    Dismiss,
    /// Leave the dialog open; it is still logged.
    Ignore,
}

/// Browser connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Remote debugging HTTP endpoint of a running browser.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub dialogs: DialogPolicy,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            request_timeout_secs: default_request_timeout(),
            dialogs: DialogPolicy::default(),
        }
    }
}

impl BrowserConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_endpoint() -> String {
    "http://localhost:9222".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

/// Element resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Full search passes per click/fill/select step.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Budget for polling dynamically created content between passes.
    #[serde(default = "default_dynamic_wait")]
    pub dynamic_wait_ms: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_max_frames")]
    pub max_frames: usize,

    #[serde(default = "default_max_shadow_depth")]
    pub max_shadow_depth: usize,

    /// Pause after a successful action so page handlers can react.
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Node cap for the structure-agnostic deep scan.
    #[serde(default = "default_deep_scan_limit")]
    pub deep_scan_limit: usize,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            dynamic_wait_ms: default_dynamic_wait(),
            poll_interval_ms: default_poll_interval(),
            max_frames: default_max_frames(),
            max_shadow_depth: default_max_shadow_depth(),
            settle_delay_ms: default_settle_delay(),
            deep_scan_limit: default_deep_scan_limit(),
        }
    }
}

impl ResolutionConfig {
    pub fn dynamic_wait(&self) -> Duration {
        Duration::from_millis(self.dynamic_wait_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_dynamic_wait() -> u64 {
    3000
}

fn default_poll_interval() -> u64 {
    250
}

fn default_max_frames() -> usize {
    15
}

fn default_max_shadow_depth() -> usize {
    5
}

fn default_settle_delay() -> u64 {
    300
}

fn default_deep_scan_limit() -> usize {
    4000
}

/// Readiness gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessConfig {
    /// Overall budget for one settle wait.
    #[serde(default = "default_budget")]
    pub budget_ms: u64,

    /// Budget for each sub-wait (network, frames, indicators, document).
    #[serde(default = "default_sub_timeout")]
    pub sub_timeout_ms: u64,

    #[serde(default = "default_readiness_poll")]
    pub poll_interval_ms: u64,

    /// Selectors of loading indicators that must disappear.
    #[serde(default = "default_loading_selectors")]
    pub loading_selectors: Vec<String>,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            budget_ms: default_budget(),
            sub_timeout_ms: default_sub_timeout(),
            poll_interval_ms: default_readiness_poll(),
            loading_selectors: default_loading_selectors(),
        }
    }
}

impl ReadinessConfig {
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }

    pub fn sub_timeout(&self) -> Duration {
        Duration::from_millis(self.sub_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_budget() -> u64 {
    10_000
}

fn default_sub_timeout() -> u64 {
    3000
}

fn default_readiness_poll() -> u64 {
    200
}

fn default_loading_selectors() -> Vec<String> {
    [
        ".loading",
        ".spinner",
        ".loader",
        "[aria-busy='true']",
        "[id*='loading']",
        ".progress-bar",
        "[role='progressbar']",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
