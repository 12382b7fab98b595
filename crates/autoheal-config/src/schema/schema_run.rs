//! Run control and artifact configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::default_true;

/// Step controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Polling interval of the pause loop.
    #[serde(default = "default_pause_poll")]
    pub pause_poll_ms: u64,

    /// Navigation attempts for an OPEN step.
    #[serde(default = "default_open_attempts")]
    pub open_attempts: u32,

    /// Delay inserted between consecutive steps.
    #[serde(default)]
    pub step_delay_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            pause_poll_ms: default_pause_poll(),
            open_attempts: default_open_attempts(),
            step_delay_ms: 0,
        }
    }
}

impl RunConfig {
    pub fn pause_poll(&self) -> Duration {
        Duration::from_millis(self.pause_poll_ms)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

fn default_pause_poll() -> u64 {
    500
}

fn default_open_attempts() -> u32 {
    3
}

/// Screenshot and page-source capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Parent directory; each run writes into a timestamped subdirectory.
    #[serde(default = "default_artifacts_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_true")]
    pub screenshots: bool,

    #[serde(default = "default_true")]
    pub page_source: bool,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: default_artifacts_dir(),
            screenshots: true,
            page_source: true,
        }
    }
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("./artifacts")
}
