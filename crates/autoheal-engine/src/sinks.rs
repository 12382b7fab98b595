//! Result sinks.
//!
//! Every sink receives the full list of records after each step, so results
//! recorded before a fatal abort are never lost.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use autoheal_protocols::StepRecord;
use parking_lot::RwLock;

use crate::error::EngineError;

/// Receives step results as a run progresses.
pub trait ResultSink: Send + Sync {
    /// Replace the published results with `records`.
    fn publish(&self, records: &[StepRecord]) -> Result<(), EngineError>;
}

/// Pretty-printed JSON results file, rewritten after every step.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for JsonFileSink {
    fn publish(&self, records: &[StepRecord]) -> Result<(), EngineError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(records)?;
        // Write-then-rename so readers never see a half-written file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory results shared with the control surface.
#[derive(Clone, Default)]
pub struct SharedResults {
    inner: Arc<RwLock<Vec<StepRecord>>>,
}

impl SharedResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<StepRecord> {
        self.inner.read().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl ResultSink for SharedResults {
    fn publish(&self, records: &[StepRecord]) -> Result<(), EngineError> {
        *self.inner.write() = records.to_vec();
        Ok(())
    }
}
