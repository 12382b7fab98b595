//! Engine errors.

use autoheal_protocols::DriverError;
use thiserror::Error;

/// Errors that end a run or fail an engine operation outright.
///
/// Per-step failures (not found, rejected, stale) are not errors: they are
/// recorded on the step's result and the run continues.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Driver failure that could not be absorbed.
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// No browser window can be obtained.
    #[error("No browser window available: {0}")]
    NoWindow(String),

    /// A stop was requested.
    #[error("Run stopped")]
    Stopped,

    /// A run is already in progress.
    #[error("A run is already in progress")]
    AlreadyRunning,

    /// Instruction source could not be read or parsed.
    #[error("Invalid instruction source {path}: {message}")]
    Source { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Whether the browser session is unusable.
    pub fn is_fatal(&self) -> bool {
        match self {
            EngineError::Driver(e) => e.is_fatal(),
            EngineError::NoWindow(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let err = EngineError::from(DriverError::Disconnected("gone".to_string()));
        assert!(err.is_fatal());
        assert!(EngineError::NoWindow("all closed".to_string()).is_fatal());
        assert!(!EngineError::Stopped.is_fatal());
        assert!(!EngineError::from(DriverError::Timeout("t".to_string())).is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = EngineError::Source {
            path: "steps.json".to_string(),
            message: "expected array".to_string(),
        };
        assert!(err.to_string().contains("steps.json"));
        assert!(err.to_string().contains("expected array"));
        assert_eq!(EngineError::Stopped.to_string(), "Run stopped");
    }
}
