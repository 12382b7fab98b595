//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Convert the first error into a [`ConfigError`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(ConfigError::InvalidValue {
                field: err.path,
                message: err.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_browser(config, &mut result);
        Self::validate_resolution(config, &mut result);
        Self::validate_readiness(config, &mut result);
        Self::validate_run(config, &mut result);
        Self::validate_server(config, &mut result);

        Ok(result)
    }

    fn validate_browser(config: &Config, result: &mut ValidationResult) {
        let endpoint = &config.browser.endpoint;
        let valid_scheme = ["http://", "https://", "ws://", "wss://"]
            .iter()
            .any(|scheme| endpoint.starts_with(scheme));
        if !valid_scheme || endpoint.len() <= "http://".len() {
            result.add_error(ValidationError::new(
                "browser.endpoint",
                "endpoint must be an http(s):// or ws(s):// URL",
            ));
        }

        if config.browser.request_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "browser.request_timeout_secs",
                "request_timeout_secs must be greater than 0",
            ));
        }
    }

    fn validate_resolution(config: &Config, result: &mut ValidationResult) {
        let res = &config.resolution;

        if res.max_attempts == 0 {
            result.add_error(ValidationError::new(
                "resolution.max_attempts",
                "max_attempts must be greater than 0",
            ));
        }

        if res.poll_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "resolution.poll_interval_ms",
                "poll_interval_ms must be greater than 0",
            ));
        }

        if res.max_frames == 0 {
            result.add_error(ValidationError::new(
                "resolution.max_frames",
                "max_frames must be greater than 0",
            ));
        } else if res.max_frames > 15 {
            result.add_warning(ValidationWarning::new(
                "resolution.max_frames",
                format!(
                    "max_frames is {} (>15), searching pathological pages may be slow",
                    res.max_frames
                ),
            ));
        }

        if res.max_shadow_depth > 5 {
            result.add_warning(ValidationWarning::new(
                "resolution.max_shadow_depth",
                format!("max_shadow_depth is {} (>5)", res.max_shadow_depth),
            ));
        }
    }

    fn validate_readiness(config: &Config, result: &mut ValidationResult) {
        let readiness = &config.readiness;

        if readiness.poll_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "readiness.poll_interval_ms",
                "poll_interval_ms must be greater than 0",
            ));
        }

        if readiness.sub_timeout_ms > readiness.budget_ms {
            result.add_warning(ValidationWarning::new(
                "readiness.sub_timeout_ms",
                "sub_timeout_ms exceeds budget_ms, sub-waits will be cut short by the budget",
            ));
        }
    }

    fn validate_run(config: &Config, result: &mut ValidationResult) {
        if config.run.pause_poll_ms == 0 {
            result.add_error(ValidationError::new(
                "run.pause_poll_ms",
                "pause_poll_ms must be greater than 0",
            ));
        }

        if config.run.open_attempts == 0 {
            result.add_error(ValidationError::new(
                "run.open_attempts",
                "open_attempts must be greater than 0",
            ));
        }
    }

    fn validate_server(config: &Config, result: &mut ValidationResult) {
        if config.server.port == 0 {
            result.add_error(ValidationError::new("server.port", "Port cannot be 0"));
        }

        if config.server.host.is_empty() {
            result.add_error(ValidationError::new("server.host", "Host cannot be empty"));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
