//! Config validation with user-friendly error messages.

use crate::schema::CourierConfig;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &CourierConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_endpoint(config, &mut report);
    validate_retry(config, &mut report);
    validate_logging(config, &mut report);
    validate_defaults(config, &mut report);
    report
}

fn validate_endpoint(config: &CourierConfig, report: &mut ValidationReport) {
    let url = config.endpoint.url.trim();
    if url.is_empty() {
        report.error("endpoint.url", "Endpoint URL is required");
    } else if !(url.starts_with("http://") || url.starts_with("https://")) {
        report.error("endpoint.url", format!("Endpoint URL must be http(s), got '{url}'"));
    }
    if config.endpoint.timeout_secs == 0 {
        report.error("endpoint.timeoutSecs", "timeoutSecs must be > 0");
    } else if config.endpoint.timeout_secs > config.retry.backoff_secs && config.retry.max_retries > 0 {
        report.warn(
            "endpoint.timeoutSecs",
            "Request timeout is longer than the retry backoff",
        );
    }
}

fn validate_retry(config: &CourierConfig, report: &mut ValidationReport) {
    if config.retry.backoff_secs == 0 && config.retry.max_retries > 0 {
        report.warn("retry.backoffSecs", "Zero backoff retries immediately");
    }
    if config.retry.max_retries > 10 {
        report.warn(
            "retry.maxRetries",
            format!("{} retries may repeat the booking for a long time", config.retry.max_retries),
        );
    }
}

fn validate_logging(config: &CourierConfig, report: &mut ValidationReport) {
    let level = config.logging.level.trim();
    if level.is_empty() {
        report.error("logging.level", "Log level cannot be empty");
    }
}

fn validate_defaults(config: &CourierConfig, report: &mut ValidationReport) {
    if config.defaults.dr_code.trim().is_empty() {
        report.warn("defaults.drCode", "Empty doctor code is sent with fallback payloads");
    }
}
