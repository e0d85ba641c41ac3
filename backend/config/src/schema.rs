//! Courier runtime configuration schema.
//!
//! Every section is optional in the YAML file; missing fields take the
//! defaults below.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_ENDPOINT_URL: &str = "http://127.0.0.1:8020/Appointment/Save";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_BACKOFF_SECS: u64 = 30;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_DR_CODE: &str = "0000";
pub const DEFAULT_DR_NAME: &str = "Unassigned";

/// Root configuration for Courier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CourierConfig {
    pub endpoint: EndpointConfig,
    pub retry: RetryConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub defaults: DoctorConfig,
}

/// Clinic server the appointments are posted to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EndpointConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub backoff_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_secs: DEFAULT_BACKOFF_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    /// Holds the schedule slot, history log, and job journal. Defaults to
    /// `<config dir>/data`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    pub level: String,
    /// Defaults to `<config dir>/logs`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            dir: None,
        }
    }
}

/// Doctor fields used when the payload does not carry its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DoctorConfig {
    pub dr_code: String,
    pub dr_name: String,
}

impl Default for DoctorConfig {
    fn default() -> Self {
        Self {
            dr_code: DEFAULT_DR_CODE.to_string(),
            dr_name: DEFAULT_DR_NAME.to_string(),
        }
    }
}

impl CourierConfig {
    pub fn data_dir(&self, config_dir: &std::path::Path) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .unwrap_or_else(|| config_dir.join("data"))
    }

    pub fn log_dir(&self, config_dir: &std::path::Path) -> PathBuf {
        self.logging
            .dir
            .clone()
            .unwrap_or_else(|| config_dir.join("logs"))
    }
}
