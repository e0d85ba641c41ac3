//! Environment variable substitution and overrides for config values.
//!
//! Supports `${VAR_NAME}` syntax in string values, resolved at load time.
//! Only uppercase `[A-Z_][A-Z0-9_]*` variable names are matched.
//! `$${VAR}` escapes to a literal `${VAR}`.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::schema::CourierConfig;

pub const ENDPOINT_URL_ENV: &str = "COURIER_ENDPOINT_URL";
pub const DATA_DIR_ENV: &str = "COURIER_DATA_DIR";
pub const LOG_LEVEL_ENV: &str = "RUST_LOG";

/// Matches `${VAR}` and its escaped form `$${VAR}`.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references in a config JSON value tree.
///
/// Returns an error if any referenced env var is not set or is empty.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    substitute_value(value, &std::env::vars().collect(), "")
}

/// Substitute env vars using a provided map.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(arr) => {
            let result: Result<Vec<_>> = arr
                .iter()
                .enumerate()
                .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
                .collect();
            Ok(Value::Array(result?))
        }
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                result.insert(k.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &regex::Captures| {
        let var_name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{var_name}}}");
        }
        match env.get(var_name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: var_name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    if let Some(err) = missing {
        bail!(err);
    }
    Ok(substituted.into_owned())
}

/// Apply `COURIER_ENDPOINT_URL`, `COURIER_DATA_DIR`, and `RUST_LOG` on top of
/// the file config. Empty values are ignored.
pub fn apply_env_overrides(config: CourierConfig) -> CourierConfig {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

pub fn apply_env_overrides_with(
    mut config: CourierConfig,
    env: &HashMap<String, String>,
) -> CourierConfig {
    let get = |name: &str| env.get(name).filter(|v| !v.trim().is_empty()).cloned();

    if let Some(url) = get(ENDPOINT_URL_ENV) {
        config.endpoint.url = url;
    }
    if let Some(dir) = get(DATA_DIR_ENV) {
        config.storage.data_dir = Some(PathBuf::from(dir));
    }
    if let Some(level) = get(LOG_LEVEL_ENV) {
        config.logging.level = level;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_nested_var() {
        let v = json!({"endpoint": {"url": "https://${CLINIC_HOST}/Appointment/Save"}});
        let result = resolve_env_vars_with(&v, &env(&[("CLINIC_HOST", "clinic.example")])).unwrap();
        assert_eq!(result["endpoint"]["url"], "https://clinic.example/Appointment/Save");
    }

    #[test]
    fn error_names_missing_var_and_path() {
        let v = json!({"endpoint": {"url": "${MISSING_HOST}"}});
        let err = resolve_env_vars_with(&v, &HashMap::new()).unwrap_err().to_string();
        assert!(err.contains("MISSING_HOST"));
        assert!(err.contains("endpoint.url"));
    }

    #[test]
    fn escaped_reference_stays_literal() {
        let v = json!({"note": "$${NOT_A_VAR} and ${REAL}"});
        let result = resolve_env_vars_with(&v, &env(&[("REAL", "x")])).unwrap();
        assert_eq!(result["note"], "${NOT_A_VAR} and x");
    }

    #[test]
    fn non_string_values_pass_through() {
        let v = json!({"retry": {"maxRetries": 2}, "list": ["plain"]});
        assert_eq!(resolve_env_vars_with(&v, &HashMap::new()).unwrap(), v);
    }

    #[test]
    fn overrides_win_over_file_values() {
        let config = apply_env_overrides_with(
            CourierConfig::default(),
            &env(&[
                (ENDPOINT_URL_ENV, "http://10.0.0.5:8020/Appointment/Save"),
                (DATA_DIR_ENV, "/tmp/courier-data"),
                (LOG_LEVEL_ENV, "debug"),
            ]),
        );
        assert_eq!(config.endpoint.url, "http://10.0.0.5:8020/Appointment/Save");
        assert_eq!(config.storage.data_dir, Some(PathBuf::from("/tmp/courier-data")));
        assert_eq!(config.logging.level, "debug");

        let untouched = apply_env_overrides_with(CourierConfig::default(), &env(&[(ENDPOINT_URL_ENV, " ")]));
        assert_eq!(untouched, CourierConfig::default());
    }
}
