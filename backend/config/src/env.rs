//! Environment handling for config values.
//!
//! Two mechanisms:
//! - `${VAR_NAME}` references inside string values, resolved at load time.
//!   Only uppercase `[A-Z_][A-Z0-9_]*` names match; `$${VAR}` escapes to a
//!   literal `${VAR}`.
//! - `LIIME_*` variables that override individual settings after the file
//!   has been read.

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

use crate::schema::{LiimeConfig, ServerConfig};

/// Matches `${VAR}` and the escaped form `$${VAR}`.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

pub const HOST_VAR: &str = "LIIME_HOST";
pub const PORT_VAR: &str = "LIIME_PORT";
pub const DEBUG_VAR: &str = "LIIME_DEBUG";

#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references in a config JSON value tree from the
/// process environment.
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
        Value::Array(arr) => arr
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
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
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
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

/// Apply `LIIME_HOST`, `LIIME_PORT` and `LIIME_DEBUG` from the process
/// environment.
pub fn apply_env_overrides(config: LiimeConfig) -> Result<LiimeConfig> {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

pub fn apply_env_overrides_with(
    mut config: LiimeConfig,
    env: &HashMap<String, String>,
) -> Result<LiimeConfig> {
    let server = config.server.get_or_insert_with(ServerConfig::default);

    if let Some(host) = env.get(HOST_VAR).filter(|v| !v.is_empty()) {
        server.host = Some(host.clone());
    }
    if let Some(port) = env.get(PORT_VAR).filter(|v| !v.is_empty()) {
        let port = port
            .parse::<u16>()
            .with_context(|| format!("{PORT_VAR} is not a valid port: {port}"))?;
        server.port = Some(port);
    }
    if let Some(debug) = env.get(DEBUG_VAR) {
        server.debug = Some(debug.eq_ignore_ascii_case("true"));
    }

    Ok(config)
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
        let v = json!({"logging": {"dir": "${LOG_ROOT}/liime"}});
        let result = resolve_env_vars_with(&v, &env(&[("LOG_ROOT", "/var/log")])).unwrap();
        assert_eq!(result["logging"]["dir"], "/var/log/liime");
    }

    #[test]
    fn error_on_missing_var() {
        let v = json!({"server": {"host": "${MISSING_HOST}"}});
        let err = resolve_env_vars_with(&v, &HashMap::new()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("MISSING_HOST"));
        assert!(msg.contains("server.host"));
    }

    #[test]
    fn escaped_reference_stays_literal() {
        let v = json!({"key": "$${NOT_A_VAR}"});
        let result = resolve_env_vars_with(&v, &HashMap::new()).unwrap();
        assert_eq!(result["key"], "${NOT_A_VAR}");
    }

    #[test]
    fn overrides_server_settings() {
        let cfg = apply_env_overrides_with(
            LiimeConfig::default(),
            &env(&[(HOST_VAR, "127.0.0.1"), (PORT_VAR, "9100"), (DEBUG_VAR, "TRUE")]),
        )
        .unwrap();
        assert_eq!(cfg.host(), "127.0.0.1");
        assert_eq!(cfg.port(), 9100);
        assert!(cfg.debug());
    }

    #[test]
    fn rejects_bad_port() {
        let result = apply_env_overrides_with(LiimeConfig::default(), &env(&[(PORT_VAR, "http")]));
        assert!(result.is_err());
    }
}
