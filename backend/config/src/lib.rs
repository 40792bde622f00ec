//! `liime-config`: Liime server configuration management.
//!
//! Provides:
//! - Typed config schema (server, websocket, logging, directory seeds)
//! - YAML loading
//! - `${ENV_VAR}` substitution and `LIIME_*` overrides
//! - Default value application
//! - Validation

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{
    apply_env_overrides, apply_env_overrides_with, resolve_env_vars,
    resolve_env_vars_with, MissingEnvVarError,
};
pub use io::{config_dir, config_file_path, load_config};
pub use schema::{ChatSeed, LiimeConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;

/// Load, substitute env vars, apply overrides and defaults, then validate.
///
/// This is the main entry point for loading a config at runtime. Validation
/// errors fail the load and are listed in the error; warnings come back with
/// the config so the caller can log them once logging is up.
pub async fn load_and_prepare(path: &Path) -> Result<(LiimeConfig, ValidationReport)> {
    let raw_config = load_config(path).await?;

    let value: Value = serde_json::to_value(&raw_config)
        .context("Failed to serialize config for processing")?;
    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;
    let config: LiimeConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let config = apply_env_overrides(config)?;
    let config = apply_all_defaults(config);

    let report = validate(&config);
    if !report.is_valid() {
        let details: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
        bail!(
            "configuration has {} error(s): {}",
            report.errors.len(),
            details.join("; ")
        );
    }

    Ok((config, report))
}
