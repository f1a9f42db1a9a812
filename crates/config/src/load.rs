//! Config building helpers (defaults + files + env).
//!
//! The builder is responsible for deterministic merge order and for
//! surfacing user-facing errors as typed `ErrorEnvelope`s. Missing files
//! are a warning and an empty overlay; files that exist but cannot be
//! parsed fail the build.

use crate::env::{apply_env_overrides, collect_relay_env, detect_run_mode};
use crate::merge::merge_values;
use crate::schema::{RelayConfig, RunMode, decode_relay_config, default_config_value};
use serde_json::Value;
use socket_relay_shared::{ErrorClass, ErrorCode, ErrorEnvelope, REDACTED, is_secret_key};
use std::collections::BTreeMap;
use std::path::Path;

/// Config file read in normal run mode.
pub const CONFIG_FILE: &str = "config.json";
/// Config file read in test run mode.
pub const CONFIG_TEST_FILE: &str = "config.test.json";
/// Override file read in test run mode only.
pub const CONFIG_TEST_OVERRIDE_FILE: &str = "config.test.override.json";

/// Build the relay config from in-memory sources using a deterministic
/// precedence order.
///
/// Precedence (highest wins):
/// - env overrides (the fixed table in [`crate::env`])
/// - overrides JSON (partial tree)
/// - config JSON (partial tree)
/// - defaults ([`RelayConfig::default()`])
///
/// The dotted paths changed by the environment layer are emitted as an
/// info log line; they are not part of the returned value.
pub fn build_relay_config_from_sources(
    config_json: Option<&str>,
    overrides_json: Option<&str>,
    env: &BTreeMap<String, String>,
) -> Result<RelayConfig, ErrorEnvelope> {
    let mut snapshot = default_config_value()?;

    if let Some(input) = config_json {
        snapshot = merge_values(snapshot, parse_overlay(input, "config")?);
    }
    if let Some(input) = overrides_json {
        snapshot = merge_values(snapshot, parse_overlay(input, "overrides")?);
    }

    let (resolved, changed) = apply_env_overrides(&snapshot, env);
    tracing::info!(
        changed_keys = %changed.join(", "),
        "configuration keys changed by environment"
    );
    tracing::debug!(
        config = %redact_secret_fields(&resolved),
        "resolved configuration"
    );

    decode_relay_config(resolved)
}

/// Build the relay config from the files under `config_dir`.
///
/// The run mode selects which config file is read. When `overrides_json`
/// is given it takes the override slot verbatim; otherwise the override
/// file is read, in test mode only. Missing files merge as empty
/// overlays.
pub fn build_relay_config_from_dir(
    config_dir: &Path,
    mode: RunMode,
    overrides_json: Option<&str>,
    env: &BTreeMap<String, String>,
) -> Result<RelayConfig, ErrorEnvelope> {
    let file_name = match mode {
        RunMode::Normal => CONFIG_FILE,
        RunMode::Test => CONFIG_TEST_FILE,
    };
    let config_text = read_optional_file(&config_dir.join(file_name))?;

    let override_text = match overrides_json {
        Some(input) => Some(input.to_string()),
        None if mode == RunMode::Test => {
            read_optional_file(&config_dir.join(CONFIG_TEST_OVERRIDE_FILE))?
        },
        None => None,
    };

    build_relay_config_from_sources(config_text.as_deref(), override_text.as_deref(), env)
}

/// Build the relay config from the process environment, detecting the
/// run mode from `RUN_MODE`.
pub fn build_relay_config_std_env(config_dir: &Path) -> Result<RelayConfig, ErrorEnvelope> {
    let env = collect_relay_env();
    let mode = detect_run_mode(&env);
    build_relay_config_from_dir(config_dir, mode, None, &env)
}

/// Serialize the config as deterministic pretty JSON (with trailing newline).
pub fn to_pretty_json(config: &RelayConfig) -> Result<String, ErrorEnvelope> {
    let mut output = serde_json::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("failed to serialize config: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

/// Copy a configuration tree with the values of secret-named keys
/// replaced, for logs and user-facing output.
#[must_use]
pub fn redact_secret_fields(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, child)| {
                    if is_secret_key(key) {
                        (key.clone(), Value::String(REDACTED.to_string()))
                    } else {
                        (key.clone(), redact_secret_fields(child))
                    }
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

fn parse_overlay(input: &str, source: &'static str) -> Result<Value, ErrorEnvelope> {
    let value: Value = serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid {source} JSON: {error}"),
        )
        .with_metadata("source", source)
    })?;

    if !value.is_object() {
        return Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_shape"),
            format!("{source} JSON must be an object"),
        )
        .with_metadata("source", source));
    }

    Ok(value)
}

fn read_optional_file(path: &Path) -> Result<Option<String>, ErrorEnvelope> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "config file not found, continuing without it");
            Ok(None)
        },
        Err(error) => {
            let code = match error.kind() {
                std::io::ErrorKind::PermissionDenied => {
                    ErrorCode::new("config", "config_file_permission_denied")
                },
                _ => ErrorCode::new("config", "config_file_io"),
            };
            Err(
                ErrorEnvelope::expected(code, format!("failed to read config file: {error}"))
                    .with_metadata("path", path.to_string_lossy().to_string()),
            )
        },
    }
}
