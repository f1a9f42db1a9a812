//! Environment variable overrides for the merged configuration tree.
//!
//! This module keeps the env layer:
//! - declarative (one fixed dispatch table, one generic applier)
//! - forgiving (blank values are skipped, unparseable numerics are
//!   rejected with a warning and the prior value is kept)
//! - safe (secret values are redacted in warnings)

use crate::diff::changed_keys;
use crate::schema::RunMode;
use serde_json::{Map, Number, Value};
use socket_relay_shared::{REDACTED_VALUE, is_secret_key};
use std::collections::BTreeMap;

/// Env var: run mode selector (`test` picks the test config file).
pub const ENV_RUN_MODE: &str = "RUN_MODE";

/// Env var: relay listen port.
pub const ENV_PORT: &str = "PORT";
/// Env var: log level name.
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
/// Env var: route log output to a file (true/false).
pub const ENV_LOG_TO_FILE: &str = "LOG_TO_FILE";
/// Env var: log file name.
pub const ENV_LOG_FILENAME: &str = "LOG_FILENAME";
/// Env var: Redis stream key prefix.
pub const ENV_REDIS_STREAM_PREFIX: &str = "REDIS_STREAM_PREFIX";
/// Env var: Redis stream read batch size.
pub const ENV_REDIS_STREAM_READ_COUNT: &str = "REDIS_STREAM_READ_COUNT";
/// Env var: Redis stream read block duration in milliseconds.
pub const ENV_REDIS_STREAM_READ_BLOCK_MS: &str = "REDIS_STREAM_READ_BLOCK_MS";
/// Env var: JWT signing secret (secret).
// gitleaks:allow
pub const ENV_JWT_SECRET: &str = "JWT_SECRET";
/// Env var: JWT cookie name.
pub const ENV_JWT_COOKIE_NAME: &str = "JWT_COOKIE_NAME";
/// Env var: socket response timeout in milliseconds.
pub const ENV_SOCKET_RESPONSE_TIMEOUT_MS: &str = "SOCKET_RESPONSE_TIMEOUT_MS";
/// Env var: socket ping interval in milliseconds.
pub const ENV_PING_SOCKETS_INTERVAL_MS: &str = "PING_SOCKETS_INTERVAL_MS";
/// Env var: channel garbage-collection interval in milliseconds.
pub const ENV_GC_CHANNELS_INTERVAL_MS: &str = "GC_CHANNELS_INTERVAL_MS";

/// Env var: Redis host.
pub const ENV_REDIS_HOST: &str = "REDIS_HOST";
/// Env var: Redis port.
pub const ENV_REDIS_PORT: &str = "REDIS_PORT";
/// Env var: Redis password (secret).
// gitleaks:allow
pub const ENV_REDIS_PASSWORD: &str = "REDIS_PASSWORD";
/// Env var: Redis username.
pub const ENV_REDIS_USERNAME: &str = "REDIS_USERNAME";
/// Env var: Redis database index.
pub const ENV_REDIS_DB: &str = "REDIS_DB";
/// Env var: Redis TLS enablement (true/false).
pub const ENV_REDIS_SSL: &str = "REDIS_SSL";

/// Env var: StatsD host.
pub const ENV_STATSD_HOST: &str = "STATSD_HOST";
/// Env var: StatsD port.
pub const ENV_STATSD_PORT: &str = "STATSD_PORT";
/// Env var: StatsD global tags as CSV.
pub const ENV_STATSD_GLOBAL_TAGS: &str = "STATSD_GLOBAL_TAGS";

/// How a raw environment string becomes a configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Parse the trimmed value as an integer, then as a float. Values
    /// that parse as neither reject the override.
    Number,
    /// Lowercased equality against the literal `true`. Every other
    /// value, including `false` and garbage, coerces to `false`. The
    /// raw value is not trimmed first.
    Flag,
    /// The raw string, verbatim.
    Text,
    /// The raw string split on commas, pieces untrimmed and unescaped.
    TextList,
}

/// One row of the env-to-field dispatch table.
#[derive(Debug, Clone, Copy)]
pub struct EnvOverride {
    /// Environment variable name.
    pub name: &'static str,
    /// Dotted path of the target field in the configuration tree.
    pub path: &'static str,
    /// Coercion applied to the raw value.
    pub coercion: Coercion,
}

impl EnvOverride {
    const fn new(name: &'static str, path: &'static str, coercion: Coercion) -> Self {
        Self {
            name,
            path,
            coercion,
        }
    }
}

/// The fixed table binding recognized environment variables to field
/// paths and coercion rules.
pub const ENV_OVERRIDES: &[EnvOverride] = &[
    EnvOverride::new(ENV_PORT, "port", Coercion::Number),
    EnvOverride::new(ENV_LOG_LEVEL, "logLevel", Coercion::Text),
    EnvOverride::new(ENV_LOG_TO_FILE, "logToFile", Coercion::Flag),
    EnvOverride::new(ENV_LOG_FILENAME, "logFilename", Coercion::Text),
    EnvOverride::new(ENV_REDIS_STREAM_PREFIX, "redisStreamPrefix", Coercion::Text),
    EnvOverride::new(ENV_REDIS_STREAM_READ_COUNT, "redisStreamReadCount", Coercion::Number),
    EnvOverride::new(ENV_REDIS_STREAM_READ_BLOCK_MS, "redisStreamReadBlockMs", Coercion::Number),
    EnvOverride::new(ENV_JWT_SECRET, "jwtSecret", Coercion::Text),
    EnvOverride::new(ENV_JWT_COOKIE_NAME, "jwtCookieName", Coercion::Text),
    EnvOverride::new(ENV_SOCKET_RESPONSE_TIMEOUT_MS, "socketResponseTimeoutMs", Coercion::Number),
    EnvOverride::new(ENV_PING_SOCKETS_INTERVAL_MS, "pingSocketsIntervalMs", Coercion::Number),
    EnvOverride::new(ENV_GC_CHANNELS_INTERVAL_MS, "gcChannelsIntervalMs", Coercion::Number),
    EnvOverride::new(ENV_REDIS_HOST, "redis.host", Coercion::Text),
    EnvOverride::new(ENV_REDIS_PORT, "redis.port", Coercion::Number),
    EnvOverride::new(ENV_REDIS_PASSWORD, "redis.password", Coercion::Text),
    EnvOverride::new(ENV_REDIS_USERNAME, "redis.username", Coercion::Text),
    EnvOverride::new(ENV_REDIS_DB, "redis.db", Coercion::Number),
    EnvOverride::new(ENV_REDIS_SSL, "redis.ssl", Coercion::Flag),
    EnvOverride::new(ENV_STATSD_HOST, "statsd.host", Coercion::Text),
    EnvOverride::new(ENV_STATSD_PORT, "statsd.port", Coercion::Number),
    EnvOverride::new(ENV_STATSD_GLOBAL_TAGS, "statsd.globalTags", Coercion::TextList),
];

/// Apply the env override table to `snapshot` and return the updated
/// tree alongside the dotted paths the environment changed.
///
/// The caller's snapshot is never mutated. A variable participates only
/// when it is set and contains at least one non-whitespace character;
/// blank values behave as if the variable were absent. Numeric values
/// that fail to parse are rejected with a warning and the prior value
/// is kept.
#[must_use]
pub fn apply_env_overrides(
    snapshot: &Value,
    env: &BTreeMap<String, String>,
) -> (Value, Vec<String>) {
    let mut updated = snapshot.clone();

    for row in ENV_OVERRIDES {
        let Some(raw) = env.get(row.name) else {
            continue;
        };
        if raw.trim().is_empty() {
            continue;
        }

        match coerce(row.coercion, raw) {
            Some(value) => set_path(&mut updated, row.path, value),
            None => {
                let shown = if is_secret_key(row.name) {
                    REDACTED_VALUE
                } else {
                    raw.as_str()
                };
                tracing::warn!(
                    env_var = row.name,
                    value = shown,
                    "rejecting unparseable numeric override, keeping prior value"
                );
            },
        }
    }

    let changed = changed_keys(snapshot, &updated);
    (updated, changed)
}

/// Read the variables the relay recognizes from the process environment.
#[must_use]
pub fn collect_relay_env() -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for row in ENV_OVERRIDES {
        if let Ok(value) = std::env::var(row.name) {
            map.insert(row.name.to_string(), value);
        }
    }
    if let Ok(value) = std::env::var(ENV_RUN_MODE) {
        map.insert(ENV_RUN_MODE.to_string(), value);
    }
    map
}

/// Derive the run mode from an env map. Only the exact value `test`
/// selects [`RunMode::Test`]; everything else, including casing
/// variants, is [`RunMode::Normal`].
#[must_use]
pub fn detect_run_mode(env: &BTreeMap<String, String>) -> RunMode {
    match env.get(ENV_RUN_MODE) {
        Some(raw) if raw == RunMode::Test.as_str() => RunMode::Test,
        _ => RunMode::Normal,
    }
}

fn coerce(rule: Coercion, raw: &str) -> Option<Value> {
    match rule {
        Coercion::Number => parse_number(raw).map(Value::Number),
        Coercion::Flag => Some(Value::Bool(raw.to_lowercase() == "true")),
        Coercion::Text => Some(Value::String(raw.to_string())),
        Coercion::TextList => Some(Value::Array(
            raw.split(',')
                .map(|piece| Value::String(piece.to_string()))
                .collect(),
        )),
    }
}

fn parse_number(raw: &str) -> Option<Number> {
    let trimmed = raw.trim();
    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(Number::from(int));
    }
    trimmed.parse::<f64>().ok().and_then(Number::from_f64)
}

/// Write `value` at a dotted `path`, creating intermediate objects for
/// missing segments. Intermediate nodes that exist but are not objects
/// leave the override unapplied; the shape break surfaces when the tree
/// is decoded.
fn set_path(tree: &mut Value, path: &str, value: Value) {
    let Value::Object(map) = tree else {
        return;
    };
    match path.split_once('.') {
        Some((head, rest)) => {
            let child = map
                .entry(head)
                .or_insert_with(|| Value::Object(Map::new()));
            set_path(child, rest, value);
        },
        None => {
            map.insert(path.to_string(), value);
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::default_config_value;
    use serde_json::json;
    use socket_relay_shared::ErrorEnvelope;

    fn env_of(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn string_overrides_apply_verbatim() -> Result<(), ErrorEnvelope> {
        let snapshot = default_config_value()?;
        let env = env_of(&[(ENV_JWT_SECRET, "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")]);

        let (updated, changed) = apply_env_overrides(&snapshot, &env);
        assert_eq!(
            updated.pointer("/jwtSecret"),
            Some(&json!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"))
        );
        assert_eq!(changed, vec!["jwtSecret"]);
        Ok(())
    }

    #[test]
    fn numeric_overrides_parse_integers_and_floats() -> Result<(), ErrorEnvelope> {
        let snapshot = default_config_value()?;
        let env = env_of(&[(ENV_PORT, "8090"), (ENV_REDIS_DB, " 4 ")]);

        let (updated, changed) = apply_env_overrides(&snapshot, &env);
        assert_eq!(updated.pointer("/port"), Some(&json!(8090)));
        assert_eq!(updated.pointer("/redis/db"), Some(&json!(4)));
        assert_eq!(changed, vec!["port", "redis.db"]);

        let env = env_of(&[(ENV_SOCKET_RESPONSE_TIMEOUT_MS, "1500.5")]);
        let (updated, _) = apply_env_overrides(&snapshot, &env);
        assert_eq!(
            updated.pointer("/socketResponseTimeoutMs"),
            Some(&json!(1500.5))
        );
        Ok(())
    }

    #[test]
    fn blank_values_behave_as_absent() -> Result<(), ErrorEnvelope> {
        let snapshot = default_config_value()?;
        let env = env_of(&[(ENV_REDIS_PORT, ""), (ENV_REDIS_HOST, "   ")]);

        let (updated, changed) = apply_env_overrides(&snapshot, &env);
        assert_eq!(updated, snapshot);
        assert_eq!(changed, Vec::<String>::new());
        Ok(())
    }

    #[test]
    fn unparseable_numeric_keeps_the_prior_value() -> Result<(), ErrorEnvelope> {
        let snapshot = default_config_value()?;
        let env = env_of(&[(ENV_PORT, "not-a-number"), (ENV_LOG_LEVEL, "debug")]);

        let (updated, changed) = apply_env_overrides(&snapshot, &env);
        assert_eq!(updated.pointer("/port"), Some(&json!(8080)));
        assert_eq!(updated.pointer("/logLevel"), Some(&json!("debug")));
        assert_eq!(changed, vec!["logLevel"]);
        Ok(())
    }

    #[test]
    fn flag_coercion_accepts_only_case_insensitive_true() -> Result<(), ErrorEnvelope> {
        let snapshot = default_config_value()?;
        let cases = [
            ("true", true),
            ("True", true),
            ("TRUE", true),
            ("false", false),
            ("yes", false),
            (" true", false),
        ];

        for (raw, expected) in cases {
            let env = env_of(&[(ENV_REDIS_SSL, raw)]);
            let (updated, _) = apply_env_overrides(&snapshot, &env);
            assert_eq!(
                updated.pointer("/redis/ssl"),
                Some(&json!(expected)),
                "REDIS_SSL={raw:?}"
            );
        }
        Ok(())
    }

    #[test]
    fn tag_lists_split_on_commas_without_trimming() -> Result<(), ErrorEnvelope> {
        let snapshot = default_config_value()?;

        let env = env_of(&[(ENV_STATSD_GLOBAL_TAGS, "tag-1,tag-2")]);
        let (updated, changed) = apply_env_overrides(&snapshot, &env);
        assert_eq!(
            updated.pointer("/statsd/globalTags"),
            Some(&json!(["tag-1", "tag-2"]))
        );
        assert_eq!(changed, vec!["statsd.globalTags"]);

        let env = env_of(&[(ENV_STATSD_GLOBAL_TAGS, "a, b")]);
        let (updated, _) = apply_env_overrides(&snapshot, &env);
        assert_eq!(
            updated.pointer("/statsd/globalTags"),
            Some(&json!(["a", " b"]))
        );
        Ok(())
    }

    #[test]
    fn changed_paths_follow_tree_declaration_order() -> Result<(), ErrorEnvelope> {
        let snapshot = default_config_value()?;

        let env = env_of(&[(ENV_REDIS_HOST, "10.0.0.1"), (ENV_JWT_SECRET, "s3cret")]);
        let (_, changed) = apply_env_overrides(&snapshot, &env);
        assert_eq!(changed, vec!["jwtSecret", "redis.host"]);

        let env = env_of(&[(ENV_REDIS_SSL, "true"), (ENV_STATSD_HOST, "10.0.0.2")]);
        let (_, changed) = apply_env_overrides(&snapshot, &env);
        assert_eq!(changed, vec!["statsd.host", "redis.ssl"]);
        Ok(())
    }

    #[test]
    fn caller_snapshot_is_never_mutated() -> Result<(), ErrorEnvelope> {
        let snapshot = default_config_value()?;
        let pristine = snapshot.clone();
        let env = env_of(&[(ENV_PORT, "9999"), (ENV_REDIS_SSL, "true")]);

        let (updated, _) = apply_env_overrides(&snapshot, &env);
        assert_eq!(snapshot, pristine);
        assert_ne!(updated, pristine);
        Ok(())
    }

    #[test]
    fn run_mode_detection_requires_the_exact_test_value() {
        assert_eq!(
            detect_run_mode(&env_of(&[(ENV_RUN_MODE, "test")])),
            RunMode::Test
        );
        assert_eq!(
            detect_run_mode(&env_of(&[(ENV_RUN_MODE, "TEST")])),
            RunMode::Normal
        );
        assert_eq!(
            detect_run_mode(&env_of(&[(ENV_RUN_MODE, "")])),
            RunMode::Normal
        );
        assert_eq!(detect_run_mode(&env_of(&[])), RunMode::Normal);
    }

    #[test]
    fn overrides_reach_into_missing_intermediate_objects() {
        let snapshot = json!({ "port": 1 });
        let env = env_of(&[(ENV_REDIS_HOST, "10.0.0.1")]);

        let (updated, changed) = apply_env_overrides(&snapshot, &env);
        assert_eq!(updated.pointer("/redis/host"), Some(&json!("10.0.0.1")));
        // The subtree is absent from the caller's snapshot, so the audit
        // list stays empty.
        assert_eq!(changed, Vec::<String>::new());
    }
}
