//! Relay configuration schema types and defaults.
//!
//! Field names serialize as camelCase to stay wire-compatible with the
//! JSON config files the relay service ships with. Declaration order is
//! significant: the change-key audit log reports paths in this order.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use socket_relay_shared::{ErrorClass, ErrorCode, ErrorEnvelope};

/// Top-level relay configuration tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct RelayConfig {
    /// TCP port the relay listens on.
    pub port: u16,
    /// Log verbosity (`error`, `warn`, `info`, `debug`).
    pub log_level: String,
    /// Mirror logs to a file in addition to stdout.
    pub log_to_file: bool,
    /// Log file name used when `logToFile` is set.
    pub log_filename: String,
    /// Prefix for per-channel Redis stream keys.
    pub redis_stream_prefix: String,
    /// Maximum events fetched per stream read.
    pub redis_stream_read_count: u64,
    /// Blocking read timeout against the stream, in milliseconds.
    pub redis_stream_read_block_ms: u64,
    /// Accepted JWT signing algorithms.
    pub jwt_algorithms: Vec<String>,
    /// JWT verification secret. Empty means token auth is unconfigured.
    pub jwt_secret: String,
    /// Cookie carrying the connection token.
    pub jwt_cookie_name: String,
    /// JWT claim key holding the channel id.
    pub jwt_channel_id_key: String,
    /// How long a socket response may take before the request is dropped.
    pub socket_response_timeout_ms: u64,
    /// Interval between liveness pings to connected sockets.
    pub ping_sockets_interval_ms: u64,
    /// Interval between garbage-collection sweeps of idle channels.
    pub gc_channels_interval_ms: u64,
    /// StatsD metrics endpoint.
    pub statsd: StatsdConfig,
    /// Redis connection settings.
    pub redis: RedisConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            log_level: "info".to_string(),
            log_to_file: false,
            log_filename: "app.log".to_string(),
            redis_stream_prefix: "async-events-".to_string(),
            redis_stream_read_count: 100,
            redis_stream_read_block_ms: 5000,
            jwt_algorithms: vec!["HS256".to_string()],
            jwt_secret: String::new(),
            jwt_cookie_name: "async-token".to_string(),
            jwt_channel_id_key: "channel".to_string(),
            socket_response_timeout_ms: 60_000,
            ping_sockets_interval_ms: 20_000,
            gc_channels_interval_ms: 120_000,
            statsd: StatsdConfig::default(),
            redis: RedisConfig::default(),
        }
    }
}

/// StatsD metrics endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct StatsdConfig {
    /// StatsD agent host.
    pub host: String,
    /// StatsD agent port.
    pub port: u16,
    /// Tags appended to every emitted metric, in order.
    pub global_tags: Vec<String>,
}

impl Default for StatsdConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8125,
            global_tags: Vec::new(),
        }
    }
}

/// Redis connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct RedisConfig {
    /// Redis server host.
    pub host: String,
    /// Redis server port.
    pub port: u16,
    /// Redis password. Empty means no AUTH.
    pub password: String,
    /// Redis ACL username.
    pub username: String,
    /// Logical database index.
    pub db: u64,
    /// Connect over TLS.
    pub ssl: bool,
    /// Verify the server hostname against its TLS certificate.
    pub validate_hostname: bool,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: String::new(),
            username: "default".to_string(),
            db: 0,
            ssl: false,
            validate_hostname: true,
        }
    }
}

/// Run mode selecting which config file the loader reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Production and development runs; reads `config.json`.
    Normal,
    /// Test runs; reads `config.test.json` and honors the override file.
    Test,
}

impl RunMode {
    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Test => "test",
        }
    }

    /// Parse a canonical mode name.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        match input {
            "normal" => Some(Self::Normal),
            "test" => Some(Self::Test),
            _ => None,
        }
    }
}

/// Serialize the compiled-in defaults as a JSON tree for the merge pipeline.
pub fn default_config_value() -> Result<Value, ErrorEnvelope> {
    serde_json::to_value(RelayConfig::default()).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("failed to serialize default config: {error}"),
            ErrorClass::NonRetriable,
        )
    })
}

/// Decode a fully merged JSON tree into the typed config.
///
/// This is the last step of the build pipeline; unknown fields, `null`s,
/// and out-of-range numbers all surface here.
pub fn decode_relay_config(value: Value) -> Result<RelayConfig, ErrorEnvelope> {
    serde_json::from_value(value).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_shape"),
            format!("merged config does not match the relay schema: {error}"),
        )
    })
}
