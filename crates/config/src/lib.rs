//! # socket-relay-config
//!
//! Layered configuration resolution for the relay: compiled-in defaults,
//! a run-mode-selected JSON file, an optional override file, and
//! environment variables, merged in that order. This crate depends on
//! `shared` only.

/// Change-key audit between configuration snapshots.
pub mod diff;
/// Environment override table and coercions.
pub mod env;
/// Config building helpers (defaults + files + env).
pub mod load;
/// Right-biased deep merge over JSON trees.
pub mod merge;
/// Configuration schema types and helpers.
pub mod schema;

pub use schema::{
    RedisConfig, RelayConfig, RunMode, StatsdConfig, decode_relay_config, default_config_value,
};

pub use diff::changed_keys;
pub use env::{
    Coercion, ENV_OVERRIDES, ENV_RUN_MODE, EnvOverride, apply_env_overrides, collect_relay_env,
    detect_run_mode,
};
pub use load::{
    CONFIG_FILE, CONFIG_TEST_FILE, CONFIG_TEST_OVERRIDE_FILE, build_relay_config_from_dir,
    build_relay_config_from_sources, build_relay_config_std_env, redact_secret_fields,
    to_pretty_json,
};
pub use merge::merge_values;

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
