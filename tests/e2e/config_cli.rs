//! End-to-end tests for the `srelay config` commands.

use socket_relay_config::{
    CONFIG_FILE, CONFIG_TEST_FILE, CONFIG_TEST_OVERRIDE_FILE, ENV_OVERRIDES, ENV_RUN_MODE,
};
use std::io;
use std::path::Path;
use std::process::Command;

fn run_srelay(
    dir: &Path,
    args: &[&str],
    envs: &[(&str, &str)],
) -> io::Result<std::process::Output> {
    let mut command = Command::new(env!("CARGO_BIN_EXE_srelay"));
    command.current_dir(dir).args(args);
    scrub_relay_env(&mut command);
    for (key, value) in envs {
        command.env(key, value);
    }
    command.output()
}

fn scrub_relay_env(command: &mut Command) {
    command.env_remove(ENV_RUN_MODE);
    command.env_remove("RUST_LOG");
    for row in ENV_OVERRIDES {
        command.env_remove(row.name);
    }
}

fn parse_stdout(output: &std::process::Output) -> io::Result<serde_json::Value> {
    serde_json::from_slice(&output.stdout).map_err(io::Error::other)
}

#[test]
fn config_show_merges_files_env_and_overrides() -> io::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(
        dir.path().join(CONFIG_FILE),
        r#"{ "port": 9000, "statsd": { "host": "10.0.0.1" } }"#,
    )?;

    let output = run_srelay(
        dir.path(),
        &["--json", "config", "show"],
        &[
            ("PORT", "9200"),
            ("REDIS_SSL", "true"),
            ("JWT_SECRET", "e2e-secret"),
        ],
    )?;
    assert!(output.status.success(), "config show failed");

    let value = parse_stdout(&output)?;
    assert_eq!(
        value.get("status").and_then(serde_json::Value::as_str),
        Some("ok")
    );
    assert_eq!(
        value
            .pointer("/effectiveConfig/port")
            .and_then(serde_json::Value::as_u64),
        Some(9200)
    );
    assert_eq!(
        value
            .pointer("/effectiveConfig/statsd/host")
            .and_then(serde_json::Value::as_str),
        Some("10.0.0.1")
    );
    assert_eq!(
        value
            .pointer("/effectiveConfig/redis/ssl")
            .and_then(serde_json::Value::as_bool),
        Some(true)
    );
    assert_eq!(
        value
            .pointer("/effectiveConfig/jwtSecret")
            .and_then(serde_json::Value::as_str),
        Some("[REDACTED]")
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("configuration keys changed by environment"),
        "expected the changed-keys audit line in stderr"
    );
    Ok(())
}

#[test]
fn config_check_rejects_malformed_config_file() -> io::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join(CONFIG_FILE), "{ nope")?;

    let output = run_srelay(dir.path(), &["--json", "config", "check"], &[])?;
    assert_eq!(output.status.code(), Some(2));

    let value = parse_stdout(&output)?;
    assert_eq!(
        value.get("status").and_then(serde_json::Value::as_str),
        Some("error")
    );
    assert_eq!(
        value
            .pointer("/error/code/namespace")
            .and_then(serde_json::Value::as_str),
        Some("config")
    );
    assert_eq!(
        value
            .pointer("/error/code/code")
            .and_then(serde_json::Value::as_str),
        Some("invalid_json")
    );
    Ok(())
}

#[test]
fn run_mode_env_selects_test_sources() -> io::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join(CONFIG_FILE), r#"{ "port": 9000 }"#)?;
    std::fs::write(dir.path().join(CONFIG_TEST_FILE), r#"{ "port": 9001 }"#)?;
    std::fs::write(
        dir.path().join(CONFIG_TEST_OVERRIDE_FILE),
        r#"{ "jwtCookieName": "override-cookie" }"#,
    )?;

    let output = run_srelay(
        dir.path(),
        &["--json", "config", "show"],
        &[(ENV_RUN_MODE, "test")],
    )?;
    assert!(output.status.success(), "test-mode show failed");

    let value = parse_stdout(&output)?;
    assert_eq!(
        value.get("mode").and_then(serde_json::Value::as_str),
        Some("test")
    );
    assert_eq!(
        value
            .pointer("/effectiveConfig/port")
            .and_then(serde_json::Value::as_u64),
        Some(9001)
    );
    assert_eq!(
        value
            .pointer("/effectiveConfig/jwtCookieName")
            .and_then(serde_json::Value::as_str),
        Some("override-cookie")
    );

    // Normal mode reads config.json and ignores both test files.
    let output = run_srelay(dir.path(), &["--json", "config", "show"], &[])?;
    assert!(output.status.success(), "normal-mode show failed");

    let value = parse_stdout(&output)?;
    assert_eq!(
        value.get("mode").and_then(serde_json::Value::as_str),
        Some("normal")
    );
    assert_eq!(
        value
            .pointer("/effectiveConfig/port")
            .and_then(serde_json::Value::as_u64),
        Some(9000)
    );
    assert_eq!(
        value
            .pointer("/effectiveConfig/jwtCookieName")
            .and_then(serde_json::Value::as_str),
        Some("async-token")
    );
    Ok(())
}

#[test]
fn config_check_text_output_and_progress_flag() -> io::Result<()> {
    let dir = tempfile::tempdir()?;

    let output = run_srelay(dir.path(), &["config", "check"], &[])?;
    assert!(output.status.success(), "config check failed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("status: ok"));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("info: config check completed"));

    let output = run_srelay(dir.path(), &["--no-progress", "config", "check"], &[])?;
    assert!(output.status.success(), "config check failed");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("info: config check completed"));
    Ok(())
}
