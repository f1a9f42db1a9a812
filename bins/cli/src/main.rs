//! CLI binary entrypoint.

mod error;
mod format;

use clap::{Parser, Subcommand};
use error::{CliError, ExitCode};
use format::{OutputArgs, OutputMode};
use socket_relay_config::{
    RunMode, build_relay_config_from_dir, collect_relay_env, detect_run_mode, redact_secret_fields,
};
use socket_relay_shared::{ErrorEnvelope, ErrorKind, REDACTED_VALUE, is_secret_key};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Parser)]
#[command(
    name = "srelay",
    version,
    about = "Socket relay operations CLI",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Config-related commands.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Validate config loading, merging, and env overrides.
    Check {
        /// Directory holding the config files (defaults to the current directory).
        #[arg(long)]
        config_dir: Option<PathBuf>,
        /// Run mode; detected from RUN_MODE when omitted.
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Optional JSON overrides (partial config).
        #[arg(long)]
        overrides_json: Option<String>,
    },
    /// Show the effective config after merging and env overrides.
    Show {
        /// Directory holding the config files (defaults to the current directory).
        #[arg(long)]
        config_dir: Option<PathBuf>,
        /// Run mode; detected from RUN_MODE when omitted.
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Optional JSON overrides (partial config).
        #[arg(long)]
        overrides_json: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Normal,
    Test,
}

impl From<ModeArg> for RunMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Normal => Self::Normal,
            ModeArg::Test => Self::Test,
        }
    }
}

pub(crate) struct CliOutput {
    stdout: String,
    stderr: String,
    exit_code: ExitCode,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let mode = OutputMode::from_args(&cli.output);
    init_tracing();

    match run(&cli.command, mode) {
        Ok(output) => match write_output(&output) {
            Ok(()) => std::process::ExitCode::from(output.exit_code.as_u8()),
            Err(error) => exit_with_error(&error),
        },
        Err(error) => exit_with_error(&error),
    }
}

fn exit_with_error(error: &CliError) -> std::process::ExitCode {
    let _ = writeln!(io::stderr(), "error: {error}");
    std::process::ExitCode::from(error.exit_code().as_u8())
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env().add_directive(Level::INFO.into());
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .try_init();
}

fn run(command: &Commands, mode: OutputMode) -> Result<CliOutput, CliError> {
    match command {
        Commands::Config { command } => match command {
            ConfigCommands::Check {
                config_dir,
                mode: run_mode,
                overrides_json,
            } => config_check(
                mode,
                config_dir.as_deref(),
                *run_mode,
                overrides_json.as_deref(),
            ),
            ConfigCommands::Show {
                config_dir,
                mode: run_mode,
                overrides_json,
            } => config_show(
                mode,
                config_dir.as_deref(),
                *run_mode,
                overrides_json.as_deref(),
            ),
        },
    }
}

fn config_check(
    mode: OutputMode,
    config_dir: Option<&Path>,
    run_mode: Option<ModeArg>,
    overrides_json: Option<&str>,
) -> Result<CliOutput, CliError> {
    let env = collect_relay_env();
    config_check_with_env(mode, &env, config_dir, run_mode, overrides_json)
}

fn config_check_with_env(
    mode: OutputMode,
    env: &BTreeMap<String, String>,
    config_dir: Option<&Path>,
    run_mode: Option<ModeArg>,
    overrides_json: Option<&str>,
) -> Result<CliOutput, CliError> {
    let dir = resolve_config_dir(config_dir)?;
    let run_mode = run_mode.map_or_else(|| detect_run_mode(env), RunMode::from);

    if let Err(error) = build_relay_config_from_dir(&dir, run_mode, overrides_json, env) {
        return Ok(format_error_output(mode, &error, envelope_exit_code(&error)));
    }

    let mut stderr = String::new();
    log_info(&mut stderr, "config check completed", mode.no_progress);

    let stdout = if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "configDir": dir.to_string_lossy().to_string(),
            "mode": run_mode.as_str(),
        });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else {
        format!("status: ok\nconfig: ok\nmode: {}\n", run_mode.as_str())
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::Ok,
    })
}

fn config_show(
    mode: OutputMode,
    config_dir: Option<&Path>,
    run_mode: Option<ModeArg>,
    overrides_json: Option<&str>,
) -> Result<CliOutput, CliError> {
    let env = collect_relay_env();
    config_show_with_env(mode, &env, config_dir, run_mode, overrides_json)
}

fn config_show_with_env(
    mode: OutputMode,
    env: &BTreeMap<String, String>,
    config_dir: Option<&Path>,
    run_mode: Option<ModeArg>,
    overrides_json: Option<&str>,
) -> Result<CliOutput, CliError> {
    let dir = resolve_config_dir(config_dir)?;
    let run_mode = run_mode.map_or_else(|| detect_run_mode(env), RunMode::from);

    let config = match build_relay_config_from_dir(&dir, run_mode, overrides_json, env) {
        Ok(config) => config,
        Err(error) => return Ok(format_error_output(mode, &error, envelope_exit_code(&error))),
    };
    let redacted = redact_secret_fields(&serde_json::to_value(&config)?);

    let mut stderr = String::new();
    log_info(&mut stderr, "config show completed", mode.no_progress);

    let stdout = if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "configDir": dir.to_string_lossy().to_string(),
            "mode": run_mode.as_str(),
            "effectiveConfig": redacted,
        });
        let mut output = serde_json::to_string_pretty(&payload)?;
        output.push('\n');
        output
    } else {
        let mut out = String::new();
        out.push_str("status: ok\nconfig:\n");
        out.push_str(&serde_json::to_string_pretty(&redacted)?);
        out.push('\n');
        out
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::Ok,
    })
}

pub(crate) fn format_error_output(
    mode: OutputMode,
    error: &ErrorEnvelope,
    exit_code: ExitCode,
) -> CliOutput {
    let sanitized = sanitize_envelope(error.clone());

    let mut stderr = String::new();
    log_info(&mut stderr, "command failed", mode.no_progress);

    let stdout = if mode.is_json() {
        let payload = serde_json::json!({
            "status": "error",
            "error": sanitized,
        });

        // This is a CLI boundary, so JSON serialization errors are internal.
        let mut output = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| {
            "{\"status\":\"error\",\"error\":{\"kind\":\"Unexpected\",\"class\":\"NonRetriable\",\"code\":{\"namespace\":\"core\",\"code\":\"internal\"},\"message\":\"internal error\"}}".to_string()
        });
        output.push('\n');
        output
    } else {
        format_error_text(&sanitized)
    };

    CliOutput {
        stdout,
        stderr,
        exit_code,
    }
}

pub(crate) const fn envelope_exit_code(error: &ErrorEnvelope) -> ExitCode {
    match error.kind {
        ErrorKind::Expected => ExitCode::InvalidInput,
        ErrorKind::Invariant | ErrorKind::Unexpected => ExitCode::Internal,
    }
}

fn resolve_config_dir(dir: Option<&Path>) -> Result<PathBuf, CliError> {
    match dir {
        Some(value) => Ok(value.to_path_buf()),
        None => Ok(std::env::current_dir()?),
    }
}

fn sanitize_envelope(mut error: ErrorEnvelope) -> ErrorEnvelope {
    for (key, value) in &mut error.metadata {
        if is_secret_key(key) {
            *value = REDACTED_VALUE.to_string();
        }
    }
    error
}

fn format_error_text(error: &ErrorEnvelope) -> String {
    let mut out = String::new();
    out.push_str("status: error\n");
    out.push_str("code: ");
    out.push_str(&error.code.to_string());
    out.push('\n');
    out.push_str("message: ");
    out.push_str(&error.message);
    out.push('\n');
    out.push_str("kind: ");
    out.push_str(&error.kind.to_string());
    out.push('\n');

    if !error.metadata.is_empty() {
        out.push_str("meta:\n");
        for (key, value) in &error.metadata {
            out.push_str("  ");
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
    }

    out
}

fn log_info(stderr: &mut String, message: &str, no_progress: bool) {
    if no_progress {
        return;
    }
    stderr.push_str("info: ");
    stderr.push_str(message);
    stderr.push('\n');
}

fn write_output(output: &CliOutput) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    stdout.write_all(output.stdout.as_bytes())?;

    if !output.stderr.is_empty() {
        let mut stderr = io::stderr();
        stderr.write_all(output.stderr.as_bytes())?;
        stderr.flush()?;
    }

    Ok(())
}
