//! Print the effective relay config (defaults + env overrides) as JSON.

use socket_relay_config::{build_relay_config_from_sources, collect_relay_env, to_pretty_json};
use std::io;
use std::io::Write;

fn main() -> std::process::ExitCode {
    match run() {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            std::process::ExitCode::from(1)
        },
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let env = collect_relay_env();
    let config = build_relay_config_from_sources(None, None, &env)?;
    let output = to_pretty_json(&config)?;

    let mut stdout = io::stdout();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;

    Ok(())
}
