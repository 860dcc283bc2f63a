mod cli;
mod commands;
mod error_fmt;
mod state;

use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use eyre::{Result, WrapErr};
use irvol_core::error::IrError;
use irvol_core::{DeviceSession, DeviceState};
use irvol_hardware::SimulatedTransmitter;

use crate::cli::{Cli, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

/// Fail the Nth simulated send (1-based); used by integration tests.
const ENV_SIM_FAIL_ON: &str = "IRVOL_SIM_FAIL_ON";
/// Time out the Nth simulated send (1-based).
const ENV_SIM_TIMEOUT_ON: &str = "IRVOL_SIM_TIMEOUT_ON";
/// Per-send latency of the simulated blaster in ms.
const ENV_SIM_LATENCY_MS: &str = "IRVOL_SIM_LATENCY_MS";

fn main() -> ExitCode {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            tracing::debug!(error = ?e, "command failed");
            ExitCode::from(u8::try_from(exit_code_for_error(&e)).unwrap_or(1))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let cfg = load_config(&cli.config)?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging);

    let initial = match &cli.state {
        Some(p) => state::load(p)?,
        None => DeviceState::default(),
    };

    let tx = simulated_transmitter();
    let log = tx.log();
    let session = DeviceSession::builder()
        .with_transmitter(tx)
        .with_config(&cfg)?
        .with_initial_state(initial)
        .build()?;

    let result = commands::run(&cli.cmd, &session);

    // Persist even after a failure: the estimate reflects what was sent.
    if let Some(p) = &cli.state
        && cli.cmd.mutates()
        && let Err(e) = state::save(p, &session.state())
    {
        if result.is_ok() {
            return Err(e);
        }
        tracing::warn!(error = %e, "could not persist state after failed command");
    }

    let adjustment = result?;
    let summary = commands::summarize(&cli.cmd, &session, adjustment, log.sent());
    if cli.json {
        println!(
            "{}",
            serde_json::to_string(&summary).wrap_err("serializing result")?
        );
    } else {
        println!("{}", commands::render_text(&summary));
    }
    Ok(())
}

/// Read, parse, merge the levels CSV and validate. Every failure is reported
/// as a configuration error.
fn load_config(path: &Path) -> Result<irvol_config::Config> {
    let config_err = |what: &str| IrError::Config(format!("{what} {}", path.display()));

    let text = fs::read_to_string(path).wrap_err_with(|| config_err("cannot read"))?;
    let mut cfg = irvol_config::load_toml(&text).wrap_err_with(|| config_err("cannot parse"))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    cfg.resolve_levels(base)
        .wrap_err_with(|| config_err("cannot load volume levels for"))?;
    cfg.validate()
        .wrap_err_with(|| config_err("invalid values in"))?;
    Ok(cfg)
}

fn env_u64(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring non-numeric environment override");
            None
        }
    }
}

fn simulated_transmitter() -> SimulatedTransmitter {
    let mut tx = SimulatedTransmitter::new();
    if let Some(n) = env_u64(ENV_SIM_FAIL_ON) {
        tx = tx.fail_on(n);
    }
    if let Some(n) = env_u64(ENV_SIM_TIMEOUT_ON) {
        tx = tx.timeout_on(n);
    }
    if let Some(ms) = env_u64(ENV_SIM_LATENCY_MS) {
        tx = tx.with_latency(Duration::from_millis(ms));
    }
    tx
}

/// Console logs go to stderr (pretty or JSON lines); `[logging] file` adds a
/// JSON-lines file sink through a non-blocking appender.
fn init_tracing(json: bool, console_level: &str, logging: &irvol_config::Logging) {
    use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(console_level));
    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    };

    let file = logging.file.as_deref().map(|file| {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "irvol.log".into(), |n| n.to_os_string());
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let level = logging.level.as_deref().unwrap_or("info");
        fmt::layer()
            .json()
            .with_writer(writer)
            .with_filter(EnvFilter::new(level))
            .boxed()
    });

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init();
}
