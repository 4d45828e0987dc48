use anyhow::Result;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging for the CLI. Logs go to stderr so stdout stays
/// machine-readable, and to `<data_dir>/cli.log` unless disabled.
pub fn init_logging(log_level: Level, data_dir: &Path, no_file_log: bool) -> Result<()> {
    if no_file_log {
        init_stderr_logging(log_level)
    } else {
        init_file_logging(log_level, data_dir)
    }
}

fn env_filter(level: Level) -> EnvFilter {
    let level_str = level.as_str().to_lowercase();
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("pongdang={level_str},pongdang_core={level_str},pongdang_http={level_str}").into()
    })
}

fn init_file_logging(level: Level, data_dir: &Path) -> Result<()> {
    let log_file_path = data_dir.join("cli.log");
    std::fs::create_dir_all(data_dir)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)?;

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(log_file)
                .with_ansi(false),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .init();

    Ok(())
}

fn init_stderr_logging(level: Level) -> Result<()> {
    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}
