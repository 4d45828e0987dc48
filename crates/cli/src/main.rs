//! Pongdang CLI - admin client for the Pongdang dashboard API

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Level, error, info};

#[derive(Parser)]
#[command(name = "pongdang")]
#[command(about = "Admin client for the Pongdang dashboard API")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Data directory for the session file and logs
    #[arg(short = 'd', long, global = true, env = "PONGDANG_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Settings file (defaults to <data-dir>/config.toml when present)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Timeout for the whole command in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "60")]
    timeout: u64,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = config::load_settings(cli.config.as_deref(), cli.data_dir.clone())?;
    logging::init_logging(cli.log_level.into(), &settings.data_dir, cli.no_file_log)?;

    info!(base_url = %settings.base_url, "Starting Pongdang CLI");

    let run = cli.command.execute(settings);
    let outcome = if cli.timeout == 0 {
        run.await
    } else {
        match tokio::time::timeout(Duration::from_secs(cli.timeout), run).await {
            Ok(result) => result,
            Err(_) => {
                error!("Command timed out after {} seconds", cli.timeout);
                std::process::exit(1);
            }
        }
    };

    if let Err(e) = outcome {
        error!("Command failed: {e:#}");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from(["pongdang", "users", "list", "--pending", "-t", "0"]).unwrap();
        assert_eq!(cli.timeout, 0);
        assert!(matches!(cli.command, Commands::Users { .. }));
    }
}
