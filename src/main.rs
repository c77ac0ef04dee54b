//! Connpair command-line utility
//!
//! Generates pre-shared keys and validates relay configuration.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use connpair::config::ConfigManager;
use connpair::{psk, Config};

/// CLI arguments for connpair
#[derive(Parser, Debug)]
#[command(name = "connpair")]
#[command(about = "Connection pair relay utilities")]
#[command(version)]
#[command(long_about = "
Connection pair relay utilities.

Configuration priority (highest to lowest):
1. Command-line arguments
2. Configuration file
3. Environment variables
4. Built-in defaults

Environment variables:
  CONNPAIR_IDLE_TIMEOUT - Idle timeout for a relayed pair (e.g., 5m, 30s)
  CONNPAIR_PSK_LENGTH   - Pre-shared key length in bytes
  CONNPAIR_LOG_LEVEL    - Log level (trace, debug, info, warn, error)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "connpair.toml", help = "Path to configuration file")]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, help = "Log level")]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a random pre-shared key and print it as hex
    Genpsk {
        /// Key length in bytes (overrides config file)
        #[arg(short, long)]
        length: Option<usize>,
    },
    /// Validate configuration and print a summary
    CheckConfig {
        /// Idle timeout override (e.g., 90s, 5m)
        #[arg(long, value_parser = humantime::parse_duration)]
        idle_timeout: Option<Duration>,
    },
}

fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Load configuration with priority: CLI args > config file > environment > defaults.
    // The subscriber needs the resolved log level, so loading happens first.
    let mut config = if args.config.exists() {
        ConfigManager::load_from_file(&args.config)?
    } else {
        ConfigManager::load_from_env()?
    };

    init_tracing(effective_log_level(&args, &config))?;

    match args.command {
        Command::Genpsk { length } => {
            config.merge_with_cli_args(None, length, args.log_level.as_deref());
            config
                .validate()
                .context("Final configuration validation failed")?;

            let key = psk::generate_key_hex(config.psk.length)?;
            println!("{}", key);
        }
        Command::CheckConfig { idle_timeout } => {
            config.merge_with_cli_args(idle_timeout, None, args.log_level.as_deref());
            config
                .validate()
                .context("Final configuration validation failed")?;

            info!("Configuration is valid");
            info!("  Idle timeout: {:?}", config.relay.idle_timeout);
            info!("  PSK length: {} bytes", config.psk.length);
            info!("  Log level: {}", config.logging.level);
        }
    }

    Ok(())
}

/// Level for the default filter: `-v`, then `--log-level`, then the loaded config
fn effective_log_level<'a>(args: &'a CliArgs, config: &'a Config) -> &'a str {
    if args.verbose {
        "debug"
    } else {
        args.log_level.as_deref().unwrap_or(&config.logging.level)
    }
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .with(env_filter)
        .try_init()
        .context("Failed to initialize tracing")?;

    Ok(())
}
