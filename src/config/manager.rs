//! Configuration Manager

use super::Config;
use crate::Result;
use anyhow::{bail, Context};
use std::path::Path;
use std::time::Duration;

/// Longest accepted idle timeout
pub const MAX_IDLE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Longest accepted pre-shared key, in bytes
pub const MAX_PSK_LENGTH: usize = 1024;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            config.validate()
                .with_context(|| "Configuration validation failed")?;

            tracing::info!("Configuration loaded and validated successfully");
            Ok(config)
        } else {
            tracing::warn!("Configuration file not found at {}, using defaults", path.display());
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Config> {
        let mut config = Config::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Override fields from `CONNPAIR_*` variables, looked up through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(timeout) = lookup("CONNPAIR_IDLE_TIMEOUT") {
            self.relay.idle_timeout = humantime::parse_duration(&timeout)
                .with_context(|| format!("Invalid CONNPAIR_IDLE_TIMEOUT: {}", timeout))?;
        }

        if let Some(length) = lookup("CONNPAIR_PSK_LENGTH") {
            self.psk.length = length.parse::<usize>()
                .with_context(|| format!("Invalid CONNPAIR_PSK_LENGTH: {}", length))?;
        }

        if let Some(log_level) = lookup("CONNPAIR_LOG_LEVEL") {
            self.logging.level = log_level;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_relay_config()
            .with_context(|| "Relay configuration validation failed")?;

        self.validate_psk_config()
            .with_context(|| "PSK configuration validation failed")?;

        self.validate_logging_config()
            .with_context(|| "Logging configuration validation failed")?;

        Ok(())
    }

    fn validate_relay_config(&self) -> Result<()> {
        if self.relay.idle_timeout.is_zero() {
            bail!("idle_timeout must be greater than 0");
        }

        if self.relay.idle_timeout > MAX_IDLE_TIMEOUT {
            bail!("idle_timeout cannot exceed 24 hours");
        }

        Ok(())
    }

    fn validate_psk_config(&self) -> Result<()> {
        if self.psk.length == 0 {
            bail!("psk.length must be greater than 0");
        }

        if self.psk.length > MAX_PSK_LENGTH {
            bail!("psk.length cannot exceed {} bytes", MAX_PSK_LENGTH);
        }

        Ok(())
    }

    fn validate_logging_config(&self) -> Result<()> {
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            bail!("logging.level must be one of: {}", VALID_LOG_LEVELS.join(", "));
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(
        &mut self,
        idle_timeout: Option<Duration>,
        psk_length: Option<usize>,
        log_level: Option<&str>,
    ) {
        if let Some(idle_timeout) = idle_timeout {
            self.relay.idle_timeout = idle_timeout;
            tracing::info!("CLI override: idle timeout set to {:?}", idle_timeout);
        }

        if let Some(length) = psk_length {
            self.psk.length = length;
            tracing::info!("CLI override: psk length set to {} bytes", length);
        }

        if let Some(level) = log_level {
            self.logging.level = level.to_string();
            tracing::info!("CLI override: log level set to {}", level);
        }
    }
}
