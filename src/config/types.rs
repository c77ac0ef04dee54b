//! Configuration Types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub relay: RelayConfig,
    pub psk: PskConfig,
    pub logging: LoggingConfig,
}

/// Relay configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// How long a pair may stay silent in both directions before it is dropped
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,
}

/// Pre-shared key configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PskConfig {
    /// Key length in bytes
    pub length: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            relay: RelayConfig::default(),
            psk: PskConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(300),
        }
    }
}

impl Default for PskConfig {
    fn default() -> Self {
        Self { length: 32 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
