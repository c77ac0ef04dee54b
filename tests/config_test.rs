//! Configuration loading tests

use anyhow::Result;
use connpair::config::ConfigManager;
use connpair::RelayEngine;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_load_config_from_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("connpair.toml");

    fs::write(
        &config_path,
        r#"
[relay]
idle_timeout = "45s"

[psk]
length = 16

[logging]
level = "debug"
"#,
    )?;

    let config = ConfigManager::load_from_file(&config_path)?;
    assert_eq!(config.relay.idle_timeout, Duration::from_secs(45));
    assert_eq!(config.psk.length, 16);
    assert_eq!(config.logging.level, "debug");

    let engine = RelayEngine::from_config(&config);
    assert_eq!(engine.idle_timeout(), Duration::from_secs(45));

    Ok(())
}

#[test]
fn test_partial_config_uses_defaults() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("connpair.toml");
    fs::write(&config_path, "[relay]\nidle_timeout = \"2m\"\n")?;

    let config = ConfigManager::load_from_file(&config_path)?;
    assert_eq!(config.relay.idle_timeout, Duration::from_secs(120));
    assert_eq!(config.psk.length, 32);
    assert_eq!(config.logging.level, "info");

    Ok(())
}

#[test]
fn test_missing_config_file_falls_back_to_defaults() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = ConfigManager::load_from_file(&temp_dir.path().join("absent.toml"))?;
    assert_eq!(config.relay.idle_timeout, Duration::from_secs(300));
    Ok(())
}

#[test]
fn test_invalid_config_is_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("connpair.toml");

    fs::write(&config_path, "[relay]\nidle_timeout = \"0s\"\n")?;
    let err = ConfigManager::load_from_file(&config_path).unwrap_err();
    assert!(format!("{:#}", err).contains("idle_timeout must be greater than 0"));

    fs::write(&config_path, "[relay]\nidle_timeout = \"whenever\"\n")?;
    assert!(ConfigManager::load_from_file(&config_path).is_err());

    Ok(())
}
