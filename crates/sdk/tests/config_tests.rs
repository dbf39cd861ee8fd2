//! Configuration file tests

use anyhow::Result;
use std::fs;
use tempfile::TempDir;

use dexloan_sdk::{DexloanError, RetryConfig, SdkConfig};

fn config_content() -> String {
    r#"
rpc_url = "https://api.devnet.solana.com"
ws_url = "wss://api.devnet.solana.com"
program_id = "H6FCxCy2KCPJwCoUb9eQCSv41WZBKQaYfB6x5oFajzfj"
commitment = "finalized"
timeout_secs = 45

[retry]
max_retries = 3
base_delay_ms = 250
max_delay_ms = 2000
backoff_multiplier = 1.5

[logging]
level = "debug"
json = true
"#
    .to_string()
}

#[test]
fn test_config_loading_from_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("dexloan.toml");
    fs::write(&path, config_content())?;

    let config = SdkConfig::from_file(&path)?;

    assert_eq!(config.rpc_url, "https://api.devnet.solana.com");
    assert_eq!(config.ws_url.as_deref(), Some("wss://api.devnet.solana.com"));
    assert_eq!(
        config.program_id.to_string(),
        "H6FCxCy2KCPJwCoUb9eQCSv41WZBKQaYfB6x5oFajzfj"
    );
    assert_eq!(config.timeout_secs, 45);
    assert_eq!(config.retry.max_retries, 3);
    assert_eq!(config.retry.delay_for_attempt(1), 375);
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);
    Ok(())
}

#[test]
fn test_optional_sections_take_defaults() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("minimal.toml");
    fs::write(
        &path,
        r#"
rpc_url = "http://localhost:8899"
program_id = "H6FCxCy2KCPJwCoUb9eQCSv41WZBKQaYfB6x5oFajzfj"
commitment = "confirmed"
timeout_secs = 30
"#,
    )?;

    let config = SdkConfig::from_file(&path)?;

    assert_eq!(config.ws_url, None);
    assert_eq!(config.retry, RetryConfig::default());
    assert_eq!(config.logging.level, "info");
    Ok(())
}

#[test]
fn test_save_and_reload() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("saved.toml");

    let original = SdkConfig::devnet().with_rpc_url("https://rpc.example.com");
    original.save(&path)?;
    let loaded = SdkConfig::from_file(&path)?;

    assert_eq!(loaded, original);
    Ok(())
}

#[test]
fn test_invalid_files_are_configuration_errors() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let missing = SdkConfig::from_file(temp_dir.path().join("absent.toml"));
    assert!(matches!(missing, Err(DexloanError::Configuration(_))));

    let garbled = temp_dir.path().join("garbled.toml");
    fs::write(&garbled, "rpc_url = ")?;
    assert!(matches!(
        SdkConfig::from_file(&garbled),
        Err(DexloanError::Configuration(_))
    ));

    let bad_commitment = temp_dir.path().join("commitment.toml");
    fs::write(&bad_commitment, config_content().replace("finalized", "eventually"))?;
    assert!(matches!(
        SdkConfig::from_file(&bad_commitment),
        Err(DexloanError::InvalidParameter { .. })
    ));
    Ok(())
}
