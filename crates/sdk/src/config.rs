use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::{fs, path::Path, str::FromStr};

use dexloan_types::{program_id, serde_helpers::pubkey_serde, DexloanError, DexloanResult};

/// SDK configuration for connecting to the Dexloan listings program
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SdkConfig {
    /// RPC endpoint URL
    pub rpc_url: String,

    /// WebSocket URL for subscriptions
    #[serde(default)]
    pub ws_url: Option<String>,

    /// Listings program ID
    #[serde(with = "pubkey_serde")]
    pub program_id: Pubkey,

    /// Commitment level for reads and confirmations
    pub commitment: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Read retry configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Logging configuration for host binaries
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Retry configuration for ledger reads
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Maximum number of retries for a read
    pub max_retries: u32,

    /// Base delay between retries in milliseconds
    pub base_delay_ms: u64,

    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,

    /// Exponential backoff multiplier
    pub backoff_multiplier: f64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is unset
    pub level: String,

    /// Emit JSON lines instead of human readable output
    #[serde(default)]
    pub json: bool,
}

impl SdkConfig {
    pub fn localnet() -> Self {
        Self {
            rpc_url: "http://localhost:8899".to_string(),
            ws_url: Some("ws://localhost:8900".to_string()),
            program_id: program_id(),
            commitment: "confirmed".to_string(),
            timeout_secs: 30,
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn devnet() -> Self {
        Self {
            rpc_url: "https://api.devnet.solana.com".to_string(),
            ws_url: Some("wss://api.devnet.solana.com".to_string()),
            ..Self::localnet()
        }
    }

    pub fn mainnet() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            ws_url: Some("wss://api.mainnet-beta.solana.com".to_string()),
            ..Self::localnet()
        }
    }

    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = url.into();
        self
    }

    pub fn with_program_id(mut self, program_id: Pubkey) -> Self {
        self.program_id = program_id;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> DexloanResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            DexloanError::Configuration(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config: SdkConfig = toml::from_str(&content).map_err(|e| {
            DexloanError::Configuration(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> DexloanResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| DexloanError::Configuration(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content).map_err(|e| {
            DexloanError::Configuration(format!("Failed to write config file {}: {}", path.display(), e))
        })?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> DexloanResult<()> {
        if self.rpc_url.is_empty() {
            return Err(DexloanError::invalid_parameter("rpc_url", "empty", "non-empty URL"));
        }

        if !(self.rpc_url.starts_with("http://") || self.rpc_url.starts_with("https://")) {
            return Err(DexloanError::invalid_parameter(
                "rpc_url",
                &self.rpc_url,
                "http:// or https:// URL",
            ));
        }

        if self.timeout_secs == 0 {
            return Err(DexloanError::invalid_parameter("timeout_secs", "0", "greater than 0"));
        }

        self.commitment_config()?;
        self.retry.validate()?;

        Ok(())
    }

    /// Parsed commitment level
    pub fn commitment_config(&self) -> DexloanResult<CommitmentConfig> {
        CommitmentConfig::from_str(&self.commitment).map_err(|_| {
            DexloanError::invalid_parameter(
                "commitment",
                &self.commitment,
                "processed, confirmed or finalized",
            )
        })
    }
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl RetryConfig {
    /// Validate retry configuration
    pub fn validate(&self) -> DexloanResult<()> {
        if self.max_retries == 0 {
            return Err(DexloanError::invalid_parameter("max_retries", "0", "greater than 0"));
        }

        if self.base_delay_ms == 0 {
            return Err(DexloanError::invalid_parameter("base_delay_ms", "0", "greater than 0"));
        }

        if self.max_delay_ms < self.base_delay_ms {
            return Err(DexloanError::invalid_parameter(
                "max_delay_ms",
                &self.max_delay_ms.to_string(),
                &format!("greater than or equal to base_delay_ms ({})", self.base_delay_ms),
            ));
        }

        if self.backoff_multiplier <= 1.0 {
            return Err(DexloanError::invalid_parameter(
                "backoff_multiplier",
                &self.backoff_multiplier.to_string(),
                "greater than 1.0",
            ));
        }

        Ok(())
    }

    /// Calculate delay for retry attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        if attempt == 0 {
            return self.base_delay_ms;
        }

        let exponential_delay =
            self.base_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        (exponential_delay as u64).min(self.max_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
