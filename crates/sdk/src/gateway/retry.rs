use anchor_lang::prelude::Pubkey;
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

use dexloan_types::{DexloanError, DexloanResult};

use super::{LedgerGateway, RawAccount};
use crate::config::RetryConfig;

/// How a missing account should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// The account is expected to exist already; absence is final
    Existing,
    /// The account was just written; absence may be propagation lag
    AfterWrite,
}

/// Bounded exponential backoff around gateway reads
///
/// Writes are never retried here; only reads go through this type.
#[derive(Clone)]
pub struct RetryingReader {
    gateway: Arc<dyn LedgerGateway>,
    config: RetryConfig,
}

impl RetryingReader {
    pub fn new(gateway: Arc<dyn LedgerGateway>, config: RetryConfig) -> Self {
        Self { gateway, config }
    }

    pub fn gateway(&self) -> &Arc<dyn LedgerGateway> {
        &self.gateway
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    fn should_retry(mode: ReadMode, err: &DexloanError) -> bool {
        match err {
            DexloanError::NotFound { .. } => mode == ReadMode::AfterWrite,
            other => other.is_retryable(),
        }
    }

    /// Read one account, retrying transient failures
    pub async fn fetch_account(&self, address: &Pubkey, mode: ReadMode) -> DexloanResult<RawAccount> {
        let mut attempt = 0u32;
        loop {
            match self.gateway.fetch_account(address).await {
                Ok(account) => {
                    if attempt > 0 {
                        debug!(%address, attempt, "read succeeded after retry");
                    }
                    return Ok(account);
                }
                Err(err) if Self::should_retry(mode, &err) => {
                    if attempt >= self.config.max_retries {
                        return Err(match err {
                            DexloanError::NotFound { address } => DexloanError::StaleRead {
                                address,
                                attempts: attempt + 1,
                            },
                            other => other,
                        });
                    }

                    let delay = self.config.delay_for_attempt(attempt);
                    warn!(%address, attempt, delay_ms = delay, error = %err, "retrying read");
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGateway;

    fn fast_retry(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            base_delay_ms: 1,
            max_delay_ms: 2,
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_missing_existing_account_is_not_retried() {
        let gateway = Arc::new(MockGateway::new());
        let reader = RetryingReader::new(gateway.clone(), fast_retry(3));
        let address = Pubkey::new_unique();

        let err = reader.fetch_account(&address, ReadMode::Existing).await.unwrap_err();
        assert_eq!(err, DexloanError::NotFound { address });
        assert_eq!(gateway.read_count(&address), 1);
    }

    #[tokio::test]
    async fn test_after_write_read_gives_stale_read_when_exhausted() {
        let gateway = Arc::new(MockGateway::new());
        let reader = RetryingReader::new(gateway.clone(), fast_retry(2));
        let address = Pubkey::new_unique();

        let err = reader.fetch_account(&address, ReadMode::AfterWrite).await.unwrap_err();
        assert_eq!(err, DexloanError::StaleRead { address, attempts: 3 });
        assert_eq!(gateway.read_count(&address), 3);
    }

    #[tokio::test]
    async fn test_after_write_read_picks_up_late_account() {
        let gateway = Arc::new(MockGateway::new());
        let reader = RetryingReader::new(gateway.clone(), fast_retry(5));
        let address = Pubkey::new_unique();
        gateway.reveal_after(&address, vec![1, 2, 3], 2);

        let account = reader.fetch_account(&address, ReadMode::AfterWrite).await.unwrap();
        assert_eq!(account.data, vec![1, 2, 3]);
        assert_eq!(gateway.read_count(&address), 3);
    }

    #[tokio::test]
    async fn test_rpc_errors_are_retried() {
        let gateway = Arc::new(MockGateway::new());
        let reader = RetryingReader::new(gateway.clone(), fast_retry(4));
        let address = Pubkey::new_unique();
        gateway.insert_raw(address, vec![9]);
        gateway.fail_reads(&address, 2);

        let account = reader.fetch_account(&address, ReadMode::Existing).await.unwrap();
        assert_eq!(account.data, vec![9]);
        assert_eq!(gateway.read_count(&address), 3);
    }
}
