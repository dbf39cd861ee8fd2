use async_trait::async_trait;
use solana_account_decoder::UiAccountEncoding;
use solana_client::{
    client_error::ClientError,
    nonblocking::rpc_client::RpcClient,
    rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig},
    rpc_filter::{Memcmp, RpcFilterType},
};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::{Instruction, InstructionError},
    pubkey::Pubkey,
    signer::Signer,
    signature::Signature,
    transaction::{Transaction, TransactionError},
};
use solana_transaction_status::TransactionStatus;
use std::{sync::Arc, time::Duration};
use tracing::{debug, instrument, warn};

use dexloan_types::{DexloanError, DexloanResult, ProgramErrorCode};

use super::{AccountFilter, Confirmation, LedgerGateway, RawAccount};
use crate::config::SdkConfig;

/// Ledger gateway backed by a Solana JSON-RPC node
pub struct RpcGateway {
    rpc_client: Arc<RpcClient>,
    program_id: Pubkey,
    commitment: CommitmentConfig,
}

impl RpcGateway {
    /// Slot that confirmed `signature`, if the node still reports its status
    async fn confirming_slot(&self, signature: &Signature) -> Option<u64> {
        match self.rpc_client.get_signature_statuses(&[*signature]).await {
            Ok(response) => status_slot(&response.value),
            Err(e) => {
                debug!(error = %e, %signature, "signature status unavailable");
                None
            }
        }
    }

    /// Create a gateway from SDK configuration
    pub fn new(config: &SdkConfig) -> DexloanResult<Self> {
        config.validate()?;
        let commitment = config.commitment_config()?;
        let rpc_client = Arc::new(RpcClient::new_with_timeout_and_commitment(
            config.rpc_url.clone(),
            Duration::from_secs(config.timeout_secs),
            commitment,
        ));

        Ok(Self {
            rpc_client,
            program_id: config.program_id,
            commitment,
        })
    }

    /// Wrap an existing client
    pub fn with_client(rpc_client: Arc<RpcClient>, program_id: Pubkey) -> Self {
        let commitment = rpc_client.commitment();
        Self {
            rpc_client,
            program_id,
            commitment,
        }
    }

    pub fn rpc_client(&self) -> &Arc<RpcClient> {
        &self.rpc_client
    }

    fn rpc_filters(filters: &[AccountFilter]) -> Vec<RpcFilterType> {
        filters
            .iter()
            .map(|filter| match filter {
                AccountFilter::Memcmp { offset, bytes } => {
                    RpcFilterType::Memcmp(Memcmp::new_base58_encoded(*offset, bytes))
                }
                AccountFilter::DataSize(size) => RpcFilterType::DataSize(*size),
            })
            .collect()
    }
}

/// Map a client error from a submission onto the error taxonomy
fn submission_error(err: ClientError, signature: Option<String>) -> DexloanError {
    if let Some(TransactionError::InstructionError(_, InstructionError::Custom(code))) =
        err.get_transaction_error()
    {
        if let Some(program_error) = ProgramErrorCode::from_code(code) {
            return program_error.into_error(signature);
        }
    }

    DexloanError::SubmissionFailed {
        reason: err.to_string(),
        signature,
    }
}

#[async_trait]
impl LedgerGateway for RpcGateway {
    fn program_id(&self) -> Pubkey {
        self.program_id
    }

    #[instrument(skip(self), fields(address = %address))]
    async fn fetch_account(&self, address: &Pubkey) -> DexloanResult<RawAccount> {
        debug!("getAccountInfo");
        let response = self
            .rpc_client
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(|e| DexloanError::rpc(e.to_string()))?;

        match response.value {
            Some(account) => Ok(RawAccount {
                address: *address,
                owner: account.owner,
                lamports: account.lamports,
                data: account.data,
            }),
            None => Err(DexloanError::NotFound { address: *address }),
        }
    }

    #[instrument(skip(self, filters), fields(filters = filters.len()))]
    async fn fetch_accounts(&self, filters: &[AccountFilter]) -> DexloanResult<Vec<RawAccount>> {
        let config = RpcProgramAccountsConfig {
            filters: Some(Self::rpc_filters(filters)),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(self.commitment),
                ..Default::default()
            },
            ..Default::default()
        };

        let accounts = self
            .rpc_client
            .get_program_accounts_with_config(&self.program_id, config)
            .await
            .map_err(|e| DexloanError::rpc(e.to_string()))?;
        debug!(count = accounts.len(), "getProgramAccounts");

        Ok(accounts
            .into_iter()
            .map(|(address, account)| RawAccount {
                address,
                owner: account.owner,
                lamports: account.lamports,
                data: account.data,
            })
            .collect())
    }

    #[instrument(skip_all, fields(instructions = instructions.len(), payer = %signer.pubkey()))]
    async fn submit_mutation(
        &self,
        instructions: &[Instruction],
        signer: &(dyn Signer + Send + Sync),
    ) -> DexloanResult<Confirmation> {
        let recent_blockhash = self
            .rpc_client
            .get_latest_blockhash()
            .await
            .map_err(|e| DexloanError::rpc(e.to_string()))?;

        let mut tx = Transaction::new_with_payer(instructions, Some(&signer.pubkey()));
        tx.try_sign(&[signer], recent_blockhash)
            .map_err(|e| DexloanError::submission_failed(format!("signing failed: {}", e)))?;
        let pending_signature = tx.signatures.first().map(|s| s.to_string());

        let signature = self
            .rpc_client
            .send_and_confirm_transaction(&tx)
            .await
            .map_err(|e| {
                warn!(error = %e, "transaction rejected");
                submission_error(e, pending_signature.clone())
            })?;
        debug!(%signature, "transaction confirmed");

        // A node that cannot report the confirming block does not turn a
        // confirmed write into a failure; callers fall back to local time.
        let slot = self.confirming_slot(&signature).await;
        let block_time = match slot {
            Some(slot) => match self.rpc_client.get_block_time(slot).await {
                Ok(time) => Some(time),
                Err(e) => {
                    debug!(error = %e, slot, "block time unavailable");
                    None
                }
            },
            None => None,
        };

        Ok(Confirmation {
            signature: signature.to_string(),
            slot,
            block_time,
        })
    }
}

fn status_slot(statuses: &[Option<TransactionStatus>]) -> Option<u64> {
    statuses.first()?.as_ref().map(|status| status.slot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_filters_translate_every_variant() {
        let filters = [
            AccountFilter::memcmp(8, vec![1]),
            AccountFilter::DataSize(120),
        ];
        let translated = RpcGateway::rpc_filters(&filters);
        assert_eq!(translated.len(), 2);
        assert!(matches!(translated[0], RpcFilterType::Memcmp(_)));
        assert_eq!(translated[1], RpcFilterType::DataSize(120));
    }

    #[test]
    fn test_gateway_from_config() {
        let gateway = RpcGateway::new(&SdkConfig::localnet()).unwrap();
        assert_eq!(gateway.program_id(), SdkConfig::localnet().program_id);
    }

    #[test]
    fn test_status_slot_requires_a_reported_status() {
        let confirmed = TransactionStatus {
            slot: 42,
            confirmations: None,
            status: Ok(()),
            err: None,
            confirmation_status: None,
        };
        assert_eq!(status_slot(&[Some(confirmed)]), Some(42));
        assert_eq!(status_slot(&[None]), None);
        assert_eq!(status_slot(&[]), None);
    }
}
