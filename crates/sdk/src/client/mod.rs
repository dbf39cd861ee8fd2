//! Query and mutation services
//!
//! [`DexloanClient`] is the single entry point for consumers. Queries read
//! through the optimistic cache; mutations follow one pipeline: identity
//! check, plan, reconciler execute, then exactly one notification.

mod hires;
mod loans;
mod offers;
mod options;
mod queries;

pub use hires::HireTerms;
pub use options::CallOptionTerms;

use anchor_lang::prelude::Pubkey;
use solana_sdk::signer::Signer;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use dexloan_math::{AmountFormatter, CollectionDirectory, FloorPrices};
use dexloan_types::{DexloanError, DexloanResult};

use crate::{
    cache::{MemoryQueryStore, MutationPlan, QueryStore, Reconciler},
    clock::{Clock, SystemClock},
    config::SdkConfig,
    gateway::{Confirmation, LedgerGateway, RetryingReader, RpcGateway},
    instructions::{
        call_option::CallOptionInstructionBuilder, hire::HireInstructionBuilder,
        loan::LoanInstructionBuilder, offer::OfferInstructionBuilder,
    },
    metadata::{MetadataCache, MetadataSource, RpcMetadataSource},
    model::Collection,
    notify::{Notifier, TracingNotifier},
    pda::PdaBuilder,
};

/// Signing identity shared across tasks
pub type Identity = Arc<dyn Signer + Send + Sync>;

/// Main SDK client for the Dexloan program
pub struct DexloanClient {
    config: SdkConfig,
    gateway: Arc<dyn LedgerGateway>,
    reader: RetryingReader,
    pda: Arc<PdaBuilder>,
    metadata: MetadataCache,
    collections: RwLock<HashMap<Pubkey, Collection>>,
    reconciler: Reconciler,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    formatter: AmountFormatter,
    directory: CollectionDirectory,
    identity: std::sync::RwLock<Option<Identity>>,
    loans: LoanInstructionBuilder,
    offers: OfferInstructionBuilder,
    options: CallOptionInstructionBuilder,
    hires: HireInstructionBuilder,
}

impl DexloanClient {
    /// Create a client against the RPC node named in `config`
    pub fn new(config: SdkConfig) -> DexloanResult<Self> {
        config.validate()?;
        let gateway: Arc<dyn LedgerGateway> = Arc::new(RpcGateway::new(&config)?);
        Ok(Self::builder(gateway).with_config(config).build())
    }

    /// Start from an existing gateway; everything else has a default
    pub fn builder(gateway: Arc<dyn LedgerGateway>) -> DexloanClientBuilder {
        DexloanClientBuilder::new(gateway)
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn gateway(&self) -> &Arc<dyn LedgerGateway> {
        &self.gateway
    }

    pub fn pda(&self) -> &PdaBuilder {
        &self.pda
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn metadata(&self) -> &MetadataCache {
        &self.metadata
    }

    pub fn formatter(&self) -> &AmountFormatter {
        &self.formatter
    }

    pub fn directory(&self) -> &CollectionDirectory {
        &self.directory
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Attach a signing identity
    pub fn connect(&self, identity: Identity) {
        info!(identity = %identity.pubkey(), "identity connected");
        if let Ok(mut current) = self.identity.write() {
            *current = Some(identity);
        }
    }

    pub fn disconnect(&self) {
        if let Ok(mut current) = self.identity.write() {
            if current.take().is_some() {
                info!("identity disconnected");
            }
        }
    }

    /// Public key of the connected identity, if any
    pub fn identity_key(&self) -> Option<Pubkey> {
        self.identity
            .read()
            .ok()
            .and_then(|current| current.as_ref().map(|signer| signer.pubkey()))
    }

    fn identity(&self) -> DexloanResult<Identity> {
        self.identity
            .read()
            .ok()
            .and_then(|current| current.clone())
            .ok_or(DexloanError::NotReady)
    }

    /// Floor prices used for loan-to-value ordering
    pub fn set_floor_prices(&self, prices: FloorPrices) {
        self.reconciler.set_floor_prices(prices);
    }

    /// Run a planned mutation and report the outcome exactly once
    async fn settle(&self, plan: DexloanResult<MutationPlan>) -> DexloanResult<Confirmation> {
        let outcome = match plan {
            Ok(plan) => self.execute(plan).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok((confirmation, message)) => {
                self.notifier.success(&message);
                Ok(confirmation)
            }
            Err(err) => {
                self.notifier.error(&err);
                Err(err)
            }
        }
    }

    async fn execute(&self, plan: MutationPlan) -> DexloanResult<(Confirmation, String)> {
        let signer = self.identity()?;
        let message = plan.success_message.clone();
        debug!(label = plan.label, patches = plan.speculative.len(), "executing plan");
        let confirmation = self
            .reconciler
            .execute(plan, self.gateway.as_ref(), signer.as_ref())
            .await?;
        Ok((confirmation, message))
    }
}

/// Assembles a [`DexloanClient`] from injected parts
pub struct DexloanClientBuilder {
    gateway: Arc<dyn LedgerGateway>,
    config: SdkConfig,
    metadata_source: Option<Arc<dyn MetadataSource>>,
    store: Option<Arc<dyn QueryStore>>,
    clock: Option<Arc<dyn Clock>>,
    notifier: Option<Arc<dyn Notifier>>,
    identity: Option<Identity>,
    directory: Option<CollectionDirectory>,
}

impl DexloanClientBuilder {
    fn new(gateway: Arc<dyn LedgerGateway>) -> Self {
        let config = SdkConfig::localnet().with_program_id(gateway.program_id());
        Self {
            gateway,
            config,
            metadata_source: None,
            store: None,
            clock: None,
            notifier: None,
            identity: None,
            directory: None,
        }
    }

    /// The gateway's program id always wins over the config's
    pub fn with_config(mut self, config: SdkConfig) -> Self {
        self.config = config.with_program_id(self.gateway.program_id());
        self
    }

    pub fn with_metadata_source(mut self, source: Arc<dyn MetadataSource>) -> Self {
        self.metadata_source = Some(source);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn QueryStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_directory(mut self, directory: CollectionDirectory) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn build(self) -> DexloanClient {
        let pda = Arc::new(PdaBuilder::new(self.gateway.program_id()));
        let source = self.metadata_source.unwrap_or_else(|| {
            Arc::new(RpcMetadataSource::new(self.gateway.clone(), pda.clone()))
        });
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryQueryStore::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let notifier = self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier));

        DexloanClient {
            reader: RetryingReader::new(self.gateway.clone(), self.config.retry.clone()),
            metadata: MetadataCache::new(source),
            collections: RwLock::new(HashMap::new()),
            reconciler: Reconciler::new(store, clock.clone()),
            clock,
            notifier,
            formatter: AmountFormatter::new(),
            directory: self
                .directory
                .unwrap_or_else(CollectionDirectory::with_default_collections),
            identity: std::sync::RwLock::new(self.identity),
            loans: LoanInstructionBuilder::new(pda.clone()),
            offers: OfferInstructionBuilder::new(pda.clone()),
            options: CallOptionInstructionBuilder::new(pda.clone()),
            hires: HireInstructionBuilder::new(pda.clone()),
            pda,
            gateway: self.gateway,
            config: self.config,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockGateway, RecordingNotifier};
    use solana_sdk::signature::Keypair;

    #[tokio::test]
    async fn test_mutation_without_identity_is_not_ready() {
        let gateway = Arc::new(MockGateway::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let client = DexloanClient::builder(gateway.clone())
            .with_notifier(notifier.clone())
            .build();

        let loan = crate::testing::fixtures::listed_loan(1_000_000_000, 1_000, 86_400);
        let result = client.close_loan(&loan).await;

        assert!(matches!(result, Err(DexloanError::NotReady)));
        assert_eq!(gateway.submission_count(), 0);
        assert_eq!(notifier.errors().len(), 1);
        assert!(notifier.successes().is_empty());
    }

    #[test]
    fn test_connect_and_disconnect() {
        let client = DexloanClient::builder(Arc::new(MockGateway::new())).build();
        assert!(client.identity_key().is_none());

        let keypair = Keypair::new();
        let expected = keypair.pubkey();
        client.connect(Arc::new(keypair));
        assert_eq!(client.identity_key(), Some(expected));

        client.disconnect();
        assert!(client.identity_key().is_none());
    }

    #[test]
    fn test_builder_takes_program_id_from_gateway() {
        let program_id = Pubkey::new_unique();
        let client = DexloanClient::builder(Arc::new(MockGateway::with_program_id(program_id)))
            .with_config(SdkConfig::devnet())
            .build();

        assert_eq!(client.config().program_id, program_id);
        assert_eq!(client.pda().program_id(), program_id);
    }
}
