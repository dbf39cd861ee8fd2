//! Test doubles for the client's collaborators
//!
//! Available to downstream crates as well, so integrations can run the full
//! query and mutation flow without a validator.

use anchor_lang::prelude::Pubkey;
use async_trait::async_trait;
use solana_sdk::{instruction::Instruction, signer::Signer};
use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::{
        atomic::{AtomicI64, AtomicUsize, Ordering},
        Mutex, MutexGuard,
    },
};

use dexloan_types::{AccountRecord, DexloanError, DexloanResult, PROGRAM_ID};

use crate::{
    clock::Clock,
    gateway::{AccountFilter, Confirmation, LedgerGateway, RawAccount},
    metadata::MetadataSource,
    model::{MetadataFile, TokenMetadata},
    notify::Notifier,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Ledger
// ============================================================================

#[derive(Default)]
struct MockLedger {
    accounts: BTreeMap<Pubkey, RawAccount>,
    /// Accounts that appear only after a number of missed reads
    delayed: HashMap<Pubkey, (Vec<u8>, u32)>,
    failing_reads: HashMap<Pubkey, u32>,
    reads: HashMap<Pubkey, u32>,
    outcomes: VecDeque<DexloanResult<Confirmation>>,
    submissions: Vec<Vec<Instruction>>,
    block_time: Option<i64>,
}

/// In-memory ledger with scripted submission outcomes
pub struct MockGateway {
    program_id: Pubkey,
    ledger: Mutex<MockLedger>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::with_program_id(PROGRAM_ID)
    }

    pub fn with_program_id(program_id: Pubkey) -> Self {
        Self {
            program_id,
            ledger: Mutex::new(MockLedger::default()),
        }
    }

    pub fn insert_raw(&self, address: Pubkey, data: Vec<u8>) {
        let account = RawAccount {
            address,
            owner: self.program_id,
            lamports: 1,
            data,
        };
        lock(&self.ledger).accounts.insert(address, account);
    }

    pub fn insert_record<T: AccountRecord>(&self, address: Pubkey, record: &T) -> DexloanResult<()> {
        self.insert_raw(address, record.encode()?);
        Ok(())
    }

    pub fn remove_account(&self, address: &Pubkey) {
        lock(&self.ledger).accounts.remove(address);
    }

    /// The account reads as missing `misses` times before it shows up
    pub fn reveal_after(&self, address: &Pubkey, data: Vec<u8>, misses: u32) {
        lock(&self.ledger).delayed.insert(*address, (data, misses));
    }

    /// The next `count` reads of the account fail with an RPC error
    pub fn fail_reads(&self, address: &Pubkey, count: u32) {
        lock(&self.ledger).failing_reads.insert(*address, count);
    }

    pub fn read_count(&self, address: &Pubkey) -> u32 {
        lock(&self.ledger).reads.get(address).copied().unwrap_or(0)
    }

    /// Queue the outcome of the next submission
    pub fn push_outcome(&self, outcome: DexloanResult<Confirmation>) {
        lock(&self.ledger).outcomes.push_back(outcome);
    }

    pub fn fail_next_submission(&self, error: DexloanError) {
        self.push_outcome(Err(error));
    }

    /// Block time reported by default confirmations
    pub fn set_block_time(&self, block_time: Option<i64>) {
        lock(&self.ledger).block_time = block_time;
    }

    pub fn submissions(&self) -> Vec<Vec<Instruction>> {
        lock(&self.ledger).submissions.clone()
    }

    pub fn submission_count(&self) -> usize {
        lock(&self.ledger).submissions.len()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerGateway for MockGateway {
    fn program_id(&self) -> Pubkey {
        self.program_id
    }

    async fn fetch_account(&self, address: &Pubkey) -> DexloanResult<RawAccount> {
        let mut ledger = lock(&self.ledger);
        *ledger.reads.entry(*address).or_insert(0) += 1;

        if let Some(remaining) = ledger.failing_reads.get_mut(address) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(DexloanError::rpc("mock rpc failure"));
            }
        }

        if let Some((_, misses)) = ledger.delayed.get_mut(address) {
            if *misses > 0 {
                *misses -= 1;
                return Err(DexloanError::NotFound { address: *address });
            }
            if let Some((data, _)) = ledger.delayed.remove(address) {
                let account = RawAccount {
                    address: *address,
                    owner: self.program_id,
                    lamports: 1,
                    data,
                };
                ledger.accounts.insert(*address, account);
            }
        }

        ledger
            .accounts
            .get(address)
            .cloned()
            .ok_or(DexloanError::NotFound { address: *address })
    }

    async fn fetch_accounts(&self, filters: &[AccountFilter]) -> DexloanResult<Vec<RawAccount>> {
        Ok(lock(&self.ledger)
            .accounts
            .values()
            .filter(|account| filters.iter().all(|f| f.matches(&account.data)))
            .cloned()
            .collect())
    }

    async fn submit_mutation(
        &self,
        instructions: &[Instruction],
        _signer: &(dyn Signer + Send + Sync),
    ) -> DexloanResult<Confirmation> {
        let mut ledger = lock(&self.ledger);
        ledger.submissions.push(instructions.to_vec());
        let slot = ledger.submissions.len() as u64;

        match ledger.outcomes.pop_front() {
            Some(outcome) => outcome,
            None => Ok(Confirmation {
                signature: format!("mock-signature-{}", slot),
                slot: Some(slot),
                block_time: ledger.block_time,
            }),
        }
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// Metadata served from memory
#[derive(Default)]
pub struct StaticMetadataSource {
    metadata: Mutex<HashMap<Pubkey, TokenMetadata>>,
    files: Mutex<HashMap<String, MetadataFile>>,
    fetches: AtomicUsize,
}

impl StaticMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, metadata: TokenMetadata) {
        lock(&self.metadata).insert(metadata.mint, metadata);
    }

    pub fn insert_file(&self, uri: &str, file: MetadataFile) {
        lock(&self.files).insert(uri.to_string(), file);
    }

    /// Number of metadata account lookups served
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataSource for StaticMetadataSource {
    async fn fetch_metadata(&self, mint: &Pubkey) -> DexloanResult<TokenMetadata> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        lock(&self.metadata)
            .get(mint)
            .cloned()
            .ok_or_else(|| DexloanError::Metadata {
                subject: mint.to_string(),
                reason: "no metadata account".to_string(),
            })
    }

    async fn fetch_metadata_file(&self, uri: &str) -> DexloanResult<MetadataFile> {
        lock(&self.files)
            .get(uri)
            .cloned()
            .ok_or_else(|| DexloanError::Metadata {
                subject: uri.to_string(),
                reason: "no metadata file".to_string(),
            })
    }
}

// ============================================================================
// Clock and notifications
// ============================================================================

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Success(String),
    Error(DexloanError),
}

/// Notifier that remembers everything it was told
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.notifications).clone()
    }

    pub fn successes(&self) -> Vec<String> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Success(message) => Some(message),
                Notification::Error(_) => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<DexloanError> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Error(error) => Some(error),
                Notification::Success(_) => None,
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        lock(&self.notifications).push(Notification::Success(message.to_string()));
    }

    fn error(&self, error: &DexloanError) {
        lock(&self.notifications).push(Notification::Error(error.clone()));
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Entity builders with realistic defaults
pub mod fixtures {
    use super::*;
    use crate::{
        model::{CallOption, Collection, Hire, Loan, LoanOffer},
        pda::{DerivedAddress, PdaBuilder},
    };
    use dexloan_types::{
        CallOptionData, CallOptionState, CollectionData, HireData, HireState, LoanData,
        LoanOfferData, LoanState,
    };

    fn address(derived: DexloanResult<DerivedAddress>) -> Pubkey {
        derived.map(|d| d.address).unwrap_or_default()
    }

    fn pda() -> PdaBuilder {
        PdaBuilder::new(PROGRAM_ID)
    }

    /// A collection with 5% loan royalty and 2% option royalty
    pub fn collection() -> Collection {
        let mint = Pubkey::new_unique();
        Collection::new(
            address(pda().collection(&mint)),
            CollectionData {
                authority: Pubkey::new_unique(),
                mint,
                loan_basis_points: 500,
                option_basis_points: 200,
                bump: 255,
            },
        )
    }

    pub fn metadata(mint: Pubkey, collection: &Collection) -> TokenMetadata {
        TokenMetadata::new(
            mint,
            "Chicken #1",
            "CHKN",
            "https://arweave.net/chicken",
            Some(collection.data.mint),
        )
    }

    pub fn listed_loan(amount: u64, basis_points: u32, duration: i64) -> Loan {
        listed_loan_in(&collection(), Pubkey::new_unique(), amount, basis_points, duration)
    }

    pub fn listed_loan_in(
        collection: &Collection,
        borrower: Pubkey,
        amount: u64,
        basis_points: u32,
        duration: i64,
    ) -> Loan {
        let mint = Pubkey::new_unique();
        Loan::new(
            address(pda().loan(&mint, &borrower)),
            LoanData {
                state: LoanState::Listed,
                collection: collection.address,
                borrower,
                lender: None,
                amount,
                outstanding: amount,
                basis_points,
                duration,
                start_date: None,
                mint,
                bump: 255,
            },
            metadata(mint, collection),
            collection.clone(),
        )
    }

    pub fn loan_offer(
        collection: &Collection,
        lender: Pubkey,
        id: u8,
        amount: u64,
        duration: i64,
        basis_points: u32,
    ) -> LoanOffer {
        LoanOffer::new(
            address(pda().loan_offer(&collection.address, &lender, id)),
            LoanOfferData {
                collection: collection.address,
                lender,
                id,
                amount,
                duration,
                basis_points,
                bump: 255,
            },
            collection.clone(),
        )
    }

    pub fn listed_call_option(amount: u64, strike_price: u64, expiry: i64) -> CallOption {
        listed_call_option_in(&collection(), Pubkey::new_unique(), amount, strike_price, expiry)
    }

    pub fn listed_call_option_in(
        collection: &Collection,
        seller: Pubkey,
        amount: u64,
        strike_price: u64,
        expiry: i64,
    ) -> CallOption {
        let mint = Pubkey::new_unique();
        CallOption::new(
            address(pda().call_option(&mint, &seller)),
            CallOptionData {
                state: CallOptionState::Listed,
                collection: collection.address,
                seller,
                buyer: None,
                amount,
                strike_price,
                expiry,
                mint,
                bump: 255,
            },
            metadata(mint, collection),
            collection.clone(),
        )
    }

    pub fn listed_hire(amount: u64, expiry: i64) -> Hire {
        listed_hire_in(&collection(), Pubkey::new_unique(), amount, expiry)
    }

    pub fn listed_hire_in(collection: &Collection, lender: Pubkey, amount: u64, expiry: i64) -> Hire {
        let mint = Pubkey::new_unique();
        Hire::new(
            address(pda().hire(&mint, &lender)),
            HireData {
                state: HireState::Listed,
                collection: collection.address,
                lender,
                borrower: None,
                amount,
                expiry,
                current_start: None,
                current_expiry: None,
                escrow_balance: 0,
                mint,
                bump: 255,
            },
            metadata(mint, collection),
            collection.clone(),
        )
    }
}
