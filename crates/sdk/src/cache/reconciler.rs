use solana_sdk::{instruction::Instruction, signer::Signer};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use dexloan_math::FloorPrices;
use dexloan_types::DexloanResult;

use super::{CacheEntry, Patch, PatchId, PatchTiming, QueryData, QueryGroup, QueryKind, QueryStore};
use crate::{
    clock::Clock,
    gateway::{Confirmation, LedgerGateway},
};

/// Builds patches from the ledger time of the confirming block
pub type ConfirmHook = Box<dyn FnOnce(i64) -> Vec<Patch> + Send>;

/// Everything needed to run one mutation
pub struct MutationPlan {
    pub id: Uuid,
    pub label: &'static str,
    pub success_message: String,
    pub instructions: Vec<Instruction>,
    pub speculative: Vec<Patch>,
    on_confirm: Option<ConfirmHook>,
}

impl MutationPlan {
    pub fn new(label: &'static str, success_message: impl Into<String>, instructions: Vec<Instruction>) -> Self {
        Self {
            id: Uuid::new_v4(),
            label,
            success_message: success_message.into(),
            instructions,
            speculative: Vec::new(),
            on_confirm: None,
        }
    }

    pub fn with_speculative(mut self, patch: Patch) -> Self {
        self.speculative.push(patch);
        self
    }

    /// Patches whose content depends on when the write landed
    pub fn with_on_confirm<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(i64) -> Vec<Patch> + Send + 'static,
    {
        self.on_confirm = Some(Box::new(hook));
        self
    }
}

/// Applies mutation plans to the query store
pub struct Reconciler {
    store: Arc<dyn QueryStore>,
    clock: Arc<dyn Clock>,
    prices: RwLock<FloorPrices>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn QueryStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            prices: RwLock::new(FloorPrices::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn QueryStore> {
        &self.store
    }

    /// Floor prices used to order lists by loan-to-value
    pub fn set_floor_prices(&self, prices: FloorPrices) {
        if let Ok(mut current) = self.prices.write() {
            *current = prices;
        }
    }

    pub fn floor_prices(&self) -> FloorPrices {
        self.prices.read().map(|p| p.clone()).unwrap_or_default()
    }

    /// Current view of a group, if it has ever been read
    pub fn view(&self, group: &QueryGroup) -> Option<QueryData> {
        let prices = self.floor_prices();
        self.store.get(group).map(|entry| entry.view(group, Some(&prices)))
    }

    /// Install an authoritative read and return the resulting view
    pub fn supersede(&self, group: &QueryGroup, data: QueryData) -> QueryData {
        let prices = self.floor_prices();
        let mut view = None;
        self.store.set(group, &mut |entry| {
            let entry = entry.get_or_insert_with(|| CacheEntry::new(data.clone()));
            entry.supersede(data.clone());
            view = Some(entry.view(group, Some(&prices)));
        });
        view.unwrap_or(data)
    }

    /// Stage one patch into every cached group whose view it changes
    pub fn stage(&self, id: PatchId, patch: &Patch, timing: PatchTiming) -> usize {
        let prices = self.floor_prices();
        let mut touched = 0;

        for &kind in patch.kinds() {
            for key in self.store.find_all_keys(kind) {
                self.store.set(&key, &mut |entry| {
                    let Some(entry) = entry.as_mut() else {
                        return;
                    };
                    let before = entry.view(&key, Some(&prices));
                    let mut after = before.clone();
                    patch.apply(&key, &mut after, Some(&prices));
                    if after != before && entry.stage(&key, id, patch.clone(), timing, Some(&prices)) {
                        touched += 1;
                    }
                });
            }
        }

        debug!(mutation = %id.mutation, ordinal = id.ordinal, touched, ?timing, "staged patch");
        touched
    }

    pub fn commit(&self, mutation: Uuid) {
        let prices = self.floor_prices();
        self.for_each_entry(|key, entry| entry.commit(key, mutation, Some(&prices)));
    }

    pub fn discard(&self, mutation: Uuid) -> usize {
        let mut discarded = 0;
        self.for_each_entry(|_, entry| discarded += entry.discard(mutation));
        discarded
    }

    fn for_each_entry(&self, mut f: impl FnMut(&QueryGroup, &mut CacheEntry)) {
        for kind in QueryKind::ALL {
            for key in self.store.find_all_keys(kind) {
                self.store.set(&key, &mut |entry| {
                    if let Some(entry) = entry.as_mut() {
                        f(&key, entry);
                    }
                });
            }
        }
    }

    /// Stage, submit, then commit or roll back
    pub async fn execute(
        &self,
        plan: MutationPlan,
        gateway: &dyn LedgerGateway,
        signer: &(dyn Signer + Send + Sync),
    ) -> DexloanResult<Confirmation> {
        let MutationPlan {
            id,
            label,
            instructions,
            speculative,
            on_confirm,
            ..
        } = plan;
        info!(mutation = %id, label, instructions = instructions.len(), "submitting mutation");

        let mut ordinal = 0u32;
        for patch in &speculative {
            self.stage(PatchId { mutation: id, ordinal }, patch, PatchTiming::Speculative);
            ordinal += 1;
        }

        match gateway.submit_mutation(&instructions, signer).await {
            Ok(confirmation) => {
                self.commit(id);
                if let Some(hook) = on_confirm {
                    let ledger_time = confirmation.block_time.unwrap_or_else(|| self.clock.now());
                    for patch in hook(ledger_time) {
                        self.stage(PatchId { mutation: id, ordinal }, &patch, PatchTiming::OnConfirm);
                        ordinal += 1;
                    }
                }
                info!(mutation = %id, label, signature = %confirmation.signature, "mutation confirmed");
                Ok(confirmation)
            }
            Err(err) => {
                let discarded = self.discard(id);
                warn!(mutation = %id, label, error = %err, discarded, "mutation failed, rolled back patches");
                Err(err)
            }
        }
    }
}
