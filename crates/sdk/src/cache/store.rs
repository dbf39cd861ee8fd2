use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, MutexGuard},
};

use dexloan_math::FloorPrices;
use uuid::Uuid;

use super::{Patch, PatchId, PatchTiming, QueryData, QueryGroup, QueryKind};

/// Ids of settled patches remembered per entry for idempotent staging
const SETTLED_HISTORY: usize = 256;

/// A patch waiting for its mutation to settle
#[derive(Debug, Clone, PartialEq)]
pub struct StagedPatch {
    pub id: PatchId,
    pub patch: Patch,
}

/// Cached value of one query group
///
/// `base` is the last authoritative read and `confirmed` is that read with
/// the patches of confirmed writes folded in. `pending` holds patches of
/// writes still in flight. An authoritative read replaces both data layers
/// and retires every pending patch.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    base: QueryData,
    confirmed: QueryData,
    pending: Vec<StagedPatch>,
    settled: VecDeque<PatchId>,
    unread_writes: bool,
}

impl CacheEntry {
    pub fn new(base: QueryData) -> Self {
        Self {
            confirmed: base.clone(),
            base,
            pending: Vec::new(),
            settled: VecDeque::new(),
            unread_writes: false,
        }
    }

    pub fn base(&self) -> &QueryData {
        &self.base
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Confirmed writes landed since the last authoritative read
    pub fn has_unread_writes(&self) -> bool {
        self.unread_writes
    }

    /// Data as seen by readers
    pub fn view(&self, group: &QueryGroup, prices: Option<&FloorPrices>) -> QueryData {
        let mut data = self.confirmed.clone();
        for staged in &self.pending {
            staged.patch.apply(group, &mut data, prices);
        }
        data
    }

    fn contains(&self, id: &PatchId) -> bool {
        self.settled.contains(id) || self.pending.iter().any(|staged| staged.id == *id)
    }

    fn settle(&mut self, id: PatchId) {
        if self.settled.len() == SETTLED_HISTORY {
            self.settled.pop_front();
        }
        self.settled.push_back(id);
    }

    fn fold(&mut self, group: &QueryGroup, staged: StagedPatch, prices: Option<&FloorPrices>) {
        staged.patch.apply(group, &mut self.confirmed, prices);
        self.settle(staged.id);
        self.unread_writes = true;
    }

    /// Stage a patch; an id already seen is ignored
    pub fn stage(
        &mut self,
        group: &QueryGroup,
        id: PatchId,
        patch: Patch,
        timing: PatchTiming,
        prices: Option<&FloorPrices>,
    ) -> bool {
        if self.contains(&id) {
            return false;
        }

        let staged = StagedPatch { id, patch };
        match timing {
            PatchTiming::Speculative => self.pending.push(staged),
            PatchTiming::OnConfirm => self.fold(group, staged, prices),
        }
        true
    }

    /// Fold the pending patches of a confirmed mutation into the entry
    pub fn commit(&mut self, group: &QueryGroup, mutation: Uuid, prices: Option<&FloorPrices>) {
        let (confirmed, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|staged| staged.id.mutation == mutation);
        self.pending = pending;
        for staged in confirmed {
            self.fold(group, staged, prices);
        }
    }

    /// Roll back the pending patches of a failed mutation
    pub fn discard(&mut self, mutation: Uuid) -> usize {
        let before = self.pending.len();
        self.pending.retain(|staged| staged.id.mutation != mutation);
        before - self.pending.len()
    }

    /// Replace the entry with a fresh authoritative read
    ///
    /// Pending patches are retired, so the later commit or discard of their
    /// mutation leaves the read untouched.
    pub fn supersede(&mut self, data: QueryData) {
        for staged in std::mem::take(&mut self.pending) {
            self.settle(staged.id);
        }
        self.confirmed = data.clone();
        self.base = data;
        self.unread_writes = false;
    }
}

/// Keyed storage for cache entries
///
/// `set` runs the updater under the store's lock so concurrent mutations
/// never interleave within one entry.
pub trait QueryStore: Send + Sync {
    fn get(&self, key: &QueryGroup) -> Option<CacheEntry>;

    fn set(&self, key: &QueryGroup, update: &mut dyn FnMut(&mut Option<CacheEntry>));

    fn find_all_keys(&self, kind: QueryKind) -> Vec<QueryGroup>;

    fn remove(&self, key: &QueryGroup) {
        self.set(key, &mut |entry| *entry = None);
    }
}

/// In-process store guarded by a single lock
#[derive(Default)]
pub struct MemoryQueryStore {
    entries: Mutex<HashMap<QueryGroup, CacheEntry>>,
}

impl MemoryQueryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<QueryGroup, CacheEntry>> {
        // A panicked updater leaves the map structurally intact
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl QueryStore for MemoryQueryStore {
    fn get(&self, key: &QueryGroup) -> Option<CacheEntry> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &QueryGroup, update: &mut dyn FnMut(&mut Option<CacheEntry>)) {
        let mut entries = self.entries();
        let mut entry = entries.remove(key);
        update(&mut entry);
        if let Some(entry) = entry {
            entries.insert(key.clone(), entry);
        }
    }

    fn find_all_keys(&self, kind: QueryKind) -> Vec<QueryGroup> {
        self.entries()
            .keys()
            .filter(|key| key.kind() == kind)
            .cloned()
            .collect()
    }
}
