//! Speculative patches and the data they act on

use anchor_lang::prelude::Pubkey;
use uuid::Uuid;

use dexloan_math::FloorPrices;

use super::{QueryGroup, QueryKind};
use crate::{
    model::{
        CallOption, CallOptionChanges, Entity, GroupedLoanOffer, Hire, HireChanges, Loan,
        LoanChanges, LoanOffer, OfferTerms, SortOrder, Terms,
    },
    pda::EntityKind,
};

/// Cached value of one query group
#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
    Loans(Vec<Loan>),
    Loan(Option<Loan>),
    LoanOffers(Vec<LoanOffer>),
    GroupedLoanOffers(Vec<GroupedLoanOffer>),
    CallOptions(Vec<CallOption>),
    CallOption(Option<CallOption>),
    Hires(Vec<Hire>),
    Hire(Option<Hire>),
}

impl QueryData {
    pub fn kind(&self) -> QueryKind {
        match self {
            Self::Loans(_) => QueryKind::Loans,
            Self::Loan(_) => QueryKind::Loan,
            Self::LoanOffers(_) => QueryKind::LoanOffers,
            Self::GroupedLoanOffers(_) => QueryKind::GroupedLoanOffers,
            Self::CallOptions(_) => QueryKind::CallOptions,
            Self::CallOption(_) => QueryKind::CallOption,
            Self::Hires(_) => QueryKind::Hires,
            Self::Hire(_) => QueryKind::Hire,
        }
    }

    pub fn into_loans(self) -> Option<Vec<Loan>> {
        match self {
            Self::Loans(loans) => Some(loans),
            _ => None,
        }
    }

    pub fn into_loan(self) -> Option<Loan> {
        match self {
            Self::Loan(loan) => loan,
            _ => None,
        }
    }

    pub fn into_loan_offers(self) -> Option<Vec<LoanOffer>> {
        match self {
            Self::LoanOffers(offers) => Some(offers),
            _ => None,
        }
    }

    pub fn into_grouped_loan_offers(self) -> Option<Vec<GroupedLoanOffer>> {
        match self {
            Self::GroupedLoanOffers(groups) => Some(groups),
            _ => None,
        }
    }

    pub fn into_call_options(self) -> Option<Vec<CallOption>> {
        match self {
            Self::CallOptions(options) => Some(options),
            _ => None,
        }
    }

    pub fn into_call_option(self) -> Option<CallOption> {
        match self {
            Self::CallOption(option) => option,
            _ => None,
        }
    }

    pub fn into_hires(self) -> Option<Vec<Hire>> {
        match self {
            Self::Hires(hires) => Some(hires),
            _ => None,
        }
    }

    pub fn into_hire(self) -> Option<Hire> {
        match self {
            Self::Hire(hire) => hire,
            _ => None,
        }
    }
}

/// Full predicted state of one entity
#[derive(Debug, Clone, PartialEq)]
pub enum EntitySnapshot {
    Loan(Loan),
    LoanOffer(LoanOffer),
    CallOption(CallOption),
    Hire(Hire),
}

impl EntitySnapshot {
    pub fn address(&self) -> &Pubkey {
        match self {
            Self::Loan(loan) => loan.address(),
            Self::LoanOffer(offer) => offer.address(),
            Self::CallOption(option) => option.address(),
            Self::Hire(hire) => hire.address(),
        }
    }
}

/// Field-level delta for one entity
#[derive(Debug, Clone, PartialEq)]
pub enum EntityChanges {
    Loan(LoanChanges),
    CallOption(CallOptionChanges),
    Hire(HireChanges),
}

/// An idempotent edit of cached query data
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// Insert or replace by address; lists drop the entity when it no longer matches
    Upsert(EntitySnapshot),
    /// Merge fields into the cached entity; lists the predicted `next`
    /// newly matches gain it, lists it stops matching lose it
    Merge {
        address: Pubkey,
        changes: EntityChanges,
        next: EntitySnapshot,
    },
    /// Drop an entity whose account was closed
    Remove { kind: EntityKind, address: Pubkey },
    /// Add offers to their group, creating it when absent
    JoinGroup(GroupedLoanOffer),
    /// Take one offer out of its group; the group goes at zero
    LeaveGroup { terms: OfferTerms, collection: Pubkey },
}

/// Identity of one staged patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatchId {
    pub mutation: Uuid,
    pub ordinal: u32,
}

/// When a patch is staged relative to submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchTiming {
    /// Before submission; rolled back if the write fails
    Speculative,
    /// After confirmation, derived from the confirming block
    OnConfirm,
}

/// Entities that have a snapshot and a delta variant
pub trait Patchable: Entity {
    fn snapshot(&self) -> EntitySnapshot;

    fn delta(changes: Self::Changes) -> EntityChanges;
}

impl Patchable for Loan {
    fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot::Loan(self.clone())
    }

    fn delta(changes: LoanChanges) -> EntityChanges {
        EntityChanges::Loan(changes)
    }
}

impl Patchable for CallOption {
    fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot::CallOption(self.clone())
    }

    fn delta(changes: CallOptionChanges) -> EntityChanges {
        EntityChanges::CallOption(changes)
    }
}

impl Patchable for Hire {
    fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot::Hire(self.clone())
    }

    fn delta(changes: HireChanges) -> EntityChanges {
        EntityChanges::Hire(changes)
    }
}

impl Patch {
    /// Move a cached entity from `current` to `next`
    pub fn merge<T: Patchable>(current: &T, next: &T) -> Self {
        Self::Merge {
            address: *current.address(),
            changes: T::delta(current.changes(next)),
            next: next.snapshot(),
        }
    }

    /// Query kinds this patch can touch
    pub fn kinds(&self) -> &'static [QueryKind] {
        match self {
            Self::Upsert(EntitySnapshot::Loan(_))
            | Self::Merge {
                changes: EntityChanges::Loan(_),
                ..
            }
            | Self::Remove {
                kind: EntityKind::Loan,
                ..
            } => &[QueryKind::Loans, QueryKind::Loan],
            Self::Upsert(EntitySnapshot::LoanOffer(_))
            | Self::Remove {
                kind: EntityKind::LoanOffer,
                ..
            } => &[QueryKind::LoanOffers],
            Self::Upsert(EntitySnapshot::CallOption(_))
            | Self::Merge {
                changes: EntityChanges::CallOption(_),
                ..
            }
            | Self::Remove {
                kind: EntityKind::CallOption,
                ..
            } => &[QueryKind::CallOptions, QueryKind::CallOption],
            Self::Upsert(EntitySnapshot::Hire(_))
            | Self::Merge {
                changes: EntityChanges::Hire(_),
                ..
            }
            | Self::Remove {
                kind: EntityKind::Hire,
                ..
            } => &[QueryKind::Hires, QueryKind::Hire],
            Self::JoinGroup(_) | Self::LeaveGroup { .. } => &[QueryKind::GroupedLoanOffers],
            Self::Remove { .. } => &[],
        }
    }

    /// Apply to the data of `group`; patches for other shapes are ignored
    pub fn apply(&self, group: &QueryGroup, data: &mut QueryData, prices: Option<&FloorPrices>) {
        match (group, data) {
            (QueryGroup::Loans(query), QueryData::Loans(loans)) => {
                match self {
                    Self::Upsert(EntitySnapshot::Loan(loan)) => {
                        upsert(loans, loan, query.matches(loan))
                    }
                    Self::Merge {
                        address,
                        changes: EntityChanges::Loan(changes),
                        next: EntitySnapshot::Loan(next),
                    } => merge(loans, address, changes, next, |l| query.matches(l)),
                    Self::Remove {
                        kind: EntityKind::Loan,
                        address,
                    } => remove(loans, address),
                    _ => return,
                }
                sort(loans, &query.sort, prices);
            }
            (QueryGroup::Loan(key), QueryData::Loan(slot)) => match self {
                Self::Upsert(EntitySnapshot::Loan(loan)) if loan.address == *key => {
                    *slot = Some(loan.clone())
                }
                Self::Merge {
                    address,
                    changes: EntityChanges::Loan(changes),
                    ..
                } if address == key => merge_slot(slot, changes),
                Self::Remove {
                    kind: EntityKind::Loan,
                    address,
                } if address == key => *slot = None,
                _ => {}
            },
            (QueryGroup::LoanOffers(query), QueryData::LoanOffers(offers)) => {
                match self {
                    Self::Upsert(EntitySnapshot::LoanOffer(offer)) => {
                        upsert(offers, offer, query.matches(offer))
                    }
                    Self::Remove {
                        kind: EntityKind::LoanOffer,
                        address,
                    } => remove(offers, address),
                    _ => return,
                }
                sort(offers, &query.sort, prices);
            }
            (QueryGroup::GroupedLoanOffers(query), QueryData::GroupedLoanOffers(groups)) => {
                match self {
                    Self::JoinGroup(joining) if query.matches(joining) => {
                        match groups
                            .iter_mut()
                            .find(|g| g.contains(&joining.terms, &joining.collection.address))
                        {
                            Some(group) => group.count = group.count.saturating_add(joining.count),
                            None => groups.push(joining.clone()),
                        }
                    }
                    Self::LeaveGroup { terms, collection } => {
                        if let Some(index) = groups.iter().position(|g| g.contains(terms, collection)) {
                            let group = &mut groups[index];
                            group.count = group.count.saturating_sub(1);
                            if group.count == 0 {
                                groups.remove(index);
                            }
                        }
                    }
                    _ => return,
                }
                sort(groups, &query.sort, prices);
            }
            (QueryGroup::CallOptions(query), QueryData::CallOptions(options)) => match self {
                Self::Upsert(EntitySnapshot::CallOption(option)) => {
                    upsert(options, option, query.matches(option))
                }
                Self::Merge {
                    address,
                    changes: EntityChanges::CallOption(changes),
                    next: EntitySnapshot::CallOption(next),
                } => merge(options, address, changes, next, |o| query.matches(o)),
                Self::Remove {
                    kind: EntityKind::CallOption,
                    address,
                } => remove(options, address),
                _ => {}
            },
            (QueryGroup::CallOption(key), QueryData::CallOption(slot)) => match self {
                Self::Upsert(EntitySnapshot::CallOption(option)) if option.address == *key => {
                    *slot = Some(option.clone())
                }
                Self::Merge {
                    address,
                    changes: EntityChanges::CallOption(changes),
                    ..
                } if address == key => merge_slot(slot, changes),
                Self::Remove {
                    kind: EntityKind::CallOption,
                    address,
                } if address == key => *slot = None,
                _ => {}
            },
            (QueryGroup::Hires(query), QueryData::Hires(hires)) => match self {
                Self::Upsert(EntitySnapshot::Hire(hire)) => upsert(hires, hire, query.matches(hire)),
                Self::Merge {
                    address,
                    changes: EntityChanges::Hire(changes),
                    next: EntitySnapshot::Hire(next),
                } => merge(hires, address, changes, next, |h| query.matches(h)),
                Self::Remove {
                    kind: EntityKind::Hire,
                    address,
                } => remove(hires, address),
                _ => {}
            },
            (QueryGroup::Hire(key), QueryData::Hire(slot)) => match self {
                Self::Upsert(EntitySnapshot::Hire(hire)) if hire.address == *key => {
                    *slot = Some(hire.clone())
                }
                Self::Merge {
                    address,
                    changes: EntityChanges::Hire(changes),
                    ..
                } if address == key => merge_slot(slot, changes),
                Self::Remove {
                    kind: EntityKind::Hire,
                    address,
                } if address == key => *slot = None,
                _ => {}
            },
            _ => {}
        }
    }
}

fn upsert<T: Entity>(items: &mut Vec<T>, next: &T, belongs: bool) {
    let position = items.iter().position(|item| item.address() == next.address());
    match (position, belongs) {
        (Some(index), true) => items[index] = next.clone(),
        (None, true) => items.push(next.clone()),
        (Some(index), false) => {
            items.remove(index);
        }
        (None, false) => {}
    }
}

fn merge<T: Entity>(
    items: &mut Vec<T>,
    address: &Pubkey,
    changes: &T::Changes,
    predicted: &T,
    belongs: impl Fn(&T) -> bool,
) {
    match items.iter().position(|item| item.address() == address) {
        Some(index) => {
            let next = items[index].merged(changes);
            if belongs(&next) {
                items[index] = next;
            } else {
                items.remove(index);
            }
        }
        None if belongs(predicted) => items.push(predicted.clone()),
        None => {}
    }
}

fn merge_slot<T: Entity>(slot: &mut Option<T>, changes: &T::Changes) {
    if let Some(current) = slot.as_mut() {
        *current = current.merged(changes);
    }
}

fn remove<T: Entity>(items: &mut Vec<T>, address: &Pubkey) {
    items.retain(|item| item.address() != address);
}

fn sort<T: Terms>(items: &mut [T], order: &SortOrder, prices: Option<&FloorPrices>) {
    order.sort(items, prices);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{GroupedOfferQuery, LoanQuery};
    use crate::testing::fixtures;
    use dexloan_types::LoanState;

    #[test]
    fn test_upsert_respects_group_filter() {
        let loan = fixtures::listed_loan(1_000, 100, 60);
        let patch = Patch::Upsert(EntitySnapshot::Loan(loan.clone()));

        let same = QueryGroup::Loans(LoanQuery::all().with_collection(loan.data.collection));
        let mut data = QueryData::Loans(vec![]);
        patch.apply(&same, &mut data, None);
        assert_eq!(data, QueryData::Loans(vec![loan.clone()]));

        // Applying twice leaves one copy
        patch.apply(&same, &mut data, None);
        assert_eq!(data, QueryData::Loans(vec![loan]));

        let other = QueryGroup::Loans(LoanQuery::all().with_collection(Pubkey::new_unique()));
        let mut data = QueryData::Loans(vec![]);
        patch.apply(&other, &mut data, None);
        assert_eq!(data, QueryData::Loans(vec![]));
    }

    #[test]
    fn test_merge_drops_entity_leaving_state_filter() {
        let loan = fixtures::listed_loan(1_000, 100, 60);
        let group = QueryGroup::Loans(LoanQuery::all().with_state(LoanState::Listed));
        let mut data = QueryData::Loans(vec![loan.clone()]);

        let cancelled = loan.cancelled().unwrap();
        Patch::merge(&loan, &cancelled).apply(&group, &mut data, None);
        assert_eq!(data, QueryData::Loans(vec![]));

        let single = QueryGroup::Loan(loan.address);
        let mut data = QueryData::Loan(Some(loan.clone()));
        Patch::merge(&loan, &cancelled).apply(&single, &mut data, None);
        assert_eq!(data, QueryData::Loan(Some(cancelled)));
    }

    #[test]
    fn test_merge_adds_entity_entering_state_filter() {
        let active = fixtures::listed_loan(1_000, 100, 60)
            .activate(Pubkey::new_unique(), 10)
            .unwrap();
        let repaid = active.repaid().unwrap();
        let patch = Patch::merge(&active, &repaid);

        let group = QueryGroup::Loans(LoanQuery::all().with_state(LoanState::Repaid));
        let mut data = QueryData::Loans(vec![]);
        patch.apply(&group, &mut data, None);
        assert_eq!(data, QueryData::Loans(vec![repaid.clone()]));

        // Applying again keeps one copy
        patch.apply(&group, &mut data, None);
        assert_eq!(data, QueryData::Loans(vec![repaid]));
    }

    #[test]
    fn test_group_join_and_leave() {
        let collection = fixtures::collection();
        let offer = fixtures::loan_offer(&collection, Pubkey::new_unique(), 0, 1_000, 60, 500);
        let group = QueryGroup::GroupedLoanOffers(GroupedOfferQuery::all());
        let mut data = QueryData::GroupedLoanOffers(vec![]);

        Patch::JoinGroup(GroupedLoanOffer::new(offer.terms(), collection.clone(), 2))
            .apply(&group, &mut data, None);
        Patch::JoinGroup(GroupedLoanOffer::new(offer.terms(), collection.clone(), 1))
            .apply(&group, &mut data, None);
        let count = |data: &QueryData| match data {
            QueryData::GroupedLoanOffers(groups) => groups.iter().map(|g| g.count).sum::<u32>(),
            _ => 0,
        };
        assert_eq!(count(&data), 3);

        let leave = Patch::LeaveGroup {
            terms: offer.terms(),
            collection: collection.address,
        };
        for _ in 0..3 {
            leave.apply(&group, &mut data, None);
        }
        assert_eq!(data, QueryData::GroupedLoanOffers(vec![]));

        // Leaving an empty group is a no-op
        leave.apply(&group, &mut data, None);
        assert_eq!(data, QueryData::GroupedLoanOffers(vec![]));
    }

    #[test]
    fn test_lists_stay_sorted() {
        let cheap = fixtures::listed_loan(100, 100, 60);
        let pricey = fixtures::listed_loan(900, 100, 60);
        let group = QueryGroup::Loans(LoanQuery::all());
        let mut data = QueryData::Loans(vec![pricey.clone()]);

        Patch::Upsert(EntitySnapshot::Loan(cheap.clone())).apply(&group, &mut data, None);
        assert_eq!(data, QueryData::Loans(vec![cheap, pricey]));
    }
}
