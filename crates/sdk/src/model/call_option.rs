use anchor_lang::prelude::Pubkey;
use serde::{Deserialize, Serialize};

use dexloan_math::{creator_fee, format_expiry, format_expiry_long};
use dexloan_types::{
    serde_helpers::pubkey_serde, AccountRecord, CallOptionData, CallOptionState, DexloanError,
    DexloanResult,
};

use super::{is_identity, Collection, Entity, TokenMetadata};

/// A call option written against one NFT
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOption {
    #[serde(with = "pubkey_serde")]
    pub address: Pubkey,
    pub data: CallOptionData,
    pub metadata: TokenMetadata,
    pub collection: Collection,
}

/// Fields a call option transition may change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallOptionChanges {
    pub state: Option<CallOptionState>,
    pub buyer: Option<Pubkey>,
}

impl CallOption {
    pub fn new(
        address: Pubkey,
        data: CallOptionData,
        metadata: TokenMetadata,
        collection: Collection,
    ) -> Self {
        Self {
            address,
            data,
            metadata,
            collection,
        }
    }

    pub fn from_account(
        address: Pubkey,
        data: &[u8],
        metadata: TokenMetadata,
        collection: Collection,
    ) -> DexloanResult<Self> {
        Ok(Self::new(address, CallOptionData::decode(data)?, metadata, collection))
    }

    pub fn state(&self) -> CallOptionState {
        self.data.state
    }

    pub fn is_buyer(&self, identity: Option<&Pubkey>) -> bool {
        is_identity(self.data.buyer.as_ref(), identity)
    }

    pub fn is_seller(&self, identity: Option<&Pubkey>) -> bool {
        is_identity(Some(&self.data.seller), identity)
    }

    pub fn has_buyer(&self) -> bool {
        self.data.buyer.is_some()
    }

    pub fn expired(&self, now: i64) -> bool {
        now > self.data.expiry
    }

    /// Creator royalty taken from the premium
    pub fn creator_fee(&self) -> DexloanResult<u64> {
        creator_fee(self.data.amount, self.collection.option_basis_points())
    }

    pub fn expiry(&self) -> DexloanResult<String> {
        format_expiry(self.data.expiry)
    }

    pub fn expiry_long(&self) -> DexloanResult<String> {
        format_expiry_long(self.data.expiry)
    }

    /// The seller may close a listing, an exercised option, or one that lapsed
    pub fn can_close(&self, now: i64) -> bool {
        match self.data.state {
            CallOptionState::Listed | CallOptionState::Exercised => true,
            CallOptionState::Active => self.expired(now),
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Listed -> Active once the buyer pays the premium
    pub fn bought(&self, buyer: Pubkey, now: i64) -> DexloanResult<Self> {
        if self.data.state != CallOptionState::Listed {
            return Err(DexloanError::invalid_state(
                Self::NAME,
                "Listed",
                &self.data.state.to_string(),
            ));
        }
        if self.expired(now) {
            return Err(DexloanError::invalid_state(Self::NAME, "unexpired", "expired"));
        }
        let mut next = self.clone();
        next.data.state = CallOptionState::Active;
        next.data.buyer = Some(buyer);
        Ok(next)
    }

    /// Active -> Exercised by the buyer before expiry
    pub fn exercised(&self, buyer: &Pubkey, now: i64) -> DexloanResult<Self> {
        if self.data.state != CallOptionState::Active {
            return Err(DexloanError::invalid_state(
                Self::NAME,
                "Active",
                &self.data.state.to_string(),
            ));
        }
        if self.expired(now) {
            return Err(DexloanError::invalid_state(Self::NAME, "unexpired", "expired"));
        }
        if !self.is_buyer(Some(buyer)) {
            return Err(DexloanError::invalid_parameter(
                "buyer",
                &buyer.to_string(),
                "the option buyer",
            ));
        }
        let mut next = self.clone();
        next.data.state = CallOptionState::Exercised;
        Ok(next)
    }
}

impl Entity for CallOption {
    type Changes = CallOptionChanges;
    const NAME: &'static str = "call option";

    fn address(&self) -> &Pubkey {
        &self.address
    }

    fn changes(&self, next: &Self) -> CallOptionChanges {
        CallOptionChanges {
            state: (next.data.state != self.data.state).then_some(next.data.state),
            buyer: next.data.buyer.filter(|b| Some(*b) != self.data.buyer),
        }
    }

    fn merged(&self, changes: &CallOptionChanges) -> Self {
        let mut next = self.clone();
        if let Some(state) = changes.state {
            next.data.state = state;
        }
        if let Some(buyer) = changes.buyer {
            next.data.buyer = Some(buyer);
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_option_lifecycle() {
        let option = fixtures::listed_call_option(1_000, 5_000, 10_000);
        let buyer = Pubkey::new_unique();

        let active = option.bought(buyer, 5_000).unwrap();
        assert_eq!(active.state(), CallOptionState::Active);
        assert!(active.is_buyer(Some(&buyer)));
        assert!(active.bought(Pubkey::new_unique(), 5_000).is_err());

        let exercised = active.exercised(&buyer, 9_999).unwrap();
        assert_eq!(exercised.state(), CallOptionState::Exercised);
        assert!(exercised.can_close(0));
    }

    #[test]
    fn test_exercise_requires_buyer_and_time() {
        let option = fixtures::listed_call_option(1_000, 5_000, 10_000);
        let buyer = Pubkey::new_unique();
        let active = option.bought(buyer, 0).unwrap();

        assert!(active.exercised(&Pubkey::new_unique(), 100).is_err());
        assert!(matches!(
            active.exercised(&buyer, 10_001),
            Err(DexloanError::InvalidState { .. })
        ));
        assert!(!active.can_close(10_000));
        assert!(active.can_close(10_001));
    }

    #[test]
    fn test_expired_listing_cannot_be_bought() {
        let option = fixtures::listed_call_option(1_000, 5_000, 10_000);
        assert!(option.bought(Pubkey::new_unique(), 10_001).is_err());
        assert!(!option.is_buyer(None));
        assert!(option.is_seller(Some(&option.data.seller)));
    }
}
