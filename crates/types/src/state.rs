//! Raw ledger records as laid out by the listings program
//!
//! Every account is an 8-byte anchor discriminator followed by a borsh body.
//! The fields that clients filter on (state, collection, owner roles) come
//! first so their byte offsets are fixed.

use anchor_lang::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::DISCRIMINATOR_SIZE;
use crate::errors::DexloanError;
use crate::serde_helpers::{hex_i64, hex_u64, option_hex_i64, option_pubkey_serde, pubkey_serde};
use crate::DexloanResult;

/// Decoding and encoding shared by all program accounts
pub trait AccountRecord: AnchorSerialize + AnchorDeserialize + Sized {
    /// Account type name, used in error messages
    const NAME: &'static str;

    /// sha256("account:<Name>")[..8]
    const DISCRIMINATOR: [u8; 8];

    /// Decode raw account data, checking the discriminator
    fn decode(data: &[u8]) -> DexloanResult<Self> {
        if data.len() < DISCRIMINATOR_SIZE {
            return Err(DexloanError::deserialization(
                Self::NAME,
                format!("account data too short ({} bytes)", data.len()),
            ));
        }

        let (discriminator, mut body) = data.split_at(DISCRIMINATOR_SIZE);
        if discriminator != Self::DISCRIMINATOR {
            return Err(DexloanError::deserialization(
                Self::NAME,
                "discriminator mismatch",
            ));
        }

        Self::deserialize(&mut body).map_err(|e| DexloanError::deserialization(Self::NAME, e))
    }

    /// Encode into account data, discriminator first
    fn encode(&self) -> DexloanResult<Vec<u8>> {
        let mut data = Self::DISCRIMINATOR.to_vec();
        self.serialize(&mut data)
            .map_err(|e| DexloanError::Serialization(e.to_string()))?;
        Ok(data)
    }
}

// ============================================================================
// Lifecycle States
// ============================================================================

#[derive(
    AnchorSerialize, AnchorDeserialize, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash,
)]
pub enum LoanState {
    Listed,
    Active,
    Repaid,
    Cancelled,
    Defaulted,
}

impl LoanState {
    /// Byte written on the ledger for this state
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Terminal states leave the account eligible for closure
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Repaid | Self::Cancelled | Self::Defaulted)
    }
}

impl fmt::Display for LoanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(
    AnchorSerialize, AnchorDeserialize, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash,
)]
pub enum CallOptionState {
    Listed,
    Active,
    Exercised,
}

impl CallOptionState {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for CallOptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(
    AnchorSerialize, AnchorDeserialize, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash,
)]
pub enum HireState {
    Listed,
    Hired,
}

impl HireState {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for HireState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ============================================================================
// Loan
// ============================================================================

#[derive(AnchorSerialize, AnchorDeserialize, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoanData {
    /// Lifecycle state
    pub state: LoanState,
    /// Collection account the collateral belongs to
    #[serde(with = "pubkey_serde")]
    pub collection: Pubkey,
    /// The NFT holder
    #[serde(with = "pubkey_serde")]
    pub borrower: Pubkey,
    /// The issuer of the loan, set when the loan becomes active
    #[serde(with = "option_pubkey_serde")]
    pub lender: Option<Pubkey>,
    /// Principal in lamports
    #[serde(with = "hex_u64")]
    pub amount: u64,
    /// Principal still owed
    #[serde(with = "hex_u64")]
    pub outstanding: u64,
    /// Annualized rate in basis points
    pub basis_points: u32,
    /// Duration of the loan in seconds
    #[serde(with = "hex_i64")]
    pub duration: i64,
    /// Unix timestamp the loan became active
    #[serde(with = "option_hex_i64")]
    pub start_date: Option<i64>,
    /// The mint of the token being used for collateral
    #[serde(with = "pubkey_serde")]
    pub mint: Pubkey,
    pub bump: u8,
}

impl LoanData {
    pub const STATE_OFFSET: usize = 8;
    pub const COLLECTION_OFFSET: usize = 9;
    pub const BORROWER_OFFSET: usize = 41;
    pub const LENDER_OFFSET: usize = 73;
}

impl AccountRecord for LoanData {
    const NAME: &'static str = "Loan";
    const DISCRIMINATOR: [u8; 8] = [20, 195, 70, 117, 165, 227, 182, 1];
}

// ============================================================================
// Loan Offer
// ============================================================================

#[derive(AnchorSerialize, AnchorDeserialize, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoanOfferData {
    #[serde(with = "pubkey_serde")]
    pub collection: Pubkey,
    #[serde(with = "pubkey_serde")]
    pub lender: Pubkey,
    /// Per-lender, per-collection offer slot
    #[serde(rename = "offerId")]
    pub id: u8,
    #[serde(with = "hex_u64")]
    pub amount: u64,
    #[serde(with = "hex_i64")]
    pub duration: i64,
    pub basis_points: u32,
    pub bump: u8,
}

impl LoanOfferData {
    pub const COLLECTION_OFFSET: usize = 8;
    pub const LENDER_OFFSET: usize = 40;
    pub const ID_OFFSET: usize = 72;
    pub const AMOUNT_OFFSET: usize = 73;
    pub const DURATION_OFFSET: usize = 81;
    pub const BASIS_POINTS_OFFSET: usize = 89;
}

impl AccountRecord for LoanOfferData {
    const NAME: &'static str = "LoanOffer";
    const DISCRIMINATOR: [u8; 8] = [216, 231, 124, 134, 199, 190, 126, 158];
}

// ============================================================================
// Call Option
// ============================================================================

#[derive(AnchorSerialize, AnchorDeserialize, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CallOptionData {
    pub state: CallOptionState,
    #[serde(with = "pubkey_serde")]
    pub collection: Pubkey,
    /// The issuer of the call option
    #[serde(with = "pubkey_serde")]
    pub seller: Pubkey,
    /// The buyer, set once the premium is paid
    #[serde(with = "option_pubkey_serde")]
    pub buyer: Option<Pubkey>,
    /// Premium in lamports
    #[serde(with = "hex_u64")]
    pub amount: u64,
    #[serde(with = "hex_u64")]
    pub strike_price: u64,
    /// Absolute expiry timestamp
    #[serde(with = "hex_i64")]
    pub expiry: i64,
    #[serde(with = "pubkey_serde")]
    pub mint: Pubkey,
    pub bump: u8,
}

impl CallOptionData {
    pub const STATE_OFFSET: usize = 8;
    pub const COLLECTION_OFFSET: usize = 9;
    pub const SELLER_OFFSET: usize = 41;
    pub const BUYER_OFFSET: usize = 73;
}

impl AccountRecord for CallOptionData {
    const NAME: &'static str = "CallOption";
    const DISCRIMINATOR: [u8; 8] = [168, 1, 60, 60, 6, 88, 138, 183];
}

// ============================================================================
// Hire
// ============================================================================

#[derive(AnchorSerialize, AnchorDeserialize, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HireData {
    pub state: HireState,
    #[serde(with = "pubkey_serde")]
    pub collection: Pubkey,
    /// The NFT owner lending use-rights
    #[serde(with = "pubkey_serde")]
    pub lender: Pubkey,
    /// The current hirer
    #[serde(with = "option_pubkey_serde")]
    pub borrower: Option<Pubkey>,
    /// Daily cost to hire
    #[serde(with = "hex_u64")]
    pub amount: u64,
    /// The latest date this NFT may be hired until
    #[serde(with = "hex_i64")]
    pub expiry: i64,
    /// The start date of the current hire period
    #[serde(with = "option_hex_i64")]
    pub current_start: Option<i64>,
    /// The end date of the current hire period
    #[serde(with = "option_hex_i64")]
    pub current_expiry: Option<i64>,
    /// Any amount withheld in escrow
    #[serde(with = "hex_u64")]
    pub escrow_balance: u64,
    #[serde(with = "pubkey_serde")]
    pub mint: Pubkey,
    pub bump: u8,
}

impl HireData {
    pub const STATE_OFFSET: usize = 8;
    pub const COLLECTION_OFFSET: usize = 9;
    pub const LENDER_OFFSET: usize = 41;
    pub const BORROWER_OFFSET: usize = 73;
}

impl AccountRecord for HireData {
    const NAME: &'static str = "Hire";
    const DISCRIMINATOR: [u8; 8] = [2, 111, 55, 82, 182, 144, 174, 81];
}

// ============================================================================
// Collection
// ============================================================================

#[derive(AnchorSerialize, AnchorDeserialize, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CollectionData {
    #[serde(with = "pubkey_serde")]
    pub authority: Pubkey,
    /// Verified collection mint
    #[serde(with = "pubkey_serde")]
    pub mint: Pubkey,
    /// Creator royalty on loan interest
    pub loan_basis_points: u16,
    /// Creator royalty on option premiums
    pub option_basis_points: u16,
    pub bump: u8,
}

impl CollectionData {
    pub const MINT_OFFSET: usize = 40;
}

impl AccountRecord for CollectionData {
    const NAME: &'static str = "Collection";
    const DISCRIMINATOR: [u8; 8] = [48, 160, 232, 205, 191, 207, 26, 141];
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listed_loan() -> LoanData {
        LoanData {
            state: LoanState::Listed,
            collection: Pubkey::new_unique(),
            borrower: Pubkey::new_unique(),
            lender: None,
            amount: 1_000_000_000,
            outstanding: 1_000_000_000,
            basis_points: 1000,
            duration: 30 * 86_400,
            start_date: None,
            mint: Pubkey::new_unique(),
            bump: 254,
        }
    }

    #[test]
    fn test_filter_offsets_match_layout() {
        let mut loan = listed_loan();
        let lender = Pubkey::new_unique();
        loan.state = LoanState::Active;
        loan.lender = Some(lender);
        let data = loan.encode().unwrap();

        assert_eq!(data[LoanData::STATE_OFFSET], LoanState::Active.as_byte());
        assert_eq!(
            &data[LoanData::COLLECTION_OFFSET..LoanData::COLLECTION_OFFSET + 32],
            loan.collection.as_ref()
        );
        assert_eq!(
            &data[LoanData::BORROWER_OFFSET..LoanData::BORROWER_OFFSET + 32],
            loan.borrower.as_ref()
        );
        assert_eq!(data[LoanData::LENDER_OFFSET], 1);
        assert_eq!(
            &data[LoanData::LENDER_OFFSET + 1..LoanData::LENDER_OFFSET + 33],
            lender.as_ref()
        );
    }

    #[test]
    fn test_offer_offsets_match_layout() {
        let offer = LoanOfferData {
            collection: Pubkey::new_unique(),
            lender: Pubkey::new_unique(),
            id: 7,
            amount: 5,
            duration: 6,
            basis_points: 7,
            bump: 1,
        };
        let data = offer.encode().unwrap();
        assert_eq!(&data[LoanOfferData::LENDER_OFFSET..LoanOfferData::LENDER_OFFSET + 32], offer.lender.as_ref());
        assert_eq!(data[LoanOfferData::ID_OFFSET], 7);
        assert_eq!(&data[LoanOfferData::AMOUNT_OFFSET..LoanOfferData::AMOUNT_OFFSET + 8], &5u64.to_le_bytes());
        assert_eq!(&data[LoanOfferData::DURATION_OFFSET..LoanOfferData::DURATION_OFFSET + 8], &6i64.to_le_bytes());
        assert_eq!(&data[LoanOfferData::BASIS_POINTS_OFFSET..LoanOfferData::BASIS_POINTS_OFFSET + 4], &7u32.to_le_bytes());
    }

    #[test]
    fn test_decode_rejects_wrong_discriminator() {
        let data = listed_loan().encode().unwrap();
        let err = CallOptionData::decode(&data).unwrap_err();
        assert!(matches!(err, DexloanError::Deserialization { .. }));

        let err = LoanData::decode(&data[..4]).unwrap_err();
        assert!(matches!(err, DexloanError::Deserialization { .. }));
    }

    #[test]
    fn test_decode_tolerates_trailing_padding() {
        let loan = listed_loan();
        let mut data = loan.encode().unwrap();
        data.extend_from_slice(&[0u8; 64]);
        assert_eq!(LoanData::decode(&data).unwrap(), loan);
    }

    #[test]
    fn test_json_shape_uses_hex_amounts() {
        let loan = listed_loan();
        let json = serde_json::to_value(&loan).unwrap();
        assert_eq!(json["amount"], "3b9aca00");
        assert_eq!(json["basisPoints"], 1000);
        assert!(json["lender"].is_null());
        assert_eq!(json["borrower"], loan.borrower.to_string());

        let back: LoanData = serde_json::from_value(json).unwrap();
        assert_eq!(back, loan);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!LoanState::Listed.is_terminal());
        assert!(!LoanState::Active.is_terminal());
        assert!(LoanState::Repaid.is_terminal());
        assert!(LoanState::Cancelled.is_terminal());
        assert!(LoanState::Defaulted.is_terminal());
    }
}
