//! Commonly used imports for SDK consumers

pub use anchor_lang::prelude::{AnchorDeserialize, AnchorSerialize, Pubkey};

pub use dexloan_math::{AmountFormatter, CollectionDirectory, FloorPrices};
pub use dexloan_types::{
    AccountRecord, CallOptionState, DexloanError, DexloanResult, HireState, LoanState,
};

pub use crate::cache::{QueryData, QueryGroup, QueryKind, QueryStore};
pub use crate::client::{CallOptionTerms, DexloanClient, HireTerms, Identity};
pub use crate::clock::{Clock, SystemClock};
pub use crate::config::{LoggingConfig, RetryConfig, SdkConfig};
pub use crate::gateway::{AccountFilter, Confirmation, LedgerGateway, RawAccount};
pub use crate::metadata::MetadataSource;
pub use crate::model::{
    CallOption, Collection, GroupedLoanOffer, Hire, HireStatus, Loan, LoanOffer, OfferTerms,
    SortColumn, SortDirection, SortOrder, TokenMetadata,
};
pub use crate::notify::Notifier;
pub use crate::pda::{DerivedAddress, EntityKind, PdaBuilder};
