//! Read-through queries
//!
//! A cached view is served when the group has been read before; otherwise
//! (or on `refresh`) the ledger is asked and its answer supersedes every
//! committed patch for the group.

use anchor_lang::prelude::Pubkey;
use futures::future::try_join_all;
use tracing::{debug, instrument};

use dexloan_types::{
    AccountRecord, CallOptionData, CollectionData, DexloanError, DexloanResult, HireData,
    LoanData, LoanOfferData,
};

use super::DexloanClient;
use crate::{
    cache::{
        CallOptionQuery, GroupedOfferQuery, HireQuery, LoanQuery, OfferQuery, QueryData,
        QueryGroup,
    },
    gateway::{RawAccount, ReadMode},
    model::{group_offers, CallOption, Collection, GroupedLoanOffer, Hire, Loan, LoanOffer},
};

impl DexloanClient {
    pub async fn loans(&self, query: LoanQuery) -> DexloanResult<Vec<Loan>> {
        let data = self.read(QueryGroup::Loans(query)).await?;
        Ok(data.into_loans().unwrap_or_default())
    }

    /// A single loan; `None` when no account lives at the address
    pub async fn loan(&self, address: Pubkey) -> DexloanResult<Option<Loan>> {
        let data = self.read(QueryGroup::Loan(address)).await?;
        Ok(data.into_loan())
    }

    pub async fn loan_offers(&self, query: OfferQuery) -> DexloanResult<Vec<LoanOffer>> {
        let data = self.read(QueryGroup::LoanOffers(query)).await?;
        Ok(data.into_loan_offers().unwrap_or_default())
    }

    pub async fn grouped_loan_offers(
        &self,
        query: GroupedOfferQuery,
    ) -> DexloanResult<Vec<GroupedLoanOffer>> {
        let data = self.read(QueryGroup::GroupedLoanOffers(query)).await?;
        Ok(data.into_grouped_loan_offers().unwrap_or_default())
    }

    pub async fn call_options(&self, query: CallOptionQuery) -> DexloanResult<Vec<CallOption>> {
        let data = self.read(QueryGroup::CallOptions(query)).await?;
        Ok(data.into_call_options().unwrap_or_default())
    }

    pub async fn call_option(&self, address: Pubkey) -> DexloanResult<Option<CallOption>> {
        let data = self.read(QueryGroup::CallOption(address)).await?;
        Ok(data.into_call_option())
    }

    pub async fn hires(&self, query: HireQuery) -> DexloanResult<Vec<Hire>> {
        let data = self.read(QueryGroup::Hires(query)).await?;
        Ok(data.into_hires().unwrap_or_default())
    }

    pub async fn hire(&self, address: Pubkey) -> DexloanResult<Option<Hire>> {
        let data = self.read(QueryGroup::Hire(address)).await?;
        Ok(data.into_hire())
    }

    /// Collection registered for a collection mint
    pub async fn collection(&self, collection_mint: &Pubkey) -> DexloanResult<Collection> {
        let address = self.pda.collection(collection_mint)?.address;
        self.collection_at(&address).await
    }

    /// Ask the ledger again and replace whatever the cache holds for `group`
    #[instrument(skip_all, fields(group = %group))]
    pub async fn refresh(&self, group: &QueryGroup) -> DexloanResult<QueryData> {
        let data = self.fetch(group).await?;
        debug!("superseding cached view");
        Ok(self.reconciler.supersede(group, data))
    }

    async fn read(&self, group: QueryGroup) -> DexloanResult<QueryData> {
        match self.reconciler.view(&group) {
            Some(data) => Ok(data),
            None => self.refresh(&group).await,
        }
    }

    async fn fetch(&self, group: &QueryGroup) -> DexloanResult<QueryData> {
        let prices = self.reconciler.floor_prices();

        let data = match group {
            QueryGroup::Loans(query) => {
                let accounts = self.gateway.fetch_accounts(&query.filters()).await?;
                let mut loans = try_join_all(accounts.iter().map(|a| self.hydrate_loan(a))).await?;
                query.sort.sort(&mut loans, Some(&prices));
                QueryData::Loans(loans)
            }
            QueryGroup::Loan(address) => match self.fetch_single(address, group).await? {
                Some(account) => QueryData::Loan(Some(self.hydrate_loan(&account).await?)),
                None => QueryData::Loan(None),
            },
            QueryGroup::LoanOffers(query) => {
                let mut offers = self.fetch_offers(query).await?;
                query.sort.sort(&mut offers, Some(&prices));
                QueryData::LoanOffers(offers)
            }
            QueryGroup::GroupedLoanOffers(query) => {
                let offers = self.fetch_offers(&query.offers()).await?;
                let mut groups = group_offers(&offers);
                query.sort.sort(&mut groups, Some(&prices));
                QueryData::GroupedLoanOffers(groups)
            }
            QueryGroup::CallOptions(query) => {
                let accounts = self.gateway.fetch_accounts(&query.filters()).await?;
                let options = try_join_all(accounts.iter().map(|a| self.hydrate_call_option(a))).await?;
                QueryData::CallOptions(options)
            }
            QueryGroup::CallOption(address) => match self.fetch_single(address, group).await? {
                Some(account) => QueryData::CallOption(Some(self.hydrate_call_option(&account).await?)),
                None => QueryData::CallOption(None),
            },
            QueryGroup::Hires(query) => {
                let accounts = self.gateway.fetch_accounts(&query.filters()).await?;
                let hires = try_join_all(accounts.iter().map(|a| self.hydrate_hire(a))).await?;
                QueryData::Hires(hires)
            }
            QueryGroup::Hire(address) => match self.fetch_single(address, group).await? {
                Some(account) => QueryData::Hire(Some(self.hydrate_hire(&account).await?)),
                None => QueryData::Hire(None),
            },
        };

        Ok(data)
    }

    pub(super) async fn fetch_offers(&self, query: &OfferQuery) -> DexloanResult<Vec<LoanOffer>> {
        let accounts = self.gateway.fetch_accounts(&query.filters()).await?;
        try_join_all(accounts.iter().map(|a| self.hydrate_offer(a))).await
    }

    /// Single-account read. An entity that only exists through a confirmed
    /// patch was just created, so its absence is retried as propagation lag.
    async fn fetch_single(
        &self,
        address: &Pubkey,
        group: &QueryGroup,
    ) -> DexloanResult<Option<RawAccount>> {
        let recently_written = self.reconciler.store().get(group).is_some_and(|entry| {
            entry.has_unread_writes()
                && !holds_entity(entry.base())
                && holds_entity(&entry.view(group, None))
        });
        let mode = if recently_written {
            ReadMode::AfterWrite
        } else {
            ReadMode::Existing
        };

        match self.reader.fetch_account(address, mode).await {
            Ok(account) => Ok(Some(account)),
            Err(DexloanError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub(super) async fn collection_at(&self, address: &Pubkey) -> DexloanResult<Collection> {
        if let Some(collection) = self.collections.read().await.get(address) {
            return Ok(collection.clone());
        }

        let account = self.reader.fetch_account(address, ReadMode::Existing).await?;
        let collection = Collection::new(*address, CollectionData::decode(&account.data)?);
        self.collections
            .write()
            .await
            .entry(*address)
            .or_insert_with(|| collection.clone());
        Ok(collection)
    }

    async fn hydrate_loan(&self, account: &RawAccount) -> DexloanResult<Loan> {
        let data = LoanData::decode(&account.data)?;
        let collection = self.collection_at(&data.collection).await?;
        let metadata = self.metadata.metadata_or_unknown(&data.mint).await?;
        Ok(Loan::new(account.address, data, metadata, collection))
    }

    async fn hydrate_offer(&self, account: &RawAccount) -> DexloanResult<LoanOffer> {
        let data = LoanOfferData::decode(&account.data)?;
        let collection = self.collection_at(&data.collection).await?;
        Ok(LoanOffer::new(account.address, data, collection))
    }

    async fn hydrate_call_option(&self, account: &RawAccount) -> DexloanResult<CallOption> {
        let data = CallOptionData::decode(&account.data)?;
        let collection = self.collection_at(&data.collection).await?;
        let metadata = self.metadata.metadata_or_unknown(&data.mint).await?;
        Ok(CallOption::new(account.address, data, metadata, collection))
    }

    async fn hydrate_hire(&self, account: &RawAccount) -> DexloanResult<Hire> {
        let data = HireData::decode(&account.data)?;
        let collection = self.collection_at(&data.collection).await?;
        let metadata = self.metadata.metadata_or_unknown(&data.mint).await?;
        Ok(Hire::new(account.address, data, metadata, collection))
    }
}

fn holds_entity(data: &QueryData) -> bool {
    !matches!(
        data,
        QueryData::Loan(None) | QueryData::CallOption(None) | QueryData::Hire(None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockGateway, StaticMetadataSource};
    use std::sync::Arc;

    fn client_with(gateway: Arc<MockGateway>, collection: &Collection) -> DexloanClient {
        gateway
            .insert_record(collection.address, &collection.data)
            .unwrap();
        DexloanClient::builder(gateway)
            .with_metadata_source(Arc::new(StaticMetadataSource::new()))
            .build()
    }

    #[tokio::test]
    async fn test_loans_hydrate_collection_and_fallback_metadata() {
        let gateway = Arc::new(MockGateway::new());
        let collection = fixtures::collection();
        let loan = fixtures::listed_loan_in(&collection, Pubkey::new_unique(), 1_000, 500, 3_600);
        gateway.insert_record(loan.address, &loan.data).unwrap();
        let client = client_with(gateway, &collection);

        let loans = client.loans(LoanQuery::all()).await.unwrap();

        assert_eq!(loans.len(), 1);
        assert_eq!(loans[0].collection, collection);
        assert_eq!(loans[0].metadata.mint, loan.data.mint);
        assert!(loans[0].metadata.name.is_empty());
    }

    #[tokio::test]
    async fn test_cached_view_is_served_until_refresh() {
        let gateway = Arc::new(MockGateway::new());
        let collection = fixtures::collection();
        let first = fixtures::listed_loan_in(&collection, Pubkey::new_unique(), 1_000, 500, 3_600);
        gateway.insert_record(first.address, &first.data).unwrap();
        let client = client_with(gateway.clone(), &collection);

        assert_eq!(client.loans(LoanQuery::all()).await.unwrap().len(), 1);

        let second = fixtures::listed_loan_in(&collection, Pubkey::new_unique(), 2_000, 500, 3_600);
        gateway.insert_record(second.address, &second.data).unwrap();
        assert_eq!(client.loans(LoanQuery::all()).await.unwrap().len(), 1);

        let refreshed = client
            .refresh(&QueryGroup::Loans(LoanQuery::all()))
            .await
            .unwrap();
        assert_eq!(refreshed.into_loans().map(|l| l.len()), Some(2));
    }

    #[tokio::test]
    async fn test_missing_single_account_is_none() {
        let gateway = Arc::new(MockGateway::new());
        let collection = fixtures::collection();
        let client = client_with(gateway, &collection);

        assert_eq!(client.loan(Pubkey::new_unique()).await.unwrap(), None);
        assert_eq!(client.hire(Pubkey::new_unique()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_grouped_offers_aggregate_equal_terms() {
        let gateway = Arc::new(MockGateway::new());
        let collection = fixtures::collection();
        let lender = Pubkey::new_unique();
        for id in 0..3u8 {
            let offer = fixtures::loan_offer(&collection, lender, id, 1_000, 86_400, 1_000);
            gateway.insert_record(offer.address, &offer.data).unwrap();
        }
        let other = fixtures::loan_offer(&collection, Pubkey::new_unique(), 0, 1_000, 86_400, 1_000);
        gateway.insert_record(other.address, &other.data).unwrap();
        let client = client_with(gateway, &collection);

        let groups = client
            .grouped_loan_offers(GroupedOfferQuery::all().with_collection(collection.address))
            .await
            .unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].count, 4);
    }

    #[tokio::test]
    async fn test_collection_by_mint_is_memoized() {
        let gateway = Arc::new(MockGateway::new());
        let collection = fixtures::collection();
        let client = client_with(gateway.clone(), &collection);

        let found = client.collection(&collection.data.mint).await.unwrap();
        client.collection(&collection.data.mint).await.unwrap();

        assert_eq!(found, collection);
        assert_eq!(gateway.read_count(&collection.address), 1);
    }

    #[tokio::test]
    async fn test_unknown_collection_is_not_found() {
        let client = DexloanClient::builder(Arc::new(MockGateway::new())).build();
        let result = client.collection(&Pubkey::new_unique()).await;
        assert!(matches!(result, Err(DexloanError::NotFound { .. })));
    }
}
