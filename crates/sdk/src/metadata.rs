//! Token metadata collaborator
//!
//! Metadata is read-only from the client's point of view. [`MetadataCache`]
//! memoizes lookups for the lifetime of the client and never rewrites a
//! snapshot it has handed out.

use anchor_lang::prelude::Pubkey;
use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::debug;

use dexloan_types::{DexloanError, DexloanResult};

use crate::{
    gateway::LedgerGateway,
    model::{MetadataFile, TokenMetadata},
    pda::PdaBuilder,
};

/// Source of on-chain token metadata and the off-chain JSON it points to
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch_metadata(&self, mint: &Pubkey) -> DexloanResult<TokenMetadata>;

    async fn fetch_metadata_file(&self, uri: &str) -> DexloanResult<MetadataFile>;
}

/// Reads the token-metadata account through the gateway and the file over HTTP
pub struct RpcMetadataSource {
    gateway: Arc<dyn LedgerGateway>,
    pda: Arc<PdaBuilder>,
    http: reqwest::Client,
}

impl RpcMetadataSource {
    pub fn new(gateway: Arc<dyn LedgerGateway>, pda: Arc<PdaBuilder>) -> Self {
        Self {
            gateway,
            pda,
            http: reqwest::Client::new(),
        }
    }

    /// Decode a token-metadata account
    pub fn decode(mint: &Pubkey, data: &[u8]) -> DexloanResult<TokenMetadata> {
        let metadata = mpl_token_metadata::accounts::Metadata::safe_deserialize(data).map_err(|e| {
            DexloanError::Metadata {
                subject: mint.to_string(),
                reason: e.to_string(),
            }
        })?;

        // Only a verified collection counts as membership
        let collection = metadata
            .collection
            .filter(|c| c.verified)
            .map(|c| Pubkey::new_from_array(c.key.to_bytes()));

        Ok(TokenMetadata::new(
            *mint,
            &metadata.name,
            &metadata.symbol,
            &metadata.uri,
            collection,
        ))
    }
}

#[async_trait]
impl MetadataSource for RpcMetadataSource {
    async fn fetch_metadata(&self, mint: &Pubkey) -> DexloanResult<TokenMetadata> {
        let address = self.pda.metadata(mint)?.address;
        let account = self.gateway.fetch_account(&address).await?;
        Self::decode(mint, &account.data)
    }

    async fn fetch_metadata_file(&self, uri: &str) -> DexloanResult<MetadataFile> {
        debug!(uri, "fetching metadata file");
        let metadata_error = |reason: String| DexloanError::Metadata {
            subject: uri.to_string(),
            reason,
        };

        let response = self
            .http
            .get(uri)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| metadata_error(e.to_string()))?;

        response
            .json::<MetadataFile>()
            .await
            .map_err(|e| metadata_error(e.to_string()))
    }
}

/// Read-through memo in front of a [`MetadataSource`]
pub struct MetadataCache {
    source: Arc<dyn MetadataSource>,
    metadata: RwLock<HashMap<Pubkey, TokenMetadata>>,
    files: RwLock<HashMap<String, MetadataFile>>,
}

impl MetadataCache {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self {
            source,
            metadata: RwLock::new(HashMap::new()),
            files: RwLock::new(HashMap::new()),
        }
    }

    pub async fn metadata(&self, mint: &Pubkey) -> DexloanResult<TokenMetadata> {
        if let Some(cached) = self.metadata.read().await.get(mint) {
            return Ok(cached.clone());
        }

        let fetched = self.source.fetch_metadata(mint).await?;
        self.metadata
            .write()
            .await
            .entry(*mint)
            .or_insert_with(|| fetched.clone());
        Ok(fetched)
    }

    /// Metadata, or an empty placeholder when the mint has none
    pub async fn metadata_or_unknown(&self, mint: &Pubkey) -> DexloanResult<TokenMetadata> {
        match self.metadata(mint).await {
            Ok(metadata) => Ok(metadata),
            Err(DexloanError::NotFound { .. }) | Err(DexloanError::Metadata { .. }) => {
                debug!(%mint, "no metadata for mint");
                Ok(TokenMetadata::unknown(*mint))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn metadata_file(&self, uri: &str) -> DexloanResult<MetadataFile> {
        if let Some(cached) = self.files.read().await.get(uri) {
            return Ok(cached.clone());
        }

        let fetched = self.source.fetch_metadata_file(uri).await?;
        self.files
            .write()
            .await
            .entry(uri.to_string())
            .or_insert_with(|| fetched.clone());
        Ok(fetched)
    }

    pub async fn len(&self) -> usize {
        self.metadata.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticMetadataSource;

    #[tokio::test]
    async fn test_cache_reads_through_once() {
        let mint = Pubkey::new_unique();
        let source = Arc::new(StaticMetadataSource::new());
        source.insert(TokenMetadata::new(mint, "Chicken #1", "CHKN", "https://x", None));
        let cache = MetadataCache::new(source.clone());

        let first = cache.metadata(&mint).await.unwrap();
        let second = cache.metadata(&mint).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(source.fetch_count(), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_metadata_falls_back_to_unknown() {
        let cache = MetadataCache::new(Arc::new(StaticMetadataSource::new()));
        let mint = Pubkey::new_unique();

        assert!(cache.metadata(&mint).await.is_err());
        let metadata = cache.metadata_or_unknown(&mint).await.unwrap();
        assert_eq!(metadata, TokenMetadata::unknown(mint));
        assert!(cache.is_empty().await);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = RpcMetadataSource::decode(&Pubkey::new_unique(), &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, DexloanError::Metadata { .. }));
    }
}
