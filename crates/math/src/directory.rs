//! Collection symbol directory and floor-price lookups
//!
//! On-chain metadata symbols are padded with NUL bytes. Every lookup trims
//! them first.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::valuation::loan_to_value;

/// Floor prices in lamports keyed by lowercase collection symbol
pub type FloorPrices = HashMap<String, u64>;

/// Display information for a known collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntry {
    /// Slug used by marketplaces and routes
    pub name: String,
    /// Human readable title
    pub title: Option<String>,
}

/// Symbol to collection lookup, constructed and owned by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionDirectory {
    entries: HashMap<String, CollectionEntry>,
}

impl CollectionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collections supported at launch
    pub fn with_default_collections() -> Self {
        Self::new()
            .with_entry("CHKN", "chicken_tribe", Some("Chicken Tribe"))
            .with_entry("CHKCOP", "chicken_tribe_coops", Some("Chicken Tribe Coops"))
            .with_entry("XAPE", "exiled_degen_ape_academy", Some("Exiled Apes"))
            .with_entry("BH", "lgtb", Some("Breadheads"))
            .with_entry("LGTB", "lgtb", None)
            .with_entry("NOOT", "pesky_penguins", Some("Pesky Penguins"))
    }

    pub fn with_entry(mut self, symbol: &str, name: &str, title: Option<&str>) -> Self {
        self.entries.insert(
            trim_null_chars(symbol),
            CollectionEntry {
                name: name.to_string(),
                title: title.map(str::to_string),
            },
        );
        self
    }

    pub fn entry(&self, symbol: &str) -> Option<&CollectionEntry> {
        self.entries.get(&trim_null_chars(symbol))
    }

    pub fn collection_name(&self, symbol: &str) -> Option<&str> {
        self.entry(symbol).map(|e| e.name.as_str())
    }

    pub fn collection_title(&self, symbol: &str) -> Option<&str> {
        self.entry(symbol).and_then(|e| e.title.as_deref())
    }

    /// LTV of `amount` against the floor of the collection behind `symbol`
    pub fn loan_to_value(&self, amount: u64, prices: &FloorPrices, symbol: &str) -> Option<f64> {
        loan_to_value(amount, floor_price(prices, symbol))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Floor price for an on-chain symbol
pub fn floor_price(prices: &FloorPrices, symbol: &str) -> Option<u64> {
    prices.get(&trim_null_chars(symbol).to_lowercase()).copied()
}

pub fn trim_null_chars(value: &str) -> String {
    value.replace('\0', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_trims_padding() {
        let directory = CollectionDirectory::with_default_collections();
        assert_eq!(directory.collection_name("CHKN\0\0\0\0"), Some("chicken_tribe"));
        assert_eq!(directory.collection_title("XAPE\0"), Some("Exiled Apes"));
        assert_eq!(directory.collection_name("LGTB"), Some("lgtb"));
        assert_eq!(directory.collection_title("LGTB"), None);
        assert_eq!(directory.collection_name("UNKNOWN"), None);
    }

    #[test]
    fn test_floor_price_is_case_insensitive() {
        let mut prices = FloorPrices::new();
        prices.insert("noot".to_string(), 2_000_000_000);

        assert_eq!(floor_price(&prices, "NOOT\0\0"), Some(2_000_000_000));
        assert_eq!(floor_price(&prices, "CHKN"), None);

        let directory = CollectionDirectory::with_default_collections();
        let ltv = directory.loan_to_value(1_000_000_000, &prices, "NOOT").unwrap();
        assert!((ltv - 50.0).abs() < f64::EPSILON);
        assert_eq!(directory.loan_to_value(1, &prices, "CHKN"), None);
    }

    #[test]
    fn test_directory_deserializes() {
        let json = r#"{"entries":{"ABC":{"name":"abc_club","title":null}}}"#;
        let directory: CollectionDirectory = serde_json::from_str(json).unwrap();
        assert_eq!(directory.collection_name("ABC"), Some("abc_club"));
        assert_eq!(directory.len(), 1);
    }
}
