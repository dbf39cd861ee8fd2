//! Listing table ordering

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use dexloan_math::{floor_price, loan_to_value, FloorPrices};

/// Loan terms shared by loans, offers and grouped offers
pub trait Terms {
    fn amount(&self) -> u64;
    fn duration(&self) -> i64;
    fn basis_points(&self) -> u32;

    /// Collection symbol, when the entity carries token metadata
    fn symbol(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortColumn {
    Duration,
    Ltv,
    Apy,
    #[default]
    Amount,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortOrder {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn new(column: SortColumn, direction: SortDirection) -> Self {
        Self { column, direction }
    }

    /// Selecting the active column flips direction; another column starts ascending
    pub fn toggle(self, column: SortColumn) -> Self {
        if self.column == column {
            Self::new(column, self.direction.reversed())
        } else {
            Self::new(column, SortDirection::Ascending)
        }
    }

    /// Compare two entries
    ///
    /// LTV needs floor prices. Entries without a floor sort after every
    /// priced entry in either direction and among themselves by amount.
    pub fn compare<T: Terms>(&self, a: &T, b: &T, prices: Option<&FloorPrices>) -> Ordering {
        let ordering = match self.column {
            SortColumn::Duration => a.duration().cmp(&b.duration()),
            SortColumn::Apy => a.basis_points().cmp(&b.basis_points()),
            SortColumn::Amount => a.amount().cmp(&b.amount()),
            SortColumn::Ltv => match (ltv_of(a, prices), ltv_of(b, prices)) {
                (Some(x), Some(y)) => x.total_cmp(&y).then_with(|| a.amount().cmp(&b.amount())),
                (Some(_), None) => return Ordering::Less,
                (None, Some(_)) => return Ordering::Greater,
                (None, None) => a.amount().cmp(&b.amount()),
            },
        };

        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }

    /// Stable in-place sort
    pub fn sort<T: Terms>(&self, items: &mut [T], prices: Option<&FloorPrices>) {
        items.sort_by(|a, b| self.compare(a, b, prices));
    }
}

fn ltv_of<T: Terms>(item: &T, prices: Option<&FloorPrices>) -> Option<f64> {
    let prices = prices?;
    let symbol = item.symbol()?;
    loan_to_value(item.amount(), floor_price(prices, symbol))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use dexloan_types::SECONDS_PER_DAY;

    #[test]
    fn test_toggle() {
        let order = SortOrder::default();
        assert_eq!(order.column, SortColumn::Amount);

        let flipped = order.toggle(SortColumn::Amount);
        assert_eq!(flipped.direction, SortDirection::Descending);

        let other = flipped.toggle(SortColumn::Apy);
        assert_eq!(other, SortOrder::new(SortColumn::Apy, SortDirection::Ascending));
    }

    #[test]
    fn test_sort_by_columns() {
        let mut loans = vec![
            fixtures::listed_loan(3_000, 100, 3 * SECONDS_PER_DAY),
            fixtures::listed_loan(1_000, 300, 2 * SECONDS_PER_DAY),
            fixtures::listed_loan(2_000, 200, SECONDS_PER_DAY),
        ];

        SortOrder::new(SortColumn::Amount, SortDirection::Ascending).sort(&mut loans, None);
        assert_eq!(loans.iter().map(|l| l.data.amount).collect::<Vec<_>>(), vec![1_000, 2_000, 3_000]);

        SortOrder::new(SortColumn::Apy, SortDirection::Descending).sort(&mut loans, None);
        assert_eq!(loans.iter().map(|l| l.data.basis_points).collect::<Vec<_>>(), vec![300, 200, 100]);

        SortOrder::new(SortColumn::Duration, SortDirection::Ascending).sort(&mut loans, None);
        assert_eq!(loans[0].data.amount, 2_000);
    }

    #[test]
    fn test_ltv_sort_uses_floor_prices() {
        let mut cheap = fixtures::listed_loan(1_000, 100, SECONDS_PER_DAY);
        cheap.metadata.symbol = "AAA".to_string();
        let mut pricey = fixtures::listed_loan(2_000, 100, SECONDS_PER_DAY);
        pricey.metadata.symbol = "BBB".to_string();

        let mut prices = FloorPrices::new();
        prices.insert("aaa".to_string(), 1_000);
        prices.insert("bbb".to_string(), 100_000);

        // cheap is 100% LTV, pricey is 2%
        let mut loans = vec![cheap, pricey];
        let order = SortOrder::new(SortColumn::Ltv, SortDirection::Ascending);
        order.sort(&mut loans, Some(&prices));
        assert_eq!(loans[0].data.amount, 2_000);

        // Without prices, amount order
        order.sort(&mut loans, None);
        assert_eq!(loans[0].data.amount, 1_000);
    }

    #[test]
    fn test_ltv_sort_places_unpriced_last() {
        let mut prices = FloorPrices::new();
        prices.insert("aaa".to_string(), 300);
        prices.insert("ccc".to_string(), 2);

        let loan = |amount: u64, symbol: &str| {
            let mut loan = fixtures::listed_loan(amount, 100, SECONDS_PER_DAY);
            loan.metadata.symbol = symbol.to_string();
            loan
        };
        // 1% and 50% LTV, then two without a floor
        let low = loan(3, "AAA");
        let high = loan(1, "CCC");
        let unpriced = loan(2, "ZZZ");
        let unpriced_small = loan(1, "YYY");

        let ascending = SortOrder::new(SortColumn::Ltv, SortDirection::Ascending);
        assert_eq!(ascending.compare(&low, &high, Some(&prices)), Ordering::Less);
        assert_eq!(ascending.compare(&high, &unpriced, Some(&prices)), Ordering::Less);
        assert_eq!(ascending.compare(&low, &unpriced, Some(&prices)), Ordering::Less);

        let symbols = |loans: &[crate::model::Loan]| {
            loans.iter().map(|l| l.metadata.symbol.clone()).collect::<Vec<_>>()
        };
        let mut loans = vec![unpriced.clone(), high.clone(), unpriced_small.clone(), low.clone()];
        ascending.sort(&mut loans, Some(&prices));
        assert_eq!(symbols(&loans), vec!["AAA", "CCC", "YYY", "ZZZ"]);

        let descending = SortOrder::new(SortColumn::Ltv, SortDirection::Descending);
        descending.sort(&mut loans, Some(&prices));
        assert_eq!(symbols(&loans), vec!["CCC", "AAA", "ZZZ", "YYY"]);
    }
}
