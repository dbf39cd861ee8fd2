//! Display formatting for amounts, rates, durations and dates
//!
//! Formatting is the only place lamports become decimals. Dates are
//! rendered in UTC.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use dexloan_types::{
    DexloanError, DexloanResult, DAYS_PER_MONTH, LAMPORTS_PER_SOL, SECONDS_PER_DAY, SOL_SYMBOL,
};

use crate::interest::due_date;

/// Lamports per displayed thousandth of a SOL
const LAMPORTS_PER_MILLI: u64 = LAMPORTS_PER_SOL / 1_000;

/// Shown for nonzero amounts that round below one thousandth
const DUST_DISPLAY: &str = "~0.001";

// ============================================================================
// Amounts
// ============================================================================

/// Memoizing amount formatter
///
/// Results are cached by lamport value for the lifetime of the formatter.
/// The cache is unbounded; owners of long-lived services should call
/// [`AmountFormatter::clear`] periodically or construct a fresh formatter.
#[derive(Debug, Default)]
pub struct AmountFormatter {
    cache: RwLock<HashMap<u64, String>>,
}

impl AmountFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Format lamports as SOL, e.g. `1.008◎`
    pub fn format_amount(&self, amount: u64) -> String {
        if let Some(cached) = self.cache.read().ok().and_then(|c| c.get(&amount).cloned()) {
            return cached;
        }

        let formatted = format_amount_uncached(amount);
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(amount, formatted.clone());
        }
        formatted
    }

    /// Format an optional amount, empty when absent
    pub fn format_optional(&self, amount: Option<u64>) -> String {
        amount.map(|a| self.format_amount(a)).unwrap_or_default()
    }

    pub fn cached_len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }
}

/// Round to the nearest thousandth of a SOL and strip trailing zeros
///
/// Nonzero amounts that do not round above 0.001 show the dust marker.
pub fn format_amount_uncached(amount: u64) -> String {
    if amount == 0 {
        return format!("0{}", SOL_SYMBOL);
    }

    // Half-up rounding in u128 so u64::MAX cannot overflow
    let millis = (amount as u128 + (LAMPORTS_PER_MILLI / 2) as u128) / LAMPORTS_PER_MILLI as u128;
    if millis <= 1 {
        return format!("{}{}", DUST_DISPLAY, SOL_SYMBOL);
    }

    let whole = millis / 1_000;
    let fraction = millis % 1_000;
    if fraction == 0 {
        return format!("{}{}", whole, SOL_SYMBOL);
    }

    let fraction = format!("{:03}", fraction);
    format!("{}.{}{}", whole, fraction.trim_end_matches('0'), SOL_SYMBOL)
}

/// Parse a displayed amount back into lamports
///
/// Accepts the output of [`AmountFormatter::format_amount`] as well as plain
/// decimals. The dust marker parses to a single lamport so it formats back
/// to itself.
pub fn parse_amount(input: &str) -> DexloanResult<u64> {
    let trimmed = input.trim().trim_end_matches(SOL_SYMBOL).trim();
    if trimmed == DUST_DISPLAY {
        return Ok(1);
    }

    let invalid = || DexloanError::invalid_parameter("amount", input, "decimal SOL amount");

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if fraction.len() > 9 || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let fraction: u64 = if fraction.is_empty() {
        0
    } else {
        format!("{:0<9}", fraction).parse().map_err(|_| invalid())?
    };

    whole
        .checked_mul(LAMPORTS_PER_SOL)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(|| DexloanError::numerical_overflow("parse amount", &[input]))
}

// ============================================================================
// Rates and Durations
// ============================================================================

/// Annual rate as a percentage, e.g. `12.5%`
pub fn format_apy(basis_points: u32) -> String {
    format!("{}%", basis_points as f64 / 100.0)
}

/// Duration in whole days, rounded to the nearest day
pub fn to_days(seconds: i64) -> i64 {
    (seconds as f64 / SECONDS_PER_DAY as f64).round() as i64
}

/// Duration in 30-day months
pub fn to_months(seconds: i64) -> f64 {
    (seconds as f64 / SECONDS_PER_DAY as f64 / DAYS_PER_MONTH as f64).abs()
}

pub fn format_duration(seconds: i64) -> String {
    let days = to_days(seconds);
    format!("{} {}", days, if days == 1 { "day" } else { "days" })
}

pub fn format_months(seconds: Option<i64>) -> Option<String> {
    seconds.map(|s| format!("{} months", to_months(s)))
}

// ============================================================================
// Dates
// ============================================================================

fn to_datetime(timestamp: i64) -> DexloanResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(timestamp, 0).ok_or_else(|| {
        DexloanError::invalid_parameter("timestamp", &timestamp.to_string(), "representable date")
    })
}

/// Due date of a loan, e.g. `Mar 4, 2024 at 3:07 PM UTC`
pub fn format_due_date(start_date: i64, duration: i64, show_time: bool) -> DexloanResult<String> {
    let date = to_datetime(due_date(start_date, duration)?)?;
    let mut formatted = date.format("%b %-d, %Y").to_string();
    if show_time {
        formatted.push_str(&date.format(" at %-I:%M %p UTC").to_string());
    }
    Ok(formatted)
}

pub fn format_block_time(block_time: i64) -> DexloanResult<String> {
    Ok(to_datetime(block_time)?.format("%b %-d, %Y").to_string())
}

/// Short option expiry, e.g. `04/03/2024`
pub fn format_expiry(expiry: i64) -> DexloanResult<String> {
    Ok(to_datetime(expiry)?.format("%d/%m/%Y").to_string())
}

pub fn format_expiry_long(expiry: i64) -> DexloanResult<String> {
    Ok(to_datetime(expiry)?.format("%b %-d, %Y at %-I:%M %p").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount_rounding() {
        let f = AmountFormatter::new();
        assert_eq!(f.format_amount(0), "0◎");
        assert_eq!(f.format_amount(1), "~0.001◎");
        assert_eq!(f.format_amount(499_999), "~0.001◎");
        assert_eq!(f.format_amount(500_000), "~0.001◎");
        assert_eq!(f.format_amount(999_999), "~0.001◎");
        assert_eq!(f.format_amount(1_499_999), "~0.001◎");
        assert_eq!(f.format_amount(1_500_000), "0.002◎");
        assert_eq!(f.format_amount(LAMPORTS_PER_SOL), "1◎");
        assert_eq!(f.format_amount(1_500_000_000), "1.5◎");
        assert_eq!(f.format_amount(1_008_219_178), "1.008◎");
        assert_eq!(f.format_amount(1_082_000_000), "1.082◎");
        assert_eq!(f.format_amount(1_999_600_000), "2◎");
    }

    #[test]
    fn test_format_amount_is_memoized() {
        let f = AmountFormatter::new();
        f.format_amount(42);
        f.format_amount(42);
        f.format_amount(43);
        assert_eq!(f.cached_len(), 2);
        f.clear();
        assert_eq!(f.cached_len(), 0);
        assert_eq!(f.format_optional(None), "");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1.008◎").unwrap(), 1_008_000_000);
        assert_eq!(parse_amount("2◎").unwrap(), 2 * LAMPORTS_PER_SOL);
        assert_eq!(parse_amount("0.5").unwrap(), 500_000_000);
        assert_eq!(parse_amount(".25").unwrap(), 250_000_000);
        assert_eq!(parse_amount("~0.001◎").unwrap(), 1);
        assert!(parse_amount("").is_err());
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("1.0000000001").is_err());
    }

    #[test]
    fn test_format_is_stable_under_reparse() {
        let f = AmountFormatter::new();
        for amount in [0, 1, 250_000, 999_999, 1_234_567_891, 55 * LAMPORTS_PER_SOL, 9_876_543_210_123] {
            let once = f.format_amount(amount);
            let twice = f.format_amount(parse_amount(&once).unwrap());
            assert_eq!(once, twice, "amount {amount}");
        }
    }

    #[test]
    fn test_durations() {
        assert_eq!(to_days(30 * SECONDS_PER_DAY), 30);
        assert_eq!(to_days(SECONDS_PER_DAY / 2 + 1), 1);
        assert_eq!(format_duration(SECONDS_PER_DAY), "1 day");
        assert_eq!(format_duration(7 * SECONDS_PER_DAY), "7 days");
        assert_eq!(format_months(Some(60 * SECONDS_PER_DAY)).as_deref(), Some("2 months"));
        assert_eq!(format_months(None), None);
    }

    #[test]
    fn test_format_apy() {
        assert_eq!(format_apy(1000), "10%");
        assert_eq!(format_apy(1250), "12.5%");
    }

    #[test]
    fn test_dates() {
        // 2024-03-04 15:07:00 UTC
        let ts = 1_709_564_820;
        assert_eq!(format_due_date(ts, 0, false).unwrap(), "Mar 4, 2024");
        assert_eq!(format_due_date(ts, 0, true).unwrap(), "Mar 4, 2024 at 3:07 PM UTC");
        assert_eq!(format_block_time(ts).unwrap(), "Mar 4, 2024");
        assert_eq!(format_expiry(ts).unwrap(), "04/03/2024");
        assert_eq!(format_expiry_long(ts).unwrap(), "Mar 4, 2024 at 3:07 PM");
    }
}
