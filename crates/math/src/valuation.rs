//! Collateral valuation and hire pricing

use dexloan_types::{DexloanError, DexloanResult, SECONDS_PER_DAY};

use crate::safe::{safe_mul_u64, safe_sub_i64};

/// Principal as a percentage of the collateral floor price
///
/// Returns `None` when the floor is unknown or zero, so callers can tell
/// "no valuation" apart from a genuine 0% LTV.
pub fn loan_to_value(amount: u64, floor_price: Option<u64>) -> Option<f64> {
    match floor_price {
        Some(floor) if floor > 0 => Some(amount as f64 / floor as f64 * 100.0),
        _ => None,
    }
}

/// Whole days a listing can still be hired for before it expires
pub fn max_hire_days(expiry: i64, now: i64) -> DexloanResult<u64> {
    let remaining = safe_sub_i64(expiry, now)?;
    if remaining <= 0 {
        return Ok(0);
    }
    Ok((remaining / SECONDS_PER_DAY) as u64)
}

/// Total cost of hiring for `days` at a daily rate
pub fn hire_cost(daily_amount: u64, days: u64) -> DexloanResult<u64> {
    safe_mul_u64(daily_amount, days)
}

/// Validate a requested hire length against the listing's limit
pub fn validate_hire_days(days: u64, max_days: u64) -> DexloanResult<u64> {
    if days == 0 || days > max_days {
        return Err(DexloanError::invalid_parameter(
            "days",
            &days.to_string(),
            &format!("between 1 and {}", max_days),
        ));
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dexloan_types::LAMPORTS_PER_SOL;

    #[test]
    fn test_loan_to_value() {
        let ltv = loan_to_value(LAMPORTS_PER_SOL, Some(4 * LAMPORTS_PER_SOL)).unwrap();
        assert!((ltv - 25.0).abs() < f64::EPSILON);
        assert_eq!(loan_to_value(LAMPORTS_PER_SOL, None), None);
        assert_eq!(loan_to_value(LAMPORTS_PER_SOL, Some(0)), None);
    }

    #[test]
    fn test_max_hire_days_floors_partial_days() {
        let now = 1_000;
        assert_eq!(max_hire_days(now + 3 * SECONDS_PER_DAY + 100, now).unwrap(), 3);
        assert_eq!(max_hire_days(now + SECONDS_PER_DAY - 1, now).unwrap(), 0);
        assert_eq!(max_hire_days(now - 10, now).unwrap(), 0);
    }

    #[test]
    fn test_hire_cost() {
        assert_eq!(hire_cost(1_000, 7).unwrap(), 7_000);
        assert!(hire_cost(u64::MAX, 2).is_err());
    }

    #[test]
    fn test_validate_hire_days() {
        assert_eq!(validate_hire_days(3, 3).unwrap(), 3);
        assert!(validate_hire_days(0, 3).is_err());
        assert!(validate_hire_days(4, 3).is_err());
    }
}
