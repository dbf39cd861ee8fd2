/// Checked arithmetic helpers
///
/// Every operation returns `NumericalOverflow` instead of wrapping or
/// panicking, so callers can surface the failure.

use dexloan_types::{DexloanError, DexloanResult};

// ============================================================================
// u64
// ============================================================================

/// Safe addition for u64 values
pub fn safe_add_u64(a: u64, b: u64) -> DexloanResult<u64> {
    a.checked_add(b)
        .ok_or_else(|| DexloanError::numerical_overflow("u64 addition", &[&a.to_string(), &b.to_string()]))
}

/// Safe subtraction for u64 values
pub fn safe_sub_u64(a: u64, b: u64) -> DexloanResult<u64> {
    a.checked_sub(b).ok_or_else(|| {
        DexloanError::numerical_overflow("u64 subtraction", &[&a.to_string(), &b.to_string()])
    })
}

/// Safe multiplication for u64 values
pub fn safe_mul_u64(a: u64, b: u64) -> DexloanResult<u64> {
    a.checked_mul(b).ok_or_else(|| {
        DexloanError::numerical_overflow("u64 multiplication", &[&a.to_string(), &b.to_string()])
    })
}

// ============================================================================
// Timestamps
// ============================================================================

/// Safe addition for i64 timestamps and durations
pub fn safe_add_i64(a: i64, b: i64) -> DexloanResult<i64> {
    a.checked_add(b)
        .ok_or_else(|| DexloanError::numerical_overflow("i64 addition", &[&a.to_string(), &b.to_string()]))
}

/// Safe subtraction for i64 timestamps and durations
pub fn safe_sub_i64(a: i64, b: i64) -> DexloanResult<i64> {
    a.checked_sub(b).ok_or_else(|| {
        DexloanError::numerical_overflow("i64 subtraction", &[&a.to_string(), &b.to_string()])
    })
}

// ============================================================================
// Wide intermediates
// ============================================================================

/// floor(a * b / denominator), computed in u128
pub fn mul_div_floor(a: u128, b: u128, denominator: u128) -> DexloanResult<u128> {
    if denominator == 0 {
        return Err(DexloanError::numerical_overflow(
            "division by zero",
            &[&a.to_string(), &b.to_string()],
        ));
    }
    a.checked_mul(b)
        .map(|product| product / denominator)
        .ok_or_else(|| {
            DexloanError::numerical_overflow("u128 multiplication", &[&a.to_string(), &b.to_string()])
        })
}

/// Narrow a u128 result back to the ledger's u64 amounts
pub fn to_u64(value: u128, operation: &str) -> DexloanResult<u64> {
    u64::try_from(value)
        .map_err(|_| DexloanError::numerical_overflow(operation, &[&value.to_string()]))
}
