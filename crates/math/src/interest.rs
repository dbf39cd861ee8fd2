//! Loan interest and fee calculations
//!
//! All quantities stay in lamports and seconds. Interest is
//! `floor(amount * basis_points * elapsed / (10_000 * SECONDS_PER_YEAR))`
//! evaluated in u128, which matches the integer arithmetic of the ledger
//! program. Floating point appears only in [`pro_rata_interest_rate`], which
//! exists for display.

use dexloan_types::{
    DexloanResult, BASIS_POINTS_DIVISOR, LATE_REPAYMENT_FEE_BASIS_POINTS, SECONDS_PER_YEAR,
};

use crate::safe::{mul_div_floor, safe_add_i64, safe_add_u64, safe_sub_i64, to_u64};

/// Fraction of principal accrued over `elapsed` seconds at an annual rate
pub fn pro_rata_interest_rate(basis_points: u32, elapsed: i64) -> f64 {
    basis_points as f64 / BASIS_POINTS_DIVISOR as f64 / SECONDS_PER_YEAR as f64 * elapsed as f64
}

/// Interest accrued on `amount` over `elapsed` seconds, truncated to whole lamports
///
/// Negative or zero elapsed time accrues nothing.
pub fn interest_accrued(amount: u64, basis_points: u32, elapsed: i64) -> DexloanResult<u64> {
    if elapsed <= 0 || amount == 0 || basis_points == 0 {
        return Ok(0);
    }

    let rate_time = (basis_points as u128) * (elapsed as u128);
    let denominator = (BASIS_POINTS_DIVISOR as u128) * (SECONDS_PER_YEAR as u128);
    let interest = mul_div_floor(amount as u128, rate_time, denominator)?;
    to_u64(interest, "interest accrual")
}

/// Flat 5% penalty on the principal of an overdue loan
pub fn late_repayment_fee(amount: u64) -> DexloanResult<u64> {
    let fee = mul_div_floor(
        amount as u128,
        LATE_REPAYMENT_FEE_BASIS_POINTS as u128,
        BASIS_POINTS_DIVISOR as u128,
    )?;
    to_u64(fee, "late repayment fee")
}

/// Timestamp at which a loan started at `start_date` falls due
pub fn due_date(start_date: i64, duration: i64) -> DexloanResult<i64> {
    safe_add_i64(start_date, duration)
}

/// True once `now` is strictly past the due date
pub fn has_expired(start_date: i64, duration: i64, now: i64) -> DexloanResult<bool> {
    Ok(now > due_date(start_date, duration)?)
}

/// Interest owed at `now`, including the late fee once the loan is overdue
pub fn interest_due(
    amount: u64,
    start_date: i64,
    duration: i64,
    basis_points: u32,
    now: i64,
) -> DexloanResult<u64> {
    let elapsed = safe_sub_i64(now, start_date)?;
    let interest = interest_accrued(amount, basis_points, elapsed)?;

    if has_expired(start_date, duration, now)? {
        safe_add_u64(interest, late_repayment_fee(amount)?)
    } else {
        Ok(interest)
    }
}

/// Principal plus everything owed at `now`
pub fn total_due(
    amount: u64,
    start_date: i64,
    duration: i64,
    basis_points: u32,
    now: i64,
) -> DexloanResult<u64> {
    safe_add_u64(
        amount,
        interest_due(amount, start_date, duration, basis_points, now)?,
    )
}

/// Interest owed if repaid exactly at the due date
pub fn interest_on_maturity(amount: u64, duration: i64, basis_points: u32) -> DexloanResult<u64> {
    interest_accrued(amount, basis_points, duration)
}

/// The contractual total if repaid exactly at the due date, without penalty
pub fn amount_on_maturity(amount: u64, duration: i64, basis_points: u32) -> DexloanResult<u64> {
    safe_add_u64(amount, interest_on_maturity(amount, duration, basis_points)?)
}

/// Interest earned by the lender so far
pub fn yield_generated(
    amount: u64,
    start_date: i64,
    basis_points: u32,
    now: i64,
) -> DexloanResult<u64> {
    interest_accrued(amount, basis_points, safe_sub_i64(now, start_date)?)
}

/// Creator royalty taken from an interest amount
pub fn creator_fee(interest: u64, creator_basis_points: u16) -> DexloanResult<u64> {
    let fee = mul_div_floor(
        interest as u128,
        creator_basis_points as u128,
        BASIS_POINTS_DIVISOR as u128,
    )?;
    to_u64(fee, "creator fee")
}
