use dexloan_math::*;
use dexloan_types::{LAMPORTS_PER_SOL, SECONDS_PER_DAY, SECONDS_PER_YEAR};

const AMOUNTS: [u64; 6] = [0, 1, 999, 1_000_000, LAMPORTS_PER_SOL, 250 * LAMPORTS_PER_SOL];
const RATES: [u32; 5] = [0, 1, 500, 1000, 65_535];
const DURATIONS: [i64; 5] = [0, 1, SECONDS_PER_DAY, 30 * SECONDS_PER_DAY, SECONDS_PER_YEAR];

#[test]
fn maturity_never_below_principal() {
    for amount in AMOUNTS {
        for bp in RATES {
            for duration in DURATIONS {
                let total = amount_on_maturity(amount, duration, bp).unwrap();
                assert!(total >= amount, "{amount} {bp} {duration}");
            }
        }
    }
}

#[test]
fn late_fee_included_exactly_when_expired() {
    let start = 1_700_000_000;
    let amount = 3 * LAMPORTS_PER_SOL;
    let duration = 14 * SECONDS_PER_DAY;
    let fee = late_repayment_fee(amount).unwrap();

    for offset in [-1, 0, 1, SECONDS_PER_DAY] {
        let now = start + duration + offset;
        let accrued = interest_accrued(amount, 700, now - start).unwrap();
        let due = interest_due(amount, start, duration, 700, now).unwrap();

        if has_expired(start, duration, now).unwrap() {
            assert_eq!(due, accrued + fee, "offset {offset}");
        } else {
            assert_eq!(due, accrued, "offset {offset}");
        }
    }
}

#[test]
fn thirty_day_loan_at_ten_percent() {
    let amount = 1_000_000_000;
    let duration = 30 * SECONDS_PER_DAY;

    let total = amount_on_maturity(amount, duration, 1000).unwrap();
    let expected = amount as f64 * (1.0 + 0.10 * 30.0 / 365.0);
    assert!((total as f64 - expected).abs() < 1.0);

    // Repaying exactly at the due date costs the same as the maturity total
    let start = 1_700_000_000;
    assert_eq!(total_due(amount, start, duration, 1000, start + duration).unwrap(), total);

    let formatter = AmountFormatter::new();
    assert_eq!(formatter.format_amount(total), "1.008◎");
}

#[test]
fn formatting_is_idempotent() {
    let formatter = AmountFormatter::new();
    for amount in (0..2_000u64).map(|i| i * 1_234_567) {
        let shown = formatter.format_amount(amount);
        let reparsed = parse_amount(&shown).unwrap();
        assert_eq!(formatter.format_amount(reparsed), shown);
    }
}

#[test]
fn yield_matches_accrual_before_expiry() {
    let start = 1_000;
    let now = start + 5 * SECONDS_PER_DAY;
    let amount = 7 * LAMPORTS_PER_SOL;
    assert_eq!(
        yield_generated(amount, start, 1200, now).unwrap(),
        interest_due(amount, start, 30 * SECONDS_PER_DAY, 1200, now).unwrap()
    );
}
