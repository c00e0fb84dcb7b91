//! Monetary amount helpers.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! All amounts are `rust_decimal::Decimal` rounded to 2 decimal places.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places for all monetary amounts.
pub const AMOUNT_SCALE: u32 = 2;

/// Rounds an amount to 2 decimal places, half away from zero.
#[must_use]
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(33.333333), dec!(33.33))]
    #[case(dec!(33.335), dec!(33.34))]
    #[case(dec!(-33.335), dec!(-33.34))]
    #[case(dec!(100), dec!(100))]
    #[case(dec!(0.005), dec!(0.01))]
    fn test_round2(#[case] input: Decimal, #[case] expected: Decimal) {
        assert_eq!(round2(input), expected);
    }
}
