//! Property tests for the split calculator.
//!
//! The load-bearing invariant: for every policy and every positive amount,
//! the calculated shares sum back to the expense amount exactly at 2 decimal
//! places.

use proptest::prelude::*;
use rust_decimal::Decimal;

use splitnest_shared::types::FamilyMemberId;

use super::{SplitDetail, SplitType, compute_splits};

/// Strategy for positive 2-decimal amounts (0.01 .. 100_000.00).
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for an active member roster.
fn members_strategy() -> impl Strategy<Value = Vec<FamilyMemberId>> {
    (1usize..=10).prop_map(|n| (0..n).map(|_| FamilyMemberId::new()).collect())
}

/// Strategy for integer percentages that sum to exactly 100, via cut points.
fn percentage_partition_strategy() -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::btree_set(1u32..100, 0..=7).prop_map(|cuts| {
        let mut bounds = vec![0u32];
        bounds.extend(cuts);
        bounds.push(100);
        bounds
            .windows(2)
            .map(|w| Decimal::from(w[1] - w[0]))
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Equal splits always sum to the amount, and every share is within one
    /// cent of every other (only the first absorbs the remainder).
    #[test]
    fn prop_equal_split_sums_to_amount(
        amount in amount_strategy(),
        members in members_strategy(),
    ) {
        let shares = compute_splits(amount, &members, SplitType::Equal, &[]).unwrap();

        let sum: Decimal = shares.iter().map(|s| s.amount_owed).sum();
        prop_assert_eq!(sum, amount, "shares must sum to the expense amount");

        let base = shares.last().unwrap().amount_owed;
        for share in &shares[1..] {
            prop_assert_eq!(share.amount_owed, base, "only the first share may differ");
        }
    }

    /// Percentage splits over an exact partition of 100 reproduce the amount.
    #[test]
    fn prop_percentage_split_sums_to_amount(
        amount in amount_strategy(),
        percentages in percentage_partition_strategy(),
    ) {
        let members: Vec<FamilyMemberId> =
            (0..percentages.len()).map(|_| FamilyMemberId::new()).collect();
        let details: Vec<SplitDetail> = members
            .iter()
            .zip(&percentages)
            .map(|(&member_id, &p)| SplitDetail {
                member_id,
                percentage: Some(p),
                amount_owed: None,
            })
            .collect();

        let shares =
            compute_splits(amount, &members, SplitType::Percentage, &details).unwrap();

        let sum: Decimal = shares.iter().map(|s| s.amount_owed).sum();
        prop_assert_eq!(sum, amount);

        // Output order follows the input detail order.
        for (share, detail) in shares.iter().zip(&details) {
            prop_assert_eq!(share.member_id, detail.member_id);
        }
    }

    /// Manual splits that already sum to the amount pass through unchanged.
    #[test]
    fn prop_manual_split_preserves_amounts(
        cents in prop::collection::vec(0i64..100_000, 1..=10),
    ) {
        let amounts: Vec<Decimal> = cents.iter().map(|&c| Decimal::new(c, 2)).collect();
        let amount: Decimal = amounts.iter().copied().sum();
        prop_assume!(amount > Decimal::ZERO);

        let members: Vec<FamilyMemberId> =
            (0..amounts.len()).map(|_| FamilyMemberId::new()).collect();
        let details: Vec<SplitDetail> = members
            .iter()
            .zip(&amounts)
            .map(|(&member_id, &owed)| SplitDetail {
                member_id,
                percentage: None,
                amount_owed: Some(owed),
            })
            .collect();

        let shares = compute_splits(amount, &members, SplitType::Manual, &details).unwrap();

        for (share, expected) in shares.iter().zip(&amounts) {
            prop_assert_eq!(share.amount_owed, *expected);
        }
    }

    /// The calculator is deterministic.
    #[test]
    fn prop_calculator_deterministic(
        amount in amount_strategy(),
        members in members_strategy(),
    ) {
        let a = compute_splits(amount, &members, SplitType::Equal, &[]).unwrap();
        let b = compute_splits(amount, &members, SplitType::Equal, &[]).unwrap();
        prop_assert_eq!(a, b);
    }
}
