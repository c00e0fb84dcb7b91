//! The split calculator.

use rust_decimal::Decimal;
use splitnest_shared::types::{FamilyMemberId, round2};

use super::error::SplitError;
use super::types::{SplitDetail, SplitShare, SplitType};

/// Computes per-member owed amounts for an expense.
///
/// - `equal` splits the amount evenly across every active member.
/// - `percentage` and `manual` split across the members named in `details`,
///   which must all be active members of the family.
///
/// After per-member amounts are rounded to 2 decimal places, any rounding
/// remainder is added to the first share, so the returned shares always sum
/// to `amount` exactly. The first member absorbing the remainder is a
/// documented bias of the policy.
///
/// # Errors
///
/// Returns a [`SplitError`] when the amount is not positive, the active
/// member set is empty, or the policy input is malformed (missing fields,
/// unknown members, percentage total != 100, manual total != amount).
pub fn compute_splits(
    amount: Decimal,
    active_member_ids: &[FamilyMemberId],
    split_type: SplitType,
    details: &[SplitDetail],
) -> Result<Vec<SplitShare>, SplitError> {
    if amount <= Decimal::ZERO {
        return Err(SplitError::NonPositiveAmount);
    }
    if active_member_ids.is_empty() {
        return Err(SplitError::NoActiveMembers);
    }

    let mut shares = match split_type {
        SplitType::Equal => equal_shares(amount, active_member_ids),
        SplitType::Percentage => percentage_shares(amount, active_member_ids, details)?,
        SplitType::Manual => manual_shares(amount, active_member_ids, details)?,
    };

    // Rounding reconciliation: push the entire remainder onto the first share.
    let assigned: Decimal = shares.iter().map(|s| s.amount_owed).sum();
    let remainder = round2(amount - assigned);
    if !remainder.is_zero() {
        if let Some(first) = shares.first_mut() {
            first.amount_owed = round2(first.amount_owed + remainder);
        }
    }

    Ok(shares)
}

fn equal_shares(amount: Decimal, active_member_ids: &[FamilyMemberId]) -> Vec<SplitShare> {
    let count = Decimal::from(active_member_ids.len());
    let per_member = round2(amount / count);

    active_member_ids
        .iter()
        .map(|&member_id| SplitShare {
            member_id,
            amount_owed: per_member,
            split_type: SplitType::Equal,
            percentage: None,
        })
        .collect()
}

fn percentage_shares(
    amount: Decimal,
    active_member_ids: &[FamilyMemberId],
    details: &[SplitDetail],
) -> Result<Vec<SplitShare>, SplitError> {
    if details.is_empty() {
        return Err(SplitError::EmptyDetails);
    }

    let mut total = Decimal::ZERO;
    let mut shares = Vec::with_capacity(details.len());
    for detail in details {
        let percentage = detail
            .percentage
            .ok_or(SplitError::MissingPercentage(detail.member_id))?;
        if !active_member_ids.contains(&detail.member_id) {
            return Err(SplitError::NotAnActiveMember(detail.member_id));
        }
        total += percentage;
        shares.push(SplitShare {
            member_id: detail.member_id,
            amount_owed: round2(amount * percentage / Decimal::ONE_HUNDRED),
            split_type: SplitType::Percentage,
            percentage: Some(percentage),
        });
    }

    // Exact comparison: inputs are decimals, no epsilon needed.
    if total != Decimal::ONE_HUNDRED {
        return Err(SplitError::PercentageSumMismatch { total });
    }

    Ok(shares)
}

fn manual_shares(
    amount: Decimal,
    active_member_ids: &[FamilyMemberId],
    details: &[SplitDetail],
) -> Result<Vec<SplitShare>, SplitError> {
    if details.is_empty() {
        return Err(SplitError::EmptyDetails);
    }

    let mut total = Decimal::ZERO;
    let mut shares = Vec::with_capacity(details.len());
    for detail in details {
        let owed = detail
            .amount_owed
            .ok_or(SplitError::MissingAmount(detail.member_id))?;
        if !active_member_ids.contains(&detail.member_id) {
            return Err(SplitError::NotAnActiveMember(detail.member_id));
        }
        let owed = round2(owed);
        total += owed;
        shares.push(SplitShare {
            member_id: detail.member_id,
            amount_owed: owed,
            split_type: SplitType::Manual,
            percentage: None,
        });
    }

    if total != round2(amount) {
        return Err(SplitError::ManualSumMismatch {
            expected: amount,
            actual: total,
        });
    }

    Ok(shares)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn members(n: usize) -> Vec<FamilyMemberId> {
        (0..n).map(|_| FamilyMemberId::new()).collect()
    }

    fn pct(member_id: FamilyMemberId, percentage: Decimal) -> SplitDetail {
        SplitDetail {
            member_id,
            percentage: Some(percentage),
            amount_owed: None,
        }
    }

    fn owed(member_id: FamilyMemberId, amount: Decimal) -> SplitDetail {
        SplitDetail {
            member_id,
            percentage: None,
            amount_owed: Some(amount),
        }
    }

    #[test]
    fn test_equal_split_three_members_absorbs_remainder() {
        let ids = members(3);
        let shares = compute_splits(dec!(100.00), &ids, SplitType::Equal, &[]).unwrap();

        assert_eq!(shares.len(), 3);
        assert_eq!(shares[0].amount_owed, dec!(33.34));
        assert_eq!(shares[1].amount_owed, dec!(33.33));
        assert_eq!(shares[2].amount_owed, dec!(33.33));
        let sum: Decimal = shares.iter().map(|s| s.amount_owed).sum();
        assert_eq!(sum, dec!(100.00));
    }

    #[test]
    fn test_equal_split_single_member() {
        let ids = members(1);
        let shares = compute_splits(dec!(42.37), &ids, SplitType::Equal, &[]).unwrap();
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].amount_owed, dec!(42.37));
    }

    #[test]
    fn test_equal_split_tiny_amount() {
        // 0.01 / 3 rounds to 0.00 per member; the whole cent lands on the first.
        let ids = members(3);
        let shares = compute_splits(dec!(0.01), &ids, SplitType::Equal, &[]).unwrap();
        assert_eq!(shares[0].amount_owed, dec!(0.01));
        assert_eq!(shares[1].amount_owed, dec!(0.00));
        assert_eq!(shares[2].amount_owed, dec!(0.00));
    }

    #[test]
    fn test_percentage_split_reproduces_amount() {
        let ids = members(3);
        let details = vec![
            pct(ids[0], dec!(50)),
            pct(ids[1], dec!(30)),
            pct(ids[2], dec!(20)),
        ];
        let shares = compute_splits(dec!(80.00), &ids, SplitType::Percentage, &details).unwrap();

        assert_eq!(shares[0].amount_owed, dec!(40.00));
        assert_eq!(shares[1].amount_owed, dec!(24.00));
        assert_eq!(shares[2].amount_owed, dec!(16.00));
        assert_eq!(shares[0].percentage, Some(dec!(50)));
    }

    #[test]
    fn test_percentage_thirds_do_not_sum_to_100() {
        // 100/3 as a decimal is not exactly a third, so three of them fail
        // the exact sum check.
        let ids = members(3);
        let third = dec!(100) / dec!(3);
        let details = vec![pct(ids[0], third), pct(ids[1], third), pct(ids[2], third)];
        let err = compute_splits(dec!(100.00), &ids, SplitType::Percentage, &details).unwrap_err();
        assert!(matches!(err, SplitError::PercentageSumMismatch { .. }));
    }

    #[test]
    fn test_percentage_rounding_remainder_goes_to_first() {
        // 33.33 + 33.33 + 33.34 = 100, but each owed share rounds to a value
        // whose sum misses the amount by a cent; the first share absorbs it.
        let ids = members(3);
        let details = vec![
            pct(ids[0], dec!(33.33)),
            pct(ids[1], dec!(33.33)),
            pct(ids[2], dec!(33.34)),
        ];
        let shares = compute_splits(dec!(0.10), &ids, SplitType::Percentage, &details).unwrap();
        let sum: Decimal = shares.iter().map(|s| s.amount_owed).sum();
        assert_eq!(sum, dec!(0.10));
    }

    #[test]
    fn test_percentage_sum_must_be_100() {
        let ids = members(2);
        let details = vec![pct(ids[0], dec!(60)), pct(ids[1], dec!(50))];
        let err = compute_splits(dec!(10.00), &ids, SplitType::Percentage, &details).unwrap_err();
        assert_eq!(
            err,
            SplitError::PercentageSumMismatch { total: dec!(110) }
        );
    }

    #[test]
    fn test_percentage_subset_of_members_is_allowed() {
        // Only two of three active members carry the expense.
        let ids = members(3);
        let details = vec![pct(ids[0], dec!(75)), pct(ids[2], dec!(25))];
        let shares = compute_splits(dec!(40.00), &ids, SplitType::Percentage, &details).unwrap();
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].amount_owed, dec!(30.00));
        assert_eq!(shares[1].amount_owed, dec!(10.00));
    }

    #[test]
    fn test_percentage_unknown_member_rejected() {
        let ids = members(2);
        let stranger = FamilyMemberId::new();
        let details = vec![pct(ids[0], dec!(50)), pct(stranger, dec!(50))];
        let err = compute_splits(dec!(10.00), &ids, SplitType::Percentage, &details).unwrap_err();
        assert_eq!(err, SplitError::NotAnActiveMember(stranger));
    }

    #[test]
    fn test_percentage_missing_field_rejected() {
        let ids = members(1);
        let details = vec![owed(ids[0], dec!(10.00))];
        let err = compute_splits(dec!(10.00), &ids, SplitType::Percentage, &details).unwrap_err();
        assert_eq!(err, SplitError::MissingPercentage(ids[0]));
    }

    #[test]
    fn test_manual_split_exact_sum() {
        let ids = members(3);
        let details = vec![
            owed(ids[0], dec!(12.50)),
            owed(ids[1], dec!(7.25)),
            owed(ids[2], dec!(5.25)),
        ];
        let shares = compute_splits(dec!(25.00), &ids, SplitType::Manual, &details).unwrap();
        let sum: Decimal = shares.iter().map(|s| s.amount_owed).sum();
        assert_eq!(sum, dec!(25.00));
    }

    #[test]
    fn test_manual_sum_mismatch_rejected() {
        let ids = members(2);
        let details = vec![owed(ids[0], dec!(10.00)), owed(ids[1], dec!(10.00))];
        let err = compute_splits(dec!(25.00), &ids, SplitType::Manual, &details).unwrap_err();
        assert_eq!(
            err,
            SplitError::ManualSumMismatch {
                expected: dec!(25.00),
                actual: dec!(20.00),
            }
        );
    }

    #[rstest]
    #[case(dec!(0))]
    #[case(dec!(-5.00))]
    fn test_non_positive_amount_rejected(#[case] amount: Decimal) {
        let ids = members(2);
        let err = compute_splits(amount, &ids, SplitType::Equal, &[]).unwrap_err();
        assert_eq!(err, SplitError::NonPositiveAmount);
    }

    #[test]
    fn test_no_active_members_rejected() {
        let err = compute_splits(dec!(10.00), &[], SplitType::Equal, &[]).unwrap_err();
        assert_eq!(err, SplitError::NoActiveMembers);
    }

    #[rstest]
    #[case(SplitType::Percentage)]
    #[case(SplitType::Manual)]
    fn test_empty_details_rejected(#[case] split_type: SplitType) {
        let ids = members(2);
        let err = compute_splits(dec!(10.00), &ids, split_type, &[]).unwrap_err();
        assert_eq!(err, SplitError::EmptyDetails);
    }
}
