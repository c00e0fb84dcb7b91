//! Settlement rules and balance effects.
//!
//! A settlement is a directed payment between two family members. The sign
//! convention is fixed here: a positive wallet balance means the member is
//! owed money, so paying a settlement moves the payer's balance up by the
//! amount and the receiver's balance down by the same amount.

use rust_decimal::Decimal;
use splitnest_shared::types::FamilyMemberId;
use thiserror::Error;

/// Errors from settlement validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SettlementError {
    /// Settlement amount must be positive.
    #[error("settlement amount must be positive")]
    InvalidAmount,

    /// A member cannot settle with themselves.
    #[error("payer and receiver must be different members")]
    SelfSettlement,
}

/// The balance deltas a settlement applies to the two wallets involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceEffect {
    /// Delta applied to the payer's wallet balance.
    pub payer_delta: Decimal,
    /// Delta applied to the receiver's wallet balance.
    pub receiver_delta: Decimal,
}

/// Validates a settlement before any write happens.
///
/// # Errors
///
/// Returns [`SettlementError::InvalidAmount`] for non-positive amounts and
/// [`SettlementError::SelfSettlement`] when payer and receiver are the same
/// member.
pub fn validate_settlement(
    payer: FamilyMemberId,
    receiver: FamilyMemberId,
    amount: Decimal,
) -> Result<(), SettlementError> {
    if amount <= Decimal::ZERO {
        return Err(SettlementError::InvalidAmount);
    }
    if payer == receiver {
        return Err(SettlementError::SelfSettlement);
    }
    Ok(())
}

/// Returns the balance deltas for settling `amount`.
#[must_use]
pub fn settlement_effect(amount: Decimal) -> BalanceEffect {
    BalanceEffect {
        payer_delta: amount,
        receiver_delta: -amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[test]
    fn test_valid_settlement_passes() {
        let payer = FamilyMemberId::new();
        let receiver = FamilyMemberId::new();
        assert!(validate_settlement(payer, receiver, dec!(33.33)).is_ok());
    }

    #[rstest]
    #[case(dec!(0))]
    #[case(dec!(-10.00))]
    fn test_non_positive_amount_rejected(#[case] amount: Decimal) {
        let payer = FamilyMemberId::new();
        let receiver = FamilyMemberId::new();
        assert_eq!(
            validate_settlement(payer, receiver, amount),
            Err(SettlementError::InvalidAmount)
        );
    }

    #[test]
    fn test_self_settlement_rejected() {
        let member = FamilyMemberId::new();
        assert_eq!(
            validate_settlement(member, member, dec!(5.00)),
            Err(SettlementError::SelfSettlement)
        );
    }

    #[test]
    fn test_effect_is_symmetric() {
        let effect = settlement_effect(dec!(33.33));
        assert_eq!(effect.payer_delta, dec!(33.33));
        assert_eq!(effect.receiver_delta, dec!(-33.33));
        assert_eq!(effect.payer_delta + effect.receiver_delta, dec!(0));
    }
}
