//! Split calculation error types.

use rust_decimal::Decimal;
use splitnest_shared::types::FamilyMemberId;
use thiserror::Error;

/// Errors from split calculation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
    /// Unrecognized split policy name.
    #[error("invalid split type: {0}")]
    InvalidSplitType(String),

    /// Expense amount must be positive.
    #[error("expense amount must be positive")]
    NonPositiveAmount,

    /// The family has no active members to split among.
    #[error("no active members to split the expense among")]
    NoActiveMembers,

    /// Percentage/manual splits need at least one detail entry.
    #[error("split details must not be empty")]
    EmptyDetails,

    /// A percentage split detail is missing its percentage.
    #[error("missing percentage for member {0}")]
    MissingPercentage(FamilyMemberId),

    /// A manual split detail is missing its owed amount.
    #[error("missing owed amount for member {0}")]
    MissingAmount(FamilyMemberId),

    /// A split targets a member that is not active in the family.
    #[error("member {0} is not an active member of the family")]
    NotAnActiveMember(FamilyMemberId),

    /// Percentages must sum to exactly 100.
    #[error("percentages must sum to 100, got {total}")]
    PercentageSumMismatch {
        /// The actual percentage total.
        total: Decimal,
    },

    /// Manual amounts must sum to exactly the expense amount.
    #[error("manual amounts must sum to the expense amount {expected}, got {actual}")]
    ManualSumMismatch {
        /// The expense amount.
        expected: Decimal,
        /// Sum of the supplied owed amounts.
        actual: Decimal,
    },
}
