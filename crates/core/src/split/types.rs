//! Split policy types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use splitnest_shared::types::FamilyMemberId;

use super::error::SplitError;

/// Split policy for dividing an expense among family members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitType {
    /// Every active member owes the same share.
    Equal,
    /// Caller supplies a percentage per target member; must sum to 100.
    Percentage,
    /// Caller supplies an owed amount per target member; must sum to the
    /// expense amount.
    Manual,
}

impl SplitType {
    /// Returns the wire representation of this policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Percentage => "percentage",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for SplitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SplitType {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equal" => Ok(Self::Equal),
            "percentage" => Ok(Self::Percentage),
            "manual" => Ok(Self::Manual),
            other => Err(SplitError::InvalidSplitType(other.to_string())),
        }
    }
}

/// Per-member policy input for percentage and manual splits.
///
/// `percentage` is read for [`SplitType::Percentage`], `amount_owed` for
/// [`SplitType::Manual`]; the other field is ignored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SplitDetail {
    /// Target family member.
    pub member_id: FamilyMemberId,
    /// Percentage of the expense this member owes (0-100].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<Decimal>,
    /// Exact amount this member owes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_owed: Option<Decimal>,
}

/// One calculated split line: what a member owes for an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitShare {
    /// The member who owes this share.
    pub member_id: FamilyMemberId,
    /// Amount owed, rounded to 2 decimal places.
    pub amount_owed: Decimal,
    /// The policy that produced this share.
    pub split_type: SplitType,
    /// Originating percentage, for percentage splits.
    pub percentage: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_split_type_roundtrip() {
        for ty in [SplitType::Equal, SplitType::Percentage, SplitType::Manual] {
            assert_eq!(SplitType::from_str(ty.as_str()).unwrap(), ty);
        }
    }

    #[test]
    fn test_unknown_split_type_rejected() {
        assert!(matches!(
            SplitType::from_str("weighted"),
            Err(SplitError::InvalidSplitType(s)) if s == "weighted"
        ));
    }
}
