//! Postgres enum mappings.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role of a member within a family.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "member_role")]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    /// Family administrator.
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Regular member.
    #[sea_orm(string_value = "member")]
    Member,
}

/// Lifecycle status of a family member.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "member_status")]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    /// Invited, not yet accepted.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Active member; owns a wallet.
    #[sea_orm(string_value = "active")]
    Active,
    /// Deactivated member.
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

/// Split policy stored on an expense split line.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "split_type")]
#[serde(rename_all = "snake_case")]
pub enum SplitType {
    /// Evenly split across active members.
    #[sea_orm(string_value = "equal")]
    Equal,
    /// Split by caller-supplied percentages.
    #[sea_orm(string_value = "percentage")]
    Percentage,
    /// Split by caller-supplied amounts.
    #[sea_orm(string_value = "manual")]
    Manual,
}

impl From<splitnest_core::split::SplitType> for SplitType {
    fn from(value: splitnest_core::split::SplitType) -> Self {
        match value {
            splitnest_core::split::SplitType::Equal => Self::Equal,
            splitnest_core::split::SplitType::Percentage => Self::Percentage,
            splitnest_core::split::SplitType::Manual => Self::Manual,
        }
    }
}

impl From<SplitType> for splitnest_core::split::SplitType {
    fn from(value: SplitType) -> Self {
        match value {
            SplitType::Equal => Self::Equal,
            SplitType::Percentage => Self::Percentage,
            SplitType::Manual => Self::Manual,
        }
    }
}

/// Type of a wallet transaction. Transactions are append-only.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_type")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Settlement payment sent by this wallet's member.
    #[sea_orm(string_value = "settlement_sent")]
    SettlementSent,
    /// Settlement payment received by this wallet's member.
    #[sea_orm(string_value = "settlement_received")]
    SettlementReceived,
    /// Reserved: an expense paid by this member. Never emitted; settlements
    /// are the sole balance-mutating path.
    #[sea_orm(string_value = "expense_paid")]
    ExpensePaid,
    /// Reserved: an expense share owed by this member. Never emitted.
    #[sea_orm(string_value = "expense_owed")]
    ExpenseOwed,
}
