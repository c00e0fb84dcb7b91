//! Wallet repository: balances, the transaction log, and settlements.
//!
//! Settlements are the only operation that mutates wallet balances. Both
//! wallets are locked for the duration of the settlement transaction, and
//! two append-only log rows are written with it.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use splitnest_core::settlement::{self, SettlementError};
use splitnest_shared::types::{FamilyMemberId, round2};
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{
    expenses, family_members,
    sea_orm_active_enums::{MemberRole, MemberStatus, TransactionType},
    transactions, users, wallets,
};

/// Error types for wallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Member not found in this family.
    #[error("family member not found: {0}")]
    MemberNotFound(Uuid),

    /// Member is not active, so they have no settleable wallet.
    #[error("family member is not active: {0}")]
    MemberNotActive(Uuid),

    /// No wallet exists for the member.
    #[error("wallet not found for member: {0}")]
    WalletNotFound(Uuid),

    /// The caller is neither a settlement party nor an admin.
    #[error("only the payer, the receiver, or an admin can record a settlement")]
    NotAuthorized,

    /// The settlement was rejected by validation.
    #[error(transparent)]
    Settlement(#[from] SettlementError),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// A member's wallet balance with their user details.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceView {
    /// The wallet ID.
    pub wallet_id: Uuid,
    /// The owning member.
    pub member_id: Uuid,
    /// The member's display name.
    pub member_name: String,
    /// The member's email.
    pub email: String,
    /// The member's family role.
    pub role: MemberRole,
    /// Current balance; positive means the member is owed money.
    pub balance: Decimal,
}

/// A transaction log entry with related names resolved.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionView {
    /// The log row.
    pub transaction: transactions::Model,
    /// Name of the settlement counterparty, if any.
    pub counterparty_name: Option<String>,
    /// Title of the related expense, if any.
    pub expense_title: Option<String>,
}

/// Wallet repository for balance and settlement operations.
#[derive(Debug, Clone)]
pub struct WalletRepository {
    db: DatabaseConnection,
}

impl WalletRepository {
    /// Creates a new wallet repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Fetches a single member's balance.
    ///
    /// # Errors
    ///
    /// Returns `MemberNotFound` or `WalletNotFound`.
    pub async fn get_balance(
        &self,
        family_id: Uuid,
        member_id: Uuid,
    ) -> Result<BalanceView, WalletError> {
        let (member, user) = member_with_user(&self.db, family_id, member_id).await?;
        let wallet = wallets::Entity::find()
            .filter(wallets::Column::FamilyMemberId.eq(member.id))
            .one(&self.db)
            .await?
            .ok_or(WalletError::WalletNotFound(member_id))?;

        Ok(BalanceView {
            wallet_id: wallet.id,
            member_id: member.id,
            member_name: user.name,
            email: user.email,
            role: member.role,
            balance: wallet.balance,
        })
    }

    /// Lists every active member's balance in a family, ordered by member
    /// name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_balances(&self, family_id: Uuid) -> Result<Vec<BalanceView>, WalletError> {
        let members = family_members::Entity::find()
            .filter(family_members::Column::FamilyId.eq(family_id))
            .filter(family_members::Column::Status.eq(MemberStatus::Active))
            .find_also_related(users::Entity)
            .all(&self.db)
            .await?;

        let member_ids: Vec<Uuid> = members.iter().map(|(m, _)| m.id).collect();
        let wallets_by_member: HashMap<Uuid, wallets::Model> = wallets::Entity::find()
            .filter(wallets::Column::FamilyMemberId.is_in(member_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|w| (w.family_member_id, w))
            .collect();

        let mut balances: Vec<BalanceView> = members
            .into_iter()
            .filter_map(|(member, user)| {
                let user = user?;
                let wallet = wallets_by_member.get(&member.id)?;
                Some(BalanceView {
                    wallet_id: wallet.id,
                    member_id: member.id,
                    member_name: user.name,
                    email: user.email,
                    role: member.role.clone(),
                    balance: wallet.balance,
                })
            })
            .collect();
        balances.sort_by(|a, b| a.member_name.cmp(&b.member_name));

        Ok(balances)
    }

    /// Lists a member's transaction log, newest first, with counterparty
    /// names and expense titles resolved.
    ///
    /// # Errors
    ///
    /// Returns `MemberNotFound` or `WalletNotFound`.
    pub async fn list_transactions(
        &self,
        family_id: Uuid,
        member_id: Uuid,
    ) -> Result<Vec<TransactionView>, WalletError> {
        let (member, _) = member_with_user(&self.db, family_id, member_id).await?;
        let wallet = wallets::Entity::find()
            .filter(wallets::Column::FamilyMemberId.eq(member.id))
            .one(&self.db)
            .await?
            .ok_or(WalletError::WalletNotFound(member_id))?;

        let rows = transactions::Entity::find()
            .filter(transactions::Column::WalletId.eq(wallet.id))
            .order_by_desc(transactions::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let member_names = member_name_map(&self.db, family_id).await?;

        let expense_ids: Vec<Uuid> = rows.iter().filter_map(|t| t.related_expense_id).collect();
        let expense_titles: HashMap<Uuid, String> = expenses::Entity::find()
            .filter(expenses::Column::Id.is_in(expense_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|e| (e.id, e.title))
            .collect();

        Ok(rows
            .into_iter()
            .map(|transaction| {
                let counterparty_name = transaction
                    .related_member_id
                    .and_then(|id| member_names.get(&id).cloned());
                let expense_title = transaction
                    .related_expense_id
                    .and_then(|id| expense_titles.get(&id).cloned());
                TransactionView {
                    transaction,
                    counterparty_name,
                    expense_title,
                }
            })
            .collect())
    }

    /// Records a settlement from `payer_member_id` to `receiver_member_id`.
    ///
    /// The caller must be one of the two parties or a family admin. Both
    /// wallets are read with row locks inside the transaction, the balance
    /// deltas are applied, and a `settlement_sent` / `settlement_received`
    /// pair is appended to the log.
    ///
    /// # Errors
    ///
    /// Returns a `Settlement` validation error, `NotAuthorized`, or a
    /// member/wallet lookup error.
    #[allow(clippy::too_many_arguments)]
    pub async fn settle(
        &self,
        family_id: Uuid,
        caller: &family_members::Model,
        payer_member_id: Uuid,
        receiver_member_id: Uuid,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<(BalanceView, BalanceView), WalletError> {
        let amount = round2(amount);
        settlement::validate_settlement(
            FamilyMemberId::from_uuid(payer_member_id),
            FamilyMemberId::from_uuid(receiver_member_id),
            amount,
        )?;

        let is_party = caller.id == payer_member_id || caller.id == receiver_member_id;
        if !is_party && caller.role != MemberRole::Admin {
            return Err(WalletError::NotAuthorized);
        }

        let txn = self.db.begin().await?;

        require_active_member(&txn, family_id, payer_member_id).await?;
        require_active_member(&txn, family_id, receiver_member_id).await?;

        // Lock the two wallets in id order so opposite-direction settlements
        // between the same pair cannot deadlock.
        let (first_member, second_member) = lock_order(payer_member_id, receiver_member_id);
        let first_wallet = lock_wallet(&txn, first_member).await?;
        let second_wallet = lock_wallet(&txn, second_member).await?;
        let (payer_wallet, receiver_wallet) = if first_member == payer_member_id {
            (first_wallet, second_wallet)
        } else {
            (second_wallet, first_wallet)
        };

        let effect = settlement::settlement_effect(amount);
        let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();

        let payer_wallet_id = payer_wallet.id;
        let receiver_wallet_id = receiver_wallet.id;
        let new_payer_balance = payer_wallet.balance + effect.payer_delta;
        let new_receiver_balance = receiver_wallet.balance + effect.receiver_delta;

        let mut payer_active: wallets::ActiveModel = payer_wallet.into();
        payer_active.balance = Set(new_payer_balance);
        payer_active.update(&txn).await?;

        let mut receiver_active: wallets::ActiveModel = receiver_wallet.into();
        receiver_active.balance = Set(new_receiver_balance);
        receiver_active.update(&txn).await?;

        transactions::ActiveModel {
            id: Set(Uuid::new_v4()),
            wallet_id: Set(payer_wallet_id),
            transaction_type: Set(TransactionType::SettlementSent),
            amount: Set(amount),
            description: Set(description.clone()),
            related_expense_id: Set(None),
            related_member_id: Set(Some(receiver_member_id)),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        transactions::ActiveModel {
            id: Set(Uuid::new_v4()),
            wallet_id: Set(receiver_wallet_id),
            transaction_type: Set(TransactionType::SettlementReceived),
            amount: Set(amount),
            description: Set(description),
            related_expense_id: Set(None),
            related_member_id: Set(Some(payer_member_id)),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        let payer_view = self.get_balance(family_id, payer_member_id).await?;
        let receiver_view = self.get_balance(family_id, receiver_member_id).await?;
        Ok((payer_view, receiver_view))
    }
}

async fn member_with_user(
    db: &DatabaseConnection,
    family_id: Uuid,
    member_id: Uuid,
) -> Result<(family_members::Model, users::Model), WalletError> {
    let (member, user) = family_members::Entity::find_by_id(member_id)
        .filter(family_members::Column::FamilyId.eq(family_id))
        .find_also_related(users::Entity)
        .one(db)
        .await?
        .ok_or(WalletError::MemberNotFound(member_id))?;

    let user = user.ok_or(WalletError::MemberNotFound(member_id))?;
    Ok((member, user))
}

async fn require_active_member<C: ConnectionTrait>(
    conn: &C,
    family_id: Uuid,
    member_id: Uuid,
) -> Result<family_members::Model, WalletError> {
    let member = family_members::Entity::find_by_id(member_id)
        .filter(family_members::Column::FamilyId.eq(family_id))
        .one(conn)
        .await?
        .ok_or(WalletError::MemberNotFound(member_id))?;

    if member.status != MemberStatus::Active {
        return Err(WalletError::MemberNotActive(member_id));
    }
    Ok(member)
}

/// Sorts a pair of member ids into the order their wallets must be locked.
/// Every settlement acquires locks in this order regardless of which side
/// pays, so two settlements over the same pair never wait on each other in a
/// cycle.
fn lock_order(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Reads a member's wallet with `FOR UPDATE` so concurrent settlements on
/// the same wallet serialize.
async fn lock_wallet<C: ConnectionTrait>(
    conn: &C,
    member_id: Uuid,
) -> Result<wallets::Model, WalletError> {
    wallets::Entity::find()
        .filter(wallets::Column::FamilyMemberId.eq(member_id))
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or(WalletError::WalletNotFound(member_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_order_is_direction_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(lock_order(a, b), lock_order(b, a));
    }

    #[test]
    fn test_lock_order_returns_ascending_pair() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (first, second) = lock_order(a, b);
        assert!(first <= second);
        assert_eq!(lock_order(a, a), (a, a));
    }
}

/// Map of member ID to user display name for a family.
async fn member_name_map(
    db: &DatabaseConnection,
    family_id: Uuid,
) -> Result<HashMap<Uuid, String>, DbErr> {
    let rows = family_members::Entity::find()
        .filter(family_members::Column::FamilyId.eq(family_id))
        .find_also_related(users::Entity)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(member, user)| user.map(|u| (member.id, u.name)))
        .collect())
}
