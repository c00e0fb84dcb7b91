//! Expense repository: the ledger of shared expenses and their split lines.
//!
//! Recording an expense computes the split shares up front and persists them
//! in the same transaction as the expense row, so the split lines for an
//! expense always sum to its amount. Wallet balances are never touched here;
//! settlements are the sole balance-mutating path.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use splitnest_core::split::{self, SplitDetail, SplitError};
use splitnest_shared::types::{FamilyMemberId, round2};
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{
    expense_splits, expenses, family_members, projects,
    sea_orm_active_enums::{self, MemberStatus},
    users,
};

/// Error types for expense operations.
#[derive(Debug, Error)]
pub enum ExpenseError {
    /// Expense not found in this family.
    #[error("expense not found: {0}")]
    NotFound(Uuid),

    /// The payer is not an active member of the family.
    #[error("payer is not an active member of this family")]
    PayerNotActive,

    /// The referenced project does not belong to the family.
    #[error("project not found in this family: {0}")]
    ProjectNotInFamily(Uuid),

    /// The split input was rejected by the calculator.
    #[error(transparent)]
    Split(#[from] SplitError),

    /// The update cannot infer split details from the stored lines; the
    /// caller must resend them.
    #[error("split details are required for this update")]
    SplitDetailsRequired,

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for recording a new expense.
#[derive(Debug, Clone)]
pub struct CreateExpenseInput {
    /// Expense title.
    pub title: String,
    /// Total amount; rounded to 2 decimal places before splitting.
    pub amount: Decimal,
    /// Expense date; defaults to today.
    pub date: Option<chrono::NaiveDate>,
    /// Category label; defaults to `other`.
    pub category: Option<String>,
    /// The member who paid.
    pub paid_by_member_id: Uuid,
    /// Optional project the expense belongs to.
    pub project_id: Option<Uuid>,
    /// Split policy.
    pub split_type: split::SplitType,
    /// Per-member split details for percentage and manual policies.
    pub split_details: Vec<SplitDetail>,
}

/// Merge-patch input for updating an expense. `None` leaves a field
/// unchanged; `project_id: Some(None)` detaches the project.
#[derive(Debug, Clone, Default)]
pub struct UpdateExpenseInput {
    /// New title.
    pub title: Option<String>,
    /// New amount; triggers a split recompute.
    pub amount: Option<Decimal>,
    /// New date.
    pub date: Option<chrono::NaiveDate>,
    /// New category.
    pub category: Option<String>,
    /// New payer.
    pub paid_by_member_id: Option<Uuid>,
    /// New project association (outer `None` = unchanged).
    pub project_id: Option<Option<Uuid>>,
    /// New split policy; triggers a split recompute.
    pub split_type: Option<split::SplitType>,
    /// Split details used when the splits are recomputed.
    pub split_details: Vec<SplitDetail>,
}

/// Filters for listing a family's expenses.
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    /// Only expenses attached to this project.
    pub project_id: Option<Uuid>,
    /// Only expenses paid by this member.
    pub paid_by_member_id: Option<Uuid>,
    /// Only expenses with this category.
    pub category: Option<String>,
    /// Only expenses on or after this date.
    pub start_date: Option<chrono::NaiveDate>,
    /// Only expenses on or before this date.
    pub end_date: Option<chrono::NaiveDate>,
}

/// A split line joined with the owing member's name.
#[derive(Debug, Clone, Serialize)]
pub struct SplitLine {
    /// The split row.
    pub split: expense_splits::Model,
    /// Display name of the owing member.
    pub member_name: String,
}

/// An expense enriched with payer, project, and split details.
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseWithSplits {
    /// The expense row.
    pub expense: expenses::Model,
    /// Display name of the paying member.
    pub payer_name: String,
    /// Name of the attached project, if any.
    pub project_name: Option<String>,
    /// The expense's split lines.
    pub splits: Vec<SplitLine>,
}

/// Expense repository for ledger operations.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    db: DatabaseConnection,
}

impl ExpenseRepository {
    /// Creates a new expense repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records an expense and its computed split lines atomically.
    ///
    /// # Errors
    ///
    /// Returns `PayerNotActive`, `ProjectNotInFamily`, or a `Split` error
    /// when the input is rejected.
    pub async fn create_expense(
        &self,
        family_id: Uuid,
        input: CreateExpenseInput,
    ) -> Result<ExpenseWithSplits, ExpenseError> {
        let txn = self.db.begin().await?;

        let active_ids = active_member_ids(&txn, family_id).await?;
        if !active_ids.contains(&input.paid_by_member_id) {
            return Err(ExpenseError::PayerNotActive);
        }
        if let Some(project_id) = input.project_id {
            ensure_project_in_family(&txn, family_id, project_id).await?;
        }

        let amount = round2(input.amount);
        let typed_ids: Vec<FamilyMemberId> = active_ids
            .iter()
            .map(|&id| FamilyMemberId::from_uuid(id))
            .collect();
        let shares =
            split::compute_splits(amount, &typed_ids, input.split_type, &input.split_details)?;

        let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();
        let expense = expenses::ActiveModel {
            id: Set(Uuid::new_v4()),
            family_id: Set(family_id),
            title: Set(input.title),
            amount: Set(amount),
            date: Set(input.date.unwrap_or_else(|| chrono::Utc::now().date_naive())),
            category: Set(input.category.unwrap_or_else(|| "other".to_string())),
            paid_by_member_id: Set(input.paid_by_member_id),
            project_id: Set(input.project_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        insert_split_lines(&txn, expense.id, &shares, now).await?;
        txn.commit().await?;

        self.find_by_id(family_id, expense.id).await
    }

    /// Updates an expense (merge-patch). Changing the amount or split policy
    /// recomputes and replaces every split line against the current active
    /// member set. When no fresh split details are sent, a percentage
    /// expense reuses the percentages stored on its existing lines; a manual
    /// expense requires the caller to resend them.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the expense is not in this family,
    /// `SplitDetailsRequired` when stored lines cannot seed the recompute,
    /// plus the same validation errors as `create_expense`.
    pub async fn update_expense(
        &self,
        family_id: Uuid,
        expense_id: Uuid,
        input: UpdateExpenseInput,
    ) -> Result<ExpenseWithSplits, ExpenseError> {
        let txn = self.db.begin().await?;

        let expense = expenses::Entity::find_by_id(expense_id)
            .filter(expenses::Column::FamilyId.eq(family_id))
            .one(&txn)
            .await?
            .ok_or(ExpenseError::NotFound(expense_id))?;

        let recompute = input.amount.is_some() || input.split_type.is_some();
        let new_amount = input.amount.map_or(expense.amount, round2);
        let existing_lines = expense_splits::Entity::find()
            .filter(expense_splits::Column::ExpenseId.eq(expense.id))
            .order_by_asc(expense_splits::Column::CreatedAt)
            .all(&txn)
            .await?;
        let current_policy = existing_lines
            .first()
            .map_or(split::SplitType::Equal, |l| l.split_type.clone().into());

        if let Some(payer_id) = input.paid_by_member_id {
            let active_ids = active_member_ids(&txn, family_id).await?;
            if !active_ids.contains(&payer_id) {
                return Err(ExpenseError::PayerNotActive);
            }
        }
        if let Some(Some(project_id)) = input.project_id {
            ensure_project_in_family(&txn, family_id, project_id).await?;
        }

        let mut active: expenses::ActiveModel = expense.into();
        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if input.amount.is_some() {
            active.amount = Set(new_amount);
        }
        if let Some(date) = input.date {
            active.date = Set(date);
        }
        if let Some(category) = input.category {
            active.category = Set(category);
        }
        if let Some(payer_id) = input.paid_by_member_id {
            active.paid_by_member_id = Set(payer_id);
        }
        if let Some(project_id) = input.project_id {
            active.project_id = Set(project_id);
        }
        let expense = active.update(&txn).await?;

        if recompute {
            let policy = input.split_type.unwrap_or(current_policy);
            let details = details_for_recompute(policy, input.split_details, &existing_lines)?;
            let active_ids = active_member_ids(&txn, family_id).await?;
            let typed_ids: Vec<FamilyMemberId> = active_ids
                .iter()
                .map(|&id| FamilyMemberId::from_uuid(id))
                .collect();
            let shares = split::compute_splits(new_amount, &typed_ids, policy, &details)?;

            expense_splits::Entity::delete_many()
                .filter(expense_splits::Column::ExpenseId.eq(expense.id))
                .exec(&txn)
                .await?;
            let now = chrono::Utc::now().into();
            insert_split_lines(&txn, expense.id, &shares, now).await?;
        }

        txn.commit().await?;
        self.find_by_id(family_id, expense.id).await
    }

    /// Deletes an expense. Its split lines cascade.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the expense is not in this family.
    pub async fn delete_expense(
        &self,
        family_id: Uuid,
        expense_id: Uuid,
    ) -> Result<(), ExpenseError> {
        let expense = expenses::Entity::find_by_id(expense_id)
            .filter(expenses::Column::FamilyId.eq(family_id))
            .one(&self.db)
            .await?
            .ok_or(ExpenseError::NotFound(expense_id))?;

        expense.delete(&self.db).await?;
        Ok(())
    }

    /// Fetches a single expense with its splits and related names.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the expense is not in this family.
    pub async fn find_by_id(
        &self,
        family_id: Uuid,
        expense_id: Uuid,
    ) -> Result<ExpenseWithSplits, ExpenseError> {
        let expense = expenses::Entity::find_by_id(expense_id)
            .filter(expenses::Column::FamilyId.eq(family_id))
            .one(&self.db)
            .await?
            .ok_or(ExpenseError::NotFound(expense_id))?;

        let mut enriched = self.enrich(family_id, vec![expense]).await?;
        enriched
            .pop()
            .ok_or(ExpenseError::NotFound(expense_id))
    }

    /// Lists a family's expenses, newest first (date, then creation time),
    /// applying the given filters.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        family_id: Uuid,
        filter: &ExpenseFilter,
    ) -> Result<Vec<ExpenseWithSplits>, ExpenseError> {
        let mut query = expenses::Entity::find()
            .filter(expenses::Column::FamilyId.eq(family_id))
            .order_by_desc(expenses::Column::Date)
            .order_by_desc(expenses::Column::CreatedAt);

        if let Some(project_id) = filter.project_id {
            query = query.filter(expenses::Column::ProjectId.eq(project_id));
        }
        if let Some(payer_id) = filter.paid_by_member_id {
            query = query.filter(expenses::Column::PaidByMemberId.eq(payer_id));
        }
        if let Some(ref category) = filter.category {
            query = query.filter(expenses::Column::Category.eq(category.clone()));
        }
        if let Some(start) = filter.start_date {
            query = query.filter(expenses::Column::Date.gte(start));
        }
        if let Some(end) = filter.end_date {
            query = query.filter(expenses::Column::Date.lte(end));
        }

        let rows = query.all(&self.db).await?;
        Ok(self.enrich(family_id, rows).await?)
    }

    /// Joins expenses with member names, project names, and split lines.
    async fn enrich(
        &self,
        family_id: Uuid,
        rows: Vec<expenses::Model>,
    ) -> Result<Vec<ExpenseWithSplits>, DbErr> {
        let member_names = member_name_map(&self.db, family_id).await?;

        let project_names: HashMap<Uuid, String> = projects::Entity::find()
            .filter(projects::Column::FamilyId.eq(family_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        let expense_ids: Vec<Uuid> = rows.iter().map(|e| e.id).collect();
        let mut splits_by_expense: HashMap<Uuid, Vec<expense_splits::Model>> = HashMap::new();
        for split in expense_splits::Entity::find()
            .filter(expense_splits::Column::ExpenseId.is_in(expense_ids))
            .order_by_asc(expense_splits::Column::CreatedAt)
            .all(&self.db)
            .await?
        {
            splits_by_expense
                .entry(split.expense_id)
                .or_default()
                .push(split);
        }

        Ok(rows
            .into_iter()
            .map(|expense| {
                let payer_name = member_names
                    .get(&expense.paid_by_member_id)
                    .cloned()
                    .unwrap_or_default();
                let project_name = expense
                    .project_id
                    .and_then(|id| project_names.get(&id).cloned());
                let splits = splits_by_expense
                    .remove(&expense.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|split| {
                        let member_name = member_names
                            .get(&split.family_member_id)
                            .cloned()
                            .unwrap_or_default();
                        SplitLine { split, member_name }
                    })
                    .collect();
                ExpenseWithSplits {
                    expense,
                    payer_name,
                    project_name,
                    splits,
                }
            })
            .collect())
    }
}

/// Active member IDs of a family, in creation order.
async fn active_member_ids<C: sea_orm::ConnectionTrait>(
    conn: &C,
    family_id: Uuid,
) -> Result<Vec<Uuid>, DbErr> {
    let members = family_members::Entity::find()
        .filter(family_members::Column::FamilyId.eq(family_id))
        .filter(family_members::Column::Status.eq(MemberStatus::Active))
        .order_by_asc(family_members::Column::CreatedAt)
        .all(conn)
        .await?;

    Ok(members.into_iter().map(|m| m.id).collect())
}

async fn ensure_project_in_family<C: sea_orm::ConnectionTrait>(
    conn: &C,
    family_id: Uuid,
    project_id: Uuid,
) -> Result<(), ExpenseError> {
    let found = projects::Entity::find_by_id(project_id)
        .filter(projects::Column::FamilyId.eq(family_id))
        .one(conn)
        .await?;
    if found.is_none() {
        return Err(ExpenseError::ProjectNotInFamily(project_id));
    }
    Ok(())
}

/// Resolves the split details a recompute should run with.
///
/// Freshly supplied details always win. Without them, an equal split needs
/// none, a percentage split is rebuilt from the percentages stored on the
/// existing lines (so an amount-only patch keeps the member ratios), and a
/// manual split cannot be inferred because its stored amounts sum to the old
/// total, so the caller must resend the per-member amounts.
fn details_for_recompute(
    policy: split::SplitType,
    requested: Vec<SplitDetail>,
    existing_lines: &[expense_splits::Model],
) -> Result<Vec<SplitDetail>, ExpenseError> {
    if !requested.is_empty() {
        return Ok(requested);
    }

    match policy {
        split::SplitType::Equal => Ok(Vec::new()),
        split::SplitType::Percentage => {
            let mut details = Vec::with_capacity(existing_lines.len());
            for line in existing_lines {
                let percentage = line.percentage.ok_or(ExpenseError::SplitDetailsRequired)?;
                details.push(SplitDetail {
                    member_id: FamilyMemberId::from_uuid(line.family_member_id),
                    percentage: Some(percentage),
                    amount_owed: None,
                });
            }
            if details.is_empty() {
                return Err(ExpenseError::SplitDetailsRequired);
            }
            Ok(details)
        }
        split::SplitType::Manual => Err(ExpenseError::SplitDetailsRequired),
    }
}

async fn insert_split_lines<C: sea_orm::ConnectionTrait>(
    conn: &C,
    expense_id: Uuid,
    shares: &[split::SplitShare],
    now: chrono::DateTime<chrono::FixedOffset>,
) -> Result<(), DbErr> {
    for share in shares {
        expense_splits::ActiveModel {
            id: Set(Uuid::new_v4()),
            expense_id: Set(expense_id),
            family_member_id: Set(share.member_id.into_inner()),
            amount_owed: Set(share.amount_owed),
            split_type: Set(sea_orm_active_enums::SplitType::from(share.split_type)),
            percentage: Set(share.percentage),
            created_at: Set(now),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn stored_line(
        expense_id: Uuid,
        split_type: sea_orm_active_enums::SplitType,
        amount_owed: Decimal,
        percentage: Option<Decimal>,
    ) -> expense_splits::Model {
        expense_splits::Model {
            id: Uuid::new_v4(),
            expense_id,
            family_member_id: Uuid::new_v4(),
            amount_owed,
            split_type,
            percentage,
            created_at: chrono::Utc::now().into(),
        }
    }

    #[test]
    fn test_amount_only_patch_reuses_stored_percentages() {
        let expense_id = Uuid::new_v4();
        let lines = vec![
            stored_line(
                expense_id,
                sea_orm_active_enums::SplitType::Percentage,
                dec!(60.00),
                Some(dec!(60)),
            ),
            stored_line(
                expense_id,
                sea_orm_active_enums::SplitType::Percentage,
                dec!(40.00),
                Some(dec!(40)),
            ),
        ];

        let details =
            details_for_recompute(split::SplitType::Percentage, Vec::new(), &lines).unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].percentage, Some(dec!(60)));
        assert_eq!(details[1].percentage, Some(dec!(40)));

        // The rebuilt details drive a clean recompute at the new amount.
        let member_ids: Vec<FamilyMemberId> = details.iter().map(|d| d.member_id).collect();
        let shares = split::compute_splits(
            dec!(50.00),
            &member_ids,
            split::SplitType::Percentage,
            &details,
        )
        .unwrap();
        let sum: Decimal = shares.iter().map(|s| s.amount_owed).sum();
        assert_eq!(sum, dec!(50.00));
        assert_eq!(shares[0].amount_owed, dec!(30.00));
        assert_eq!(shares[1].amount_owed, dec!(20.00));
    }

    #[test]
    fn test_manual_patch_without_details_requires_resend() {
        let expense_id = Uuid::new_v4();
        let lines = vec![stored_line(
            expense_id,
            sea_orm_active_enums::SplitType::Manual,
            dec!(25.00),
            None,
        )];

        let err = details_for_recompute(split::SplitType::Manual, Vec::new(), &lines).unwrap_err();
        assert!(matches!(err, ExpenseError::SplitDetailsRequired));
    }

    #[test]
    fn test_equal_patch_needs_no_details() {
        let details = details_for_recompute(split::SplitType::Equal, Vec::new(), &[]).unwrap();
        assert!(details.is_empty());
    }

    #[test]
    fn test_fresh_details_override_stored_lines() {
        let expense_id = Uuid::new_v4();
        let lines = vec![stored_line(
            expense_id,
            sea_orm_active_enums::SplitType::Percentage,
            dec!(100.00),
            Some(dec!(100)),
        )];
        let requested = vec![SplitDetail {
            member_id: FamilyMemberId::new(),
            percentage: Some(dec!(100)),
            amount_owed: None,
        }];

        let details =
            details_for_recompute(split::SplitType::Percentage, requested.clone(), &lines).unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].member_id, requested[0].member_id);
    }

    #[test]
    fn test_percentage_lines_without_percentages_require_resend() {
        let expense_id = Uuid::new_v4();
        let lines = vec![stored_line(
            expense_id,
            sea_orm_active_enums::SplitType::Percentage,
            dec!(10.00),
            None,
        )];

        let err =
            details_for_recompute(split::SplitType::Percentage, Vec::new(), &lines).unwrap_err();
        assert!(matches!(err, ExpenseError::SplitDetailsRequired));
    }

    #[test]
    fn test_percentage_with_no_stored_lines_requires_resend() {
        let err = details_for_recompute(split::SplitType::Percentage, Vec::new(), &[]).unwrap_err();
        assert!(matches!(err, ExpenseError::SplitDetailsRequired));
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
