//! Expense ledger routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::{AppState, middleware::AuthUser, routes::families::family_error_response};
use splitnest_core::split::{SplitDetail, SplitType};
use splitnest_db::repositories::expense::{
    CreateExpenseInput, ExpenseError, ExpenseFilter, UpdateExpenseInput,
};
use splitnest_db::entities::{family_members, sea_orm_active_enums::MemberRole};
use splitnest_db::{ExpenseRepository, FamilyRepository};

/// Creates the expenses router (requires auth middleware to be applied
/// externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/families/{family_id}/expenses", post(create_expense))
        .route("/families/{family_id}/expenses", get(list_expenses))
        .route(
            "/families/{family_id}/expenses/{expense_id}",
            get(get_expense),
        )
        .route(
            "/families/{family_id}/expenses/{expense_id}",
            patch(update_expense),
        )
        .route(
            "/families/{family_id}/expenses/{expense_id}",
            delete(delete_expense),
        )
}

/// Request to record an expense.
#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    /// Expense title.
    pub title: String,
    /// Total amount.
    pub amount: Decimal,
    /// Expense date; defaults to today.
    pub date: Option<chrono::NaiveDate>,
    /// Category label; defaults to `other`.
    pub category: Option<String>,
    /// The member who paid.
    pub paid_by_member_id: uuid::Uuid,
    /// Optional project to attach the expense to.
    pub project_id: Option<uuid::Uuid>,
    /// Split policy.
    pub split_type: SplitType,
    /// Per-member details for percentage and manual splits.
    #[serde(default)]
    pub splits: Vec<SplitDetail>,
}

/// Request to update an expense. Omitted fields are unchanged; sending
/// `"project_id": null` detaches the project.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateExpenseRequest {
    /// New title.
    pub title: Option<String>,
    /// New amount; recomputes the splits.
    pub amount: Option<Decimal>,
    /// New date.
    pub date: Option<chrono::NaiveDate>,
    /// New category.
    pub category: Option<String>,
    /// New payer.
    pub paid_by_member_id: Option<uuid::Uuid>,
    /// New project association.
    #[serde(default, deserialize_with = "super::double_option")]
    pub project_id: Option<Option<uuid::Uuid>>,
    /// New split policy; recomputes the splits.
    pub split_type: Option<SplitType>,
    /// Per-member details used when the splits are recomputed.
    #[serde(default)]
    pub splits: Vec<SplitDetail>,
}

/// Query filters for listing expenses.
#[derive(Debug, Default, Deserialize)]
pub struct ListExpensesQuery {
    /// Only expenses attached to this project.
    pub project_id: Option<uuid::Uuid>,
    /// Only expenses paid by this member.
    pub paid_by_member_id: Option<uuid::Uuid>,
    /// Only expenses with this category.
    pub category: Option<String>,
    /// Only expenses on or after this date.
    pub start_date: Option<chrono::NaiveDate>,
    /// Only expenses on or before this date.
    pub end_date: Option<chrono::NaiveDate>,
}

/// POST `/families/{family_id}/expenses` - Record an expense with splits.
async fn create_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(family_id): Path<uuid::Uuid>,
    Json(payload): Json<CreateExpenseRequest>,
) -> impl IntoResponse {
    let family_repo = FamilyRepository::new((*state.db).clone());
    if let Err(e) = family_repo
        .require_member(family_id, auth.user_id(), None)
        .await
    {
        return family_error_response(&e);
    }

    if payload.title.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "validation_error",
                "message": "Expense title is required"
            })),
        )
            .into_response();
    }

    let repo = ExpenseRepository::new((*state.db).clone());
    let input = CreateExpenseInput {
        title: payload.title.trim().to_string(),
        amount: payload.amount,
        date: payload.date,
        category: payload.category,
        paid_by_member_id: payload.paid_by_member_id,
        project_id: payload.project_id,
        split_type: payload.split_type,
        split_details: payload.splits,
    };

    match repo.create_expense(family_id, input).await {
        Ok(expense) => {
            info!(
                family_id = %family_id,
                expense_id = %expense.expense.id,
                "Expense recorded"
            );
            (StatusCode::CREATED, Json(json!({ "expense": expense }))).into_response()
        }
        Err(e) => expense_error_response(&e),
    }
}

/// GET `/families/{family_id}/expenses` - List expenses, newest first.
async fn list_expenses(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(family_id): Path<uuid::Uuid>,
    Query(query): Query<ListExpensesQuery>,
) -> impl IntoResponse {
    let family_repo = FamilyRepository::new((*state.db).clone());
    if let Err(e) = family_repo
        .require_member(family_id, auth.user_id(), None)
        .await
    {
        return family_error_response(&e);
    }

    let repo = ExpenseRepository::new((*state.db).clone());
    let filter = ExpenseFilter {
        project_id: query.project_id,
        paid_by_member_id: query.paid_by_member_id,
        category: query.category,
        start_date: query.start_date,
        end_date: query.end_date,
    };

    match repo.list(family_id, &filter).await {
        Ok(expenses) => (StatusCode::OK, Json(json!({ "expenses": expenses }))).into_response(),
        Err(e) => expense_error_response(&e),
    }
}

/// GET `/families/{family_id}/expenses/{expense_id}` - One expense with its
/// splits.
async fn get_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((family_id, expense_id)): Path<(uuid::Uuid, uuid::Uuid)>,
) -> impl IntoResponse {
    let family_repo = FamilyRepository::new((*state.db).clone());
    if let Err(e) = family_repo
        .require_member(family_id, auth.user_id(), None)
        .await
    {
        return family_error_response(&e);
    }

    let repo = ExpenseRepository::new((*state.db).clone());
    match repo.find_by_id(family_id, expense_id).await {
        Ok(expense) => (StatusCode::OK, Json(json!({ "expense": expense }))).into_response(),
        Err(e) => expense_error_response(&e),
    }
}

/// PATCH `/families/{family_id}/expenses/{expense_id}` - Update an expense.
/// Changing the amount or split policy replaces every split line.
async fn update_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((family_id, expense_id)): Path<(uuid::Uuid, uuid::Uuid)>,
    Json(payload): Json<UpdateExpenseRequest>,
) -> impl IntoResponse {
    let family_repo = FamilyRepository::new((*state.db).clone());
    let caller = match family_repo
        .require_member(family_id, auth.user_id(), None)
        .await
    {
        Ok(member) => member,
        Err(e) => return family_error_response(&e),
    };

    let repo = ExpenseRepository::new((*state.db).clone());
    if let Err(response) = require_payer_or_admin(&repo, family_id, expense_id, &caller).await {
        return response;
    }

    let input = UpdateExpenseInput {
        title: payload.title,
        amount: payload.amount,
        date: payload.date,
        category: payload.category,
        paid_by_member_id: payload.paid_by_member_id,
        project_id: payload.project_id,
        split_type: payload.split_type,
        split_details: payload.splits,
    };

    match repo.update_expense(family_id, expense_id, input).await {
        Ok(expense) => (StatusCode::OK, Json(json!({ "expense": expense }))).into_response(),
        Err(e) => expense_error_response(&e),
    }
}

/// DELETE `/families/{family_id}/expenses/{expense_id}` - Delete an expense
/// and its splits.
async fn delete_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((family_id, expense_id)): Path<(uuid::Uuid, uuid::Uuid)>,
) -> impl IntoResponse {
    let family_repo = FamilyRepository::new((*state.db).clone());
    let caller = match family_repo
        .require_member(family_id, auth.user_id(), None)
        .await
    {
        Ok(member) => member,
        Err(e) => return family_error_response(&e),
    };

    let repo = ExpenseRepository::new((*state.db).clone());
    if let Err(response) = require_payer_or_admin(&repo, family_id, expense_id, &caller).await {
        return response;
    }

    match repo.delete_expense(family_id, expense_id).await {
        Ok(()) => {
            info!(family_id = %family_id, expense_id = %expense_id, "Expense deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => expense_error_response(&e),
    }
}

/// Only the member who paid an expense, or a family admin, may change or
/// delete it.
async fn require_payer_or_admin(
    repo: &ExpenseRepository,
    family_id: uuid::Uuid,
    expense_id: uuid::Uuid,
    caller: &family_members::Model,
) -> Result<(), Response> {
    let expense = repo
        .find_by_id(family_id, expense_id)
        .await
        .map_err(|e| expense_error_response(&e))?;

    if caller.id != expense.expense.paid_by_member_id && caller.role != MemberRole::Admin {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": "not_authorized",
                "message": "Only the payer or an admin can modify this expense"
            })),
        )
            .into_response());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_create_request_with_manual_splits() {
        let req: CreateExpenseRequest = serde_json::from_str(
            r#"{
                "title": "Groceries",
                "amount": "100.00",
                "paid_by_member_id": "0198c0de-0000-7000-8000-000000000001",
                "split_type": "manual",
                "splits": [
                    {
                        "member_id": "0198c0de-0000-7000-8000-000000000001",
                        "amount_owed": "60.00"
                    },
                    {
                        "member_id": "0198c0de-0000-7000-8000-000000000002",
                        "amount_owed": "40.00"
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(req.split_type, SplitType::Manual);
        assert_eq!(req.splits.len(), 2);
        assert_eq!(req.splits[0].amount_owed, Some(dec!(60.00)));
        assert_eq!(req.amount, dec!(100.00));
    }

    #[test]
    fn test_create_request_equal_split_needs_no_details() {
        let req: CreateExpenseRequest = serde_json::from_str(
            r#"{
                "title": "Rent",
                "amount": "1200.00",
                "paid_by_member_id": "0198c0de-0000-7000-8000-000000000001",
                "split_type": "equal"
            }"#,
        )
        .unwrap();

        assert_eq!(req.split_type, SplitType::Equal);
        assert!(req.splits.is_empty());
        assert!(req.project_id.is_none());
    }

    #[test]
    fn test_update_request_null_project_detaches() {
        let req: UpdateExpenseRequest =
            serde_json::from_str(r#"{"project_id": null}"#).unwrap();
        assert_eq!(req.project_id, Some(None));

        let req: UpdateExpenseRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.project_id, None);
    }
}

fn expense_error_response(err: &ExpenseError) -> Response {
    let (status, error, message) = match err {
        ExpenseError::NotFound(_) => {
            (StatusCode::NOT_FOUND, "not_found", "Expense not found".to_string())
        }
        ExpenseError::PayerNotActive => (
            StatusCode::BAD_REQUEST,
            "payer_not_active",
            "Payer is not an active member of this family".to_string(),
        ),
        ExpenseError::ProjectNotInFamily(_) => (
            StatusCode::BAD_REQUEST,
            "project_not_in_family",
            "Project not found in this family".to_string(),
        ),
        ExpenseError::Split(e) => (StatusCode::BAD_REQUEST, "invalid_split", e.to_string()),
        ExpenseError::SplitDetailsRequired => (
            StatusCode::BAD_REQUEST,
            "split_details_required",
            "Split details are required for this update".to_string(),
        ),
        ExpenseError::Database(e) => {
            error!(error = %e, "Database error in expense operation");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An error occurred".to_string(),
            )
        }
    };

    (status, Json(json!({ "error": error, "message": message }))).into_response()
}
