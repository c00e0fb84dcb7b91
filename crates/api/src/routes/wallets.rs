//! Wallet routes: balances, transaction history, and settlements.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::{AppState, middleware::AuthUser, routes::families::family_error_response};
use splitnest_db::entities::{family_members, sea_orm_active_enums::MemberRole};
use splitnest_db::repositories::wallet::WalletError;
use splitnest_db::{FamilyRepository, WalletRepository};

/// Creates the wallets router (requires auth middleware to be applied
/// externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/families/{family_id}/wallets", get(list_balances))
        .route(
            "/families/{family_id}/wallets/{member_id}",
            get(get_balance),
        )
        .route(
            "/families/{family_id}/wallets/{member_id}/transactions",
            get(list_transactions),
        )
        .route("/families/{family_id}/settlements", post(settle))
}

/// Request to record a settlement between two members.
#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    /// The member paying the settlement.
    pub payer_member_id: uuid::Uuid,
    /// The member receiving the settlement.
    pub receiver_member_id: uuid::Uuid,
    /// Settlement amount; must be positive.
    pub amount: Decimal,
    /// Optional note attached to both log entries.
    pub description: Option<String>,
}

/// GET `/families/{family_id}/wallets` - Every member's balance.
async fn list_balances(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(family_id): Path<uuid::Uuid>,
) -> impl IntoResponse {
    let family_repo = FamilyRepository::new((*state.db).clone());
    if let Err(e) = family_repo
        .require_member(family_id, auth.user_id(), None)
        .await
    {
        return family_error_response(&e);
    }

    let repo = WalletRepository::new((*state.db).clone());
    match repo.list_balances(family_id).await {
        Ok(balances) => (StatusCode::OK, Json(json!({ "balances": balances }))).into_response(),
        Err(e) => wallet_error_response(&e),
    }
}

/// GET `/families/{family_id}/wallets/{member_id}` - One member's balance.
async fn get_balance(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((family_id, member_id)): Path<(uuid::Uuid, uuid::Uuid)>,
) -> impl IntoResponse {
    let family_repo = FamilyRepository::new((*state.db).clone());
    let caller = match family_repo
        .require_member(family_id, auth.user_id(), None)
        .await
    {
        Ok(member) => member,
        Err(e) => return family_error_response(&e),
    };
    if let Err(response) = require_self_or_admin(&caller, member_id) {
        return response;
    }

    let repo = WalletRepository::new((*state.db).clone());
    match repo.get_balance(family_id, member_id).await {
        Ok(balance) => (StatusCode::OK, Json(json!({ "balance": balance }))).into_response(),
        Err(e) => wallet_error_response(&e),
    }
}

/// GET `/families/{family_id}/wallets/{member_id}/transactions` - A
/// member's transaction log, newest first.
async fn list_transactions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((family_id, member_id)): Path<(uuid::Uuid, uuid::Uuid)>,
) -> impl IntoResponse {
    let family_repo = FamilyRepository::new((*state.db).clone());
    let caller = match family_repo
        .require_member(family_id, auth.user_id(), None)
        .await
    {
        Ok(member) => member,
        Err(e) => return family_error_response(&e),
    };
    if let Err(response) = require_self_or_admin(&caller, member_id) {
        return response;
    }

    let repo = WalletRepository::new((*state.db).clone());
    match repo.list_transactions(family_id, member_id).await {
        Ok(transactions) => {
            (StatusCode::OK, Json(json!({ "transactions": transactions }))).into_response()
        }
        Err(e) => wallet_error_response(&e),
    }
}

/// POST `/families/{family_id}/settlements` - Record a settlement. The
/// caller must be the payer, the receiver, or a family admin.
async fn settle(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(family_id): Path<uuid::Uuid>,
    Json(payload): Json<SettleRequest>,
) -> impl IntoResponse {
    let family_repo = FamilyRepository::new((*state.db).clone());
    let caller = match family_repo
        .require_member(family_id, auth.user_id(), None)
        .await
    {
        Ok(member) => member,
        Err(e) => return family_error_response(&e),
    };

    let repo = WalletRepository::new((*state.db).clone());
    match repo
        .settle(
            family_id,
            &caller,
            payload.payer_member_id,
            payload.receiver_member_id,
            payload.amount,
            payload.description,
        )
        .await
    {
        Ok((payer, receiver)) => {
            info!(
                family_id = %family_id,
                payer = %payload.payer_member_id,
                receiver = %payload.receiver_member_id,
                "Settlement recorded"
            );
            (
                StatusCode::CREATED,
                Json(json!({ "payer": payer, "receiver": receiver })),
            )
                .into_response()
        }
        Err(e) => wallet_error_response(&e),
    }
}

/// A member may only read their own balance and history; admins may read
/// anyone's.
fn require_self_or_admin(
    caller: &family_members::Model,
    member_id: uuid::Uuid,
) -> Result<(), Response> {
    if caller.id != member_id && caller.role != MemberRole::Admin {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": "not_authorized",
                "message": "You can only view your own wallet"
            })),
        )
            .into_response());
    }
    Ok(())
}

fn wallet_error_response(err: &WalletError) -> Response {
    let (status, error, message) = match err {
        WalletError::MemberNotFound(_) => (
            StatusCode::NOT_FOUND,
            "member_not_found",
            "Family member not found".to_string(),
        ),
        WalletError::WalletNotFound(_) => (
            StatusCode::NOT_FOUND,
            "wallet_not_found",
            "Wallet not found for this member".to_string(),
        ),
        WalletError::MemberNotActive(_) => (
            StatusCode::BAD_REQUEST,
            "member_not_active",
            "Both settlement parties must be active members".to_string(),
        ),
        WalletError::NotAuthorized => (
            StatusCode::FORBIDDEN,
            "not_authorized",
            "Only the payer, the receiver, or an admin can record a settlement".to_string(),
        ),
        WalletError::Settlement(e) => {
            (StatusCode::BAD_REQUEST, "invalid_settlement", e.to_string())
        }
        WalletError::Database(e) => {
            error!(error = %e, "Database error in wallet operation");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An error occurred".to_string(),
            )
        }
    };

    (status, Json(json!({ "error": error, "message": message }))).into_response()
}
