//! Family and membership management routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::{AppState, middleware::AuthUser};
use splitnest_db::FamilyRepository;
use splitnest_db::entities::sea_orm_active_enums::{MemberRole, MemberStatus};
use splitnest_db::repositories::family::FamilyError;

/// Creates the families router (requires auth middleware to be applied
/// externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/families", post(create_family))
        .route("/families", get(list_families))
        .route("/families/{family_id}", get(get_family))
        .route("/families/{family_id}", patch(update_family))
        .route("/families/{family_id}", delete(delete_family))
        .route("/families/{family_id}/members", get(list_members))
        .route("/families/{family_id}/members", post(invite_member))
        .route(
            "/families/{family_id}/members/{member_id}/accept",
            post(accept_invite),
        )
        .route(
            "/families/{family_id}/members/{member_id}",
            patch(update_member),
        )
        .route(
            "/families/{family_id}/members/{member_id}",
            delete(remove_member),
        )
}

/// Request to create a family.
#[derive(Debug, Deserialize)]
pub struct CreateFamilyRequest {
    /// Family name.
    pub name: String,
}

/// Request to rename a family.
#[derive(Debug, Deserialize)]
pub struct UpdateFamilyRequest {
    /// New family name.
    pub name: String,
}

/// Request to invite a user into a family.
#[derive(Debug, Deserialize)]
pub struct InviteMemberRequest {
    /// Email of the user to invite; must already be registered.
    pub email: String,
    /// Role for the new member; defaults to `member`.
    pub role: Option<MemberRole>,
}

/// Request to change a member's role or status.
#[derive(Debug, Deserialize)]
pub struct UpdateMemberRequest {
    /// New role.
    pub role: Option<MemberRole>,
    /// New status.
    pub status: Option<MemberStatus>,
}

/// POST /families - Create a family with the caller as its admin.
async fn create_family(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateFamilyRequest>,
) -> impl IntoResponse {
    let name = payload.name.trim();
    if name.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "validation_error",
                "message": "Family name is required"
            })),
        )
            .into_response();
    }

    let repo = FamilyRepository::new((*state.db).clone());
    match repo.create_with_admin(name, auth.user_id()).await {
        Ok((family, member)) => {
            info!(family_id = %family.id, creator = %auth.user_id(), "Family created");
            (
                StatusCode::CREATED,
                Json(json!({ "family": family, "member": member })),
            )
                .into_response()
        }
        Err(e) => family_error_response(&e),
    }
}

/// GET /families - The caller's families with their membership.
async fn list_families(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    let repo = FamilyRepository::new((*state.db).clone());
    match repo.list_for_user(auth.user_id()).await {
        Ok(rows) => {
            let families: Vec<_> = rows
                .into_iter()
                .map(|(family, member)| json!({ "family": family, "member": member }))
                .collect();
            (StatusCode::OK, Json(json!({ "families": families }))).into_response()
        }
        Err(e) => {
            error!(error = %e, "Database error listing families");
            family_error_response(&FamilyError::Database(e))
        }
    }
}

/// GET `/families/{family_id}` - Family details for members.
async fn get_family(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(family_id): Path<uuid::Uuid>,
) -> impl IntoResponse {
    let repo = FamilyRepository::new((*state.db).clone());
    if let Err(e) = repo.require_member(family_id, auth.user_id(), None).await {
        return family_error_response(&e);
    }

    match repo.find_by_id(family_id).await {
        Ok(Some(family)) => (StatusCode::OK, Json(json!({ "family": family }))).into_response(),
        Ok(None) => family_error_response(&FamilyError::NotFound(family_id)),
        Err(e) => {
            error!(error = %e, "Database error fetching family");
            family_error_response(&FamilyError::Database(e))
        }
    }
}

/// PATCH `/families/{family_id}` - Rename a family (admin only).
async fn update_family(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(family_id): Path<uuid::Uuid>,
    Json(payload): Json<UpdateFamilyRequest>,
) -> impl IntoResponse {
    let repo = FamilyRepository::new((*state.db).clone());
    if let Err(e) = repo
        .require_member(family_id, auth.user_id(), Some(MemberRole::Admin))
        .await
    {
        return family_error_response(&e);
    }

    match repo.rename(family_id, payload.name.trim()).await {
        Ok(family) => (StatusCode::OK, Json(json!({ "family": family }))).into_response(),
        Err(e) => family_error_response(&e),
    }
}

/// DELETE `/families/{family_id}` - Delete a family (admin only).
async fn delete_family(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(family_id): Path<uuid::Uuid>,
) -> impl IntoResponse {
    let repo = FamilyRepository::new((*state.db).clone());
    if let Err(e) = repo
        .require_member(family_id, auth.user_id(), Some(MemberRole::Admin))
        .await
    {
        return family_error_response(&e);
    }

    match repo.delete(family_id).await {
        Ok(()) => {
            info!(family_id = %family_id, deleted_by = %auth.user_id(), "Family deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => family_error_response(&e),
    }
}

/// GET `/families/{family_id}/members` - All members with user details.
async fn list_members(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(family_id): Path<uuid::Uuid>,
) -> impl IntoResponse {
    let repo = FamilyRepository::new((*state.db).clone());
    if let Err(e) = repo.require_member(family_id, auth.user_id(), None).await {
        return family_error_response(&e);
    }

    match repo.list_members(family_id).await {
        Ok(members) => (StatusCode::OK, Json(json!({ "members": members }))).into_response(),
        Err(e) => {
            error!(error = %e, "Database error listing members");
            family_error_response(&FamilyError::Database(e))
        }
    }
}

/// POST `/families/{family_id}/members` - Invite a registered user (admin
/// only). The invite stays pending until accepted.
async fn invite_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(family_id): Path<uuid::Uuid>,
    Json(payload): Json<InviteMemberRequest>,
) -> impl IntoResponse {
    let repo = FamilyRepository::new((*state.db).clone());
    if let Err(e) = repo
        .require_member(family_id, auth.user_id(), Some(MemberRole::Admin))
        .await
    {
        return family_error_response(&e);
    }

    let role = payload.role.unwrap_or(MemberRole::Member);
    match repo
        .invite_member(family_id, payload.email.trim(), role, auth.user_id())
        .await
    {
        Ok(member) => {
            info!(family_id = %family_id, member_id = %member.id, "Member invited");
            (StatusCode::CREATED, Json(json!({ "member": member }))).into_response()
        }
        Err(e) => family_error_response(&e),
    }
}

/// POST `/families/{family_id}/members/{member_id}/accept` - Accept your own
/// pending invite. Creates the member's wallet.
async fn accept_invite(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((_family_id, member_id)): Path<(uuid::Uuid, uuid::Uuid)>,
) -> impl IntoResponse {
    let repo = FamilyRepository::new((*state.db).clone());
    match repo.accept_invite(member_id, auth.user_id()).await {
        Ok(member) => {
            info!(member_id = %member.id, "Invite accepted");
            (StatusCode::OK, Json(json!({ "member": member }))).into_response()
        }
        Err(e) => family_error_response(&e),
    }
}

/// PATCH `/families/{family_id}/members/{member_id}` - Change a member's
/// role or status (admin only).
async fn update_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((family_id, member_id)): Path<(uuid::Uuid, uuid::Uuid)>,
    Json(payload): Json<UpdateMemberRequest>,
) -> impl IntoResponse {
    let repo = FamilyRepository::new((*state.db).clone());
    if let Err(e) = repo
        .require_member(family_id, auth.user_id(), Some(MemberRole::Admin))
        .await
    {
        return family_error_response(&e);
    }

    match repo
        .update_member(family_id, member_id, payload.role, payload.status)
        .await
    {
        Ok(member) => (StatusCode::OK, Json(json!({ "member": member }))).into_response(),
        Err(e) => family_error_response(&e),
    }
}

/// DELETE `/families/{family_id}/members/{member_id}` - Remove a member
/// (admin only). The last active admin cannot be removed.
async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((family_id, member_id)): Path<(uuid::Uuid, uuid::Uuid)>,
) -> impl IntoResponse {
    let repo = FamilyRepository::new((*state.db).clone());
    if let Err(e) = repo
        .require_member(family_id, auth.user_id(), Some(MemberRole::Admin))
        .await
    {
        return family_error_response(&e);
    }

    match repo.remove_member(family_id, member_id).await {
        Ok(()) => {
            info!(family_id = %family_id, member_id = %member_id, "Member removed");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => family_error_response(&e),
    }
}

/// Maps a `FamilyError` to an HTTP response. Shared by every family-scoped
/// route module because they all authorize through `require_member`.
pub(crate) fn family_error_response(err: &FamilyError) -> Response {
    let (status, error, message) = match err {
        FamilyError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", "Family not found"),
        FamilyError::MemberNotFound(_) => (
            StatusCode::NOT_FOUND,
            "member_not_found",
            "Family member not found",
        ),
        FamilyError::NotAMember => (
            StatusCode::FORBIDDEN,
            "not_a_member",
            "You are not a member of this family",
        ),
        FamilyError::MemberNotActive => (
            StatusCode::FORBIDDEN,
            "member_not_active",
            "Your membership is not active",
        ),
        FamilyError::AdminRequired => (
            StatusCode::FORBIDDEN,
            "admin_required",
            "This action requires the admin role",
        ),
        FamilyError::UserNotFound(_) => (
            StatusCode::NOT_FOUND,
            "user_not_found",
            "No registered user with this email",
        ),
        FamilyError::AlreadyMember => (
            StatusCode::CONFLICT,
            "already_member",
            "User is already a member of this family",
        ),
        FamilyError::InviteNotPending => (
            StatusCode::CONFLICT,
            "invite_not_pending",
            "This invite is not pending",
        ),
        FamilyError::NotYourInvite => (
            StatusCode::FORBIDDEN,
            "not_your_invite",
            "You can only accept your own invites",
        ),
        FamilyError::LastAdmin => (
            StatusCode::BAD_REQUEST,
            "last_admin",
            "Cannot remove the last active admin of a family",
        ),
        FamilyError::Database(e) => {
            error!(error = %e, "Database error in family operation");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An error occurred",
            )
        }
    };

    (status, Json(json!({ "error": error, "message": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(FamilyError::LastAdmin, StatusCode::BAD_REQUEST)]
    #[case(FamilyError::AdminRequired, StatusCode::FORBIDDEN)]
    #[case(FamilyError::AlreadyMember, StatusCode::CONFLICT)]
    #[case(FamilyError::NotAMember, StatusCode::FORBIDDEN)]
    fn test_family_error_status_codes(#[case] err: FamilyError, #[case] expected: StatusCode) {
        assert_eq!(family_error_response(&err).status(), expected);
    }
}
