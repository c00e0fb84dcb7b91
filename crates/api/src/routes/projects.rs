//! Project routes: budget buckets that group expenses.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::{AppState, middleware::AuthUser, routes::families::family_error_response};
use splitnest_db::entities::sea_orm_active_enums::MemberRole;
use splitnest_db::repositories::project::{ProjectError, UpdateProjectInput};
use splitnest_db::{FamilyRepository, ProjectRepository};

/// Creates the projects router (requires auth middleware to be applied
/// externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/families/{family_id}/projects", post(create_project))
        .route("/families/{family_id}/projects", get(list_projects))
        .route(
            "/families/{family_id}/projects/{project_id}",
            get(get_project),
        )
        .route(
            "/families/{family_id}/projects/{project_id}",
            patch(update_project),
        )
        .route(
            "/families/{family_id}/projects/{project_id}",
            delete(delete_project),
        )
}

/// Request to create a project.
#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    /// Project name.
    pub name: String,
    /// Optional budget; must be zero or positive.
    pub budget: Option<Decimal>,
    /// Optional description.
    pub description: Option<String>,
}

/// Request to update a project. Omitted fields are unchanged; sending
/// `"budget": null` clears the budget.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProjectRequest {
    /// New name.
    pub name: Option<String>,
    /// New budget.
    #[serde(default, deserialize_with = "super::double_option")]
    pub budget: Option<Option<Decimal>>,
    /// New description.
    #[serde(default, deserialize_with = "super::double_option")]
    pub description: Option<Option<String>>,
}

/// POST `/families/{family_id}/projects` - Create a project (admin only).
async fn create_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(family_id): Path<uuid::Uuid>,
    Json(payload): Json<CreateProjectRequest>,
) -> impl IntoResponse {
    let family_repo = FamilyRepository::new((*state.db).clone());
    if let Err(e) = family_repo
        .require_member(family_id, auth.user_id(), Some(MemberRole::Admin))
        .await
    {
        return family_error_response(&e);
    }

    let name = payload.name.trim();
    if name.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "validation_error",
                "message": "Project name is required"
            })),
        )
            .into_response();
    }

    let repo = ProjectRepository::new((*state.db).clone());
    match repo
        .create(family_id, name, payload.budget, payload.description)
        .await
    {
        Ok(project) => {
            info!(family_id = %family_id, project_id = %project.id, "Project created");
            (StatusCode::CREATED, Json(json!({ "project": project }))).into_response()
        }
        Err(e) => project_error_response(&e),
    }
}

/// GET `/families/{family_id}/projects` - Projects with their total spend.
async fn list_projects(
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

    let repo = ProjectRepository::new((*state.db).clone());
    match repo.list(family_id).await {
        Ok(projects) => (StatusCode::OK, Json(json!({ "projects": projects }))).into_response(),
        Err(e) => project_error_response(&e),
    }
}

/// GET `/families/{family_id}/projects/{project_id}` - One project with its
/// total spend.
async fn get_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((family_id, project_id)): Path<(uuid::Uuid, uuid::Uuid)>,
) -> impl IntoResponse {
    let family_repo = FamilyRepository::new((*state.db).clone());
    if let Err(e) = family_repo
        .require_member(family_id, auth.user_id(), None)
        .await
    {
        return family_error_response(&e);
    }

    let repo = ProjectRepository::new((*state.db).clone());
    match repo.get(family_id, project_id).await {
        Ok(project) => (StatusCode::OK, Json(json!({ "project": project }))).into_response(),
        Err(e) => project_error_response(&e),
    }
}

/// PATCH `/families/{family_id}/projects/{project_id}` - Update a project
/// (admin only).
async fn update_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((family_id, project_id)): Path<(uuid::Uuid, uuid::Uuid)>,
    Json(payload): Json<UpdateProjectRequest>,
) -> impl IntoResponse {
    let family_repo = FamilyRepository::new((*state.db).clone());
    if let Err(e) = family_repo
        .require_member(family_id, auth.user_id(), Some(MemberRole::Admin))
        .await
    {
        return family_error_response(&e);
    }

    let repo = ProjectRepository::new((*state.db).clone());
    let input = UpdateProjectInput {
        name: payload.name,
        budget: payload.budget,
        description: payload.description,
    };

    match repo.update(family_id, project_id, input).await {
        Ok(project) => (StatusCode::OK, Json(json!({ "project": project }))).into_response(),
        Err(e) => project_error_response(&e),
    }
}

/// DELETE `/families/{family_id}/projects/{project_id}` - Delete a project
/// (admin only). Attached expenses are kept, detached from the project.
async fn delete_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((family_id, project_id)): Path<(uuid::Uuid, uuid::Uuid)>,
) -> impl IntoResponse {
    let family_repo = FamilyRepository::new((*state.db).clone());
    if let Err(e) = family_repo
        .require_member(family_id, auth.user_id(), Some(MemberRole::Admin))
        .await
    {
        return family_error_response(&e);
    }

    let repo = ProjectRepository::new((*state.db).clone());
    match repo.delete(family_id, project_id).await {
        Ok(()) => {
            info!(family_id = %family_id, project_id = %project_id, "Project deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => project_error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_update_request_absent_budget_is_unchanged() {
        let req: UpdateProjectRequest = serde_json::from_str(r#"{"name": "Kitchen"}"#).unwrap();
        assert_eq!(req.name.as_deref(), Some("Kitchen"));
        assert_eq!(req.budget, None);
    }

    #[test]
    fn test_update_request_null_budget_clears_it() {
        let req: UpdateProjectRequest = serde_json::from_str(r#"{"budget": null}"#).unwrap();
        assert_eq!(req.budget, Some(None));
    }

    #[test]
    fn test_update_request_budget_value() {
        let req: UpdateProjectRequest = serde_json::from_str(r#"{"budget": "1500.00"}"#).unwrap();
        assert_eq!(req.budget, Some(Some(dec!(1500.00))));
    }
}

fn project_error_response(err: &ProjectError) -> Response {
    let (status, error, message) = match err {
        ProjectError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", "Project not found"),
        ProjectError::NegativeBudget => (
            StatusCode::BAD_REQUEST,
            "negative_budget",
            "Project budget must not be negative",
        ),
        ProjectError::Database(e) => {
            error!(error = %e, "Database error in project operation");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An error occurred",
            )
        }
    };

    (status, Json(json!({ "error": error, "message": message }))).into_response()
}
