//! Project repository: budget buckets that group expenses.

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use splitnest_shared::types::round2;
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{expenses, projects};

/// Error types for project operations.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// Project not found in this family.
    #[error("project not found: {0}")]
    NotFound(Uuid),

    /// Budget must be zero or positive.
    #[error("project budget must not be negative")]
    NegativeBudget,

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// Merge-patch input for updating a project. `None` leaves a field
/// unchanged; `budget: Some(None)` clears the budget.
#[derive(Debug, Clone, Default)]
pub struct UpdateProjectInput {
    /// New name.
    pub name: Option<String>,
    /// New budget (outer `None` = unchanged).
    pub budget: Option<Option<Decimal>>,
    /// New description (outer `None` = unchanged).
    pub description: Option<Option<String>>,
}

/// A project with the total amount spent against it.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectWithSpend {
    /// The project row.
    pub project: projects::Model,
    /// Sum of the amounts of all expenses attached to the project.
    pub total_spent: Decimal,
}

/// Project repository for CRUD and spend aggregation.
#[derive(Debug, Clone)]
pub struct ProjectRepository {
    db: DatabaseConnection,
}

impl ProjectRepository {
    /// Creates a new project repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a project.
    ///
    /// # Errors
    ///
    /// Returns `NegativeBudget` when a negative budget is supplied.
    pub async fn create(
        &self,
        family_id: Uuid,
        name: &str,
        budget: Option<Decimal>,
        description: Option<String>,
    ) -> Result<projects::Model, ProjectError> {
        let budget = validate_budget(budget)?;
        let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();

        let project = projects::ActiveModel {
            id: Set(Uuid::new_v4()),
            family_id: Set(family_id),
            name: Set(name.to_string()),
            budget: Set(budget),
            description: Set(description),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        Ok(project)
    }

    /// Lists a family's projects with their total spend, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, family_id: Uuid) -> Result<Vec<ProjectWithSpend>, ProjectError> {
        let rows = projects::Entity::find()
            .filter(projects::Column::FamilyId.eq(family_id))
            .order_by_desc(projects::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let mut result = Vec::with_capacity(rows.len());
        for project in rows {
            let total_spent = self.total_spent(project.id).await?;
            result.push(ProjectWithSpend {
                project,
                total_spent,
            });
        }
        Ok(result)
    }

    /// Fetches a single project with its total spend.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the project is not in this family.
    pub async fn get(
        &self,
        family_id: Uuid,
        project_id: Uuid,
    ) -> Result<ProjectWithSpend, ProjectError> {
        let project = projects::Entity::find_by_id(project_id)
            .filter(projects::Column::FamilyId.eq(family_id))
            .one(&self.db)
            .await?
            .ok_or(ProjectError::NotFound(project_id))?;

        let total_spent = self.total_spent(project.id).await?;
        Ok(ProjectWithSpend {
            project,
            total_spent,
        })
    }

    /// Updates a project (merge-patch).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `NegativeBudget`.
    pub async fn update(
        &self,
        family_id: Uuid,
        project_id: Uuid,
        input: UpdateProjectInput,
    ) -> Result<projects::Model, ProjectError> {
        let project = projects::Entity::find_by_id(project_id)
            .filter(projects::Column::FamilyId.eq(family_id))
            .one(&self.db)
            .await?
            .ok_or(ProjectError::NotFound(project_id))?;

        let mut active: projects::ActiveModel = project.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(budget) = input.budget {
            active.budget = Set(validate_budget(budget)?);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        Ok(active.update(&self.db).await?)
    }

    /// Deletes a project. Attached expenses are kept, with their project
    /// reference cleared at the storage level.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the project is not in this family.
    pub async fn delete(&self, family_id: Uuid, project_id: Uuid) -> Result<(), ProjectError> {
        let project = projects::Entity::find_by_id(project_id)
            .filter(projects::Column::FamilyId.eq(family_id))
            .one(&self.db)
            .await?
            .ok_or(ProjectError::NotFound(project_id))?;

        project.delete(&self.db).await?;
        Ok(())
    }

    async fn total_spent(&self, project_id: Uuid) -> Result<Decimal, DbErr> {
        let rows = expenses::Entity::find()
            .filter(expenses::Column::ProjectId.eq(project_id))
            .all(&self.db)
            .await?;

        Ok(rows.iter().map(|e| e.amount).sum())
    }
}

fn validate_budget(budget: Option<Decimal>) -> Result<Option<Decimal>, ProjectError> {
    match budget {
        Some(b) if b < Decimal::ZERO => Err(ProjectError::NegativeBudget),
        Some(b) => Ok(Some(round2(b))),
        None => Ok(None),
    }
}
