//! Family repository: family lifecycle, membership, and authorization.
//!
//! `require_member` is the single authorization capability consumed by every
//! protected route: it resolves the caller's `family_members` row and checks
//! status and (optionally) role in one place.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{
    families, family_members,
    sea_orm_active_enums::{MemberRole, MemberStatus},
    users, wallets,
};

/// Error types for family and membership operations.
#[derive(Debug, Error)]
pub enum FamilyError {
    /// Family not found.
    #[error("family not found: {0}")]
    NotFound(Uuid),

    /// Family member not found in this family.
    #[error("family member not found: {0}")]
    MemberNotFound(Uuid),

    /// The caller is not a member of the family.
    #[error("not a member of this family")]
    NotAMember,

    /// The caller's membership is not active.
    #[error("membership is not active")]
    MemberNotActive,

    /// The operation requires the admin role.
    #[error("admin role required")]
    AdminRequired,

    /// Invited user does not exist.
    #[error("no user registered with email {0}")]
    UserNotFound(String),

    /// User already belongs to the family (active or pending).
    #[error("user is already a member of this family")]
    AlreadyMember,

    /// Invite is not in the pending state.
    #[error("invite is not pending")]
    InviteNotPending,

    /// Only the invited user may accept an invite.
    #[error("you can only accept your own invites")]
    NotYourInvite,

    /// Removing this member would leave the family without an active admin.
    #[error("cannot remove the last active admin of a family")]
    LastAdmin,

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// A family member joined with the user's public details.
#[derive(Debug, Clone, Serialize)]
pub struct MemberWithUser {
    /// The membership row.
    pub member: family_members::Model,
    /// The user's display name.
    pub name: String,
    /// The user's email.
    pub email: String,
    /// The user's avatar, if set.
    pub avatar_url: Option<String>,
}

/// Family repository for family and membership operations.
#[derive(Debug, Clone)]
pub struct FamilyRepository {
    db: DatabaseConnection,
}

impl FamilyRepository {
    /// Creates a new family repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Resolves the caller's membership in a family, enforcing active status
    /// and (optionally) a required role.
    ///
    /// # Errors
    ///
    /// Returns `NotAMember`, `MemberNotActive`, or `AdminRequired` when the
    /// caller does not satisfy the requirement.
    pub async fn require_member(
        &self,
        family_id: Uuid,
        user_id: Uuid,
        required_role: Option<MemberRole>,
    ) -> Result<family_members::Model, FamilyError> {
        let member = family_members::Entity::find()
            .filter(family_members::Column::FamilyId.eq(family_id))
            .filter(family_members::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or(FamilyError::NotAMember)?;

        if member.status != MemberStatus::Active {
            return Err(FamilyError::MemberNotActive);
        }
        if required_role == Some(MemberRole::Admin) && member.role != MemberRole::Admin {
            return Err(FamilyError::AdminRequired);
        }

        Ok(member)
    }

    /// Creates a family with the creator as its first active admin member,
    /// including the member's wallet. All three inserts commit together.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails.
    pub async fn create_with_admin(
        &self,
        name: &str,
        creator_user_id: Uuid,
    ) -> Result<(families::Model, family_members::Model), FamilyError> {
        let txn = self.db.begin().await?;
        let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();

        let family = families::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            created_by_user_id: Set(creator_user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let member = family_members::ActiveModel {
            id: Set(Uuid::new_v4()),
            family_id: Set(family.id),
            user_id: Set(creator_user_id),
            role: Set(MemberRole::Admin),
            status: Set(MemberStatus::Active),
            invited_by_user_id: Set(None),
            joined_at: Set(Some(now)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        wallets::ActiveModel {
            id: Set(Uuid::new_v4()),
            family_member_id: Set(member.id),
            balance: Set(rust_decimal::Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        Ok((family, member))
    }

    /// Finds a family by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, family_id: Uuid) -> Result<Option<families::Model>, DbErr> {
        families::Entity::find_by_id(family_id).one(&self.db).await
    }

    /// Lists the families a user belongs to, with their membership row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(families::Model, family_members::Model)>, DbErr> {
        let rows = family_members::Entity::find()
            .filter(family_members::Column::UserId.eq(user_id))
            .find_also_related(families::Entity)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(member, family)| family.map(|f| (f, member)))
            .collect())
    }

    /// Renames a family.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the family does not exist.
    pub async fn rename(&self, family_id: Uuid, name: &str) -> Result<families::Model, FamilyError> {
        let family = families::Entity::find_by_id(family_id)
            .one(&self.db)
            .await?
            .ok_or(FamilyError::NotFound(family_id))?;

        let mut active: families::ActiveModel = family.into();
        active.name = Set(name.to_string());
        Ok(active.update(&self.db).await?)
    }

    /// Deletes a family. Members, wallets, projects, expenses, and
    /// transactions cascade at the storage level.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the family does not exist.
    pub async fn delete(&self, family_id: Uuid) -> Result<(), FamilyError> {
        let family = families::Entity::find_by_id(family_id)
            .one(&self.db)
            .await?
            .ok_or(FamilyError::NotFound(family_id))?;

        family.delete(&self.db).await?;
        Ok(())
    }

    /// Lists all members of a family with their user details.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_members(&self, family_id: Uuid) -> Result<Vec<MemberWithUser>, DbErr> {
        let rows = family_members::Entity::find()
            .filter(family_members::Column::FamilyId.eq(family_id))
            .find_also_related(users::Entity)
            .order_by_asc(family_members::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(member, user)| {
                user.map(|u| MemberWithUser {
                    member,
                    name: u.name,
                    email: u.email,
                    avatar_url: u.avatar_url,
                })
            })
            .collect())
    }

    /// Invites a registered user (by email) into a family as a pending
    /// member. The wallet is created later, on acceptance.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` for unknown emails and `AlreadyMember` when a
    /// membership (any status) already exists.
    pub async fn invite_member(
        &self,
        family_id: Uuid,
        email: &str,
        role: MemberRole,
        invited_by_user_id: Uuid,
    ) -> Result<family_members::Model, FamilyError> {
        let txn = self.db.begin().await?;

        let invited_user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&txn)
            .await?
            .ok_or_else(|| FamilyError::UserNotFound(email.to_string()))?;

        let existing = family_members::Entity::find()
            .filter(family_members::Column::FamilyId.eq(family_id))
            .filter(family_members::Column::UserId.eq(invited_user.id))
            .count(&txn)
            .await?;
        if existing > 0 {
            return Err(FamilyError::AlreadyMember);
        }

        let now = chrono::Utc::now().into();
        let member = family_members::ActiveModel {
            id: Set(Uuid::new_v4()),
            family_id: Set(family_id),
            user_id: Set(invited_user.id),
            role: Set(role),
            status: Set(MemberStatus::Pending),
            invited_by_user_id: Set(Some(invited_by_user_id)),
            joined_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(member)
    }

    /// Accepts a pending invite: activates the membership and creates the
    /// member's wallet, atomically.
    ///
    /// # Errors
    ///
    /// Returns `MemberNotFound`, `NotYourInvite`, or `InviteNotPending` when
    /// the invite cannot be accepted by this user.
    pub async fn accept_invite(
        &self,
        member_id: Uuid,
        user_id: Uuid,
    ) -> Result<family_members::Model, FamilyError> {
        let txn = self.db.begin().await?;

        let member = family_members::Entity::find_by_id(member_id)
            .one(&txn)
            .await?
            .ok_or(FamilyError::MemberNotFound(member_id))?;

        if member.user_id != user_id {
            return Err(FamilyError::NotYourInvite);
        }
        if member.status != MemberStatus::Pending {
            return Err(FamilyError::InviteNotPending);
        }

        let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();
        let mut active: family_members::ActiveModel = member.into();
        active.status = Set(MemberStatus::Active);
        active.joined_at = Set(Some(now));
        let member = active.update(&txn).await?;

        wallets::ActiveModel {
            id: Set(Uuid::new_v4()),
            family_member_id: Set(member.id),
            balance: Set(rust_decimal::Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(member)
    }

    /// Updates a member's role and/or status (merge-patch: `None` leaves the
    /// field unchanged).
    ///
    /// # Errors
    ///
    /// Returns `MemberNotFound` if the member is not in this family.
    pub async fn update_member(
        &self,
        family_id: Uuid,
        member_id: Uuid,
        role: Option<MemberRole>,
        status: Option<MemberStatus>,
    ) -> Result<family_members::Model, FamilyError> {
        let member = family_members::Entity::find_by_id(member_id)
            .filter(family_members::Column::FamilyId.eq(family_id))
            .one(&self.db)
            .await?
            .ok_or(FamilyError::MemberNotFound(member_id))?;

        let mut active: family_members::ActiveModel = member.into();
        if let Some(role) = role {
            active.role = Set(role);
        }
        if let Some(status) = status {
            active.status = Set(status);
        }
        Ok(active.update(&self.db).await?)
    }

    /// Removes a member from a family. Their wallet and its transactions
    /// cascade. Removing the sole active admin is rejected.
    ///
    /// # Errors
    ///
    /// Returns `MemberNotFound` or `LastAdmin`.
    pub async fn remove_member(&self, family_id: Uuid, member_id: Uuid) -> Result<(), FamilyError> {
        let txn = self.db.begin().await?;

        let member = family_members::Entity::find_by_id(member_id)
            .filter(family_members::Column::FamilyId.eq(family_id))
            .one(&txn)
            .await?
            .ok_or(FamilyError::MemberNotFound(member_id))?;

        if member.role == MemberRole::Admin && member.status == MemberStatus::Active {
            let active_admins = family_members::Entity::find()
                .filter(family_members::Column::FamilyId.eq(family_id))
                .filter(family_members::Column::Role.eq(MemberRole::Admin))
                .filter(family_members::Column::Status.eq(MemberStatus::Active))
                .count(&txn)
                .await?;
            if active_admins <= 1 {
                return Err(FamilyError::LastAdmin);
            }
        }

        member.delete(&txn).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Returns the IDs of a family's active members, in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn active_member_ids(&self, family_id: Uuid) -> Result<Vec<Uuid>, DbErr> {
        let members = family_members::Entity::find()
            .filter(family_members::Column::FamilyId.eq(family_id))
            .filter(family_members::Column::Status.eq(MemberStatus::Active))
            .order_by_asc(family_members::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(members.into_iter().map(|m| m.id).collect())
    }
}
