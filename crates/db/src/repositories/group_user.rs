//! Group membership repository.

use chrono::Utc;
use huddle_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, prelude::DateTimeWithTimeZone, sea_query::Expr,
};

use crate::entities::group_user::GroupRole;
use crate::entities::{GroupUser, group_user};
use crate::{db_err, insert_err};

const ACTIVE_ROLES: [GroupRole; 3] = [GroupRole::TopManager, GroupRole::Manager, GroupRole::User];

/// Repository for membership rows.
pub struct GroupUserRepository<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> GroupUserRepository<'c, C> {
    /// Create a new membership repository.
    #[must_use]
    pub const fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Find membership by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<group_user::Model>> {
        GroupUser::find_by_id(id).one(self.conn).await.map_err(db_err)
    }

    /// Get membership by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<group_user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Membership not found: {id}")))
    }

    /// Find the membership of a user in a group.
    pub async fn find_by_group_and_user(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<Option<group_user::Model>> {
        GroupUser::find()
            .filter(group_user::Column::GroupId.eq(group_id))
            .filter(group_user::Column::UserId.eq(user_id))
            .one(self.conn)
            .await
            .map_err(db_err)
    }

    /// Get the membership of a user in a group, returning error if not found.
    pub async fn get_by_group_and_user(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<group_user::Model> {
        self.find_by_group_and_user(group_id, user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Membership not found: {user_id} in {group_id}"))
            })
    }

    /// All memberships of a group, oldest first.
    pub async fn find_by_group(&self, group_id: &str) -> AppResult<Vec<group_user::Model>> {
        GroupUser::find()
            .filter(group_user::Column::GroupId.eq(group_id))
            .order_by(group_user::Column::CreatedAt, Order::Asc)
            .all(self.conn)
            .await
            .map_err(db_err)
    }

    /// Memberships of a group holding an active role.
    pub async fn find_active_by_group(&self, group_id: &str) -> AppResult<Vec<group_user::Model>> {
        GroupUser::find()
            .filter(group_user::Column::GroupId.eq(group_id))
            .filter(group_user::Column::Role.is_in(ACTIVE_ROLES))
            .order_by(group_user::Column::CreatedAt, Order::Asc)
            .all(self.conn)
            .await
            .map_err(db_err)
    }

    /// Memberships of a group in one role.
    pub async fn find_by_group_and_role(
        &self,
        group_id: &str,
        role: GroupRole,
    ) -> AppResult<Vec<group_user::Model>> {
        GroupUser::find()
            .filter(group_user::Column::GroupId.eq(group_id))
            .filter(group_user::Column::Role.eq(role))
            .order_by(group_user::Column::CreatedAt, Order::Asc)
            .all(self.conn)
            .await
            .map_err(db_err)
    }

    /// All memberships of a user.
    pub async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<group_user::Model>> {
        GroupUser::find()
            .filter(group_user::Column::UserId.eq(user_id))
            .order_by(group_user::Column::CreatedAt, Order::Desc)
            .all(self.conn)
            .await
            .map_err(db_err)
    }

    /// Count active members of a group.
    pub async fn count_active(&self, group_id: &str) -> AppResult<u64> {
        GroupUser::find()
            .filter(group_user::Column::GroupId.eq(group_id))
            .filter(group_user::Column::Role.is_in(ACTIVE_ROLES))
            .count(self.conn)
            .await
            .map_err(db_err)
    }

    /// Insert a membership. The unique indexes turn a racing duplicate into a conflict.
    pub async fn create(&self, model: group_user::ActiveModel) -> AppResult<group_user::Model> {
        model
            .insert(self.conn)
            .await
            .map_err(|e| insert_err(e, "Membership or member name already exists"))
    }

    /// Update mutable membership fields other than the role.
    pub async fn update(&self, model: group_user::ActiveModel) -> AppResult<group_user::Model> {
        model
            .update(self.conn)
            .await
            .map_err(|e| insert_err(e, "Member name already taken"))
    }

    /// Write a new role and acceptance state, guarded by the row version.
    ///
    /// Fails with `Conflict` when the row changed since `member` was read.
    pub async fn update_state(
        &self,
        member: &group_user::Model,
        role: GroupRole,
        is_accepted: bool,
        is_approved: bool,
    ) -> AppResult<group_user::Model> {
        let now: DateTimeWithTimeZone = Utc::now().into();

        let result = GroupUser::update_many()
            .col_expr(group_user::Column::Role, Expr::value(role))
            .col_expr(group_user::Column::IsAccepted, Expr::value(is_accepted))
            .col_expr(group_user::Column::IsApproved, Expr::value(is_approved))
            .col_expr(
                group_user::Column::Version,
                Expr::col(group_user::Column::Version).add(1),
            )
            .col_expr(group_user::Column::UpdatedAt, Expr::value(now))
            .filter(group_user::Column::Id.eq(&member.id))
            .filter(group_user::Column::Version.eq(member.version))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(AppError::Conflict(format!(
                "Membership {} was modified concurrently",
                member.id
            )));
        }

        Ok(group_user::Model {
            role,
            is_accepted,
            is_approved,
            version: member.version + 1,
            updated_at: Some(now),
            ..member.clone()
        })
    }

    /// Delete a membership row.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        GroupUser::delete_by_id(id)
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    /// Delete every membership of a group.
    pub async fn delete_by_group(&self, group_id: &str) -> AppResult<u64> {
        let result = GroupUser::delete_many()
            .filter(group_user::Column::GroupId.eq(group_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }
}
