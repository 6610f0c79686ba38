//! Group repository.

use huddle_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, Order, QueryFilter, QueryOrder,
    QuerySelect,
};

use crate::entities::{Group, group};
use crate::{db_err, insert_err};

/// Repository for group operations.
pub struct GroupRepository<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> GroupRepository<'c, C> {
    /// Create a new group repository.
    #[must_use]
    pub const fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Find group by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<group::Model>> {
        Group::find_by_id(id).one(self.conn).await.map_err(db_err)
    }

    /// Get group by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<group::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group not found: {id}")))
    }

    /// Find groups by IDs, in no particular order.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<group::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Group::find()
            .filter(group::Column::Id.is_in(ids.to_vec()))
            .all(self.conn)
            .await
            .map_err(db_err)
    }

    /// List public groups, newest first.
    pub async fn find_public(&self, limit: u64, offset: u64) -> AppResult<Vec<group::Model>> {
        Group::find()
            .filter(group::Column::IsPublic.eq(true))
            .order_by(group::Column::CreatedAt, Order::Desc)
            .offset(offset)
            .limit(limit)
            .all(self.conn)
            .await
            .map_err(db_err)
    }

    /// Create a new group. A taken name is a conflict.
    pub async fn create(&self, model: group::ActiveModel) -> AppResult<group::Model> {
        model
            .insert(self.conn)
            .await
            .map_err(|e| insert_err(e, "Group name already taken"))
    }

    /// Update a group. Renaming onto a taken name is a conflict.
    pub async fn update(&self, model: group::ActiveModel) -> AppResult<group::Model> {
        model
            .update(self.conn)
            .await
            .map_err(|e| insert_err(e, "Group name already taken"))
    }

    /// Delete the group row. Dependent rows must already be gone.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Group::delete_by_id(id)
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(())
    }
}
