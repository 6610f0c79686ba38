//! Bookmark repository.

use huddle_common::AppResult;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, Order, QueryFilter, QueryOrder,
    QuerySelect,
};

use crate::entities::bookmark::BookmarkKind;
use crate::entities::{Bookmark, bookmark};
use crate::{db_err, insert_err};

/// Repository for bookmarks.
pub struct BookmarkRepository<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> BookmarkRepository<'c, C> {
    /// Create a new bookmark repository.
    #[must_use]
    pub const fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Find a user's bookmark on a target.
    pub async fn find(
        &self,
        user_id: &str,
        kind: BookmarkKind,
        target_id: &str,
    ) -> AppResult<Option<bookmark::Model>> {
        Bookmark::find()
            .filter(bookmark::Column::UserId.eq(user_id))
            .filter(bookmark::Column::Kind.eq(kind))
            .filter(bookmark::Column::TargetId.eq(target_id))
            .one(self.conn)
            .await
            .map_err(db_err)
    }

    /// A user's bookmarks, newest first.
    pub async fn find_by_user(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<bookmark::Model>> {
        Bookmark::find()
            .filter(bookmark::Column::UserId.eq(user_id))
            .order_by(bookmark::Column::CreatedAt, Order::Desc)
            .offset(offset)
            .limit(limit)
            .all(self.conn)
            .await
            .map_err(db_err)
    }

    /// Create a bookmark. Bookmarking the same target twice is a conflict.
    pub async fn create(&self, model: bookmark::ActiveModel) -> AppResult<bookmark::Model> {
        model
            .insert(self.conn)
            .await
            .map_err(|e| insert_err(e, "Already bookmarked"))
    }

    /// Delete a user's bookmark on a target. Returns whether a row was removed.
    pub async fn delete(
        &self,
        user_id: &str,
        kind: BookmarkKind,
        target_id: &str,
    ) -> AppResult<bool> {
        let result = Bookmark::delete_many()
            .filter(bookmark::Column::UserId.eq(user_id))
            .filter(bookmark::Column::Kind.eq(kind))
            .filter(bookmark::Column::TargetId.eq(target_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected > 0)
    }

    /// Delete every bookmark on a target.
    pub async fn delete_by_target(&self, kind: BookmarkKind, target_id: &str) -> AppResult<u64> {
        let result = Bookmark::delete_many()
            .filter(bookmark::Column::Kind.eq(kind))
            .filter(bookmark::Column::TargetId.eq(target_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }

    /// Delete every bookmark pointing into a group.
    pub async fn delete_by_group(&self, group_id: &str) -> AppResult<u64> {
        let result = Bookmark::delete_many()
            .filter(bookmark::Column::GroupId.eq(group_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }
}
