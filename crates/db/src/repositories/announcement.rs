//! Announcement repository.

use huddle_common::AppResult;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, Order, QueryFilter, QueryOrder,
    QuerySelect,
};

use crate::db_err;
use crate::entities::{Announcement, announcement};

/// Repository for group announcements.
pub struct AnnouncementRepository<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> AnnouncementRepository<'c, C> {
    /// Create a new announcement repository.
    #[must_use]
    pub const fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Find announcement by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<announcement::Model>> {
        Announcement::find_by_id(id)
            .one(self.conn)
            .await
            .map_err(db_err)
    }

    /// Announcements of a group, newest first.
    pub async fn find_by_group(
        &self,
        group_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<announcement::Model>> {
        Announcement::find()
            .filter(announcement::Column::GroupId.eq(group_id))
            .order_by(announcement::Column::CreatedAt, Order::Desc)
            .offset(offset)
            .limit(limit)
            .all(self.conn)
            .await
            .map_err(db_err)
    }

    /// Create a new announcement.
    pub async fn create(
        &self,
        model: announcement::ActiveModel,
    ) -> AppResult<announcement::Model> {
        model.insert(self.conn).await.map_err(db_err)
    }

    /// Delete every announcement of a group.
    pub async fn delete_by_group(&self, group_id: &str) -> AppResult<u64> {
        let result = Announcement::delete_many()
            .filter(announcement::Column::GroupId.eq(group_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }
}
