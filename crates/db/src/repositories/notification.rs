//! Notification repository.

use huddle_common::AppResult;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, sea_query::Expr,
};

use crate::db_err;
use crate::entities::{Notification, notification};

/// Repository for stored notifications.
pub struct NotificationRepository<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> NotificationRepository<'c, C> {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Notifications of a user, newest first.
    pub async fn find_by_user(
        &self,
        user_id: &str,
        unread_only: bool,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<notification::Model>> {
        let mut query = Notification::find().filter(notification::Column::UserId.eq(user_id));

        if unread_only {
            query = query.filter(notification::Column::IsRead.eq(false));
        }

        query
            .order_by(notification::Column::CreatedAt, Order::Desc)
            .order_by(notification::Column::Id, Order::Desc)
            .offset(offset)
            .limit(limit)
            .all(self.conn)
            .await
            .map_err(db_err)
    }

    /// Count unread notifications of a user.
    pub async fn count_unread(&self, user_id: &str) -> AppResult<u64> {
        Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .count(self.conn)
            .await
            .map_err(db_err)
    }

    /// Insert a batch of notifications.
    pub async fn create_many(&self, models: Vec<notification::ActiveModel>) -> AppResult<()> {
        if models.is_empty() {
            return Ok(());
        }

        Notification::insert_many(models)
            .exec_without_returning(self.conn)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    /// Insert one notification.
    pub async fn create(
        &self,
        model: notification::ActiveModel,
    ) -> AppResult<notification::Model> {
        model.insert(self.conn).await.map_err(db_err)
    }

    /// Mark one of a user's notifications as read. Returns whether it existed.
    pub async fn mark_as_read(&self, user_id: &str, id: &str) -> AppResult<bool> {
        let result = Notification::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::Id.eq(id))
            .filter(notification::Column::UserId.eq(user_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected > 0)
    }

    /// Mark all of a user's notifications as read.
    pub async fn mark_all_as_read(&self, user_id: &str) -> AppResult<u64> {
        let result = Notification::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }

    /// Delete every notification about a group.
    pub async fn delete_by_group(&self, group_id: &str) -> AppResult<u64> {
        let result = Notification::delete_many()
            .filter(notification::Column::GroupId.eq(group_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }
}
