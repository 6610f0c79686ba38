//! Category repository.

use chrono::Utc;
use huddle_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, Order, QueryFilter, QueryOrder,
    prelude::DateTimeWithTimeZone, sea_query::Expr,
};

use crate::db_err;
use crate::entities::{Category, category};

/// Repository for category operations.
pub struct CategoryRepository<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> CategoryRepository<'c, C> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Find category by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<category::Model>> {
        Category::find_by_id(id).one(self.conn).await.map_err(db_err)
    }

    /// Get category by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<category::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category not found: {id}")))
    }

    /// Root categories of a group.
    pub async fn find_roots(&self, group_id: &str) -> AppResult<Vec<category::Model>> {
        Category::find()
            .filter(category::Column::GroupId.eq(group_id))
            .filter(category::Column::ParentId.is_null())
            .order_by(category::Column::CreatedAt, Order::Asc)
            .all(self.conn)
            .await
            .map_err(db_err)
    }

    /// Direct children of a category.
    pub async fn find_children(&self, parent_id: &str) -> AppResult<Vec<category::Model>> {
        Category::find()
            .filter(category::Column::ParentId.eq(parent_id))
            .order_by(category::Column::CreatedAt, Order::Asc)
            .all(self.conn)
            .await
            .map_err(db_err)
    }

    /// Create a new category.
    pub async fn create(&self, model: category::ActiveModel) -> AppResult<category::Model> {
        model.insert(self.conn).await.map_err(db_err)
    }

    /// Update a category.
    pub async fn update(&self, model: category::ActiveModel) -> AppResult<category::Model> {
        model.update(self.conn).await.map_err(db_err)
    }

    /// Copy a visibility flag onto every child of `parent_id`.
    pub async fn set_children_public(&self, parent_id: &str, is_public: bool) -> AppResult<u64> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let result = Category::update_many()
            .col_expr(category::Column::IsPublic, Expr::value(is_public))
            .col_expr(category::Column::UpdatedAt, Expr::value(now))
            .filter(category::Column::ParentId.eq(parent_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }

    /// Delete a category row.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Category::delete_by_id(id)
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    /// Delete the children of a category.
    pub async fn delete_children(&self, parent_id: &str) -> AppResult<u64> {
        let result = Category::delete_many()
            .filter(category::Column::ParentId.eq(parent_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }

    /// Delete every category of a group, children before roots.
    pub async fn delete_by_group(&self, group_id: &str) -> AppResult<u64> {
        let children = Category::delete_many()
            .filter(category::Column::GroupId.eq(group_id))
            .filter(category::Column::ParentId.is_not_null())
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        let roots = Category::delete_many()
            .filter(category::Column::GroupId.eq(group_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(children.rows_affected + roots.rows_affected)
    }
}
