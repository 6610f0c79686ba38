//! Content repository.

use huddle_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, Order, QueryFilter, QueryOrder,
    QuerySelect,
};

use crate::db_err;
use crate::entities::{Content, content};

/// Repository for content operations.
pub struct ContentRepository<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> ContentRepository<'c, C> {
    /// Create a new content repository.
    #[must_use]
    pub const fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Find content by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<content::Model>> {
        Content::find_by_id(id).one(self.conn).await.map_err(db_err)
    }

    /// Get content by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<content::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Content not found: {id}")))
    }

    /// Find contents by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<content::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Content::find()
            .filter(content::Column::Id.is_in(ids.to_vec()))
            .all(self.conn)
            .await
            .map_err(db_err)
    }

    /// Contents of a section, newest first.
    pub async fn find_by_section(
        &self,
        section_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<content::Model>> {
        Content::find()
            .filter(content::Column::SectionId.eq(section_id))
            .order_by(content::Column::CreatedAt, Order::Desc)
            .order_by(content::Column::Id, Order::Desc)
            .offset(offset)
            .limit(limit)
            .all(self.conn)
            .await
            .map_err(db_err)
    }

    /// IDs of every content of a section.
    pub async fn find_ids_by_section(&self, section_id: &str) -> AppResult<Vec<String>> {
        Content::find()
            .select_only()
            .column(content::Column::Id)
            .filter(content::Column::SectionId.eq(section_id))
            .into_tuple()
            .all(self.conn)
            .await
            .map_err(db_err)
    }

    /// Create new content.
    pub async fn create(&self, model: content::ActiveModel) -> AppResult<content::Model> {
        model.insert(self.conn).await.map_err(db_err)
    }

    /// Delete a content row.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Content::delete_by_id(id)
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    /// Delete the contents of a section.
    pub async fn delete_by_section(&self, section_id: &str) -> AppResult<u64> {
        let result = Content::delete_many()
            .filter(content::Column::SectionId.eq(section_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }

    /// Delete every content of a group.
    pub async fn delete_by_group(&self, group_id: &str) -> AppResult<u64> {
        let result = Content::delete_many()
            .filter(content::Column::GroupId.eq(group_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }
}
