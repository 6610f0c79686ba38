//! Folder and folder attachment repository.

use huddle_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, Order, QueryFilter, QueryOrder,
    QuerySelect,
};

use crate::db_err;
use crate::entities::{Folder, FolderAttachment, folder, folder_attachment};

/// Repository for folders and the attachments inside them.
pub struct FolderRepository<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> FolderRepository<'c, C> {
    /// Create a new folder repository.
    #[must_use]
    pub const fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    // ==================== Folder Operations ====================

    /// Find folder by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<folder::Model>> {
        Folder::find_by_id(id).one(self.conn).await.map_err(db_err)
    }

    /// Get folder by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<folder::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Folder not found: {id}")))
    }

    /// Folders of a section, by name.
    pub async fn find_by_section(&self, section_id: &str) -> AppResult<Vec<folder::Model>> {
        Folder::find()
            .filter(folder::Column::SectionId.eq(section_id))
            .order_by(folder::Column::Name, Order::Asc)
            .all(self.conn)
            .await
            .map_err(db_err)
    }

    /// Create a new folder.
    pub async fn create(&self, model: folder::ActiveModel) -> AppResult<folder::Model> {
        model.insert(self.conn).await.map_err(db_err)
    }

    /// Delete a folder and its attachments.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        FolderAttachment::delete_many()
            .filter(folder_attachment::Column::FolderId.eq(id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Folder::delete_by_id(id)
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    /// Delete every folder of a group, attachments first.
    pub async fn delete_by_group(&self, group_id: &str) -> AppResult<u64> {
        let folder_ids: Vec<String> = Folder::find()
            .select_only()
            .column(folder::Column::Id)
            .filter(folder::Column::GroupId.eq(group_id))
            .into_tuple()
            .all(self.conn)
            .await
            .map_err(db_err)?;

        if folder_ids.is_empty() {
            return Ok(0);
        }

        FolderAttachment::delete_many()
            .filter(folder_attachment::Column::FolderId.is_in(folder_ids.clone()))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        let result = Folder::delete_many()
            .filter(folder::Column::Id.is_in(folder_ids))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }

    // ==================== Attachment Operations ====================

    /// Find attachment by ID.
    pub async fn find_attachment(&self, id: &str) -> AppResult<Option<folder_attachment::Model>> {
        FolderAttachment::find_by_id(id)
            .one(self.conn)
            .await
            .map_err(db_err)
    }

    /// Get attachment by ID, returning error if not found.
    pub async fn get_attachment(&self, id: &str) -> AppResult<folder_attachment::Model> {
        self.find_attachment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attachment not found: {id}")))
    }

    /// Attachments of a folder, oldest first.
    pub async fn find_attachments(
        &self,
        folder_id: &str,
    ) -> AppResult<Vec<folder_attachment::Model>> {
        FolderAttachment::find()
            .filter(folder_attachment::Column::FolderId.eq(folder_id))
            .order_by(folder_attachment::Column::CreatedAt, Order::Asc)
            .all(self.conn)
            .await
            .map_err(db_err)
    }

    /// Add an attachment to a folder.
    pub async fn create_attachment(
        &self,
        model: folder_attachment::ActiveModel,
    ) -> AppResult<folder_attachment::Model> {
        model.insert(self.conn).await.map_err(db_err)
    }

    /// Delete an attachment.
    pub async fn delete_attachment(&self, id: &str) -> AppResult<()> {
        FolderAttachment::delete_by_id(id)
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(())
    }
}
