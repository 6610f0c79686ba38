//! Folder service for repository sections.
//!
//! Attachments are URL references; uploading the blob is left to the storage
//! layer in front of this service.

use chrono::Utc;
use huddle_common::{AppError, AppResult, IdGenerator};
use huddle_db::UnitOfWork;
use huddle_db::entities::bookmark::BookmarkKind;
use huddle_db::entities::section::SectionType;
use huddle_db::entities::{folder, folder_attachment};
use huddle_db::repositories::{
    BookmarkRepository, FolderRepository, GroupRepository, SectionRepository,
};
use sea_orm::{DatabaseConnection, Set};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::{policy, visibility};

/// Input for creating a folder.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderInput {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
}

/// Input for attaching a file to a folder.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddAttachmentInput {
    #[validate(length(min = 1, max = 256))]
    pub file_name: String,
    #[validate(url)]
    pub url: String,
}

/// Service for folders and their attachments.
#[derive(Clone)]
pub struct FolderService {
    db: DatabaseConnection,
    id_gen: IdGenerator,
}

impl FolderService {
    /// Create a new folder service.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a folder in a repository section. Active members only.
    pub async fn create(
        &self,
        subject: &str,
        section_id: &str,
        input: CreateFolderInput,
    ) -> AppResult<folder::Model> {
        input.validate()?;

        let user = policy::caller(&self.db, subject).await?;
        let section = SectionRepository::new(&self.db).get_by_id(section_id).await?;
        policy::require_active(&self.db, &section.group_id, &user.id).await?;

        if section.section_type != SectionType::Repository {
            return Err(AppError::BadRequest(
                "Folders live in repository sections only".to_string(),
            ));
        }

        let folder = FolderRepository::new(&self.db)
            .create(folder::ActiveModel {
                id: Set(self.id_gen.generate()),
                group_id: Set(section.group_id),
                section_id: Set(section.id),
                name: Set(input.name),
                created_at: Set(Utc::now().into()),
            })
            .await?;

        info!(section_id, folder_id = %folder.id, "Folder created");
        Ok(folder)
    }

    /// Attach a file to a folder. Active members only.
    pub async fn add_attachment(
        &self,
        subject: &str,
        folder_id: &str,
        input: AddAttachmentInput,
    ) -> AppResult<folder_attachment::Model> {
        input.validate()?;

        let user = policy::caller(&self.db, subject).await?;
        let folders = FolderRepository::new(&self.db);
        let folder = folders.get_by_id(folder_id).await?;
        policy::require_active(&self.db, &folder.group_id, &user.id).await?;

        let attachment = folders
            .create_attachment(folder_attachment::ActiveModel {
                id: Set(self.id_gen.generate()),
                folder_id: Set(folder.id),
                file_name: Set(input.file_name),
                url: Set(input.url),
                created_at: Set(Utc::now().into()),
            })
            .await?;

        info!(folder_id, attachment_id = %attachment.id, "Attachment added");
        Ok(attachment)
    }

    /// Folders of a repository section.
    pub async fn list(
        &self,
        subject: Option<&str>,
        section_id: &str,
    ) -> AppResult<Vec<folder::Model>> {
        let section = SectionRepository::new(&self.db).get_by_id(section_id).await?;
        let group = GroupRepository::new(&self.db)
            .get_by_id(&section.group_id)
            .await?;
        let viewer = visibility::authorize_read(&self.db, &group, subject).await?;
        visibility::require_section(&section, &viewer)?;

        FolderRepository::new(&self.db).find_by_section(section_id).await
    }

    /// Attachments of a folder.
    pub async fn list_attachments(
        &self,
        subject: Option<&str>,
        folder_id: &str,
    ) -> AppResult<Vec<folder_attachment::Model>> {
        let folders = FolderRepository::new(&self.db);
        let folder = folders.get_by_id(folder_id).await?;
        let section = SectionRepository::new(&self.db)
            .get_by_id(&folder.section_id)
            .await?;
        let group = GroupRepository::new(&self.db)
            .get_by_id(&folder.group_id)
            .await?;
        let viewer = visibility::authorize_read(&self.db, &group, subject).await?;
        visibility::require_section(&section, &viewer)?;

        folders.find_attachments(folder_id).await
    }

    /// Delete a folder with its attachments. Admins only.
    pub async fn delete(&self, subject: &str, folder_id: &str) -> AppResult<()> {
        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let user = policy::caller(uow.conn(), subject).await?;
            let folders = FolderRepository::new(uow.conn());
            let folder = folders.get_by_id(folder_id).await?;
            policy::require_admin(uow.conn(), &folder.group_id, &user.id).await?;

            let bookmarks = BookmarkRepository::new(uow.conn());
            for attachment in folders.find_attachments(folder_id).await? {
                bookmarks
                    .delete_by_target(BookmarkKind::FolderAttachment, &attachment.id)
                    .await?;
            }
            bookmarks
                .delete_by_target(BookmarkKind::Folder, folder_id)
                .await?;
            folders.delete(folder_id).await
        }
        .await;
        uow.finish(result).await?;

        info!(folder_id, "Folder deleted");
        Ok(())
    }

    /// Remove one attachment. Admins only.
    pub async fn delete_attachment(&self, subject: &str, attachment_id: &str) -> AppResult<()> {
        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let user = policy::caller(uow.conn(), subject).await?;
            let folders = FolderRepository::new(uow.conn());
            let attachment = folders.get_attachment(attachment_id).await?;
            let folder = folders.get_by_id(&attachment.folder_id).await?;
            policy::require_admin(uow.conn(), &folder.group_id, &user.id).await?;

            BookmarkRepository::new(uow.conn())
                .delete_by_target(BookmarkKind::FolderAttachment, attachment_id)
                .await?;
            folders.delete_attachment(attachment_id).await
        }
        .await;
        uow.finish(result).await?;

        info!(attachment_id, "Attachment deleted");
        Ok(())
    }
}
