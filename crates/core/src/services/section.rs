//! Section service.

use chrono::Utc;
use huddle_common::{AppError, AppResult, IdGenerator};
use huddle_db::UnitOfWork;
use huddle_db::entities::bookmark::BookmarkKind;
use huddle_db::entities::section::{self, SectionType};
use huddle_db::repositories::{
    BookmarkRepository, ContentRepository, FolderRepository, GroupRepository,
    PreferenceRepository, PreferenceScope, RankingRepository, SectionRepository,
};
use sea_orm::{ConnectionTrait, DatabaseConnection, Set};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::{policy, preference, visibility};

/// Input for creating a section.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSectionInput {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    pub section_type: SectionType,
    /// Parent root section; `None` creates a root.
    pub parent_id: Option<String>,
    /// Ignored for children, which take their parent's flag.
    #[serde(default)]
    pub is_public: bool,
}

/// Input for updating a section.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSectionInput {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    pub is_public: Option<bool>,
}

/// Service for managing sections.
#[derive(Clone)]
pub struct SectionService {
    db: DatabaseConnection,
    id_gen: IdGenerator,
}

impl SectionService {
    /// Create a new section service.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a root section, or a child under a root. Top manager only.
    ///
    /// A new root seeds the creator's notification preference.
    pub async fn create(
        &self,
        subject: &str,
        group_id: &str,
        input: CreateSectionInput,
    ) -> AppResult<section::Model> {
        input.validate()?;

        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let user = policy::caller(uow.conn(), subject).await?;
            GroupRepository::new(uow.conn()).get_by_id(group_id).await?;
            let member = policy::require_top_admin(uow.conn(), group_id, &user.id).await?;

            let sections = SectionRepository::new(uow.conn());
            let is_public = match &input.parent_id {
                Some(parent_id) => {
                    let parent = sections.get_by_id(parent_id).await?;
                    if parent.group_id != group_id {
                        return Err(AppError::NotFound(format!(
                            "Section not found: {parent_id}"
                        )));
                    }
                    if !parent.is_root() {
                        return Err(AppError::BadRequest(
                            "Sections nest one level deep".to_string(),
                        ));
                    }
                    parent.is_public
                }
                None => input.is_public,
            };

            let section = sections
                .create(section::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    group_id: Set(group_id.to_string()),
                    parent_id: Set(input.parent_id),
                    name: Set(input.name),
                    section_type: Set(input.section_type),
                    is_public: Set(is_public),
                    created_at: Set(Utc::now().into()),
                    updated_at: Set(None),
                })
                .await?;

            if section.is_root() {
                preference::seed(uow.conn(), PreferenceScope::Section(&section.id), &member.id)
                    .await?;
            }

            Ok(section)
        }
        .await;
        let section = uow.finish(result).await?;

        info!(group_id, section_id = %section.id, kind = ?section.section_type, "Section created");
        Ok(section)
    }

    /// Rename a section or change a root's visibility. Top manager only.
    ///
    /// Children follow their root's visibility.
    pub async fn update(
        &self,
        subject: &str,
        section_id: &str,
        input: UpdateSectionInput,
    ) -> AppResult<section::Model> {
        input.validate()?;

        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let user = policy::caller(uow.conn(), subject).await?;
            let sections = SectionRepository::new(uow.conn());
            let section = sections.get_by_id(section_id).await?;
            policy::require_top_admin(uow.conn(), &section.group_id, &user.id).await?;

            if input.is_public.is_some() && !section.is_root() {
                return Err(AppError::BadRequest(
                    "Visibility is set on root sections only".to_string(),
                ));
            }

            let mut active: section::ActiveModel = section.into();
            if let Some(name) = input.name {
                active.name = Set(name);
            }
            if let Some(is_public) = input.is_public {
                active.is_public = Set(is_public);
            }
            active.updated_at = Set(Some(Utc::now().into()));

            let section = sections.update(active).await?;
            if let Some(is_public) = input.is_public {
                sections.set_children_public(&section.id, is_public).await?;
            }
            Ok(section)
        }
        .await;
        let section = uow.finish(result).await?;

        info!(section_id, is_public = section.is_public, "Section updated");
        Ok(section)
    }

    /// Delete a section with its children and everything beneath. Top manager only.
    pub async fn delete(&self, subject: &str, section_id: &str) -> AppResult<()> {
        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let user = policy::caller(uow.conn(), subject).await?;
            let sections = SectionRepository::new(uow.conn());
            let section = sections.get_by_id(section_id).await?;
            policy::require_top_admin(uow.conn(), &section.group_id, &user.id).await?;

            for child in sections.find_children(section_id).await? {
                clear_section(uow.conn(), &child.id).await?;
            }
            sections.delete_children(section_id).await?;

            clear_section(uow.conn(), section_id).await?;
            PreferenceRepository::new(uow.conn())
                .delete_for_scope(PreferenceScope::Section(section_id))
                .await?;
            sections.delete(section_id).await?;

            Ok(section.group_id)
        }
        .await;
        let group_id = uow.finish(result).await?;

        info!(group_id = %group_id, section_id, "Section deleted");
        Ok(())
    }

    /// Root sections of a group visible to the caller.
    pub async fn list_roots(
        &self,
        subject: Option<&str>,
        group_id: &str,
    ) -> AppResult<Vec<section::Model>> {
        let group = GroupRepository::new(&self.db).get_by_id(group_id).await?;
        let viewer = visibility::authorize_read(&self.db, &group, subject).await?;
        let roots = SectionRepository::new(&self.db).find_roots(group_id).await?;
        Ok(visibility::visible_sections(roots, &viewer))
    }

    /// Children of a section visible to the caller.
    ///
    /// Outsiders of a public group only get the content-bearing ones.
    pub async fn list_children(
        &self,
        subject: Option<&str>,
        section_id: &str,
    ) -> AppResult<Vec<section::Model>> {
        let sections = SectionRepository::new(&self.db);
        let parent = sections.get_by_id(section_id).await?;
        let group = GroupRepository::new(&self.db)
            .get_by_id(&parent.group_id)
            .await?;
        let viewer = visibility::authorize_read(&self.db, &group, subject).await?;
        visibility::require_section(&parent, &viewer)?;

        let children = sections.find_children(section_id).await?;
        Ok(visibility::visible_sections(children, &viewer))
    }
}

/// Delete what lives directly in a section: contents, folders and what points at them.
async fn clear_section<C: ConnectionTrait>(conn: &C, section_id: &str) -> AppResult<()> {
    let bookmarks = BookmarkRepository::new(conn);
    let ranking = RankingRepository::new(conn);

    let contents = ContentRepository::new(conn);
    for content_id in contents.find_ids_by_section(section_id).await? {
        bookmarks
            .delete_by_target(BookmarkKind::Content, &content_id)
            .await?;
        ranking.delete_content(&content_id).await?;
    }
    contents.delete_by_section(section_id).await?;

    let folders = FolderRepository::new(conn);
    for folder in folders.find_by_section(section_id).await? {
        for attachment in folders.find_attachments(&folder.id).await? {
            bookmarks
                .delete_by_target(BookmarkKind::FolderAttachment, &attachment.id)
                .await?;
        }
        bookmarks
            .delete_by_target(BookmarkKind::Folder, &folder.id)
            .await?;
        folders.delete(&folder.id).await?;
    }

    Ok(())
}
