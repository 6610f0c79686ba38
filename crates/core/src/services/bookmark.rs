//! Bookmarks on contents, folders and folder attachments.

use chrono::Utc;
use huddle_common::{AppError, AppResult, IdGenerator};
use huddle_db::entities::bookmark::{self, BookmarkKind};
use huddle_db::repositories::{
    BookmarkRepository, ContentRepository, FolderRepository, GroupRepository, SectionRepository,
};
use sea_orm::{ConnectionTrait, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{policy, visibility};

/// What a bookmark points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookmarkTarget {
    Content(String),
    Folder(String),
    FolderAttachment(String),
}

impl BookmarkTarget {
    /// Rebuild a target from a stored row.
    #[must_use]
    pub fn from_row(kind: BookmarkKind, target_id: String) -> Self {
        match kind {
            BookmarkKind::Content => Self::Content(target_id),
            BookmarkKind::Folder => Self::Folder(target_id),
            BookmarkKind::FolderAttachment => Self::FolderAttachment(target_id),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> BookmarkKind {
        match self {
            Self::Content(_) => BookmarkKind::Content,
            Self::Folder(_) => BookmarkKind::Folder,
            Self::FolderAttachment(_) => BookmarkKind::FolderAttachment,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Content(id) | Self::Folder(id) | Self::FolderAttachment(id) => id,
        }
    }

    /// Group and section the target lives in.
    async fn locate<C: ConnectionTrait>(&self, conn: &C) -> AppResult<(String, String)> {
        match self {
            Self::Content(id) => {
                let content = ContentRepository::new(conn).get_by_id(id).await?;
                Ok((content.group_id, content.section_id))
            }
            Self::Folder(id) => {
                let folder = FolderRepository::new(conn).get_by_id(id).await?;
                Ok((folder.group_id, folder.section_id))
            }
            Self::FolderAttachment(id) => {
                let folders = FolderRepository::new(conn);
                let attachment = folders.get_attachment(id).await?;
                let folder = folders.get_by_id(&attachment.folder_id).await?;
                Ok((folder.group_id, folder.section_id))
            }
        }
    }
}

/// A stored bookmark with its target resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkResponse {
    pub id: String,
    pub group_id: String,
    pub target: BookmarkTarget,
    pub created_at: chrono::DateTime<Utc>,
}

impl From<bookmark::Model> for BookmarkResponse {
    fn from(model: bookmark::Model) -> Self {
        Self {
            id: model.id,
            group_id: model.group_id,
            target: BookmarkTarget::from_row(model.kind, model.target_id),
            created_at: model.created_at.into(),
        }
    }
}

/// Service for a user's bookmarks.
#[derive(Clone)]
pub struct BookmarkService {
    db: DatabaseConnection,
    id_gen: IdGenerator,
}

impl BookmarkService {
    /// Create a new bookmark service.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            id_gen: IdGenerator::new(),
        }
    }

    /// Bookmark a target the caller may read.
    pub async fn add(&self, subject: &str, target: BookmarkTarget) -> AppResult<BookmarkResponse> {
        let user = policy::caller(&self.db, subject).await?;
        let (group_id, section_id) = target.locate(&self.db).await?;

        let group = GroupRepository::new(&self.db).get_by_id(&group_id).await?;
        let viewer = visibility::authorize_read(&self.db, &group, Some(subject)).await?;
        let section = SectionRepository::new(&self.db).get_by_id(&section_id).await?;
        visibility::require_section(&section, &viewer)?;

        let model = BookmarkRepository::new(&self.db)
            .create(bookmark::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(user.id),
                group_id: Set(group_id),
                kind: Set(target.kind()),
                target_id: Set(target.id().to_string()),
                created_at: Set(Utc::now().into()),
            })
            .await?;

        info!(bookmark_id = %model.id, kind = ?model.kind, "Bookmark added");
        Ok(model.into())
    }

    /// Remove the caller's bookmark on a target.
    pub async fn remove(&self, subject: &str, target: &BookmarkTarget) -> AppResult<()> {
        let user = policy::caller(&self.db, subject).await?;
        let removed = BookmarkRepository::new(&self.db)
            .delete(&user.id, target.kind(), target.id())
            .await?;

        if !removed {
            return Err(AppError::NotFound("Bookmark not found".to_string()));
        }
        Ok(())
    }

    /// The caller's bookmarks, newest first.
    pub async fn list(
        &self,
        subject: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<BookmarkResponse>> {
        let user = policy::caller(&self.db, subject).await?;
        let rows = BookmarkRepository::new(&self.db)
            .find_by_user(&user.id, limit, offset)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_target_row_mapping() {
        for target in [
            BookmarkTarget::Content("c1".to_string()),
            BookmarkTarget::Folder("f1".to_string()),
            BookmarkTarget::FolderAttachment("a1".to_string()),
        ] {
            let rebuilt = BookmarkTarget::from_row(target.kind(), target.id().to_string());
            assert_eq!(rebuilt, target);
        }
    }

    #[test]
    fn test_target_wire_format() {
        let json = serde_json::to_string(&BookmarkTarget::FolderAttachment("a1".to_string()))
            .unwrap();
        assert_eq!(json, r#"{"type":"FOLDER_ATTACHMENT","id":"a1"}"#);
    }

    #[tokio::test]
    async fn test_bookmark_lifecycle() {
        use crate::services::content::{ContentService, CreateContentInput};
        use crate::services::test_support::World;
        use huddle_db::entities::section::SectionType;

        const OWNER: &str = "owner@example.com";
        const OUTSIDER: &str = "outsider@example.com";

        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        world.user(OUTSIDER, "Outsider").await;
        let group = world.group(OWNER, "Public", true).await;
        let open = world
            .section(OWNER, &group.id, None, SectionType::Menu, true)
            .await;
        let closed = world
            .section(OWNER, &group.id, None, SectionType::Menu, false)
            .await;

        let contents =
            ContentService::new(world.db.clone(), world.sink.clone(), world.ranking.clone());
        let post = |title: &str| CreateContentInput {
            title: title.to_string(),
            body: String::new(),
            mentions: Vec::new(),
        };
        let visible = contents.create(OWNER, &open.id, post("Open")).await.unwrap();
        let hidden = contents.create(OWNER, &closed.id, post("Closed")).await.unwrap();

        let service = BookmarkService::new(world.db.clone());
        let target = BookmarkTarget::Content(visible.id.clone());

        let added = service.add(OUTSIDER, target.clone()).await.unwrap();
        assert_eq!(added.group_id, group.id);
        assert_eq!(added.target, target);

        let err = service.add(OUTSIDER, target.clone()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = service
            .add(OUTSIDER, BookmarkTarget::Content(hidden.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let err = service
            .add(OUTSIDER, BookmarkTarget::Folder("missing".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert_eq!(service.list(OUTSIDER, 10, 0).await.unwrap().len(), 1);
        service.remove(OUTSIDER, &target).await.unwrap();
        assert!(service.list(OUTSIDER, 10, 0).await.unwrap().is_empty());

        let err = service.remove(OUTSIDER, &target).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
