//! Content service.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use huddle_common::{AppError, AppResult, IdGenerator};
use huddle_db::UnitOfWork;
use huddle_db::entities::bookmark::BookmarkKind;
use huddle_db::entities::category_notification::NotificationSetting;
use huddle_db::entities::notification::NotificationKind;
use huddle_db::entities::{content, group_user, section};
use huddle_db::repositories::{
    BookmarkRepository, ContentRepository, GroupRepository, GroupUserRepository,
    PreferenceRepository, RankingRepository, SectionRepository,
};
use sea_orm::{ConnectionTrait, DatabaseConnection, Set};
use serde::Deserialize;
use tracing::{debug, info};
use validator::Validate;

use super::notification::{NotificationEvent, NotificationSink, dispatch};
use super::ranking::RankingService;
use super::{policy, visibility};

/// Input for creating content.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateContentInput {
    #[validate(length(min = 1, max = 256))]
    pub title: String,
    #[validate(length(max = 65536))]
    pub body: String,
    /// Membership IDs of mentioned members.
    #[serde(default)]
    pub mentions: Vec<String>,
}

/// Service for content posted in sections.
#[derive(Clone)]
pub struct ContentService {
    db: DatabaseConnection,
    sink: Arc<dyn NotificationSink>,
    ranking: RankingService,
    id_gen: IdGenerator,
}

impl ContentService {
    /// Create a new content service.
    #[must_use]
    pub const fn new(
        db: DatabaseConnection,
        sink: Arc<dyn NotificationSink>,
        ranking: RankingService,
    ) -> Self {
        Self {
            db,
            sink,
            ranking,
            id_gen: IdGenerator::new(),
        }
    }

    /// Post content in a menu or repository section. Active members only.
    ///
    /// Members of the root section hear about it according to their preference.
    pub async fn create(
        &self,
        subject: &str,
        section_id: &str,
        input: CreateContentInput,
    ) -> AppResult<content::Model> {
        input.validate()?;

        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let user = policy::caller(uow.conn(), subject).await?;
            let section = SectionRepository::new(uow.conn())
                .get_by_id(section_id)
                .await?;
            policy::require_active(uow.conn(), &section.group_id, &user.id).await?;

            if !section.section_type.bears_content() {
                return Err(AppError::BadRequest(format!(
                    "A {:?} section carries no content",
                    section.section_type
                )));
            }

            let content = ContentRepository::new(uow.conn())
                .create(content::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    group_id: Set(section.group_id.clone()),
                    section_id: Set(section.id.clone()),
                    author_id: Set(user.id.clone()),
                    title: Set(input.title),
                    body: Set(input.body),
                    created_at: Set(Utc::now().into()),
                    updated_at: Set(None),
                })
                .await?;

            let events = audience(uow.conn(), &section, &content, &input.mentions).await?;
            Ok((content, events))
        }
        .await;
        let (content, events) = uow.finish(result).await?;

        info!(
            group_id = %content.group_id,
            content_id = %content.id,
            recipients = events.len(),
            "Content created"
        );
        dispatch(self.sink.as_ref(), events).await;

        Ok(content)
    }

    /// Read a content. Counts as a visit.
    pub async fn get(&self, subject: Option<&str>, content_id: &str) -> AppResult<content::Model> {
        let content = ContentRepository::new(&self.db).get_by_id(content_id).await?;
        let group = GroupRepository::new(&self.db)
            .get_by_id(&content.group_id)
            .await?;
        let viewer = visibility::authorize_read(&self.db, &group, subject).await?;
        let section = SectionRepository::new(&self.db)
            .get_by_id(&content.section_id)
            .await?;
        visibility::require_section(&section, &viewer)?;

        self.ranking
            .record_content_visit(&content.group_id, &content.id)
            .await;
        Ok(content)
    }

    /// Contents of a section, newest first.
    pub async fn list_by_section(
        &self,
        subject: Option<&str>,
        section_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<content::Model>> {
        let section = SectionRepository::new(&self.db).get_by_id(section_id).await?;
        let group = GroupRepository::new(&self.db)
            .get_by_id(&section.group_id)
            .await?;
        let viewer = visibility::authorize_read(&self.db, &group, subject).await?;
        visibility::require_section(&section, &viewer)?;

        ContentRepository::new(&self.db)
            .find_by_section(section_id, limit, offset)
            .await
    }

    /// Delete a content. The author or an admin of the group may.
    pub async fn delete(&self, subject: &str, content_id: &str) -> AppResult<()> {
        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let user = policy::caller(uow.conn(), subject).await?;
            let contents = ContentRepository::new(uow.conn());
            let content = contents.get_by_id(content_id).await?;

            if content.author_id != user.id {
                policy::require_admin(uow.conn(), &content.group_id, &user.id).await?;
            }

            BookmarkRepository::new(uow.conn())
                .delete_by_target(BookmarkKind::Content, content_id)
                .await?;
            RankingRepository::new(uow.conn())
                .delete_content(content_id)
                .await?;
            contents.delete(content_id).await?;
            Ok(content)
        }
        .await;
        let content = uow.finish(result).await?;

        info!(group_id = %content.group_id, content_id, "Content deleted");
        Ok(())
    }
}

/// Who hears about new content: the active members of its root section.
async fn audience<C: ConnectionTrait>(
    conn: &C,
    section: &section::Model,
    content: &content::Model,
    mentions: &[String],
) -> AppResult<Vec<NotificationEvent>> {
    let root_id = section.parent_id.as_deref().unwrap_or(&section.id);
    let settings = PreferenceRepository::new(conn)
        .find_by_section(root_id)
        .await?;
    let members = GroupUserRepository::new(conn)
        .find_active_by_group(&content.group_id)
        .await?;

    debug!(section_id = %root_id, members = members.len(), "Resolving content audience");
    Ok(recipients(members, &settings, content, mentions))
}

/// Events for the members a new content reaches.
///
/// A member without a stored row still has the default setting.
fn recipients(
    members: Vec<group_user::Model>,
    settings: &HashMap<String, NotificationSetting>,
    content: &content::Model,
    mentions: &[String],
) -> Vec<NotificationEvent> {
    let mentioned: HashSet<&str> = mentions.iter().map(String::as_str).collect();

    members
        .into_iter()
        .filter(|m| m.role.is_active() && m.user_id != content.author_id)
        .filter_map(|m| {
            let is_mentioned = mentioned.contains(m.id.as_str());
            let setting = settings.get(&m.id).copied().unwrap_or_default();
            if !setting.admits(is_mentioned) {
                return None;
            }
            let kind = if is_mentioned {
                NotificationKind::Mention
            } else {
                NotificationKind::NewContent
            };
            Some(NotificationEvent::new(
                m.user_id,
                content.group_id.clone(),
                kind,
                Some(content.id.clone()),
            ))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use huddle_db::entities::group_user::GroupRole;

    fn member(id: &str, user_id: &str, role: GroupRole) -> group_user::Model {
        group_user::Model {
            id: id.to_string(),
            group_id: "grp1".to_string(),
            user_id: user_id.to_string(),
            role,
            is_accepted: true,
            is_approved: true,
            name: user_id.to_string(),
            version: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn post() -> content::Model {
        content::Model {
            id: "c1".to_string(),
            group_id: "grp1".to_string(),
            section_id: "s1".to_string(),
            author_id: "author".to_string(),
            title: "Minutes".to_string(),
            body: "Notes from today".to_string(),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn test_recipients_follow_settings() {
        let members = vec![
            member("gu0", "author", GroupRole::TopManager),
            member("gu1", "all", GroupRole::User),
            member("gu2", "mentions", GroupRole::User),
            member("gu3", "muted", GroupRole::Manager),
            member("gu4", "default", GroupRole::User),
        ];
        let settings = HashMap::from([
            ("gu1".to_string(), NotificationSetting::All),
            ("gu2".to_string(), NotificationSetting::Mentions),
            ("gu3".to_string(), NotificationSetting::None),
        ]);

        let events = recipients(members, &settings, &post(), &[]);
        let users: Vec<&str> = events.iter().map(|e| e.user_id.as_str()).collect();

        assert_eq!(users, vec!["all", "default"]);
        assert!(events.iter().all(|e| e.kind == NotificationKind::NewContent));
        assert!(events.iter().all(|e| e.content_ref.as_deref() == Some("c1")));
    }

    #[test]
    fn test_mentions_reach_mentions_only_members() {
        let members = vec![
            member("gu2", "mentions", GroupRole::User),
            member("gu3", "muted", GroupRole::User),
        ];
        let settings = HashMap::from([
            ("gu2".to_string(), NotificationSetting::Mentions),
            ("gu3".to_string(), NotificationSetting::None),
        ]);

        let events = recipients(
            members,
            &settings,
            &post(),
            &["gu2".to_string(), "gu3".to_string()],
        );

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].user_id, "mentions");
        assert_eq!(events[0].kind, NotificationKind::Mention);
    }

    #[test]
    fn test_inactive_members_are_skipped() {
        let members = vec![
            member("gu1", "pending", GroupRole::Pending),
            member("gu2", "suspended", GroupRole::Suspended),
        ];

        let events = recipients(members, &HashMap::new(), &post(), &["gu1".to_string()]);
        assert!(events.is_empty());
    }
}
