//! Group announcement service.

use std::sync::Arc;

use chrono::Utc;
use huddle_common::{AppResult, IdGenerator};
use huddle_db::UnitOfWork;
use huddle_db::entities::announcement;
use huddle_db::entities::notification::NotificationKind;
use huddle_db::repositories::{AnnouncementRepository, GroupRepository, GroupUserRepository};
use sea_orm::{DatabaseConnection, Set};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::notification::{NotificationEvent, NotificationSink, dispatch};
use super::{policy, visibility};

/// Input for posting an announcement.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnnouncementInput {
    #[validate(length(min = 1, max = 256))]
    pub title: String,
    #[validate(length(max = 16384))]
    pub body: String,
}

/// Service for managing announcements.
#[derive(Clone)]
pub struct AnnouncementService {
    db: DatabaseConnection,
    sink: Arc<dyn NotificationSink>,
    id_gen: IdGenerator,
}

impl AnnouncementService {
    /// Create a new announcement service.
    #[must_use]
    pub const fn new(db: DatabaseConnection, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            db,
            sink,
            id_gen: IdGenerator::new(),
        }
    }

    /// Post an announcement to every active member. Admins only.
    pub async fn create(
        &self,
        subject: &str,
        group_id: &str,
        input: CreateAnnouncementInput,
    ) -> AppResult<announcement::Model> {
        input.validate()?;

        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let user = policy::caller(uow.conn(), subject).await?;
            GroupRepository::new(uow.conn()).get_by_id(group_id).await?;
            policy::require_admin(uow.conn(), group_id, &user.id).await?;

            let announcement = AnnouncementRepository::new(uow.conn())
                .create(announcement::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    group_id: Set(group_id.to_string()),
                    author_id: Set(user.id),
                    title: Set(input.title),
                    body: Set(input.body),
                    created_at: Set(Utc::now().into()),
                })
                .await?;

            let members = GroupUserRepository::new(uow.conn())
                .find_active_by_group(group_id)
                .await?;
            Ok((announcement, members))
        }
        .await;
        let (announcement, members) = uow.finish(result).await?;

        let events: Vec<_> = members
            .into_iter()
            .filter(|m| m.user_id != announcement.author_id)
            .map(|m| {
                NotificationEvent::new(
                    m.user_id,
                    group_id,
                    NotificationKind::Announcement,
                    Some(announcement.id.clone()),
                )
            })
            .collect();

        info!(group_id, announcement_id = %announcement.id, recipients = events.len(), "Announcement posted");
        dispatch(self.sink.as_ref(), events).await;

        Ok(announcement)
    }

    /// Announcements of a group, newest first.
    pub async fn list(
        &self,
        subject: Option<&str>,
        group_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<announcement::Model>> {
        let group = GroupRepository::new(&self.db).get_by_id(group_id).await?;
        visibility::authorize_read(&self.db, &group, subject).await?;
        AnnouncementRepository::new(&self.db)
            .find_by_group(group_id, limit, offset)
            .await
    }
}
