//! Notification fan-out and inbox.
//!
//! Services describe who should hear about what as [`NotificationEvent`]s and
//! hand them to a [`NotificationSink`] after their transaction commits.
//! [`StoredNotificationSink`] persists them as `notification` rows, which
//! [`NotificationService`] lists and marks read.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use huddle_common::{AppError, AppResult, IdGenerator};
use huddle_db::entities::notification::{self, NotificationKind};
use huddle_db::repositories::NotificationRepository;
use sea_orm::{DatabaseConnection, Set};
use tracing::{error, info};

use super::policy;

/// A notification to create for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub user_id: String,
    pub group_id: String,
    pub kind: NotificationKind,
    /// Content or announcement the notification points at.
    pub content_ref: Option<String>,
}

impl NotificationEvent {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        group_id: impl Into<String>,
        kind: NotificationKind,
        content_ref: Option<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            group_id: group_id.into(),
            kind,
            content_ref,
        }
    }
}

/// Receiver of notification events.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver a batch of events.
    async fn deliver(&self, events: Vec<NotificationEvent>) -> AppResult<()>;
}

/// Shared handle to a sink.
pub type SharedSink = Arc<dyn NotificationSink>;

/// Hand events to the sink. Delivery runs after the triggering change committed,
/// so a failure is logged rather than reported to the caller.
pub async fn dispatch(sink: &dyn NotificationSink, events: Vec<NotificationEvent>) {
    if events.is_empty() {
        return;
    }

    let count = events.len();
    if let Err(e) = sink.deliver(events).await {
        error!(error = %e, count, "Notification delivery failed");
    }
}

/// Sink that stores events as notification rows.
#[derive(Clone)]
pub struct StoredNotificationSink {
    db: DatabaseConnection,
    id_gen: IdGenerator,
}

impl StoredNotificationSink {
    /// Create a new stored sink.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            id_gen: IdGenerator::new(),
        }
    }
}

#[async_trait]
impl NotificationSink for StoredNotificationSink {
    async fn deliver(&self, events: Vec<NotificationEvent>) -> AppResult<()> {
        let now = Utc::now();
        let models = events
            .into_iter()
            .map(|event| notification::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(event.user_id),
                group_id: Set(event.group_id),
                kind: Set(event.kind),
                content_ref: Set(event.content_ref),
                is_read: Set(false),
                created_at: Set(now.into()),
            })
            .collect();

        NotificationRepository::new(&self.db)
            .create_many(models)
            .await
    }
}

/// A no-op sink for wiring services without delivery.
#[derive(Clone, Default)]
pub struct NoOpNotificationSink;

#[async_trait]
impl NotificationSink for NoOpNotificationSink {
    async fn deliver(&self, _events: Vec<NotificationEvent>) -> AppResult<()> {
        Ok(())
    }
}

/// Notification inbox of a user.
#[derive(Clone)]
pub struct NotificationService {
    db: DatabaseConnection,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The caller's notifications, newest first.
    pub async fn list(
        &self,
        subject: &str,
        unread_only: bool,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<notification::Model>> {
        let user = policy::caller(&self.db, subject).await?;
        NotificationRepository::new(&self.db)
            .find_by_user(&user.id, unread_only, limit, offset)
            .await
    }

    /// Count the caller's unread notifications.
    pub async fn count_unread(&self, subject: &str) -> AppResult<u64> {
        let user = policy::caller(&self.db, subject).await?;
        NotificationRepository::new(&self.db)
            .count_unread(&user.id)
            .await
    }

    /// Mark one of the caller's notifications as read.
    pub async fn mark_as_read(&self, subject: &str, notification_id: &str) -> AppResult<()> {
        let user = policy::caller(&self.db, subject).await?;
        let found = NotificationRepository::new(&self.db)
            .mark_as_read(&user.id, notification_id)
            .await?;

        if !found {
            return Err(AppError::NotFound(format!(
                "Notification not found: {notification_id}"
            )));
        }

        Ok(())
    }

    /// Mark all of the caller's notifications as read.
    pub async fn mark_all_as_read(&self, subject: &str) -> AppResult<u64> {
        let user = policy::caller(&self.db, subject).await?;
        let count = NotificationRepository::new(&self.db)
            .mark_all_as_read(&user.id)
            .await?;

        info!(user_id = %user.id, count, "Notifications marked as read");
        Ok(count)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::content::{ContentService, CreateContentInput};
    use crate::services::test_support::World;
    use huddle_db::entities::group_user::GroupRole;
    use huddle_db::entities::section::SectionType;

    const OWNER: &str = "owner@example.com";
    const USER: &str = "user@example.com";

    struct FailingSink;

    #[async_trait]
    impl NotificationSink for FailingSink {
        async fn deliver(&self, _events: Vec<NotificationEvent>) -> AppResult<()> {
            Err(AppError::Internal("sink offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_stored_sink_feeds_inbox() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        let user = world.user(USER, "User").await;
        let group = world.group(OWNER, "Readers", false).await;
        let section = world
            .section(OWNER, &group.id, None, SectionType::Menu, false)
            .await;
        let member = world.member(&group.id, USER, GroupRole::User).await;

        let contents = ContentService::new(
            world.db.clone(),
            Arc::new(StoredNotificationSink::new(world.db.clone())),
            world.ranking.clone(),
        );
        let post = contents
            .create(
                OWNER,
                &section.id,
                CreateContentInput {
                    title: "Hello".to_string(),
                    body: "@User welcome".to_string(),
                    mentions: vec![member.id.clone()],
                },
            )
            .await
            .unwrap();

        let inbox = NotificationService::new(world.db.clone());
        let items = inbox.list(USER, false, 10, 0).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].user_id, user.id);
        assert_eq!(items[0].kind, NotificationKind::Mention);
        assert_eq!(items[0].content_ref.as_deref(), Some(post.id.as_str()));
        assert_eq!(inbox.count_unread(USER).await.unwrap(), 1);

        inbox.mark_as_read(USER, &items[0].id).await.unwrap();
        assert_eq!(inbox.count_unread(USER).await.unwrap(), 0);

        let err = inbox.mark_as_read(OWNER, &items[0].id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(inbox.list(OWNER, false, 10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_fail_the_change() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        world.user(USER, "User").await;
        let group = world.group(OWNER, "Readers", false).await;
        let section = world
            .section(OWNER, &group.id, None, SectionType::Menu, false)
            .await;
        world.member(&group.id, USER, GroupRole::User).await;

        let contents = ContentService::new(
            world.db.clone(),
            Arc::new(FailingSink),
            world.ranking.clone(),
        );
        let post = contents
            .create(
                OWNER,
                &section.id,
                CreateContentInput {
                    title: "Hello".to_string(),
                    body: String::new(),
                    mentions: Vec::new(),
                },
            )
            .await
            .unwrap();

        assert_eq!(contents.get(Some(USER), &post.id).await.unwrap().id, post.id);
    }
}
