//! Core business logic for huddle.
//!
//! Every operation takes the caller's subject (their verified email) and runs
//! its row changes inside one [`huddle_db::UnitOfWork`]. Guard failures surface
//! as [`huddle_common::AppError::Unauthorized`], missing rows as `NotFound`.

pub mod services;

use std::sync::Arc;

use huddle_common::SharedCache;
use huddle_common::config::RankingConfig;
use sea_orm::DatabaseConnection;

pub use services::*;

/// Every service wired over one database and cache.
#[allow(missing_docs)]
#[derive(Clone)]
pub struct AppServices {
    pub accounts: AccountService,
    pub announcements: AnnouncementService,
    pub bookmarks: BookmarkService,
    pub categories: CategoryService,
    pub contents: ContentService,
    pub folders: FolderService,
    pub groups: GroupService,
    pub membership: MembershipService,
    pub notifications: NotificationService,
    pub preferences: PreferenceService,
    pub ranking: RankingService,
    pub sections: SectionService,
}

impl AppServices {
    /// Wire the services. Notifications are stored as rows.
    #[must_use]
    pub fn new(db: DatabaseConnection, cache: SharedCache, ranking: RankingConfig) -> Self {
        let sink: SharedSink = Arc::new(StoredNotificationSink::new(db.clone()));
        Self::with_sink(db, cache, ranking, sink)
    }

    /// Wire the services over a custom notification sink.
    #[must_use]
    pub fn with_sink(
        db: DatabaseConnection,
        cache: SharedCache,
        ranking: RankingConfig,
        sink: SharedSink,
    ) -> Self {
        let ranking = RankingService::new(db.clone(), cache, ranking);

        Self {
            accounts: AccountService::new(db.clone()),
            announcements: AnnouncementService::new(db.clone(), sink.clone()),
            bookmarks: BookmarkService::new(db.clone()),
            categories: CategoryService::new(db.clone()),
            contents: ContentService::new(db.clone(), sink.clone(), ranking.clone()),
            folders: FolderService::new(db.clone()),
            groups: GroupService::new(db.clone(), ranking.clone()),
            membership: MembershipService::new(db.clone(), sink, ranking.clone()),
            notifications: NotificationService::new(db.clone()),
            preferences: PreferenceService::new(db.clone()),
            sections: SectionService::new(db),
            ranking,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use huddle_common::MemoryCache;
    use huddle_db::test_utils::memory_db;

    #[tokio::test]
    async fn test_services_share_one_database() {
        let db = memory_db().await.unwrap();
        let services = AppServices::new(db, Arc::new(MemoryCache::new()), RankingConfig::default());

        let user = services
            .accounts
            .signup(SignupInput {
                email: "ada@example.com".to_string(),
                name: "Ada".to_string(),
                password: "correct horse battery".to_string(),
            })
            .await
            .unwrap();
        let group = services
            .groups
            .create(
                &user.email,
                CreateGroupInput {
                    name: "Engines".to_string(),
                    description: Some("Analytical".to_string()),
                    image_url: None,
                    is_public: true,
                },
            )
            .await
            .unwrap();

        let members = services
            .membership
            .list_members(None, &group.id)
            .await
            .unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_id, user.id);
    }
}
