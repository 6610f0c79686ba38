//! Fixtures shared by the service tests.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use huddle_common::config::RankingConfig;
use huddle_common::{AppResult, IdGenerator, MemoryCache};
use huddle_db::entities::group_user::{self, GroupRole};
use huddle_db::entities::section::SectionType;
use huddle_db::entities::{group, section, user};
use huddle_db::repositories::{GroupUserRepository, UserRepository};
use huddle_db::test_utils::memory_db;
use sea_orm::{DatabaseConnection, Set};
use tokio::sync::Mutex;

use super::group::{CreateGroupInput, GroupService};
use super::membership::MembershipService;
use super::notification::{NotificationEvent, NotificationSink};
use super::ranking::RankingService;
use super::section::{CreateSectionInput, SectionService};

/// Sink that keeps every delivered event.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingSink {
    /// Take the events delivered so far.
    pub async fn take(&self) -> Vec<NotificationEvent> {
        std::mem::take(&mut *self.events.lock().await)
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, events: Vec<NotificationEvent>) -> AppResult<()> {
        self.events.lock().await.extend(events);
        Ok(())
    }
}

/// A migrated in-memory database with the services wired over it.
pub struct World {
    pub db: DatabaseConnection,
    pub cache: MemoryCache,
    pub sink: Arc<RecordingSink>,
    pub ranking: RankingService,
    pub groups: GroupService,
    pub membership: MembershipService,
    pub sections: SectionService,
}

impl World {
    pub async fn new() -> Self {
        let db = memory_db().await.unwrap();
        let cache = MemoryCache::new();
        let sink = Arc::new(RecordingSink::default());
        let ranking = RankingService::new(
            db.clone(),
            Arc::new(cache.clone()),
            RankingConfig::default(),
        );

        Self {
            groups: GroupService::new(db.clone(), ranking.clone()),
            membership: MembershipService::new(db.clone(), sink.clone(), ranking.clone()),
            sections: SectionService::new(db.clone()),
            db,
            cache,
            sink,
            ranking,
        }
    }

    /// Insert a user whose subject is `email`.
    pub async fn user(&self, email: &str, name: &str) -> user::Model {
        UserRepository::new(&self.db)
            .create(user::ActiveModel {
                id: Set(IdGenerator::new().generate()),
                email: Set(email.to_string()),
                name: Set(name.to_string()),
                avatar_url: Set(None),
                password_hash: Set("$argon2id$unused".to_string()),
                is_verified: Set(true),
                is_onboarded: Set(true),
                created_at: Set(Utc::now().into()),
                updated_at: Set(None),
            })
            .await
            .unwrap()
    }

    /// Create a group owned by `owner`.
    pub async fn group(&self, owner: &str, name: &str, is_public: bool) -> group::Model {
        self.groups
            .create(
                owner,
                CreateGroupInput {
                    name: name.to_string(),
                    description: None,
                    image_url: None,
                    is_public,
                },
            )
            .await
            .unwrap()
    }

    /// Put `email` in the group with `role` directly, skipping the lifecycle.
    pub async fn member(&self, group_id: &str, email: &str, role: GroupRole) -> group_user::Model {
        let user = UserRepository::new(&self.db)
            .get_by_email(email)
            .await
            .unwrap();
        GroupUserRepository::new(&self.db)
            .create(group_user::ActiveModel {
                id: Set(IdGenerator::new().generate()),
                group_id: Set(group_id.to_string()),
                user_id: Set(user.id),
                role: Set(role),
                is_accepted: Set(role.is_active()),
                is_approved: Set(role.is_active()),
                name: Set(user.name),
                version: Set(0),
                created_at: Set(Utc::now().into()),
                updated_at: Set(None),
            })
            .await
            .unwrap()
    }

    /// Membership row of `email` in a group.
    pub async fn membership_of(&self, group_id: &str, email: &str) -> Option<group_user::Model> {
        let user = UserRepository::new(&self.db)
            .get_by_email(email)
            .await
            .unwrap();
        GroupUserRepository::new(&self.db)
            .find_by_group_and_user(group_id, &user.id)
            .await
            .unwrap()
    }

    /// Create a section as the group's top manager.
    pub async fn section(
        &self,
        owner: &str,
        group_id: &str,
        parent_id: Option<&str>,
        section_type: SectionType,
        is_public: bool,
    ) -> section::Model {
        self.sections
            .create(
                owner,
                group_id,
                CreateSectionInput {
                    name: format!("{section_type:?}"),
                    section_type,
                    parent_id: parent_id.map(str::to_string),
                    is_public,
                },
            )
            .await
            .unwrap()
    }
}
