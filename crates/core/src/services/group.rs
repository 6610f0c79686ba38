//! Group service.

use chrono::Utc;
use huddle_common::{AppError, AppResult, IdGenerator};
use huddle_db::UnitOfWork;
use huddle_db::entities::group_user::{self, GroupRole};
use huddle_db::entities::group;
use huddle_db::repositories::{
    AnnouncementRepository, BookmarkRepository, CategoryRepository, ContentRepository,
    FolderRepository, GroupRepository, GroupUserRepository, NotificationRepository,
    PreferenceRepository, RankingRepository, SectionRepository,
};
use sea_orm::{ConnectionTrait, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

use super::ranking::RankingService;
use super::{policy, visibility};

/// Input for creating a group.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupInput {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(max = 2048))]
    pub description: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

/// Input for updating a group.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupInput {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub is_public: Option<bool>,
}

/// Group as seen by one caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResponse {
    pub id: String,
    pub creator_id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub is_public: bool,
    pub members_count: u64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub my_role: Option<GroupRole>,
}

impl GroupResponse {
    #[must_use]
    pub fn from_model(model: group::Model, members_count: u64, my_role: Option<GroupRole>) -> Self {
        Self {
            id: model.id,
            creator_id: model.creator_id,
            name: model.name,
            image_url: model.image_url,
            description: model.description,
            is_public: model.is_public,
            members_count,
            created_at: model.created_at.into(),
            my_role,
        }
    }
}

/// Service for managing groups.
#[derive(Clone)]
pub struct GroupService {
    db: DatabaseConnection,
    ranking: RankingService,
    id_gen: IdGenerator,
}

impl GroupService {
    /// Create a new group service.
    #[must_use]
    pub const fn new(db: DatabaseConnection, ranking: RankingService) -> Self {
        Self {
            db,
            ranking,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a group. The creator becomes its top manager.
    pub async fn create(&self, subject: &str, input: CreateGroupInput) -> AppResult<group::Model> {
        input.validate()?;

        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let user = policy::caller(uow.conn(), subject).await?;
            let now = Utc::now();

            let group = GroupRepository::new(uow.conn())
                .create(group::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    creator_id: Set(user.id.clone()),
                    name: Set(input.name),
                    image_url: Set(input.image_url),
                    description: Set(input.description),
                    is_public: Set(input.is_public),
                    created_at: Set(now.into()),
                    updated_at: Set(None),
                })
                .await?;

            GroupUserRepository::new(uow.conn())
                .create(group_user::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    group_id: Set(group.id.clone()),
                    user_id: Set(user.id),
                    role: Set(GroupRole::TopManager),
                    is_accepted: Set(true),
                    is_approved: Set(true),
                    name: Set(user.name),
                    version: Set(0),
                    created_at: Set(now.into()),
                    updated_at: Set(None),
                })
                .await?;

            Ok(group)
        }
        .await;
        let group = uow.finish(result).await?;

        info!(group_id = %group.id, creator_id = %group.creator_id, "Group created");
        Ok(group)
    }

    /// Read a group. Counts as a visit.
    pub async fn get(&self, subject: Option<&str>, group_id: &str) -> AppResult<GroupResponse> {
        let group = GroupRepository::new(&self.db).get_by_id(group_id).await?;
        let viewer = visibility::authorize_read(&self.db, &group, subject).await?;
        let members_count = GroupUserRepository::new(&self.db)
            .count_active(group_id)
            .await?;

        self.ranking.record_group_visit(group_id).await;

        let my_role = viewer.membership.map(|m| m.role);
        Ok(GroupResponse::from_model(group, members_count, my_role))
    }

    /// List public groups, newest first.
    pub async fn list_public(&self, limit: u64, offset: u64) -> AppResult<Vec<group::Model>> {
        GroupRepository::new(&self.db)
            .find_public(limit, offset)
            .await
    }

    /// Groups the caller actively belongs to.
    pub async fn list_joined(&self, subject: &str) -> AppResult<Vec<group::Model>> {
        let user = policy::caller(&self.db, subject).await?;
        let ids: Vec<String> = GroupUserRepository::new(&self.db)
            .find_by_user(&user.id)
            .await?
            .into_iter()
            .filter(|m| m.role.is_active())
            .map(|m| m.group_id)
            .collect();

        GroupRepository::new(&self.db).find_by_ids(&ids).await
    }

    /// Update a group. Top manager only.
    pub async fn update(
        &self,
        subject: &str,
        group_id: &str,
        input: UpdateGroupInput,
    ) -> AppResult<group::Model> {
        input.validate()?;

        let user = policy::caller(&self.db, subject).await?;
        let groups = GroupRepository::new(&self.db);
        let group = groups.get_by_id(group_id).await?;
        policy::require_top_admin(&self.db, group_id, &user.id).await?;

        let mut active: group::ActiveModel = group.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(image_url) = input.image_url {
            active.image_url = Set(image_url);
        }
        if let Some(is_public) = input.is_public {
            active.is_public = Set(is_public);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        let group = groups.update(active).await?;
        info!(group_id, "Group updated");
        Ok(group)
    }

    /// Delete a group and everything in it. Creator only.
    pub async fn delete(&self, subject: &str, group_id: &str) -> AppResult<()> {
        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let user = policy::caller(uow.conn(), subject).await?;
            let group = GroupRepository::new(uow.conn()).get_by_id(group_id).await?;

            if group.creator_id != user.id {
                debug!(group_id, user_id = %user.id, "Group delete denied");
                return Err(AppError::Unauthorized(
                    "Only the creator can delete the group".to_string(),
                ));
            }

            delete_cascade(uow.conn(), group_id).await
        }
        .await;
        uow.finish(result).await?;

        self.ranking.invalidate().await;
        info!(group_id, "Group deleted");
        Ok(())
    }

    /// Hand the group to another active member.
    ///
    /// The new owner becomes top manager and creator; the previous owner stays
    /// on as a manager. This is the only way the top manager role moves.
    pub async fn transfer_ownership(
        &self,
        subject: &str,
        group_id: &str,
        membership_id: &str,
    ) -> AppResult<group::Model> {
        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let user = policy::caller(uow.conn(), subject).await?;
            let groups = GroupRepository::new(uow.conn());
            let group = groups.get_by_id(group_id).await?;

            if group.creator_id != user.id {
                return Err(AppError::Unauthorized(
                    "Only the owner can transfer ownership".to_string(),
                ));
            }

            let members = GroupUserRepository::new(uow.conn());
            let owner = members.get_by_group_and_user(group_id, &user.id).await?;
            let heir = members.get_by_id(membership_id).await?;

            if heir.group_id != group_id {
                return Err(AppError::NotFound(format!(
                    "Membership not found: {membership_id}"
                )));
            }
            if heir.id == owner.id {
                return Err(AppError::BadRequest(
                    "Ownership is already held by this member".to_string(),
                ));
            }
            if !heir.role.is_active() {
                return Err(AppError::BadRequest(
                    "Ownership can only go to an active member".to_string(),
                ));
            }

            members
                .update_state(&owner, GroupRole::Manager, true, true)
                .await?;
            members
                .update_state(&heir, GroupRole::TopManager, true, true)
                .await?;

            let heir_user_id = heir.user_id.clone();
            let mut active: group::ActiveModel = group.into();
            active.creator_id = Set(heir_user_id);
            active.updated_at = Set(Some(Utc::now().into()));
            groups.update(active).await
        }
        .await;
        let group = uow.finish(result).await?;

        info!(group_id, new_owner = %group.creator_id, "Ownership transferred");
        Ok(group)
    }
}

/// Delete a group's rows in dependency order.
async fn delete_cascade<C: ConnectionTrait>(conn: &C, group_id: &str) -> AppResult<()> {
    let member_ids: Vec<String> = GroupUserRepository::new(conn)
        .find_by_group(group_id)
        .await?
        .into_iter()
        .map(|m| m.id)
        .collect();

    PreferenceRepository::new(conn)
        .delete_for_members(&member_ids)
        .await?;
    BookmarkRepository::new(conn).delete_by_group(group_id).await?;
    FolderRepository::new(conn).delete_by_group(group_id).await?;
    ContentRepository::new(conn).delete_by_group(group_id).await?;
    AnnouncementRepository::new(conn)
        .delete_by_group(group_id)
        .await?;
    SectionRepository::new(conn).delete_by_group(group_id).await?;
    CategoryRepository::new(conn).delete_by_group(group_id).await?;
    NotificationRepository::new(conn)
        .delete_by_group(group_id)
        .await?;
    RankingRepository::new(conn).delete_by_group(group_id).await?;
    GroupUserRepository::new(conn)
        .delete_by_group(group_id)
        .await?;
    GroupRepository::new(conn).delete(group_id).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::content::{ContentService, CreateContentInput};
    use crate::services::test_support::World;
    use huddle_db::entities::section::SectionType;
    use huddle_db::repositories::PreferenceScope;

    const OWNER: &str = "owner@example.com";
    const USER: &str = "user@example.com";
    const OUTSIDER: &str = "outsider@example.com";

    #[tokio::test]
    async fn test_creator_becomes_top_manager() {
        let world = World::new().await;
        let owner = world.user(OWNER, "Owner").await;
        let group = world.group(OWNER, "Readers", false).await;
        assert_eq!(group.creator_id, owner.id);

        let membership = world.membership_of(&group.id, OWNER).await.unwrap();
        assert_eq!(membership.role, GroupRole::TopManager);
        assert!(membership.is_accepted);
        assert!(membership.is_approved);
        assert_eq!(membership.name, "Owner");

        let response = world.groups.get(Some(OWNER), &group.id).await.unwrap();
        assert_eq!(response.members_count, 1);
        assert_eq!(response.my_role, Some(GroupRole::TopManager));
    }

    #[tokio::test]
    async fn test_group_name_is_unique() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        world.group(OWNER, "Readers", false).await;

        let err = world
            .groups
            .create(
                OWNER,
                CreateGroupInput {
                    name: "Readers".to_string(),
                    description: None,
                    image_url: None,
                    is_public: true,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_visibility_asymmetry() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        world.user(USER, "User").await;
        world.user(OUTSIDER, "Outsider").await;
        let public = world.group(OWNER, "Public", true).await;
        let private = world.group(OWNER, "Private", false).await;
        world.member(&public.id, USER, GroupRole::Pending).await;
        world.member(&private.id, USER, GroupRole::Pending).await;

        for caller in [None, Some(OUTSIDER), Some(USER)] {
            let response = world.groups.get(caller, &public.id).await.unwrap();
            assert!(response.is_public);

            let err = world.groups.get(caller, &private.id).await.unwrap_err();
            assert!(
                matches!(err, AppError::Unauthorized(_)),
                "{caller:?} read a private group"
            );
        }

        let err = world.groups.get(None, "missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_requires_top_manager() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        world.user(USER, "User").await;
        let group = world.group(OWNER, "Readers", false).await;
        world.member(&group.id, USER, GroupRole::Manager).await;

        let input = || UpdateGroupInput {
            is_public: Some(true),
            ..Default::default()
        };

        let err = world.groups.update(USER, &group.id, input()).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let updated = world.groups.update(OWNER, &group.id, input()).await.unwrap();
        assert!(updated.is_public);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        world.user(USER, "User").await;
        let group = world.group(OWNER, "Readers", true).await;
        let root = world
            .section(OWNER, &group.id, None, SectionType::Menu, true)
            .await;
        world
            .section(OWNER, &group.id, Some(&root.id), SectionType::Menu, true)
            .await;
        world.member(&group.id, USER, GroupRole::Manager).await;
        ContentService::new(world.db.clone(), world.sink.clone(), world.ranking.clone())
            .create(
                OWNER,
                &root.id,
                CreateContentInput {
                    title: "Welcome".to_string(),
                    body: "Hello".to_string(),
                    mentions: Vec::new(),
                },
            )
            .await
            .unwrap();

        let err = world.groups.delete(USER, &group.id).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        world.groups.delete(OWNER, &group.id).await.unwrap();

        let err = world.groups.get(None, &group.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(
            GroupUserRepository::new(&world.db)
                .find_by_group(&group.id)
                .await
                .unwrap()
                .is_empty()
        );
        assert!(
            SectionRepository::new(&world.db)
                .find_ids_by_group(&group.id)
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(
            PreferenceRepository::new(&world.db)
                .count_for_scope(PreferenceScope::Section(&root.id))
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_transfer_ownership() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        let heir_user = world.user(USER, "User").await;
        let group = world.group(OWNER, "Readers", false).await;
        let heir = world.member(&group.id, USER, GroupRole::User).await;

        let err = world
            .groups
            .transfer_ownership(USER, &group.id, &heir.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let group = world
            .groups
            .transfer_ownership(OWNER, &group.id, &heir.id)
            .await
            .unwrap();
        assert_eq!(group.creator_id, heir_user.id);

        let old = world.membership_of(&group.id, OWNER).await.unwrap();
        let new = world.membership_of(&group.id, USER).await.unwrap();
        assert_eq!(old.role, GroupRole::Manager);
        assert_eq!(new.role, GroupRole::TopManager);

        let err = world.membership.leave(USER, &group.id).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        world.membership.leave(OWNER, &group.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_joined_skips_inactive() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        world.user(USER, "User").await;
        let first = world.group(OWNER, "First", true).await;
        let second = world.group(OWNER, "Second", true).await;
        world.member(&first.id, USER, GroupRole::User).await;
        world.member(&second.id, USER, GroupRole::Pending).await;

        let joined = world.groups.list_joined(USER).await.unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].id, first.id);

        assert_eq!(world.groups.list_public(10, 0).await.unwrap().len(), 2);
    }
}
