//! Notification preference cascade.
//!
//! A member holds one preference row per root category and root section of
//! their group. Rows are seeded for the creator when a root is created, filled
//! in lazily on first read, and rewritten in bulk when membership changes.
//! Nested nodes never carry a row.

use huddle_common::{AppError, AppResult};
use huddle_db::UnitOfWork;
use huddle_db::entities::category_notification::NotificationSetting;
use huddle_db::repositories::{
    CategoryRepository, PreferenceRepository, PreferenceScope, SectionRepository,
};
use sea_orm::{ConnectionTrait, DatabaseConnection};
use tracing::{debug, info};

use super::policy;

/// Seed the creator's row on a freshly created root node.
pub async fn seed<C: ConnectionTrait>(
    conn: &C,
    scope: PreferenceScope<'_>,
    group_user_id: &str,
) -> AppResult<()> {
    PreferenceRepository::new(conn)
        .upsert(scope, group_user_id, NotificationSetting::default())
        .await
}

/// Write `setting` on every root category and section of a group for one member.
///
/// Existing rows are updated and missing ones created, so the final row set
/// does not depend on the starting state.
pub async fn bulk_update<C: ConnectionTrait>(
    conn: &C,
    group_id: &str,
    group_user_id: &str,
    setting: NotificationSetting,
) -> AppResult<()> {
    let prefs = PreferenceRepository::new(conn);

    let categories = CategoryRepository::new(conn).find_roots(group_id).await?;
    for category in &categories {
        prefs
            .upsert(PreferenceScope::Category(&category.id), group_user_id, setting)
            .await?;
    }

    let sections = SectionRepository::new(conn).find_roots(group_id).await?;
    for section in &sections {
        prefs
            .upsert(PreferenceScope::Section(&section.id), group_user_id, setting)
            .await?;
    }

    debug!(
        group_id,
        group_user_id,
        ?setting,
        roots = categories.len() + sections.len(),
        "Bulk preference update"
    );
    Ok(())
}

/// Service for reading and changing a member's notification preferences.
#[derive(Clone)]
pub struct PreferenceService {
    db: DatabaseConnection,
}

impl PreferenceService {
    /// Create a new preference service.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The caller's setting for a root node. A missing row is created as `ALL`.
    pub async fn get_setting(
        &self,
        subject: &str,
        scope: PreferenceScope<'_>,
    ) -> AppResult<NotificationSetting> {
        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let group_user_id = resolve_member(uow.conn(), subject, scope).await?;
            let prefs = PreferenceRepository::new(uow.conn());

            if let Some(setting) = prefs.find(scope, &group_user_id).await? {
                return Ok(setting);
            }

            let setting = NotificationSetting::default();
            prefs.upsert(scope, &group_user_id, setting).await?;
            Ok(setting)
        }
        .await;
        uow.finish(result).await
    }

    /// Change the caller's setting for a root node, creating the row if needed.
    pub async fn set_setting(
        &self,
        subject: &str,
        scope: PreferenceScope<'_>,
        setting: NotificationSetting,
    ) -> AppResult<()> {
        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let group_user_id = resolve_member(uow.conn(), subject, scope).await?;
            PreferenceRepository::new(uow.conn())
                .upsert(scope, &group_user_id, setting)
                .await?;
            info!(%group_user_id, ?scope, ?setting, "Notification preference set");
            Ok(())
        }
        .await;
        uow.finish(result).await
    }

    /// Change the caller's setting on every root node of a group at once.
    pub async fn set_group_setting(
        &self,
        subject: &str,
        group_id: &str,
        setting: NotificationSetting,
    ) -> AppResult<()> {
        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let user = policy::caller(uow.conn(), subject).await?;
            let member = policy::require_active(uow.conn(), group_id, &user.id).await?;
            bulk_update(uow.conn(), group_id, &member.id, setting).await
        }
        .await;
        uow.finish(result).await
    }
}

/// Check the node is a root the caller actively belongs to; return their membership ID.
async fn resolve_member<C: ConnectionTrait>(
    conn: &C,
    subject: &str,
    scope: PreferenceScope<'_>,
) -> AppResult<String> {
    let (group_id, is_root) = match scope {
        PreferenceScope::Category(id) => {
            let category = CategoryRepository::new(conn).get_by_id(id).await?;
            let is_root = category.is_root();
            (category.group_id, is_root)
        }
        PreferenceScope::Section(id) => {
            let section = SectionRepository::new(conn).get_by_id(id).await?;
            let is_root = section.is_root();
            (section.group_id, is_root)
        }
    };

    if !is_root {
        return Err(AppError::ImpossibleNotification(
            "Notification preferences exist on root nodes only".to_string(),
        ));
    }

    let user = policy::caller(conn, subject).await?;
    let member = policy::require_active(conn, &group_id, &user.id).await?;
    Ok(member.id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::category::{CategoryService, CreateCategoryInput};
    use crate::services::test_support::World;
    use huddle_db::entities::group_user::GroupRole;
    use huddle_db::entities::section::SectionType;

    const OWNER: &str = "owner@example.com";
    const USER: &str = "user@example.com";

    async fn create_category(world: &World, group_id: &str, parent_id: Option<String>) -> String {
        CategoryService::new(world.db.clone())
            .create(
                OWNER,
                group_id,
                CreateCategoryInput {
                    name: "Notices".to_string(),
                    parent_id,
                    is_public: true,
                },
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_root_category_seeds_creator_preference() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        let group = world.group(OWNER, "Public", true).await;
        let owner = world.membership_of(&group.id, OWNER).await.unwrap();

        let category_id = create_category(&world, &group.id, None).await;

        let prefs = PreferenceRepository::new(&world.db);
        let scope = PreferenceScope::Category(&category_id);
        assert_eq!(prefs.count_for_scope(scope).await.unwrap(), 1);
        assert_eq!(
            prefs.find(scope, &owner.id).await.unwrap(),
            Some(NotificationSetting::All)
        );
    }

    #[tokio::test]
    async fn test_child_category_has_no_preference() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        let group = world.group(OWNER, "Public", true).await;
        let root_id = create_category(&world, &group.id, None).await;
        let child_id = create_category(&world, &group.id, Some(root_id)).await;

        let scope = PreferenceScope::Category(&child_id);
        assert_eq!(
            PreferenceRepository::new(&world.db)
                .count_for_scope(scope)
                .await
                .unwrap(),
            0
        );

        let err = PreferenceService::new(world.db.clone())
            .set_setting(OWNER, scope, NotificationSetting::None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ImpossibleNotification(_)));
    }

    async fn snapshot(
        prefs: &PreferenceRepository<'_, DatabaseConnection>,
        first: &str,
        second: &str,
        member_id: &str,
    ) -> (Option<NotificationSetting>, Option<NotificationSetting>, usize, usize) {
        let first = PreferenceScope::Section(first);
        let second = PreferenceScope::Section(second);
        (
            prefs.find(first, member_id).await.unwrap(),
            prefs.find(second, member_id).await.unwrap(),
            prefs.count_for_scope(first).await.unwrap(),
            prefs.count_for_scope(second).await.unwrap(),
        )
    }

    #[tokio::test]
    async fn test_bulk_update_is_idempotent() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        world.user(USER, "User").await;
        let group = world.group(OWNER, "Private", false).await;
        let first = world
            .section(OWNER, &group.id, None, SectionType::Menu, false)
            .await;
        let second = world
            .section(OWNER, &group.id, None, SectionType::Repository, false)
            .await;
        world
            .section(OWNER, &group.id, Some(&first.id), SectionType::Menu, false)
            .await;
        create_category(&world, &group.id, None).await;
        let member = world.member(&group.id, USER, GroupRole::User).await;

        let prefs = PreferenceRepository::new(&world.db);
        prefs
            .upsert(
                PreferenceScope::Section(&first.id),
                &member.id,
                NotificationSetting::Mentions,
            )
            .await
            .unwrap();

        bulk_update(&world.db, &group.id, &member.id, NotificationSetting::None)
            .await
            .unwrap();
        let once = snapshot(&prefs, &first.id, &second.id, &member.id).await;
        bulk_update(&world.db, &group.id, &member.id, NotificationSetting::None)
            .await
            .unwrap();
        let twice = snapshot(&prefs, &first.id, &second.id, &member.id).await;

        assert_eq!(once, twice);
        assert_eq!(
            once,
            (
                Some(NotificationSetting::None),
                Some(NotificationSetting::None),
                2,
                2
            )
        );
    }

    #[tokio::test]
    async fn test_get_setting_backfills_default() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        world.user(USER, "User").await;
        let group = world.group(OWNER, "Private", false).await;
        let root = world
            .section(OWNER, &group.id, None, SectionType::Menu, false)
            .await;
        let member = world.member(&group.id, USER, GroupRole::User).await;
        let scope = PreferenceScope::Section(&root.id);
        let service = PreferenceService::new(world.db.clone());

        assert_eq!(
            service.get_setting(USER, scope).await.unwrap(),
            NotificationSetting::All
        );
        assert_eq!(
            PreferenceRepository::new(&world.db)
                .find(scope, &member.id)
                .await
                .unwrap(),
            Some(NotificationSetting::All)
        );

        service
            .set_setting(USER, scope, NotificationSetting::Mentions)
            .await
            .unwrap();
        assert_eq!(
            service.get_setting(USER, scope).await.unwrap(),
            NotificationSetting::Mentions
        );
    }

    #[tokio::test]
    async fn test_pending_member_has_no_preferences() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        world.user(USER, "User").await;
        let group = world.group(OWNER, "Public", true).await;
        let root = world
            .section(OWNER, &group.id, None, SectionType::Menu, true)
            .await;
        world.member(&group.id, USER, GroupRole::Pending).await;

        let err = PreferenceService::new(world.db.clone())
            .get_setting(USER, PreferenceScope::Section(&root.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
