//! Category service.

use chrono::Utc;
use huddle_common::{AppError, AppResult, IdGenerator};
use huddle_db::UnitOfWork;
use huddle_db::entities::category;
use huddle_db::repositories::{
    CategoryRepository, GroupRepository, PreferenceRepository, PreferenceScope,
};
use sea_orm::{DatabaseConnection, Set};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use super::{policy, preference, visibility};

/// Input for creating a category.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryInput {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

/// Input for updating a category.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryInput {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    pub is_public: Option<bool>,
}

/// Service for managing categories.
#[derive(Clone)]
pub struct CategoryService {
    db: DatabaseConnection,
    id_gen: IdGenerator,
}

impl CategoryService {
    /// Create a new category service.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a root category or a child of a root. Top manager only.
    pub async fn create(
        &self,
        subject: &str,
        group_id: &str,
        input: CreateCategoryInput,
    ) -> AppResult<category::Model> {
        input.validate()?;

        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let user = policy::caller(uow.conn(), subject).await?;
            GroupRepository::new(uow.conn()).get_by_id(group_id).await?;
            let member = policy::require_top_admin(uow.conn(), group_id, &user.id).await?;

            let categories = CategoryRepository::new(uow.conn());
            let is_public = match &input.parent_id {
                Some(parent_id) => {
                    let parent = categories.get_by_id(parent_id).await?;
                    if parent.group_id != group_id {
                        return Err(AppError::NotFound(format!(
                            "Category not found: {parent_id}"
                        )));
                    }
                    if !parent.is_root() {
                        return Err(AppError::BadRequest(
                            "Categories nest one level deep".to_string(),
                        ));
                    }
                    parent.is_public
                }
                None => input.is_public,
            };

            let category = categories
                .create(category::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    group_id: Set(group_id.to_string()),
                    parent_id: Set(input.parent_id),
                    name: Set(input.name),
                    is_public: Set(is_public),
                    created_at: Set(Utc::now().into()),
                    updated_at: Set(None),
                })
                .await?;

            if category.is_root() {
                preference::seed(
                    uow.conn(),
                    PreferenceScope::Category(&category.id),
                    &member.id,
                )
                .await?;
            }

            Ok(category)
        }
        .await;
        let category = uow.finish(result).await?;

        info!(group_id, category_id = %category.id, "Category created");
        Ok(category)
    }

    /// Rename a category or change a root's visibility. Top manager only.
    pub async fn update(
        &self,
        subject: &str,
        category_id: &str,
        input: UpdateCategoryInput,
    ) -> AppResult<category::Model> {
        input.validate()?;

        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let user = policy::caller(uow.conn(), subject).await?;
            let categories = CategoryRepository::new(uow.conn());
            let category = categories.get_by_id(category_id).await?;
            policy::require_top_admin(uow.conn(), &category.group_id, &user.id).await?;

            if input.is_public.is_some() && !category.is_root() {
                return Err(AppError::BadRequest(
                    "Visibility is set on root categories only".to_string(),
                ));
            }

            let mut active: category::ActiveModel = category.into();
            if let Some(name) = input.name {
                active.name = Set(name);
            }
            if let Some(is_public) = input.is_public {
                active.is_public = Set(is_public);
            }
            active.updated_at = Set(Some(Utc::now().into()));

            let category = categories.update(active).await?;
            if let Some(is_public) = input.is_public {
                categories
                    .set_children_public(&category.id, is_public)
                    .await?;
            }
            Ok(category)
        }
        .await;
        let category = uow.finish(result).await?;

        info!(category_id, is_public = category.is_public, "Category updated");
        Ok(category)
    }

    /// Delete a category with its children and preference rows. Top manager only.
    pub async fn delete(&self, subject: &str, category_id: &str) -> AppResult<()> {
        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let user = policy::caller(uow.conn(), subject).await?;
            let categories = CategoryRepository::new(uow.conn());
            let category = categories.get_by_id(category_id).await?;
            policy::require_top_admin(uow.conn(), &category.group_id, &user.id).await?;

            categories.delete_children(category_id).await?;
            PreferenceRepository::new(uow.conn())
                .delete_for_scope(PreferenceScope::Category(category_id))
                .await?;
            categories.delete(category_id).await?;
            Ok(category.group_id)
        }
        .await;
        let group_id = uow.finish(result).await?;

        info!(group_id = %group_id, category_id, "Category deleted");
        Ok(())
    }

    /// Root categories of a group visible to the caller.
    pub async fn list_roots(
        &self,
        subject: Option<&str>,
        group_id: &str,
    ) -> AppResult<Vec<category::Model>> {
        let group = GroupRepository::new(&self.db).get_by_id(group_id).await?;
        let viewer = visibility::authorize_read(&self.db, &group, subject).await?;
        let roots = CategoryRepository::new(&self.db).find_roots(group_id).await?;
        Ok(visibility::visible_categories(roots, &viewer))
    }

    /// Children of a category visible to the caller.
    pub async fn list_children(
        &self,
        subject: Option<&str>,
        category_id: &str,
    ) -> AppResult<Vec<category::Model>> {
        let categories = CategoryRepository::new(&self.db);
        let parent = categories.get_by_id(category_id).await?;
        let group = GroupRepository::new(&self.db)
            .get_by_id(&parent.group_id)
            .await?;
        let viewer = visibility::authorize_read(&self.db, &group, subject).await?;

        if !visibility::can_read_category(&parent, viewer.is_active_member()) {
            return Err(AppError::Unauthorized(
                "This category is private to members".to_string(),
            ));
        }

        let children = categories.find_children(category_id).await?;
        Ok(visibility::visible_categories(children, &viewer))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::test_support::World;
    use huddle_db::entities::group_user::GroupRole;

    const OWNER: &str = "owner@example.com";
    const USER: &str = "user@example.com";
    const OUTSIDER: &str = "outsider@example.com";

    async fn category(
        service: &CategoryService,
        group_id: &str,
        name: &str,
        parent_id: Option<&str>,
        is_public: bool,
    ) -> category::Model {
        service
            .create(
                OWNER,
                group_id,
                CreateCategoryInput {
                    name: name.to_string(),
                    parent_id: parent_id.map(str::to_string),
                    is_public,
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_children_copy_parent_visibility() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        let group = world.group(OWNER, "Readers", true).await;
        let service = CategoryService::new(world.db.clone());

        let root = category(&service, &group.id, "News", None, true).await;
        let child = category(&service, &group.id, "Local", Some(&root.id), false).await;
        assert!(child.is_public);

        let err = service
            .create(
                OWNER,
                &group.id,
                CreateCategoryInput {
                    name: "Deep".to_string(),
                    parent_id: Some(child.id.clone()),
                    is_public: true,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_root_visibility_cascades() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        let group = world.group(OWNER, "Readers", true).await;
        let service = CategoryService::new(world.db.clone());
        let root = category(&service, &group.id, "News", None, false).await;
        let child = category(&service, &group.id, "Local", Some(&root.id), false).await;

        let public = || UpdateCategoryInput {
            is_public: Some(true),
            ..Default::default()
        };

        let err = service.update(OWNER, &child.id, public()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let root = service.update(OWNER, &root.id, public()).await.unwrap();
        assert!(root.is_public);
        let child = CategoryRepository::new(&world.db)
            .get_by_id(&child.id)
            .await
            .unwrap();
        assert!(child.is_public);

        service
            .update(
                OWNER,
                &root.id,
                UpdateCategoryInput {
                    is_public: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let child = CategoryRepository::new(&world.db)
            .get_by_id(&child.id)
            .await
            .unwrap();
        assert!(!child.is_public);
    }

    #[tokio::test]
    async fn test_only_top_manager_updates() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        world.user(USER, "User").await;
        let group = world.group(OWNER, "Readers", false).await;
        world.member(&group.id, USER, GroupRole::Manager).await;
        let service = CategoryService::new(world.db.clone());
        let root = category(&service, &group.id, "News", None, false).await;

        let err = service
            .update(
                USER,
                &root.id,
                UpdateCategoryInput {
                    name: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let err = service.delete(USER, &root.id).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_outsiders_see_public_categories_only() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        world.user(USER, "User").await;
        world.user(OUTSIDER, "Outsider").await;
        let group = world.group(OWNER, "Public", true).await;
        world.member(&group.id, USER, GroupRole::User).await;
        let service = CategoryService::new(world.db.clone());

        let open = category(&service, &group.id, "Open", None, true).await;
        let closed = category(&service, &group.id, "Closed", None, false).await;
        category(&service, &group.id, "Open child", Some(&open.id), false).await;
        category(&service, &group.id, "Closed child", Some(&closed.id), false).await;

        let roots = service.list_roots(Some(OUTSIDER), &group.id).await.unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id, open.id);
        assert_eq!(service.list_roots(Some(USER), &group.id).await.unwrap().len(), 2);

        let children = service.list_children(None, &open.id).await.unwrap();
        assert_eq!(children.len(), 1);
        assert!(children[0].is_public);

        let err = service.list_children(None, &closed.id).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert_eq!(
            service.list_children(Some(USER), &closed.id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_delete_removes_children_and_preferences() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        let group = world.group(OWNER, "Readers", false).await;
        let service = CategoryService::new(world.db.clone());
        let root = category(&service, &group.id, "News", None, false).await;
        let child = category(&service, &group.id, "Local", Some(&root.id), false).await;

        let prefs = PreferenceRepository::new(&world.db);
        assert_eq!(
            prefs
                .count_for_scope(PreferenceScope::Category(&root.id))
                .await
                .unwrap(),
            1
        );

        service.delete(OWNER, &root.id).await.unwrap();

        let categories = CategoryRepository::new(&world.db);
        assert!(categories.find_by_id(&root.id).await.unwrap().is_none());
        assert!(categories.find_by_id(&child.id).await.unwrap().is_none());
        assert_eq!(
            prefs
                .count_for_scope(PreferenceScope::Category(&root.id))
                .await
                .unwrap(),
            0
        );
    }
}
