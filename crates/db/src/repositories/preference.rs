//! Notification preference repository.
//!
//! Category and section preferences live in two tables with the same shape;
//! [`PreferenceScope`] picks the table.

use std::collections::HashMap;

use chrono::Utc;
use huddle_common::{AppResult, IdGenerator};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    prelude::DateTimeWithTimeZone,
};

use crate::entities::category_notification::NotificationSetting;
use crate::entities::{
    CategoryNotification, SectionNotification, category_notification, section_notification,
};
use crate::{db_err, insert_err};

/// The root node a preference row hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceScope<'a> {
    /// A root category, by ID.
    Category(&'a str),
    /// A root section, by ID.
    Section(&'a str),
}

/// Repository for per-member notification preferences.
pub struct PreferenceRepository<'c, C> {
    conn: &'c C,
    id_gen: IdGenerator,
}

impl<'c, C: ConnectionTrait> PreferenceRepository<'c, C> {
    /// Create a new preference repository.
    #[must_use]
    pub const fn new(conn: &'c C) -> Self {
        Self {
            conn,
            id_gen: IdGenerator::new(),
        }
    }

    /// Stored setting of a member for a root node, if any.
    pub async fn find(
        &self,
        scope: PreferenceScope<'_>,
        group_user_id: &str,
    ) -> AppResult<Option<NotificationSetting>> {
        match scope {
            PreferenceScope::Category(category_id) => {
                let row = CategoryNotification::find()
                    .filter(category_notification::Column::CategoryId.eq(category_id))
                    .filter(category_notification::Column::GroupUserId.eq(group_user_id))
                    .one(self.conn)
                    .await
                    .map_err(db_err)?;
                Ok(row.map(|r| r.setting))
            }
            PreferenceScope::Section(section_id) => {
                let row = SectionNotification::find()
                    .filter(section_notification::Column::SectionId.eq(section_id))
                    .filter(section_notification::Column::GroupUserId.eq(group_user_id))
                    .one(self.conn)
                    .await
                    .map_err(db_err)?;
                Ok(row.map(|r| r.setting))
            }
        }
    }

    /// Update the row if present, insert it otherwise.
    pub async fn upsert(
        &self,
        scope: PreferenceScope<'_>,
        group_user_id: &str,
        setting: NotificationSetting,
    ) -> AppResult<()> {
        let now: DateTimeWithTimeZone = Utc::now().into();

        match scope {
            PreferenceScope::Category(category_id) => {
                let existing = CategoryNotification::find()
                    .filter(category_notification::Column::CategoryId.eq(category_id))
                    .filter(category_notification::Column::GroupUserId.eq(group_user_id))
                    .one(self.conn)
                    .await
                    .map_err(db_err)?;

                if let Some(row) = existing {
                    if row.setting != setting {
                        let mut active: category_notification::ActiveModel = row.into();
                        active.setting = Set(setting);
                        active.updated_at = Set(now);
                        active.update(self.conn).await.map_err(db_err)?;
                    }
                } else {
                    category_notification::ActiveModel {
                        id: Set(self.id_gen.generate()),
                        category_id: Set(category_id.to_string()),
                        group_user_id: Set(group_user_id.to_string()),
                        setting: Set(setting),
                        updated_at: Set(now),
                    }
                    .insert(self.conn)
                    .await
                    .map_err(|e| insert_err(e, "Preference already exists"))?;
                }
            }
            PreferenceScope::Section(section_id) => {
                let existing = SectionNotification::find()
                    .filter(section_notification::Column::SectionId.eq(section_id))
                    .filter(section_notification::Column::GroupUserId.eq(group_user_id))
                    .one(self.conn)
                    .await
                    .map_err(db_err)?;

                if let Some(row) = existing {
                    if row.setting != setting {
                        let mut active: section_notification::ActiveModel = row.into();
                        active.setting = Set(setting);
                        active.updated_at = Set(now);
                        active.update(self.conn).await.map_err(db_err)?;
                    }
                } else {
                    section_notification::ActiveModel {
                        id: Set(self.id_gen.generate()),
                        section_id: Set(section_id.to_string()),
                        group_user_id: Set(group_user_id.to_string()),
                        setting: Set(setting),
                        updated_at: Set(now),
                    }
                    .insert(self.conn)
                    .await
                    .map_err(|e| insert_err(e, "Preference already exists"))?;
                }
            }
        }

        Ok(())
    }

    /// Settings stored for a root section, keyed by membership ID.
    pub async fn find_by_section(
        &self,
        section_id: &str,
    ) -> AppResult<HashMap<String, NotificationSetting>> {
        let rows = SectionNotification::find()
            .filter(section_notification::Column::SectionId.eq(section_id))
            .all(self.conn)
            .await
            .map_err(db_err)?;

        Ok(rows.into_iter().map(|r| (r.group_user_id, r.setting)).collect())
    }

    /// Count rows hanging off a root node.
    pub async fn count_for_scope(&self, scope: PreferenceScope<'_>) -> AppResult<usize> {
        let count = match scope {
            PreferenceScope::Category(category_id) => CategoryNotification::find()
                .filter(category_notification::Column::CategoryId.eq(category_id))
                .all(self.conn)
                .await
                .map_err(db_err)?
                .len(),
            PreferenceScope::Section(section_id) => SectionNotification::find()
                .filter(section_notification::Column::SectionId.eq(section_id))
                .all(self.conn)
                .await
                .map_err(db_err)?
                .len(),
        };

        Ok(count)
    }

    /// Delete every row of a root node.
    pub async fn delete_for_scope(&self, scope: PreferenceScope<'_>) -> AppResult<()> {
        match scope {
            PreferenceScope::Category(category_id) => {
                CategoryNotification::delete_many()
                    .filter(category_notification::Column::CategoryId.eq(category_id))
                    .exec(self.conn)
                    .await
                    .map_err(db_err)?;
            }
            PreferenceScope::Section(section_id) => {
                SectionNotification::delete_many()
                    .filter(section_notification::Column::SectionId.eq(section_id))
                    .exec(self.conn)
                    .await
                    .map_err(db_err)?;
            }
        }

        Ok(())
    }

    /// Delete every row of a membership, in both tables.
    pub async fn delete_for_member(&self, group_user_id: &str) -> AppResult<()> {
        CategoryNotification::delete_many()
            .filter(category_notification::Column::GroupUserId.eq(group_user_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        SectionNotification::delete_many()
            .filter(section_notification::Column::GroupUserId.eq(group_user_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    /// Delete every row belonging to any of `group_user_ids`.
    pub async fn delete_for_members(&self, group_user_ids: &[String]) -> AppResult<()> {
        if group_user_ids.is_empty() {
            return Ok(());
        }

        CategoryNotification::delete_many()
            .filter(category_notification::Column::GroupUserId.is_in(group_user_ids.to_vec()))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        SectionNotification::delete_many()
            .filter(section_notification::Column::GroupUserId.is_in(group_user_ids.to_vec()))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(())
    }
}
