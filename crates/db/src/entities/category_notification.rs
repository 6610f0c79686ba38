//! Per-member notification preference for a root category.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Which events produce a notification for a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationSetting {
    /// Every event.
    #[sea_orm(string_value = "all")]
    All,
    /// Only events that mention the member.
    #[sea_orm(string_value = "mentions")]
    Mentions,
    /// Nothing.
    #[sea_orm(string_value = "none")]
    None,
}

impl Default for NotificationSetting {
    fn default() -> Self {
        Self::All
    }
}

impl NotificationSetting {
    /// Whether an event reaches a member with this setting.
    #[must_use]
    pub const fn admits(self, mentioned: bool) -> bool {
        match self {
            Self::All => true,
            Self::Mentions => mentioned,
            Self::None => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "category_notification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub category_id: String,

    #[sea_orm(indexed)]
    pub group_user_id: String,

    pub setting: NotificationSetting,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(
        belongs_to = "super::group_user::Entity",
        from = "Column::GroupUserId",
        to = "super::group_user::Column::Id"
    )]
    GroupUser,
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admits() {
        assert!(NotificationSetting::All.admits(false));
        assert!(NotificationSetting::Mentions.admits(true));
        assert!(!NotificationSetting::Mentions.admits(false));
        assert!(!NotificationSetting::None.admits(true));
        assert_eq!(NotificationSetting::default(), NotificationSetting::All);
    }
}
