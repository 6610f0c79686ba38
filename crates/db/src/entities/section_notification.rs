//! Per-member notification preference for a root section.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub use super::category_notification::NotificationSetting;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "section_notification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub section_id: String,

    #[sea_orm(indexed)]
    pub group_user_id: String,

    pub setting: NotificationSetting,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::section::Entity",
        from = "Column::SectionId",
        to = "super::section::Column::Id"
    )]
    Section,
    #[sea_orm(
        belongs_to = "super::group_user::Entity",
        from = "Column::GroupUserId",
        to = "super::group_user::Column::Id"
    )]
    GroupUser,
}

impl ActiveModelBehavior for ActiveModel {}
