//! Notification entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum NotificationKind {
    #[sea_orm(string_value = "newContent")]
    NewContent,
    #[sea_orm(string_value = "mention")]
    Mention,
    #[sea_orm(string_value = "announcement")]
    Announcement,
    #[sea_orm(string_value = "invited")]
    Invited,
    #[sea_orm(string_value = "joinApproved")]
    JoinApproved,
    #[sea_orm(string_value = "joinRequested")]
    JoinRequested,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user receiving the notification
    #[sea_orm(indexed)]
    pub user_id: String,

    #[sea_orm(indexed)]
    pub group_id: String,

    pub kind: NotificationKind,

    /// Related content or announcement ID
    #[sea_orm(nullable)]
    pub content_ref: Option<String>,

    /// Has this notification been read?
    #[sea_orm(default_value = false)]
    pub is_read: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
