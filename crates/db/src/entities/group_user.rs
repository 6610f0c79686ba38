//! Group membership entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role of a user within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupRole {
    /// The group's creator. Exactly one per group.
    #[sea_orm(string_value = "top_manager")]
    TopManager,
    /// Moderation and announcements.
    #[sea_orm(string_value = "manager")]
    Manager,
    /// Regular member.
    #[sea_orm(string_value = "user")]
    User,
    /// Asked to join, waiting for a manager.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Invited by a manager, waiting for the invitee.
    #[sea_orm(string_value = "invited")]
    Invited,
    /// Disciplinary state; no access to private content.
    #[sea_orm(string_value = "suspended")]
    Suspended,
}

impl GroupRole {
    /// Baseline access to group-scoped resources.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::TopManager | Self::Manager | Self::User)
    }

    /// Announcement and moderation rights.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::TopManager | Self::Manager)
    }

    /// Structural rights: categories, sections and the group itself.
    #[must_use]
    pub const fn is_top_admin(self) -> bool {
        matches!(self, Self::TopManager)
    }

    /// Seniority used by the same-or-senior guards.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::TopManager => 3,
            Self::Manager => 2,
            Self::User => 1,
            Self::Pending | Self::Invited | Self::Suspended => 0,
        }
    }
}

/// Membership edge between a user and a group.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group_user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub group_id: String,

    #[sea_orm(indexed)]
    pub user_id: String,

    pub role: GroupRole,

    /// The invitee accepted (also forced on approval).
    #[sea_orm(default_value = false)]
    pub is_accepted: bool,

    /// A manager approved the join request.
    #[sea_orm(default_value = false)]
    pub is_approved: bool,

    /// Display name inside the group. Defaults to the user's name; unique per group.
    pub name: String,

    /// Bumped on every role change; writers compare it to detect lost updates.
    #[sea_orm(default_value = 0)]
    pub version: i32,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id"
    )]
    Group,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
