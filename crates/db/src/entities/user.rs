//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Login identity and the subject resolved from bearer credentials.
    #[sea_orm(unique)]
    pub email: String,

    /// Display name, copied into new memberships.
    pub name: String,

    #[sea_orm(nullable)]
    pub avatar_url: Option<String>,

    /// Argon2 PHC string.
    #[serde(skip_serializing)]
    pub password_hash: String,

    #[sea_orm(default_value = false)]
    pub is_verified: bool,

    #[sea_orm(default_value = false)]
    pub is_onboarded: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::group_user::Entity")]
    Memberships,
}

impl Related<super::group_user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
