//! Bookmark entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Discriminator of the bookmarked row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookmarkKind {
    #[sea_orm(string_value = "content")]
    Content,
    #[sea_orm(string_value = "folder")]
    Folder,
    #[sea_orm(string_value = "folder_attachment")]
    FolderAttachment,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookmark")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub user_id: String,

    /// Group of the target, resolved when the bookmark was made.
    #[sea_orm(indexed)]
    pub group_id: String,

    pub kind: BookmarkKind,

    pub target_id: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
