//! Section entity: the navigable structure of a group.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionType {
    /// Board of posts.
    #[sea_orm(string_value = "menu")]
    Menu,
    /// File repository made of folders.
    #[sea_orm(string_value = "repository")]
    Repository,
    /// Outbound link; carries no content.
    #[sea_orm(string_value = "link")]
    Link,
    /// Visual separator in the navigation; carries no content.
    #[sea_orm(string_value = "separator")]
    Separator,
}

impl SectionType {
    /// Whether content can live under a section of this type.
    #[must_use]
    pub const fn bears_content(self) -> bool {
        matches!(self, Self::Menu | Self::Repository)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "section")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub group_id: String,

    /// `None` for a root section. Nesting is one level deep.
    #[sea_orm(indexed, nullable)]
    pub parent_id: Option<String>,

    pub name: String,

    pub section_type: SectionType,

    /// Settable on roots only; children mirror their parent.
    #[sea_orm(default_value = false)]
    pub is_public: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id"
    )]
    Group,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id"
    )]
    Parent,
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
