//! Aggregated activity of a group, maintained by the ranking job.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hot_group")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub group_id: String,

    #[sea_orm(default_value = 0)]
    pub visit_count: i64,

    #[sea_orm(default_value = 0)]
    pub join_count: i64,

    /// Ranking key: visits plus weighted joins.
    #[sea_orm(indexed, default_value = 0)]
    pub score: i64,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
