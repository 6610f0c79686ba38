//! Section repository.

use chrono::Utc;
use huddle_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, Order, QueryFilter, QueryOrder,
    QuerySelect, prelude::DateTimeWithTimeZone, sea_query::Expr,
};

use crate::db_err;
use crate::entities::{Section, section};

/// Repository for section operations.
pub struct SectionRepository<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> SectionRepository<'c, C> {
    /// Create a new section repository.
    #[must_use]
    pub const fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Find section by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<section::Model>> {
        Section::find_by_id(id).one(self.conn).await.map_err(db_err)
    }

    /// Get section by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<section::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Section not found: {id}")))
    }

    /// Root sections of a group.
    pub async fn find_roots(&self, group_id: &str) -> AppResult<Vec<section::Model>> {
        Section::find()
            .filter(section::Column::GroupId.eq(group_id))
            .filter(section::Column::ParentId.is_null())
            .order_by(section::Column::CreatedAt, Order::Asc)
            .all(self.conn)
            .await
            .map_err(db_err)
    }

    /// Direct children of a section.
    pub async fn find_children(&self, parent_id: &str) -> AppResult<Vec<section::Model>> {
        Section::find()
            .filter(section::Column::ParentId.eq(parent_id))
            .order_by(section::Column::CreatedAt, Order::Asc)
            .all(self.conn)
            .await
            .map_err(db_err)
    }

    /// IDs of every section of a group.
    pub async fn find_ids_by_group(&self, group_id: &str) -> AppResult<Vec<String>> {
        Section::find()
            .select_only()
            .column(section::Column::Id)
            .filter(section::Column::GroupId.eq(group_id))
            .into_tuple()
            .all(self.conn)
            .await
            .map_err(db_err)
    }

    /// Create a new section.
    pub async fn create(&self, model: section::ActiveModel) -> AppResult<section::Model> {
        model.insert(self.conn).await.map_err(db_err)
    }

    /// Update a section.
    pub async fn update(&self, model: section::ActiveModel) -> AppResult<section::Model> {
        model.update(self.conn).await.map_err(db_err)
    }

    /// Copy a visibility flag onto every child of `parent_id`.
    pub async fn set_children_public(&self, parent_id: &str, is_public: bool) -> AppResult<u64> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let result = Section::update_many()
            .col_expr(section::Column::IsPublic, Expr::value(is_public))
            .col_expr(section::Column::UpdatedAt, Expr::value(now))
            .filter(section::Column::ParentId.eq(parent_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }

    /// Delete a section row.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Section::delete_by_id(id)
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    /// Delete the children of a section.
    pub async fn delete_children(&self, parent_id: &str) -> AppResult<u64> {
        let result = Section::delete_many()
            .filter(section::Column::ParentId.eq(parent_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected)
    }

    /// Delete every section of a group, children before roots.
    pub async fn delete_by_group(&self, group_id: &str) -> AppResult<u64> {
        let children = Section::delete_many()
            .filter(section::Column::GroupId.eq(group_id))
            .filter(section::Column::ParentId.is_not_null())
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        let roots = Section::delete_many()
            .filter(section::Column::GroupId.eq(group_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(children.rows_affected + roots.rows_affected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::section::SectionType;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_section(id: &str, parent_id: Option<&str>) -> section::Model {
        section::Model {
            id: id.to_string(),
            group_id: "grp1".to_string(),
            parent_id: parent_id.map(ToString::to_string),
            name: format!("Section {id}"),
            section_type: SectionType::Menu,
            is_public: true,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_children() {
        let child1 = create_test_section("sec2", Some("sec1"));
        let child2 = create_test_section("sec3", Some("sec1"));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[child1, child2]])
            .into_connection();

        let repo = SectionRepository::new(&db);
        let children = repo.find_children("sec1").await.unwrap();

        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|s| !s.is_root()));
    }

    #[tokio::test]
    async fn test_set_children_public_reports_rows() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 3,
            }])
            .into_connection();

        let repo = SectionRepository::new(&db);
        assert_eq!(repo.set_children_public("sec1", false).await.unwrap(), 3);
    }
}
