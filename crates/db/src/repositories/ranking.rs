//! Hot ranking aggregate repository.

use chrono::Utc;
use huddle_common::AppResult;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, Order, QueryFilter, QueryOrder,
    QuerySelect, Set,
    prelude::DateTimeWithTimeZone,
    sea_query::{Expr, Query},
};

use crate::db_err;
use crate::entities::{
    Content, Group, HotContent, HotGroup, Section, content, group, hot_content, hot_group,
    section,
};

/// Repository for the `hot_group` and `hot_content` aggregates.
pub struct RankingRepository<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> RankingRepository<'c, C> {
    /// Create a new ranking repository.
    #[must_use]
    pub const fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Add drained activity to a group's aggregate, creating it on first sight.
    pub async fn add_group_activity(
        &self,
        group_id: &str,
        visits: i64,
        joins: i64,
        score: i64,
    ) -> AppResult<()> {
        let now: DateTimeWithTimeZone = Utc::now().into();

        let result = HotGroup::update_many()
            .col_expr(
                hot_group::Column::VisitCount,
                Expr::col(hot_group::Column::VisitCount).add(visits),
            )
            .col_expr(
                hot_group::Column::JoinCount,
                Expr::col(hot_group::Column::JoinCount).add(joins),
            )
            .col_expr(
                hot_group::Column::Score,
                Expr::col(hot_group::Column::Score).add(score),
            )
            .col_expr(hot_group::Column::UpdatedAt, Expr::value(now))
            .filter(hot_group::Column::GroupId.eq(group_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            hot_group::ActiveModel {
                group_id: Set(group_id.to_string()),
                visit_count: Set(visits),
                join_count: Set(joins),
                score: Set(score),
                updated_at: Set(now),
            }
            .insert(self.conn)
            .await
            .map_err(db_err)?;
        }

        Ok(())
    }

    /// Add drained visits to a content's aggregate, creating it on first sight.
    pub async fn add_content_visits(
        &self,
        content_id: &str,
        group_id: &str,
        visits: i64,
    ) -> AppResult<()> {
        let now: DateTimeWithTimeZone = Utc::now().into();

        let result = HotContent::update_many()
            .col_expr(
                hot_content::Column::VisitCount,
                Expr::col(hot_content::Column::VisitCount).add(visits),
            )
            .col_expr(hot_content::Column::UpdatedAt, Expr::value(now))
            .filter(hot_content::Column::ContentId.eq(content_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            hot_content::ActiveModel {
                content_id: Set(content_id.to_string()),
                group_id: Set(group_id.to_string()),
                visit_count: Set(visits),
                updated_at: Set(now),
            }
            .insert(self.conn)
            .await
            .map_err(db_err)?;
        }

        Ok(())
    }

    /// Highest-scoring public groups.
    ///
    /// Visibility is filtered before the limit, so private groups never take
    /// a slot from a public one.
    pub async fn top_groups(&self, limit: u64) -> AppResult<Vec<hot_group::Model>> {
        let public_groups = Query::select()
            .column(group::Column::Id)
            .from(Group)
            .and_where(Expr::col(group::Column::IsPublic).eq(true))
            .to_owned();

        HotGroup::find()
            .filter(hot_group::Column::GroupId.in_subquery(public_groups))
            .order_by(hot_group::Column::Score, Order::Desc)
            .order_by(hot_group::Column::GroupId, Order::Asc)
            .limit(limit)
            .all(self.conn)
            .await
            .map_err(db_err)
    }

    /// Most visited contents living in a public section of a public group.
    pub async fn top_contents(&self, limit: u64) -> AppResult<Vec<hot_content::Model>> {
        let public_contents = Query::select()
            .column((Content, content::Column::Id))
            .from(Content)
            .inner_join(
                Section,
                Expr::col((Section, section::Column::Id))
                    .equals((Content, content::Column::SectionId)),
            )
            .inner_join(
                Group,
                Expr::col((Group, group::Column::Id)).equals((Content, content::Column::GroupId)),
            )
            .and_where(Expr::col((Section, section::Column::IsPublic)).eq(true))
            .and_where(Expr::col((Group, group::Column::IsPublic)).eq(true))
            .to_owned();

        HotContent::find()
            .filter(hot_content::Column::ContentId.in_subquery(public_contents))
            .order_by(hot_content::Column::VisitCount, Order::Desc)
            .order_by(hot_content::Column::ContentId, Order::Asc)
            .limit(limit)
            .all(self.conn)
            .await
            .map_err(db_err)
    }

    /// Drop the aggregates of a content.
    pub async fn delete_content(&self, content_id: &str) -> AppResult<()> {
        HotContent::delete_by_id(content_id)
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    /// Drop every aggregate of a group.
    pub async fn delete_by_group(&self, group_id: &str) -> AppResult<()> {
        HotContent::delete_many()
            .filter(hot_content::Column::GroupId.eq(group_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        HotGroup::delete_by_id(group_id)
            .exec(self.conn)
            .await
            .map_err(db_err)?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::section::SectionType;
    use crate::entities::user;
    use crate::test_utils::memory_db;
    use sea_orm::DatabaseConnection;

    async fn seed_user(db: &DatabaseConnection) {
        user::ActiveModel {
            id: Set("u1".to_string()),
            email: Set("u1@example.com".to_string()),
            name: Set("u1".to_string()),
            avatar_url: Set(None),
            password_hash: Set("x".to_string()),
            is_verified: Set(false),
            is_onboarded: Set(false),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        }
        .insert(db)
        .await
        .unwrap();
    }

    async fn seed_group(db: &DatabaseConnection, id: &str, is_public: bool) {
        group::ActiveModel {
            id: Set(id.to_string()),
            creator_id: Set("u1".to_string()),
            name: Set(id.to_string()),
            image_url: Set(None),
            description: Set(None),
            is_public: Set(is_public),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        }
        .insert(db)
        .await
        .unwrap();
    }

    async fn seed_section(db: &DatabaseConnection, id: &str, group_id: &str, is_public: bool) {
        section::ActiveModel {
            id: Set(id.to_string()),
            group_id: Set(group_id.to_string()),
            parent_id: Set(None),
            name: Set(id.to_string()),
            section_type: Set(SectionType::Menu),
            is_public: Set(is_public),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        }
        .insert(db)
        .await
        .unwrap();
    }

    async fn seed_content(db: &DatabaseConnection, id: &str, group_id: &str, section_id: &str) {
        content::ActiveModel {
            id: Set(id.to_string()),
            group_id: Set(group_id.to_string()),
            section_id: Set(section_id.to_string()),
            author_id: Set("m1".to_string()),
            title: Set(id.to_string()),
            body: Set(String::new()),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        }
        .insert(db)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_group_activity_accumulates() {
        let db = memory_db().await.unwrap();
        seed_user(&db).await;
        seed_group(&db, "grp1", true).await;
        seed_group(&db, "grp2", true).await;
        let repo = RankingRepository::new(&db);

        repo.add_group_activity("grp1", 3, 1, 8).await.unwrap();
        repo.add_group_activity("grp1", 2, 0, 2).await.unwrap();
        repo.add_group_activity("grp2", 1, 0, 1).await.unwrap();

        let top = repo.top_groups(10).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].group_id, "grp1");
        assert_eq!(top[0].visit_count, 5);
        assert_eq!(top[0].join_count, 1);
        assert_eq!(top[0].score, 10);
    }

    #[tokio::test]
    async fn test_private_groups_do_not_take_top_slots() {
        let db = memory_db().await.unwrap();
        seed_user(&db).await;
        seed_group(&db, "open", true).await;
        seed_group(&db, "closed", false).await;
        let repo = RankingRepository::new(&db);

        repo.add_group_activity("closed", 9, 0, 9).await.unwrap();
        repo.add_group_activity("open", 1, 0, 1).await.unwrap();

        let top = repo.top_groups(1).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].group_id, "open");
    }

    #[tokio::test]
    async fn test_top_contents_limit_counts_only_public_rows() {
        let db = memory_db().await.unwrap();
        seed_user(&db).await;
        seed_group(&db, "grp1", true).await;
        seed_group(&db, "grp2", false).await;
        seed_section(&db, "open", "grp1", true).await;
        seed_section(&db, "closed", "grp1", false).await;
        seed_section(&db, "hidden", "grp2", true).await;
        for (id, section, group) in [
            ("c1", "open", "grp1"),
            ("c2", "open", "grp1"),
            ("c3", "open", "grp1"),
            ("c4", "closed", "grp1"),
            ("c5", "hidden", "grp2"),
        ] {
            seed_content(&db, id, group, section).await;
        }
        let repo = RankingRepository::new(&db);

        repo.add_content_visits("c1", "grp1", 1).await.unwrap();
        repo.add_content_visits("c2", "grp1", 5).await.unwrap();
        repo.add_content_visits("c3", "grp1", 3).await.unwrap();
        repo.add_content_visits("c4", "grp1", 50).await.unwrap();
        repo.add_content_visits("c5", "grp2", 40).await.unwrap();

        let top = repo.top_contents(2).await.unwrap();
        let ids: Vec<_> = top.iter().map(|c| c.content_id.as_str()).collect();
        assert_eq!(ids, ["c2", "c3"]);

        repo.delete_by_group("grp1").await.unwrap();
        assert!(repo.top_contents(10).await.unwrap().is_empty());
    }
}
