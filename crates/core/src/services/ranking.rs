//! Hot ranking.
//!
//! Reads and joins push IDs onto counter lists in the cache. The recompute
//! jobs drain those lists, fold the counts into the `hot_group` and
//! `hot_content` aggregates and publish a top-N snapshot with a TTL. Draining
//! pops the entries, so a re-run never counts the same visit twice.

use std::collections::HashMap;
use std::time::Duration;

use huddle_common::config::RankingConfig;
use huddle_common::{AppError, AppResult, SharedCache};
use huddle_db::UnitOfWork;
use huddle_db::repositories::{ContentRepository, GroupRepository, RankingRepository};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Counter list of group visits; entries are group IDs.
pub const GROUP_VISIT_KEY: &str = "counter:group_visit";
/// Counter list of joins; entries are group IDs.
pub const GROUP_JOIN_KEY: &str = "counter:group_join";
/// Counter list of content visits; entries are `group_id:content_id`.
pub const CONTENT_VISIT_KEY: &str = "counter:content_visit";
/// Published hot group snapshot.
pub const HOT_GROUPS_KEY: &str = "hot:groups";
/// Published hot content snapshot.
pub const HOT_CONTENTS_KEY: &str = "hot:contents";

/// A join weighs as much as this many visits.
const JOIN_WEIGHT: i64 = 5;

/// Entry of the hot group snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotGroupEntry {
    pub group_id: String,
    pub name: String,
    pub score: i64,
    pub visit_count: i64,
    pub join_count: i64,
}

/// Entry of the hot content snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotContentEntry {
    pub content_id: String,
    pub group_id: String,
    pub title: String,
    pub visit_count: i64,
}

/// Service recording activity and publishing hot rankings.
#[derive(Clone)]
pub struct RankingService {
    db: DatabaseConnection,
    cache: SharedCache,
    config: RankingConfig,
}

impl RankingService {
    /// Create a new ranking service.
    #[must_use]
    pub const fn new(db: DatabaseConnection, cache: SharedCache, config: RankingConfig) -> Self {
        Self { db, cache, config }
    }

    // ==================== Counters ====================

    /// Count a visit to a group.
    pub async fn record_group_visit(&self, group_id: &str) {
        self.record(GROUP_VISIT_KEY, group_id).await;
    }

    /// Count a member joining a group.
    pub async fn record_join(&self, group_id: &str) {
        self.record(GROUP_JOIN_KEY, group_id).await;
    }

    /// Count a visit to a content.
    pub async fn record_content_visit(&self, group_id: &str, content_id: &str) {
        self.record(CONTENT_VISIT_KEY, &format!("{group_id}:{content_id}"))
            .await;
    }

    /// Counters are best effort: a cache outage must not fail the read being counted.
    async fn record(&self, key: &str, value: &str) {
        if let Err(e) = self.cache.push(key, value).await {
            warn!(error = %e, key, "Failed to record activity");
        }
    }

    async fn drain_counts(&self, key: &str) -> AppResult<HashMap<String, i64>> {
        let batch_size = self.config.drain_batch.max(1);
        let mut counts = HashMap::new();

        loop {
            let batch = match self.cache.drain(key, batch_size).await {
                Ok(batch) => batch,
                Err(e) => {
                    self.restore(key, &counts).await;
                    return Err(e);
                }
            };
            let len = batch.len();
            for value in batch {
                *counts.entry(value).or_insert(0) += 1;
            }
            if len < batch_size {
                break;
            }
        }

        Ok(counts)
    }

    /// Push drained counts back onto their list after a failed run.
    async fn restore(&self, key: &str, counts: &HashMap<String, i64>) {
        let mut lost = 0;
        for (value, count) in counts {
            for _ in 0..*count {
                if self.cache.push(key, value).await.is_err() {
                    lost += 1;
                }
            }
        }
        if lost > 0 {
            warn!(key, lost, "Failed to restore drained counters");
        } else if !counts.is_empty() {
            debug!(key, entries = counts.len(), "Restored drained counters");
        }
    }

    // ==================== Jobs ====================

    /// Fold drained group visits and joins into the aggregates and republish.
    ///
    /// Returns the number of groups whose aggregate changed. When the
    /// aggregates cannot be written the drained counters are put back.
    pub async fn recompute_hot_groups(&self) -> AppResult<usize> {
        let visits = self.drain_counts(GROUP_VISIT_KEY).await?;
        let joins = match self.drain_counts(GROUP_JOIN_KEY).await {
            Ok(joins) => joins,
            Err(e) => {
                self.restore(GROUP_VISIT_KEY, &visits).await;
                return Err(e);
            }
        };

        let updated = match self.fold_groups(&visits, &joins).await {
            Ok(updated) => updated,
            Err(e) => {
                self.restore(GROUP_VISIT_KEY, &visits).await;
                self.restore(GROUP_JOIN_KEY, &joins).await;
                return Err(e);
            }
        };

        let snapshot = self.load_hot_groups().await?;
        self.publish(HOT_GROUPS_KEY, &snapshot).await?;

        info!(updated, published = snapshot.len(), "Hot groups recomputed");
        Ok(updated)
    }

    async fn fold_groups(
        &self,
        visits: &HashMap<String, i64>,
        joins: &HashMap<String, i64>,
    ) -> AppResult<usize> {
        let mut group_ids: Vec<String> = visits.keys().chain(joins.keys()).cloned().collect();
        group_ids.sort();
        group_ids.dedup();

        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<usize> = async {
            let groups = GroupRepository::new(uow.conn());
            let ranking = RankingRepository::new(uow.conn());
            let mut updated = 0;

            for group in groups.find_by_ids(&group_ids).await? {
                if !group.is_public {
                    continue;
                }
                let v = visits.get(&group.id).copied().unwrap_or(0);
                let j = joins.get(&group.id).copied().unwrap_or(0);
                ranking
                    .add_group_activity(&group.id, v, j, v + JOIN_WEIGHT * j)
                    .await?;
                updated += 1;
            }

            Ok(updated)
        }
        .await;
        uow.finish(result).await
    }

    /// Fold drained content visits into the aggregates and republish.
    ///
    /// Returns the number of contents whose aggregate changed. When the
    /// aggregates cannot be written the drained counters are put back.
    pub async fn recompute_hot_contents(&self) -> AppResult<usize> {
        let visits = self.drain_counts(CONTENT_VISIT_KEY).await?;

        let updated = match self.fold_contents(&visits).await {
            Ok(updated) => updated,
            Err(e) => {
                self.restore(CONTENT_VISIT_KEY, &visits).await;
                return Err(e);
            }
        };

        let snapshot = self.load_hot_contents().await?;
        self.publish(HOT_CONTENTS_KEY, &snapshot).await?;

        info!(updated, published = snapshot.len(), "Hot contents recomputed");
        Ok(updated)
    }

    async fn fold_contents(&self, visits: &HashMap<String, i64>) -> AppResult<usize> {
        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<usize> = async {
            let contents = ContentRepository::new(uow.conn());
            let ranking = RankingRepository::new(uow.conn());
            let mut updated = 0;

            for (entry, count) in visits {
                let Some((group_id, content_id)) = entry.split_once(':') else {
                    debug!(entry = %entry, "Skipping malformed counter entry");
                    continue;
                };
                // Deleted since the visit
                if contents.find_by_id(content_id).await?.is_none() {
                    continue;
                }
                ranking
                    .add_content_visits(content_id, group_id, *count)
                    .await?;
                updated += 1;
            }

            Ok(updated)
        }
        .await;
        uow.finish(result).await
    }

    // ==================== Snapshots ====================

    /// Current hot groups: the published snapshot, or the aggregates when it expired.
    pub async fn hot_groups(&self) -> AppResult<Vec<HotGroupEntry>> {
        if let Some(snapshot) = self.cached(HOT_GROUPS_KEY).await? {
            return Ok(snapshot);
        }
        self.load_hot_groups().await
    }

    /// Current hot contents: the published snapshot, or the aggregates when it expired.
    pub async fn hot_contents(&self) -> AppResult<Vec<HotContentEntry>> {
        if let Some(snapshot) = self.cached(HOT_CONTENTS_KEY).await? {
            return Ok(snapshot);
        }
        self.load_hot_contents().await
    }

    /// Drop the published snapshots so the next read rebuilds them from the aggregates.
    pub async fn invalidate(&self) {
        for key in [HOT_GROUPS_KEY, HOT_CONTENTS_KEY] {
            if let Err(e) = self.cache.delete(key).await {
                warn!(error = %e, key, "Failed to invalidate snapshot");
            }
        }
    }

    async fn load_hot_groups(&self) -> AppResult<Vec<HotGroupEntry>> {
        let rows = RankingRepository::new(&self.db)
            .top_groups(self.config.top_n)
            .await?;
        let ids: Vec<String> = rows.iter().map(|r| r.group_id.clone()).collect();
        let names: HashMap<String, String> = GroupRepository::new(&self.db)
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|g| (g.id, g.name))
            .collect();

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let name = names.get(&row.group_id)?.clone();
                Some(HotGroupEntry {
                    group_id: row.group_id,
                    name,
                    score: row.score,
                    visit_count: row.visit_count,
                    join_count: row.join_count,
                })
            })
            .collect())
    }

    async fn load_hot_contents(&self) -> AppResult<Vec<HotContentEntry>> {
        let rows = RankingRepository::new(&self.db)
            .top_contents(self.config.top_n)
            .await?;
        let contents = ContentRepository::new(&self.db);

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(content) = contents.find_by_id(&row.content_id).await? else {
                continue;
            };
            entries.push(HotContentEntry {
                content_id: row.content_id,
                group_id: row.group_id,
                title: content.title,
                visit_count: row.visit_count,
            });
        }

        Ok(entries)
    }

    async fn publish<T: Serialize>(&self, key: &str, snapshot: &T) -> AppResult<()> {
        let json = serde_json::to_string(snapshot)
            .map_err(|e| AppError::Internal(format!("Failed to encode snapshot: {e}")))?;
        self.cache
            .set_with_ttl(
                key,
                &json,
                Duration::from_secs(self.config.snapshot_ttl_secs),
            )
            .await
    }

    async fn cached<T: for<'de> Deserialize<'de>>(&self, key: &str) -> AppResult<Option<T>> {
        let Some(json) = self.cache.get(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&json) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!(error = %e, key, "Discarding unreadable snapshot");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::content::{ContentService, CreateContentInput};
    use crate::services::test_support::World;
    use huddle_common::CacheStore;
    use huddle_db::entities::section::SectionType;
    use sea_orm::ConnectionTrait;
    use std::sync::Arc;

    const OWNER: &str = "owner@example.com";
    const USER: &str = "user@example.com";

    #[tokio::test]
    async fn test_hot_groups_from_drained_counters() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        world.user(USER, "User").await;
        let public = world.group(OWNER, "Public", true).await;
        let private = world.group(OWNER, "Private", false).await;

        world.groups.get(None, &public.id).await.unwrap();
        world.groups.get(Some(USER), &public.id).await.unwrap();
        world.groups.get(Some(OWNER), &private.id).await.unwrap();
        let pending = world.membership.request_join(USER, &public.id).await.unwrap();
        world
            .membership
            .approve(OWNER, &public.id, &pending.id)
            .await
            .unwrap();
        assert_eq!(world.cache.list_len(GROUP_VISIT_KEY).await, 3);

        assert_eq!(world.ranking.recompute_hot_groups().await.unwrap(), 1);
        assert_eq!(world.cache.list_len(GROUP_VISIT_KEY).await, 0);
        assert_eq!(world.cache.list_len(GROUP_JOIN_KEY).await, 0);

        let expected = vec![HotGroupEntry {
            group_id: public.id.clone(),
            name: "Public".to_string(),
            score: 2 + JOIN_WEIGHT,
            visit_count: 2,
            join_count: 1,
        }];
        assert_eq!(world.ranking.hot_groups().await.unwrap(), expected);

        // Nothing left to drain; a re-run must not count again
        assert_eq!(world.ranking.recompute_hot_groups().await.unwrap(), 0);
        assert_eq!(world.ranking.hot_groups().await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_hot_groups_fall_back_to_aggregates() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        let public = world.group(OWNER, "Public", true).await;
        world.groups.get(None, &public.id).await.unwrap();
        world.ranking.recompute_hot_groups().await.unwrap();

        world.cache.delete(HOT_GROUPS_KEY).await.unwrap();

        let hot = world.ranking.hot_groups().await.unwrap();
        assert_eq!(hot.len(), 1);
        assert_eq!(hot[0].visit_count, 1);
    }

    #[tokio::test]
    async fn test_hot_contents_skip_private_sections() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        let group = world.group(OWNER, "Public", true).await;
        let open = world
            .section(OWNER, &group.id, None, SectionType::Menu, true)
            .await;
        let closed = world
            .section(OWNER, &group.id, None, SectionType::Menu, false)
            .await;

        let contents = ContentService::new(
            world.db.clone(),
            world.sink.clone(),
            world.ranking.clone(),
        );
        let post = |title: &str| CreateContentInput {
            title: title.to_string(),
            body: String::new(),
            mentions: Vec::new(),
        };
        let visible = contents.create(OWNER, &open.id, post("Open")).await.unwrap();
        let hidden = contents
            .create(OWNER, &closed.id, post("Closed"))
            .await
            .unwrap();

        contents.get(None, &visible.id).await.unwrap();
        contents.get(None, &visible.id).await.unwrap();
        contents.get(Some(OWNER), &hidden.id).await.unwrap();

        assert_eq!(world.ranking.recompute_hot_contents().await.unwrap(), 2);

        let hot = world.ranking.hot_contents().await.unwrap();
        assert_eq!(
            hot,
            vec![HotContentEntry {
                content_id: visible.id,
                group_id: group.id,
                title: "Open".to_string(),
                visit_count: 2,
            }]
        );
    }

    #[tokio::test]
    async fn test_private_contents_do_not_crowd_out_public_ones() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        let group = world.group(OWNER, "Public", true).await;
        let open = world
            .section(OWNER, &group.id, None, SectionType::Menu, true)
            .await;
        let closed = world
            .section(OWNER, &group.id, None, SectionType::Menu, false)
            .await;

        let contents = ContentService::new(
            world.db.clone(),
            world.sink.clone(),
            world.ranking.clone(),
        );
        let post = |title: &str| CreateContentInput {
            title: title.to_string(),
            body: String::new(),
            mentions: Vec::new(),
        };
        let visible = contents.create(OWNER, &open.id, post("Open")).await.unwrap();
        let hidden = contents
            .create(OWNER, &closed.id, post("Closed"))
            .await
            .unwrap();

        contents.get(None, &visible.id).await.unwrap();
        for _ in 0..3 {
            contents.get(Some(OWNER), &hidden.id).await.unwrap();
        }

        let top_one = RankingService::new(
            world.db.clone(),
            Arc::new(world.cache.clone()),
            RankingConfig {
                top_n: 1,
                ..RankingConfig::default()
            },
        );
        top_one.recompute_hot_contents().await.unwrap();

        let hot = top_one.hot_contents().await.unwrap();
        assert_eq!(hot.len(), 1);
        assert_eq!(hot[0].content_id, visible.id);
    }

    #[tokio::test]
    async fn test_failed_group_recompute_keeps_counters() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        let public = world.group(OWNER, "Public", true).await;
        world.groups.get(None, &public.id).await.unwrap();
        world.groups.get(None, &public.id).await.unwrap();

        world
            .db
            .execute_unprepared("DROP TABLE hot_group")
            .await
            .unwrap();

        assert!(matches!(
            world.ranking.recompute_hot_groups().await,
            Err(AppError::Database(_))
        ));
        assert_eq!(world.cache.list_len(GROUP_VISIT_KEY).await, 2);
    }

    #[tokio::test]
    async fn test_failed_content_recompute_keeps_counters() {
        let world = World::new().await;
        world.user(OWNER, "Owner").await;
        let group = world.group(OWNER, "Public", true).await;
        let open = world
            .section(OWNER, &group.id, None, SectionType::Menu, true)
            .await;
        let contents = ContentService::new(
            world.db.clone(),
            world.sink.clone(),
            world.ranking.clone(),
        );
        let post = contents
            .create(
                OWNER,
                &open.id,
                CreateContentInput {
                    title: "Open".to_string(),
                    body: String::new(),
                    mentions: Vec::new(),
                },
            )
            .await
            .unwrap();
        contents.get(None, &post.id).await.unwrap();

        world
            .db
            .execute_unprepared("DROP TABLE hot_content")
            .await
            .unwrap();

        assert!(world.ranking.recompute_hot_contents().await.is_err());
        assert_eq!(world.cache.list_len(CONTENT_VISIT_KEY).await, 1);
    }
}
