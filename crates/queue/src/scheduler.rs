//! Scheduled jobs for periodic ranking maintenance.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use huddle_common::AppResult;
use huddle_common::config::SchedulerSettings;
use huddle_core::RankingService;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

/// Scheduled job types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledJob {
    /// Fold group visits and joins into the hot group ranking.
    RecomputeHotGroups,
    /// Fold content visits into the hot content ranking.
    RecomputeHotContents,
}

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval for the hot group recompute (default: 1 hour).
    pub hot_group_interval: Duration,
    /// Interval for the hot content recompute (default: 1 hour).
    pub hot_content_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from(&SchedulerSettings::default())
    }
}

impl From<&SchedulerSettings> for SchedulerConfig {
    fn from(settings: &SchedulerSettings) -> Self {
        Self {
            hot_group_interval: Duration::from_secs(settings.hot_group_interval_secs.max(1)),
            hot_content_interval: Duration::from_secs(settings.hot_content_interval_secs.max(1)),
        }
    }
}

/// Job executor trait for scheduled jobs.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Execute the hot group recompute. Returns the number of groups updated.
    async fn recompute_hot_groups(&self) -> AppResult<usize>;

    /// Execute the hot content recompute. Returns the number of contents updated.
    async fn recompute_hot_contents(&self) -> AppResult<usize>;
}

#[async_trait]
impl JobExecutor for RankingService {
    async fn recompute_hot_groups(&self) -> AppResult<usize> {
        Self::recompute_hot_groups(self).await
    }

    async fn recompute_hot_contents(&self) -> AppResult<usize> {
        Self::recompute_hot_contents(self).await
    }
}

/// Run one job to completion, logging the outcome.
///
/// Returns the number of rows the job updated, or `None` when it failed.
pub async fn run_job<E: JobExecutor + ?Sized>(executor: &E, job: ScheduledJob) -> Option<usize> {
    let result = match job {
        ScheduledJob::RecomputeHotGroups => executor.recompute_hot_groups().await,
        ScheduledJob::RecomputeHotContents => executor.recompute_hot_contents().await,
    };

    match result {
        Ok(count) => {
            if count > 0 {
                tracing::info!(?job, count, "Scheduled job finished");
            } else {
                tracing::debug!(?job, "Scheduled job had nothing to do");
            }
            Some(count)
        }
        Err(e) => {
            tracing::error!(?job, error = %e, "Scheduled job failed");
            None
        }
    }
}

/// Spawn one task per job. A failed run is logged and the loop carries on.
///
/// Abort the returned handles to stop the scheduler.
pub fn run_scheduler<E: JobExecutor + 'static>(
    config: SchedulerConfig,
    executor: Arc<E>,
) -> Vec<JoinHandle<()>> {
    tracing::info!(
        hot_group_secs = config.hot_group_interval.as_secs(),
        hot_content_secs = config.hot_content_interval.as_secs(),
        "Starting scheduler"
    );

    vec![
        spawn_periodic(
            executor.clone(),
            ScheduledJob::RecomputeHotGroups,
            config.hot_group_interval,
        ),
        spawn_periodic(
            executor,
            ScheduledJob::RecomputeHotContents,
            config.hot_content_interval,
        ),
    ]
}

fn spawn_periodic<E: JobExecutor + 'static>(
    executor: Arc<E>,
    job: ScheduledJob,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = interval(period);
        // A slow run must not trigger a burst of catch-up runs
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            run_job(executor.as_ref(), job).await;
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use huddle_common::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingExecutor {
        groups: AtomicUsize,
        contents: AtomicUsize,
    }

    #[async_trait]
    impl JobExecutor for CountingExecutor {
        async fn recompute_hot_groups(&self) -> AppResult<usize> {
            Ok(self.groups.fetch_add(1, Ordering::SeqCst) + 1)
        }

        async fn recompute_hot_contents(&self) -> AppResult<usize> {
            self.contents.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Redis("connection refused".to_string()))
        }
    }

    #[test]
    fn test_config_from_settings() {
        let config = SchedulerConfig::from(&SchedulerSettings {
            hot_group_interval_secs: 600,
            hot_content_interval_secs: 0,
        });
        assert_eq!(config.hot_group_interval, Duration::from_secs(600));
        assert_eq!(config.hot_content_interval, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_run_job_reports_failures() {
        let executor = CountingExecutor::default();

        assert_eq!(
            run_job(&executor, ScheduledJob::RecomputeHotGroups).await,
            Some(1)
        );
        assert_eq!(
            run_job(&executor, ScheduledJob::RecomputeHotContents).await,
            None
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_keeps_running_after_failures() {
        let executor = Arc::new(CountingExecutor::default());
        let handles = run_scheduler(
            SchedulerConfig {
                hot_group_interval: Duration::from_secs(60),
                hot_content_interval: Duration::from_secs(30),
            },
            executor.clone(),
        );

        tokio::time::sleep(Duration::from_secs(125)).await;

        // Intervals fire immediately, then once per period
        assert_eq!(executor.groups.load(Ordering::SeqCst), 3);
        assert_eq!(executor.contents.load(Ordering::SeqCst), 5);

        for handle in handles {
            handle.abort();
        }
    }
}
