//! Fixed-cadence scheduler loop driving recurrence ticks.
//!
//! The host runs this once per service instance. Missed timer ticks are
//! skipped rather than bursted — the engine's catch-up loop owns backlog
//! recovery, so a late tick already generates everything that was missed.

use std::time::Duration;

use chrono::Utc;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::RecurrenceEngine;

/// Aggregate counters from a scheduler run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Completed ticks.
    pub ticks: u64,
    /// Total occurrences generated across all ticks.
    pub generated: u64,
    /// Total patterns deactivated across all ticks.
    pub deactivated: u64,
}

/// Run recurrence ticks every `interval` until cancelled.
///
/// Each tick draws a pooled connection and processes all active patterns
/// at `Utc::now()`. Tick failures (pool exhaustion, store errors) are
/// logged and the loop keeps going; the same cancellation token is passed
/// into the tick so shutdown is responsive mid-backlog.
pub async fn run_scheduler(
    pool: Pool<SqliteConnectionManager>,
    interval: Duration,
    cancel: CancellationToken,
) -> SchedulerStats {
    let mut timer = time::interval(interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut stats = SchedulerStats::default();

    info!(interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX), "Recurrence scheduler started");

    loop {
        tokio::select! {
            _ = timer.tick() => {
                match pool.get() {
                    Ok(conn) => {
                        match RecurrenceEngine::tick(&conn, Utc::now(), Some(&cancel)) {
                            Ok(summary) => {
                                stats.ticks += 1;
                                stats.generated += u64::from(summary.generated);
                                stats.deactivated += u64::from(summary.deactivated);
                                if summary.errors.is_empty() {
                                    debug!(
                                        generated = summary.generated,
                                        deactivated = summary.deactivated,
                                        "Tick complete"
                                    );
                                } else {
                                    warn!(
                                        generated = summary.generated,
                                        failed_patterns = summary.errors.len(),
                                        "Tick completed with pattern failures"
                                    );
                                }
                            }
                            Err(e) => warn!(error = %e, "Tick failed"),
                        }
                    }
                    Err(e) => warn!(error = %e, "No connection available for tick"),
                }
            }
            () = cancel.cancelled() => {
                info!(ticks = stats.ticks, generated = stats.generated, "Recurrence scheduler stopped");
                return stats;
            }
        }
    }
}

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use cadence_store::schema::run_migrations;
    use cadence_store::tasks::TaskRepository;
    use cadence_store::types::{Frequency, TaskCreateParams};
    use chrono::{Duration as ChronoDuration, Utc};

    fn make_pool() -> (Pool<SqliteConnectionManager>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let manager = SqliteConnectionManager::file(dir.path().join("cadence.db"));
        let pool = Pool::builder().max_size(2).build(manager).unwrap();
        run_migrations(&pool.get().unwrap()).unwrap();
        (pool, dir)
    }

    fn seed_backdated_pattern(pool: &Pool<SqliteConnectionManager>, days_ago: i64) -> String {
        let conn = pool.get().unwrap();
        let origin = TaskRepository::create(
            &conn,
            &TaskCreateParams {
                owner_id: "user-1".to_string(),
                title: "Backup".to_string(),
                due_date: Some(Utc::now() - ChronoDuration::days(days_ago)),
                ..Default::default()
            },
        )
        .unwrap();
        RecurrenceEngine::create_pattern(&conn, &origin.id, Frequency::Daily, 1, None)
            .unwrap()
            .id
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_ticks_and_generates() {
        let (pool, _dir) = make_pool();
        let pattern_id = seed_backdated_pattern(&pool, 3);

        let cancel = CancellationToken::new();
        let cancel2 = cancel.clone();
        let pool2 = pool.clone();
        let handle = tokio::spawn(async move {
            run_scheduler(pool2, Duration::from_secs(30), cancel2).await
        });

        // Paused clock: this advances virtual time through several ticks
        tokio::time::sleep(Duration::from_secs(95)).await;
        cancel.cancel();
        let stats = handle.await.unwrap();

        assert!(stats.ticks >= 1);
        assert_eq!(stats.generated, 3);

        let conn = pool.get().unwrap();
        let occurrences = TaskRepository::list_by_recurrence(&conn, &pattern_id).unwrap();
        assert_eq!(occurrences.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_repeated_ticks_stay_idempotent() {
        let (pool, _dir) = make_pool();
        let pattern_id = seed_backdated_pattern(&pool, 2);

        let cancel = CancellationToken::new();
        let cancel2 = cancel.clone();
        let pool2 = pool.clone();
        let handle = tokio::spawn(async move {
            run_scheduler(pool2, Duration::from_secs(30), cancel2).await
        });

        // Let several virtual ticks elapse
        tokio::time::sleep(Duration::from_secs(185)).await;
        cancel.cancel();
        let stats = handle.await.unwrap();

        assert!(stats.ticks >= 2);
        // Backlog generated exactly once despite many ticks
        assert_eq!(stats.generated, 2);

        let conn = pool.get().unwrap();
        let occurrences = TaskRepository::list_by_recurrence(&conn, &pattern_id).unwrap();
        assert_eq!(occurrences.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_stops_on_cancel() {
        let (pool, _dir) = make_pool();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let stats = tokio::time::timeout(
            Duration::from_secs(1),
            run_scheduler(pool, Duration::from_secs(60), cancel),
        )
        .await
        .expect("scheduler should exit promptly when cancelled");

        assert_eq!(stats.generated, 0);
    }
}
