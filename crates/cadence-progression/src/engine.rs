//! Point awards and level progression.
//!
//! Points are lifetime-monotonic; levels are derived from points with
//! `floor(sqrt(points / 100)) + 1` and therefore never decrease. Awards
//! go through the same optimistic read-modify-write cycle as streaks,
//! with bounded internal retry when a concurrent writer lands first.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use cadence_core::config::PointsConfig;
use cadence_core::errors::CadenceError;
use cadence_core::events::{LevelUp, NotificationSink};
use cadence_store::progression::ProgressionRepository;
use cadence_store::types::UserProgression;

// ─────────────────────────────────────────────────────────────────────────────
// Actions and outcomes
// ─────────────────────────────────────────────────────────────────────────────

/// A point-awarding action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsAction {
    /// A task was completed (streak bonus applies).
    TaskCompleted,
    /// A focus session was completed.
    FocusSessionCompleted,
    /// First login of the day.
    DailyLogin,
    /// Caller-supplied award, read from metadata and capped.
    Custom,
}

impl PointsAction {
    /// Wire name of the action.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TaskCompleted => "task_completed",
            Self::FocusSessionCompleted => "focus_session_completed",
            Self::DailyLogin => "daily_login",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for PointsAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PointsAction {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task_completed" => Ok(Self::TaskCompleted),
            "focus_session_completed" => Ok(Self::FocusSessionCompleted),
            "daily_login" => Ok(Self::DailyLogin),
            "custom" => Ok(Self::Custom),
            _ => Err(CadenceError::Validation(format!(
                "unsupported points action '{s}'"
            ))),
        }
    }
}

/// Result of a points award.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardOutcome {
    /// Points added by this award (base + any streak bonus).
    pub points_added: u64,
    /// Lifetime points after the award.
    pub total_points: u64,
    /// Level after the award.
    pub level: u32,
    /// Whether this award crossed a level threshold.
    pub level_up: bool,
}

/// Progress within the current level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    /// Points at which the current level begins.
    pub current_level_start_xp: u64,
    /// Points at which the next level begins.
    pub next_level_xp: u64,
    /// Percentage of the way to the next level, in [0, 100].
    pub percentage: f64,
}

/// A user's full progression view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progression {
    /// Current level.
    pub level: u32,
    /// Lifetime points.
    pub points: u64,
    /// Current consecutive-day streak.
    pub streak: u32,
    /// Longest streak ever reached.
    pub longest_streak: u32,
    /// Progress toward the next level.
    pub progress: LevelProgress,
}

// ─────────────────────────────────────────────────────────────────────────────
// Level math
// ─────────────────────────────────────────────────────────────────────────────

/// Level for a lifetime point total: `floor(sqrt(points / 100)) + 1`.
///
/// Level N spans `[(N-1)^2 * 100, N^2 * 100)` points, so each level
/// costs progressively more than the last.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
pub fn level_for_points(points: u64) -> u32 {
    (points as f64 / 100.0).sqrt().floor() as u32 + 1
}

fn level_progress(level: u32, points: u64) -> LevelProgress {
    let start = u64::from(level - 1).pow(2) * 100;
    let next = u64::from(level).pow(2) * 100;
    #[allow(clippy::cast_precision_loss)]
    let percentage =
        (points.saturating_sub(start) as f64 / (next - start) as f64 * 100.0).clamp(0.0, 100.0);
    LevelProgress { current_level_start_xp: start, next_level_xp: next, percentage }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// Awards points and reports progression state.
pub struct ProgressionEngine {
    config: PointsConfig,
    sink: Arc<dyn NotificationSink>,
}

impl ProgressionEngine {
    /// Create an engine with the given award table and notification sink.
    #[must_use]
    pub fn new(config: PointsConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self { config, sink }
    }

    /// The engine's award configuration.
    #[must_use]
    pub fn config(&self) -> &PointsConfig {
        &self.config
    }

    /// Award points to a user for an action.
    ///
    /// `task_completed` awards include the streak bonus computed from the
    /// user's current streak, so completion handlers must apply the streak
    /// transition before calling this. `custom` awards read
    /// `metadata["points"]`, capped at the configured maximum; missing or
    /// non-numeric metadata awards nothing.
    ///
    /// When the award crosses a level threshold the outcome reports
    /// `level_up` and a [`LevelUp`] notification is delivered best-effort.
    pub fn award_points(
        &self,
        conn: &Connection,
        user_id: &str,
        action: PointsAction,
        metadata: Option<&serde_json::Value>,
    ) -> Result<AwardOutcome, CadenceError> {
        let mut attempt = 0;
        loop {
            let mut record = ProgressionRepository::get_or_create(conn, user_id)?;
            let delta = self.points_for(action, record.streak, metadata);
            let old_level = record.level;
            record.points = record.points.saturating_add(delta);
            record.level = level_for_points(record.points);

            match ProgressionRepository::update(conn, &record) {
                Ok(()) => {
                    let level_up = record.level > old_level;
                    if level_up {
                        self.notify_level_up(&record, old_level);
                    }
                    return Ok(AwardOutcome {
                        points_added: delta,
                        total_points: record.points,
                        level: record.level,
                        level_up,
                    });
                }
                Err(e) if e.is_conflict() && attempt < self.config.conflict_retries => {
                    attempt += 1;
                    debug!(user_id, attempt, "Points award lost the write race, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// A user's progression view, bootstrapping the record on first contact.
    pub fn get_progression(
        &self,
        conn: &Connection,
        user_id: &str,
    ) -> Result<Progression, CadenceError> {
        let record = ProgressionRepository::get_or_create(conn, user_id)?;
        Ok(Progression {
            level: record.level,
            points: record.points,
            streak: record.streak,
            longest_streak: record.longest_streak,
            progress: level_progress(record.level, record.points),
        })
    }

    fn points_for(
        &self,
        action: PointsAction,
        streak: u32,
        metadata: Option<&serde_json::Value>,
    ) -> u64 {
        match action {
            PointsAction::TaskCompleted => {
                self.config.task_completed_points + self.config.streak_bonus(streak)
            }
            PointsAction::FocusSessionCompleted => self.config.focus_session_points,
            PointsAction::DailyLogin => self.config.daily_login_points,
            PointsAction::Custom => metadata
                .and_then(|m| m.get("points"))
                .and_then(serde_json::Value::as_u64)
                .map_or(0, |p| p.min(self.config.custom_award_cap)),
        }
    }

    fn notify_level_up(&self, record: &UserProgression, old_level: u32) {
        let event = LevelUp {
            user_id: record.user_id.clone(),
            old_level,
            new_level: record.level,
            total_points: record.points,
        };
        if let Err(e) = self.sink.level_up(&event) {
            warn!(user_id = %record.user_id, error = %e, "Failed to deliver level-up notification");
        }
    }
}

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::streak::StreakTracker;
    use crate::test_sink::{FailingSink, RecordingSink};
    use cadence_core::events::NoopSink;
    use cadence_store::schema::run_migrations;
    use chrono::{TimeZone, Utc};

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn noop_engine() -> ProgressionEngine {
        ProgressionEngine::new(PointsConfig::default(), Arc::new(NoopSink))
    }

    // Sheds the next `count` progression updates: the conditional write
    // matches zero rows, which is exactly a lost optimistic race.
    fn shed_writes(conn: &Connection, count: u32) {
        conn.execute_batch(&format!(
            "CREATE TABLE write_faults (remaining INTEGER NOT NULL);
             INSERT INTO write_faults VALUES ({count});
             CREATE TRIGGER shed_progression_writes
             BEFORE UPDATE ON user_progression
             WHEN (SELECT remaining FROM write_faults) > 0
             BEGIN
                 UPDATE write_faults SET remaining = remaining - 1;
                 SELECT RAISE(IGNORE);
             END",
        ))
        .unwrap();
    }

    fn remaining_faults(conn: &Connection) -> i64 {
        conn.query_row("SELECT remaining FROM write_faults", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(level_for_points(0), 1);
        assert_eq!(level_for_points(99), 1);
        assert_eq!(level_for_points(100), 2);
        assert_eq!(level_for_points(350), 2);
        assert_eq!(level_for_points(399), 2);
        assert_eq!(level_for_points(400), 3);
        assert_eq!(level_for_points(899), 3);
        assert_eq!(level_for_points(900), 4);
    }

    #[test]
    fn test_task_completed_base_award() {
        let conn = setup_db();
        let engine = noop_engine();
        let outcome = engine
            .award_points(&conn, "user-1", PointsAction::TaskCompleted, None)
            .unwrap();
        assert_eq!(outcome.points_added, 10);
        assert_eq!(outcome.total_points, 10);
        assert_eq!(outcome.level, 1);
        assert!(!outcome.level_up);
    }

    #[test]
    fn test_task_completed_includes_streak_bonus() {
        let conn = setup_db();
        let engine = noop_engine();
        // Build a 3-day streak, then award
        for day in 1..=3 {
            StreakTracker::on_task_completed(
                &conn,
                "user-1",
                Utc.with_ymd_and_hms(2025, 6, day, 10, 0, 0).unwrap(),
            )
            .unwrap();
        }
        let outcome = engine
            .award_points(&conn, "user-1", PointsAction::TaskCompleted, None)
            .unwrap();
        // 10 base + min(3 * 5, 50) bonus
        assert_eq!(outcome.points_added, 25);
    }

    #[test]
    fn test_fixed_action_awards() {
        let conn = setup_db();
        let engine = noop_engine();
        let focus = engine
            .award_points(&conn, "user-1", PointsAction::FocusSessionCompleted, None)
            .unwrap();
        assert_eq!(focus.points_added, 50);
        let login = engine
            .award_points(&conn, "user-1", PointsAction::DailyLogin, None)
            .unwrap();
        assert_eq!(login.points_added, 5);
        assert_eq!(login.total_points, 55);
    }

    #[test]
    fn test_custom_award_reads_and_caps_metadata() {
        let conn = setup_db();
        let engine = noop_engine();

        let modest = serde_json::json!({ "points": 30 });
        let outcome = engine
            .award_points(&conn, "user-1", PointsAction::Custom, Some(&modest))
            .unwrap();
        assert_eq!(outcome.points_added, 30);

        let greedy = serde_json::json!({ "points": 5000 });
        let outcome = engine
            .award_points(&conn, "user-1", PointsAction::Custom, Some(&greedy))
            .unwrap();
        assert_eq!(outcome.points_added, 50);

        let negative = serde_json::json!({ "points": -20 });
        let outcome = engine
            .award_points(&conn, "user-1", PointsAction::Custom, Some(&negative))
            .unwrap();
        assert_eq!(outcome.points_added, 0);

        let outcome = engine
            .award_points(&conn, "user-1", PointsAction::Custom, None)
            .unwrap();
        assert_eq!(outcome.points_added, 0);
    }

    #[test]
    fn test_level_up_fires_notification() {
        let conn = setup_db();
        let sink = Arc::new(RecordingSink::default());
        let engine = ProgressionEngine::new(PointsConfig::default(), sink.clone());

        // Seed to just below the level-3 threshold
        let mut record = ProgressionRepository::get_or_create(&conn, "user-1").unwrap();
        record.points = 390;
        record.level = level_for_points(390);
        ProgressionRepository::update(&conn, &record).unwrap();

        let outcome = engine
            .award_points(&conn, "user-1", PointsAction::TaskCompleted, None)
            .unwrap();
        assert_eq!(outcome.total_points, 400);
        assert_eq!(outcome.level, 3);
        assert!(outcome.level_up);

        let events = sink.level_ups.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].old_level, 2);
        assert_eq!(events[0].new_level, 3);
        assert_eq!(events[0].total_points, 400);
    }

    #[test]
    fn test_sink_failure_does_not_fail_award() {
        let conn = setup_db();
        let engine = ProgressionEngine::new(PointsConfig::default(), Arc::new(FailingSink));

        let mut record = ProgressionRepository::get_or_create(&conn, "user-1").unwrap();
        record.points = 95;
        ProgressionRepository::update(&conn, &record).unwrap();

        let outcome = engine
            .award_points(&conn, "user-1", PointsAction::TaskCompleted, None)
            .unwrap();
        assert!(outcome.level_up);
        assert_eq!(outcome.level, 2);
    }

    #[test]
    fn test_award_retries_through_lost_write() {
        let conn = setup_db();
        let engine = noop_engine();
        ProgressionRepository::get_or_create(&conn, "user-1").unwrap();
        shed_writes(&conn, 1);

        let outcome = engine
            .award_points(&conn, "user-1", PointsAction::DailyLogin, None)
            .unwrap();
        // Awarded exactly once despite the retry
        assert_eq!(outcome.total_points, 5);
        assert_eq!(remaining_faults(&conn), 0);

        let stored = ProgressionRepository::get(&conn, "user-1").unwrap().unwrap();
        assert_eq!(stored.points, 5);
    }

    #[test]
    fn test_award_conflict_surfaces_when_retries_exhausted() {
        let conn = setup_db();
        let config = PointsConfig {
            conflict_retries: 1,
            ..Default::default()
        };
        let engine = ProgressionEngine::new(config, Arc::new(NoopSink));
        ProgressionRepository::get_or_create(&conn, "user-1").unwrap();
        shed_writes(&conn, 10);

        let err = engine
            .award_points(&conn, "user-1", PointsAction::TaskCompleted, None)
            .unwrap_err();
        assert!(err.is_conflict());
        // One initial attempt plus one retry consumed exactly two writes
        assert_eq!(remaining_faults(&conn), 8);

        let stored = ProgressionRepository::get(&conn, "user-1").unwrap().unwrap();
        assert_eq!(stored.points, 0);
    }

    #[test]
    fn test_level_never_decreases() {
        let conn = setup_db();
        let engine = noop_engine();
        let mut last_level = 0;
        for _ in 0..20 {
            let outcome = engine
                .award_points(&conn, "user-1", PointsAction::FocusSessionCompleted, None)
                .unwrap();
            assert!(outcome.level >= last_level);
            last_level = outcome.level;
        }
        assert_eq!(last_level, 4);
    }

    #[test]
    fn test_get_progression_bootstraps_new_user() {
        let conn = setup_db();
        let engine = noop_engine();
        let progression = engine.get_progression(&conn, "user-new").unwrap();
        assert_eq!(progression.level, 1);
        assert_eq!(progression.points, 0);
        assert_eq!(progression.progress.current_level_start_xp, 0);
        assert_eq!(progression.progress.next_level_xp, 100);
        assert!((progression.progress.percentage - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_get_progression_mid_level() {
        let conn = setup_db();
        let engine = noop_engine();

        let mut record = ProgressionRepository::get_or_create(&conn, "user-1").unwrap();
        record.points = 350;
        record.level = level_for_points(350);
        record.streak = 4;
        record.longest_streak = 9;
        ProgressionRepository::update(&conn, &record).unwrap();

        let progression = engine.get_progression(&conn, "user-1").unwrap();
        assert_eq!(progression.level, 2);
        assert_eq!(progression.progress.current_level_start_xp, 100);
        assert_eq!(progression.progress.next_level_xp, 400);
        // (350 - 100) / (400 - 100) = 83.33%
        assert!((progression.progress.percentage - 83.333_333_333_333_33).abs() < 1e-9);
        assert_eq!(progression.streak, 4);
        assert_eq!(progression.longest_streak, 9);
    }

    #[test]
    fn test_points_action_wire_names() {
        assert_eq!(PointsAction::TaskCompleted.to_string(), "task_completed");
        assert_eq!(
            "focus_session_completed".parse::<PointsAction>().unwrap(),
            PointsAction::FocusSessionCompleted
        );
        assert!("mystery_bonus".parse::<PointsAction>().is_err());
        let json = serde_json::to_string(&PointsAction::DailyLogin).unwrap();
        assert_eq!(json, "\"daily_login\"");
    }

    #[test]
    fn test_award_outcome_serde_camel_case() {
        let outcome = AwardOutcome {
            points_added: 25,
            total_points: 425,
            level: 3,
            level_up: true,
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"pointsAdded\":25"));
        assert!(json.contains("\"levelUp\":true"));
    }
}
