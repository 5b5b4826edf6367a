//! Consecutive-day completion streaks.
//!
//! Streaks are measured in UTC calendar days, not 24-hour windows: a
//! completion at 23:59 followed by one at 00:01 the next day counts as
//! consecutive. Only the incomplete → complete transition reaches this
//! module, so un-completing and re-completing a task the same day cannot
//! inflate the streak.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::debug;

use cadence_core::config::DEFAULT_CONFLICT_RETRIES;
use cadence_core::errors::CadenceError;
use cadence_store::progression::ProgressionRepository;

/// Streak state after a completion was applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakOutcome {
    /// Current consecutive-day streak.
    pub streak: u32,
    /// Longest streak ever reached.
    pub longest_streak: u32,
}

/// Applies completion events to a user's streak record.
pub struct StreakTracker;

impl StreakTracker {
    /// Apply a task completion to the user's streak.
    ///
    /// Transitions, keyed on the gap in UTC days between the stored
    /// last-completion day and the completion day:
    ///
    /// - no prior completion: streak becomes 1
    /// - same day: streak unchanged
    /// - exactly one day later: streak + 1
    /// - more than one day later: streak resets to 1
    /// - earlier day (out-of-order delivery): streak unchanged
    ///
    /// `longest_streak` tracks the maximum and never decreases.
    pub fn on_task_completed(
        conn: &Connection,
        user_id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<StreakOutcome, CadenceError> {
        Self::on_task_completed_with_retries(conn, user_id, completed_at, DEFAULT_CONFLICT_RETRIES)
    }

    /// [`Self::on_task_completed`] with an explicit retry budget for lost
    /// optimistic writes.
    pub fn on_task_completed_with_retries(
        conn: &Connection,
        user_id: &str,
        completed_at: DateTime<Utc>,
        retries: u32,
    ) -> Result<StreakOutcome, CadenceError> {
        let day = completed_at.date_naive();
        let mut attempt = 0;
        loop {
            let mut record = ProgressionRepository::get_or_create(conn, user_id)?;

            match record.last_completion_date.map(|last| last.date_naive()) {
                None => {
                    record.streak = 1;
                    record.last_completion_date = Some(completed_at);
                }
                Some(last_day) => {
                    let gap = (day - last_day).num_days();
                    if gap < 0 {
                        // Late-arriving completion from an earlier day;
                        // the stored state already reflects something newer.
                        return Ok(StreakOutcome {
                            streak: record.streak,
                            longest_streak: record.longest_streak,
                        });
                    }
                    match gap {
                        0 => {}
                        1 => record.streak += 1,
                        _ => record.streak = 1,
                    }
                    record.last_completion_date = Some(completed_at);
                }
            }
            record.longest_streak = record.longest_streak.max(record.streak);

            match ProgressionRepository::update(conn, &record) {
                Ok(()) => {
                    return Ok(StreakOutcome {
                        streak: record.streak,
                        longest_streak: record.longest_streak,
                    });
                }
                Err(e) if e.is_conflict() && attempt < retries => {
                    attempt += 1;
                    debug!(user_id, attempt, "Streak update lost the write race, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }
}
