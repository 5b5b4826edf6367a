//! Engine configuration.
//!
//! [`PointsConfig`] is an immutable value constructed once and passed into
//! the progression engine — the award table is not module-level state.

use serde::{Deserialize, Serialize};

/// Default points for completing a task.
pub const DEFAULT_TASK_COMPLETED_POINTS: u64 = 10;
/// Default points for completing a focus session.
pub const DEFAULT_FOCUS_SESSION_POINTS: u64 = 50;
/// Default points for a daily login.
pub const DEFAULT_DAILY_LOGIN_POINTS: u64 = 5;
/// Default per-streak-day bonus for task completion.
pub const DEFAULT_STREAK_BONUS_PER_DAY: u64 = 5;
/// Default cap on the streak bonus.
pub const DEFAULT_STREAK_BONUS_CAP: u64 = 50;
/// Default cap on caller-supplied custom awards.
pub const DEFAULT_CUSTOM_AWARD_CAP: u64 = 50;
/// Default number of internal retries after a lost optimistic write.
pub const DEFAULT_CONFLICT_RETRIES: u32 = 3;

/// Configuration for point awards and conflict handling.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsConfig {
    /// Points for `task_completed` (default: 10).
    #[serde(default = "default_task_completed_points")]
    pub task_completed_points: u64,
    /// Points for `focus_session_completed` (default: 50).
    #[serde(default = "default_focus_session_points")]
    pub focus_session_points: u64,
    /// Points for `daily_login` (default: 5).
    #[serde(default = "default_daily_login_points")]
    pub daily_login_points: u64,
    /// Bonus per streak day when streak > 1 (default: 5).
    #[serde(default = "default_streak_bonus_per_day")]
    pub streak_bonus_per_day: u64,
    /// Maximum streak bonus (default: 50).
    #[serde(default = "default_streak_bonus_cap")]
    pub streak_bonus_cap: u64,
    /// Maximum caller-supplied custom award (default: 50).
    #[serde(default = "default_custom_award_cap")]
    pub custom_award_cap: u64,
    /// Internal retries before a `Conflict` surfaces (default: 3).
    #[serde(default = "default_conflict_retries")]
    pub conflict_retries: u32,
}

fn default_task_completed_points() -> u64 {
    DEFAULT_TASK_COMPLETED_POINTS
}
fn default_focus_session_points() -> u64 {
    DEFAULT_FOCUS_SESSION_POINTS
}
fn default_daily_login_points() -> u64 {
    DEFAULT_DAILY_LOGIN_POINTS
}
fn default_streak_bonus_per_day() -> u64 {
    DEFAULT_STREAK_BONUS_PER_DAY
}
fn default_streak_bonus_cap() -> u64 {
    DEFAULT_STREAK_BONUS_CAP
}
fn default_custom_award_cap() -> u64 {
    DEFAULT_CUSTOM_AWARD_CAP
}
fn default_conflict_retries() -> u32 {
    DEFAULT_CONFLICT_RETRIES
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            task_completed_points: DEFAULT_TASK_COMPLETED_POINTS,
            focus_session_points: DEFAULT_FOCUS_SESSION_POINTS,
            daily_login_points: DEFAULT_DAILY_LOGIN_POINTS,
            streak_bonus_per_day: DEFAULT_STREAK_BONUS_PER_DAY,
            streak_bonus_cap: DEFAULT_STREAK_BONUS_CAP,
            custom_award_cap: DEFAULT_CUSTOM_AWARD_CAP,
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
        }
    }
}

impl PointsConfig {
    /// Streak bonus for a completion at the given streak length.
    ///
    /// `min(streak * bonus_per_day, cap)` when streak > 1, else 0.
    #[must_use]
    pub fn streak_bonus(&self, streak: u32) -> u64 {
        if streak > 1 {
            (u64::from(streak) * self.streak_bonus_per_day).min(self.streak_bonus_cap)
        } else {
            0
        }
    }
}
