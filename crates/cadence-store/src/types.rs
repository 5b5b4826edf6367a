//! Row types for the engine tables.
//!
//! Tagged structs with the exact persisted fields — patterns and
//! progression records are never handled as schemaless maps.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cadence_core::errors::CadenceError;

// ─────────────────────────────────────────────────────────────────────────────
// Frequency
// ─────────────────────────────────────────────────────────────────────────────

/// How often a recurrence pattern regenerates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// Every `interval` days.
    Daily,
    /// Every `interval` weeks.
    Weekly,
    /// Every `interval` calendar months.
    Monthly,
}

impl Frequency {
    /// SQL column value.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Parse a SQL column value.
    #[must_use]
    pub fn from_sql(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Frequency {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_sql(s).ok_or_else(|| {
            CadenceError::Validation(format!(
                "unsupported frequency '{s}' (expected daily, weekly, or monthly)"
            ))
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Task occurrence
// ─────────────────────────────────────────────────────────────────────────────

/// A task occurrence (the subset of the host task entity the engine uses).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Task ID.
    pub id: String,
    /// Owner of the task.
    pub owner_id: String,
    /// Task title.
    pub title: String,
    /// Task description.
    pub description: Option<String>,
    /// Tag list.
    pub tags: Vec<String>,
    /// Subtask titles copied into each generated occurrence.
    pub subtask_template: Vec<String>,
    /// Due date, if any.
    pub due_date: Option<DateTime<Utc>>,
    /// Whether the task is complete.
    pub completed: bool,
    /// When the task was completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// Generating pattern ID, for engine-created occurrences.
    pub recurrence_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating a task.
#[derive(Clone, Debug, Default)]
pub struct TaskCreateParams {
    /// Owner of the task.
    pub owner_id: String,
    /// Task title.
    pub title: String,
    /// Task description.
    pub description: Option<String>,
    /// Tag list.
    pub tags: Vec<String>,
    /// Subtask titles to seed generated occurrences with.
    pub subtask_template: Vec<String>,
    /// Due date.
    pub due_date: Option<DateTime<Utc>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Recurrence pattern
// ─────────────────────────────────────────────────────────────────────────────

/// A stored recurrence rule.
///
/// `last_generated` only ever moves forward, and `is_active = false` is
/// terminal — there is no reactivation path. Patterns are deactivated,
/// never deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrencePattern {
    /// Pattern ID.
    pub id: String,
    /// Task the pattern was created from.
    pub origin_task_id: String,
    /// Owner of the pattern.
    pub owner_id: String,
    /// Regeneration frequency.
    pub frequency: Frequency,
    /// Period multiplier (>= 1).
    pub interval: u32,
    /// No occurrences are generated past this date.
    pub end_date: Option<DateTime<Utc>>,
    /// Due date of the most recently generated occurrence.
    pub last_generated: DateTime<Utc>,
    /// Whether the pattern still generates occurrences.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Parameters for inserting a pattern row.
#[derive(Clone, Debug)]
pub struct PatternCreateParams {
    /// Task the pattern is created from.
    pub origin_task_id: String,
    /// Owner (copied from the origin task).
    pub owner_id: String,
    /// Regeneration frequency.
    pub frequency: Frequency,
    /// Period multiplier (>= 1).
    pub interval: u32,
    /// Optional end date.
    pub end_date: Option<DateTime<Utc>>,
    /// Starting point for generation.
    pub last_generated: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// User progression
// ─────────────────────────────────────────────────────────────────────────────

/// A user's streak / points / level record.
///
/// `level` is always `floor(sqrt(points / 100)) + 1` and
/// `longest_streak >= streak`. Points and `longest_streak` never
/// decrease; `streak` only resets on a missed day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgression {
    /// User ID.
    pub user_id: String,
    /// Lifetime points (monotonic).
    pub points: u64,
    /// Derived level (>= 1).
    pub level: u32,
    /// Current consecutive-day completion streak.
    pub streak: u32,
    /// Longest streak ever reached.
    pub longest_streak: u32,
    /// Most recent completion timestamp.
    pub last_completion_date: Option<DateTime<Utc>>,
    /// Optimistic-concurrency version, bumped on every write.
    #[serde(skip)]
    pub version: u64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
