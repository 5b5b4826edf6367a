//! Domain events and the notification sink boundary.
//!
//! The task-completion path in the CRUD layer constructs a [`TaskCompleted`]
//! event and hands it to the progression side, which keeps the completion,
//! streak, and points modules free of compile-time cycles.
//!
//! [`NotificationSink`] is the outbound boundary for level-up and
//! completion signals. Delivery is best-effort: callers log sink failures
//! and never propagate them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CadenceError;

/// Event emitted when a task transitions from incomplete to complete.
///
/// Fired only on the incomplete → complete transition — never when a task
/// is toggled back or re-saved while already complete.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCompleted {
    /// Task occurrence ID.
    pub task_id: String,
    /// Owner of the task.
    pub user_id: String,
    /// When the completion happened.
    pub completed_at: DateTime<Utc>,
}

/// Payload for level-up notifications.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelUp {
    /// User whose level changed.
    pub user_id: String,
    /// Level before the award.
    pub old_level: u32,
    /// Level after the award.
    pub new_level: u32,
    /// Total points after the award.
    pub total_points: u64,
}

/// Outbound boundary for user-facing notifications.
///
/// Implementations deliver over whatever transport the host application
/// uses. All methods are invoked best-effort with the caller swallowing
/// (and logging) errors.
pub trait NotificationSink: Send + Sync {
    /// A user leveled up.
    fn level_up(&self, event: &LevelUp) -> Result<(), CadenceError>;

    /// A task was completed.
    fn task_completed(&self, event: &TaskCompleted) -> Result<(), CadenceError>;
}

/// Sink that drops all notifications.
///
/// For callers that do not wire delivery (tests, batch tooling).
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn level_up(&self, _event: &LevelUp) -> Result<(), CadenceError> {
        Ok(())
    }

    fn task_completed(&self, _event: &TaskCompleted) -> Result<(), CadenceError> {
        Ok(())
    }
}
