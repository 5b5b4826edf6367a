//! Task-completion fan-out.
//!
//! The host's CRUD layer fires a [`TaskCompleted`] event exactly once per
//! incomplete → complete transition. This handler applies the streak
//! transition first, then the points award, so the award's streak bonus
//! reflects the completion that triggered it. Notification delivery comes
//! last and is best-effort.

use std::sync::Arc;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::warn;

use cadence_core::errors::CadenceError;
use cadence_core::events::{NotificationSink, TaskCompleted};

use crate::engine::{AwardOutcome, PointsAction, ProgressionEngine};
use crate::streak::{StreakOutcome, StreakTracker};

/// Combined result of processing one completion event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOutcome {
    /// Streak state after the completion.
    pub streak: StreakOutcome,
    /// Points award for the completion.
    pub award: AwardOutcome,
}

/// Routes completion events through streak, points, and notification.
pub struct CompletionHandler {
    engine: ProgressionEngine,
    sink: Arc<dyn NotificationSink>,
}

impl CompletionHandler {
    /// Create a handler around an engine and a notification sink.
    #[must_use]
    pub fn new(engine: ProgressionEngine, sink: Arc<dyn NotificationSink>) -> Self {
        Self { engine, sink }
    }

    /// Process one task-completion event.
    ///
    /// Streak and points failures propagate; notification failures are
    /// logged and swallowed.
    pub fn on_task_completed(
        &self,
        conn: &Connection,
        event: &TaskCompleted,
    ) -> Result<CompletionOutcome, CadenceError> {
        let streak = StreakTracker::on_task_completed_with_retries(
            conn,
            &event.user_id,
            event.completed_at,
            self.engine.config().conflict_retries,
        )?;
        let award =
            self.engine
                .award_points(conn, &event.user_id, PointsAction::TaskCompleted, None)?;

        if let Err(e) = self.sink.task_completed(event) {
            warn!(
                task_id = %event.task_id,
                user_id = %event.user_id,
                error = %e,
                "Failed to deliver completion notification"
            );
        }

        Ok(CompletionOutcome { streak, award })
    }
}
