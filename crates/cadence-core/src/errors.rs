//! Error types for the Cadence engine.
//!
//! All errors are structured with typed variants for each failure mode.
//! Propagation policy:
//!
//! - `Validation` and `NotFound` surface immediately to the caller.
//! - `Conflict` (a lost optimistic write) is retried internally a bounded
//!   number of times before surfacing.
//! - `External` failures from best-effort collaborators (notification sinks)
//!   are logged and swallowed at the call site — they never abort an award
//!   or a tick.

use thiserror::Error;

/// Errors from recurrence and progression operations.
#[derive(Debug, Error)]
pub enum CadenceError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Entity not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity type (e.g., "Task", "Pattern", "User").
        entity: &'static str,
        /// The ID that was looked up.
        id: String,
    },

    /// Validation failure.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Optimistic write lost the race against a concurrent writer.
    #[error("Concurrent update conflict on {entity}: {id}")]
    Conflict {
        /// Entity type whose conditional write matched zero rows.
        entity: &'static str,
        /// The ID that was being updated.
        id: String,
    },

    /// Best-effort external collaborator failed (notification delivery).
    #[error("External service error: {0}")]
    External(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CadenceError {
    /// Create a not-found error for a task occurrence.
    pub fn task_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Task",
            id: id.into(),
        }
    }

    /// Create a not-found error for a recurrence pattern.
    pub fn pattern_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Pattern",
            id: id.into(),
        }
    }

    /// Create a not-found error for a user progression record.
    pub fn user_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "User",
            id: id.into(),
        }
    }

    /// Create a conflict error for a recurrence pattern advance.
    pub fn pattern_conflict(id: impl Into<String>) -> Self {
        Self::Conflict {
            entity: "Pattern",
            id: id.into(),
        }
    }

    /// Create a conflict error for a user progression update.
    pub fn progression_conflict(id: impl Into<String>) -> Self {
        Self::Conflict {
            entity: "User",
            id: id.into(),
        }
    }

    /// Whether this error is a lost optimistic write that the caller
    /// may resolve by re-reading and reapplying.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
