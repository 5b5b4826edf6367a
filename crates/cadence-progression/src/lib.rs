//! # cadence-progression
//!
//! Productivity progression for the Cadence engine:
//!
//! - [`streak::StreakTracker`]: consecutive-day completion streaks
//! - [`engine::ProgressionEngine`]: point awards and level progression
//! - [`score::compute_score`]: the pure [0, 100] productivity score
//! - [`handler::CompletionHandler`]: fans a task-completion event out to
//!   streak, points, and notification
//!
//! All user-record mutations go through optimistic read-modify-write with
//! bounded retry, so concurrent completions from different sessions never
//! lose an update.

#![deny(unsafe_code)]

pub mod engine;
pub mod handler;
pub mod score;
pub mod streak;

#[cfg(test)]
pub(crate) mod test_sink;
