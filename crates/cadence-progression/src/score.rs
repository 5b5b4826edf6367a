//! The productivity score.
//!
//! A pure function over a day's task statistics. No storage access and no
//! clock reads happen here; the host aggregates [`TaskStats`] however it
//! likes and gets back a deterministic [0, 100] score with insights.

use serde::{Deserialize, Serialize};

/// Aggregated task statistics for one user, one day.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    /// Tasks completed today.
    pub completed_today: u32,
    /// Incomplete tasks past their due date.
    pub overdue_tasks: u32,
    /// High-priority tasks in total.
    pub high_priority_total: u32,
    /// High-priority tasks still pending.
    pub high_priority_pending: u32,
    /// Fraction of all tasks completed, in [0, 1].
    pub completion_rate: f64,
}

/// Severity of a score insight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightLevel {
    /// Things are going well.
    Success,
    /// Neutral summary.
    Info,
    /// Something needs attention.
    Warning,
}

/// A human-readable observation attached to a score.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    /// Severity.
    pub level: InsightLevel,
    /// Display message.
    pub message: String,
}

/// A computed productivity score with its insights.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    /// Score in [0, 100].
    pub score: u8,
    /// Overall summary first, then any targeted warnings.
    pub insights: Vec<Insight>,
}

/// Compute the productivity score for one day's statistics.
///
/// Starts from a baseline of 50 and adjusts:
///
/// - +10 per task completed today
/// - -5 per overdue task
/// - +5 when every high-priority task is done (and at least one exists)
/// - -10 when more than 3 high-priority tasks are pending
/// - +5 when the completion rate exceeds 80%
///
/// The result is clamped to [0, 100].
#[must_use]
pub fn compute_score(stats: &TaskStats) -> ScoreReport {
    let mut score: i64 = 50;
    score += i64::from(stats.completed_today) * 10;
    score -= i64::from(stats.overdue_tasks) * 5;
    if stats.high_priority_total > 0 && stats.high_priority_pending == 0 {
        score += 5;
    }
    if stats.high_priority_pending > 3 {
        score -= 10;
    }
    if stats.completion_rate > 0.8 {
        score += 5;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = score.clamp(0, 100) as u8;

    let mut insights = vec![summary_insight(score)];
    if stats.overdue_tasks > 0 {
        insights.push(Insight {
            level: InsightLevel::Warning,
            message: format!(
                "{} overdue task{} need attention",
                stats.overdue_tasks,
                if stats.overdue_tasks == 1 { "" } else { "s" }
            ),
        });
    }
    if stats.high_priority_pending > 2 {
        insights.push(Insight {
            level: InsightLevel::Warning,
            message: format!(
                "{} high-priority tasks are still pending",
                stats.high_priority_pending
            ),
        });
    }

    ScoreReport { score, insights }
}

fn summary_insight(score: u8) -> Insight {
    if score > 80 {
        Insight {
            level: InsightLevel::Success,
            message: "Great momentum, keep it up".to_string(),
        }
    } else if score >= 50 {
        Insight {
            level: InsightLevel::Info,
            message: "Steady progress today".to_string(),
        }
    } else {
        Insight {
            level: InsightLevel::Warning,
            message: "Productivity is slipping, consider a reset".to_string(),
        }
    }
}
