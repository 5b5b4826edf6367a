//! Business logic for recurrence patterns.
//!
//! Key rules:
//!
//! - **Catch-up**: a tick generates one occurrence for *every* due date
//!   between `last_generated` and `now`, not just the next one. A tick
//!   after an outage regenerates the whole backlog.
//! - **Terminal deactivation**: once the next due date would pass
//!   `end_date`, the pattern is deactivated permanently and generates
//!   nothing further for that step.
//! - **Claim before create**: each generation step first wins the
//!   conditional advance of `last_generated`; only the winner materializes
//!   the occurrence, which makes retries and concurrent schedulers
//!   idempotent per due date. Advance and insert commit together inside a
//!   savepoint, so a failed insert releases the claim and the next tick
//!   retries the same due date.
//! - **Isolation**: each pattern is an independent unit of work — one
//!   failing pattern is logged and reported, never aborting the tick.

use chrono::{DateTime, Duration, Months, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use cadence_core::errors::CadenceError;
use cadence_store::patterns::PatternRepository;
use cadence_store::tasks::TaskRepository;
use cadence_store::types::{Frequency, PatternCreateParams, RecurrencePattern};

/// Outcome of one tick over all active patterns.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickSummary {
    /// Occurrences materialized.
    pub generated: u32,
    /// Patterns that reached their end date and were deactivated.
    pub deactivated: u32,
    /// IDs of patterns whose processing failed.
    pub errors: Vec<String>,
}

/// Outcome of processing a single pattern.
struct PatternOutcome {
    generated: u32,
    deactivated: bool,
}

/// Compute the due date one period after `after`.
///
/// Daily and weekly periods are fixed-length; monthly uses calendar
/// months (Jan 31 + 1 month = Feb 28/29).
fn next_due(
    after: DateTime<Utc>,
    frequency: Frequency,
    interval: u32,
) -> Result<DateTime<Utc>, CadenceError> {
    let next = match frequency {
        Frequency::Daily => after.checked_add_signed(Duration::days(i64::from(interval))),
        Frequency::Weekly => after.checked_add_signed(Duration::weeks(i64::from(interval))),
        Frequency::Monthly => after.checked_add_months(Months::new(interval)),
    };
    next.ok_or_else(|| {
        CadenceError::Validation(format!(
            "due date overflow for {frequency} pattern with interval {interval}"
        ))
    })
}

/// Recurrence engine with pattern lifecycle and tick processing.
pub struct RecurrenceEngine;

impl RecurrenceEngine {
    // ─────────────────────────────────────────────────────────────────────
    // Pattern lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Create a recurrence pattern from an existing task.
    ///
    /// Fails with `Validation` if `interval < 1` and `NotFound` if the
    /// origin task does not exist. Generation starts from the origin
    /// task's due date, or its creation time if it has none.
    pub fn create_pattern(
        conn: &Connection,
        origin_task_id: &str,
        frequency: Frequency,
        interval: u32,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<RecurrencePattern, CadenceError> {
        if interval < 1 {
            return Err(CadenceError::Validation(
                "interval must be at least 1".to_string(),
            ));
        }

        let origin = TaskRepository::get(conn, origin_task_id)?
            .ok_or_else(|| CadenceError::task_not_found(origin_task_id))?;

        PatternRepository::create(
            conn,
            &PatternCreateParams {
                origin_task_id: origin.id.clone(),
                owner_id: origin.owner_id.clone(),
                frequency,
                interval,
                end_date,
                last_generated: origin.due_date.unwrap_or(origin.created_at),
            },
        )
    }

    /// Stop a pattern.
    ///
    /// Idempotent — stopping an already-inactive pattern succeeds. Fails
    /// with `NotFound` if the pattern does not exist.
    pub fn stop_pattern(
        conn: &Connection,
        pattern_id: &str,
    ) -> Result<RecurrencePattern, CadenceError> {
        PatternRepository::deactivate(conn, pattern_id)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tick
    // ─────────────────────────────────────────────────────────────────────

    /// Process every active pattern up to `now`.
    ///
    /// Per-pattern failures are logged, recorded in the summary's
    /// `errors`, and never abort the remaining patterns. When `cancel`
    /// is provided it is checked between patterns, so shutdown waits for
    /// at most one pattern's worth of work.
    pub fn tick(
        conn: &Connection,
        now: DateTime<Utc>,
        cancel: Option<&CancellationToken>,
    ) -> Result<TickSummary, CadenceError> {
        let patterns = PatternRepository::list_active(conn)?;
        let mut summary = TickSummary::default();

        for (index, pattern) in patterns.iter().enumerate() {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                debug!(
                    processed = index,
                    total = patterns.len(),
                    "Tick cancelled between patterns"
                );
                break;
            }

            match Self::process_pattern(conn, pattern, now) {
                Ok(outcome) => {
                    summary.generated += outcome.generated;
                    if outcome.deactivated {
                        summary.deactivated += 1;
                    }
                }
                Err(e) => {
                    warn!(pattern_id = %pattern.id, error = %e, "Pattern processing failed");
                    summary.errors.push(pattern.id.clone());
                }
            }
        }

        Ok(summary)
    }

    /// Generate all missed occurrences for one pattern.
    fn process_pattern(
        conn: &Connection,
        pattern: &RecurrencePattern,
        now: DateTime<Utc>,
    ) -> Result<PatternOutcome, CadenceError> {
        let origin = TaskRepository::get(conn, &pattern.origin_task_id)?
            .ok_or_else(|| CadenceError::task_not_found(&pattern.origin_task_id))?;

        let mut last = pattern.last_generated;
        let mut generated = 0u32;

        loop {
            let due = next_due(last, pattern.frequency, pattern.interval)?;
            if due > now {
                break;
            }

            if pattern.end_date.is_some_and(|end| due > end) {
                // Terminal transition: no occurrence for this step.
                let _ = PatternRepository::deactivate(conn, &pattern.id)?;
                debug!(pattern_id = %pattern.id, "Pattern reached end date, deactivated");
                return Ok(PatternOutcome {
                    generated,
                    deactivated: true,
                });
            }

            // Winning the conditional advance claims this due date; only
            // the winner materializes the occurrence. Both writes sit in
            // one savepoint: a failed insert rolls the claim back, so the
            // due date stays generatable on the next tick.
            conn.execute_batch("SAVEPOINT generation_step")?;
            let step = PatternRepository::advance(conn, &pattern.id, last, due).and_then(|()| {
                TaskRepository::create_occurrence(conn, &origin, &pattern.id, due).map(|_| ())
            });
            match step {
                Ok(()) => {
                    conn.execute_batch("RELEASE generation_step")?;
                }
                Err(e) if e.is_conflict() => {
                    conn.execute_batch(
                        "ROLLBACK TO generation_step; RELEASE generation_step",
                    )?;
                    debug!(pattern_id = %pattern.id, "Lost advance race, yielding pattern");
                    break;
                }
                Err(e) => {
                    conn.execute_batch(
                        "ROLLBACK TO generation_step; RELEASE generation_step",
                    )?;
                    return Err(e);
                }
            }
            generated += 1;
            last = due;
        }

        Ok(PatternOutcome {
            generated,
            deactivated: false,
        })
    }
}
