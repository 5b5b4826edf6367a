//! SQL data access for recurrence patterns.
//!
//! [`PatternRepository::advance`] is the concurrency linchpin: moving
//! `last_generated` forward is a compare-and-swap on the previously read
//! value, so two schedulers racing over the same pattern cannot both claim
//! the same due date.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use cadence_core::errors::CadenceError;
use cadence_core::ids::{format_iso, generate_id};

use crate::tasks::{parse_opt_ts, parse_ts};
use crate::types::{Frequency, PatternCreateParams, RecurrencePattern};

const PATTERN_COLUMNS: &str = "id, origin_task_id, owner_id, frequency, interval, end_date, \
     last_generated, is_active, created_at, updated_at";

fn pattern_from_row(row: &Row<'_>) -> rusqlite::Result<RecurrencePattern> {
    let frequency: String = row.get(3)?;
    let end_date: Option<String> = row.get(5)?;
    let last_generated: String = row.get(6)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;

    Ok(RecurrencePattern {
        id: row.get(0)?,
        origin_task_id: row.get(1)?,
        owner_id: row.get(2)?,
        frequency: Frequency::from_sql(&frequency).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("invalid frequency: {frequency}").into(),
            )
        })?,
        interval: row.get::<_, i64>(4)?.try_into().map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Integer,
                "negative interval".into(),
            )
        })?,
        end_date: parse_opt_ts(5, end_date)?,
        last_generated: parse_ts(6, &last_generated)?,
        is_active: row.get::<_, i64>(7)? != 0,
        created_at: parse_ts(8, &created_at)?,
        updated_at: parse_ts(9, &updated_at)?,
    })
}

/// Recurrence pattern repository.
pub struct PatternRepository;

impl PatternRepository {
    /// Insert a new pattern row.
    pub fn create(
        conn: &Connection,
        params: &PatternCreateParams,
    ) -> Result<RecurrencePattern, CadenceError> {
        let id = generate_id("pattern");
        let now = format_iso(Utc::now());

        let _ = conn.execute(
            "INSERT INTO recurrence_patterns
             (id, origin_task_id, owner_id, frequency, interval, end_date,
              last_generated, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?8)",
            params![
                id,
                params.origin_task_id,
                params.owner_id,
                params.frequency.as_sql(),
                i64::from(params.interval),
                params.end_date.map(format_iso),
                format_iso(params.last_generated),
                now,
            ],
        )?;

        Self::get(conn, &id)?.ok_or_else(|| CadenceError::pattern_not_found(&id))
    }

    /// Get a pattern by ID.
    pub fn get(conn: &Connection, id: &str) -> Result<Option<RecurrencePattern>, CadenceError> {
        let pattern = conn
            .query_row(
                &format!("SELECT {PATTERN_COLUMNS} FROM recurrence_patterns WHERE id = ?1"),
                params![id],
                pattern_from_row,
            )
            .optional()?;
        Ok(pattern)
    }

    /// List all active patterns, oldest first.
    pub fn list_active(conn: &Connection) -> Result<Vec<RecurrencePattern>, CadenceError> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {PATTERN_COLUMNS} FROM recurrence_patterns WHERE is_active = 1 ORDER BY id"
        ))?;
        let patterns = stmt
            .query_map([], pattern_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(patterns)
    }

    /// Conditionally advance `last_generated` from `from` to `to`.
    ///
    /// The write only applies if the stored value still equals `from` and
    /// the pattern is still active. A zero-row update means either the
    /// pattern is gone (`NotFound`) or another worker advanced or
    /// deactivated it first (`Conflict`) — the caller must re-read before
    /// generating anything for this due date.
    pub fn advance(
        conn: &Connection,
        id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<(), CadenceError> {
        let changed = conn.execute(
            "UPDATE recurrence_patterns
             SET last_generated = ?1, updated_at = ?2
             WHERE id = ?3 AND last_generated = ?4 AND is_active = 1",
            params![format_iso(to), format_iso(Utc::now()), id, format_iso(from)],
        )?;
        if changed == 0 {
            if Self::get(conn, id)?.is_none() {
                return Err(CadenceError::pattern_not_found(id));
            }
            return Err(CadenceError::pattern_conflict(id));
        }
        Ok(())
    }

    /// Deactivate a pattern (terminal — no reactivation path).
    ///
    /// Idempotent: deactivating an already-inactive pattern succeeds.
    /// Returns the pattern, or `NotFound` if it does not exist.
    pub fn deactivate(
        conn: &Connection,
        id: &str,
    ) -> Result<RecurrencePattern, CadenceError> {
        let changed = conn.execute(
            "UPDATE recurrence_patterns SET is_active = 0, updated_at = ?1 WHERE id = ?2",
            params![format_iso(Utc::now()), id],
        )?;
        if changed == 0 {
            return Err(CadenceError::pattern_not_found(id));
        }
        Self::get(conn, id)?.ok_or_else(|| CadenceError::pattern_not_found(id))
    }
}
