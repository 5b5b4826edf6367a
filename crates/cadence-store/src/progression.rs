//! SQL data access for user progression records.
//!
//! Every write is gated on the `version` column read beforehand, so
//! concurrent read-modify-write cycles for the same user cannot silently
//! drop a streak increment or points award — the loser gets `Conflict`
//! and re-reads.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};

use cadence_core::errors::CadenceError;
use cadence_core::ids::format_iso;

use crate::tasks::{parse_opt_ts, parse_ts};
use crate::types::UserProgression;

const PROGRESSION_COLUMNS: &str = "user_id, points, level, streak, longest_streak, \
     last_completion_date, version, created_at, updated_at";

fn progression_from_row(row: &Row<'_>) -> rusqlite::Result<UserProgression> {
    let last_completion_date: Option<String> = row.get(5)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    Ok(UserProgression {
        user_id: row.get(0)?,
        points: row.get::<_, i64>(1)?.unsigned_abs(),
        level: u32::try_from(row.get::<_, i64>(2)?).unwrap_or(1),
        streak: u32::try_from(row.get::<_, i64>(3)?).unwrap_or(0),
        longest_streak: u32::try_from(row.get::<_, i64>(4)?).unwrap_or(0),
        last_completion_date: parse_opt_ts(5, last_completion_date)?,
        version: row.get::<_, i64>(6)?.unsigned_abs(),
        created_at: parse_ts(7, &created_at)?,
        updated_at: parse_ts(8, &updated_at)?,
    })
}

/// User progression repository.
pub struct ProgressionRepository;

impl ProgressionRepository {
    /// Get a progression record by user ID.
    pub fn get(conn: &Connection, user_id: &str) -> Result<Option<UserProgression>, CadenceError> {
        let record = conn
            .query_row(
                &format!("SELECT {PROGRESSION_COLUMNS} FROM user_progression WHERE user_id = ?1"),
                params![user_id],
                progression_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Get a user's progression record, creating the level-1 bootstrap
    /// row on first contact.
    pub fn get_or_create(
        conn: &Connection,
        user_id: &str,
    ) -> Result<UserProgression, CadenceError> {
        let now = format_iso(Utc::now());
        let _ = conn.execute(
            "INSERT OR IGNORE INTO user_progression (user_id, created_at, updated_at)
             VALUES (?1, ?2, ?2)",
            params![user_id, now],
        )?;
        Self::get(conn, user_id)?.ok_or_else(|| CadenceError::user_not_found(user_id))
    }

    /// Write back a modified progression record.
    ///
    /// The update only applies if the stored `version` still equals
    /// `record.version` (the value read before modification); on success
    /// the stored version is bumped. A zero-row update surfaces as
    /// `Conflict` — the caller re-reads and reapplies its change.
    pub fn update(conn: &Connection, record: &UserProgression) -> Result<(), CadenceError> {
        let changed = conn.execute(
            "UPDATE user_progression
             SET points = ?1, level = ?2, streak = ?3, longest_streak = ?4,
                 last_completion_date = ?5, version = version + 1, updated_at = ?6
             WHERE user_id = ?7 AND version = ?8",
            params![
                i64::try_from(record.points).unwrap_or(i64::MAX),
                i64::from(record.level),
                i64::from(record.streak),
                i64::from(record.longest_streak),
                record.last_completion_date.map(format_iso),
                format_iso(Utc::now()),
                record.user_id,
                i64::try_from(record.version).unwrap_or(i64::MAX),
            ],
        )?;
        if changed == 0 {
            if Self::get(conn, &record.user_id)?.is_none() {
                return Err(CadenceError::user_not_found(&record.user_id));
            }
            return Err(CadenceError::progression_conflict(&record.user_id));
        }
        Ok(())
    }
}
