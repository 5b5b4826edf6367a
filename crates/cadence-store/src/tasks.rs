//! SQL data access for task occurrences.
//!
//! The engine's contract with the host task table is narrow: create
//! occurrences, look tasks up by ID, and flip completion. Everything else
//! about tasks lives in the host application.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use cadence_core::errors::CadenceError;
use cadence_core::ids::{format_iso, generate_id, parse_iso};

use crate::types::{Task, TaskCreateParams};

const TASK_COLUMNS: &str = "id, owner_id, title, description, tags, subtask_template, \
     due_date, completed, completed_at, recurrence_id, created_at, updated_at";

/// Parse a required ISO timestamp column.
pub(crate) fn parse_ts(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    parse_iso(value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("invalid timestamp: {value}").into(),
        )
    })
}

/// Parse an optional ISO timestamp column.
pub(crate) fn parse_opt_ts(idx: usize, value: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.as_deref().map(|v| parse_ts(idx, v)).transpose()
}

/// Parse a JSON array column into a `Vec<String>`.
fn parse_string_list(json: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_default()
}

/// Serialize a string list to a JSON array column.
fn string_list_to_json(list: &[String]) -> String {
    serde_json::to_string(list).unwrap_or_else(|_| "[]".to_string())
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let tags: String = row.get(4)?;
    let subtask_template: String = row.get(5)?;
    let due_date: Option<String> = row.get(6)?;
    let completed_at: Option<String> = row.get(8)?;
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;

    Ok(Task {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        tags: parse_string_list(&tags),
        subtask_template: parse_string_list(&subtask_template),
        due_date: parse_opt_ts(6, due_date)?,
        completed: row.get::<_, i64>(7)? != 0,
        completed_at: parse_opt_ts(8, completed_at)?,
        recurrence_id: row.get(9)?,
        created_at: parse_ts(10, &created_at)?,
        updated_at: parse_ts(11, &updated_at)?,
    })
}

/// Task occurrence repository.
pub struct TaskRepository;

impl TaskRepository {
    /// Create a task.
    pub fn create(conn: &Connection, params: &TaskCreateParams) -> Result<Task, CadenceError> {
        let id = generate_id("task");
        let now = format_iso(Utc::now());

        let _ = conn.execute(
            "INSERT INTO tasks (id, owner_id, title, description, tags, subtask_template,
             due_date, completed, completed_at, recurrence_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, NULL, NULL, ?8, ?8)",
            params![
                id,
                params.owner_id,
                params.title,
                params.description,
                string_list_to_json(&params.tags),
                string_list_to_json(&params.subtask_template),
                params.due_date.map(format_iso),
                now,
            ],
        )?;

        Self::get(conn, &id)?.ok_or_else(|| CadenceError::task_not_found(&id))
    }

    /// Materialize a new occurrence from an origin task's template.
    ///
    /// Copies title, description, tags, and the subtask template; the new
    /// occurrence is incomplete, dated `due`, and linked to the pattern
    /// via `recurrence_id`.
    pub fn create_occurrence(
        conn: &Connection,
        origin: &Task,
        pattern_id: &str,
        due: DateTime<Utc>,
    ) -> Result<Task, CadenceError> {
        let id = generate_id("task");
        let now = format_iso(Utc::now());

        let _ = conn.execute(
            "INSERT INTO tasks (id, owner_id, title, description, tags, subtask_template,
             due_date, completed, completed_at, recurrence_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, NULL, ?8, ?9, ?9)",
            params![
                id,
                origin.owner_id,
                origin.title,
                origin.description,
                string_list_to_json(&origin.tags),
                string_list_to_json(&origin.subtask_template),
                format_iso(due),
                pattern_id,
                now,
            ],
        )?;

        Self::get(conn, &id)?.ok_or_else(|| CadenceError::task_not_found(&id))
    }

    /// Get a task by ID.
    pub fn get(conn: &Connection, id: &str) -> Result<Option<Task>, CadenceError> {
        let task = conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    /// Set a task's completion flag. Returns the updated task, or `None`
    /// if not found.
    pub fn set_completed(
        conn: &Connection,
        id: &str,
        completed: bool,
        at: DateTime<Utc>,
    ) -> Result<Option<Task>, CadenceError> {
        let completed_at = if completed { Some(format_iso(at)) } else { None };
        let changed = conn.execute(
            "UPDATE tasks SET completed = ?1, completed_at = ?2, updated_at = ?3 WHERE id = ?4",
            params![i64::from(completed), completed_at, format_iso(Utc::now()), id],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        Self::get(conn, id)
    }

    /// List occurrences generated by a pattern, oldest due date first.
    pub fn list_by_recurrence(
        conn: &Connection,
        pattern_id: &str,
    ) -> Result<Vec<Task>, CadenceError> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE recurrence_id = ?1 ORDER BY due_date ASC"
        ))?;
        let tasks = stmt
            .query_map(params![pattern_id], task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }
}
