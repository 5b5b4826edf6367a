//! SQL DDL for the recurrence and progression tables.
//!
//! Creates the `tasks`, `recurrence_patterns`, and `user_progression`
//! tables. The host application owns the wider task schema; this is the
//! subset the engine reads and writes.

use rusqlite::Connection;

use cadence_core::errors::CadenceError;

/// Run all engine-related migrations.
///
/// Idempotent — safe to call multiple times (uses `IF NOT EXISTS`).
pub fn run_migrations(conn: &Connection) -> Result<(), CadenceError> {
    conn.execute_batch(ENGINE_SCHEMA)?;
    Ok(())
}

/// Combined DDL for the engine tables.
const ENGINE_SCHEMA: &str = r"
-- Task occurrences (engine-relevant subset)
CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    subtask_template TEXT NOT NULL DEFAULT '[]',
    due_date TEXT,
    completed INTEGER NOT NULL DEFAULT 0,
    completed_at TEXT,
    recurrence_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tasks_owner_completed
    ON tasks(owner_id, completed);
CREATE INDEX IF NOT EXISTS idx_tasks_recurrence
    ON tasks(recurrence_id) WHERE recurrence_id IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_tasks_due_date
    ON tasks(due_date) WHERE due_date IS NOT NULL;

-- Recurrence patterns. origin_task_id is deliberately not a foreign key:
-- the host application owns the task lifecycle, and a pattern whose origin
-- was deleted surfaces as a per-pattern tick error, not a cascade.
CREATE TABLE IF NOT EXISTS recurrence_patterns (
    id TEXT PRIMARY KEY,
    origin_task_id TEXT NOT NULL,
    owner_id TEXT NOT NULL,
    frequency TEXT NOT NULL
        CHECK(frequency IN ('daily', 'weekly', 'monthly')),
    interval INTEGER NOT NULL CHECK(interval >= 1),
    end_date TEXT,
    last_generated TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_patterns_active
    ON recurrence_patterns(is_active) WHERE is_active = 1;
CREATE INDEX IF NOT EXISTS idx_patterns_origin
    ON recurrence_patterns(origin_task_id);

-- User progression (streak / points / level)
CREATE TABLE IF NOT EXISTS user_progression (
    user_id TEXT PRIMARY KEY,
    points INTEGER NOT NULL DEFAULT 0 CHECK(points >= 0),
    level INTEGER NOT NULL DEFAULT 1 CHECK(level >= 1),
    streak INTEGER NOT NULL DEFAULT 0 CHECK(streak >= 0),
    longest_streak INTEGER NOT NULL DEFAULT 0
        CHECK(longest_streak >= streak),
    last_completion_date TEXT,
    version INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";
