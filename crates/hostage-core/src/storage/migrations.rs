//! Database schema migrations for hostage.
//!
//! Migrations are versioned and applied automatically when opening the store.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (fresh database).
fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: pets, tasks, and daily habits.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS pets (
            id              TEXT PRIMARY KEY,
            owner_id        TEXT NOT NULL,
            name            TEXT NOT NULL,
            health          REAL NOT NULL,
            max_health      REAL NOT NULL,
            infection_level INTEGER NOT NULL DEFAULT 0,
            status          TEXT NOT NULL DEFAULT 'ALIVE',
            last_checked_at TEXT,
            born_at         TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id           TEXT PRIMARY KEY,
            owner_id     TEXT NOT NULL,
            title        TEXT NOT NULL,
            description  TEXT,
            completed    INTEGER NOT NULL DEFAULT 0,
            priority     TEXT NOT NULL DEFAULT 'medium',
            due_at       TEXT,
            created_at   TEXT NOT NULL,
            updated_at   TEXT NOT NULL,
            completed_at TEXT,
            source       TEXT NOT NULL DEFAULT 'native'
        );

        CREATE TABLE IF NOT EXISTS daily_habits (
            id                TEXT PRIMARY KEY,
            owner_id          TEXT NOT NULL,
            title             TEXT NOT NULL,
            streak            INTEGER NOT NULL DEFAULT 0,
            last_completed_at TEXT,
            created_at        TEXT NOT NULL
        );",
    )?;

    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [1])?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: optimistic concurrency columns and lookup indexes.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "ALTER TABLE pets ADD COLUMN version INTEGER NOT NULL DEFAULT 0;
         ALTER TABLE daily_habits ADD COLUMN version INTEGER NOT NULL DEFAULT 0;

         CREATE INDEX IF NOT EXISTS idx_pets_owner_status ON pets(owner_id, status);
         CREATE INDEX IF NOT EXISTS idx_tasks_owner_completed_due ON tasks(owner_id, completed, due_at);
         CREATE INDEX IF NOT EXISTS idx_daily_habits_owner ON daily_habits(owner_id, created_at);",
    )?;

    tx.commit()?;
    set_schema_version(conn, 2)?;
    Ok(())
}
