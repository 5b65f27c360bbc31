//! SQLite-backed record store.
//!
//! Timestamps are stored as RFC 3339 UTC text with microsecond precision.
//! Rows whose timestamps no longer parse are still returned: optional
//! timestamps read as absent, required ones fall back to the read time.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

use super::migrations;
use super::{data_dir, RecordStore, TaskFilter};
use crate::error::{CoreError, DatabaseError, Result};
use crate::habit::Habit;
use crate::pet::{Pet, PetStatus};
use crate::task::{Priority, Task, TaskSource};
use crate::timestamp::parse_timestamp_lenient;

const PET_COLUMNS: &str = "id, owner_id, name, health, max_health, infection_level, status,
                           last_checked_at, born_at, version";

const TASK_COLUMNS: &str = "id, owner_id, title, description, completed, priority, due_at,
                            created_at, updated_at, completed_at, source";

const HABIT_COLUMNS: &str = "id, owner_id, title, streak, last_completed_at, created_at, version";

fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn format_optional(dt: Option<DateTime<Utc>>) -> Option<String> {
    dt.map(format_timestamp)
}

/// Parse a required timestamp column, falling back to the current time.
fn parse_required(field: &'static str, raw: &str) -> DateTime<Utc> {
    parse_timestamp_lenient(field, Some(raw)).unwrap_or_else(Utc::now)
}

fn parse_pet_status(status_str: &str) -> PetStatus {
    match status_str {
        "ALIVE" => PetStatus::Alive,
        "DEAD" => PetStatus::Dead,
        other => {
            tracing::warn!(status = other, "unknown pet status, reading as DEAD");
            PetStatus::Dead
        }
    }
}

fn row_to_pet(row: &Row) -> rusqlite::Result<Pet> {
    let status_str: String = row.get(6)?;
    let last_checked_str: Option<String> = row.get(7)?;
    let born_at_str: String = row.get(8)?;

    Ok(Pet {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        health: row.get(3)?,
        max_health: row.get(4)?,
        infection_level: row.get(5)?,
        status: parse_pet_status(&status_str),
        last_checked_at: parse_timestamp_lenient("last_checked_at", last_checked_str.as_deref()),
        born_at: parse_required("born_at", &born_at_str),
        version: row.get(9)?,
    })
}

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    let priority_str: String = row.get(5)?;
    let due_at_str: Option<String> = row.get(6)?;
    let created_at_str: String = row.get(7)?;
    let updated_at_str: String = row.get(8)?;
    let completed_at_str: Option<String> = row.get(9)?;
    let source_str: String = row.get(10)?;

    Ok(Task {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        completed: row.get(4)?,
        priority: Priority::parse(&priority_str),
        due_at: parse_timestamp_lenient("due_at", due_at_str.as_deref()),
        created_at: parse_required("created_at", &created_at_str),
        updated_at: parse_required("updated_at", &updated_at_str),
        completed_at: parse_timestamp_lenient("completed_at", completed_at_str.as_deref()),
        source: TaskSource::parse(&source_str),
    })
}

fn row_to_habit(row: &Row) -> rusqlite::Result<Habit> {
    let last_completed_str: Option<String> = row.get(4)?;
    let created_at_str: String = row.get(5)?;

    Ok(Habit {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        streak: row.get(3)?,
        last_completed_at: parse_timestamp_lenient(
            "last_completed_at",
            last_completed_str.as_deref(),
        ),
        created_at: parse_required("created_at", &created_at_str),
        version: row.get(6)?,
    })
}

/// SQLite database holding pets, tasks, and daily habits.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open the store at `<data dir>/hostage.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("hostage.db");
        Self::open_at(&path)
    }

    /// Open the store at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    fn exists(&self, table: &str, id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {table} WHERE id = ?1"),
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn query_pets(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<Pet>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(args, row_to_pet)?;
        let mut pets = Vec::new();
        for row in rows {
            pets.push(row?);
        }
        Ok(pets)
    }
}

impl RecordStore for SqliteStore {
    // ── Pets ─────────────────────────────────────────────────────────

    fn insert_pet(&self, pet: &Pet) -> Result<()> {
        self.conn.execute(
            "INSERT INTO pets (id, owner_id, name, health, max_health, infection_level,
                               status, last_checked_at, born_at, version)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                pet.id,
                pet.owner_id,
                pet.name,
                pet.health,
                pet.max_health,
                pet.infection_level,
                pet.status.as_str(),
                format_optional(pet.last_checked_at),
                format_timestamp(pet.born_at),
                pet.version,
            ],
        )?;
        Ok(())
    }

    fn get_pet(&self, id: &str) -> Result<Option<Pet>> {
        let pet = self
            .conn
            .query_row(
                &format!("SELECT {PET_COLUMNS} FROM pets WHERE id = ?1"),
                params![id],
                row_to_pet,
            )
            .optional()?;
        Ok(pet)
    }

    fn find_alive_pet(&self, owner_id: &str) -> Result<Option<Pet>> {
        let pets = self.query_pets(
            &format!(
                "SELECT {PET_COLUMNS} FROM pets
                 WHERE owner_id = ?1 AND status = 'ALIVE'
                 ORDER BY born_at DESC LIMIT 1"
            ),
            params![owner_id],
        )?;
        Ok(pets.into_iter().next())
    }

    fn find_latest_dead_pet(&self, owner_id: &str) -> Result<Option<Pet>> {
        let pets = self.query_pets(
            &format!(
                "SELECT {PET_COLUMNS} FROM pets
                 WHERE owner_id = ?1 AND status = 'DEAD'
                 ORDER BY born_at DESC LIMIT 1"
            ),
            params![owner_id],
        )?;
        Ok(pets.into_iter().next())
    }

    fn list_pets_by_status(&self, status: PetStatus) -> Result<Vec<Pet>> {
        self.query_pets(
            &format!("SELECT {PET_COLUMNS} FROM pets WHERE status = ?1 ORDER BY born_at ASC"),
            params![status.as_str()],
        )
    }

    fn update_pet(&self, pet: &Pet, expected_version: i64) -> Result<Pet> {
        let changed = self.conn.execute(
            "UPDATE pets
             SET name = ?1, health = ?2, max_health = ?3, infection_level = ?4, status = ?5,
                 last_checked_at = ?6, version = version + 1
             WHERE id = ?7 AND version = ?8",
            params![
                pet.name,
                pet.health,
                pet.max_health,
                pet.infection_level,
                pet.status.as_str(),
                format_optional(pet.last_checked_at),
                pet.id,
                expected_version,
            ],
        )?;

        if changed == 0 {
            return Err(if self.exists("pets", &pet.id)? {
                CoreError::conflict("pet", &pet.id)
            } else {
                CoreError::not_found("pet", &pet.id)
            });
        }

        Ok(Pet {
            version: expected_version + 1,
            ..pet.clone()
        })
    }

    fn delete_pet(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM pets WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    // ── Tasks ────────────────────────────────────────────────────────

    fn insert_task(&self, task: &Task) -> Result<()> {
        self.conn.execute(
            "INSERT INTO tasks (id, owner_id, title, description, completed, priority, due_at,
                                created_at, updated_at, completed_at, source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                task.id,
                task.owner_id,
                task.title,
                task.description,
                task.completed,
                task.priority.as_str(),
                format_optional(task.due_at),
                format_timestamp(task.created_at),
                format_timestamp(task.updated_at),
                format_optional(task.completed_at),
                task.source.as_str(),
            ],
        )?;
        Ok(())
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let task = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                row_to_task,
            )
            .optional()?;
        Ok(task)
    }

    fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE 1 = 1");
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(owner_id) = &filter.owner_id {
            args.push(Box::new(owner_id.clone()));
            sql.push_str(&format!(" AND owner_id = ?{}", args.len()));
        }
        if let Some(completed) = filter.completed {
            args.push(Box::new(completed));
            sql.push_str(&format!(" AND completed = ?{}", args.len()));
        }
        match filter.has_due_date {
            Some(true) => sql.push_str(" AND due_at IS NOT NULL"),
            Some(false) => sql.push_str(" AND due_at IS NULL"),
            None => {}
        }
        sql.push_str(" ORDER BY created_at DESC");

        // `due_before` compares parsed instants, so the limit applies after it.
        if filter.due_before.is_none() {
            if let Some(limit) = filter.limit {
                sql.push_str(&format!(" LIMIT {limit}"));
            }
        }

        let params_refs: Vec<&dyn rusqlite::ToSql> = args.iter().map(|a| a.as_ref()).collect();
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_refs.as_slice(), row_to_task)?;

        let mut tasks = Vec::new();
        for row in rows {
            let task = row?;
            if let Some(before) = filter.due_before {
                if !task.due_at.is_some_and(|due| due < before) {
                    continue;
                }
            }
            tasks.push(task);
            if filter.due_before.is_some() && filter.limit.is_some_and(|l| tasks.len() >= l) {
                break;
            }
        }
        Ok(tasks)
    }

    fn update_task(&self, task: &Task) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET title = ?1, description = ?2, completed = ?3, priority = ?4, due_at = ?5,
                 updated_at = ?6, completed_at = ?7, source = ?8
             WHERE id = ?9",
            params![
                task.title,
                task.description,
                task.completed,
                task.priority.as_str(),
                format_optional(task.due_at),
                format_timestamp(task.updated_at),
                format_optional(task.completed_at),
                task.source.as_str(),
                task.id,
            ],
        )?;
        if changed == 0 {
            return Err(CoreError::not_found("task", &task.id));
        }
        Ok(())
    }

    fn delete_task(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    // ── Habits ───────────────────────────────────────────────────────

    fn insert_habit(&self, habit: &Habit) -> Result<()> {
        self.conn.execute(
            "INSERT INTO daily_habits (id, owner_id, title, streak, last_completed_at,
                                       created_at, version)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                habit.id,
                habit.owner_id,
                habit.title,
                habit.streak,
                format_optional(habit.last_completed_at),
                format_timestamp(habit.created_at),
                habit.version,
            ],
        )?;
        Ok(())
    }

    fn get_habit(&self, id: &str) -> Result<Option<Habit>> {
        let habit = self
            .conn
            .query_row(
                &format!("SELECT {HABIT_COLUMNS} FROM daily_habits WHERE id = ?1"),
                params![id],
                row_to_habit,
            )
            .optional()?;
        Ok(habit)
    }

    fn list_habits(&self, owner_id: &str, limit: Option<usize>) -> Result<Vec<Habit>> {
        let mut sql = format!(
            "SELECT {HABIT_COLUMNS} FROM daily_habits WHERE owner_id = ?1 ORDER BY created_at DESC"
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner_id], row_to_habit)?;
        let mut habits = Vec::new();
        for row in rows {
            habits.push(row?);
        }
        Ok(habits)
    }

    fn update_habit(&self, habit: &Habit, expected_version: i64) -> Result<Habit> {
        let changed = self.conn.execute(
            "UPDATE daily_habits
             SET title = ?1, streak = ?2, last_completed_at = ?3, version = version + 1
             WHERE id = ?4 AND version = ?5",
            params![
                habit.title,
                habit.streak,
                format_optional(habit.last_completed_at),
                habit.id,
                expected_version,
            ],
        )?;

        if changed == 0 {
            return Err(if self.exists("daily_habits", &habit.id)? {
                CoreError::conflict("habit", &habit.id)
            } else {
                CoreError::not_found("habit", &habit.id)
            });
        }

        Ok(Habit {
            version: expected_version + 1,
            ..habit.clone()
        })
    }

    fn delete_habit(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM daily_habits WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}
