mod config;
pub mod migrations;
pub mod sqlite;

pub use config::{Config, CronConfig, NotionConfig};
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};
use crate::habit::Habit;
use crate::pet::{Pet, PetStatus};
use crate::task::Task;

/// Returns `~/.config/hostage[-dev]/` based on HOSTAGE_ENV.
///
/// Set HOSTAGE_ENV=dev to use development data directory. HOSTAGE_DATA_DIR
/// overrides both and is used as-is.
///
/// # Errors
/// Returns an error if creating the data directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("HOSTAGE_DATA_DIR") {
        Some(explicit) if !explicit.is_empty() => PathBuf::from(explicit),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("HOSTAGE_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("hostage-dev")
            } else {
                base_dir.join("hostage")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Query for [`RecordStore::list_tasks`]. Unset fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub owner_id: Option<String>,
    pub completed: Option<bool>,
    /// Only tasks due strictly before this instant.
    pub due_before: Option<DateTime<Utc>>,
    pub has_due_date: Option<bool>,
    pub limit: Option<usize>,
}

impl TaskFilter {
    pub fn for_owner(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: Some(owner_id.into()),
            ..Self::default()
        }
    }

    /// Incomplete tasks with a due date; the input set for overdue penalties.
    pub fn open_dated(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: Some(owner_id.into()),
            completed: Some(false),
            has_due_date: Some(true),
            ..Self::default()
        }
    }
}

/// Persistence for pets, tasks, and habits.
///
/// Pets and habits carry a `version`; their updates are conditional on the
/// version the caller read and fail with `Conflict` when another writer got
/// there first. Returned records always carry the stored version.
pub trait RecordStore {
    fn insert_pet(&self, pet: &Pet) -> Result<()>;
    fn get_pet(&self, id: &str) -> Result<Option<Pet>>;
    /// The owner's living pet, if any.
    fn find_alive_pet(&self, owner_id: &str) -> Result<Option<Pet>>;
    /// The owner's most recently born dead pet, if any.
    fn find_latest_dead_pet(&self, owner_id: &str) -> Result<Option<Pet>>;
    fn list_pets_by_status(&self, status: PetStatus) -> Result<Vec<Pet>>;
    /// Write `pet` if the stored version still equals `expected_version`.
    fn update_pet(&self, pet: &Pet, expected_version: i64) -> Result<Pet>;
    fn delete_pet(&self, id: &str) -> Result<bool>;

    fn insert_task(&self, task: &Task) -> Result<()>;
    fn get_task(&self, id: &str) -> Result<Option<Task>>;
    fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>>;
    fn update_task(&self, task: &Task) -> Result<()>;
    fn delete_task(&self, id: &str) -> Result<bool>;

    fn insert_habit(&self, habit: &Habit) -> Result<()>;
    fn get_habit(&self, id: &str) -> Result<Option<Habit>>;
    fn list_habits(&self, owner_id: &str, limit: Option<usize>) -> Result<Vec<Habit>>;
    /// Write `habit` if the stored version still equals `expected_version`.
    fn update_habit(&self, habit: &Habit, expected_version: i64) -> Result<Habit>;
    fn delete_habit(&self, id: &str) -> Result<bool>;
}
