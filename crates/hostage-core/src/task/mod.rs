//! Task records: obligations with an optional due date and a priority.
//!
//! A task moves from open to completed exactly once. Open tasks past their
//! due date feed the overdue penalty; completing one heals the owner's pet.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{CoreError, Result, ValidationError};

/// Maximum task title length in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Task urgency classification.
///
/// Drives both the overdue damage multiplier and the heal amount.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    /// Parse a stored priority. Unknown values fall back to medium; use
    /// [`str::parse`] for user input, which rejects them.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Priority::Low,
            "high" => Priority::High,
            "critical" => Priority::Critical,
            _ => Priority::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "priority".into(),
                message: format!("expected low, medium, high, or critical; got {value:?}"),
            })
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a task came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskSource {
    /// Created by the owner in this system.
    Native,
    /// Pulled in from an external task source.
    Imported,
}

impl TaskSource {
    pub fn parse(value: &str) -> Self {
        match value {
            "imported" => TaskSource::Imported,
            _ => TaskSource::Native,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskSource::Native => "native",
            TaskSource::Imported => "imported",
        }
    }
}

impl Default for TaskSource {
    fn default() -> Self {
        TaskSource::Native
    }
}

/// Request payload for creating a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub owner_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
}

/// Snapshot of a persisted task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: Priority,
    pub due_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set iff `completed`.
    pub completed_at: Option<DateTime<Utc>>,
    pub source: TaskSource,
}

impl Task {
    /// Build a new open task from a creation request.
    ///
    /// # Errors
    /// Returns a validation error if the title is empty or too long.
    pub fn new(req: NewTask, now: DateTime<Utc>) -> Result<Self> {
        let len = req.title.chars().count();
        if len == 0 || len > MAX_TITLE_LEN {
            return Err(ValidationError::Length {
                field: "title",
                min: 1,
                max: MAX_TITLE_LEN,
                len,
            }
            .into());
        }

        Ok(Task {
            id: Uuid::new_v4().to_string(),
            owner_id: req.owner_id,
            title: req.title,
            description: req.description,
            completed: false,
            priority: req.priority,
            due_at: req.due_at,
            created_at: now,
            updated_at: now,
            completed_at: None,
            source: TaskSource::Native,
        })
    }

    /// Mark the task completed.
    ///
    /// # Errors
    /// Returns `InvalidState` if the task was already completed.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.completed {
            return Err(CoreError::InvalidState(format!(
                "task {} already completed",
                self.id
            )));
        }
        self.completed = true;
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// True when the task is open and its due date has passed.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_at.is_some_and(|due| due < now)
    }
}
