//! Streak-tracked daily habits.

pub mod streak;

pub use streak::{StreakTracker, ToggleAction, ToggleOutcome};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ValidationError};

/// Maximum habit title length in characters.
pub const MAX_TITLE_LEN: usize = 100;

/// Snapshot of a persisted daily habit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    /// Consecutive calendar days completed.
    pub streak: u32,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped by the store on every write.
    pub version: i64,
}

impl Habit {
    /// Create a habit with no history.
    ///
    /// # Errors
    /// Returns a validation error if the title is empty or too long.
    pub fn new(
        owner_id: impl Into<String>,
        title: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let title = title.into();
        let len = title.chars().count();
        if len == 0 || len > MAX_TITLE_LEN {
            return Err(ValidationError::Length {
                field: "title",
                min: 1,
                max: MAX_TITLE_LEN,
                len,
            }
            .into());
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            title,
            streak: 0,
            last_completed_at: None,
            created_at: now,
            version: 0,
        })
    }
}
