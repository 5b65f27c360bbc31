//! Daily streak toggle state machine.
//!
//! One button per habit: pressing it on a day that is already recorded
//! cancels today's completion, otherwise it records today and either
//! continues the streak (completed yesterday) or restarts it at one.
//!
//! ```text
//!   no history ──check──> completed today <──check── completed before today
//!                            │      ^
//!                      uncheck      │ check
//!                            v      │
//!                         no history (timestamp cleared)
//! ```
//!
//! Days are compared as calendar dates in a single fixed reporting offset,
//! never as instants. Unchecking clears `last_completed_at` instead of
//! restoring the previous completion date, so a streak resumed after an
//! uncheck restarts at one.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::habit::Habit;

/// Reporting offset used when no other is configured (UTC+9).
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 9;

/// What a toggle did.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToggleAction {
    Checked,
    Unchecked,
}

/// Result of a toggle: the habit to persist plus a summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleOutcome {
    pub habit: Habit,
    pub action: ToggleAction,
    pub new_streak: u32,
    pub message: String,
}

/// Calendar-day streak calculator in a fixed reporting offset.
#[derive(Debug, Clone, Copy)]
pub struct StreakTracker {
    offset: FixedOffset,
}

impl StreakTracker {
    /// Create a tracker for the given offset from UTC in whole hours.
    ///
    /// # Errors
    /// Returns an error if the offset is outside ±23 hours.
    pub fn new(utc_offset_hours: i32) -> Result<Self> {
        let offset = utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "vitality.streak_utc_offset_hours".into(),
                message: format!("offset {utc_offset_hours}h is out of range"),
            })?;
        Ok(Self { offset })
    }

    /// Calendar date of an instant in the reporting offset.
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    pub fn is_same_day(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        self.local_date(a) == self.local_date(b)
    }

    /// True when `earlier` falls on the calendar day right before `now`.
    pub fn is_previous_day(&self, earlier: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let today = self.local_date(now);
        today
            .checked_sub_signed(Duration::days(1))
            .is_some_and(|yesterday| self.local_date(earlier) == yesterday)
    }

    /// Toggle today's completion of a habit.
    pub fn toggle(&self, habit: &Habit, now: DateTime<Utc>) -> ToggleOutcome {
        let mut next = habit.clone();

        match habit.last_completed_at {
            Some(last) if self.is_same_day(last, now) => {
                let new_streak = habit.streak.saturating_sub(1);
                next.streak = new_streak;
                next.last_completed_at = None;
                tracing::debug!(habit = %habit.id, new_streak, "habit unchecked");
                ToggleOutcome {
                    habit: next,
                    action: ToggleAction::Unchecked,
                    new_streak,
                    message: format!("Habit unchecked. Streak: {new_streak} days"),
                }
            }
            last => {
                let continues = last.is_some_and(|last| self.is_previous_day(last, now));
                let new_streak = if continues {
                    habit.streak.saturating_add(1)
                } else {
                    1
                };
                next.streak = new_streak;
                next.last_completed_at = Some(now);
                tracing::debug!(habit = %habit.id, new_streak, continues, "habit checked");
                let message = if new_streak > 1 {
                    format!("{new_streak}-day streak!")
                } else {
                    "Habit completed!".to_string()
                };
                ToggleOutcome {
                    habit: next,
                    action: ToggleAction::Checked,
                    new_streak,
                    message,
                }
            }
        }
    }
}

impl Default for StreakTracker {
    fn default() -> Self {
        Self {
            offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_HOURS * 3600)
                .unwrap_or_else(|| Utc.fix()),
        }
    }
}
