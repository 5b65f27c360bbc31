//! Vitality orchestrator.
//!
//! Composes decay, healing, and overdue penalties into one step per request.
//! The engine never touches storage: it takes a snapshot, returns the next
//! snapshot, and says whether the caller should persist it.
//!
//! ## Ordering
//!
//! ```text
//! snapshot -> decay -> (heal | penalty) -> clamp -> status -> checkpoint
//! ```
//!
//! Decay always runs first, so a pet that decays to zero in the same tick
//! as a completion stays dead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::VitalityConfig;
use super::decay::{self, DecayProjection};
use super::heal;
use super::penalty::{PenaltyCalculator, PenaltyReport};
use crate::error::{CoreError, Result};
use crate::habit::{Habit, StreakTracker, ToggleOutcome};
use crate::pet::Pet;
use crate::task::{Priority, Task};

/// Which penalty policy a task list is judged by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFeed {
    /// Tasks owned in the record store.
    Native,
    /// Tasks pulled from an external task source.
    External,
}

/// A request to move a pet forward in time.
#[derive(Debug, Clone)]
pub enum VitalityAction {
    /// Read-time projection. Nothing is persisted.
    Observe,
    /// A task of this priority was just completed.
    HealOnTaskComplete { priority: Priority },
    /// A habit was just completed; heals by the flat habit amount.
    HealOnHabitComplete,
    /// Settle decay plus the penalty for these open tasks.
    PenalizeOnSync { tasks: Vec<Task>, feed: TaskFeed },
}

/// Result of one orchestrated step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalityOutcome {
    pub pet: Pet,
    pub decay_damage: f64,
    pub healed: f64,
    pub penalty: Option<PenaltyReport>,
    /// The pet was alive before this step and is dead after it.
    pub died: bool,
    /// The caller should write `pet` back to the record store.
    pub persist: bool,
}

impl VitalityOutcome {
    /// Decay plus penalty dealt in this step. A replayed penalty is reported
    /// but not dealt.
    pub fn total_damage(&self) -> f64 {
        let penalty = match &self.penalty {
            Some(report) if self.persist => report.total_damage,
            _ => 0.0,
        };
        self.decay_damage + penalty
    }
}

/// Pure vitality engine configured once at construction.
#[derive(Debug, Clone)]
pub struct VitalityEngine {
    config: VitalityConfig,
    streaks: StreakTracker,
}

impl VitalityEngine {
    /// Build an engine from validated tuning.
    ///
    /// # Errors
    /// Returns a configuration error if any value is out of range.
    pub fn new(config: VitalityConfig) -> Result<Self> {
        config.validate()?;
        let streaks = StreakTracker::new(config.streak_utc_offset_hours)?;
        Ok(Self { config, streaks })
    }

    pub fn config(&self) -> &VitalityConfig {
        &self.config
    }

    // ── Calculators ──────────────────────────────────────────────────

    pub fn decay(&self, pet: &Pet, now: DateTime<Utc>) -> Pet {
        decay::decay(pet, now, &self.config.decay)
    }

    pub fn project(&self, pet: &Pet, now: DateTime<Utc>) -> DecayProjection {
        decay::project(pet, now, &self.config.decay)
    }

    pub fn heal_amount(&self, priority: Priority) -> f64 {
        heal::heal_amount(priority, &self.config.heal)
    }

    pub fn penalty(&self, tasks: &[Task], now: DateTime<Utc>, feed: TaskFeed) -> PenaltyReport {
        let policy = match feed {
            TaskFeed::Native => &self.config.penalty,
            TaskFeed::External => &self.config.external_penalty,
        };
        PenaltyCalculator::new(
            policy,
            &self.config.priority_multipliers,
            self.config.purge_after_days,
        )
        .assess(tasks, now)
    }

    pub fn toggle_habit(&self, habit: &Habit, now: DateTime<Utc>) -> ToggleOutcome {
        self.streaks.toggle(habit, now)
    }

    // ── Orchestration ────────────────────────────────────────────────

    /// Apply one action to a pet snapshot.
    ///
    /// # Errors
    /// Returns `InvalidState` when a heal or penalty targets a dead pet.
    pub fn apply_action(
        &self,
        pet: &Pet,
        action: VitalityAction,
        now: DateTime<Utc>,
    ) -> Result<VitalityOutcome> {
        match action {
            VitalityAction::Observe => Ok(self.observe(pet, now)),
            VitalityAction::HealOnTaskComplete { priority } => {
                self.heal_after_decay(pet, self.heal_amount(priority), now)
            }
            VitalityAction::HealOnHabitComplete => {
                self.heal_after_decay(pet, self.config.habit_heal, now)
            }
            VitalityAction::PenalizeOnSync { tasks, feed } => {
                self.penalize_on_sync(pet, &tasks, feed, now)
            }
        }
    }

    fn observe(&self, pet: &Pet, now: DateTime<Utc>) -> VitalityOutcome {
        let decay_damage = decay::decay_damage(pet, now, &self.config.decay);
        let next = self.decay(pet, now);
        VitalityOutcome {
            died: pet.is_alive() && !next.is_alive(),
            pet: next,
            decay_damage,
            healed: 0.0,
            penalty: None,
            persist: false,
        }
    }

    fn heal_after_decay(
        &self,
        pet: &Pet,
        amount: f64,
        now: DateTime<Utc>,
    ) -> Result<VitalityOutcome> {
        ensure_alive(pet)?;

        let decay_damage = decay::decay_damage(pet, now, &self.config.decay);
        let mut next = self.decay(pet, now);
        let healed = heal::apply_heal(&mut next, amount);
        next.last_checked_at = Some(now);

        Ok(VitalityOutcome {
            died: !next.is_alive(),
            pet: next,
            decay_damage,
            healed,
            penalty: None,
            persist: true,
        })
    }

    fn penalize_on_sync(
        &self,
        pet: &Pet,
        tasks: &[Task],
        feed: TaskFeed,
        now: DateTime<Utc>,
    ) -> Result<VitalityOutcome> {
        ensure_alive(pet)?;

        let report = self.penalty(tasks, now, feed);

        // Already settled at or after this instant: a replay deals nothing.
        if pet.last_checked_at.is_some_and(|since| since >= now) {
            tracing::debug!(pet = %pet.id, "penalty already settled for this tick");
            return Ok(VitalityOutcome {
                pet: pet.clone(),
                decay_damage: 0.0,
                healed: 0.0,
                penalty: Some(report),
                died: false,
                persist: false,
            });
        }

        let decay_damage = decay::decay_damage(pet, now, &self.config.decay);
        let mut next = pet.clone();
        next.set_health(pet.health - decay_damage - report.total_damage);
        next.last_checked_at = Some(now);

        Ok(VitalityOutcome {
            died: !next.is_alive(),
            pet: next,
            decay_damage,
            healed: 0.0,
            penalty: Some(report),
            persist: true,
        })
    }
}

fn ensure_alive(pet: &Pet) -> Result<()> {
    if pet.is_alive() {
        Ok(())
    } else {
        Err(CoreError::InvalidState(format!("pet {} is not alive", pet.id)))
    }
}
