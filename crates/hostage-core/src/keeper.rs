//! Interactive operations over the record store.
//!
//! Each call reads the records it needs, runs one engine step, and writes the
//! result back with a conditional update. A lost race surfaces as
//! [`CoreError::Conflict`]; nothing here retries.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::habit::{Habit, ToggleOutcome};
use crate::integrations::{ExternalTask, ExternalTaskSource};
use crate::pet::Pet;
use crate::storage::{Config, RecordStore, TaskFilter};
use crate::task::{NewTask, Priority, Task, TaskSource};
use crate::vitality::{
    DecayProjection, PenaltyReport, TaskFeed, VitalityAction, VitalityEngine,
};

/// Default page size for task and habit listings.
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// A pet as it looks right now, decay included but not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetReading {
    pub pet: Pet,
    pub decay: DecayProjection,
}

/// Result of completing a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCompletion {
    pub task: Task,
    pub pet: Pet,
    /// Health actually restored after clamping.
    pub healed: f64,
    pub message: String,
}

/// Result of completing a habit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitCompletion {
    pub habit_id: String,
    pub pet: Pet,
    pub decay_damage: f64,
    /// Health actually restored after clamping.
    pub healed: f64,
    pub message: String,
}

/// Overdue tasks for one owner with the damage the next batch run would deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverduePreview {
    pub report: PenaltyReport,
    pub warning: Option<String>,
}

/// How an external sync ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Synced,
    NoDamage,
    NoActivePet,
}

/// Result of pulling overdue tasks from an external source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub status: SyncStatus,
    pub source: String,
    /// False when the source failed and was treated as reporting nothing.
    pub source_available: bool,
    pub overdue_count: usize,
    pub damage_dealt: f64,
    pub pet: Option<Pet>,
}

/// Caller-side service binding a record store to a vitality engine.
pub struct Keeper<S: RecordStore> {
    store: S,
    engine: VitalityEngine,
    cron_secret: Option<String>,
}

impl<S: RecordStore> Keeper<S> {
    pub fn new(store: S, engine: VitalityEngine) -> Self {
        Self {
            store,
            engine,
            cron_secret: None,
        }
    }

    /// Build from loaded configuration. Environment overrides should already
    /// be applied.
    ///
    /// # Errors
    /// Returns a configuration error if the vitality tuning is invalid.
    pub fn from_config(store: S, config: &Config) -> Result<Self> {
        let engine = VitalityEngine::new(config.vitality.clone())?;
        Ok(Self::new(store, engine).with_cron_secret(config.cron.secret.clone()))
    }

    /// Set the shared secret the batch trigger must present.
    pub fn with_cron_secret(mut self, secret: Option<String>) -> Self {
        self.cron_secret = secret.filter(|s| !s.is_empty());
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn engine(&self) -> &VitalityEngine {
        &self.engine
    }

    pub(crate) fn cron_secret(&self) -> Option<&str> {
        self.cron_secret.as_deref()
    }

    fn alive_pet(&self, owner_id: &str) -> Result<Pet> {
        self.store
            .find_alive_pet(owner_id)?
            .ok_or_else(|| CoreError::not_found("pet", owner_id))
    }

    // ── Pets ─────────────────────────────────────────────────────────

    /// Adopt a new pet. An owner may only have one living pet.
    pub fn create_pet(&self, owner_id: &str, name: &str, now: DateTime<Utc>) -> Result<Pet> {
        if let Some(existing) = self.store.find_alive_pet(owner_id)? {
            return Err(CoreError::InvalidState(format!(
                "owner {owner_id} already has a living pet ({})",
                existing.name
            )));
        }
        let pet = Pet::new(owner_id, name, self.engine.config().default_max_health, now)?;
        self.store.insert_pet(&pet)?;
        tracing::info!(pet = %pet.id, owner = owner_id, "pet created");
        Ok(pet)
    }

    /// Current state of the owner's living pet. Nothing is persisted.
    pub fn pet_status(&self, owner_id: &str, now: DateTime<Utc>) -> Result<PetReading> {
        let pet = self.alive_pet(owner_id)?;
        let outcome = self.engine.apply_action(&pet, VitalityAction::Observe, now)?;
        Ok(PetReading {
            decay: self.engine.project(&pet, now),
            pet: outcome.pet,
        })
    }

    /// Bring the owner's most recent dead pet back to full health.
    pub fn revive_pet(&self, owner_id: &str, now: DateTime<Utc>) -> Result<Pet> {
        if self.store.find_alive_pet(owner_id)?.is_some() {
            return Err(CoreError::InvalidState(format!(
                "owner {owner_id} already has a living pet"
            )));
        }
        let dead = self
            .store
            .find_latest_dead_pet(owner_id)?
            .ok_or_else(|| CoreError::not_found("dead pet", owner_id))?;
        let revived = self.store.update_pet(&dead.revive(now)?, dead.version)?;
        tracing::info!(pet = %revived.id, owner = owner_id, "pet revived");
        Ok(revived)
    }

    pub fn purge_pet(&self, pet_id: &str) -> Result<()> {
        if !self.store.delete_pet(pet_id)? {
            return Err(CoreError::not_found("pet", pet_id));
        }
        tracing::info!(pet = pet_id, "pet purged");
        Ok(())
    }

    // ── Tasks ────────────────────────────────────────────────────────

    pub fn create_task(&self, req: NewTask, now: DateTime<Utc>) -> Result<Task> {
        let task = Task::new(req, now)?;
        self.store.insert_task(&task)?;
        tracing::info!(task = %task.id, owner = %task.owner_id, "task created");
        Ok(task)
    }

    /// Newest first; `limit` defaults to [`DEFAULT_LIST_LIMIT`].
    pub fn list_tasks(
        &self,
        owner_id: &str,
        completed: Option<bool>,
        limit: Option<usize>,
    ) -> Result<Vec<Task>> {
        self.store.list_tasks(&TaskFilter {
            completed,
            limit: Some(limit.unwrap_or(DEFAULT_LIST_LIMIT)),
            ..TaskFilter::for_owner(owner_id)
        })
    }

    /// Complete a task and heal the owner's living pet by its priority.
    ///
    /// The pet is written before the task. If the task write fails after
    /// that, the task stays open and a retry heals the pet a second time.
    pub fn complete_task(&self, task_id: &str, now: DateTime<Utc>) -> Result<TaskCompletion> {
        let mut task = self
            .store
            .get_task(task_id)?
            .ok_or_else(|| CoreError::not_found("task", task_id))?;
        task.complete(now)?;

        let pet = self.alive_pet(&task.owner_id)?;
        let outcome = self.engine.apply_action(
            &pet,
            VitalityAction::HealOnTaskComplete {
                priority: task.priority,
            },
            now,
        )?;
        let pet = self.store.update_pet(&outcome.pet, pet.version)?;
        self.store.update_task(&task)?;

        let message = if outcome.died {
            "Task completed, but it was too late.".to_string()
        } else {
            format!("Task completed! Healed {} HP", outcome.healed)
        };
        tracing::info!(
            task = task_id,
            pet = %pet.id,
            healed = outcome.healed,
            decay = outcome.decay_damage,
            "task completed"
        );

        Ok(TaskCompletion {
            task,
            pet,
            healed: outcome.healed,
            message,
        })
    }

    pub fn delete_task(&self, task_id: &str) -> Result<()> {
        if !self.store.delete_task(task_id)? {
            return Err(CoreError::not_found("task", task_id));
        }
        tracing::info!(task = task_id, "task deleted");
        Ok(())
    }

    /// Damage the owner's overdue tasks would deal on the next batch run.
    pub fn overdue_preview(&self, owner_id: &str, now: DateTime<Utc>) -> Result<OverduePreview> {
        let tasks = self.store.list_tasks(&TaskFilter {
            due_before: Some(now),
            ..TaskFilter::open_dated(owner_id)
        })?;
        let report = self.engine.penalty(&tasks, now, TaskFeed::Native);
        Ok(OverduePreview {
            warning: report.warning(),
            report,
        })
    }

    // ── Habits ───────────────────────────────────────────────────────

    pub fn create_habit(&self, owner_id: &str, title: &str, now: DateTime<Utc>) -> Result<Habit> {
        let habit = Habit::new(owner_id, title, now)?;
        self.store.insert_habit(&habit)?;
        tracing::info!(habit = %habit.id, owner = owner_id, "habit created");
        Ok(habit)
    }

    /// Newest first; `limit` defaults to [`DEFAULT_LIST_LIMIT`].
    pub fn list_habits(&self, owner_id: &str, limit: Option<usize>) -> Result<Vec<Habit>> {
        self.store
            .list_habits(owner_id, Some(limit.unwrap_or(DEFAULT_LIST_LIMIT)))
    }

    /// Check or uncheck a habit for today.
    pub fn toggle_habit(&self, habit_id: &str, now: DateTime<Utc>) -> Result<ToggleOutcome> {
        let habit = self
            .store
            .get_habit(habit_id)?
            .ok_or_else(|| CoreError::not_found("habit", habit_id))?;
        let mut outcome = self.engine.toggle_habit(&habit, now);
        outcome.habit = self.store.update_habit(&outcome.habit, habit.version)?;
        tracing::info!(
            habit = habit_id,
            action = ?outcome.action,
            streak = outcome.new_streak,
            "habit toggled"
        );
        Ok(outcome)
    }

    /// Heal the habit owner's living pet by the flat habit amount, after
    /// settling decay. Streaks are untouched; see [`Keeper::toggle_habit`].
    pub fn complete_habit(&self, habit_id: &str, now: DateTime<Utc>) -> Result<HabitCompletion> {
        let habit = self
            .store
            .get_habit(habit_id)?
            .ok_or_else(|| CoreError::not_found("habit", habit_id))?;
        let pet = self.alive_pet(&habit.owner_id)?;
        let outcome = self
            .engine
            .apply_action(&pet, VitalityAction::HealOnHabitComplete, now)?;
        let pet = self.store.update_pet(&outcome.pet, pet.version)?;

        let message = if outcome.died {
            "Habit completed, but it was too late.".to_string()
        } else {
            format!("Habit completed! Healed {} HP", outcome.healed)
        };
        tracing::info!(
            habit = habit_id,
            pet = %pet.id,
            healed = outcome.healed,
            decay = outcome.decay_damage,
            "habit completed"
        );

        Ok(HabitCompletion {
            habit_id: habit.id,
            pet,
            decay_damage: outcome.decay_damage,
            healed: outcome.healed,
            message,
        })
    }

    pub fn delete_habit(&self, habit_id: &str) -> Result<()> {
        if !self.store.delete_habit(habit_id)? {
            return Err(CoreError::not_found("habit", habit_id));
        }
        tracing::info!(habit = habit_id, "habit deleted");
        Ok(())
    }

    // ── External sync ────────────────────────────────────────────────

    /// Penalize the owner's living pet for tasks an external tracker reports
    /// as overdue.
    ///
    /// A failing source counts as zero overdue tasks.
    pub async fn sync_external(
        &self,
        owner_id: &str,
        source: &dyn ExternalTaskSource,
        now: DateTime<Utc>,
    ) -> Result<SyncReport> {
        let (external, source_available) = match source.list_overdue(now).await {
            Ok(tasks) => (tasks, true),
            Err(err) => {
                tracing::warn!(source = source.name(), %err, "external task source unavailable");
                (Vec::new(), false)
            }
        };
        let tasks: Vec<Task> = external
            .into_iter()
            .map(|t| imported_task(owner_id, t, now))
            .collect();

        let mut report = SyncReport {
            status: SyncStatus::NoActivePet,
            source: source.name().to_string(),
            source_available,
            overdue_count: tasks.len(),
            damage_dealt: 0.0,
            pet: None,
        };

        let Some(pet) = self.store.find_alive_pet(owner_id)? else {
            return Ok(report);
        };

        let outcome = self.engine.apply_action(
            &pet,
            VitalityAction::PenalizeOnSync {
                tasks,
                feed: TaskFeed::External,
            },
            now,
        )?;
        let damage = outcome.total_damage();
        let pet = if outcome.persist && damage > 0.0 {
            self.store.update_pet(&outcome.pet, pet.version)?
        } else {
            pet
        };

        report.status = if damage > 0.0 {
            SyncStatus::Synced
        } else {
            SyncStatus::NoDamage
        };
        report.damage_dealt = damage;
        report.pet = Some(pet);
        tracing::info!(
            owner = owner_id,
            source = %report.source,
            overdue = report.overdue_count,
            damage,
            "external sync applied"
        );
        Ok(report)
    }
}

/// External tasks are already reported overdue; an unreadable due date is
/// placed just before `now` so it still counts.
fn imported_task(owner_id: &str, external: ExternalTask, now: DateTime<Utc>) -> Task {
    Task {
        id: external
            .external_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        owner_id: owner_id.to_string(),
        title: external.title,
        description: None,
        completed: false,
        priority: Priority::Medium,
        due_at: Some(external.due_at.unwrap_or(now - Duration::seconds(1))),
        created_at: now,
        updated_at: now,
        completed_at: None,
        source: TaskSource::Imported,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::ToggleAction;
    use crate::pet::PetStatus;
    use crate::storage::SqliteStore;
    use crate::vitality::VitalityConfig;
    use async_trait::async_trait;

    fn keeper() -> Keeper<SqliteStore> {
        let engine = VitalityEngine::new(VitalityConfig::default()).unwrap();
        Keeper::new(SqliteStore::open_memory().unwrap(), engine)
    }

    fn new_task(owner: &str, priority: Priority, due: Option<DateTime<Utc>>) -> NewTask {
        NewTask {
            owner_id: owner.into(),
            title: "Pay rent".into(),
            priority,
            due_at: due,
            ..Default::default()
        }
    }

    struct FixedSource(Vec<ExternalTask>);

    #[async_trait]
    impl ExternalTaskSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn list_overdue(&self, _now: DateTime<Utc>) -> Result<Vec<ExternalTask>> {
            Ok(self.0.clone())
        }
    }

    struct DownSource;

    #[async_trait]
    impl ExternalTaskSource for DownSource {
        fn name(&self) -> &str {
            "down"
        }
        async fn list_overdue(&self, _now: DateTime<Utc>) -> Result<Vec<ExternalTask>> {
            Err(CoreError::CollaboratorUnavailable {
                collaborator: "down",
                message: "connection refused".into(),
            })
        }
    }

    #[test]
    fn one_living_pet_per_owner() {
        let k = keeper();
        let now = Utc::now();
        k.create_pet("u1", "Mochi", now).unwrap();
        let err = k.create_pet("u1", "Second", now).unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
        k.create_pet("u2", "Other", now).unwrap();
    }

    #[test]
    fn pet_status_observes_without_writing() {
        let k = keeper();
        let born = Utc::now() - Duration::hours(4);
        let pet = k.create_pet("u1", "Mochi", born).unwrap();

        let now = born + Duration::hours(4);
        let reading = k.pet_status("u1", now).unwrap();
        assert_eq!(reading.pet.health, 92.0);
        assert_eq!(reading.decay.damage, 8.0);

        let stored = k.store().get_pet(&pet.id).unwrap().unwrap();
        assert_eq!(stored.health, 100.0);
        assert_eq!(stored.version, 0);
    }

    #[test]
    fn missing_pet_names_the_entity() {
        let err = keeper().pet_status("nobody", Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "pet not found: nobody");
    }

    #[test]
    fn complete_task_heals_and_rejects_repeat() {
        let k = keeper();
        let now = Utc::now();
        let pet = k.create_pet("u1", "Mochi", now).unwrap();
        let mut weakened = pet.clone();
        weakened.health = 50.0;
        k.store().update_pet(&weakened, 0).unwrap();

        let task = k.create_task(new_task("u1", Priority::High, None), now).unwrap();
        let done = k.complete_task(&task.id, now).unwrap();
        assert_eq!(done.healed, 8.0);
        assert_eq!(done.pet.health, 58.0);
        assert!(done.task.completed);
        assert_eq!(done.message, "Task completed! Healed 8 HP");

        let err = k.complete_task(&task.id, now).unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
        assert_eq!(k.store().get_pet(&pet.id).unwrap().unwrap().health, 58.0);
    }

    #[test]
    fn complete_task_without_pet_leaves_task_open() {
        let k = keeper();
        let now = Utc::now();
        let task = k.create_task(new_task("u1", Priority::Low, None), now).unwrap();
        let err = k.complete_task(&task.id, now).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: "pet", .. }));
        assert!(!k.store().get_task(&task.id).unwrap().unwrap().completed);
    }

    #[test]
    fn revive_only_when_dead() {
        let k = keeper();
        let now = Utc::now();
        let pet = k.create_pet("u1", "Mochi", now).unwrap();
        assert!(matches!(k.revive_pet("u1", now), Err(CoreError::InvalidState(_))));

        let mut dead = pet.clone();
        dead.set_health(0.0);
        k.store().update_pet(&dead, 0).unwrap();

        let revived = k.revive_pet("u1", now).unwrap();
        assert_eq!(revived.status, PetStatus::Alive);
        assert_eq!(revived.health, 100.0);
        assert_eq!(revived.version, 2);
    }

    #[test]
    fn overdue_preview_reports_warning() {
        let k = keeper();
        let now = Utc::now();
        k.create_task(new_task("u1", Priority::Critical, Some(now - Duration::days(3))), now)
            .unwrap();
        k.create_task(new_task("u1", Priority::Low, Some(now + Duration::days(3))), now)
            .unwrap();

        let preview = k.overdue_preview("u1", now).unwrap();
        assert_eq!(preview.report.total_damage, 30.0);
        assert_eq!(preview.warning.as_deref(), Some("1 OVERDUE TASKS DETECTED"));
    }

    #[test]
    fn habit_toggle_persists_and_bumps_version() {
        let k = keeper();
        let now = Utc::now();
        let habit = k.create_habit("u1", "Stretch", now).unwrap();

        let first = k.toggle_habit(&habit.id, now).unwrap();
        assert_eq!(first.action, ToggleAction::Checked);
        assert_eq!(first.habit.version, 1);

        let second = k.toggle_habit(&habit.id, now).unwrap();
        assert_eq!(second.action, ToggleAction::Unchecked);
        assert_eq!(second.new_streak, 0);

        let stored = k.store().get_habit(&habit.id).unwrap().unwrap();
        assert_eq!(stored.streak, 0);
        assert!(stored.last_completed_at.is_none());

        k.delete_habit(&habit.id).unwrap();
        assert!(matches!(
            k.toggle_habit(&habit.id, now),
            Err(CoreError::NotFound { entity: "habit", .. })
        ));
    }

    #[test]
    fn complete_habit_settles_decay_then_heals() {
        let k = keeper();
        let born = Utc::now() - Duration::hours(4);
        let pet = k.create_pet("u1", "Mochi", born).unwrap();
        let mut weakened = pet.clone();
        weakened.health = 50.0;
        k.store().update_pet(&weakened, 0).unwrap();
        let habit = k.create_habit("u1", "Stretch", born).unwrap();

        let now = born + Duration::hours(4);
        let done = k.complete_habit(&habit.id, now).unwrap();
        // 4h decay = 8, then a flat 10.
        assert_eq!(done.decay_damage, 8.0);
        assert_eq!(done.healed, 10.0);
        assert_eq!(done.message, "Habit completed! Healed 10 HP");

        let stored = k.store().get_pet(&pet.id).unwrap().unwrap();
        assert_eq!(stored.health, 52.0);
        assert_eq!(stored.last_checked_at, Some(now));
        // Streak bookkeeping belongs to toggle_habit.
        assert_eq!(k.store().get_habit(&habit.id).unwrap().unwrap().streak, 0);
    }

    #[test]
    fn complete_habit_clamps_to_max_health() {
        let k = keeper();
        let now = Utc::now();
        let pet = k.create_pet("u1", "Mochi", now).unwrap();
        let mut hurt = pet.clone();
        hurt.health = 95.0;
        k.store().update_pet(&hurt, 0).unwrap();
        let habit = k.create_habit("u1", "Read", now).unwrap();

        let done = k.complete_habit(&habit.id, now).unwrap();
        assert_eq!(done.healed, 5.0);
        assert_eq!(done.pet.health, 100.0);
    }

    #[test]
    fn complete_habit_too_late_persists_death() {
        let k = keeper();
        let born = Utc::now() - Duration::hours(7);
        let pet = k.create_pet("u1", "Mochi", born).unwrap();
        let mut frail = pet.clone();
        frail.health = 20.0;
        k.store().update_pet(&frail, 0).unwrap();
        let habit = k.create_habit("u1", "Read", born).unwrap();

        let now = born + Duration::hours(7);
        let done = k.complete_habit(&habit.id, now).unwrap();
        assert_eq!(done.healed, 0.0);
        assert_eq!(done.pet.status, PetStatus::Dead);
        assert_eq!(done.message, "Habit completed, but it was too late.");
        assert_eq!(
            k.store().get_pet(&pet.id).unwrap().unwrap().status,
            PetStatus::Dead
        );

        assert!(matches!(
            k.complete_habit(&habit.id, now),
            Err(CoreError::NotFound { entity: "pet", .. })
        ));
    }

    #[tokio::test]
    async fn sync_external_applies_flat_penalty() {
        let k = keeper();
        let now = Utc::now();
        let mut pet = k.create_pet("u1", "Mochi", now).unwrap();
        // No checkpoint: no decay, and not a replay of this tick.
        pet.last_checked_at = None;
        k.store().update_pet(&pet, 0).unwrap();
        let source = FixedSource(
            (0..2)
                .map(|i| ExternalTask {
                    external_id: Some(format!("n{i}")),
                    title: format!("notion {i}"),
                    due_at: Some(now - Duration::days(1)),
                })
                .collect(),
        );

        let report = k.sync_external("u1", &source, now).await.unwrap();
        assert_eq!(report.status, SyncStatus::Synced);
        assert_eq!(report.overdue_count, 2);
        assert_eq!(report.damage_dealt, 10.0);
        assert_eq!(report.pet.unwrap().health, 90.0);
    }

    #[tokio::test]
    async fn sync_external_tolerates_source_failure() {
        let k = keeper();
        let now = Utc::now();
        k.create_pet("u1", "Mochi", now).unwrap();

        let report = k.sync_external("u1", &DownSource, now).await.unwrap();
        assert!(!report.source_available);
        assert_eq!(report.status, SyncStatus::NoDamage);
        assert_eq!(report.damage_dealt, 0.0);
    }

    #[tokio::test]
    async fn sync_external_without_pet() {
        let report = keeper()
            .sync_external("ghost", &FixedSource(Vec::new()), Utc::now())
            .await
            .unwrap();
        assert_eq!(report.status, SyncStatus::NoActivePet);
        assert!(report.pet.is_none());
    }
}
