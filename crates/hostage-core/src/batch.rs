//! Scheduled overdue-penalty run across every living pet.
//!
//! One bad pet never aborts the run: its error is recorded in the report and
//! the remaining pets are still processed.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{CoreError, Result};
use crate::keeper::Keeper;
use crate::pet::{Pet, PetStatus};
use crate::storage::{RecordStore, TaskFilter};
use crate::vitality::{TaskFeed, VitalityAction};

type HmacSha256 = Hmac<Sha256>;

/// What the run did to one pet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetDamageDetail {
    pub pet_id: String,
    pub owner_id: String,
    pub pet_name: String,
    pub decay_damage: f64,
    pub penalty_damage: f64,
    pub damage: f64,
    pub new_health: f64,
    pub status: PetStatus,
    pub overdue_tasks: usize,
    pub tasks_deleted: usize,
    /// Stale tasks whose deletion failed; they are retried on the next run.
    pub tasks_failed_to_delete: usize,
}

/// A pet the run could not process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetFailure {
    pub pet_id: String,
    pub owner_id: String,
    pub error: String,
}

/// Summary of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub processed_pets: usize,
    pub total_damage_dealt: f64,
    pub pets_killed: usize,
    pub tasks_deleted: usize,
    pub tasks_failed_to_delete: usize,
    pub details: Vec<PetDamageDetail>,
    pub failures: Vec<PetFailure>,
}

/// Compare secrets in constant time.
///
/// Both sides are reduced to HMAC tags keyed by the configured secret, so
/// neither content nor length leaks through timing.
pub fn verify_secret(configured: &str, provided: &str) -> bool {
    let tag = |value: &str| -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(configured.as_bytes()).ok()?;
        mac.update(value.as_bytes());
        Some(mac)
    };
    let (Some(expected), Some(candidate)) = (tag(configured), tag(provided)) else {
        return false;
    };
    candidate
        .verify_slice(&expected.finalize().into_bytes())
        .is_ok()
}

impl<S: RecordStore> Keeper<S> {
    /// Penalize every living pet for its owner's overdue tasks.
    ///
    /// # Errors
    /// Returns `Unauthorized` before touching any record when no secret is
    /// configured or `provided_secret` does not match. Returns a store error
    /// only if the list of living pets cannot be read.
    pub fn run_batch_penalty(
        &self,
        provided_secret: &str,
        now: DateTime<Utc>,
    ) -> Result<BatchReport> {
        let Some(configured) = self.cron_secret() else {
            tracing::warn!("batch penalty rejected: no cron secret configured");
            return Err(CoreError::Unauthorized);
        };
        if !verify_secret(configured, provided_secret) {
            tracing::warn!("batch penalty rejected: secret mismatch");
            return Err(CoreError::Unauthorized);
        }

        let pets = self.store().list_pets_by_status(PetStatus::Alive)?;
        let mut report = BatchReport::default();

        for pet in &pets {
            match self.penalize_pet(pet, now) {
                Ok((detail, died)) => {
                    report.processed_pets += 1;
                    report.total_damage_dealt += detail.damage;
                    report.tasks_deleted += detail.tasks_deleted;
                    report.tasks_failed_to_delete += detail.tasks_failed_to_delete;
                    if died {
                        report.pets_killed += 1;
                    }
                    report.details.push(detail);
                }
                Err(err) => {
                    tracing::warn!(pet = %pet.id, owner = %pet.owner_id, %err, "batch penalty failed for pet");
                    report.failures.push(PetFailure {
                        pet_id: pet.id.clone(),
                        owner_id: pet.owner_id.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            processed = report.processed_pets,
            damage = report.total_damage_dealt,
            killed = report.pets_killed,
            deleted = report.tasks_deleted,
            undeleted = report.tasks_failed_to_delete,
            failed = report.failures.len(),
            "batch penalty finished"
        );
        Ok(report)
    }

    fn penalize_pet(&self, pet: &Pet, now: DateTime<Utc>) -> Result<(PetDamageDetail, bool)> {
        let tasks = self
            .store()
            .list_tasks(&TaskFilter::open_dated(pet.owner_id.clone()))?;
        let outcome = self.engine().apply_action(
            pet,
            VitalityAction::PenalizeOnSync {
                tasks,
                feed: TaskFeed::Native,
            },
            now,
        )?;

        let written = if outcome.persist {
            self.store().update_pet(&outcome.pet, pet.version)?
        } else {
            outcome.pet.clone()
        };

        let (overdue_tasks, purge_ids) = outcome
            .penalty
            .as_ref()
            .map(|p| (p.overdue_count, p.purge_ids.clone()))
            .unwrap_or_default();
        // The pet is already written, so a failed purge must not drop it
        // from the report.
        let mut tasks_deleted = 0;
        let mut tasks_failed_to_delete = 0;
        for task_id in &purge_ids {
            match self.store().delete_task(task_id) {
                Ok(true) => tasks_deleted += 1,
                Ok(false) => {}
                Err(err) => {
                    tasks_failed_to_delete += 1;
                    tracing::warn!(pet = %pet.id, task = %task_id, %err, "stale task purge failed");
                }
            }
        }

        let damage = outcome.total_damage();
        let died = outcome.died && outcome.persist;
        Ok((
            PetDamageDetail {
                pet_id: written.id.clone(),
                owner_id: written.owner_id.clone(),
                pet_name: written.name.clone(),
                decay_damage: outcome.decay_damage,
                penalty_damage: damage - outcome.decay_damage,
                damage,
                new_health: written.health,
                status: written.status,
                overdue_tasks,
                tasks_deleted,
                tasks_failed_to_delete,
            },
            died,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_comparison() {
        assert!(verify_secret("s3cret", "s3cret"));
        assert!(!verify_secret("s3cret", "s3cre"));
        assert!(!verify_secret("s3cret", "s3cret "));
        assert!(!verify_secret("s3cret", ""));
    }
}
