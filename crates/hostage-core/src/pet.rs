//! The pet record: one owner's health avatar.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{CoreError, Result, ValidationError};

/// Maximum pet name length in characters.
pub const MAX_NAME_LEN: usize = 50;

/// Life status of a pet.
///
/// A pet only leaves `Dead` through [`Pet::revive`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum PetStatus {
    Alive,
    Dead,
}

impl PetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PetStatus::Alive => "ALIVE",
            PetStatus::Dead => "DEAD",
        }
    }
}

impl fmt::Display for PetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a persisted pet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub health: f64,
    pub max_health: f64,
    /// Reset on revival; not otherwise read by the engine.
    pub infection_level: i64,
    pub status: PetStatus,
    /// Last time damage was settled and persisted.
    pub last_checked_at: Option<DateTime<Utc>>,
    pub born_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped by the store on every write.
    pub version: i64,
}

impl Pet {
    /// Create a fresh, fully healthy pet.
    ///
    /// # Errors
    /// Returns a validation error if the name is empty or too long.
    pub fn new(
        owner_id: impl Into<String>,
        name: impl Into<String>,
        max_health: f64,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let name = name.into();
        let len = name.chars().count();
        if len == 0 || len > MAX_NAME_LEN {
            return Err(ValidationError::Length {
                field: "name",
                min: 1,
                max: MAX_NAME_LEN,
                len,
            }
            .into());
        }
        if !(max_health.is_finite() && max_health > 0.0) {
            return Err(ValidationError::InvalidValue {
                field: "max_health".into(),
                message: format!("must be a positive number, got {max_health}"),
            }
            .into());
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            name,
            health: max_health,
            max_health,
            infection_level: 0,
            status: PetStatus::Alive,
            last_checked_at: Some(now),
            born_at: now,
            version: 0,
        })
    }

    pub fn is_alive(&self) -> bool {
        self.status == PetStatus::Alive
    }

    /// Set health, clamped to `[0, max_health]`. Reaching zero kills the pet.
    pub fn set_health(&mut self, value: f64) {
        let value = if value.is_nan() { 0.0 } else { value };
        self.health = value.clamp(0.0, self.max_health);
        if self.health <= 0.0 {
            self.health = 0.0;
            self.status = PetStatus::Dead;
        }
    }

    /// Bring a dead pet back at full health with a fresh checkpoint.
    ///
    /// # Errors
    /// Returns `InvalidState` if the pet is still alive.
    pub fn revive(&self, now: DateTime<Utc>) -> Result<Pet> {
        if self.is_alive() {
            return Err(CoreError::InvalidState(format!(
                "pet {} is still alive",
                self.id
            )));
        }
        Ok(Pet {
            health: self.max_health,
            infection_level: 0,
            status: PetStatus::Alive,
            last_checked_at: Some(now),
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_pet_starts_full_and_alive() {
        let now = Utc::now();
        let pet = Pet::new("owner", "Mochi", 100.0, now).unwrap();
        assert_eq!(pet.health, 100.0);
        assert_eq!(pet.max_health, 100.0);
        assert_eq!(pet.status, PetStatus::Alive);
        assert_eq!(pet.last_checked_at, Some(now));
        assert_eq!(pet.infection_level, 0);
    }

    #[test]
    fn name_length_is_validated() {
        assert!(Pet::new("o", "", 100.0, Utc::now()).is_err());
        assert!(Pet::new("o", "x".repeat(51), 100.0, Utc::now()).is_err());
        assert!(Pet::new("o", "x".repeat(50), 100.0, Utc::now()).is_ok());
    }

    #[test]
    fn set_health_clamps_and_kills() {
        let mut pet = Pet::new("o", "p", 100.0, Utc::now()).unwrap();
        pet.set_health(140.0);
        assert_eq!(pet.health, 100.0);
        assert!(pet.is_alive());

        pet.set_health(-3.0);
        assert_eq!(pet.health, 0.0);
        assert_eq!(pet.status, PetStatus::Dead);

        // Health alone never resurrects.
        pet.set_health(50.0);
        assert_eq!(pet.status, PetStatus::Dead);
    }

    #[test]
    fn revive_resets_dead_pet() {
        let born = Utc::now() - chrono::Duration::days(3);
        let mut pet = Pet::new("o", "p", 100.0, born).unwrap();
        pet.infection_level = 4;
        pet.set_health(0.0);

        let now = Utc::now();
        let revived = pet.revive(now).unwrap();
        assert_eq!(revived.health, 100.0);
        assert_eq!(revived.infection_level, 0);
        assert_eq!(revived.status, PetStatus::Alive);
        assert_eq!(revived.last_checked_at, Some(now));
        assert_eq!(revived.born_at, born);
    }

    #[test]
    fn revive_rejects_living_pet() {
        let pet = Pet::new("o", "p", 100.0, Utc::now()).unwrap();
        assert!(matches!(pet.revive(Utc::now()), Err(CoreError::InvalidState(_))));
    }

    #[test]
    fn status_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&PetStatus::Dead).unwrap(), "\"DEAD\"");
    }
}
