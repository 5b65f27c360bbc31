//! Passive health loss since the last settled checkpoint.
//!
//! Decay is a read-only projection: it tells the caller what the pet's
//! health would be right now, and never moves `last_checked_at`. Only an
//! orchestrated action that persists the pet advances the checkpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::DecayPolicy;
use crate::pet::Pet;

/// Fractional hours from `since` to `now`. Negative when `since` is later.
pub fn hours_between(since: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - since).num_milliseconds() as f64 / 3_600_000.0
}

/// Damage accrued since the checkpoint, or zero when the pet is dead, the
/// checkpoint is missing, or no time has passed.
pub fn decay_damage(pet: &Pet, now: DateTime<Utc>, policy: &DecayPolicy) -> f64 {
    if !pet.is_alive() {
        return 0.0;
    }
    match pet.last_checked_at {
        Some(since) => policy.damage(hours_between(since, now)),
        None => 0.0,
    }
}

/// Apply accrued decay to a snapshot.
pub fn decay(pet: &Pet, now: DateTime<Utc>, policy: &DecayPolicy) -> Pet {
    let damage = decay_damage(pet, now, policy);
    if damage <= 0.0 {
        return pet.clone();
    }
    let mut next = pet.clone();
    next.set_health(pet.health - damage);
    next
}

/// What the owner sees on the status screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayProjection {
    pub hours_elapsed: f64,
    pub damage: f64,
    pub health_after: f64,
    /// Further hours of neglect until health reaches zero.
    pub hours_until_death: Option<f64>,
}

/// Project decay for display, including the countdown to death.
pub fn project(pet: &Pet, now: DateTime<Utc>, policy: &DecayPolicy) -> DecayProjection {
    let hours_elapsed = pet
        .last_checked_at
        .map(|since| hours_between(since, now).max(0.0))
        .unwrap_or(0.0);
    let damage = decay_damage(pet, now, policy);
    let health_after = decay(pet, now, policy).health;

    let hours_until_death = if pet.is_alive() {
        policy
            .hours_to_deal(pet.health)
            .map(|total| (total - hours_elapsed).max(0.0))
    } else {
        Some(0.0)
    };

    DecayProjection {
        hours_elapsed,
        damage,
        health_after,
        hours_until_death,
    }
}
