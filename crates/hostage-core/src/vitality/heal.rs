//! Healing on task completion.

use super::config::PriorityTable;
use crate::pet::Pet;
use crate::task::Priority;

/// Heal amount for a completed task of the given priority.
pub fn heal_amount(priority: Priority, table: &PriorityTable) -> f64 {
    table.get(priority)
}

/// Heal a living pet, clamped to its maximum. Returns the health actually
/// restored; a dead pet is left untouched and gains nothing.
pub fn apply_heal(pet: &mut Pet, amount: f64) -> f64 {
    if !pet.is_alive() || amount <= 0.0 {
        return 0.0;
    }
    let before = pet.health;
    pet.set_health(before + amount);
    pet.health - before
}
