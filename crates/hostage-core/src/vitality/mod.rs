//! Vitality engine: decay, overdue penalties, healing, and their orchestration.
//!
//! All arithmetic is pure. Callers read a record, pass the snapshot in, and
//! write back the snapshot that comes out.

pub mod config;
pub mod decay;
pub mod engine;
pub mod heal;
pub mod penalty;

pub use config::{DamageTier, DecayPolicy, PenaltyPolicy, PriorityTable, VitalityConfig};
pub use decay::DecayProjection;
pub use engine::{TaskFeed, VitalityAction, VitalityEngine, VitalityOutcome};
pub use penalty::{OverdueEntry, PenaltyCalculator, PenaltyReport};
