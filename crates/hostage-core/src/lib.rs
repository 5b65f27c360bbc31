//! # Hostage Core Library
//!
//! This library provides the core logic for Hostage, a task-accountability
//! tool in which a virtual pet's health tracks how well its owner keeps up
//! with tasks and daily habits. Neglect decays the pet, overdue tasks hurt
//! it, and completed work heals it.
//!
//! ## Architecture
//!
//! - **Vitality**: Pure calculators (decay, overdue penalty, healing) and the
//!   orchestrator that composes them into one step per request
//! - **Habits**: Calendar-day streak toggling in a fixed reporting timezone
//! - **Storage**: SQLite record store and TOML-based configuration
//! - **Integrations**: External task sources (Notion)
//! - **Services**: Interactive operations ([`Keeper`]) and the scheduled
//!   batch penalty run
//!
//! ## Key Components
//!
//! - [`VitalityEngine`]: Decay, heal, and penalty orchestration
//! - [`RecordStore`]: Persistence for pets, tasks, and habits
//! - [`Config`]: Application configuration management
//! - [`ExternalTaskSource`]: Trait for third-party task trackers

pub mod batch;
pub mod error;
pub mod habit;
pub mod integrations;
pub mod keeper;
pub mod pet;
pub mod storage;
pub mod task;
pub mod timestamp;
pub mod vitality;

pub use batch::{BatchReport, PetDamageDetail, PetFailure};
pub use error::{ConfigError, CoreError, DatabaseError, Result, ValidationError};
pub use habit::{Habit, StreakTracker, ToggleAction, ToggleOutcome};
pub use integrations::{ExternalTask, ExternalTaskSource, NotionTaskSource};
pub use keeper::{
    HabitCompletion, Keeper, OverduePreview, PetReading, SyncReport, SyncStatus, TaskCompletion,
};
pub use pet::{Pet, PetStatus};
pub use storage::{Config, RecordStore, SqliteStore, TaskFilter};
pub use task::{NewTask, Priority, Task, TaskSource};
pub use vitality::{
    DamageTier, DecayPolicy, PenaltyPolicy, PenaltyReport, TaskFeed, VitalityAction, VitalityConfig,
    VitalityEngine, VitalityOutcome,
};
