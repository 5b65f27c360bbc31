//! Tuning for the vitality engine.
//!
//! Every coefficient, tier, and table lives here and is handed to
//! [`VitalityEngine::new`](super::VitalityEngine::new) as one immutable value,
//! so tests and alternate deployments can swap tuning without touching
//! process-wide state.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::habit::streak::DEFAULT_UTC_OFFSET_HOURS;
use crate::task::Priority;

/// How passive health loss grows with unattended time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecayPolicy {
    /// `hours² × coefficient`. Short absences are cheap, long ones punishing.
    Quadratic { coefficient: f64 },
    /// `hours × per_hour`.
    Linear { per_hour: f64 },
}

impl DecayPolicy {
    /// Damage for a span of unattended hours. Non-positive spans deal nothing.
    pub fn damage(&self, hours: f64) -> f64 {
        if !(hours > 0.0) {
            return 0.0;
        }
        match self {
            DecayPolicy::Quadratic { coefficient } => hours * hours * coefficient,
            DecayPolicy::Linear { per_hour } => hours * per_hour,
        }
    }

    /// Unattended hours needed to deal `damage`, or `None` if the policy never
    /// deals damage.
    pub fn hours_to_deal(&self, damage: f64) -> Option<f64> {
        let damage = damage.max(0.0);
        match self {
            DecayPolicy::Quadratic { coefficient } if *coefficient > 0.0 => {
                Some((damage / coefficient).sqrt())
            }
            DecayPolicy::Linear { per_hour } if *per_hour > 0.0 => Some(damage / per_hour),
            _ => None,
        }
    }

    fn validate(&self) -> Result<()> {
        let (key, value) = match self {
            DecayPolicy::Quadratic { coefficient } => ("vitality.decay.coefficient", *coefficient),
            DecayPolicy::Linear { per_hour } => ("vitality.decay.per_hour", *per_hour),
        };
        non_negative(key, value)
    }
}

impl Default for DecayPolicy {
    fn default() -> Self {
        DecayPolicy::Quadratic { coefficient: 0.5 }
    }
}

/// One days-overdue band and the damage it deals per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageTier {
    pub min_days: i64,
    pub damage: f64,
}

/// How overdue tasks turn into damage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PenaltyPolicy {
    /// Highest tier met by days overdue, times the priority multiplier.
    Tiered {
        tiers: Vec<DamageTier>,
        #[serde(default)]
        max_total: Option<f64>,
    },
    /// Fixed damage per overdue task.
    Flat {
        per_task: f64,
        #[serde(default)]
        max_total: Option<f64>,
    },
}

impl PenaltyPolicy {
    pub fn default_tiered() -> Self {
        PenaltyPolicy::Tiered {
            tiers: vec![
                DamageTier { min_days: 1, damage: 5.0 },
                DamageTier { min_days: 3, damage: 10.0 },
                DamageTier { min_days: 7, damage: 20.0 },
            ],
            max_total: None,
        }
    }

    pub fn default_flat() -> Self {
        PenaltyPolicy::Flat {
            per_task: 5.0,
            max_total: Some(20.0),
        }
    }

    pub fn max_total(&self) -> Option<f64> {
        match self {
            PenaltyPolicy::Tiered { max_total, .. } | PenaltyPolicy::Flat { max_total, .. } => {
                *max_total
            }
        }
    }

    fn validate(&self, key: &str) -> Result<()> {
        match self {
            PenaltyPolicy::Tiered { tiers, .. } => {
                for tier in tiers {
                    if tier.min_days < 1 {
                        return Err(ConfigError::InvalidValue {
                            key: format!("{key}.tiers"),
                            message: format!("min_days must be at least 1, got {}", tier.min_days),
                        }
                        .into());
                    }
                    non_negative(&format!("{key}.tiers.damage"), tier.damage)?;
                }
            }
            PenaltyPolicy::Flat { per_task, .. } => {
                non_negative(&format!("{key}.per_task"), *per_task)?;
            }
        }
        if let Some(cap) = self.max_total() {
            non_negative(&format!("{key}.max_total"), cap)?;
        }
        Ok(())
    }
}

/// One number per priority.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityTable {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl PriorityTable {
    pub fn default_multipliers() -> Self {
        Self {
            low: 1.0,
            medium: 1.5,
            high: 2.0,
            critical: 3.0,
        }
    }

    pub fn default_heal() -> Self {
        Self {
            low: 3.0,
            medium: 5.0,
            high: 8.0,
            critical: 12.0,
        }
    }

    pub fn get(&self, priority: Priority) -> f64 {
        match priority {
            Priority::Low => self.low,
            Priority::Medium => self.medium,
            Priority::High => self.high,
            Priority::Critical => self.critical,
        }
    }

    fn validate(&self, key: &str) -> Result<()> {
        for priority in Priority::ALL {
            non_negative(&format!("{key}.{priority}"), self.get(priority))?;
        }
        Ok(())
    }
}

/// Complete engine tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalityConfig {
    #[serde(default)]
    pub decay: DecayPolicy,
    /// Policy for native tasks (interactive preview and the batch job).
    #[serde(default = "PenaltyPolicy::default_tiered")]
    pub penalty: PenaltyPolicy,
    /// Policy for tasks pulled from an external task source.
    #[serde(default = "PenaltyPolicy::default_flat")]
    pub external_penalty: PenaltyPolicy,
    #[serde(default = "PriorityTable::default_multipliers")]
    pub priority_multipliers: PriorityTable,
    #[serde(default = "PriorityTable::default_heal")]
    pub heal: PriorityTable,
    /// Flat heal for completing a habit.
    #[serde(default = "default_habit_heal")]
    pub habit_heal: f64,
    /// Tasks at least this many days overdue are flagged for deletion.
    #[serde(default = "default_purge_after_days")]
    pub purge_after_days: i64,
    /// Reporting offset from UTC for streak calendar days.
    #[serde(default = "default_streak_offset")]
    pub streak_utc_offset_hours: i32,
    #[serde(default = "default_max_health")]
    pub default_max_health: f64,
}

fn default_habit_heal() -> f64 {
    10.0
}
fn default_purge_after_days() -> i64 {
    7
}
fn default_streak_offset() -> i32 {
    DEFAULT_UTC_OFFSET_HOURS
}
fn default_max_health() -> f64 {
    100.0
}

impl Default for VitalityConfig {
    fn default() -> Self {
        Self {
            decay: DecayPolicy::default(),
            penalty: PenaltyPolicy::default_tiered(),
            external_penalty: PenaltyPolicy::default_flat(),
            priority_multipliers: PriorityTable::default_multipliers(),
            heal: PriorityTable::default_heal(),
            habit_heal: default_habit_heal(),
            purge_after_days: default_purge_after_days(),
            streak_utc_offset_hours: default_streak_offset(),
            default_max_health: default_max_health(),
        }
    }
}

impl VitalityConfig {
    /// Check every value is usable.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        self.decay.validate()?;
        self.penalty.validate("vitality.penalty")?;
        self.external_penalty.validate("vitality.external_penalty")?;
        self.priority_multipliers
            .validate("vitality.priority_multipliers")?;
        self.heal.validate("vitality.heal")?;
        non_negative("vitality.habit_heal", self.habit_heal)?;
        if self.purge_after_days < 1 {
            return Err(ConfigError::InvalidValue {
                key: "vitality.purge_after_days".into(),
                message: format!("must be at least 1, got {}", self.purge_after_days),
            }
            .into());
        }
        if !(self.default_max_health.is_finite() && self.default_max_health > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "vitality.default_max_health".into(),
                message: format!("must be positive, got {}", self.default_max_health),
            }
            .into());
        }
        if !(-23..=23).contains(&self.streak_utc_offset_hours) {
            return Err(ConfigError::InvalidValue {
                key: "vitality.streak_utc_offset_hours".into(),
                message: format!(
                    "must be within ±23 hours, got {}",
                    self.streak_utc_offset_hours
                ),
            }
            .into());
        }
        Ok(())
    }
}

fn non_negative(key: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("must be a non-negative number, got {value}"),
        }
        .into())
    }
}
