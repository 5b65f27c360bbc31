//! Damage from open tasks past their due date.
//!
//! The calculator is pure: it reports per-task damage and which tasks are
//! old enough to be purged, and leaves deletion to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::{DamageTier, PenaltyPolicy, PriorityTable};
use crate::task::{Priority, Task};

/// One overdue task's contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverdueEntry {
    pub task_id: String,
    pub title: String,
    pub due_at: DateTime<Utc>,
    pub days_overdue: i64,
    pub priority: Priority,
    pub damage: f64,
    /// Old enough to be deleted after damage is dealt.
    pub purge: bool,
}

/// Total penalty for a set of tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PenaltyReport {
    pub total_damage: f64,
    pub uncapped_damage: f64,
    pub capped: bool,
    /// Tasks that contributed damage.
    pub overdue_count: usize,
    pub entries: Vec<OverdueEntry>,
    pub purge_ids: Vec<String>,
}

impl PenaltyReport {
    /// Warning line for the owner, if anything is overdue.
    pub fn warning(&self) -> Option<String> {
        (self.overdue_count > 0).then(|| format!("{} OVERDUE TASKS DETECTED", self.overdue_count))
    }
}

/// Whole days past due, floored. Zero or negative when not yet overdue.
pub fn days_overdue(due_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - due_at).num_days()
}

/// Base damage of the highest tier met. Tiers are not cumulative.
pub fn tier_damage(days_overdue: i64, tiers: &[DamageTier]) -> f64 {
    tiers
        .iter()
        .filter(|tier| days_overdue >= tier.min_days)
        .max_by_key(|tier| tier.min_days)
        .map(|tier| tier.damage)
        .unwrap_or(0.0)
}

/// Overdue penalty calculator bound to one policy.
#[derive(Debug, Clone, Copy)]
pub struct PenaltyCalculator<'a> {
    policy: &'a PenaltyPolicy,
    multipliers: &'a PriorityTable,
    purge_after_days: i64,
}

impl<'a> PenaltyCalculator<'a> {
    pub fn new(
        policy: &'a PenaltyPolicy,
        multipliers: &'a PriorityTable,
        purge_after_days: i64,
    ) -> Self {
        Self {
            policy,
            multipliers,
            purge_after_days,
        }
    }

    /// Damage one task deals at `days_overdue`, before any cap.
    pub fn task_damage(&self, days_overdue: i64, priority: Priority) -> f64 {
        match self.policy {
            PenaltyPolicy::Tiered { tiers, .. } => {
                let base = tier_damage(days_overdue, tiers);
                if base == 0.0 {
                    0.0
                } else {
                    base * self.multipliers.get(priority)
                }
            }
            PenaltyPolicy::Flat { per_task, .. } => *per_task,
        }
    }

    /// Assess every task. Completed, undated, and not-yet-due tasks are skipped.
    pub fn assess(&self, tasks: &[Task], now: DateTime<Utc>) -> PenaltyReport {
        let mut report = PenaltyReport::default();

        for task in tasks {
            if task.completed {
                continue;
            }
            let Some(due_at) = task.due_at else {
                continue;
            };
            if due_at >= now {
                continue;
            }

            let days = days_overdue(due_at, now);
            let damage = self.task_damage(days, task.priority);
            let purge = days >= self.purge_after_days;

            if damage <= 0.0 && !purge {
                continue;
            }
            if damage > 0.0 {
                report.overdue_count += 1;
                report.uncapped_damage += damage;
            }
            if purge {
                report.purge_ids.push(task.id.clone());
            }
            report.entries.push(OverdueEntry {
                task_id: task.id.clone(),
                title: task.title.clone(),
                due_at,
                days_overdue: days,
                priority: task.priority,
                damage,
                purge,
            });
        }

        report.total_damage = match self.policy.max_total() {
            Some(cap) if report.uncapped_damage > cap => {
                report.capped = true;
                cap
            }
            _ => report.uncapped_damage,
        };

        tracing::debug!(
            total = report.total_damage,
            uncapped = report.uncapped_damage,
            overdue = report.overdue_count,
            purge = report.purge_ids.len(),
            "assessed overdue penalty"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{NewTask, TaskSource};
    use chrono::Duration;

    fn task(id: &str, due: Option<DateTime<Utc>>, priority: Priority) -> Task {
        let now = Utc::now();
        let mut t = Task::new(
            NewTask {
                owner_id: "o".into(),
                title: format!("task {id}"),
                priority,
                due_at: due,
                ..Default::default()
            },
            now,
        )
        .unwrap();
        t.id = id.into();
        t
    }

    fn tiered() -> PenaltyPolicy {
        PenaltyPolicy::default_tiered()
    }

    #[test]
    fn tiers_pick_highest_met() {
        let tiers = match tiered() {
            PenaltyPolicy::Tiered { tiers, .. } => tiers,
            _ => unreachable!(),
        };
        assert_eq!(tier_damage(0, &tiers), 0.0);
        assert_eq!(tier_damage(1, &tiers), 5.0);
        assert_eq!(tier_damage(2, &tiers), 5.0);
        assert_eq!(tier_damage(3, &tiers), 10.0);
        assert_eq!(tier_damage(6, &tiers), 10.0);
        assert_eq!(tier_damage(7, &tiers), 20.0);
        assert_eq!(tier_damage(70, &tiers), 20.0);
    }

    #[test]
    fn mixed_priorities_sum_uncapped() {
        let now = Utc::now();
        let policy = tiered();
        let mult = PriorityTable::default_multipliers();
        let calc = PenaltyCalculator::new(&policy, &mult, 7);
        let tasks = vec![
            task("a", Some(now - Duration::days(3)), Priority::Medium),
            task("b", Some(now - Duration::days(4)), Priority::High),
            task("c", Some(now - Duration::days(8)), Priority::Critical),
        ];
        let report = calc.assess(&tasks, now);
        assert_eq!(report.total_damage, 95.0);
        assert_eq!(report.overdue_count, 3);
        assert!(!report.capped);
        assert_eq!(report.purge_ids, vec!["c".to_string()]);
        let damages: Vec<f64> = report.entries.iter().map(|e| e.damage).collect();
        assert_eq!(damages, vec![15.0, 20.0, 60.0]);
    }

    #[test]
    fn cap_limits_total() {
        let now = Utc::now();
        let policy = PenaltyPolicy::Tiered {
            tiers: match tiered() {
                PenaltyPolicy::Tiered { tiers, .. } => tiers,
                _ => unreachable!(),
            },
            max_total: Some(40.0),
        };
        let mult = PriorityTable::default_multipliers();
        let calc = PenaltyCalculator::new(&policy, &mult, 7);
        let tasks = vec![
            task("a", Some(now - Duration::days(3)), Priority::Medium),
            task("b", Some(now - Duration::days(4)), Priority::High),
            task("c", Some(now - Duration::days(8)), Priority::Critical),
        ];
        let report = calc.assess(&tasks, now);
        assert_eq!(report.uncapped_damage, 95.0);
        assert_eq!(report.total_damage, 40.0);
        assert!(report.capped);
    }

    #[test]
    fn due_now_and_same_day_deal_nothing() {
        let now = Utc::now();
        let policy = tiered();
        let mult = PriorityTable::default_multipliers();
        let calc = PenaltyCalculator::new(&policy, &mult, 7);
        let tasks = vec![
            task("now", Some(now), Priority::Critical),
            task("hours", Some(now - Duration::hours(23)), Priority::Critical),
            task("future", Some(now + Duration::days(1)), Priority::Critical),
        ];
        let report = calc.assess(&tasks, now);
        assert_eq!(report.total_damage, 0.0);
        assert_eq!(report.overdue_count, 0);
        assert!(report.entries.is_empty());
        assert!(report.warning().is_none());
    }

    #[test]
    fn two_days_stays_in_first_tier() {
        let now = Utc::now();
        let policy = tiered();
        let mult = PriorityTable::default_multipliers();
        let calc = PenaltyCalculator::new(&policy, &mult, 7);
        let report = calc.assess(&[task("x", Some(now - Duration::days(2)), Priority::Medium)], now);
        assert_eq!(report.total_damage, 7.5);
    }

    #[test]
    fn exact_boundary_uses_higher_tier() {
        let now = Utc::now();
        let policy = tiered();
        let mult = PriorityTable::default_multipliers();
        let calc = PenaltyCalculator::new(&policy, &mult, 7);
        let report = calc.assess(&[task("x", Some(now - Duration::days(3)), Priority::Low)], now);
        assert_eq!(report.total_damage, 10.0);
    }

    #[test]
    fn skips_completed_and_undated() {
        let now = Utc::now();
        let policy = tiered();
        let mult = PriorityTable::default_multipliers();
        let calc = PenaltyCalculator::new(&policy, &mult, 7);
        let mut done = task("done", Some(now - Duration::days(5)), Priority::High);
        done.complete(now).unwrap();
        let report = calc.assess(&[done, task("nodue", None, Priority::High)], now);
        assert_eq!(report, PenaltyReport::default());
    }

    #[test]
    fn flat_policy_counts_every_overdue_task() {
        let now = Utc::now();
        let policy = PenaltyPolicy::Flat {
            per_task: 5.0,
            max_total: Some(20.0),
        };
        let mult = PriorityTable::default_multipliers();
        let calc = PenaltyCalculator::new(&policy, &mult, 7);
        let mut tasks: Vec<Task> = (0..6)
            .map(|i| task(&i.to_string(), Some(now - Duration::hours(1)), Priority::Low))
            .collect();
        tasks[0].source = TaskSource::Imported;
        let report = calc.assess(&tasks, now);
        assert_eq!(report.overdue_count, 6);
        assert_eq!(report.uncapped_damage, 30.0);
        assert_eq!(report.total_damage, 20.0);
        assert!(report.capped);
        assert_eq!(report.warning().as_deref(), Some("6 OVERDUE TASKS DETECTED"));
    }
}
