//! Property-based tests for the vitality calculators.

use chrono::{DateTime, Duration, TimeZone, Utc};
use hostage_core::vitality::decay;
use hostage_core::{
    DecayPolicy, Habit, NewTask, PenaltyPolicy, Pet, PetStatus, Priority, StreakTracker, Task,
    TaskFeed, ToggleAction, VitalityAction, VitalityConfig, VitalityEngine,
};
use proptest::prelude::*;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn pet_with(health: f64, checked_minutes_ago: i64) -> Pet {
    let mut pet = Pet::new("owner", "Mochi", 100.0, now() - Duration::days(30)).unwrap();
    pet.health = health;
    pet.last_checked_at = Some(now() - Duration::minutes(checked_minutes_ago));
    pet
}

fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop::sample::select(Priority::ALL.to_vec())
}

proptest! {
    #[test]
    fn dead_pet_never_decays(minutes in 0i64..100_000) {
        let mut pet = pet_with(0.0, minutes);
        pet.status = PetStatus::Dead;
        let out = decay::decay(&pet, now(), &DecayPolicy::default());
        prop_assert_eq!(out, pet);
    }

    #[test]
    fn future_checkpoint_is_no_op(minutes_ahead in 0i64..100_000, health in 1.0f64..=100.0) {
        let pet = pet_with(health, -minutes_ahead);
        let out = decay::decay(&pet, now(), &DecayPolicy::default());
        prop_assert_eq!(out.health, health);
        prop_assert_eq!(out.status, PetStatus::Alive);
    }

    #[test]
    fn quadratic_doubling_quadruples(hours in 0.01f64..200.0) {
        let policy = DecayPolicy::default();
        let one = policy.damage(hours);
        let two = policy.damage(hours * 2.0);
        prop_assert!((two - 4.0 * one).abs() <= 1e-9 * two.max(1.0));
    }

    #[test]
    fn decay_is_monotonic(a in 0i64..10_000, b in 0i64..10_000) {
        let (short, long) = if a <= b { (a, b) } else { (b, a) };
        let policy = DecayPolicy::default();
        let after_short = decay::decay(&pet_with(100.0, short), now(), &policy);
        let after_long = decay::decay(&pet_with(100.0, long), now(), &policy);
        prop_assert!(after_long.health <= after_short.health);
    }

    #[test]
    fn health_stays_in_bounds(
        health in 0.5f64..=100.0,
        minutes in 0i64..1_000,
        priority in priority_strategy(),
        overdue_days in prop::collection::vec(0i64..30, 0..6),
    ) {
        let engine = VitalityEngine::new(VitalityConfig::default()).unwrap();
        let pet = pet_with(health, minutes);

        let healed = engine
            .apply_action(&pet, VitalityAction::HealOnTaskComplete { priority }, now())
            .unwrap();
        prop_assert!(healed.pet.health >= 0.0 && healed.pet.health <= healed.pet.max_health);

        let tasks: Vec<Task> = overdue_days
            .iter()
            .map(|days| {
                Task::new(
                    NewTask {
                        owner_id: "owner".into(),
                        title: "t".into(),
                        priority,
                        due_at: Some(now() - Duration::days(*days) - Duration::minutes(1)),
                        ..Default::default()
                    },
                    now(),
                )
                .unwrap()
            })
            .collect();
        let penalized = engine
            .apply_action(&pet, VitalityAction::PenalizeOnSync { tasks, feed: TaskFeed::Native }, now())
            .unwrap();
        prop_assert!(penalized.pet.health >= 0.0 && penalized.pet.health <= penalized.pet.max_health);
        prop_assert_eq!(penalized.pet.status == PetStatus::Dead, penalized.pet.health == 0.0);
    }

    #[test]
    fn tier_damage_never_decreases_with_age(days in 0i64..60, priority in priority_strategy()) {
        let engine = VitalityEngine::new(VitalityConfig::default()).unwrap();
        let task_due = |d: i64| {
            Task::new(
                NewTask {
                    owner_id: "owner".into(),
                    title: "t".into(),
                    priority,
                    due_at: Some(now() - Duration::days(d)),
                    ..Default::default()
                },
                now(),
            )
            .unwrap()
        };
        let younger = engine.penalty(&[task_due(days)], now(), TaskFeed::Native);
        let older = engine.penalty(&[task_due(days + 1)], now(), TaskFeed::Native);
        prop_assert!(older.total_damage >= younger.total_damage);
        prop_assert!(younger.total_damage >= 0.0);
    }

    #[test]
    fn capped_total_never_exceeds_cap(count in 0usize..20, cap in 1.0f64..100.0) {
        let config = VitalityConfig {
            external_penalty: PenaltyPolicy::Flat { per_task: 5.0, max_total: Some(cap) },
            ..VitalityConfig::default()
        };
        let engine = VitalityEngine::new(config).unwrap();
        let tasks: Vec<Task> = (0..count)
            .map(|_| {
                Task::new(
                    NewTask {
                        owner_id: "owner".into(),
                        title: "t".into(),
                        due_at: Some(now() - Duration::hours(2)),
                        ..Default::default()
                    },
                    now(),
                )
                .unwrap()
            })
            .collect();
        let report = engine.penalty(&tasks, now(), TaskFeed::External);
        prop_assert!(report.total_damage <= cap);
        prop_assert_eq!(report.capped, report.uncapped_damage > cap);
    }

    #[test]
    fn same_day_double_toggle_restores_streak(streak in 0u32..1_000, hour in 0u32..24) {
        let tracker = StreakTracker::default();
        let at = Utc.with_ymd_and_hms(2025, 6, 1, hour, 30, 0).unwrap();
        let mut habit = Habit::new("owner", "Read", at - Duration::days(10)).unwrap();
        habit.streak = streak;
        habit.last_completed_at = (streak > 0).then(|| at - Duration::days(1));

        let checked = tracker.toggle(&habit, at);
        prop_assert_eq!(checked.action, ToggleAction::Checked);
        let unchecked = tracker.toggle(&checked.habit, at);
        prop_assert_eq!(unchecked.action, ToggleAction::Unchecked);
        prop_assert_eq!(unchecked.new_streak, streak);
        prop_assert!(unchecked.habit.last_completed_at.is_none());
    }
}
