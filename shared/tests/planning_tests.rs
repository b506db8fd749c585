//! Planning arithmetic property tests
//!
//! Property-based tests for:
//! - Property 1: Week ranges partition the month
//! - Property 2: Weekly shares cover the monthly quantity
//! - Property 3: Shift splits cover the daily quantity
//! - Property 4: Action plans are required exactly below the threshold
//! - Property 5: Corrective fields satisfy report validation

use proptest::prelude::*;

use shared::{
    day_key, distribute_week, max_week_count, production_percentage, requires_action_plan,
    split_shifts, validate_report_entry, week_ranges, weekly_quantity, ProductionEntry,
    ACHIEVEMENT_THRESHOLD,
};

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Any month between 2000 and 2100
fn period_strategy() -> impl Strategy<Value = (i32, u32)> {
    (2000i32..=2100, 1u32..=12)
}

/// A period together with a week count that fits it
fn period_with_weeks_strategy() -> impl Strategy<Value = (i32, u32, u32)> {
    period_strategy().prop_flat_map(|(year, month)| {
        (Just(year), Just(month), 1..=max_week_count(year, month))
    })
}

fn corrective_text_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z ]{2,40}"
}

// ============================================================================
// Property 1: Week ranges partition the month
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_week_ranges_are_contiguous((year, month, week_count) in period_with_weeks_strategy()) {
        let weeks = week_ranges(year, month, week_count);
        prop_assert_eq!(weeks.len() as u32, week_count);

        let first = weeks.first().unwrap();
        prop_assert_eq!(chrono::Datelike::day(&first.start), 1);

        let last = weeks.last().unwrap();
        let next = last.end.succ_opt().unwrap();
        prop_assert_eq!(chrono::Datelike::day(&next), 1, "last week must end on the month's last day");

        for pair in weeks.windows(2) {
            prop_assert_eq!(pair[0].end.succ_opt().unwrap(), pair[1].start);
        }
        for (i, week) in weeks.iter().enumerate() {
            prop_assert_eq!(week.number, i as u32 + 1);
            prop_assert!(week.start <= week.end);
        }
    }

    #[test]
    fn prop_oversized_week_count_yields_nothing((year, month) in period_strategy(), extra in 1u32..4) {
        let weeks = week_ranges(year, month, max_week_count(year, month) + extra);
        prop_assert!(weeks.is_empty());
    }
}

// ============================================================================
// Property 2: Weekly shares cover the monthly quantity
// ============================================================================

proptest! {
    #[test]
    fn prop_weekly_share_rounds_up(monthly in 0u32..1_000_000, week_count in 1u32..=5) {
        let weekly = weekly_quantity(monthly, week_count);
        prop_assert!(weekly * week_count >= monthly);
        prop_assert!(weekly * week_count < monthly + week_count);
    }

    #[test]
    fn prop_distribution_has_week_and_day_keys(
        (year, month, week_count) in period_with_weeks_strategy(),
        monthly in 0u32..100_000,
        days_per_week in 1u32..=7,
    ) {
        let weeks = week_ranges(year, month, week_count);
        let week = &weeks[0];
        let quantities = distribute_week(monthly, week_count, week, days_per_week);

        prop_assert_eq!(quantities.len() as u32, days_per_week + 1);
        let weekly = quantities[&week.key()];
        prop_assert_eq!(weekly, weekly_quantity(monthly, week_count));
        for day in 1..=days_per_week {
            prop_assert!(quantities[&day_key(day)] * days_per_week >= weekly);
        }
    }
}

// ============================================================================
// Property 3: Shift splits cover the daily quantity
// ============================================================================

proptest! {
    #[test]
    fn prop_shift_split_covers_quantity(quantity in 0u32..1_000_000) {
        let split = split_shifts(quantity);
        prop_assert_eq!(split.h1, split.h2);
        prop_assert!(split.total() >= quantity);
        // Each of the three shares rounds up by less than one unit
        prop_assert!(split.total() < quantity + 3);
        prop_assert!(u64::from(split.ot) * 5 >= u64::from(quantity));
    }
}

// ============================================================================
// Property 4: Action plans are required exactly below the threshold
// ============================================================================

proptest! {
    #[test]
    fn prop_threshold_matches_integer_comparison(actual in 0u32..10_000, target in 1u32..10_000) {
        let percentage = production_percentage(actual, target);
        let below = u64::from(actual) * 100 < u64::from(target) * ACHIEVEMENT_THRESHOLD as u64;
        prop_assert_eq!(requires_action_plan(percentage), below);
    }

    #[test]
    fn prop_zero_target_always_requires_action(actual in 0u32..10_000) {
        prop_assert!(requires_action_plan(production_percentage(actual, 0)));
    }

    #[test]
    fn prop_zeroed_shift_actuals_defer_to_reported_figure(actual in 0u32..10_000, target in 1u32..10_000) {
        let entry = ProductionEntry {
            target,
            h1_actual: Some(0),
            h2_actual: Some(0),
            ot_actual: Some(0),
            actual_production: Some(actual),
            ..Default::default()
        };
        prop_assert_eq!(entry.reported_actual(), Some(actual));
    }
}

// ============================================================================
// Property 5: Corrective fields satisfy report validation
// ============================================================================

proptest! {
    #[test]
    fn prop_low_entry_with_corrective_fields_is_valid(
        target in 100u32..1_000,
        shortfall in 16u32..=100,
        reason in corrective_text_strategy(),
        actions in corrective_text_strategy(),
        person in corrective_text_strategy(),
    ) {
        let actual = target * (100 - shortfall) / 100;
        let entry = ProductionEntry {
            dept_name: "Assembly".into(),
            operator_name: "Line A".into(),
            target,
            actual_production: Some(actual),
            reason: Some(reason),
            corrective_actions: Some(actions),
            responsible_person: Some(person),
            target_completion_date: Some("2025-10-15".into()),
            ..Default::default()
        };
        let percentage = validate_report_entry(&entry).unwrap();
        prop_assert!(requires_action_plan(percentage));
    }

    #[test]
    fn prop_low_entry_without_reason_is_rejected(target in 100u32..1_000, actual_pct in 0u32..85) {
        let entry = ProductionEntry {
            dept_name: "Assembly".into(),
            operator_name: "Line A".into(),
            target,
            actual_production: Some(target * actual_pct / 100),
            corrective_actions: Some("Retrain".into()),
            responsible_person: Some("Supervisor".into()),
            target_completion_date: Some("2025-10-15".into()),
            ..Default::default()
        };
        let err = validate_report_entry(&entry).unwrap_err();
        prop_assert_eq!(err.field(), "reason");
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[test]
fn test_september_split_into_four_weeks() {
    let weeks = week_ranges(2025, 9, 4);
    let keys: Vec<String> = weeks.iter().map(|w| w.key()).collect();
    assert_eq!(keys, vec!["week1-7", "week8-14", "week15-21", "week22-30"]);
    assert_eq!(weekly_quantity(1000, 4), 250);
}

#[test]
fn test_on_target_entry_needs_no_corrective_fields() {
    let entry = ProductionEntry {
        dept_name: "Assembly".into(),
        operator_name: "Line A".into(),
        target: 100,
        actual_production: Some(85),
        ..Default::default()
    };
    assert_eq!(validate_report_entry(&entry).unwrap(), 85.0);
}
