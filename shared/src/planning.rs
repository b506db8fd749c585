//! Planning arithmetic: calendar ranges and quantity distribution
//!
//! Everything here is pure so that the cascade in the backend stays a thin
//! layer of persistence around these functions.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::ProductionItem;

/// Entries achieving less than this percentage of target need an action plan
pub const ACHIEVEMENT_THRESHOLD: f64 = 85.0;

/// Calendar days spanned by one planning week
pub const WEEK_SPAN_DAYS: u32 = 7;

/// Largest quantity accepted on a plan item
pub const MAX_ITEM_QUANTITY: u32 = 1_000_000_000;

// ============================================================================
// Calendar
// ============================================================================

/// Number of days in the given month, `None` for an invalid month
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let (next_year, next_month) = next_period(year, month);
    let next_first = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
    Some((next_first - first).num_days() as u32)
}

/// The largest week count a month supports: every week must start inside it
pub fn max_week_count(year: i32, month: u32) -> u32 {
    days_in_month(year, month)
        .map(|days| days.div_ceil(WEEK_SPAN_DAYS))
        .unwrap_or(0)
}

/// (year, month) following the given one
pub fn next_period(year: i32, month: u32) -> (i32, u32) {
    if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

pub fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "Unknown",
    }
}

/// Calendar span of one week within a monthly plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekRange {
    pub number: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekRange {
    /// `week<startDay>-<endDay>`
    pub fn key(&self) -> String {
        format!("week{}-{}", self.start.day(), self.end.day())
    }

    /// Date of the n-th (1-based) working day of this week
    pub fn day(&self, day_number: u32) -> NaiveDate {
        self.start + Duration::days(i64::from(day_number.saturating_sub(1)))
    }
}

/// Week `week_number` of `week_count`: days [(N-1)*7+1 .. N*7], with the
/// final week running to month end.
pub fn week_range(year: i32, month: u32, week_number: u32, week_count: u32) -> Option<WeekRange> {
    if week_number == 0 || week_number > week_count {
        return None;
    }
    let days = days_in_month(year, month)?;
    let start_day = (week_number - 1) * WEEK_SPAN_DAYS + 1;
    if start_day > days {
        return None;
    }
    let end_day = if week_number == week_count {
        days
    } else {
        (week_number * WEEK_SPAN_DAYS).min(days)
    };

    Some(WeekRange {
        number: week_number,
        start: NaiveDate::from_ymd_opt(year, month, start_day)?,
        end: NaiveDate::from_ymd_opt(year, month, end_day)?,
    })
}

/// All week ranges of a month; empty if `week_count` does not fit the month
pub fn week_ranges(year: i32, month: u32, week_count: u32) -> Vec<WeekRange> {
    if week_count == 0 || week_count > max_week_count(year, month) {
        return Vec::new();
    }
    (1..=week_count)
        .filter_map(|n| week_range(year, month, n, week_count))
        .collect()
}

// ============================================================================
// Quantity distribution
// ============================================================================

/// Equal share of a monthly quantity for one week, rounded up
pub fn weekly_quantity(monthly_quantity: u32, week_count: u32) -> u32 {
    if week_count == 0 {
        return 0;
    }
    monthly_quantity.div_ceil(week_count)
}

pub fn day_key(day_number: u32) -> String {
    format!("day{}", day_number)
}

/// The `weeklyQuantities` map of an item derived into a weekly plan: the week
/// total under its range key plus the per-day share under `day<N>`.
pub fn distribute_week(
    monthly_quantity: u32,
    week_count: u32,
    week: &WeekRange,
    days_per_week: u32,
) -> BTreeMap<String, u32> {
    let weekly = weekly_quantity(monthly_quantity, week_count);
    let per_day = if days_per_week == 0 {
        0
    } else {
        weekly.div_ceil(days_per_week)
    };

    let mut quantities = BTreeMap::new();
    quantities.insert(week.key(), weekly);
    for day in 1..=days_per_week {
        quantities.insert(day_key(day), per_day);
    }
    quantities
}

/// Quantity of an item for one day, falling back to an even split of the
/// monthly quantity over `fallback_days` when the item carries no per-day share.
pub fn daily_quantity(item: &ProductionItem, day_number: u32, fallback_days: u32) -> u32 {
    item.weekly_quantities
        .get(&day_key(day_number))
        .copied()
        .unwrap_or_else(|| {
            if fallback_days == 0 {
                0
            } else {
                item.monthly_quantity.div_ceil(fallback_days)
            }
        })
}

/// Planned output split across first half, second half and overtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftSplit {
    pub h1: u32,
    pub h2: u32,
    pub ot: u32,
}

impl ShiftSplit {
    /// Saturates at `u32::MAX`; quantities below [`MAX_ITEM_QUANTITY`] never reach it
    pub fn total(&self) -> u32 {
        self.h1.saturating_add(self.h2).saturating_add(self.ot)
    }
}

/// 40% / 40% / 20% of the day's quantity, each rounded up
pub fn split_shifts(quantity: u32) -> ShiftSplit {
    let q = u64::from(quantity);
    let forty = (q * 2).div_ceil(5) as u32;
    let twenty = q.div_ceil(5) as u32;
    ShiftSplit {
        h1: forty,
        h2: forty,
        ot: twenty,
    }
}

// ============================================================================
// Achievement
// ============================================================================

/// actual / target * 100; zero when there is no target
pub fn production_percentage(actual: u32, target: u32) -> f64 {
    if target == 0 {
        return 0.0;
    }
    f64::from(actual) * 100.0 / f64::from(target)
}

/// Rounded to two decimals for storage
pub fn round_percentage(percentage: f64) -> f64 {
    (percentage * 100.0).round() / 100.0
}

pub fn requires_action_plan(percentage: f64) -> bool {
    percentage < ACHIEVEMENT_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Calendar Tests
    // ========================================================================

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2025, 9), Some(30));
        assert_eq!(days_in_month(2024, 2), Some(29));
        assert_eq!(days_in_month(2025, 2), Some(28));
        assert_eq!(days_in_month(2025, 12), Some(31));
        assert_eq!(days_in_month(2025, 13), None);
    }

    #[test]
    fn test_max_week_count() {
        assert_eq!(max_week_count(2025, 2), 4);
        assert_eq!(max_week_count(2025, 9), 5);
        assert_eq!(max_week_count(2025, 0), 0);
    }

    #[test]
    fn test_next_period_rolls_year() {
        assert_eq!(next_period(2025, 12), (2026, 1));
        assert_eq!(next_period(2025, 4), (2025, 5));
    }

    #[test]
    fn test_week_ranges_last_week_runs_to_month_end() {
        let weeks = week_ranges(2025, 9, 4);
        assert_eq!(weeks.len(), 4);
        assert_eq!(weeks[0].key(), "week1-7");
        assert_eq!(weeks[2].key(), "week15-21");
        assert_eq!(weeks[3].key(), "week22-30");
    }

    #[test]
    fn test_week_ranges_five_weeks() {
        let weeks = week_ranges(2025, 10, 5);
        assert_eq!(weeks.last().map(|w| w.key()), Some("week29-31".to_string()));
    }

    #[test]
    fn test_week_ranges_reject_oversized_count() {
        assert!(week_ranges(2025, 2, 5).is_empty());
        assert!(week_ranges(2025, 2, 0).is_empty());
    }

    #[test]
    fn test_week_day_dates() {
        let week = week_range(2025, 9, 2, 4).unwrap();
        assert_eq!(week.day(1), NaiveDate::from_ymd_opt(2025, 9, 8).unwrap());
        assert_eq!(week.day(7), NaiveDate::from_ymd_opt(2025, 9, 14).unwrap());
    }

    // ========================================================================
    // Quantity Tests
    // ========================================================================

    #[test]
    fn test_weekly_quantity_rounds_up() {
        assert_eq!(weekly_quantity(1000, 4), 250);
        assert_eq!(weekly_quantity(1001, 4), 251);
        assert_eq!(weekly_quantity(10, 0), 0);
    }

    #[test]
    fn test_distribute_week() {
        let week = week_range(2025, 9, 1, 4).unwrap();
        let quantities = distribute_week(1000, 4, &week, 7);
        assert_eq!(quantities.get("week1-7"), Some(&250));
        assert_eq!(quantities.get("day1"), Some(&36));
        assert_eq!(quantities.get("day7"), Some(&36));
        assert_eq!(quantities.len(), 8);

        let six = distribute_week(1000, 4, &week, 6);
        assert_eq!(six.get("day6"), Some(&42));
        assert!(six.get("day7").is_none());
    }

    #[test]
    fn test_daily_quantity_fallback() {
        let mut item = ProductionItem {
            id: "i".into(),
            item_code: "TEST001".into(),
            item_name: "Widget".into(),
            customer_name: "ACME".into(),
            monthly_quantity: 1000,
            weekly_quantities: BTreeMap::new(),
        };
        assert_eq!(daily_quantity(&item, 1, 28), 36);
        item.weekly_quantities.insert("day1".into(), 50);
        assert_eq!(daily_quantity(&item, 1, 28), 50);
    }

    #[test]
    fn test_split_shifts() {
        assert_eq!(split_shifts(100), ShiftSplit { h1: 40, h2: 40, ot: 20 });
        assert_eq!(split_shifts(36), ShiftSplit { h1: 15, h2: 15, ot: 8 });
        assert_eq!(split_shifts(0).total(), 0);
    }

    // ========================================================================
    // Achievement Tests
    // ========================================================================

    #[test]
    fn test_production_percentage() {
        assert_eq!(production_percentage(70, 100), 70.0);
        assert_eq!(production_percentage(5, 0), 0.0);
        assert_eq!(round_percentage(production_percentage(2, 3)), 66.67);
    }

    #[test]
    fn test_threshold_boundary() {
        assert!(requires_action_plan(84.99));
        assert!(!requires_action_plan(85.0));
        assert!(requires_action_plan(0.0));
    }
}
