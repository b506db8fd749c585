//! Validation rules shared by plan submission paths

use thiserror::Error;

use crate::models::ProductionEntry;
use crate::planning::{
    max_week_count, production_percentage, requires_action_plan, MAX_ITEM_QUANTITY,
};

/// A production entry that cannot be accepted
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EntryValidationError {
    #[error("Entry {index}: department and operator are required")]
    MissingIdentity { index: usize },

    #[error(
        "Production for {department}/{operator} is {percentage:.2}% (below 85%): \
         {field} is required"
    )]
    MissingCorrectiveAction {
        department: String,
        operator: String,
        percentage: f64,
        field: &'static str,
    },

    #[error("Quantities for {department}/{operator} exceed the supported range")]
    QuantityOverflow { department: String, operator: String },
}

impl EntryValidationError {
    /// The request field at fault
    pub fn field(&self) -> &'static str {
        match self {
            EntryValidationError::MissingIdentity { .. } => "entries",
            EntryValidationError::MissingCorrectiveAction { field, .. } => *field,
            EntryValidationError::QuantityOverflow { .. } => "entries",
        }
    }

    fn overflow(entry: &ProductionEntry) -> Self {
        EntryValidationError::QuantityOverflow {
            department: entry.dept_name.clone(),
            operator: entry.operator_name.clone(),
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

// ============================================================================
// Plan Validation
// ============================================================================

/// Validate a plan period
pub fn validate_period(month: u32, year: i32) -> Result<(), &'static str> {
    if !(1..=12).contains(&month) {
        return Err("Month must be between 1 and 12");
    }
    if !(2000..=2100).contains(&year) {
        return Err("Year must be between 2000 and 2100");
    }
    Ok(())
}

/// Validate a week count against the month it splits
pub fn validate_week_count(week_count: u32, month: u32, year: i32) -> Result<(), &'static str> {
    if week_count == 0 {
        return Err("Week count must be at least 1");
    }
    if week_count > max_week_count(year, month) {
        return Err("Week count exceeds the number of weeks in the month");
    }
    Ok(())
}

/// Item quantities must stay within this bound so derived sums fit a `u32`
pub fn validate_item_quantity(quantity: u32) -> Result<(), &'static str> {
    if quantity > MAX_ITEM_QUANTITY {
        return Err("Quantity exceeds the supported maximum");
    }
    Ok(())
}

/// Validate the entries of a daily plan being submitted
pub fn validate_plan_entries(entries: &[ProductionEntry]) -> Result<(), EntryValidationError> {
    for (index, entry) in entries.iter().enumerate() {
        if entry.dept_name.trim().is_empty() || entry.operator_name.trim().is_empty() {
            return Err(EntryValidationError::MissingIdentity { index });
        }
        if entry.planned_total().is_none() {
            return Err(EntryValidationError::overflow(entry));
        }
    }
    Ok(())
}

// ============================================================================
// Report Validation
// ============================================================================

/// An entry below the achievement threshold must carry all four corrective
/// fields. Returns the entry's achievement percentage on success.
pub fn validate_report_entry(entry: &ProductionEntry) -> Result<f64, EntryValidationError> {
    let actual = entry
        .reported_actual()
        .ok_or_else(|| EntryValidationError::overflow(entry))?;
    let percentage = production_percentage(actual, entry.target);
    if !requires_action_plan(percentage) {
        return Ok(percentage);
    }

    let required = [
        ("reason", &entry.reason),
        ("correctiveActions", &entry.corrective_actions),
        ("responsiblePerson", &entry.responsible_person),
        ("targetCompletionDate", &entry.target_completion_date),
    ];
    if let Some(&(field, _)) = required.iter().find(|(_, value)| is_blank(value)) {
        return Err(EntryValidationError::MissingCorrectiveAction {
            department: entry.dept_name.clone(),
            operator: entry.operator_name.clone(),
            percentage,
            field,
        });
    }
    Ok(percentage)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(target: u32, actual: u32) -> ProductionEntry {
        ProductionEntry {
            dept_name: "Assembly".into(),
            operator_name: "Ravi".into(),
            target,
            actual_production: Some(actual),
            ..Default::default()
        }
    }

    // ========================================================================
    // Plan Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_period() {
        assert!(validate_period(9, 2025).is_ok());
        assert!(validate_period(0, 2025).is_err());
        assert!(validate_period(13, 2025).is_err());
        assert!(validate_period(1, 1999).is_err());
    }

    #[test]
    fn test_validate_week_count() {
        assert!(validate_week_count(4, 9, 2025).is_ok());
        assert!(validate_week_count(5, 9, 2025).is_ok());
        assert!(validate_week_count(5, 2, 2025).is_err());
        assert!(validate_week_count(0, 9, 2025).is_err());
    }

    #[test]
    fn test_validate_plan_entries_requires_identity() {
        let mut e = entry(100, 0);
        assert!(validate_plan_entries(&[e.clone()]).is_ok());
        e.operator_name = "  ".into();
        assert_eq!(
            validate_plan_entries(&[entry(1, 0), e]),
            Err(EntryValidationError::MissingIdentity { index: 1 })
        );
    }

    // ========================================================================
    // Report Validation Tests
    // ========================================================================

    #[test]
    fn test_on_target_entry_needs_nothing() {
        assert_eq!(validate_report_entry(&entry(100, 90)), Ok(90.0));
    }

    #[test]
    fn test_low_entry_names_first_missing_field() {
        let err = validate_report_entry(&entry(100, 70)).unwrap_err();
        assert_eq!(err.field(), "reason");
        let message = err.to_string();
        assert!(message.contains("Assembly/Ravi"));
        assert!(message.contains("70.00%"));
    }

    #[test]
    fn test_low_entry_with_blank_field_fails() {
        let mut e = entry(100, 70);
        e.reason = Some("Machine down".into());
        e.corrective_actions = Some("Service".into());
        e.responsible_person = Some("   ".into());
        e.target_completion_date = Some("2025-09-30".into());
        assert_eq!(validate_report_entry(&e).unwrap_err().field(), "responsiblePerson");
    }

    #[test]
    fn test_low_entry_with_all_fields_passes() {
        let mut e = entry(100, 70);
        e.reason = Some("Machine down".into());
        e.corrective_actions = Some("Service".into());
        e.responsible_person = Some("Anil".into());
        e.target_completion_date = Some("2025-09-30".into());
        assert_eq!(validate_report_entry(&e), Ok(70.0));
    }

    #[test]
    fn test_zero_target_requires_corrective_fields() {
        assert!(validate_report_entry(&entry(0, 0)).is_err());
    }

    #[test]
    fn test_zeroed_shift_actuals_fall_back_to_reported_figure() {
        // A derived report starts with every shift actual at zero
        let mut e = entry(100, 95);
        e.h1_actual = Some(0);
        e.h2_actual = Some(0);
        e.ot_actual = Some(0);
        assert_eq!(validate_report_entry(&e), Ok(95.0));
    }

    #[test]
    fn test_overflowing_quantities_are_rejected() {
        let mut e = entry(100, 0);
        e.h1_plan = u32::MAX;
        e.h2_plan = 1;
        let err = validate_plan_entries(&[e]).unwrap_err();
        assert_eq!(err.field(), "entries");

        let mut e = entry(100, 0);
        e.h1_actual = Some(u32::MAX);
        e.ot_actual = Some(1);
        assert!(matches!(
            validate_report_entry(&e),
            Err(EntryValidationError::QuantityOverflow { .. })
        ));
    }

    #[test]
    fn test_item_quantity_bound() {
        assert!(validate_item_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_item_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_shift_actuals_take_precedence() {
        let mut e = entry(100, 10);
        e.h1_actual = Some(40);
        e.h2_actual = Some(40);
        e.ot_actual = Some(10);
        assert_eq!(validate_report_entry(&e), Ok(90.0));
    }
}
