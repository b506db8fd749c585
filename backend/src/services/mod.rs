//! Business logic services for the production planning platform

pub mod action_plan;
pub mod cascade;
pub mod export;
pub mod plans;
pub mod project;
pub mod report;
pub mod role;
pub mod scheduler;
pub mod task;
pub mod tracker;
pub mod user;
pub mod workflow;

pub use action_plan::ActionPlanService;
pub use cascade::CascadeService;
pub use plans::PlanService;
pub use project::ProjectService;
pub use report::ReportService;
pub use role::RoleService;
pub use scheduler::MonthlyScheduler;
pub use task::TaskService;
pub use tracker::TrackerService;
pub use user::UserService;
pub use workflow::WorkflowService;

use validator::Validate;

use crate::error::{AppError, AppResult};

/// Run derive-based validation, reporting the first offending field
pub(crate) fn validate_input<T: Validate>(input: &T) -> AppResult<()> {
    input.validate().map_err(|errors| {
        let field_errors = errors.field_errors();
        let mut fields: Vec<_> = field_errors.iter().collect();
        fields.sort_by_key(|(field, _)| **field);

        match fields.first() {
            Some((field, errs)) => {
                let message = errs
                    .iter()
                    .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("{} is invalid", field));
                AppError::validation(field.to_string(), message)
            }
            None => AppError::ValidationError(errors.to_string()),
        }
    })
}

/// Reject blank required text
pub(crate) fn require_text(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(field, format!("{} is required", field)));
    }
    Ok(())
}
