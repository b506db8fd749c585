//! Scheduled trigger introspection and manual invocation

use axum::extract::State;
use chrono::Utc;

use super::{ok, ok_with, ApiResult};
use crate::middleware::{check_role, CurrentUser};
use crate::models::role_names;
use crate::services::scheduler::{SchedulerStatus, TriggerOutcome};
use crate::AppState;

pub async fn cron_status(State(state): State<AppState>) -> ApiResult<SchedulerStatus> {
    ok(state.scheduler.status(Utc::now()).await)
}

/// Run the monthly trigger now
pub async fn trigger_monthly(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<TriggerOutcome> {
    check_role(&user, role_names::ADMIN)?;
    tracing::info!("Monthly trigger invoked manually by {}", user.user_id);

    let outcome = state.scheduler.trigger_at(Utc::now()).await?;
    let message = match &outcome {
        TriggerOutcome::Created { .. } => "Monthly plan created",
        TriggerOutcome::AlreadyExists { .. } => "Monthly plan already exists",
    };
    ok_with(outcome, message)
}
