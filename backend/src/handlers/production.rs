//! Production planning handlers: monthly, weekly and daily plans, daily
//! reports, action plans, capabilities and downloads

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use shared::ApiResponse;

use super::{done, ok, ok_with, ApiResult};
use crate::error::{AppError, AppResult};
use crate::middleware::{check_permission, check_role, AuthUser, CurrentUser};
use crate::models::{
    role_names, ActionPlan, DailyPlan, DailyPlanStatus, DailyReport, MonthlyPlan, TrackerTaskType,
    WeeklyPlan,
};
use crate::services::action_plan::UpdateActionPlanInput;
use crate::services::export::{self, Export, ExportFormat};
use crate::services::plans::{ClearSummary, CreateMonthlyInput};
use crate::services::report::{SubmitReportInput, SubmittedReport};
use crate::services::workflow::{
    Capabilities, DailyApproval, MonthlySubmission, RejectDailyInput, SubmitDailyInput,
    SubmitMonthlyInput, SubmitWeeklyInput, WeeklySubmission,
};
use crate::services::{ActionPlanService, PlanService, ReportService, WorkflowService};
use crate::AppState;

fn plans(state: &AppState) -> PlanService {
    PlanService::new(state.store.clone(), &state.config.workflow)
}

fn workflow(state: &AppState) -> WorkflowService {
    WorkflowService::new(state.store.clone(), &state.config.workflow)
}

fn can_read(user: &AuthUser) -> AppResult<()> {
    check_permission(user, "production", "read")
}

// ============================================================================
// Monthly plans
// ============================================================================

pub async fn list_monthly_plans(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Vec<MonthlyPlan>> {
    can_read(&user)?;
    ok(plans(&state).list_monthly().await?)
}

pub async fn get_monthly_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<MonthlyPlan> {
    can_read(&user)?;
    ok(plans(&state).get_monthly(&id).await?)
}

pub async fn create_monthly_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateMonthlyInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<MonthlyPlan>>)> {
    check_permission(&user, "production", "create")?;
    let plan = plans(&state).create_monthly(&user.user_id, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(plan, "Monthly plan created successfully")),
    ))
}

/// Complete a monthly plan; responds with the derived weekly plans
pub async fn submit_monthly_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    input: Option<Json<SubmitMonthlyInput>>,
) -> ApiResult<MonthlySubmission> {
    check_permission(&user, "production", "update")?;
    let input = input.map(|Json(i)| i).unwrap_or_default();
    let submission = workflow(&state).submit_monthly(&id, input).await?;
    ok_with(submission, "Monthly plan submitted and weekly plans created")
}

pub async fn delete_monthly_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    check_permission(&user, "production", "delete")?;
    plans(&state).delete_monthly(&id).await?;
    done("Monthly plan deleted successfully")
}

// ============================================================================
// Weekly plans
// ============================================================================

pub async fn list_weekly_plans(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Vec<WeeklyPlan>> {
    can_read(&user)?;
    ok(plans(&state).list_weekly().await?)
}

pub async fn get_weekly_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<WeeklyPlan> {
    can_read(&user)?;
    ok(plans(&state).get_weekly(&id).await?)
}

pub async fn weekly_plans_for_monthly(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(monthly_plan_id): Path<String>,
) -> ApiResult<Vec<WeeklyPlan>> {
    can_read(&user)?;
    ok(plans(&state).weekly_for_monthly(&monthly_plan_id).await?)
}

pub async fn submit_weekly_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    input: Option<Json<SubmitWeeklyInput>>,
) -> ApiResult<WeeklySubmission> {
    check_permission(&user, "production", "update")?;
    let input = input.map(|Json(i)| i).unwrap_or_default();
    let submission = workflow(&state).submit_weekly(&id, input).await?;
    ok_with(submission, "Weekly plan submitted and daily plans created")
}

pub async fn delete_weekly_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    check_permission(&user, "production", "delete")?;
    plans(&state).delete_weekly(&id).await?;
    done("Weekly plan deleted successfully")
}

// ============================================================================
// Daily plans
// ============================================================================

pub async fn list_daily_plans(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Vec<DailyPlan>> {
    can_read(&user)?;
    ok(plans(&state).list_daily().await?)
}

pub async fn get_daily_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<DailyPlan> {
    can_read(&user)?;
    ok(plans(&state).get_daily(&id).await?)
}

pub async fn daily_plans_for_weekly(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(weekly_plan_id): Path<String>,
) -> ApiResult<Vec<DailyPlan>> {
    can_read(&user)?;
    ok(plans(&state).daily_for_weekly(&weekly_plan_id).await?)
}

pub async fn daily_plans_by_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(status): Path<String>,
) -> ApiResult<Vec<DailyPlan>> {
    can_read(&user)?;
    let status: DailyPlanStatus = status
        .parse()
        .map_err(|e: String| AppError::validation("status", e))?;
    ok(plans(&state).daily_by_status(status).await?)
}

/// Fill a daily plan's entries and send it for review
pub async fn submit_daily_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<SubmitDailyInput>,
) -> ApiResult<DailyPlan> {
    check_permission(&user, "production", "update")?;
    let plan = workflow(&state).submit_daily(&id, input).await?;
    ok_with(plan, "Daily plan submitted for approval")
}

pub async fn approve_daily_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<DailyApproval> {
    check_permission(&user, "production", "approve")?;
    let approval = workflow(&state).approve_daily(&user, &id).await?;
    ok_with(approval, "Daily plan approved and daily report created")
}

pub async fn reject_daily_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<RejectDailyInput>,
) -> ApiResult<DailyPlan> {
    check_permission(&user, "production", "approve")?;
    let plan = workflow(&state).reject_daily(&user, &id, input).await?;
    ok_with(plan, "Daily plan rejected")
}

pub async fn delete_daily_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    check_permission(&user, "production", "delete")?;
    plans(&state).delete_daily(&id).await?;
    done("Daily plan deleted successfully")
}

// ============================================================================
// Daily reports
// ============================================================================

pub async fn list_daily_reports(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Vec<DailyReport>> {
    can_read(&user)?;
    ok(plans(&state).list_reports().await?)
}

pub async fn get_daily_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<DailyReport> {
    can_read(&user)?;
    ok(plans(&state).get_report(&id).await?)
}

pub async fn report_for_daily_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(daily_plan_id): Path<String>,
) -> ApiResult<DailyReport> {
    can_read(&user)?;
    ok(plans(&state).report_for_daily(&daily_plan_id).await?)
}

/// Record actual production; low-achievement entries yield action plans
pub async fn submit_daily_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<SubmitReportInput>,
) -> ApiResult<SubmittedReport> {
    check_permission(&user, "production", "update")?;
    let service = ReportService::new(
        state.store.clone(),
        ActionPlanService::new(state.store.clone()),
    );
    let submitted = service.submit(&id, input).await?;
    let message = match submitted.action_plans.len() {
        0 => "Daily report submitted".to_string(),
        n => format!("Daily report submitted; {} action plan(s) created", n),
    };
    ok_with(submitted, message)
}

pub async fn delete_daily_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    check_permission(&user, "production", "delete")?;
    plans(&state).delete_report(&id).await?;
    done("Daily report deleted successfully")
}

// ============================================================================
// Action plans
// ============================================================================

pub async fn list_action_plans(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Vec<ActionPlan>> {
    can_read(&user)?;
    ok(ActionPlanService::new(state.store.clone()).list().await?)
}

pub async fn get_action_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<ActionPlan> {
    can_read(&user)?;
    ok(ActionPlanService::new(state.store.clone()).get(&id).await?)
}

pub async fn action_plans_for_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(daily_report_id): Path<String>,
) -> ApiResult<Vec<ActionPlan>> {
    can_read(&user)?;
    ok(ActionPlanService::new(state.store.clone())
        .by_report(&daily_report_id)
        .await?)
}

pub async fn update_action_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(input): Json<UpdateActionPlanInput>,
) -> ApiResult<ActionPlan> {
    check_permission(&user, "production", "update")?;
    let plan = ActionPlanService::new(state.store.clone())
        .update(&id, input)
        .await?;
    ok_with(plan, "Action plan updated successfully")
}

// ============================================================================
// Capabilities
// ============================================================================

async fn capabilities(state: &AppState, user: &AuthUser, level: TrackerTaskType, id: &str) -> ApiResult<Capabilities> {
    ok(workflow(state).capabilities(user, level, id).await?)
}

pub async fn monthly_capabilities(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Capabilities> {
    capabilities(&state, &user, TrackerTaskType::Monthly, &id).await
}

pub async fn weekly_capabilities(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Capabilities> {
    capabilities(&state, &user, TrackerTaskType::Weekly, &id).await
}

pub async fn daily_capabilities(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Capabilities> {
    capabilities(&state, &user, TrackerTaskType::Daily, &id).await
}

pub async fn report_capabilities(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Capabilities> {
    capabilities(&state, &user, TrackerTaskType::Report, &id).await
}

// ============================================================================
// Downloads
// ============================================================================

fn attachment(export: Export) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", export.filename);
    (
        [
            (header::CONTENT_TYPE, export.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.body,
    )
        .into_response()
}

/// Parse the format segment and fail early for formats rendered elsewhere
fn requested_format(user: &AuthUser, format: &str) -> AppResult<ExportFormat> {
    can_read(user)?;
    let format: ExportFormat = format.parse()?;
    export::ensure_supported(format)?;
    Ok(format)
}

pub async fn download_monthly_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, format)): Path<(String, String)>,
) -> AppResult<Response> {
    requested_format(&user, &format)?;
    let plan = plans(&state).get_monthly(&id).await?;
    Ok(attachment(export::monthly_csv(&plan)?))
}

pub async fn download_weekly_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, format)): Path<(String, String)>,
) -> AppResult<Response> {
    requested_format(&user, &format)?;
    let plan = plans(&state).get_weekly(&id).await?;
    Ok(attachment(export::weekly_csv(&plan)?))
}

pub async fn download_daily_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, format)): Path<(String, String)>,
) -> AppResult<Response> {
    requested_format(&user, &format)?;
    let plan = plans(&state).get_daily(&id).await?;
    Ok(attachment(export::daily_csv(&plan)?))
}

pub async fn download_daily_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, format)): Path<(String, String)>,
) -> AppResult<Response> {
    requested_format(&user, &format)?;
    let report = plans(&state).get_report(&id).await?;
    Ok(attachment(export::report_csv(&report)?))
}

// ============================================================================
// Maintenance
// ============================================================================

/// Remove every plan, report, action plan and tracker task
pub async fn clear_production_data(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<ClearSummary> {
    check_role(&user, role_names::ADMIN)?;
    tracing::warn!("Production data cleared by {}", user.user_id);
    let summary = plans(&state).clear_all().await?;
    ok_with(summary, "All production data cleared")
}
