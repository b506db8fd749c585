//! Production tracker handlers
//!
//! The caller's roles decide which tracker tasks are returned.

use axum::extract::{Path, State};

use super::{done, ok, ApiResult};
use crate::error::AppError;
use crate::middleware::{check_permission, CurrentUser};
use crate::models::{ProductionTask, TrackerStatus, TrackerTaskType};
use crate::services::TrackerService;
use crate::AppState;

pub async fn list_production_tasks(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Vec<ProductionTask>> {
    check_permission(&user, "production", "read")?;
    ok(TrackerService::new(state.store.clone())
        .list(user.task_audience())
        .await?)
}

pub async fn production_tasks_by_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(status): Path<String>,
) -> ApiResult<Vec<ProductionTask>> {
    check_permission(&user, "production", "read")?;
    let status: TrackerStatus = status
        .parse()
        .map_err(|e: String| AppError::validation("status", e))?;
    ok(TrackerService::new(state.store.clone())
        .by_status(user.task_audience(), status)
        .await?)
}

pub async fn production_tasks_by_type(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(task_type): Path<String>,
) -> ApiResult<Vec<ProductionTask>> {
    check_permission(&user, "production", "read")?;
    let task_type: TrackerTaskType = task_type
        .parse()
        .map_err(|e: String| AppError::validation("type", e))?;
    ok(TrackerService::new(state.store.clone())
        .by_type(user.task_audience(), task_type)
        .await?)
}

pub async fn production_tasks_by_assignee(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<ProductionTask>> {
    check_permission(&user, "production", "read")?;
    ok(TrackerService::new(state.store.clone())
        .by_assignee(user.task_audience(), &user_id)
        .await?)
}

pub async fn get_production_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(task_id): Path<String>,
) -> ApiResult<ProductionTask> {
    check_permission(&user, "production", "read")?;
    let task = TrackerService::new(state.store.clone()).get(&task_id).await?;
    if !user.task_audience().can_see(&task) {
        return Err(AppError::NotFound("Production task".into()));
    }
    ok(task)
}

pub async fn delete_production_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(task_id): Path<String>,
) -> ApiResult<()> {
    check_permission(&user, "production", "delete")?;
    TrackerService::new(state.store.clone())
        .delete(&task_id)
        .await?;
    done("Production task deleted successfully")
}
