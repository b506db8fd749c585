//! General task handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{ApiResponse, PaginatedResponse};

use super::{done, ok, ok_with, ApiResult};
use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::models::Task;
use crate::services::task::{AddCommentInput, CreateTaskInput, TaskQuery, UpdateTaskInput};
use crate::services::TaskService;
use crate::AppState;

pub async fn list_tasks(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<TaskQuery>,
) -> ApiResult<PaginatedResponse<Task>> {
    ok(TaskService::new(state.store.clone()).list(&user, query).await?)
}

pub async fn get_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(task_id): Path<String>,
) -> ApiResult<Task> {
    ok(TaskService::new(state.store.clone()).get(&user, &task_id).await?)
}

pub async fn create_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateTaskInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Task>>)> {
    check_permission(&user, "task", "create")?;
    let task = TaskService::new(state.store.clone()).create(&user, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(task, "Task created successfully")),
    ))
}

pub async fn update_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(task_id): Path<String>,
    Json(input): Json<UpdateTaskInput>,
) -> ApiResult<Task> {
    let task = TaskService::new(state.store.clone())
        .update(&user, &task_id, input)
        .await?;
    ok_with(task, "Task updated successfully")
}

pub async fn delete_task(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(task_id): Path<String>,
) -> ApiResult<()> {
    TaskService::new(state.store.clone())
        .delete(&user, &task_id)
        .await?;
    done("Task deleted successfully")
}

pub async fn add_task_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(task_id): Path<String>,
    Json(input): Json<AddCommentInput>,
) -> ApiResult<Task> {
    let task = TaskService::new(state.store.clone())
        .add_comment(&user, &task_id, input)
        .await?;
    ok_with(task, "Comment added successfully")
}
