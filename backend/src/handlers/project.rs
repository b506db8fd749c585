//! Project handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{ApiResponse, PaginatedResponse};

use super::{done, ok, ok_with, ApiResult};
use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::models::{Project, Task};
use crate::services::project::{AddMemberInput, CreateProjectInput, ProjectQuery, UpdateProjectInput};
use crate::services::ProjectService;
use crate::AppState;

pub async fn list_projects(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ProjectQuery>,
) -> ApiResult<PaginatedResponse<Project>> {
    ok(ProjectService::new(state.store.clone())
        .list(&user, query)
        .await?)
}

pub async fn get_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
) -> ApiResult<Project> {
    ok(ProjectService::new(state.store.clone())
        .get(&user, &project_id)
        .await?)
}

pub async fn create_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateProjectInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Project>>)> {
    check_permission(&user, "project", "create")?;
    let project = ProjectService::new(state.store.clone())
        .create(&user, input)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(project, "Project created successfully")),
    ))
}

pub async fn update_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
    Json(input): Json<UpdateProjectInput>,
) -> ApiResult<Project> {
    let project = ProjectService::new(state.store.clone())
        .update(&user, &project_id, input)
        .await?;
    ok_with(project, "Project updated successfully")
}

pub async fn delete_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
) -> ApiResult<()> {
    ProjectService::new(state.store.clone())
        .delete(&user, &project_id)
        .await?;
    done("Project deleted successfully")
}

pub async fn add_project_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
    Json(input): Json<AddMemberInput>,
) -> ApiResult<Project> {
    let project = ProjectService::new(state.store.clone())
        .add_member(&user, &project_id, input)
        .await?;
    ok_with(project, "Member added successfully")
}

pub async fn remove_project_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((project_id, member_id)): Path<(String, String)>,
) -> ApiResult<Project> {
    let project = ProjectService::new(state.store.clone())
        .remove_member(&user, &project_id, &member_id)
        .await?;
    ok_with(project, "Member removed successfully")
}

pub async fn get_project_tasks(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_id): Path<String>,
) -> ApiResult<Vec<Task>> {
    ok(ProjectService::new(state.store.clone())
        .tasks(&user, &project_id)
        .await?)
}
