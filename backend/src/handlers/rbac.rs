//! Role, permission and user administration handlers
//!
//! Every handler here requires the admin role.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::ApiResponse;

use super::{done, ok, ok_with, ApiResult};
use crate::error::AppResult;
use crate::middleware::{check_role, AuthUser, CurrentUser};
use crate::models::{role_names, Permission, Role, User};
use crate::services::role::{
    CreatePermissionInput, CreateRoleInput, InitSummary, RoleWithPermissions, UpdateRoleInput,
};
use crate::services::user::{CreateUserInput, UpdateUserInput};
use crate::services::{RoleService, UserService};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRoleInput {
    pub role_id: String,
}

fn require_admin(user: &AuthUser) -> AppResult<()> {
    check_role(user, role_names::ADMIN)
}

// ============================================================================
// Roles
// ============================================================================

pub async fn list_roles(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Vec<Role>> {
    require_admin(&user)?;
    ok(RoleService::new(state.store.clone()).get_roles().await?)
}

pub async fn get_role(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(role_id): Path<String>,
) -> ApiResult<RoleWithPermissions> {
    require_admin(&user)?;
    ok(RoleService::new(state.store.clone())
        .get_role_with_permissions(&role_id)
        .await?)
}

pub async fn create_role(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateRoleInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<RoleWithPermissions>>)> {
    require_admin(&user)?;
    let role = RoleService::new(state.store.clone()).create_role(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(role, "Role created successfully")),
    ))
}

pub async fn update_role(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(role_id): Path<String>,
    Json(input): Json<UpdateRoleInput>,
) -> ApiResult<RoleWithPermissions> {
    require_admin(&user)?;
    let role = RoleService::new(state.store.clone())
        .update_role(&role_id, input)
        .await?;
    ok_with(role, "Role updated successfully")
}

pub async fn delete_role(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(role_id): Path<String>,
) -> ApiResult<()> {
    require_admin(&user)?;
    RoleService::new(state.store.clone())
        .delete_role(&role_id)
        .await?;
    done("Role deleted successfully")
}

// ============================================================================
// Permissions
// ============================================================================

pub async fn list_permissions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Vec<Permission>> {
    require_admin(&user)?;
    ok(RoleService::new(state.store.clone())
        .get_all_permissions()
        .await?)
}

pub async fn get_permission(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(permission_id): Path<String>,
) -> ApiResult<Permission> {
    require_admin(&user)?;
    ok(RoleService::new(state.store.clone())
        .get_permission(&permission_id)
        .await?)
}

pub async fn create_permission(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreatePermissionInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Permission>>)> {
    require_admin(&user)?;
    let permission = RoleService::new(state.store.clone())
        .create_permission(input)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(permission))))
}

// ============================================================================
// Users
// ============================================================================

pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Vec<User>> {
    require_admin(&user)?;
    ok(UserService::new(state.store.clone()).list().await?)
}

pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<String>,
) -> ApiResult<User> {
    require_admin(&user)?;
    ok(UserService::new(state.store.clone()).get(&user_id).await?)
}

pub async fn create_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateUserInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    require_admin(&user)?;
    let created = UserService::new(state.store.clone()).create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(created, "User created successfully")),
    ))
}

pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<String>,
    Json(input): Json<UpdateUserInput>,
) -> ApiResult<User> {
    require_admin(&user)?;
    let updated = UserService::new(state.store.clone())
        .update(&user_id, input)
        .await?;
    ok_with(updated, "User updated successfully")
}

pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<String>,
) -> ApiResult<()> {
    require_admin(&user)?;
    UserService::new(state.store.clone()).delete(&user_id).await?;
    done("User deleted successfully")
}

// ============================================================================
// User roles
// ============================================================================

pub async fn get_user_roles(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<Role>> {
    require_admin(&user)?;
    ok(UserService::new(state.store.clone()).roles_of(&user_id).await?)
}

pub async fn assign_user_role(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<String>,
    Json(input): Json<AssignRoleInput>,
) -> ApiResult<User> {
    require_admin(&user)?;
    let updated = UserService::new(state.store.clone())
        .assign_role(&user_id, &input.role_id)
        .await?;
    ok_with(updated, "Role assigned successfully")
}

pub async fn remove_user_role(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((user_id, role_id)): Path<(String, String)>,
) -> ApiResult<User> {
    require_admin(&user)?;
    let updated = UserService::new(state.store.clone())
        .remove_role(&user_id, &role_id)
        .await?;
    ok_with(updated, "Role removed successfully")
}

/// Seed default permissions, system roles and the bootstrap admin
pub async fn initialize_system(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<InitSummary> {
    require_admin(&user)?;
    let summary = RoleService::new(state.store.clone())
        .initialize_system(&state.config.bootstrap)
        .await?;
    ok_with(summary, "System initialized")
}
