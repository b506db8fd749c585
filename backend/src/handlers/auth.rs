//! Profile and session handlers for the authenticated user

use axum::{extract::State, Json};
use serde::Serialize;

use super::{ok, ApiResult};
use crate::middleware::CurrentUser;
use crate::models::{Role, User};
use crate::services::user::UpdateProfileInput;
use crate::services::UserService;
use crate::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: User,
    pub role_details: Vec<Role>,
    pub permissions: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionsResponse {
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub is_admin: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    pub user_id: String,
    pub email: String,
    pub roles: Vec<String>,
}

/// The caller's user record with roles and permissions
pub async fn get_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<ProfileResponse> {
    let users = UserService::new(state.store.clone());
    let record = users.get(&user.user_id).await?;
    let role_details = users.roles_of(&user.user_id).await?;

    ok(ProfileResponse {
        user: record,
        role_details,
        permissions: user.permissions,
    })
}

pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<UpdateProfileInput>,
) -> ApiResult<User> {
    let updated = UserService::new(state.store.clone())
        .update_profile(&user.user_id, input)
        .await?;
    ok(updated)
}

pub async fn get_permissions(CurrentUser(user): CurrentUser) -> ApiResult<PermissionsResponse> {
    let is_admin = user.is_admin();
    ok(PermissionsResponse {
        roles: user.role_names,
        permissions: user.permissions,
        is_admin,
    })
}

/// Reaching this handler means the middleware accepted the token
pub async fn verify_token(CurrentUser(user): CurrentUser) -> ApiResult<VerifyResponse> {
    ok(VerifyResponse {
        valid: true,
        user_id: user.user_id,
        email: user.email,
        roles: user.role_names,
    })
}
