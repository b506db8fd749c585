//! HTTP handlers
//!
//! Handlers build the services they need from [`AppState`](crate::AppState),
//! check the caller's grants, and wrap results in the `{success, data}`
//! envelope. Errors render through [`AppError`](crate::error::AppError).

use axum::Json;
use shared::ApiResponse;

use crate::error::AppResult;

pub mod auth;
pub mod cron;
pub mod health;
pub mod production;
pub mod project;
pub mod rbac;
pub mod task;
pub mod tracker;

pub use auth::*;
pub use cron::*;
pub use health::*;
pub use production::*;
pub use project::*;
pub use rbac::*;
pub use task::*;
pub use tracker::*;

/// Result of a JSON handler
pub type ApiResult<T> = AppResult<Json<ApiResponse<T>>>;

pub(crate) fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

pub(crate) fn ok_with<T>(data: T, message: impl Into<String>) -> ApiResult<T> {
    Ok(Json(ApiResponse::with_message(data, message)))
}

pub(crate) fn done(message: impl Into<String>) -> ApiResult<()> {
    Ok(Json(ApiResponse::message(message)))
}
