//! Request middleware

pub mod auth;

pub use auth::{auth_middleware, check_permission, check_role, AuthUser, CurrentUser};
