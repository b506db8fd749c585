//! Identity gate
//!
//! Verifies the bearer token with the identity provider, resolves the internal
//! user record, and attaches its roles and permissions to the request.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{Duration, Utc};

use crate::error::{AppError, AppResult};
use crate::models::{permission_key, role_names, TaskAudience};
use crate::services::{RoleService, UserService};
use crate::AppState;

/// Authenticated user information resolved from the bearer token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: String,
    pub uid: String,
    pub email: String,
    pub name: String,
    pub role_ids: Vec<String>,
    pub role_names: Vec<String>,
    /// `resource:action` strings
    pub permissions: Vec<String>,
}

impl AuthUser {
    /// Check if user has a specific permission
    pub fn has_permission(&self, resource: &str, action: &str) -> bool {
        let permission = permission_key(resource, action);
        self.permissions.contains(&permission)
    }

    /// Check if user has any of the specified permissions
    pub fn has_any_permission(&self, perms: &[(&str, &str)]) -> bool {
        perms.iter().any(|(r, a)| self.has_permission(r, a))
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.role_names.iter().any(|r| r == name)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(role_names::ADMIN)
    }

    /// Which slice of the tracker this user is shown
    pub fn task_audience(&self) -> TaskAudience {
        if self.is_admin() || self.has_role(role_names::PLANT_HEAD) {
            TaskAudience::PlantHead
        } else if self.has_role(role_names::PRODUCTION_MANAGER) {
            TaskAudience::ProductionManager
        } else {
            TaskAudience::Unrestricted
        }
    }
}

/// Authentication middleware guarding every protected router
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return AppError::Unauthorized("No token provided".into()).into_response();
    };

    match authenticate(&state, bearer.token()).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

/// Resolve a bearer token to an active user with its grants
pub async fn authenticate(state: &AppState, token: &str) -> AppResult<AuthUser> {
    let identity = state
        .identity
        .verify(token)
        .await
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let users = UserService::new(state.store.clone());
    let user = users
        .find_by_uid(&identity.uid)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not registered".into()))?;

    if !user.is_active {
        return Err(AppError::Unauthorized("User account is deactivated".into()));
    }

    let grants = RoleService::new(state.store.clone())
        .resolve_grants(&user.roles)
        .await?;

    let stale = user
        .last_login
        .map_or(true, |at| Utc::now() - at > Duration::minutes(15));
    if stale {
        if let Err(e) = users.record_login(&user.id).await {
            tracing::warn!("Failed to record login for {}: {}", user.id, e);
        }
    }

    Ok(AuthUser {
        user_id: user.id,
        uid: user.uid,
        email: user.email,
        name: user.name,
        role_ids: user.roles,
        role_names: grants.role_names,
        permissions: grants.permissions,
    })
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))
    }
}

/// Permission guard for use in handlers
pub fn check_permission(user: &AuthUser, resource: &str, action: &str) -> AppResult<()> {
    if user.has_permission(resource, action) {
        Ok(())
    } else {
        Err(AppError::InsufficientPermissions)
    }
}

/// Role guard for use in handlers
pub fn check_role(user: &AuthUser, role: &str) -> AppResult<()> {
    if user.has_role(role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("requires the {} role", role)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(roles: &[&str], permissions: &[&str]) -> AuthUser {
        AuthUser {
            user_id: "u1".into(),
            uid: "uid-1".into(),
            email: "u1@plant.test".into(),
            name: "U One".into(),
            role_ids: roles.iter().map(|r| r.to_string()).collect(),
            role_names: roles.iter().map(|r| r.to_string()).collect(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_permission_checks() {
        let u = user(&["employee"], &["task:read", "task:update"]);
        assert!(u.has_permission("task", "read"));
        assert!(!u.has_permission("production", "approve"));
        assert!(u.has_any_permission(&[("production", "read"), ("task", "update")]));
        assert!(check_permission(&u, "role", "delete").is_err());
    }

    #[test]
    fn test_task_audience_from_roles() {
        assert_eq!(user(&["admin"], &[]).task_audience(), TaskAudience::PlantHead);
        assert_eq!(user(&["plant_head"], &[]).task_audience(), TaskAudience::PlantHead);
        assert_eq!(
            user(&["production_manager"], &[]).task_audience(),
            TaskAudience::ProductionManager
        );
        assert_eq!(user(&["employee"], &[]).task_audience(), TaskAudience::Unrestricted);
    }
}
