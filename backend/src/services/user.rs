//! User accounts and role assignment

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use super::validate_input;
use crate::error::{AppError, AppResult};
use crate::models::{new_id, Role, User};
use crate::store::{Collection, DocumentStore, Filter};

/// User service for managing accounts linked to identity-provider subjects
#[derive(Clone)]
pub struct UserService {
    users: Collection<User>,
    roles: Collection<Role>,
}

/// Input for registering a user
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    #[validate(length(min = 1, message = "uid is required"))]
    pub uid: String,
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[validate(email(message = "email is invalid"))]
    pub email: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub employee_id: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub designation: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub join_date: Option<DateTime<Utc>>,
}

/// Input for an administrative update
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInput {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,
    pub phone: Option<String>,
    pub employee_id: Option<String>,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub is_active: Option<bool>,
}

/// Fields a user may change on their own profile
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub designation: Option<String>,
}

impl UserService {
    /// Create a new UserService instance
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            users: Collection::new(store.clone()),
            roles: Collection::new(store),
        }
    }

    pub async fn list(&self) -> AppResult<Vec<User>> {
        Ok(self.users.all().await?)
    }

    pub async fn get(&self, id: &str) -> AppResult<User> {
        self.users.require(id).await
    }

    pub async fn find_by_uid(&self, uid: &str) -> AppResult<Option<User>> {
        Ok(self.users.get_by_key(&format!("uid:{}", uid)).await?)
    }

    pub async fn create(&self, input: CreateUserInput) -> AppResult<User> {
        validate_input(&input)?;
        for role_id in &input.roles {
            self.roles.require(role_id).await?;
        }

        let email_taken = !self
            .users
            .find(&Filter::new().eq("email", input.email.clone()))
            .await?
            .is_empty();
        if email_taken {
            return Err(AppError::Duplicate(format!("User with email {}", input.email)));
        }

        let now = Utc::now();
        let user = User {
            id: new_id(),
            uid: input.uid,
            name: input.name,
            email: input.email,
            phone: input.phone,
            employee_id: input.employee_id,
            department: input.department,
            designation: input.designation,
            roles: input.roles,
            is_active: true,
            join_date: input.join_date.unwrap_or(now),
            last_login: None,
            created_at: now,
            updated_at: now,
        };

        let (stored, created) = self.users.insert_unique(&user).await?;
        if !created {
            return Err(AppError::Duplicate(format!("User for identity {}", stored.uid)));
        }

        tracing::info!("Created user {} ({})", stored.id, stored.email);
        Ok(stored)
    }

    pub async fn update(&self, id: &str, input: UpdateUserInput) -> AppResult<User> {
        validate_input(&input)?;
        let mut user = self.get(id).await?;

        if let Some(name) = input.name {
            user.name = name;
        }
        if let Some(phone) = input.phone {
            user.phone = Some(phone);
        }
        if let Some(employee_id) = input.employee_id {
            user.employee_id = employee_id;
        }
        if let Some(department) = input.department {
            user.department = department;
        }
        if let Some(designation) = input.designation {
            user.designation = designation;
        }
        if let Some(is_active) = input.is_active {
            user.is_active = is_active;
        }
        user.updated_at = Utc::now();

        self.users.replace(&user).await?;
        Ok(user)
    }

    pub async fn update_profile(&self, id: &str, input: UpdateProfileInput) -> AppResult<User> {
        validate_input(&input)?;
        self.update(
            id,
            UpdateUserInput {
                name: input.name,
                phone: input.phone,
                department: input.department,
                designation: input.designation,
                ..Default::default()
            },
        )
        .await
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if !self.users.delete(id).await? {
            return Err(AppError::NotFound("User".into()));
        }
        tracing::info!("Deleted user {}", id);
        Ok(())
    }

    pub async fn record_login(&self, id: &str) -> AppResult<()> {
        let mut user = self.get(id).await?;
        user.last_login = Some(Utc::now());
        self.users.replace(&user).await?;
        Ok(())
    }

    /// Roles held by a user
    pub async fn roles_of(&self, id: &str) -> AppResult<Vec<Role>> {
        let user = self.get(id).await?;
        let mut roles = Vec::with_capacity(user.roles.len());
        for role_id in &user.roles {
            if let Some(role) = self.roles.get(role_id).await? {
                roles.push(role);
            }
        }
        Ok(roles)
    }

    pub async fn assign_role(&self, user_id: &str, role_id: &str) -> AppResult<User> {
        let mut user = self.get(user_id).await?;
        let role = self.roles.require(role_id).await?;

        if user.roles.iter().any(|r| r == &role.id) {
            return Err(AppError::Duplicate(format!("Role {} on this user", role.name)));
        }

        user.roles.push(role.id);
        user.updated_at = Utc::now();
        self.users.replace(&user).await?;

        tracing::info!("Assigned role {} to user {}", role.name, user.id);
        Ok(user)
    }

    pub async fn remove_role(&self, user_id: &str, role_id: &str) -> AppResult<User> {
        let mut user = self.get(user_id).await?;
        let role = self.roles.require(role_id).await?;

        if role.is_system {
            return Err(AppError::Forbidden("Cannot remove system role".into()));
        }
        if !user.roles.iter().any(|r| r == &role.id) {
            return Err(AppError::NotFound("Role assignment".into()));
        }

        user.roles.retain(|r| r != &role.id);
        user.updated_at = Utc::now();
        self.users.replace(&user).await?;

        tracing::info!("Removed role {} from user {}", role.name, user.id);
        Ok(user)
    }

    /// Number of users holding a role
    pub async fn count_with_role(&self, role_id: &str) -> AppResult<usize> {
        Ok(self
            .users
            .all()
            .await?
            .iter()
            .filter(|u| u.roles.iter().any(|r| r == role_id))
            .count())
    }
}
