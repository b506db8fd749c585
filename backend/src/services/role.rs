//! Role management service for roles, permissions, and system seeding

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{validate_input, UserService};
use crate::config::BootstrapConfig;
use crate::error::{AppError, AppResult};
use crate::models::{default_permissions, default_roles, permission_key, role_names, Permission, Role, User};
use crate::store::{Collection, DocumentStore, StoreError};

/// Role service for managing roles and their permissions
#[derive(Clone)]
pub struct RoleService {
    store: Arc<dyn DocumentStore>,
    roles: Collection<Role>,
    permissions: Collection<Permission>,
}

/// Input for creating a role
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleInput {
    #[validate(length(min = 1, max = 50, message = "name must be 1-50 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Permission ids
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Input for updating a role
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleInput {
    #[validate(length(min = 1, max = 50, message = "name must be 1-50 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

/// Input for creating a permission
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePermissionInput {
    #[validate(length(min = 1, message = "resource is required"))]
    pub resource: String,
    #[validate(length(min = 1, message = "action is required"))]
    pub action: String,
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// Role with its permissions expanded
#[derive(Debug, Serialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    #[serde(rename = "permissionDetails")]
    pub permission_details: Vec<Permission>,
}

/// What a set of role ids grants
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grants {
    pub role_names: Vec<String>,
    /// `resource:action` strings, deduplicated
    pub permissions: Vec<String>,
}

/// Counts from a system initialisation run
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitSummary {
    pub permissions_created: usize,
    pub roles_created: usize,
    pub admin_created: bool,
}

impl RoleService {
    /// Create a new RoleService instance
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            roles: Collection::new(store.clone()),
            permissions: Collection::new(store.clone()),
            store,
        }
    }

    /// All roles, system roles first
    pub async fn get_roles(&self) -> AppResult<Vec<Role>> {
        let mut roles = self.roles.all().await?;
        roles.sort_by(|a, b| b.is_system.cmp(&a.is_system).then_with(|| a.name.cmp(&b.name)));
        Ok(roles)
    }

    /// Get a role by ID with its permissions
    pub async fn get_role_with_permissions(&self, role_id: &str) -> AppResult<RoleWithPermissions> {
        let role = self.roles.require(role_id).await?;
        let mut permission_details = Vec::with_capacity(role.permissions.len());
        for id in &role.permissions {
            if let Some(permission) = self.permissions.get(id).await? {
                permission_details.push(permission);
            }
        }
        Ok(RoleWithPermissions {
            role,
            permission_details,
        })
    }

    /// Get all available permissions
    pub async fn get_all_permissions(&self) -> AppResult<Vec<Permission>> {
        let mut permissions = self.permissions.all().await?;
        permissions.sort_by(|a, b| (&a.resource, &a.action).cmp(&(&b.resource, &b.action)));
        Ok(permissions)
    }

    pub async fn get_permission(&self, id: &str) -> AppResult<Permission> {
        self.permissions.require(id).await
    }

    pub async fn create_permission(&self, input: CreatePermissionInput) -> AppResult<Permission> {
        validate_input(&input)?;
        let now = Utc::now();
        let key = permission_key(&input.resource, &input.action);
        let permission = Permission {
            id: key.clone(),
            name: input.name.unwrap_or_else(|| key.clone()),
            description: input.description,
            resource: input.resource,
            action: input.action,
            created_at: now,
            updated_at: now,
        };

        let (stored, created) = self.permissions.insert_unique(&permission).await?;
        if !created {
            return Err(AppError::Duplicate(format!("Permission {}", stored.key())));
        }
        Ok(stored)
    }

    /// Create a custom role
    pub async fn create_role(&self, input: CreateRoleInput) -> AppResult<RoleWithPermissions> {
        validate_input(&input)?;
        self.ensure_name_free(&input.name, None).await?;
        self.validate_permission_ids(&input.permissions).await?;

        let now = Utc::now();
        let role = Role {
            id: crate::models::new_id(),
            name: input.name,
            description: input.description,
            permissions: input.permissions,
            is_system: false,
            created_at: now,
            updated_at: now,
        };
        self.roles.insert(&role).await?;

        tracing::info!("Created role {} ({})", role.name, role.id);
        self.get_role_with_permissions(&role.id).await
    }

    /// Update a role; system roles are immutable
    pub async fn update_role(
        &self,
        role_id: &str,
        input: UpdateRoleInput,
    ) -> AppResult<RoleWithPermissions> {
        validate_input(&input)?;
        let mut role = self.roles.require(role_id).await?;

        if role.is_system {
            return Err(AppError::Forbidden("Cannot modify system role".into()));
        }

        if let Some(name) = input.name {
            self.ensure_name_free(&name, Some(role_id)).await?;
            role.name = name;
        }
        if let Some(description) = input.description {
            role.description = description;
        }
        if let Some(permissions) = input.permissions {
            self.validate_permission_ids(&permissions).await?;
            role.permissions = permissions;
        }
        role.updated_at = Utc::now();

        self.roles.replace(&role).await?;
        self.get_role_with_permissions(role_id).await
    }

    /// Delete a role that is neither a system role nor held by any user
    pub async fn delete_role(&self, role_id: &str) -> AppResult<()> {
        let role = self.roles.require(role_id).await?;

        if role.is_system {
            return Err(AppError::Forbidden("Cannot delete system role".into()));
        }

        let holders = UserService::new(self.store.clone())
            .count_with_role(role_id)
            .await?;
        if holders > 0 {
            return Err(AppError::ValidationError(format!(
                "Cannot delete role. It is assigned to {} user(s)",
                holders
            )));
        }

        self.roles.delete(role_id).await?;
        tracing::info!("Deleted role {}", role.name);
        Ok(())
    }

    /// Role names and permission keys granted by a set of role ids.
    /// Unknown role ids grant nothing.
    pub async fn resolve_grants(&self, role_ids: &[String]) -> AppResult<Grants> {
        let mut names = Vec::new();
        let mut permissions = BTreeSet::new();

        for role_id in role_ids {
            let Some(role) = self.roles.get(role_id).await? else {
                continue;
            };
            for permission_id in &role.permissions {
                if let Some(permission) = self.permissions.get(permission_id).await? {
                    permissions.insert(permission.key());
                }
            }
            names.push(role.name);
        }

        Ok(Grants {
            role_names: names,
            permissions: permissions.into_iter().collect(),
        })
    }

    /// Seed default permissions, system roles and the optional bootstrap
    /// administrator. Safe to run repeatedly.
    pub async fn initialize_system(&self, bootstrap: &BootstrapConfig) -> AppResult<InitSummary> {
        let mut summary = InitSummary::default();
        let now = Utc::now();

        let mut all_ids = Vec::new();
        for (resource, action) in default_permissions() {
            let key = permission_key(resource, action);
            let permission = Permission {
                id: key.clone(),
                name: key.clone(),
                description: format!("Can {} {}", action, resource),
                resource: resource.to_string(),
                action: action.to_string(),
                created_at: now,
                updated_at: now,
            };
            let (stored, created) = self.permissions.insert_unique(&permission).await?;
            if created {
                summary.permissions_created += 1;
            }
            all_ids.push(stored.id);
        }

        for system_role in default_roles() {
            let permissions = match &system_role.grants {
                None => all_ids.clone(),
                Some(grants) => grants.iter().map(|(r, a)| permission_key(r, a)).collect(),
            };
            let role = Role {
                id: system_role.name.to_string(),
                name: system_role.name.to_string(),
                description: system_role.description.to_string(),
                permissions,
                is_system: true,
                created_at: now,
                updated_at: now,
            };
            match self.roles.insert(&role).await {
                Ok(()) => summary.roles_created += 1,
                Err(StoreError::DuplicateId { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(uid) = &bootstrap.admin_uid {
            let admin = User {
                id: crate::models::new_id(),
                uid: uid.clone(),
                name: bootstrap.admin_name.clone().unwrap_or_else(|| "Administrator".into()),
                email: bootstrap.admin_email.clone().unwrap_or_default(),
                phone: None,
                employee_id: String::new(),
                department: "Administration".into(),
                designation: "Administrator".into(),
                roles: vec![role_names::ADMIN.to_string()],
                is_active: true,
                join_date: now,
                last_login: None,
                created_at: now,
                updated_at: now,
            };
            let (_, created) = Collection::<User>::new(self.store.clone())
                .insert_unique(&admin)
                .await?;
            summary.admin_created = created;
        }

        tracing::info!(
            "System initialised: {} permissions, {} roles created",
            summary.permissions_created,
            summary.roles_created
        );
        Ok(summary)
    }

    async fn ensure_name_free(&self, name: &str, except: Option<&str>) -> AppResult<()> {
        let taken = self
            .roles
            .all()
            .await?
            .iter()
            .any(|r| r.name.eq_ignore_ascii_case(name) && Some(r.id.as_str()) != except);
        if taken {
            return Err(AppError::Duplicate(format!("Role named {}", name)));
        }
        Ok(())
    }

    async fn validate_permission_ids(&self, ids: &[String]) -> AppResult<()> {
        for id in ids {
            if self.permissions.get(id).await?.is_none() {
                return Err(AppError::validation(
                    "permissions",
                    format!("Invalid permission ID: {}", id),
                ));
            }
        }
        Ok(())
    }
}
