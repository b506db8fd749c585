//! User, role and permission models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Well-known role names. Business logic refers to roles by name only; the
/// concrete user behind each workflow role comes from configuration.
pub mod role_names {
    pub const ADMIN: &str = "admin";
    pub const PLANT_HEAD: &str = "plant_head";
    pub const PRODUCTION_MANAGER: &str = "production_manager";
    pub const EMPLOYEE: &str = "employee";
}

/// Resources guarded by permissions
pub const RESOURCES: [&str; 6] = ["user", "role", "permission", "project", "task", "production"];

/// CRUD actions granted per resource
pub const ACTIONS: [&str; 4] = ["create", "read", "update", "delete"];

/// A user account, linked to the identity provider by `uid`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub uid: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub employee_id: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub designation: String,
    /// Role ids
    pub roles: Vec<String>,
    pub is_active: bool,
    pub join_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named bundle of permissions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Permission ids
    pub permissions: Vec<String>,
    /// System roles cannot be edited or deleted
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A (resource, action) grant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub resource: String,
    pub action: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    /// `resource:action`, the form carried on an authenticated request
    pub fn key(&self) -> String {
        permission_key(&self.resource, &self.action)
    }
}

pub fn permission_key(resource: &str, action: &str) -> String {
    format!("{}:{}", resource, action)
}

/// Definition of a role seeded at system initialisation
#[derive(Debug, Clone)]
pub struct SystemRole {
    pub name: &'static str,
    pub description: &'static str,
    /// `None` grants every permission
    pub grants: Option<Vec<(&'static str, &'static str)>>,
}

/// Every permission seeded at initialisation: CRUD on each resource plus
/// plan approval.
pub fn default_permissions() -> Vec<(&'static str, &'static str)> {
    let mut perms: Vec<(&str, &str)> = RESOURCES
        .iter()
        .flat_map(|r| ACTIONS.iter().map(move |a| (*r, *a)))
        .collect();
    perms.push(("production", "approve"));
    perms
}

/// Roles created on a fresh system
pub fn default_roles() -> Vec<SystemRole> {
    vec![
        SystemRole {
            name: role_names::ADMIN,
            description: "Full system access",
            grants: None,
        },
        SystemRole {
            name: role_names::PLANT_HEAD,
            description: "Reviews and approves production plans",
            grants: Some(vec![
                ("production", "read"),
                ("production", "approve"),
                ("task", "read"),
                ("task", "update"),
                ("project", "read"),
            ]),
        },
        SystemRole {
            name: role_names::PRODUCTION_MANAGER,
            description: "Drafts production plans and reports",
            grants: Some(vec![
                ("production", "create"),
                ("production", "read"),
                ("production", "update"),
                ("task", "read"),
                ("task", "update"),
                ("project", "read"),
            ]),
        },
        SystemRole {
            name: role_names::EMPLOYEE,
            description: "Works on assigned tasks",
            grants: Some(vec![
                ("task", "read"),
                ("task", "update"),
                ("project", "read"),
            ]),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_permissions_cover_all_resources() {
        let perms = default_permissions();
        assert_eq!(perms.len(), RESOURCES.len() * ACTIONS.len() + 1);
        assert!(perms.contains(&("production", "approve")));
        assert!(perms.contains(&("role", "delete")));
    }

    #[test]
    fn test_default_role_grants_exist() {
        let perms = default_permissions();
        for role in default_roles() {
            for grant in role.grants.unwrap_or_default() {
                assert!(perms.contains(&grant), "{} grants unknown {:?}", role.name, grant);
            }
        }
    }
}
