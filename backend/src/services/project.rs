//! Project management service

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use super::{validate_input, TaskService};
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{new_id, Project, ProjectMember, ProjectStatus, Role, Task, User};
use crate::store::{Collection, DocumentStore};
use shared::{PaginatedResponse, Pagination};

/// Project service for managing projects and their members
#[derive(Clone)]
pub struct ProjectService {
    store: Arc<dyn DocumentStore>,
    projects: Collection<Project>,
}

/// Query parameters for listing projects
#[derive(Debug, Default, Deserialize)]
pub struct ProjectQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<ProjectStatus>,
    pub owner: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectInput {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ProjectStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectInput {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberInput {
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,
    #[validate(length(min = 1, message = "roleId is required"))]
    pub role_id: String,
}

impl ProjectService {
    /// Create a new ProjectService instance
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            projects: Collection::new(store.clone()),
            store,
        }
    }

    /// Projects visible to the caller, filtered and paginated
    pub async fn list(&self, user: &AuthUser, query: ProjectQuery) -> AppResult<PaginatedResponse<Project>> {
        let search = query.search.as_deref().map(str::to_lowercase);
        let projects: Vec<Project> = self
            .projects
            .all()
            .await?
            .into_iter()
            .filter(|p| user.is_admin() || p.is_member(&user.user_id))
            .filter(|p| query.status.map_or(true, |s| p.status == s))
            .filter(|p| query.owner.as_deref().map_or(true, |o| p.owner == o))
            .filter(|p| {
                search.as_deref().map_or(true, |s| {
                    p.name.to_lowercase().contains(s) || p.description.to_lowercase().contains(s)
                })
            })
            .collect();

        Ok(Pagination::new(query.page, query.limit).apply(projects))
    }

    pub async fn get(&self, user: &AuthUser, id: &str) -> AppResult<Project> {
        let project = self.projects.require(id).await?;
        if !user.is_admin() && !project.is_member(&user.user_id) {
            return Err(AppError::Forbidden("Access denied".into()));
        }
        Ok(project)
    }

    pub async fn create(&self, user: &AuthUser, input: CreateProjectInput) -> AppResult<Project> {
        validate_input(&input)?;
        let now = Utc::now();
        let project = Project {
            id: new_id(),
            name: input.name,
            description: input.description,
            status: input.status,
            owner: user.user_id.clone(),
            members: Vec::new(),
            start_date: input.start_date.unwrap_or(now),
            end_date: input.end_date,
            created_at: now,
            updated_at: now,
        };
        self.projects.insert(&project).await?;

        tracing::info!("Created project {} for {}", project.id, user.user_id);
        Ok(project)
    }

    pub async fn update(&self, user: &AuthUser, id: &str, input: UpdateProjectInput) -> AppResult<Project> {
        validate_input(&input)?;
        let mut project = self.projects.require(id).await?;
        self.ensure_can(user, &project, "update")?;

        if let Some(name) = input.name {
            project.name = name;
        }
        if let Some(description) = input.description {
            project.description = description;
        }
        if let Some(status) = input.status {
            project.status = status;
        }
        if let Some(start_date) = input.start_date {
            project.start_date = start_date;
        }
        if input.end_date.is_some() {
            project.end_date = input.end_date;
        }
        project.updated_at = Utc::now();

        self.projects.replace(&project).await?;
        Ok(project)
    }

    pub async fn delete(&self, user: &AuthUser, id: &str) -> AppResult<()> {
        let project = self.projects.require(id).await?;
        self.ensure_can(user, &project, "delete")?;
        self.projects.delete(id).await?;
        tracing::info!("Deleted project {}", id);
        Ok(())
    }

    pub async fn add_member(&self, user: &AuthUser, id: &str, input: AddMemberInput) -> AppResult<Project> {
        validate_input(&input)?;
        let mut project = self.projects.require(id).await?;
        self.ensure_can(user, &project, "update")?;

        Collection::<User>::new(self.store.clone())
            .require(&input.user_id)
            .await?;
        Collection::<Role>::new(self.store.clone())
            .require(&input.role_id)
            .await?;

        if project.members.iter().any(|m| m.user_id == input.user_id) {
            return Err(AppError::Duplicate("Project member".into()));
        }

        project.members.push(ProjectMember {
            user_id: input.user_id,
            role: input.role_id,
            joined_at: Utc::now(),
        });
        project.updated_at = Utc::now();
        self.projects.replace(&project).await?;
        Ok(project)
    }

    pub async fn remove_member(&self, user: &AuthUser, id: &str, member_id: &str) -> AppResult<Project> {
        let mut project = self.projects.require(id).await?;
        self.ensure_can(user, &project, "update")?;

        let before = project.members.len();
        project.members.retain(|m| m.user_id != member_id);
        if project.members.len() == before {
            return Err(AppError::NotFound("Project member".into()));
        }

        project.updated_at = Utc::now();
        self.projects.replace(&project).await?;
        Ok(project)
    }

    pub async fn tasks(&self, user: &AuthUser, id: &str) -> AppResult<Vec<Task>> {
        let project = self.get(user, id).await?;
        TaskService::new(self.store.clone())
            .by_project(&project.id)
            .await
    }

    /// Owners and admins may always act; others need the project permission
    fn ensure_can(&self, user: &AuthUser, project: &Project, action: &str) -> AppResult<()> {
        if project.owner == user.user_id || user.is_admin() || user.has_permission("project", action) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Access denied".into()))
        }
    }
}
