//! General work tasks and their comments

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use super::{require_text, validate_input};
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{new_id, Project, Task, TaskComment, TaskPriority, TaskStatus, User};
use crate::store::{Collection, DocumentStore, Filter};
use shared::{PaginatedResponse, Pagination};

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn DocumentStore>,
    tasks: Collection<Task>,
}

/// Query parameters for listing tasks
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<String>,
    pub project_id: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskInput {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: TaskPriority,
    #[validate(length(min = 1, message = "assignedTo is required"))]
    pub assigned_to: String,
    pub project_id: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskInput {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct AddCommentInput {
    pub content: String,
}

impl TaskService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            tasks: Collection::new(store.clone()),
            store,
        }
    }

    /// Tasks visible to the caller: everything for admins, otherwise the
    /// ones assigned to or by them.
    pub async fn list(&self, user: &AuthUser, query: TaskQuery) -> AppResult<PaginatedResponse<Task>> {
        let search = query.search.as_deref().map(str::to_lowercase);
        let tasks: Vec<Task> = self
            .tasks
            .all()
            .await?
            .into_iter()
            .filter(|t| user.is_admin() || Self::involves(t, &user.user_id))
            .filter(|t| query.status.map_or(true, |s| t.status == s))
            .filter(|t| query.priority.map_or(true, |p| t.priority == p))
            .filter(|t| query.assigned_to.as_deref().map_or(true, |a| t.assigned_to == a))
            .filter(|t| {
                query
                    .project_id
                    .as_deref()
                    .map_or(true, |p| t.project_id.as_deref() == Some(p))
            })
            .filter(|t| {
                search.as_deref().map_or(true, |s| {
                    t.title.to_lowercase().contains(s) || t.description.to_lowercase().contains(s)
                })
            })
            .collect();

        Ok(Pagination::new(query.page, query.limit).apply(tasks))
    }

    pub async fn get(&self, user: &AuthUser, id: &str) -> AppResult<Task> {
        let task = self.tasks.require(id).await?;
        if !user.is_admin() && !Self::involves(&task, &user.user_id) {
            return Err(AppError::Forbidden("Access denied".into()));
        }
        Ok(task)
    }

    pub async fn by_project(&self, project_id: &str) -> AppResult<Vec<Task>> {
        Ok(self
            .tasks
            .find(&Filter::new().eq("projectId", project_id))
            .await?)
    }

    pub async fn create(&self, user: &AuthUser, input: CreateTaskInput) -> AppResult<Task> {
        validate_input(&input)?;
        Collection::<User>::new(self.store.clone())
            .require(&input.assigned_to)
            .await?;
        if let Some(project_id) = &input.project_id {
            Collection::<Project>::new(self.store.clone())
                .require(project_id)
                .await?;
        }

        let now = Utc::now();
        let task = Task {
            id: new_id(),
            title: input.title,
            description: input.description,
            status: TaskStatus::Todo,
            priority: input.priority,
            assigned_to: input.assigned_to,
            assigned_by: user.user_id.clone(),
            project_id: input.project_id,
            due_date: input.due_date,
            tags: input.tags,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.tasks.insert(&task).await?;
        Ok(task)
    }

    pub async fn update(&self, user: &AuthUser, id: &str, input: UpdateTaskInput) -> AppResult<Task> {
        validate_input(&input)?;
        let mut task = self.tasks.require(id).await?;
        if !Self::involves(&task, &user.user_id) && !user.is_admin() && !user.has_permission("task", "update") {
            return Err(AppError::Forbidden("Access denied".into()));
        }

        if let Some(title) = input.title {
            task.title = title;
        }
        if let Some(description) = input.description {
            task.description = description;
        }
        if let Some(status) = input.status {
            task.status = status;
        }
        if let Some(priority) = input.priority {
            task.priority = priority;
        }
        if let Some(assigned_to) = input.assigned_to {
            Collection::<User>::new(self.store.clone())
                .require(&assigned_to)
                .await?;
            task.assigned_to = assigned_to;
        }
        if input.due_date.is_some() {
            task.due_date = input.due_date;
        }
        if let Some(tags) = input.tags {
            task.tags = tags;
        }
        task.updated_at = Utc::now();

        self.tasks.replace(&task).await?;
        Ok(task)
    }

    pub async fn delete(&self, user: &AuthUser, id: &str) -> AppResult<()> {
        let task = self.tasks.require(id).await?;
        if task.assigned_by != user.user_id && !user.is_admin() && !user.has_permission("task", "delete") {
            return Err(AppError::Forbidden("Access denied".into()));
        }
        self.tasks.delete(id).await?;
        Ok(())
    }

    pub async fn add_comment(&self, user: &AuthUser, id: &str, input: AddCommentInput) -> AppResult<Task> {
        require_text("content", &input.content)?;
        let mut task = self.get(user, id).await?;

        task.comments.push(TaskComment {
            id: new_id(),
            user_id: user.user_id.clone(),
            content: input.content.trim().to_string(),
            created_at: Utc::now(),
        });
        task.updated_at = Utc::now();

        self.tasks.replace(&task).await?;
        Ok(task)
    }

    fn involves(task: &Task, user_id: &str) -> bool {
        task.assigned_to == user_id || task.assigned_by == user_id
    }
}
