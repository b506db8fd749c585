//! Project, task and user administration tests
//!
//! Service-level tests for:
//! - Project membership deciding visibility
//! - Task visibility, comments and validation
//! - User role assignment and system role protection

use std::sync::Arc;

use production_planning::config::BootstrapConfig;
use production_planning::error::AppError;
use production_planning::middleware::AuthUser;
use production_planning::models::{ProjectStatus, TaskPriority, TaskStatus, User};
use production_planning::services::project::{
    AddMemberInput, CreateProjectInput, ProjectQuery, UpdateProjectInput,
};
use production_planning::services::role::{CreateRoleInput, UpdateRoleInput};
use production_planning::services::task::{
    AddCommentInput, CreateTaskInput, TaskQuery, UpdateTaskInput,
};
use production_planning::services::user::CreateUserInput;
use production_planning::services::{ProjectService, RoleService, TaskService, UserService};
use production_planning::store::{DocumentStore, MemoryStore};

// ============================================================================
// Fixtures
// ============================================================================

async fn seeded_store() -> Arc<dyn DocumentStore> {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    RoleService::new(store.clone())
        .initialize_system(&BootstrapConfig::default())
        .await
        .unwrap();
    store
}

async fn register(store: &Arc<dyn DocumentStore>, name: &str, role: &str) -> User {
    UserService::new(store.clone())
        .create(CreateUserInput {
            uid: format!("uid-{}", name),
            name: name.to_string(),
            email: format!("{}@plant.test", name),
            phone: None,
            employee_id: String::new(),
            department: "Production".into(),
            designation: String::new(),
            roles: vec![role.to_string()],
            join_date: None,
        })
        .await
        .unwrap()
}

/// Request identity for a stored user with the grants of their roles
async fn auth(store: &Arc<dyn DocumentStore>, user: &User) -> AuthUser {
    let grants = RoleService::new(store.clone())
        .resolve_grants(&user.roles)
        .await
        .unwrap();
    AuthUser {
        user_id: user.id.clone(),
        uid: user.uid.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        role_ids: user.roles.clone(),
        role_names: grants.role_names,
        permissions: grants.permissions,
    }
}

fn project_input(name: &str) -> CreateProjectInput {
    CreateProjectInput {
        name: name.to_string(),
        description: "Line rebalancing".into(),
        status: ProjectStatus::Active,
        start_date: None,
        end_date: None,
    }
}

fn task_input(title: &str, assigned_to: &str, project_id: Option<String>) -> CreateTaskInput {
    CreateTaskInput {
        title: title.to_string(),
        description: String::new(),
        priority: TaskPriority::High,
        assigned_to: assigned_to.to_string(),
        project_id,
        due_date: None,
        tags: vec!["line-a".into()],
    }
}

// ============================================================================
// Projects
// ============================================================================

#[tokio::test]
async fn test_projects_visible_to_members_only() {
    let store = seeded_store().await;
    let owner = register(&store, "owner", "admin").await;
    let member = register(&store, "member", "employee").await;
    let outsider = register(&store, "outsider", "employee").await;

    let projects = ProjectService::new(store.clone());
    let owner_auth = auth(&store, &owner).await;
    let project = projects.create(&owner_auth, project_input("Line A")).await.unwrap();

    projects
        .add_member(
            &owner_auth,
            &project.id,
            AddMemberInput {
                user_id: member.id.clone(),
                role_id: "employee".into(),
            },
        )
        .await
        .unwrap();

    let member_auth = auth(&store, &member).await;
    let outsider_auth = auth(&store, &outsider).await;
    assert!(projects.get(&member_auth, &project.id).await.is_ok());
    assert!(matches!(
        projects.get(&outsider_auth, &project.id).await.unwrap_err(),
        AppError::Forbidden(_)
    ));

    let listed = projects
        .list(&outsider_auth, ProjectQuery::default())
        .await
        .unwrap();
    assert_eq!(listed.pagination.total, 0);

    let duplicate = projects
        .add_member(
            &owner_auth,
            &project.id,
            AddMemberInput {
                user_id: member.id.clone(),
                role_id: "employee".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(duplicate, AppError::Duplicate(_)));

    let updated = projects
        .remove_member(&owner_auth, &project.id, &member.id)
        .await
        .unwrap();
    assert!(updated.members.is_empty());
}

#[tokio::test]
async fn test_members_without_grant_cannot_edit() {
    let store = seeded_store().await;
    let owner = register(&store, "owner", "admin").await;
    let member = register(&store, "member", "employee").await;

    let projects = ProjectService::new(store.clone());
    let owner_auth = auth(&store, &owner).await;
    let project = projects.create(&owner_auth, project_input("Line B")).await.unwrap();
    projects
        .add_member(
            &owner_auth,
            &project.id,
            AddMemberInput {
                user_id: member.id.clone(),
                role_id: "employee".into(),
            },
        )
        .await
        .unwrap();

    let member_auth = auth(&store, &member).await;
    let err = projects
        .update(
            &member_auth,
            &project.id,
            UpdateProjectInput {
                name: Some("Renamed".into()),
                description: None,
                status: None,
                start_date: None,
                end_date: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = projects.delete(&member_auth, &project.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_project_name_is_validated() {
    let store = seeded_store().await;
    let owner = register(&store, "owner", "admin").await;
    let err = ProjectService::new(store.clone())
        .create(&auth(&store, &owner).await, project_input(""))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "name"));
}

// ============================================================================
// Tasks
// ============================================================================

#[tokio::test]
async fn test_task_lifecycle_and_comments() {
    let store = seeded_store().await;
    let lead = register(&store, "lead", "admin").await;
    let worker = register(&store, "worker", "employee").await;
    let bystander = register(&store, "bystander", "employee").await;

    let lead_auth = auth(&store, &lead).await;
    let worker_auth = auth(&store, &worker).await;
    let bystander_auth = auth(&store, &bystander).await;

    let project = ProjectService::new(store.clone())
        .create(&lead_auth, project_input("Line C"))
        .await
        .unwrap();

    let tasks = TaskService::new(store.clone());
    let task = tasks
        .create(&lead_auth, task_input("Calibrate press", &worker.id, Some(project.id.clone())))
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Todo);
    assert_eq!(task.assigned_by, lead.id);

    // Visible to the assignee, hidden from others
    let mine = tasks.list(&worker_auth, TaskQuery::default()).await.unwrap();
    assert_eq!(mine.data.len(), 1);
    let theirs = tasks.list(&bystander_auth, TaskQuery::default()).await.unwrap();
    assert!(theirs.data.is_empty());
    assert!(matches!(
        tasks.get(&bystander_auth, &task.id).await.unwrap_err(),
        AppError::Forbidden(_)
    ));

    let updated = tasks
        .update(
            &worker_auth,
            &task.id,
            UpdateTaskInput {
                title: None,
                description: None,
                status: Some(TaskStatus::InProgress),
                priority: None,
                assigned_to: None,
                due_date: None,
                tags: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, TaskStatus::InProgress);

    let blank = tasks
        .add_comment(&worker_auth, &task.id, AddCommentInput { content: "   ".into() })
        .await
        .unwrap_err();
    assert!(matches!(blank, AppError::Validation { .. }));

    let commented = tasks
        .add_comment(
            &worker_auth,
            &task.id,
            AddCommentInput { content: " Torque setting updated ".into() },
        )
        .await
        .unwrap();
    assert_eq!(commented.comments.len(), 1);
    assert_eq!(commented.comments[0].content, "Torque setting updated");

    let project_tasks = ProjectService::new(store.clone())
        .tasks(&lead_auth, &project.id)
        .await
        .unwrap();
    assert_eq!(project_tasks.len(), 1);
}

#[tokio::test]
async fn test_task_requires_known_assignee() {
    let store = seeded_store().await;
    let lead = register(&store, "lead", "admin").await;
    let err = TaskService::new(store.clone())
        .create(&auth(&store, &lead).await, task_input("Inspect", "nobody", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_task_pagination() {
    let store = seeded_store().await;
    let lead = register(&store, "lead", "admin").await;
    let lead_auth = auth(&store, &lead).await;
    let tasks = TaskService::new(store.clone());

    for i in 0..12 {
        tasks
            .create(&lead_auth, task_input(&format!("Task {}", i), &lead.id, None))
            .await
            .unwrap();
    }

    let page = tasks
        .list(
            &lead_auth,
            TaskQuery {
                page: Some(2),
                limit: Some(5),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.data.len(), 5);
    assert_eq!(page.pagination.total, 12);
    assert_eq!(page.pagination.total_pages, 3);
}

// ============================================================================
// Users and roles
// ============================================================================

#[tokio::test]
async fn test_role_assignment_changes_grants() {
    let store = seeded_store().await;
    let user = register(&store, "casey", "employee").await;
    let users = UserService::new(store.clone());

    let before = auth(&store, &user).await;
    assert!(!before.has_permission("production", "read"));

    let line_lead = RoleService::new(store.clone())
        .create_role(CreateRoleInput {
            name: "line_lead".into(),
            description: "Leads a production line".into(),
            permissions: vec!["production:read".into(), "production:create".into()],
        })
        .await
        .unwrap();
    let role_id = line_lead.role.id.clone();

    let user = users.assign_role(&user.id, &role_id).await.unwrap();
    let after = auth(&store, &user).await;
    assert!(after.has_permission("production", "create"));
    assert_eq!(users.roles_of(&user.id).await.unwrap().len(), 2);

    let again = users.assign_role(&user.id, &role_id).await.unwrap_err();
    assert!(matches!(again, AppError::Duplicate(_)));
    let unknown = users.assign_role(&user.id, "ghost").await.unwrap_err();
    assert!(matches!(unknown, AppError::NotFound(_)));

    let user = users.remove_role(&user.id, &role_id).await.unwrap();
    assert_eq!(user.roles, vec!["employee".to_string()]);

    let err = users.remove_role(&user.id, "employee").await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_system_roles_are_immutable() {
    let store = seeded_store().await;
    let roles = RoleService::new(store.clone());

    let err = roles
        .update_role(
            "plant_head",
            UpdateRoleInput {
                name: None,
                description: Some("changed".into()),
                permissions: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert!(matches!(
        roles.delete_role("admin").await.unwrap_err(),
        AppError::Forbidden(_)
    ));
}

#[tokio::test]
async fn test_initialization_is_repeatable() {
    let store = seeded_store().await;
    let summary = RoleService::new(store.clone())
        .initialize_system(&BootstrapConfig::default())
        .await
        .unwrap();
    assert_eq!(summary.permissions_created, 0);
    assert_eq!(summary.roles_created, 0);
    assert_eq!(RoleService::new(store).get_roles().await.unwrap().len(), 4);
}
