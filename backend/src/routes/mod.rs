//! Route definitions for the production planning API

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Scheduler status (public), manual trigger (admin)
        .nest("/cron", cron_routes(state.clone()))
        // Protected routes - profile and session
        .nest("/auth", auth_routes(state.clone()))
        // Protected routes - role, permission and user administration
        .nest("/rbac", rbac_routes(state.clone()))
        // Protected routes - projects
        .nest("/projects", project_routes(state.clone()))
        // Protected routes - general tasks
        .nest("/tasks", task_routes(state.clone()))
        // Protected routes - production planning
        .nest("/production", production_routes(state))
}

fn cron_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/trigger/monthly",
            post(handlers::trigger_monthly)
                .route_layer(middleware::from_fn_with_state(state, auth_middleware)),
        )
        .route("/status", get(handlers::cron_status))
}

fn auth_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .route("/permissions", get(handlers::get_permissions))
        .route("/verify", get(handlers::verify_token))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

fn rbac_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/roles", get(handlers::list_roles).post(handlers::create_role))
        .route(
            "/roles/:role_id",
            get(handlers::get_role)
                .put(handlers::update_role)
                .delete(handlers::delete_role),
        )
        .route(
            "/permissions",
            get(handlers::list_permissions).post(handlers::create_permission),
        )
        .route("/permissions/:permission_id", get(handlers::get_permission))
        .route("/users", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/users/:user_id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route(
            "/users/:user_id/roles",
            get(handlers::get_user_roles).post(handlers::assign_user_role),
        )
        .route(
            "/users/:user_id/roles/:role_id",
            delete(handlers::remove_user_role),
        )
        .route("/init", post(handlers::initialize_system))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

fn project_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_projects).post(handlers::create_project))
        .route(
            "/:project_id",
            get(handlers::get_project)
                .put(handlers::update_project)
                .delete(handlers::delete_project),
        )
        .route("/:project_id/members", post(handlers::add_project_member))
        .route(
            "/:project_id/members/:user_id",
            delete(handlers::remove_project_member),
        )
        .route("/:project_id/tasks", get(handlers::get_project_tasks))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

fn task_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_tasks).post(handlers::create_task))
        .route(
            "/:task_id",
            get(handlers::get_task)
                .put(handlers::update_task)
                .delete(handlers::delete_task),
        )
        .route("/:task_id/comments", post(handlers::add_task_comment))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

fn production_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Monthly plans
        .route(
            "/monthly",
            get(handlers::list_monthly_plans).post(handlers::create_monthly_plan),
        )
        .route(
            "/monthly/:id",
            get(handlers::get_monthly_plan).delete(handlers::delete_monthly_plan),
        )
        .route("/monthly/:id/submit", post(handlers::submit_monthly_plan))
        .route("/monthly/:id/capabilities", get(handlers::monthly_capabilities))
        .route("/monthly/:id/download/:format", get(handlers::download_monthly_plan))
        // Weekly plans
        .route("/weekly", get(handlers::list_weekly_plans))
        .route(
            "/weekly/:id",
            get(handlers::get_weekly_plan).delete(handlers::delete_weekly_plan),
        )
        .route(
            "/weekly/monthly/:monthly_plan_id",
            get(handlers::weekly_plans_for_monthly),
        )
        .route("/weekly/:id/submit", post(handlers::submit_weekly_plan))
        .route("/weekly/:id/capabilities", get(handlers::weekly_capabilities))
        .route("/weekly/:id/download/:format", get(handlers::download_weekly_plan))
        // Daily plans
        .route("/daily", get(handlers::list_daily_plans))
        .route(
            "/daily/:id",
            get(handlers::get_daily_plan).delete(handlers::delete_daily_plan),
        )
        .route("/daily/status/:status", get(handlers::daily_plans_by_status))
        .route(
            "/daily/weekly/:weekly_plan_id",
            get(handlers::daily_plans_for_weekly),
        )
        .route("/daily/:id/submit", post(handlers::submit_daily_plan))
        .route("/daily/:id/approve", post(handlers::approve_daily_plan))
        .route("/daily/:id/reject", post(handlers::reject_daily_plan))
        .route("/daily/:id/capabilities", get(handlers::daily_capabilities))
        .route("/daily/:id/download/:format", get(handlers::download_daily_plan))
        // Daily reports
        .route("/reports", get(handlers::list_daily_reports))
        .route(
            "/reports/:id",
            get(handlers::get_daily_report).delete(handlers::delete_daily_report),
        )
        .route(
            "/reports/daily/:daily_plan_id",
            get(handlers::report_for_daily_plan),
        )
        .route("/reports/:id/submit", post(handlers::submit_daily_report))
        .route("/reports/:id/capabilities", get(handlers::report_capabilities))
        .route("/reports/:id/download/:format", get(handlers::download_daily_report))
        // Action plans
        .route("/action-plans", get(handlers::list_action_plans))
        .route(
            "/action-plans/:id",
            get(handlers::get_action_plan).put(handlers::update_action_plan),
        )
        .route(
            "/action-plans/report/:daily_report_id",
            get(handlers::action_plans_for_report),
        )
        // Tracker
        .route("/tasks", get(handlers::list_production_tasks))
        .route("/tasks/status/:status", get(handlers::production_tasks_by_status))
        .route("/tasks/type/:task_type", get(handlers::production_tasks_by_type))
        .route("/tasks/assigned/:user_id", get(handlers::production_tasks_by_assignee))
        .route(
            "/tasks/:task_id",
            get(handlers::get_production_task).delete(handlers::delete_production_task),
        )
        // Maintenance
        .route("/clear", delete(handlers::clear_production_data))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
