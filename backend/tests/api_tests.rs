//! HTTP surface tests
//!
//! Drives the full router with HS256 bearer tokens minted from a test
//! secret:
//! - Identity gate rejects missing, malformed and unknown tokens
//! - Role and permission guards on production, tracker and RBAC routes
//! - Response envelope, downloads and scheduler endpoints

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use production_planning::config::{BootstrapConfig, Config};
use production_planning::external::JwtIdentityProvider;
use production_planning::services::user::CreateUserInput;
use production_planning::services::{RoleService, UserService};
use production_planning::store::{DocumentStore, MemoryStore};
use production_planning::{create_app, AppState};

const ADMIN: &str = "admin-uid";
const MANAGER: &str = "manager-uid";
const HEAD: &str = "head-uid";
const EMPLOYEE: &str = "employee-uid";

struct TestApp {
    router: Router,
    identity: JwtIdentityProvider,
}

impl TestApp {
    async fn new() -> Self {
        let mut config = Config::from_defaults().unwrap();
        config.identity.secret = "api-test-secret".into();
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());

        let bootstrap = BootstrapConfig {
            admin_uid: Some(ADMIN.into()),
            admin_email: Some("admin@plant.test".into()),
            admin_name: Some("Admin".into()),
        };
        RoleService::new(store.clone())
            .initialize_system(&bootstrap)
            .await
            .unwrap();

        let users = UserService::new(store.clone());
        for (uid, role) in [
            (MANAGER, "production_manager"),
            (HEAD, "plant_head"),
            (EMPLOYEE, "employee"),
        ] {
            users
                .create(CreateUserInput {
                    uid: uid.into(),
                    name: format!("User {}", uid),
                    email: format!("{}@plant.test", uid),
                    phone: None,
                    employee_id: String::new(),
                    department: "Production".into(),
                    designation: String::new(),
                    roles: vec![role.into()],
                    join_date: None,
                })
                .await
                .unwrap();
        }

        let identity = JwtIdentityProvider::from_config(&config.identity).unwrap();
        let state = AppState::from_config(store, config).unwrap();
        Self {
            router: create_app(state),
            identity,
        }
    }

    fn token(&self, uid: &str) -> String {
        self.identity.issue(uid, None).unwrap()
    }

    async fn send(&self, method: Method, uri: &str, uid: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = self.raw(method, uri, uid, body).await;
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn raw(
        &self,
        method: Method,
        uri: &str,
        uid: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(uid) = uid {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token(uid)));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn get(&self, uri: &str, uid: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(uid), None).await
    }

    async fn post(&self, uri: &str, uid: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(uid), Some(body)).await
    }

    /// September 2025 plan with one item, created by the production manager
    async fn create_monthly(&self) -> String {
        let (status, body) = self
            .post(
                "/api/production/monthly",
                MANAGER,
                json!({
                    "month": 9,
                    "year": 2025,
                    "weekCount": 4,
                    "items": [{"itemCode": "TEST001", "itemName": "Widget", "monthlyQuantity": 1000}]
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Walks the cascade down to a submitted daily plan awaiting review
    async fn daily_in_review(&self) -> String {
        let monthly = self.create_monthly().await;
        let (_, body) = self
            .post(&format!("/api/production/monthly/{}/submit", monthly), MANAGER, json!({}))
            .await;
        let weekly = body["data"]["weeklyPlans"][0]["id"].as_str().unwrap().to_string();

        let (_, body) = self
            .post(&format!("/api/production/weekly/{}/submit", weekly), MANAGER, json!({}))
            .await;
        let daily = body["data"]["dailyPlans"][0]["id"].as_str().unwrap().to_string();

        let (status, body) = self
            .post(
                &format!("/api/production/daily/{}/submit", daily),
                MANAGER,
                json!({"entries": [{
                    "deptName": "Assembly",
                    "operatorName": "Line A",
                    "h1Plan": 40,
                    "h2Plan": 40,
                    "otPlan": 20
                }]}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        daily
    }
}

// ============================================================================
// Identity gate
// ============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["store"], "connected");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/api/production/monthly", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_malformed_token_is_unauthorized() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .uri("/api/auth/verify")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unregistered_identity_is_unauthorized() {
    let app = TestApp::new().await;
    let (status, _) = app.get("/api/auth/verify", "stranger-uid").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_carries_roles_and_permissions() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/auth/permissions", MANAGER).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["roles"], json!(["production_manager"]));
    assert_eq!(body["data"]["isAdmin"], false);
    let permissions = body["data"]["permissions"].as_array().unwrap();
    assert!(permissions.contains(&json!("production:create")));
    assert!(!permissions.contains(&json!("production:approve")));

    let (status, body) = app.get("/api/auth/profile", ADMIN).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["uid"], ADMIN);
    assert_eq!(body["data"]["roleDetails"][0]["name"], "admin");
}

// ============================================================================
// Production guards
// ============================================================================

#[tokio::test]
async fn test_employee_cannot_read_production() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/production/monthly", EMPLOYEE).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "INSUFFICIENT_PERMISSIONS");
}

#[tokio::test]
async fn test_monthly_submission_over_http() {
    let app = TestApp::new().await;
    let monthly = app.create_monthly().await;

    let (status, body) = app
        .post(&format!("/api/production/monthly/{}/submit", monthly), MANAGER, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["plan"]["status"], "completed");
    assert_eq!(body["data"]["weeklyPlans"].as_array().unwrap().len(), 4);

    let (status, body) = app
        .get(&format!("/api/production/weekly/monthly/{}", monthly), HEAD)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 4);

    // Second submission is a precondition failure
    let (status, body) = app
        .post(&format!("/api/production/monthly/{}/submit", monthly), MANAGER, json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PRECONDITION_FAILED");
}

#[tokio::test]
async fn test_duplicate_period_conflicts() {
    let app = TestApp::new().await;
    app.create_monthly().await;
    let (status, body) = app
        .post(
            "/api/production/monthly",
            MANAGER,
            json!({"month": 9, "year": 2025}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE_ENTRY");
}

#[tokio::test]
async fn test_only_plant_head_approves() {
    let app = TestApp::new().await;
    let daily = app.daily_in_review().await;
    let approve = format!("/api/production/daily/{}/approve", daily);

    let (status, _) = app.post(&approve, MANAGER, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.post(&approve, HEAD, json!({})).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let report_id = body["data"]["report"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["report"]["entries"][0]["target"], 100);

    let (status, body) = app
        .get(&format!("/api/production/reports/daily/{}", daily), MANAGER)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], report_id);
}

#[tokio::test]
async fn test_reject_requires_reason() {
    let app = TestApp::new().await;
    let daily = app.daily_in_review().await;
    let reject = format!("/api/production/daily/{}/reject", daily);

    let (status, body) = app.post(&reject, HEAD, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "reason");

    let (status, body) = app.post(&reject, HEAD, json!({"reason": "Recount"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "rejected");
}

#[tokio::test]
async fn test_capabilities_endpoint() {
    let app = TestApp::new().await;
    let daily = app.daily_in_review().await;
    let uri = format!("/api/production/daily/{}/capabilities", daily);

    let (_, head) = app.get(&uri, HEAD).await;
    assert_eq!(head["data"]["status"], "inProgress");
    assert_eq!(head["data"]["canApprove"], true);

    let (_, manager) = app.get(&uri, MANAGER).await;
    assert_eq!(manager["data"]["canApprove"], false);
    assert_eq!(manager["data"]["canSubmit"], false);
}

#[tokio::test]
async fn test_tracker_views_differ_by_role() {
    let app = TestApp::new().await;
    app.daily_in_review().await;

    let (_, manager) = app.get("/api/production/tasks", MANAGER).await;
    let types: Vec<&str> = manager["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["type"].as_str().unwrap())
        .collect();
    assert!(types.iter().all(|t| *t == "daily" || *t == "report"));

    let (_, head) = app.get("/api/production/tasks/type/daily", HEAD).await;
    let daily = head["data"].as_array().unwrap();
    assert_eq!(daily.len(), 1);
    assert_eq!(daily[0]["status"], "inProgress");

    let (status, body) = app.get("/api/production/tasks/status/archived", HEAD).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "status");
}

// ============================================================================
// Downloads
// ============================================================================

#[tokio::test]
async fn test_csv_download() {
    let app = TestApp::new().await;
    let monthly = app.create_monthly().await;

    let (status, bytes) = app
        .raw(
            Method::GET,
            &format!("/api/production/monthly/{}/download/csv", monthly),
            Some(MANAGER),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.starts_with("itemCode,itemName"));
    assert!(text.contains("TEST001"));

    let (status, body) = app
        .get(&format!("/api/production/monthly/{}/download/pdf", monthly), MANAGER)
        .await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["code"], "NOT_IMPLEMENTED");
}

// ============================================================================
// Administration
// ============================================================================

#[tokio::test]
async fn test_rbac_is_admin_only() {
    let app = TestApp::new().await;

    let (status, _) = app.get("/api/rbac/roles", HEAD).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get("/api/rbac/roles", ADMIN).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 4);

    let (status, body) = app
        .post(
            "/api/rbac/roles",
            ADMIN,
            json!({"name": "quality_inspector", "permissions": ["production:read"]}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let (status, _) = app
        .send(Method::DELETE, "/api/rbac/roles/admin", Some(ADMIN), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_clear_requires_admin() {
    let app = TestApp::new().await;
    app.create_monthly().await;

    let (status, _) = app
        .send(Method::DELETE, "/api/production/clear", Some(MANAGER), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(Method::DELETE, "/api/production/clear", Some(ADMIN), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["monthlyPlans"], 1);
}

#[tokio::test]
async fn test_cron_status_and_trigger() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/api/cron/status", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["schedule"], "day 4 of every month at 16:58 (UTC+05:30)");

    let (status, _) = app
        .send(Method::POST, "/api/cron/trigger/monthly", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.post("/api/cron/trigger/monthly", MANAGER, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, first) = app.post("/api/cron/trigger/monthly", ADMIN, json!({})).await;
    assert_eq!(status, StatusCode::OK, "{}", first);
    assert_eq!(first["data"]["outcome"], "created");

    let (_, second) = app.post("/api/cron/trigger/monthly", ADMIN, json!({})).await;
    assert_eq!(second["data"]["outcome"], "alreadyExists");
    assert_eq!(second["data"]["plan"]["id"], first["data"]["plan"]["id"]);
}
