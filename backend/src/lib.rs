//! Production Planning Platform - backend library
//!
//! Monthly production targets are cascaded into weekly and daily plans, daily
//! plans are approved into reports, and low-achievement report entries raise
//! action plans. Every plan and report is mirrored by a tracker task.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

pub use config::Config;

use external::{IdentityProvider, JwtIdentityProvider};
use services::{MonthlyScheduler, PlanService};
use store::DocumentStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<Config>,
    pub identity: Arc<dyn IdentityProvider>,
    pub scheduler: MonthlyScheduler,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, config: Config, identity: Arc<dyn IdentityProvider>) -> Self {
        let scheduler = MonthlyScheduler::new(
            PlanService::new(store.clone(), &config.workflow),
            config.scheduler.clone(),
        );
        Self {
            store,
            config: Arc::new(config),
            identity,
            scheduler,
        }
    }

    /// State with the JWT identity provider described by `config.identity`
    pub fn from_config(store: Arc<dyn DocumentStore>, config: Config) -> anyhow::Result<Self> {
        let identity = JwtIdentityProvider::from_config(&config.identity)?;
        Ok(Self::new(store, config, Arc::new(identity)))
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let origins = &state.config.server.allowed_origins;
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| o.parse().ok()))
    };
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .nest("/api", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Production Planning Platform API"
}
