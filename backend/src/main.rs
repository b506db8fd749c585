//! Production Planning Platform - Backend Server

use std::{net::SocketAddr, sync::Arc, time::Duration};

use production_planning::{
    config::{Config, StoreBackend},
    create_app,
    services::RoleService,
    store::{DocumentStore, MemoryStore, PgDocumentStore},
    AppState,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "production_planning=debug,ppm_server=debug,tower_http=debug,sqlx=warn".into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.log.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Production Planning Server");
    tracing::info!("Environment: {}", config.environment);

    let store: Arc<dyn DocumentStore> = match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Postgres => {
            tracing::info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(config.store.max_connections)
                .min_connections(config.store.min_connections)
                .acquire_timeout(Duration::from_secs(30))
                .connect(&config.store.url)
                .await?;
            tracing::info!("Database connection established");

            tracing::info!("Running database migrations...");
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Migrations completed");

            Arc::new(PgDocumentStore::new(pool))
        }
    };

    // Seed permissions, system roles and the bootstrap admin
    let summary = RoleService::new(store.clone())
        .initialize_system(&config.bootstrap)
        .await?;
    tracing::info!(
        "System initialized: {} permissions, {} roles created",
        summary.permissions_created,
        summary.roles_created
    );

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let scheduler_enabled = config.scheduler.enabled;
    let state = AppState::from_config(store, config)?;

    if scheduler_enabled {
        state.scheduler.clone().spawn();
    } else {
        tracing::info!("Monthly scheduler disabled");
    }

    let app = create_app(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
