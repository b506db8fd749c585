//! Configuration management for the production planning server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with PPM__ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::WEEK_SPAN_DAYS;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Document store configuration
    pub store: StoreConfig,

    /// Identity provider credentials
    pub identity: IdentityConfig,

    /// Plan cascade parameters
    pub workflow: WorkflowConfig,

    /// Monthly plan trigger
    pub scheduler: SchedulerConfig,

    /// Optional administrator seeded at start-up
    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,

    /// Allowed CORS origins; empty allows any
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// PostgreSQL connection URL
    #[serde(default)]
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    /// Identity provider project; the expected token audience
    pub project_id: String,

    /// Service account email, accepted as issuer of locally minted tokens
    #[serde(default)]
    pub client_email: String,

    /// PEM private key for RS256 signing
    #[serde(default)]
    pub private_key: Option<String>,

    /// PEM public key for RS256 verification
    #[serde(default)]
    pub public_key: Option<String>,

    /// Shared secret for HS256 when no key pair is configured
    #[serde(default)]
    pub secret: String,

    /// Lifetime of issued tokens in seconds
    pub token_ttl: i64,
}

/// A concrete user standing behind a workflow role
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Assignee {
    pub user_id: String,
    pub role_id: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Assignees {
    pub production_manager: Assignee,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowConfig {
    /// Daily plans derived per completed week
    pub days_per_week: u32,

    /// Week count of plans created by the scheduler
    pub default_week_count: u32,

    pub monthly_deadline_days: i64,
    pub scheduled_monthly_deadline_days: i64,
    pub weekly_deadline_days: i64,
    pub daily_deadline_hours: i64,
    pub report_deadline_hours: i64,

    #[serde(default)]
    pub assignees: Assignees,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub day_of_month: u32,
    pub hour: u32,
    pub minute: u32,
    /// Offset of the schedule's local time from UTC
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BootstrapConfig {
    pub admin_uid: Option<String>,
    pub admin_email: Option<String>,
    pub admin_name: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LogConfig {
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("PPM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = Self::defaults(config::Config::builder(), &environment)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (PPM__ prefix)
            .add_source(
                Environment::with_prefix("PPM")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.allowed_origins")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize::<Self>()?.validated()
    }

    /// Code defaults only; used by tests and as the base layer of `load`
    pub fn from_defaults() -> Result<Self, ConfigError> {
        Self::defaults(config::Config::builder(), "test")?
            .build()?
            .try_deserialize::<Self>()?
            .validated()
    }

    /// Reject settings the workflow cannot run with
    pub fn validated(self) -> Result<Self, ConfigError> {
        if !(1..=WEEK_SPAN_DAYS).contains(&self.workflow.days_per_week) {
            return Err(ConfigError::Message(format!(
                "workflow.days_per_week must be between 1 and {}, got {}",
                WEEK_SPAN_DAYS, self.workflow.days_per_week
            )));
        }
        Ok(self)
    }

    fn defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        environment: &str,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("environment", environment)?
            .set_default("server.port", 5000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.allowed_origins", Vec::<String>::new())?
            .set_default("store.backend", "memory")?
            .set_default("store.url", "")?
            .set_default("store.max_connections", 10)?
            .set_default("store.min_connections", 2)?
            .set_default("identity.project_id", "production-planning")?
            .set_default("identity.client_email", "")?
            .set_default("identity.token_ttl", 3600)?
            .set_default("workflow.days_per_week", 7)?
            .set_default("workflow.default_week_count", 4)?
            .set_default("workflow.monthly_deadline_days", 30)?
            .set_default("workflow.scheduled_monthly_deadline_days", 7)?
            .set_default("workflow.weekly_deadline_days", 7)?
            .set_default("workflow.daily_deadline_hours", 24)?
            .set_default("workflow.report_deadline_hours", 24)?
            .set_default("workflow.assignees.production_manager.user_id", "production-manager")?
            .set_default("workflow.assignees.production_manager.role_id", "production_manager")?
            .set_default("scheduler.enabled", true)?
            .set_default("scheduler.day_of_month", 4)?
            .set_default("scheduler.hour", 16)?
            .set_default("scheduler.minute", 58)?
            .set_default("scheduler.utc_offset_minutes", 330)?
            .set_default("log.json", false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_deserialize() {
        let config = Config::from_defaults().unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.workflow.days_per_week, 7);
        assert_eq!(config.scheduler.day_of_month, 4);
        assert_eq!(config.scheduler.utc_offset_minutes, 330);
        assert_eq!(config.workflow.assignees.production_manager.user_id, "production-manager");
        assert!(config.server.allowed_origins.is_empty());
        assert!(config.identity.secret.is_empty());
    }

    #[test]
    fn test_days_per_week_must_fit_a_week() {
        for days in [0, 8] {
            let config = Config::defaults(config::Config::builder(), "test")
                .unwrap()
                .set_override("workflow.days_per_week", days)
                .unwrap()
                .build()
                .unwrap()
                .try_deserialize::<Config>()
                .unwrap();
            assert!(config.validated().is_err(), "{} days accepted", days);
        }
        let mut config = Config::from_defaults().unwrap();
        config.workflow.days_per_week = 6;
        assert!(config.validated().is_ok());
    }
}
