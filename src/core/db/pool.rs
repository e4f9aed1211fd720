//! Database connection pool management
//!
//! This module provides connection pool setup and management for PostgreSQL
//! using SQLx.

use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgPoolOptions},
};
use std::str::FromStr;
use std::time::Duration;

use crate::core::config::Config;

/// Database configuration
#[derive(Clone)]
pub struct DbConfig {
    /// Database connection URL (e.g., postgres://localhost:5432/uml_editor)
    pub database_url: String,
    /// User that overrides the one embedded in the URL
    pub username: Option<String>,
    /// Password that overrides the one embedded in the URL
    pub password: Option<String>,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to keep open
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout for connections in seconds
    pub idle_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            username: None,
            password: None,
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

// Hand-written so the password never reaches the logs.
impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("database_url", &self.database_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .finish()
    }
}

impl DbConfig {
    /// Create config from the DB_* environment variables
    pub fn from_env() -> Self {
        Config::from_env().db_config()
    }

    /// Set database credentials
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set max connections
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set min connections
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Set connection timeout
    pub fn connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    /// Set idle timeout
    pub fn idle_timeout(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = secs;
        self
    }

    /// Parse the URL and apply the credential overrides
    pub fn connect_options(&self) -> Result<PgConnectOptions, DbError> {
        if self.database_url.is_empty() {
            return Err(DbError::MissingDatabaseUrl);
        }

        let mut options = PgConnectOptions::from_str(&self.database_url)?;
        if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            options = options.username(username);
        }
        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            options = options.password(password);
        }
        Ok(options)
    }

    fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(self.idle_timeout_secs))
    }
}

/// Database errors
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("DB_URL is empty")]
    MissingDatabaseUrl,

    #[error("Failed to connect to database: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Failed to run migrations: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
}

/// Create a new database connection pool
pub async fn create_pool(config: &DbConfig) -> Result<PgPool, DbError> {
    let pool = config
        .pool_options()
        .connect_with(config.connect_options()?)
        .await?;

    Ok(pool)
}

/// Create a pool that connects on first use
pub fn create_lazy_pool(config: &DbConfig) -> Result<PgPool, DbError> {
    Ok(config.pool_options().connect_lazy_with(config.connect_options()?))
}

/// Create pool and run migrations
pub async fn create_pool_with_migrations(config: &DbConfig) -> Result<PgPool, DbError> {
    let pool = create_pool(config).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
