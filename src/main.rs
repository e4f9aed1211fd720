use std::time::Duration;

use tokio::net::TcpListener;
use uml_editor::core::auth::SessionStore;
use uml_editor::core::build_router;
use uml_editor::core::config::Config;
use uml_editor::core::db::{DbError, UserRepository, UserRepositoryError, create_pool_with_migrations};

/// How often idle sessions are swept from the store
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("Database setup failed: {0}")]
    Database(#[from] DbError),

    #[error("Failed to create bootstrap admin: {0}")]
    Admin(#[from] UserRepositoryError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(std::io::Error),
}

#[tokio::main]
async fn main() {
    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    tracing::info!("Config loaded: {:?}", config);

    if let Err(err) = run(config).await {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), StartupError> {
    let pool = create_pool_with_migrations(&config.db_config()).await?;

    if let Some(password) = &config.admin_password {
        let users = UserRepository::new(pool.clone());
        match users.ensure_admin(&config.admin_username, password).await? {
            Some(id) => tracing::info!("Bootstrap admin {} created with id {}", config.admin_username, id),
            None => tracing::debug!("Admin account already present, skipping bootstrap"),
        }
    }

    let sessions = SessionStore::new(config.session_ttl);
    spawn_session_purge(sessions.clone());

    let app = build_router(pool, sessions, &config);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: config.bind_addr.clone(),
            source,
        })?;

    tracing::info!("listening on http://{}", config.bind_addr);
    tracing::info!("serving uploads from {}", config.uploads_dir.display());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)
}

fn spawn_session_purge(sessions: SessionStore) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = sessions.purge_expired();
            if purged > 0 {
                tracing::debug!("Purged {} expired sessions", purged);
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
