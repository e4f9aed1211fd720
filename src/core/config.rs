//! Application configuration from environment variables.
//!
//! Load configuration using `Config::from_env()` after calling `dotenvy::dotenv()`.
//! Variables already present in the process environment take precedence over
//! the `.env` file, since `dotenvy` never overwrites them.

use std::path::PathBuf;
use std::time::Duration;

use crate::core::db::DbConfig;

pub const DEFAULT_DB_URL: &str = "postgres://localhost:5432/uml_editor";
pub const DEFAULT_DB_USER: &str = "uml_editor";
pub const DEFAULT_DB_PASS: &str = "";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_UPLOADS_DIR: &str = "uploads";
pub const DEFAULT_SESSION_TTL_MINUTES: u64 = 30;
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173";
pub const DEFAULT_MAX_UPLOAD_MB: usize = 50;
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DB_IDLE_TIMEOUT_SECS: u64 = 600;

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    /// Example: postgres://localhost:5432/uml_editor
    pub db_url: String,

    /// Database user, overrides the user embedded in `db_url`
    pub db_user: String,

    /// Database password, overrides the password embedded in `db_url`
    pub db_pass: String,

    pub db_max_connections: u32,

    /// Seconds to wait for a pooled connection
    pub db_connect_timeout_secs: u64,

    /// Seconds an idle pooled connection is kept open
    pub db_idle_timeout_secs: u64,

    /// Socket address the HTTP server binds to
    pub bind_addr: String,

    /// Directory holding uploaded media, served under `/uploads`
    pub uploads_dir: PathBuf,

    /// Idle lifetime of a login session
    pub session_ttl: Duration,

    /// Origins allowed to call the API with credentials
    pub cors_origins: Vec<String>,

    /// Mark the session cookie `Secure` (HTTPS deployments)
    pub cookie_secure: bool,

    /// Upper bound for a multipart upload body
    pub max_upload_bytes: usize,

    /// Username of the administrator created on an empty database
    pub admin_username: String,

    /// Password for the bootstrap administrator; no account is created without it
    pub admin_password: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Call `dotenvy::dotenv()` before this to load from `.env` file.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            db_url: get_or_warn(get("DB_URL"), "DB_URL", DEFAULT_DB_URL),
            db_user: get_or_warn(get("DB_USER"), "DB_USER", DEFAULT_DB_USER),
            db_pass: get_or_warn(get("DB_PASS"), "DB_PASS", DEFAULT_DB_PASS),
            db_max_connections: parse_or(get("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 10),
            db_connect_timeout_secs: parse_or(
                get("DB_CONNECT_TIMEOUT_SECS"),
                "DB_CONNECT_TIMEOUT_SECS",
                DEFAULT_DB_CONNECT_TIMEOUT_SECS,
            ),
            db_idle_timeout_secs: parse_or(
                get("DB_IDLE_TIMEOUT_SECS"),
                "DB_IDLE_TIMEOUT_SECS",
                DEFAULT_DB_IDLE_TIMEOUT_SECS,
            ),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            uploads_dir: get("UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOADS_DIR)),
            session_ttl: Duration::from_secs(
                parse_or(
                    get("SESSION_TTL_MINUTES"),
                    "SESSION_TTL_MINUTES",
                    DEFAULT_SESSION_TTL_MINUTES,
                )
                .saturating_mul(60),
            ),
            cors_origins: split_origins(
                &get("CORS_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string()),
            ),
            cookie_secure: get("COOKIE_SECURE").is_some_and(|v| is_truthy(&v)),
            max_upload_bytes: parse_or(get("MAX_UPLOAD_MB"), "MAX_UPLOAD_MB", DEFAULT_MAX_UPLOAD_MB)
                .saturating_mul(1024 * 1024),
            admin_username: get("ADMIN_USERNAME")
                .unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.to_string()),
            admin_password: get("ADMIN_PASSWORD"),
        }
    }

    /// Database pool configuration derived from the DB_* settings
    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            database_url: self.db_url.clone(),
            max_connections: self.db_max_connections,
            ..Default::default()
        }
        .connect_timeout(self.db_connect_timeout_secs)
        .idle_timeout(self.db_idle_timeout_secs)
        .credentials(self.db_user.clone(), self.db_pass.clone())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("db_url", &self.db_url)
            .field("db_user", &self.db_user)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_connect_timeout_secs", &self.db_connect_timeout_secs)
            .field("db_idle_timeout_secs", &self.db_idle_timeout_secs)
            .field("bind_addr", &self.bind_addr)
            .field("uploads_dir", &self.uploads_dir)
            .field("session_ttl", &self.session_ttl)
            .field("cors_origins", &self.cors_origins)
            .field("cookie_secure", &self.cookie_secure)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("admin_username", &self.admin_username)
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn get_or_warn(value: Option<String>, key: &str, default: &str) -> String {
    value.unwrap_or_else(|| {
        tracing::warn!("{} not set, falling back to the built-in default", key);
        default.to_string()
    })
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> T {
    match value {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        None => default,
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    // ========================================================================
    // Lookup-based Tests (no env var dependencies - thread safe)
    // ========================================================================

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = config_from(&[]);

        assert_eq!(config.db_url, DEFAULT_DB_URL);
        assert_eq!(config.db_user, DEFAULT_DB_USER);
        assert_eq!(config.db_pass, DEFAULT_DB_PASS);
        assert_eq!(config.db_max_connections, 10);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.uploads_dir, PathBuf::from("uploads"));
        assert_eq!(config.session_ttl, Duration::from_secs(30 * 60));
        assert_eq!(config.cors_origins, vec!["http://localhost:5173".to_string()]);
        assert!(!config.cookie_secure);
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(config.admin_username, "admin");
        assert!(config.admin_password.is_none());
        assert_eq!(config.db_connect_timeout_secs, 30);
        assert_eq!(config.db_idle_timeout_secs, 600);
    }

    #[test]
    fn test_values_from_lookup() {
        let config = config_from(&[
            ("DB_URL", "postgres://db:5432/uml"),
            ("DB_USER", "editor"),
            ("DB_PASS", "pw"),
            ("DB_MAX_CONNECTIONS", "25"),
            ("BIND_ADDR", "0.0.0.0:9000"),
            ("UPLOADS_DIR", "/var/lib/uml/uploads"),
            ("SESSION_TTL_MINUTES", "5"),
            ("COOKIE_SECURE", "true"),
            ("MAX_UPLOAD_MB", "2"),
            ("ADMIN_PASSWORD", "bootstrap"),
        ]);

        assert_eq!(config.db_url, "postgres://db:5432/uml");
        assert_eq!(config.db_user, "editor");
        assert_eq!(config.db_pass, "pw");
        assert_eq!(config.db_max_connections, 25);
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.uploads_dir, PathBuf::from("/var/lib/uml/uploads"));
        assert_eq!(config.session_ttl, Duration::from_secs(300));
        assert!(config.cookie_secure);
        assert_eq!(config.max_upload_bytes, 2 * 1024 * 1024);
        assert_eq!(config.admin_password.as_deref(), Some("bootstrap"));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = config_from(&[("DB_URL", "   "), ("BIND_ADDR", "")]);
        assert_eq!(config.db_url, DEFAULT_DB_URL);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
    }

    #[test]
    fn test_invalid_numbers_fall_back_to_defaults() {
        let config = config_from(&[
            ("SESSION_TTL_MINUTES", "soon"),
            ("DB_MAX_CONNECTIONS", "-3"),
        ]);
        assert_eq!(config.session_ttl, Duration::from_secs(30 * 60));
        assert_eq!(config.db_max_connections, 10);
    }

    #[test]
    fn test_huge_numbers_saturate() {
        let config = config_from(&[
            ("SESSION_TTL_MINUTES", &u64::MAX.to_string()),
            ("MAX_UPLOAD_MB", &usize::MAX.to_string()),
        ]);
        assert_eq!(config.session_ttl, Duration::from_secs(u64::MAX));
        assert_eq!(config.max_upload_bytes, usize::MAX);
    }

    #[test]
    fn test_cors_origins_are_split_and_trimmed() {
        let config = config_from(&[(
            "CORS_ORIGINS",
            "http://localhost:5173/, https://uml.example.com ,,",
        )]);
        assert_eq!(
            config.cors_origins,
            vec![
                "http://localhost:5173".to_string(),
                "https://uml.example.com".to_string()
            ]
        );
    }

    #[test]
    fn test_cookie_secure_truthiness() {
        assert!(is_truthy("1"));
        assert!(is_truthy("YES"));
        assert!(is_truthy(" on "));
        assert!(!is_truthy("false"));
        assert!(!is_truthy("0"));
    }

    #[test]
    fn test_db_config_carries_credentials() {
        let config = config_from(&[
            ("DB_URL", "postgres://db/uml"),
            ("DB_USER", "editor"),
            ("DB_PASS", "pw"),
            ("DB_MAX_CONNECTIONS", "4"),
            ("DB_CONNECT_TIMEOUT_SECS", "5"),
            ("DB_IDLE_TIMEOUT_SECS", "90"),
        ]);

        let db = config.db_config();
        assert_eq!(db.connect_timeout_secs, 5);
        assert_eq!(db.idle_timeout_secs, 90);
        assert_eq!(db.database_url, "postgres://db/uml");
        assert_eq!(db.username.as_deref(), Some("editor"));
        assert_eq!(db.password.as_deref(), Some("pw"));
        assert_eq!(db.max_connections, 4);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = config_from(&[("DB_PASS", "hunter2"), ("ADMIN_PASSWORD", "letmein")]);
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("letmein"));
    }
}
