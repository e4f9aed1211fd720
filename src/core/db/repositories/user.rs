//! User repository for database operations
//!
//! Provides CRUD operations for users with password hashing using bcrypt.
//! Rows created before hashing was introduced may still hold a plain-text
//! password; `verify_password` accepts those and the auth service re-hashes
//! them on the next successful login.

use sqlx::PgPool;

use crate::core::db::models::{ADMIN_ROLE_ID, User, UserCredentials, UserFields};

/// Cost factor for bcrypt hashing (12 is recommended for production)
const BCRYPT_COST: u32 = 12;

const USER_COLUMNS: &str = r#"
    u.id, u.username, u.email, u.role_id, r.name AS role_name, u.created_at, u.updated_at
    FROM users u
    JOIN roles r ON r.id = u.role_id
"#;

/// User repository error types
#[derive(Debug, thiserror::Error)]
pub enum UserRepositoryError {
    #[error("Password hashing failed: {0}")]
    HashingError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Hash a password using bcrypt with automatic salt generation
    pub fn hash_password(password: &str) -> Result<String, UserRepositoryError> {
        bcrypt::hash(password, BCRYPT_COST)
            .map_err(|e| UserRepositoryError::HashingError(e.to_string()))
    }

    /// Whether a stored value is a bcrypt hash rather than legacy plain text
    pub fn is_hashed(stored: &str) -> bool {
        stored.starts_with("$2a$") || stored.starts_with("$2b$") || stored.starts_with("$2y$")
    }

    /// Verify a password against the stored value (bcrypt hash or legacy plain text)
    pub fn verify_password(password: &str, stored: &str) -> Result<bool, UserRepositoryError> {
        if Self::is_hashed(stored) {
            bcrypt::verify(password, stored)
                .map_err(|e| UserRepositoryError::HashingError(e.to_string()))
        } else {
            Ok(!stored.is_empty() && password == stored)
        }
    }

    /// Create a user; the plain-text password in `fields` is hashed first
    pub async fn create(&self, fields: &UserFields) -> Result<i32, UserRepositoryError> {
        let password_hash = Self::hash_password(&fields.password)?;

        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO users (username, email, password, role_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&fields.username)
        .bind(&fields.email)
        .bind(&password_hash)
        .bind(fields.role_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Find user by ID, joined with its role name
    pub async fn find_by_id(&self, id: i32) -> Result<Option<User>, UserRepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {} WHERE u.id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Load the stored credentials for a login attempt
    pub async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<UserCredentials>, UserRepositoryError> {
        let credentials = sqlx::query_as::<_, UserCredentials>(
            r#"
            SELECT u.id, u.username, u.password, u.role_id, r.name AS role_name
            FROM users u
            JOIN roles r ON r.id = u.role_id
            WHERE u.username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(credentials)
    }

    /// List all users ordered by id
    pub async fn list(&self) -> Result<Vec<User>, UserRepositoryError> {
        let users = sqlx::query_as::<_, User>(&format!("SELECT {} ORDER BY u.id", USER_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    /// Replace every editable column. Returns false when no row matched.
    pub async fn update(&self, id: i32, fields: &UserFields) -> Result<bool, UserRepositoryError> {
        let password_hash = Self::hash_password(&fields.password)?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, email = $3, password = $4, role_id = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&fields.username)
        .bind(&fields.email)
        .bind(&password_hash)
        .bind(fields.role_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Store a freshly hashed password for a user
    pub async fn update_password(&self, id: i32, password: &str) -> Result<(), UserRepositoryError> {
        let password_hash = Self::hash_password(password)?;

        sqlx::query("UPDATE users SET password = $2 WHERE id = $1")
            .bind(id)
            .bind(&password_hash)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete user. Their diagrams and media rows cascade.
    /// Returns the stored paths of the cascaded media so the caller can remove
    /// the files, or `None` when no user matched.
    pub async fn delete(&self, id: i32) -> Result<Option<Vec<String>>, UserRepositoryError> {
        let mut tx = self.pool.begin().await?;

        let paths = sqlx::query_scalar::<_, String>(
            "SELECT path FROM media_files WHERE owner_id = $1 ORDER BY id FOR UPDATE",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok((result.rows_affected() > 0).then_some(paths))
    }

    /// Create the bootstrap administrator unless an admin already exists.
    /// Returns the new user's id when one was created.
    pub async fn ensure_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<i32>, UserRepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE role_id = $1)",
        )
        .bind(ADMIN_ROLE_ID)
        .fetch_one(&self.pool)
        .await?;

        if exists {
            return Ok(None);
        }

        let id = self
            .create(&UserFields {
                username: username.to_string(),
                email: None,
                password: password.to_string(),
                role_id: ADMIN_ROLE_ID,
            })
            .await?;

        Ok(Some(id))
    }
}
