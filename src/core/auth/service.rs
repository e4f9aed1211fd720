//! Authentication service
//!
//! Checks a username/password pair against the users table and produces the
//! identity stored in the session.

use crate::core::auth::SessionUser;
use crate::core::db::repositories::{UserRepository, UserRepositoryError};

/// Authentication service error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Username or password missing")]
    MissingCredentials,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Internal error: {0}")]
    Repository(#[from] UserRepositoryError),
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
}

impl AuthService {
    pub fn new(users: UserRepository) -> Self {
        Self { users }
    }

    /// Verify credentials and return the session identity.
    ///
    /// The username is matched after trimming; the password is compared as sent.
    /// A legacy plain-text password is re-hashed after a successful match.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SessionUser, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let credentials = self
            .users
            .find_credentials(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !UserRepository::verify_password(password, &credentials.password)? {
            return Err(AuthError::InvalidCredentials);
        }

        if !UserRepository::is_hashed(&credentials.password) {
            // Login already succeeded; a failed upgrade is retried next time
            match self.users.update_password(credentials.id, password).await {
                Ok(()) => tracing::info!("Upgraded password storage for user {}", credentials.id),
                Err(e) => tracing::warn!(
                    "Failed to upgrade password storage for user {}: {}",
                    credentials.id,
                    e
                ),
            }
        }

        Ok(SessionUser {
            user_id: credentials.id,
            role_id: credentials.role_id,
            username: credentials.username,
            role_name: credentials.role_name,
        })
    }
}
