//! Database repositories for the UML editor
//!
//! Repositories encapsulate the SQL for one table (or one join table) each.
//! Ownership checks live in `crate::core::access`, not here.

pub mod attachment;
pub mod connection;
pub mod diagram;
pub mod element;
pub mod media;
pub mod role;
pub mod user;

pub use attachment::{DiagramMediaRepository, ElementMediaRepository};
pub use connection::ConnectionRepository;
pub use diagram::DiagramRepository;
pub use element::ElementRepository;
pub use media::MediaRepository;
pub use role::RoleRepository;
pub use user::{UserRepository, UserRepositoryError};

/// Error type shared by the plain CRUD repositories
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}
