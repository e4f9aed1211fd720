//! Authentication for the UML editor
//!
//! - Cookie-backed in-memory sessions
//! - Username/password login against the users table
//! - A gate middleware protecting every `/api` route

pub mod api;
pub mod gate;
pub mod service;
pub mod session;

pub use api::{AuthApiState, auth_api_router};
pub use gate::require_session;
pub use service::{AuthError, AuthService};
pub use session::{SESSION_COOKIE, SessionStore, SessionUser};
