//! Role endpoints

pub mod api;

pub use api::{RoleApiState, role_api_router};
