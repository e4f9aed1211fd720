//! Connection endpoints

pub mod api;

pub use api::{ConnectionApiState, connection_api_router};
