//! Element endpoints

pub mod api;

pub use api::{ElementApiState, element_api_router};
