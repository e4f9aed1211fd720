//! Diagram endpoints

pub mod api;

pub use api::{DiagramApiState, diagram_api_router};
