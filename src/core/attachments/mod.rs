//! Diagram and element media attachments

pub mod api;

pub use api::{AttachmentApiState, attachment_api_router};
