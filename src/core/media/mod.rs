//! Media uploads: multipart endpoint plus the on-disk store

pub mod api;
pub mod storage;

pub use api::{MediaApiState, media_api_router};
pub use storage::MediaStorage;
