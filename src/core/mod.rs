//! Core backend: configuration, persistence, auth and the HTTP endpoints

pub mod access;
pub mod api;
pub mod attachments;
pub mod auth;
pub mod config;
pub mod connections;
pub mod db;
pub mod diagrams;
pub mod elements;
pub mod media;
pub mod roles;
pub mod router;
pub mod users;

pub use router::build_router;
