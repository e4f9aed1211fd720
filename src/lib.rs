//! UML Editor - persistence and access-control backend
//!
//! Serves the JSON API behind the browser-based UML diagram editor:
//! diagrams, elements, connections, media uploads, users and roles, all
//! scoped to the logged-in user.

pub mod core;
