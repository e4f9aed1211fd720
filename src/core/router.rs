//! Application router
//!
//! Merges every endpoint group, serves stored media under `/uploads`, and
//! wraps the whole thing in the session gate, compression, request tracing
//! and CORS (outermost, so preflights never reach the gate).

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
};
use sqlx::PgPool;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::core::access::AccessGuard;
use crate::core::attachments::{AttachmentApiState, attachment_api_router};
use crate::core::auth::{AuthApiState, AuthService, SessionStore, auth_api_router, require_session};
use crate::core::config::Config;
use crate::core::connections::{ConnectionApiState, connection_api_router};
use crate::core::db::repositories::{
    ConnectionRepository, DiagramMediaRepository, DiagramRepository, ElementMediaRepository,
    ElementRepository, MediaRepository, RoleRepository, UserRepository,
};
use crate::core::diagrams::{DiagramApiState, diagram_api_router};
use crate::core::elements::{ElementApiState, element_api_router};
use crate::core::media::{MediaApiState, MediaStorage, media_api_router};
use crate::core::roles::{RoleApiState, role_api_router};
use crate::core::users::{UserApiState, user_api_router};

/// Build the complete HTTP application
pub fn build_router(pool: PgPool, sessions: SessionStore, config: &Config) -> Router {
    let access = AccessGuard::new(pool.clone());

    let auth_api = auth_api_router(AuthApiState {
        auth_service: AuthService::new(UserRepository::new(pool.clone())),
        sessions: sessions.clone(),
        cookie_secure: config.cookie_secure,
    });

    let diagram_api = diagram_api_router(DiagramApiState {
        diagram_repo: DiagramRepository::new(pool.clone()),
        access: access.clone(),
    });

    let element_api = element_api_router(ElementApiState {
        element_repo: ElementRepository::new(pool.clone()),
        access: access.clone(),
    });

    let connection_api = connection_api_router(ConnectionApiState {
        connection_repo: ConnectionRepository::new(pool.clone()),
        element_repo: ElementRepository::new(pool.clone()),
        access: access.clone(),
    });

    let storage = MediaStorage::new(&config.uploads_dir);

    let media_api = media_api_router(MediaApiState {
        media_repo: MediaRepository::new(pool.clone()),
        access: access.clone(),
        storage: storage.clone(),
        max_upload_bytes: config.max_upload_bytes,
    });

    let attachment_api = attachment_api_router(AttachmentApiState {
        diagram_media_repo: DiagramMediaRepository::new(pool.clone()),
        element_media_repo: ElementMediaRepository::new(pool.clone()),
        access,
    });

    let user_api = user_api_router(UserApiState {
        user_repo: UserRepository::new(pool.clone()),
        storage: storage.clone(),
    });

    let role_api = role_api_router(RoleApiState {
        role_repo: RoleRepository::new(pool),
    });

    Router::new()
        .merge(auth_api)
        .merge(diagram_api)
        .merge(element_api)
        .merge(connection_api)
        .merge(media_api)
        .merge(attachment_api)
        .merge(user_api)
        .merge(role_api)
        .nest_service("/uploads", ServeDir::new(storage.dir()))
        .layer(middleware::from_fn_with_state(sessions, require_session))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins))
}

/// CORS for the browser client, which sends the session cookie cross-origin.
/// Credentials rule out wildcards, so origins, methods and headers are explicit.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
}
