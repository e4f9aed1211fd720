//! Session gate in front of the `/api` routes
//!
//! Resolves the `UMLSESSION` cookie and stores the caller in the request
//! extensions, where the [`SessionUser`] extractor picks it up.

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::core::api::ApiError;
use crate::core::auth::{SESSION_COOKIE, SessionStore, SessionUser};

/// Paths reachable without a session
const PUBLIC_API_PATHS: &[&str] = &["/api/auth/login"];

fn requires_session(method: &Method, path: &str) -> bool {
    if method == Method::OPTIONS {
        return false;
    }
    let is_api = path == "/api" || path.starts_with("/api/");
    is_api && !PUBLIC_API_PATHS.contains(&path)
}

/// Middleware rejecting unauthenticated `/api` requests with 401
pub async fn require_session(
    State(sessions): State<SessionStore>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if !requires_session(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    let user: Option<SessionUser> = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| sessions.get(cookie.value()));

    match user {
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => {
            tracing::debug!("Rejected {} {} without session", request.method(), request.uri().path());
            ApiError::Unauthenticated.into_response()
        }
    }
}
