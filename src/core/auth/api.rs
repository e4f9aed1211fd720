//! Auth API endpoints
//!
//! - POST /api/auth/login - Start a session (JSON, form or query credentials)
//! - POST /api/auth/logout - End the current session
//! - GET /api/auth/session - Identity bound to the current session
//! - GET|POST /Login - Legacy login answering `{status: "yes"|"no"}`

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use std::sync::Arc;

use crate::core::api::{ApiError, OkResponse, Params, Payload, ack};
use crate::core::auth::{AuthError, AuthService, SESSION_COOKIE, SessionStore, SessionUser};

/// Role label reported by the legacy endpoint when login fails
const UNDEFINED_ROLE: &str = "nodefinido";

/// Auth API state
#[derive(Clone)]
pub struct AuthApiState {
    pub auth_service: AuthService,
    pub sessions: SessionStore,
    pub cookie_secure: bool,
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => ApiError::BadRequest("credenciales_incompletas"),
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::Repository(e) => {
                tracing::error!("Authentication lookup failed: {}", e);
                ApiError::Internal("error_autenticacion")
            }
        }
    }
}

/// `{ok: true, id_usuario, id_rol, nombre_usuario, nombre_rol}`
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub user: SessionUser,
}

impl From<SessionUser> for SessionResponse {
    fn from(user: SessionUser) -> Self {
        Self { ok: true, user }
    }
}

/// Legacy `/Login` answer
#[derive(Debug, Serialize)]
pub struct LegacyLoginResponse {
    pub status: &'static str,
    pub tipo: String,
    pub nombre_rol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_usuario: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_rol: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nombre_usuario: Option<String>,
}

impl LegacyLoginResponse {
    fn accepted(user: &SessionUser) -> Self {
        Self {
            status: "yes",
            tipo: user.role_name.clone(),
            nombre_rol: user.role_name.clone(),
            id_usuario: Some(user.user_id),
            id_rol: Some(user.role_id),
            nombre_usuario: Some(user.username.clone()),
        }
    }

    fn rejected() -> Self {
        Self {
            status: "no",
            tipo: UNDEFINED_ROLE.to_string(),
            nombre_rol: UNDEFINED_ROLE.to_string(),
            id_usuario: None,
            id_rol: None,
            nombre_usuario: None,
        }
    }
}

/// Username/password pulled from whichever request part carries them
#[derive(Debug, Default, PartialEq)]
struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// The JSON body wins, then a urlencoded body, then the query string.
    /// For each source the first key with a value is used.
    fn extract(body: &[u8], query: Params, username_keys: &[&str], password_keys: &[&str]) -> Self {
        let json = Payload::from_slice(body);
        let params = Params::parse_urlencoded(body).merge(query);

        let pick = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| json.text(key).filter(|v| !v.is_empty()))
                .or_else(|| {
                    keys.iter()
                        .find_map(|key| params.get(key).filter(|v| !v.is_empty()).map(str::to_string))
                })
                .unwrap_or_default()
        };

        Self {
            username: pick(username_keys),
            password: pick(password_keys),
        }
    }
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    // Cross-site cookies must be both Secure and SameSite=None
    let same_site = if secure { SameSite::None } else { SameSite::Lax };

    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(same_site)
        .build()
}

impl AuthApiState {
    /// Open a session for `user`, replacing any session the request already carried
    fn start_session(&self, jar: CookieJar, user: &SessionUser) -> CookieJar {
        if let Some(previous) = jar.get(SESSION_COOKIE) {
            if self.sessions.remove(previous.value()) {
                tracing::debug!("Replaced previous session of user {}", user.user_id);
            }
        }

        let token = self.sessions.create(user.clone());
        jar.add(session_cookie(token, self.cookie_secure))
    }
}

/// Create the auth API router
pub fn auth_api_router(state: AuthApiState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/logout", post(logout_handler))
        .route("/api/auth/session", get(session_handler))
        .route("/Login", get(legacy_login_handler).post(legacy_login_handler))
        .with_state(state)
}

/// POST /api/auth/login
async fn login_handler(
    State(state): State<Arc<AuthApiState>>,
    jar: CookieJar,
    query: Params,
    body: Bytes,
) -> Result<(CookieJar, Json<SessionResponse>), ApiError> {
    let credentials = Credentials::extract(&body, query, &["nombre_usuario"], &["contrasena"]);

    let user = state
        .auth_service
        .authenticate(&credentials.username, &credentials.password)
        .await?;

    let jar = state.start_session(jar, &user);
    tracing::info!("User {} logged in", user.user_id);

    Ok((jar, Json(user.into())))
}

/// POST /api/auth/logout
async fn logout_handler(
    State(state): State<Arc<AuthApiState>>,
    jar: CookieJar,
) -> (CookieJar, Json<OkResponse>) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if state.sessions.remove(cookie.value()) {
            tracing::info!("Session closed");
        }
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, ack())
}

/// GET /api/auth/session
async fn session_handler(user: SessionUser) -> Json<SessionResponse> {
    Json(user.into())
}

/// GET|POST /Login
/// Wrong credentials answer 200 with `status: "no"`. Missing credentials and
/// lookup failures use the regular error envelope.
async fn legacy_login_handler(
    State(state): State<Arc<AuthApiState>>,
    jar: CookieJar,
    query: Params,
    body: Bytes,
) -> Result<(CookieJar, Json<LegacyLoginResponse>), ApiError> {
    let credentials = Credentials::extract(
        &body,
        query,
        &["User", "nombre_usuario"],
        &["password", "contrasena"],
    );

    match state
        .auth_service
        .authenticate(&credentials.username, &credentials.password)
        .await
    {
        Ok(user) => {
            let jar = state.start_session(jar, &user);
            tracing::info!("User {} logged in through legacy endpoint", user.user_id);
            Ok((jar, Json(LegacyLoginResponse::accepted(&user))))
        }
        Err(AuthError::InvalidCredentials) => Ok((jar, Json(LegacyLoginResponse::rejected()))),
        Err(err) => Err(err.into()),
    }
}
