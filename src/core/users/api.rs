//! User administration endpoints
//!
//! - GET /api/usuarios?id_usuario=N - Get one user (admin or self)
//! - GET /api/usuarios - List all users (admin)
//! - POST /api/usuarios - Create a user (admin)
//! - PUT /api/usuarios - Replace a user's fields (admin or self)
//! - DELETE /api/usuarios?id_usuario=N - Delete a user (admin)

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;

use crate::core::access::{authorize, require_admin};
use crate::core::api::{ApiError, OkResponse, OrInternal, Params, Payload, ack};
use crate::core::auth::SessionUser;
use crate::core::db::models::{User, UserFields};
use crate::core::db::repositories::UserRepository;
use crate::core::media::MediaStorage;

#[derive(Clone)]
pub struct UserApiState {
    pub user_repo: UserRepository,
    /// Holds the files of media rows that cascade away with a deleted user
    pub storage: MediaStorage,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub ok: bool,
    pub usuario: User,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub ok: bool,
    pub usuarios: Vec<User>,
}

#[derive(Debug, Serialize)]
pub struct CreatedUserResponse {
    pub ok: bool,
    pub id_usuario: i32,
}

/// Username and password, both required on create and update
fn credentials(payload: &Payload) -> Result<(String, String), ApiError> {
    match (payload.non_blank("nombre_usuario"), payload.non_blank("contrasena")) {
        (Some(username), Some(password)) => Ok((username.trim().to_string(), password)),
        _ => Err(ApiError::incomplete()),
    }
}

/// Role assigned by an update. Only admins may change roles.
fn updated_role(caller: &SessionUser, payload: &Payload) -> Result<i32, ApiError> {
    if caller.is_admin() {
        payload
            .int("id_rol")
            .ok_or(ApiError::BadRequest("id_rol_requerido"))
    } else {
        Ok(caller.role_id)
    }
}

/// Create the user API router
pub fn user_api_router(state: UserApiState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route(
            "/api/usuarios",
            get(get_users_handler)
                .post(create_user_handler)
                .put(update_user_handler)
                .delete(delete_user_handler),
        )
        .with_state(state)
}

/// GET /api/usuarios
async fn get_users_handler(
    State(state): State<Arc<UserApiState>>,
    caller: SessionUser,
    params: Params,
) -> Result<Response, ApiError> {
    if let Some(id) = params.int("id_usuario") {
        if !authorize(&caller, id) {
            tracing::debug!("User {} denied user record {}", caller.user_id, id);
            return Err(ApiError::AccessDenied);
        }

        let user = state
            .user_repo
            .find_by_id(id)
            .await
            .or_internal("error_usuarios")?
            .ok_or(ApiError::NotFound("usuario_no_encontrado"))?;

        return Ok(Json(UserResponse {
            ok: true,
            usuario: user,
        })
        .into_response());
    }

    require_admin(&caller)?;

    let users = state.user_repo.list().await.or_internal("error_usuarios")?;

    Ok(Json(UserListResponse {
        ok: true,
        usuarios: users,
    })
    .into_response())
}

/// POST /api/usuarios
async fn create_user_handler(
    State(state): State<Arc<UserApiState>>,
    caller: SessionUser,
    payload: Payload,
) -> Result<Json<CreatedUserResponse>, ApiError> {
    require_admin(&caller)?;

    let (username, password) = credentials(&payload)?;
    let role_id = payload.int("id_rol").ok_or_else(ApiError::incomplete)?;

    let fields = UserFields {
        username,
        email: payload.non_blank("correo"),
        password,
        role_id,
    };

    let id = state
        .user_repo
        .create(&fields)
        .await
        .or_internal("error_crear_usuario")?;

    tracing::info!("User {} created with role {}", id, role_id);

    Ok(Json(CreatedUserResponse {
        ok: true,
        id_usuario: id,
    }))
}

/// PUT /api/usuarios
async fn update_user_handler(
    State(state): State<Arc<UserApiState>>,
    caller: SessionUser,
    payload: Payload,
) -> Result<Json<OkResponse>, ApiError> {
    let id = payload
        .int("id_usuario")
        .ok_or(ApiError::BadRequest("id_usuario_requerido"))?;

    if !authorize(&caller, id) {
        tracing::debug!("User {} denied update of user {}", caller.user_id, id);
        return Err(ApiError::AccessDenied);
    }

    let (username, password) = credentials(&payload)?;
    let fields = UserFields {
        username,
        email: payload.non_blank("correo"),
        password,
        role_id: updated_role(&caller, &payload)?,
    };

    let updated = state
        .user_repo
        .update(id, &fields)
        .await
        .or_internal("error_actualizar_usuario")?;
    if !updated {
        return Err(ApiError::NotFound("usuario_no_encontrado"));
    }

    tracing::info!("User {} updated by user {}", id, caller.user_id);
    Ok(ack())
}

/// DELETE /api/usuarios
/// The user's media rows cascade. Their files are removed afterwards and a
/// file that cannot be removed is only logged.
async fn delete_user_handler(
    State(state): State<Arc<UserApiState>>,
    caller: SessionUser,
    params: Params,
) -> Result<Json<OkResponse>, ApiError> {
    require_admin(&caller)?;

    let id = params
        .int("id_usuario")
        .ok_or(ApiError::BadRequest("id_usuario_requerido"))?;

    let media_paths = state
        .user_repo
        .delete(id)
        .await
        .or_internal("error_eliminar_usuario")?
        .ok_or(ApiError::NotFound("usuario_no_encontrado"))?;

    for path in &media_paths {
        if let Err(err) = state.storage.remove(path).await {
            tracing::warn!("Failed to remove {} of deleted user {}: {}", path, id, err);
        }
    }

    tracing::info!(
        "User {} deleted by admin {} ({} media files)",
        id,
        caller.user_id,
        media_paths.len()
    );
    Ok(ack())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::api::test_support::{caller, send};
    use crate::core::db::models::ADMIN_ROLE_ID;
    use crate::core::db::repositories::test_support;
    use axum::http::StatusCode;
    use serde_json::json;

    fn router(pool: sqlx::PgPool) -> Router {
        router_with_storage(pool, MediaStorage::new("uploads"))
    }

    fn router_with_storage(pool: sqlx::PgPool, storage: MediaStorage) -> Router {
        user_api_router(UserApiState {
            user_repo: UserRepository::new(pool),
            storage,
        })
    }

    // ========================================================================
    // Validation Tests
    // ========================================================================

    #[test]
    fn test_credentials_required() {
        let payload = Payload::from(json!({"nombre_usuario": " ana ", "contrasena": "pw"}));
        assert_eq!(credentials(&payload).unwrap(), ("ana".to_string(), "pw".to_string()));

        let payload = Payload::from(json!({"nombre_usuario": "ana", "contrasena": "  "}));
        assert_eq!(credentials(&payload).unwrap_err(), ApiError::incomplete());
    }

    #[test]
    fn test_non_admin_keeps_session_role() {
        let payload = Payload::from(json!({"id_rol": ADMIN_ROLE_ID}));
        assert_eq!(updated_role(&caller(5, 2), &payload).unwrap(), 2);
    }

    #[test]
    fn test_admin_must_send_role() {
        let admin = caller(1, ADMIN_ROLE_ID);
        assert_eq!(
            updated_role(&admin, &Payload::default()).unwrap_err(),
            ApiError::BadRequest("id_rol_requerido")
        );
        assert_eq!(
            updated_role(&admin, &Payload::from(json!({"id_rol": "3"}))).unwrap(),
            3
        );
    }

    // ========================================================================
    // Router Tests
    // ========================================================================

    #[tokio::test]
    async fn test_list_is_admin_only() {
        let (status, body) =
            send(router(test_support::lazy_pool()), caller(5, 2), "GET", "/api/usuarios", json!(null))
                .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["mensaje"], "acceso_denegado");
    }

    #[tokio::test]
    async fn test_reading_another_user_is_denied() {
        let (status, _) = send(
            router(test_support::lazy_pool()),
            caller(5, 2),
            "GET",
            "/api/usuarios?id_usuario=6",
            json!(null),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_create_and_delete_are_admin_only() {
        let app = router(test_support::lazy_pool());

        let (status, _) = send(
            app.clone(),
            caller(5, 2),
            "POST",
            "/api/usuarios",
            json!({"nombre_usuario": "eva", "contrasena": "pw", "id_rol": 1}),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) =
            send(app, caller(5, 2), "DELETE", "/api/usuarios?id_usuario=5", json!(null)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_update_validation_order() {
        let app = router(test_support::lazy_pool());

        let (status, body) =
            send(app.clone(), caller(5, 2), "PUT", "/api/usuarios", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["mensaje"], "id_usuario_requerido");

        let (status, _) = send(
            app.clone(),
            caller(5, 2),
            "PUT",
            "/api/usuarios",
            json!({"id_usuario": 6, "nombre_usuario": "x", "contrasena": "y"}),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            app,
            caller(1, ADMIN_ROLE_ID),
            "PUT",
            "/api/usuarios",
            json!({"id_usuario": 6, "nombre_usuario": "x", "contrasena": "y"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["mensaje"], "id_rol_requerido");
    }

    // ========================================================================
    // Integration Tests (require database)
    // ========================================================================

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_admin_creates_user_and_user_edits_self() {
        let pool = test_support::pool().await;
        let app = router(pool.clone());
        let admin = caller(1, ADMIN_ROLE_ID);
        let username = test_support::unique_name("api_user");

        let (status, body) = send(
            app.clone(),
            admin.clone(),
            "POST",
            "/api/usuarios",
            json!({"nombre_usuario": username, "contrasena": "pw1", "id_rol": 2, "correo": ""}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = body["id_usuario"].as_i64().unwrap() as i32;

        // A self-update cannot escalate the role
        let renamed = format!("{}_x", username);
        let (status, _) = send(
            app.clone(),
            caller(id, 2),
            "PUT",
            "/api/usuarios",
            json!({"id_usuario": id, "nombre_usuario": renamed, "contrasena": "pw2", "id_rol": 1}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(
            app.clone(),
            caller(id, 2),
            "GET",
            &format!("/api/usuarios?id_usuario={}", id),
            json!(null),
        )
        .await;
        assert_eq!(body["usuario"]["nombre_usuario"], renamed);
        assert_eq!(body["usuario"]["id_rol"], 2);
        assert!(body["usuario"]["correo"].is_null());
        assert!(body["usuario"].get("contrasena").is_none());
        assert!(body["usuario"].get("password").is_none());

        let (status, _) = send(
            app.clone(),
            admin.clone(),
            "DELETE",
            &format!("/api/usuarios?id_usuario={}", id),
            json!(null),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            app,
            admin,
            "DELETE",
            &format!("/api/usuarios?id_usuario={}", id),
            json!(null),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["mensaje"], "usuario_no_encontrado");
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_delete_removes_uploaded_files() {
        let pool = test_support::pool().await;
        let tmp = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(tmp.path());
        let app = router_with_storage(pool.clone(), storage.clone());
        let id = test_support::user(&pool).await;

        let stored = storage.save(b"ID3 song", "mp3").await.unwrap();
        sqlx::query(
            "INSERT INTO media_files (owner_id, kind, size_bytes, path) VALUES ($1, 'AUDIO', 8, $2)",
        )
        .bind(id)
        .bind(&stored)
        .execute(&pool)
        .await
        .unwrap();
        let on_disk = storage.resolve(&stored).unwrap();
        assert!(on_disk.exists());

        let (status, _) = send(
            app,
            caller(1, ADMIN_ROLE_ID),
            "DELETE",
            &format!("/api/usuarios?id_usuario={}", id),
            json!(null),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(!on_disk.exists());
    }
}
