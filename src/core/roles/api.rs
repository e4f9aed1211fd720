//! Role endpoints
//!
//! - GET /api/roles - List roles
//! - GET /api/roles?id_rol=N - Get one role
//! - POST /api/roles - Create a role (admin)
//! - PUT /api/roles - Replace a role's fields (admin)
//! - DELETE /api/roles?id_rol=N - Delete an unused role (admin)

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;

use crate::core::access::require_admin;
use crate::core::api::{ApiError, OkResponse, OrInternal, Params, Payload, ack};
use crate::core::auth::SessionUser;
use crate::core::db::models::{Role, RoleFields};
use crate::core::db::repositories::RoleRepository;

#[derive(Clone)]
pub struct RoleApiState {
    pub role_repo: RoleRepository,
}

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub ok: bool,
    pub rol: Role,
}

#[derive(Debug, Serialize)]
pub struct RoleListResponse {
    pub ok: bool,
    pub roles: Vec<Role>,
}

#[derive(Debug, Serialize)]
pub struct CreatedRoleResponse {
    pub ok: bool,
    pub id_rol: i32,
}

fn role_fields(payload: &Payload) -> Result<RoleFields, ApiError> {
    let name = payload
        .non_blank("nombre_rol")
        .ok_or_else(ApiError::incomplete)?;

    Ok(RoleFields {
        name: name.trim().to_string(),
        description: payload.non_blank("descripcion"),
    })
}

/// Create the role API router
pub fn role_api_router(state: RoleApiState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route(
            "/api/roles",
            get(get_roles_handler)
                .post(create_role_handler)
                .put(update_role_handler)
                .delete(delete_role_handler),
        )
        .with_state(state)
}

/// GET /api/roles
async fn get_roles_handler(
    State(state): State<Arc<RoleApiState>>,
    _caller: SessionUser,
    params: Params,
) -> Result<Response, ApiError> {
    if let Some(id) = params.int("id_rol") {
        let role = state
            .role_repo
            .find_by_id(id)
            .await
            .or_internal("error_roles")?
            .ok_or(ApiError::NotFound("rol_no_encontrado"))?;

        return Ok(Json(RoleResponse { ok: true, rol: role }).into_response());
    }

    let roles = state.role_repo.list().await.or_internal("error_roles")?;
    Ok(Json(RoleListResponse { ok: true, roles }).into_response())
}

/// POST /api/roles
async fn create_role_handler(
    State(state): State<Arc<RoleApiState>>,
    caller: SessionUser,
    payload: Payload,
) -> Result<Json<CreatedRoleResponse>, ApiError> {
    require_admin(&caller)?;
    let fields = role_fields(&payload)?;

    let id = state
        .role_repo
        .create(&fields)
        .await
        .or_internal("error_crear_rol")?;

    tracing::info!("Role {} ({}) created", id, fields.name);
    Ok(Json(CreatedRoleResponse { ok: true, id_rol: id }))
}

/// PUT /api/roles
async fn update_role_handler(
    State(state): State<Arc<RoleApiState>>,
    caller: SessionUser,
    payload: Payload,
) -> Result<Json<OkResponse>, ApiError> {
    require_admin(&caller)?;

    let id = payload
        .int("id_rol")
        .ok_or(ApiError::BadRequest("id_rol_requerido"))?;
    let fields = role_fields(&payload)?;

    let updated = state
        .role_repo
        .update(id, &fields)
        .await
        .or_internal("error_actualizar_rol")?;
    if !updated {
        return Err(ApiError::NotFound("rol_no_encontrado"));
    }

    tracing::info!("Role {} updated", id);
    Ok(ack())
}

/// DELETE /api/roles
/// Roles still assigned to users cannot be deleted (500)
async fn delete_role_handler(
    State(state): State<Arc<RoleApiState>>,
    caller: SessionUser,
    params: Params,
) -> Result<Json<OkResponse>, ApiError> {
    require_admin(&caller)?;

    let id = params
        .int("id_rol")
        .ok_or(ApiError::BadRequest("id_rol_requerido"))?;

    let deleted = state
        .role_repo
        .delete(id)
        .await
        .or_internal("error_eliminar_rol")?;
    if !deleted {
        return Err(ApiError::NotFound("rol_no_encontrado"));
    }

    tracing::info!("Role {} deleted", id);
    Ok(ack())
}
