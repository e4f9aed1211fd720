//! Connection API endpoints
//!
//! - GET /api/conexiones?id_conexion=N - Get one connection
//! - GET /api/conexiones?id_diagrama=N - List a diagram's connections
//! - POST /api/conexiones - Create a connection
//! - PUT /api/conexiones - Replace a connection's fields
//! - DELETE /api/conexiones?id_conexion=N - Delete a connection

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;

use crate::core::access::{AccessGuard, OwnedResource};
use crate::core::api::{ApiError, OkResponse, OrInternal, Params, Payload, ack};
use crate::core::auth::SessionUser;
use crate::core::db::models::{Connection, ConnectionFields, ConnectionKind};
use crate::core::db::repositories::{ConnectionRepository, ElementRepository};

#[derive(Clone)]
pub struct ConnectionApiState {
    pub connection_repo: ConnectionRepository,
    pub element_repo: ElementRepository,
    pub access: AccessGuard,
}

#[derive(Debug, Serialize)]
pub struct ConnectionResponse {
    pub ok: bool,
    pub conexion: Connection,
}

#[derive(Debug, Serialize)]
pub struct ConnectionListResponse {
    pub ok: bool,
    pub conexiones: Vec<Connection>,
}

#[derive(Debug, Serialize)]
pub struct CreatedConnectionResponse {
    pub ok: bool,
    pub id_conexion: i32,
}

fn connection_fields(payload: &Payload) -> Result<ConnectionFields, ApiError> {
    let (Some(diagram_id), Some(source_id), Some(target_id), Some(kind)) = (
        payload.int("id_diagrama"),
        payload.int("id_elemento_origen"),
        payload.int("id_elemento_destino"),
        payload.parse::<ConnectionKind>("tipo_conexion"),
    ) else {
        return Err(ApiError::incomplete());
    };

    Ok(ConnectionFields {
        diagram_id,
        source_id,
        target_id,
        kind,
        label: payload.non_blank("etiqueta"),
        points_json: payload.non_blank("puntos_json"),
        style_json: payload.non_blank("estilo_json"),
    })
}

impl ConnectionApiState {
    /// Both endpoints must be elements of the connection's diagram
    async fn check_endpoints(
        &self,
        fields: &ConnectionFields,
        internal_code: &'static str,
    ) -> Result<(), ApiError> {
        let expected = if fields.source_id == fields.target_id { 1 } else { 2 };
        let found = self
            .element_repo
            .count_in_diagram(&[fields.source_id, fields.target_id], fields.diagram_id)
            .await
            .or_internal(internal_code)?;

        if found == expected {
            Ok(())
        } else {
            Err(ApiError::BadRequest("elementos_invalidos"))
        }
    }
}

/// Create the connection API router
pub fn connection_api_router(state: ConnectionApiState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route(
            "/api/conexiones",
            get(get_connections_handler)
                .post(create_connection_handler)
                .put(update_connection_handler)
                .delete(delete_connection_handler),
        )
        .with_state(state)
}

/// GET /api/conexiones
async fn get_connections_handler(
    State(state): State<Arc<ConnectionApiState>>,
    caller: SessionUser,
    params: Params,
) -> Result<Response, ApiError> {
    if let Some(id) = params.int("id_conexion") {
        let connection = state
            .connection_repo
            .find_by_id(id)
            .await
            .or_internal("error_conexiones")?
            .ok_or(ApiError::NotFound("conexion_no_encontrada"))?;

        state
            .access
            .require(&caller, OwnedResource::Diagram(connection.diagram_id), "error_conexiones")
            .await?;

        return Ok(Json(ConnectionResponse {
            ok: true,
            conexion: connection,
        })
        .into_response());
    }

    let diagram_id = params
        .int("id_diagrama")
        .ok_or(ApiError::BadRequest("id_diagrama_requerido"))?;

    state
        .access
        .require(&caller, OwnedResource::Diagram(diagram_id), "error_conexiones")
        .await?;

    let connections = state
        .connection_repo
        .list_by_diagram(diagram_id)
        .await
        .or_internal("error_conexiones")?;

    Ok(Json(ConnectionListResponse {
        ok: true,
        conexiones: connections,
    })
    .into_response())
}

/// POST /api/conexiones
async fn create_connection_handler(
    State(state): State<Arc<ConnectionApiState>>,
    caller: SessionUser,
    payload: Payload,
) -> Result<Json<CreatedConnectionResponse>, ApiError> {
    let fields = connection_fields(&payload)?;

    state
        .access
        .require(&caller, OwnedResource::Diagram(fields.diagram_id), "error_crear_conexion")
        .await?;
    state.check_endpoints(&fields, "error_crear_conexion").await?;

    let id = state
        .connection_repo
        .create(&fields)
        .await
        .or_internal("error_crear_conexion")?;

    tracing::info!(
        "Connection {} created in diagram {} ({} -> {})",
        id,
        fields.diagram_id,
        fields.source_id,
        fields.target_id
    );

    Ok(Json(CreatedConnectionResponse {
        ok: true,
        id_conexion: id,
    }))
}

/// PUT /api/conexiones
async fn update_connection_handler(
    State(state): State<Arc<ConnectionApiState>>,
    caller: SessionUser,
    payload: Payload,
) -> Result<Json<OkResponse>, ApiError> {
    let id = payload.int("id_conexion").ok_or_else(ApiError::incomplete)?;
    let fields = connection_fields(&payload)?;

    state
        .access
        .require(&caller, OwnedResource::Connection(id), "error_actualizar_conexion")
        .await?;
    state
        .access
        .require(&caller, OwnedResource::Diagram(fields.diagram_id), "error_actualizar_conexion")
        .await?;
    state.check_endpoints(&fields, "error_actualizar_conexion").await?;

    let updated = state
        .connection_repo
        .update(id, &fields)
        .await
        .or_internal("error_actualizar_conexion")?;
    if !updated {
        return Err(ApiError::NotFound("conexion_no_encontrada"));
    }

    tracing::info!("Connection {} updated by user {}", id, caller.user_id);
    Ok(ack())
}

/// DELETE /api/conexiones
async fn delete_connection_handler(
    State(state): State<Arc<ConnectionApiState>>,
    caller: SessionUser,
    params: Params,
) -> Result<Json<OkResponse>, ApiError> {
    let id = params
        .int("id_conexion")
        .ok_or(ApiError::BadRequest("id_conexion_requerido"))?;

    state
        .access
        .require(&caller, OwnedResource::Connection(id), "error_eliminar_conexion")
        .await?;

    let deleted = state
        .connection_repo
        .delete(id)
        .await
        .or_internal("error_eliminar_conexion")?;
    if !deleted {
        return Err(ApiError::NotFound("conexion_no_encontrada"));
    }

    tracing::info!("Connection {} deleted by user {}", id, caller.user_id);
    Ok(ack())
}
