//! Element API endpoints
//!
//! - GET /api/elementos?id_elemento=N - Get one element
//! - GET /api/elementos?id_diagrama=N - List a diagram's elements
//! - POST /api/elementos - Create an element
//! - PUT /api/elementos - Replace an element's fields
//! - DELETE /api/elementos?id_elemento=N - Delete an element

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

use crate::core::access::{AccessGuard, OwnedResource};
use crate::core::api::{ApiError, OkResponse, OrInternal, Params, Payload, ack};
use crate::core::auth::SessionUser;
use crate::core::db::models::{Element, ElementFields, ElementKind};
use crate::core::db::repositories::ElementRepository;

pub const DEFAULT_WIDTH: i32 = 120;
pub const DEFAULT_HEIGHT: i32 = 60;

#[derive(Clone)]
pub struct ElementApiState {
    pub element_repo: ElementRepository,
    pub access: AccessGuard,
}

#[derive(Debug, Serialize)]
pub struct ElementResponse {
    pub ok: bool,
    pub elemento: Element,
}

#[derive(Debug, Serialize)]
pub struct ElementListResponse {
    pub ok: bool,
    pub elementos: Vec<Element>,
}

#[derive(Debug, Serialize)]
pub struct CreatedElementResponse {
    pub ok: bool,
    pub id_elemento: i32,
}

/// Read element fields, applying the geometry defaults.
/// `id_diagrama` and a known `tipo_elemento` are required.
fn element_fields(payload: &Payload) -> Result<ElementFields, ApiError> {
    let diagram_id = payload.int("id_diagrama").ok_or_else(ApiError::incomplete)?;
    let kind = payload
        .parse::<ElementKind>("tipo_elemento")
        .ok_or_else(ApiError::incomplete)?;

    Ok(ElementFields {
        diagram_id,
        parent_id: payload.int("id_elemento_padre"),
        kind,
        label: payload.non_blank("etiqueta"),
        pos_x: payload.int("pos_x").unwrap_or(0),
        pos_y: payload.int("pos_y").unwrap_or(0),
        width: payload.int("ancho").unwrap_or(DEFAULT_WIDTH),
        height: payload.int("alto").unwrap_or(DEFAULT_HEIGHT),
        rotation_degrees: payload
            .decimal("rotacion_grados")
            .unwrap_or(Decimal::ZERO)
            .round_dp(2),
        z_order: payload.int("orden_z").unwrap_or(0),
        style_json: payload.non_blank("estilo_json"),
        metadata_json: payload.non_blank("metadatos_json"),
    })
}

impl ElementApiState {
    /// A parent must be another element of the same diagram, and never one of
    /// the element's own descendants
    async fn check_parent(
        &self,
        fields: &ElementFields,
        element_id: Option<i32>,
        internal_code: &'static str,
    ) -> Result<(), ApiError> {
        let Some(parent_id) = fields.parent_id else {
            return Ok(());
        };
        if Some(parent_id) == element_id {
            return Err(ApiError::BadRequest("elemento_padre_invalido"));
        }

        let found = self
            .element_repo
            .count_in_diagram(&[parent_id], fields.diagram_id)
            .await
            .or_internal(internal_code)?;
        if found != 1 {
            return Err(ApiError::BadRequest("elemento_padre_invalido"));
        }

        if let Some(element_id) = element_id {
            let cycle = self
                .element_repo
                .would_create_cycle(element_id, parent_id)
                .await
                .or_internal(internal_code)?;
            if cycle {
                tracing::debug!("Parent {} would nest element {} inside itself", parent_id, element_id);
                return Err(ApiError::BadRequest("elemento_padre_invalido"));
            }
        }

        Ok(())
    }

    /// An element with children or connections stays in its diagram
    async fn check_diagram_move(&self, element_id: i32, target_diagram: i32) -> Result<(), ApiError> {
        let current = self
            .element_repo
            .find_by_id(element_id)
            .await
            .or_internal("error_actualizar_elemento")?
            .ok_or(ApiError::NotFound("elemento_no_encontrado"))?;
        if current.diagram_id == target_diagram {
            return Ok(());
        }

        let linked = self
            .element_repo
            .has_links(element_id)
            .await
            .or_internal("error_actualizar_elemento")?;
        if linked {
            tracing::debug!(
                "Element {} is linked in diagram {}, refusing move to {}",
                element_id,
                current.diagram_id,
                target_diagram
            );
            return Err(ApiError::BadRequest("elemento_con_relaciones"));
        }

        Ok(())
    }
}

/// Create the element API router
pub fn element_api_router(state: ElementApiState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route(
            "/api/elementos",
            get(get_elements_handler)
                .post(create_element_handler)
                .put(update_element_handler)
                .delete(delete_element_handler),
        )
        .with_state(state)
}

/// GET /api/elementos
async fn get_elements_handler(
    State(state): State<Arc<ElementApiState>>,
    caller: SessionUser,
    params: Params,
) -> Result<Response, ApiError> {
    if let Some(id) = params.int("id_elemento") {
        let element = state
            .element_repo
            .find_by_id(id)
            .await
            .or_internal("error_elementos")?
            .ok_or(ApiError::NotFound("elemento_no_encontrado"))?;

        state
            .access
            .require(&caller, OwnedResource::Diagram(element.diagram_id), "error_elementos")
            .await?;

        return Ok(Json(ElementResponse {
            ok: true,
            elemento: element,
        })
        .into_response());
    }

    let diagram_id = params
        .int("id_diagrama")
        .ok_or(ApiError::BadRequest("id_diagrama_requerido"))?;

    state
        .access
        .require(&caller, OwnedResource::Diagram(diagram_id), "error_elementos")
        .await?;

    let elements = state
        .element_repo
        .list_by_diagram(diagram_id)
        .await
        .or_internal("error_elementos")?;

    Ok(Json(ElementListResponse {
        ok: true,
        elementos: elements,
    })
    .into_response())
}

/// POST /api/elementos
async fn create_element_handler(
    State(state): State<Arc<ElementApiState>>,
    caller: SessionUser,
    payload: Payload,
) -> Result<Json<CreatedElementResponse>, ApiError> {
    let fields = element_fields(&payload)?;

    state
        .access
        .require(&caller, OwnedResource::Diagram(fields.diagram_id), "error_crear_elemento")
        .await?;
    state.check_parent(&fields, None, "error_crear_elemento").await?;

    let id = state
        .element_repo
        .create(&fields)
        .await
        .or_internal("error_crear_elemento")?;

    tracing::info!("Element {} created in diagram {}", id, fields.diagram_id);

    Ok(Json(CreatedElementResponse {
        ok: true,
        id_elemento: id,
    }))
}

/// PUT /api/elementos
/// Both the element's current diagram and the target diagram must be owned.
/// Only an element without children or connections may change diagram.
async fn update_element_handler(
    State(state): State<Arc<ElementApiState>>,
    caller: SessionUser,
    payload: Payload,
) -> Result<Json<OkResponse>, ApiError> {
    let id = payload.int("id_elemento").ok_or_else(ApiError::incomplete)?;
    let fields = element_fields(&payload)?;

    state
        .access
        .require(&caller, OwnedResource::Element(id), "error_actualizar_elemento")
        .await?;
    state
        .access
        .require(&caller, OwnedResource::Diagram(fields.diagram_id), "error_actualizar_elemento")
        .await?;
    state.check_diagram_move(id, fields.diagram_id).await?;
    state.check_parent(&fields, Some(id), "error_actualizar_elemento").await?;

    let updated = state
        .element_repo
        .update(id, &fields)
        .await
        .or_internal("error_actualizar_elemento")?;
    if !updated {
        return Err(ApiError::NotFound("elemento_no_encontrado"));
    }

    tracing::info!("Element {} updated by user {}", id, caller.user_id);
    Ok(ack())
}

/// DELETE /api/elementos
async fn delete_element_handler(
    State(state): State<Arc<ElementApiState>>,
    caller: SessionUser,
    params: Params,
) -> Result<Json<OkResponse>, ApiError> {
    let id = params
        .int("id_elemento")
        .ok_or(ApiError::BadRequest("id_elemento_requerido"))?;

    state
        .access
        .require(&caller, OwnedResource::Element(id), "error_eliminar_elemento")
        .await?;

    let deleted = state
        .element_repo
        .delete(id)
        .await
        .or_internal("error_eliminar_elemento")?;
    if !deleted {
        return Err(ApiError::NotFound("elemento_no_encontrado"));
    }

    tracing::info!("Element {} deleted by user {}", id, caller.user_id);
    Ok(ack())
}
