//! Media attachment endpoints
//!
//! - GET /api/diagrama-multimedia?id_diagrama=N - Media attached to a diagram
//! - POST /api/diagrama-multimedia - Attach a media file to a diagram
//! - DELETE /api/diagrama-multimedia?id_diagrama=N&id_archivo=M - Detach it
//! - GET /api/elemento-multimedia?id_elemento=N - Media attached to an element
//! - POST /api/elemento-multimedia - Attach a media file to an element
//! - DELETE /api/elemento-multimedia?id_elemento=N&id_archivo=M - Detach it
//!
//! Attaching requires owning both ends: the diagram (or the element's
//! diagram) and the media file.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use std::sync::Arc;

use crate::core::access::{AccessGuard, OwnedResource};
use crate::core::api::{ApiError, OkResponse, OrInternal, Params, Payload, ack};
use crate::core::auth::SessionUser;
use crate::core::db::models::{
    CreateDiagramMedia, CreateElementMedia, DiagramMediaItem, ElementMediaItem, MediaUsage,
};
use crate::core::db::repositories::{DiagramMediaRepository, ElementMediaRepository};

#[derive(Clone)]
pub struct AttachmentApiState {
    pub diagram_media_repo: DiagramMediaRepository,
    pub element_media_repo: ElementMediaRepository,
    pub access: AccessGuard,
}

#[derive(Debug, Serialize)]
pub struct AttachmentListResponse<T> {
    pub ok: bool,
    pub multimedia: Vec<T>,
}

/// Create the attachment API router
pub fn attachment_api_router(state: AttachmentApiState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route(
            "/api/diagrama-multimedia",
            get(list_diagram_media_handler)
                .post(attach_diagram_media_handler)
                .delete(detach_diagram_media_handler),
        )
        .route(
            "/api/elemento-multimedia",
            get(list_element_media_handler)
                .post(attach_element_media_handler)
                .delete(detach_element_media_handler),
        )
        .with_state(state)
}

// ============================================================================
// Diagram attachments
// ============================================================================

/// GET /api/diagrama-multimedia
async fn list_diagram_media_handler(
    State(state): State<Arc<AttachmentApiState>>,
    caller: SessionUser,
    params: Params,
) -> Result<Json<AttachmentListResponse<DiagramMediaItem>>, ApiError> {
    let diagram_id = params
        .int("id_diagrama")
        .ok_or(ApiError::BadRequest("id_diagrama_requerido"))?;

    state
        .access
        .require(&caller, OwnedResource::Diagram(diagram_id), "error_diagrama_multimedia")
        .await?;

    let items = state
        .diagram_media_repo
        .list_by_diagram(diagram_id)
        .await
        .or_internal("error_diagrama_multimedia")?;

    Ok(Json(AttachmentListResponse {
        ok: true,
        multimedia: items,
    }))
}

/// POST /api/diagrama-multimedia
async fn attach_diagram_media_handler(
    State(state): State<Arc<AttachmentApiState>>,
    caller: SessionUser,
    payload: Payload,
) -> Result<Json<OkResponse>, ApiError> {
    let (Some(diagram_id), Some(media_id)) = (payload.int("id_diagrama"), payload.int("id_archivo"))
    else {
        return Err(ApiError::incomplete());
    };

    const CODE: &str = "error_crear_diagrama_multimedia";
    state
        .access
        .require(&caller, OwnedResource::Diagram(diagram_id), CODE)
        .await?;
    state
        .access
        .require(&caller, OwnedResource::MediaFile(media_id), CODE)
        .await?;

    let dto = CreateDiagramMedia {
        diagram_id,
        media_id,
        description: payload.non_blank("descripcion"),
        sort_order: payload.int("orden").unwrap_or(0),
    };
    state.diagram_media_repo.create(&dto).await.or_internal(CODE)?;

    tracing::info!("Media file {} attached to diagram {}", media_id, diagram_id);
    Ok(ack())
}

/// DELETE /api/diagrama-multimedia
async fn detach_diagram_media_handler(
    State(state): State<Arc<AttachmentApiState>>,
    caller: SessionUser,
    params: Params,
) -> Result<Json<OkResponse>, ApiError> {
    let (Some(diagram_id), Some(media_id)) = (params.int("id_diagrama"), params.int("id_archivo"))
    else {
        return Err(ApiError::incomplete());
    };

    const CODE: &str = "error_eliminar_diagrama_multimedia";
    state
        .access
        .require(&caller, OwnedResource::Diagram(diagram_id), CODE)
        .await?;

    let deleted = state
        .diagram_media_repo
        .delete(diagram_id, media_id)
        .await
        .or_internal(CODE)?;
    if !deleted {
        return Err(ApiError::NotFound("relacion_no_encontrada"));
    }

    tracing::info!("Media file {} detached from diagram {}", media_id, diagram_id);
    Ok(ack())
}

// ============================================================================
// Element attachments
// ============================================================================

/// GET /api/elemento-multimedia
async fn list_element_media_handler(
    State(state): State<Arc<AttachmentApiState>>,
    caller: SessionUser,
    params: Params,
) -> Result<Json<AttachmentListResponse<ElementMediaItem>>, ApiError> {
    let element_id = params
        .int("id_elemento")
        .ok_or(ApiError::BadRequest("id_elemento_requerido"))?;

    state
        .access
        .require(&caller, OwnedResource::Element(element_id), "error_elemento_multimedia")
        .await?;

    let items = state
        .element_media_repo
        .list_by_element(element_id)
        .await
        .or_internal("error_elemento_multimedia")?;

    Ok(Json(AttachmentListResponse {
        ok: true,
        multimedia: items,
    }))
}

/// POST /api/elemento-multimedia
async fn attach_element_media_handler(
    State(state): State<Arc<AttachmentApiState>>,
    caller: SessionUser,
    payload: Payload,
) -> Result<Json<OkResponse>, ApiError> {
    let (Some(element_id), Some(media_id), Some(usage)) = (
        payload.int("id_elemento"),
        payload.int("id_archivo"),
        payload.parse::<MediaUsage>("tipo_uso"),
    ) else {
        return Err(ApiError::incomplete());
    };

    const CODE: &str = "error_crear_elemento_multimedia";
    state
        .access
        .require(&caller, OwnedResource::Element(element_id), CODE)
        .await?;
    state
        .access
        .require(&caller, OwnedResource::MediaFile(media_id), CODE)
        .await?;

    let dto = CreateElementMedia {
        element_id,
        media_id,
        usage,
    };
    state.element_media_repo.create(&dto).await.or_internal(CODE)?;

    tracing::info!("Media file {} attached to element {} as {}", media_id, element_id, usage);
    Ok(ack())
}

/// DELETE /api/elemento-multimedia
async fn detach_element_media_handler(
    State(state): State<Arc<AttachmentApiState>>,
    caller: SessionUser,
    params: Params,
) -> Result<Json<OkResponse>, ApiError> {
    let (Some(element_id), Some(media_id)) = (params.int("id_elemento"), params.int("id_archivo"))
    else {
        return Err(ApiError::incomplete());
    };

    const CODE: &str = "error_eliminar_elemento_multimedia";
    state
        .access
        .require(&caller, OwnedResource::Element(element_id), CODE)
        .await?;

    let deleted = state
        .element_media_repo
        .delete(element_id, media_id)
        .await
        .or_internal(CODE)?;
    if !deleted {
        return Err(ApiError::NotFound("relacion_no_encontrada"));
    }

    tracing::info!("Media file {} detached from element {}", media_id, element_id);
    Ok(ack())
}
