//! Diagram API endpoints
//!
//! - GET /api/diagramas?id_diagrama=N - Get one diagram
//! - GET /api/diagramas[?id_usuario=N] - List diagrams (own, or any user's for admins)
//! - POST /api/diagramas - Create a diagram
//! - PUT /api/diagramas - Replace a diagram's editable fields
//! - DELETE /api/diagramas?id_diagrama=N - Delete a diagram with its contents

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;

use crate::core::access::{AccessGuard, OwnedResource, authorize};
use crate::core::api::{ApiError, OkResponse, OrInternal, Params, Payload, ack};
use crate::core::auth::SessionUser;
use crate::core::db::models::{Diagram, DiagramFields, DiagramStatus};
use crate::core::db::repositories::DiagramRepository;

pub const DEFAULT_CANVAS_WIDTH: i32 = 1280;
pub const DEFAULT_CANVAS_HEIGHT: i32 = 720;

/// Diagram API state
#[derive(Clone)]
pub struct DiagramApiState {
    pub diagram_repo: DiagramRepository,
    pub access: AccessGuard,
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DiagramResponse {
    pub ok: bool,
    pub diagrama: Diagram,
}

#[derive(Debug, Serialize)]
pub struct DiagramListResponse {
    pub ok: bool,
    pub diagramas: Vec<Diagram>,
}

#[derive(Debug, Serialize)]
pub struct CreatedDiagramResponse {
    pub ok: bool,
    pub id_diagrama: i32,
}

/// How missing canvas dimensions are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimensions {
    Defaulted,
    Required,
}

/// Read the editable diagram fields. A missing or unknown `estado` becomes `ACTIVO`.
fn diagram_fields(payload: &Payload, dimensions: Dimensions) -> Result<DiagramFields, ApiError> {
    let name = payload.non_blank("nombre").ok_or_else(ApiError::incomplete)?;

    let (canvas_width, canvas_height) = match (
        payload.int("ancho_lienzo"),
        payload.int("alto_lienzo"),
        dimensions,
    ) {
        (Some(w), Some(h), _) => (w, h),
        (_, _, Dimensions::Required) => return Err(ApiError::BadRequest("dimensiones_requeridas")),
        (w, h, Dimensions::Defaulted) => (
            w.unwrap_or(DEFAULT_CANVAS_WIDTH),
            h.unwrap_or(DEFAULT_CANVAS_HEIGHT),
        ),
    };

    Ok(DiagramFields {
        name,
        description: payload.non_blank("descripcion"),
        status: payload.parse::<DiagramStatus>("estado").unwrap_or_default(),
        canvas_width,
        canvas_height,
        config_json: payload.non_blank("configuracion_json"),
    })
}

// ============================================================================
// Router
// ============================================================================

/// Create the diagram API router
pub fn diagram_api_router(state: DiagramApiState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route(
            "/api/diagramas",
            get(get_diagrams_handler)
                .post(create_diagram_handler)
                .put(update_diagram_handler)
                .delete(delete_diagram_handler),
        )
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/diagramas
async fn get_diagrams_handler(
    State(state): State<Arc<DiagramApiState>>,
    caller: SessionUser,
    params: Params,
) -> Result<Response, ApiError> {
    if let Some(id) = params.int("id_diagrama") {
        let diagram = state
            .diagram_repo
            .find_by_id(id)
            .await
            .or_internal("error_diagramas")?
            .ok_or(ApiError::NotFound("diagrama_no_encontrado"))?;

        if !authorize(&caller, diagram.owner_id) {
            tracing::debug!("User {} denied access to diagram {}", caller.user_id, id);
            return Err(ApiError::AccessDenied);
        }

        return Ok(Json(DiagramResponse {
            ok: true,
            diagrama: diagram,
        })
        .into_response());
    }

    let diagrams = match (caller.is_admin(), params.int("id_usuario")) {
        (true, None) => state.diagram_repo.list_all().await,
        (true, Some(owner_id)) => state.diagram_repo.list_by_owner(owner_id).await,
        (false, _) => state.diagram_repo.list_by_owner(caller.user_id).await,
    }
    .or_internal("error_diagramas")?;

    Ok(Json(DiagramListResponse {
        ok: true,
        diagramas: diagrams,
    })
    .into_response())
}

/// POST /api/diagramas
/// Non-admins always create for themselves
async fn create_diagram_handler(
    State(state): State<Arc<DiagramApiState>>,
    caller: SessionUser,
    payload: Payload,
) -> Result<Json<CreatedDiagramResponse>, ApiError> {
    let fields = diagram_fields(&payload, Dimensions::Defaulted)?;

    let owner_id = if caller.is_admin() {
        payload.int("id_usuario").unwrap_or(caller.user_id)
    } else {
        caller.user_id
    };

    let id = state
        .diagram_repo
        .create(owner_id, &fields)
        .await
        .or_internal("error_crear_diagrama")?;

    tracing::info!("Diagram {} created for user {}", id, owner_id);

    Ok(Json(CreatedDiagramResponse {
        ok: true,
        id_diagrama: id,
    }))
}

/// PUT /api/diagramas
async fn update_diagram_handler(
    State(state): State<Arc<DiagramApiState>>,
    caller: SessionUser,
    payload: Payload,
) -> Result<Json<OkResponse>, ApiError> {
    let id = payload.int("id_diagrama").ok_or_else(ApiError::incomplete)?;
    let fields = diagram_fields(&payload, Dimensions::Required)?;

    state
        .access
        .require(&caller, OwnedResource::Diagram(id), "error_actualizar_diagrama")
        .await?;

    let updated = state
        .diagram_repo
        .update(id, &fields)
        .await
        .or_internal("error_actualizar_diagrama")?;
    if !updated {
        return Err(ApiError::NotFound("diagrama_no_encontrado"));
    }

    tracing::info!("Diagram {} updated by user {}", id, caller.user_id);
    Ok(ack())
}

/// DELETE /api/diagramas
/// Elements, connections and media attachments cascade
async fn delete_diagram_handler(
    State(state): State<Arc<DiagramApiState>>,
    caller: SessionUser,
    params: Params,
) -> Result<Json<OkResponse>, ApiError> {
    let id = params
        .int("id_diagrama")
        .ok_or(ApiError::BadRequest("id_diagrama_requerido"))?;

    state
        .access
        .require(&caller, OwnedResource::Diagram(id), "error_eliminar_diagrama")
        .await?;

    let deleted = state
        .diagram_repo
        .delete(id)
        .await
        .or_internal("error_eliminar_diagrama")?;
    if !deleted {
        return Err(ApiError::NotFound("diagrama_no_encontrado"));
    }

    tracing::info!("Diagram {} deleted by user {}", id, caller.user_id);
    Ok(ack())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::api::test_support::{caller, send};
    use crate::core::db::repositories::test_support;
    use axum::http::StatusCode;
    use serde_json::json;

    fn router(pool: sqlx::PgPool) -> Router {
        diagram_api_router(DiagramApiState {
            diagram_repo: DiagramRepository::new(pool.clone()),
            access: AccessGuard::new(pool),
        })
    }

    // ========================================================================
    // Validation Tests
    // ========================================================================

    #[test]
    fn test_create_defaults() {
        let fields = diagram_fields(&Payload::from(json!({"nombre": "Ventas"})), Dimensions::Defaulted)
            .unwrap();

        assert_eq!(fields.name, "Ventas");
        assert_eq!(fields.status, DiagramStatus::Active);
        assert_eq!(fields.canvas_width, 1280);
        assert_eq!(fields.canvas_height, 720);
        assert!(fields.description.is_none());
        assert!(fields.config_json.is_none());
    }

    #[test]
    fn test_invalid_status_falls_back_to_active() {
        let payload = Payload::from(json!({"nombre": "A", "estado": "BORRADO"}));
        let fields = diagram_fields(&payload, Dimensions::Defaulted).unwrap();
        assert_eq!(fields.status, DiagramStatus::Active);

        let payload = Payload::from(json!({"nombre": "A", "estado": " archivado "}));
        let fields = diagram_fields(&payload, Dimensions::Defaulted).unwrap();
        assert_eq!(fields.status, DiagramStatus::Archived);
    }

    #[test]
    fn test_name_is_required() {
        let err = diagram_fields(&Payload::from(json!({"nombre": "  "})), Dimensions::Defaulted)
            .unwrap_err();
        assert_eq!(err, ApiError::incomplete());
    }

    #[test]
    fn test_update_requires_dimensions() {
        let payload = Payload::from(json!({"nombre": "A", "ancho_lienzo": 800}));
        assert_eq!(
            diagram_fields(&payload, Dimensions::Required).unwrap_err(),
            ApiError::BadRequest("dimensiones_requeridas")
        );

        let payload = Payload::from(json!({"nombre": "A", "ancho_lienzo": "800", "alto_lienzo": 600}));
        let fields = diagram_fields(&payload, Dimensions::Required).unwrap();
        assert_eq!((fields.canvas_width, fields.canvas_height), (800, 600));
    }

    #[test]
    fn test_config_json_object_stored_as_text() {
        let payload = Payload::from(json!({"nombre": "A", "configuracion_json": {"grid": 8}}));
        let fields = diagram_fields(&payload, Dimensions::Defaulted).unwrap();
        assert_eq!(fields.config_json.as_deref(), Some(r#"{"grid":8}"#));
    }

    // ========================================================================
    // Router Tests (no database needed)
    // ========================================================================

    #[tokio::test]
    async fn test_post_without_name_is_rejected() {
        let (status, body) = send(
            router(test_support::lazy_pool()),
            caller(3, 2),
            "POST",
            "/api/diagramas",
            json!({"descripcion": "sin nombre"}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["mensaje"], "datos_incompletos");
    }

    #[tokio::test]
    async fn test_delete_without_id_is_rejected() {
        let (status, body) = send(
            router(test_support::lazy_pool()),
            caller(3, 2),
            "DELETE",
            "/api/diagramas?id_diagrama=abc",
            json!(null),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["mensaje"], "id_diagrama_requerido");
    }

    #[tokio::test]
    async fn test_put_without_dimensions_is_rejected() {
        let (status, body) = send(
            router(test_support::lazy_pool()),
            caller(3, 2),
            "PUT",
            "/api/diagramas",
            json!({"id_diagrama": 1, "nombre": "A"}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["mensaje"], "dimensiones_requeridas");
    }

    // ========================================================================
    // Integration Tests (require database)
    // ========================================================================

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_ownership_enforced() {
        let pool = test_support::pool().await;
        let owner = test_support::user(&pool).await;
        let stranger = test_support::user(&pool).await;
        let app = router(pool.clone());

        let (status, body) = send(
            app.clone(),
            caller(owner, 2),
            "POST",
            "/api/diagramas",
            json!({"nombre": "Privado", "id_usuario": stranger}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = body["id_diagrama"].as_i64().unwrap();

        // id_usuario is ignored for non-admins
        let (_, body) = send(
            app.clone(),
            caller(owner, 2),
            "GET",
            &format!("/api/diagramas?id_diagrama={}", id),
            json!(null),
        )
        .await;
        assert_eq!(body["diagrama"]["id_usuario"], owner);
        assert_eq!(body["diagrama"]["estado"], "ACTIVO");
        assert_eq!(body["diagrama"]["ancho_lienzo"], 1280);

        for (method, uri, payload) in [
            ("GET", format!("/api/diagramas?id_diagrama={}", id), json!(null)),
            (
                "PUT",
                "/api/diagramas".to_string(),
                json!({"id_diagrama": id, "nombre": "X", "ancho_lienzo": 1, "alto_lienzo": 1}),
            ),
            ("DELETE", format!("/api/diagramas?id_diagrama={}", id), json!(null)),
        ] {
            let (status, body) = send(app.clone(), caller(stranger, 2), method, &uri, payload).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{} {}", method, uri);
            assert_eq!(body["mensaje"], "acceso_denegado");
        }

        let (status, _) = send(
            app.clone(),
            caller(stranger, 1),
            "GET",
            &format!("/api/diagramas?id_diagrama={}", id),
            json!(null),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            app.clone(),
            caller(owner, 2),
            "DELETE",
            &format!("/api/diagramas?id_diagrama={}", id),
            json!(null),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            app,
            caller(owner, 1),
            "DELETE",
            &format!("/api/diagramas?id_diagrama={}", id),
            json!(null),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["mensaje"], "diagrama_no_encontrado");

        test_support::cleanup_user(&pool, owner).await;
        test_support::cleanup_user(&pool, stranger).await;
    }
}
