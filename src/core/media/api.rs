//! Media file API endpoints
//!
//! - GET /api/archivos?id_archivo=N - Get one file's metadata
//! - GET /api/archivos[?id_usuario=N] - List files (own, or any user's for admins)
//! - POST /api/archivos - Upload a file (multipart)
//! - DELETE /api/archivos?id_archivo=N - Delete a file and its stored bytes

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::storage::{MediaStorage, StorageError, extension_of};
use crate::core::access::{AccessGuard, OwnedResource, authorize};
use crate::core::api::{ApiError, OkResponse, OrInternal, Params, Payload, ack};
use crate::core::auth::SessionUser;
use crate::core::db::models::{CreateMediaFile, MediaFile, MediaKind};
use crate::core::db::repositories::MediaRepository;

/// Multipart field carrying the file bytes
pub const FILE_FIELD: &str = "archivo";

#[derive(Clone)]
pub struct MediaApiState {
    pub media_repo: MediaRepository,
    pub access: AccessGuard,
    pub storage: MediaStorage,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Serialize)]
pub struct MediaResponse {
    pub ok: bool,
    pub archivo: MediaFile,
}

#[derive(Debug, Serialize)]
pub struct MediaListResponse {
    pub ok: bool,
    pub archivos: Vec<MediaFile>,
}

#[derive(Debug, Serialize)]
pub struct UploadedMediaResponse {
    pub ok: bool,
    pub ruta_archivo: String,
    pub id_archivo: i32,
}

struct UploadedFile {
    file_name: String,
    bytes: Bytes,
}

/// Text fields and the file part of an upload form
struct UploadForm {
    payload: Payload,
    file: Option<UploadedFile>,
}

impl UploadForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, axum::extract::multipart::MultipartError> {
        let mut fields = Map::new();
        let mut file = None;

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if name == FILE_FIELD {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                // Browsers send an empty, unnamed part when no file was picked
                if !file_name.is_empty() || !bytes.is_empty() {
                    file = Some(UploadedFile { file_name, bytes });
                }
            } else {
                let text = field.text().await?;
                fields.entry(name).or_insert(Value::String(text));
            }
        }

        Ok(Self {
            payload: Payload::from(Value::Object(fields)),
            file,
        })
    }
}

/// Create the media API router. Upload bodies are capped at `max_upload_bytes`.
pub fn media_api_router(state: MediaApiState) -> Router {
    let limit = state.max_upload_bytes;
    let state = Arc::new(state);

    Router::new()
        .route(
            "/api/archivos",
            get(get_media_handler)
                .post(upload_media_handler)
                .delete(delete_media_handler),
        )
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}

/// GET /api/archivos
async fn get_media_handler(
    State(state): State<Arc<MediaApiState>>,
    caller: SessionUser,
    params: Params,
) -> Result<Response, ApiError> {
    if let Some(id) = params.int("id_archivo") {
        let file = state
            .media_repo
            .find_by_id(id)
            .await
            .or_internal("error_archivos")?
            .ok_or(ApiError::NotFound("archivo_no_encontrado"))?;

        if !authorize(&caller, file.owner_id) {
            tracing::debug!("User {} denied media file {}", caller.user_id, id);
            return Err(ApiError::AccessDenied);
        }

        return Ok(Json(MediaResponse {
            ok: true,
            archivo: file,
        })
        .into_response());
    }

    let files = match (caller.is_admin(), params.int("id_usuario")) {
        (true, None) => state.media_repo.list_all().await,
        (true, Some(owner_id)) => state.media_repo.list_by_owner(owner_id).await,
        (false, _) => state.media_repo.list_by_owner(caller.user_id).await,
    }
    .or_internal("error_archivos")?;

    Ok(Json(MediaListResponse {
        ok: true,
        archivos: files,
    })
    .into_response())
}

/// POST /api/archivos
///
/// The file is written before its row is inserted. A failed insert removes
/// the file again so no orphan stays on disk.
async fn upload_media_handler(
    State(state): State<Arc<MediaApiState>>,
    caller: SessionUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadedMediaResponse>, ApiError> {
    let mut multipart = multipart.map_err(|err| {
        tracing::debug!("Upload is not a multipart form: {}", err);
        ApiError::incomplete()
    })?;

    let UploadForm { payload, file } = UploadForm::read(&mut multipart).await.map_err(|err| {
        tracing::warn!("Failed to read upload form: {}", err);
        ApiError::incomplete()
    })?;

    let (Some(kind), Some(file)) = (payload.parse::<MediaKind>("tipo_media"), file) else {
        return Err(ApiError::incomplete());
    };

    let extension = extension_of(&file.file_name)
        .filter(|ext| kind.accepts_extension(ext))
        .ok_or(ApiError::BadRequest("extension_invalida"))?;

    let owner_id = if caller.is_admin() {
        payload.int("id_usuario").unwrap_or(caller.user_id)
    } else {
        caller.user_id
    };

    let path = state
        .storage
        .save(&file.bytes, &extension)
        .await
        .map_err(|err| {
            tracing::error!("{}", err);
            match err {
                StorageError::Directory { .. } => ApiError::Internal("error_directorio"),
                StorageError::Write { .. } => ApiError::Internal("error_subir_archivo"),
            }
        })?;

    let dto = CreateMediaFile {
        owner_id,
        kind,
        title: payload.non_blank("titulo"),
        description: payload.non_blank("descripcion"),
        size_bytes: file.bytes.len() as i64,
        duration_seconds: payload.decimal("duracion_segundos"),
        width: payload.int("ancho"),
        height: payload.int("alto"),
        path,
    };

    let id = match state.media_repo.create(&dto).await {
        Ok(id) => id,
        Err(err) => {
            if let Err(remove_err) = state.storage.remove(&dto.path).await {
                tracing::warn!("Failed to remove orphaned upload {}: {}", dto.path, remove_err);
            }
            return Err(err).or_internal("error_subir_archivo");
        }
    };

    tracing::info!(
        "Media file {} ({}, {} bytes) uploaded for user {}",
        id,
        kind,
        dto.size_bytes,
        owner_id
    );

    Ok(Json(UploadedMediaResponse {
        ok: true,
        ruta_archivo: dto.path,
        id_archivo: id,
    }))
}

/// DELETE /api/archivos
/// The row goes first; a file that cannot be removed afterwards is only logged
async fn delete_media_handler(
    State(state): State<Arc<MediaApiState>>,
    caller: SessionUser,
    params: Params,
) -> Result<Json<OkResponse>, ApiError> {
    let id = params
        .int("id_archivo")
        .ok_or(ApiError::BadRequest("id_archivo_requerido"))?;

    state
        .access
        .require(&caller, OwnedResource::MediaFile(id), "error_eliminar_archivo")
        .await?;

    let path = state
        .media_repo
        .delete(id)
        .await
        .or_internal("error_eliminar_archivo")?
        .ok_or(ApiError::NotFound("archivo_no_encontrado"))?;

    if let Err(err) = state.storage.remove(&path).await {
        tracing::warn!("Media file {} deleted but {} was not removed: {}", id, path, err);
    }

    tracing::info!("Media file {} deleted by user {}", id, caller.user_id);
    Ok(ack())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::api::test_support::{caller, send};
    use crate::core::db::repositories::test_support;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use serde_json::json;
    use tower::ServiceExt;

    const BOUNDARY: &str = "uml-editor-test-boundary";

    fn router(pool: sqlx::PgPool, dir: &std::path::Path, max_upload_bytes: usize) -> Router {
        media_api_router(MediaApiState {
            media_repo: MediaRepository::new(pool.clone()),
            access: AccessGuard::new(pool),
            storage: MediaStorage::new(dir),
            max_upload_bytes,
        })
    }

    /// Build a multipart body from (field, file name, content) parts
    fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, file_name, content) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match file_name {
                Some(file_name) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                ),
            }
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    async fn upload(
        app: Router,
        user: SessionUser,
        parts: &[(&str, Option<&str>, &[u8])],
    ) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method("POST")
            .uri("/api/archivos")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        request.extensions_mut().insert(user);

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn dir_is_empty(dir: &std::path::Path) -> bool {
        std::fs::read_dir(dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true)
    }

    #[tokio::test]
    async fn test_extension_must_match_media_kind() {
        let tmp = tempfile::tempdir().unwrap();
        let app = router(test_support::lazy_pool(), tmp.path(), 1024 * 1024);

        let (status, body) = upload(
            app,
            caller(3, 2),
            &[
                ("tipo_media", None, b"AUDIO"),
                (FILE_FIELD, Some("cover.png"), b"\x89PNG"),
            ],
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["mensaje"], "extension_invalida");
        assert!(dir_is_empty(tmp.path()));
    }

    #[tokio::test]
    async fn test_file_without_extension_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let app = router(test_support::lazy_pool(), tmp.path(), 1024 * 1024);

        let (status, body) = upload(
            app,
            caller(3, 2),
            &[
                ("tipo_media", None, b"imagen"),
                (FILE_FIELD, Some("photo"), b"\xff\xd8"),
            ],
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["mensaje"], "extension_invalida");
    }

    #[tokio::test]
    async fn test_missing_kind_or_file_is_incomplete() {
        let tmp = tempfile::tempdir().unwrap();
        let app = router(test_support::lazy_pool(), tmp.path(), 1024 * 1024);

        let (status, body) = upload(
            app.clone(),
            caller(3, 2),
            &[(FILE_FIELD, Some("song.mp3"), b"ID3")],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["mensaje"], "datos_incompletos");

        let (status, body) = upload(
            app.clone(),
            caller(3, 2),
            &[("tipo_media", None, b"AUDIO"), (FILE_FIELD, Some(""), b"")],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["mensaje"], "datos_incompletos");

        let (status, body) = upload(
            app,
            caller(3, 2),
            &[("tipo_media", None, b"GIF"), (FILE_FIELD, Some("a.gif"), b"GIF8")],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["mensaje"], "datos_incompletos");
    }

    #[tokio::test]
    async fn test_non_multipart_body_is_incomplete() {
        let tmp = tempfile::tempdir().unwrap();
        let app = router(test_support::lazy_pool(), tmp.path(), 1024 * 1024);

        let (status, body) = send(
            app,
            caller(3, 2),
            "POST",
            "/api/archivos",
            json!({"tipo_media": "AUDIO"}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["mensaje"], "datos_incompletos");
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let app = router(test_support::lazy_pool(), tmp.path(), 64);
        let big = vec![0u8; 4096];

        let (status, _) = upload(
            app,
            caller(3, 2),
            &[("tipo_media", None, b"VIDEO"), (FILE_FIELD, Some("clip.mp4"), &big)],
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(dir_is_empty(tmp.path()));
    }

    #[tokio::test]
    async fn test_delete_requires_id() {
        let tmp = tempfile::tempdir().unwrap();
        let app = router(test_support::lazy_pool(), tmp.path(), 1024);

        let (status, body) = send(app, caller(3, 2), "DELETE", "/api/archivos?id_archivo=x", json!(null)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["mensaje"], "id_archivo_requerido");
    }

    // ========================================================================
    // Integration Tests (require database)
    // ========================================================================

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_upload_read_and_delete() {
        let pool = test_support::pool().await;
        let owner = test_support::user(&pool).await;
        let stranger = test_support::user(&pool).await;
        let tmp = tempfile::tempdir().unwrap();
        let app = router(pool.clone(), tmp.path(), 1024 * 1024);

        let (status, body) = upload(
            app.clone(),
            caller(owner, 2),
            &[
                ("tipo_media", None, b"IMAGEN"),
                ("titulo", None, b"Logo"),
                ("ancho", None, b"64"),
                ("alto", None, b"32"),
                (FILE_FIELD, Some("logo.JPG"), b"\xff\xd8\xff\xe0"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = body["id_archivo"].as_i64().unwrap();
        let stored = body["ruta_archivo"].as_str().unwrap().to_string();
        assert!(stored.starts_with("uploads/") && stored.ends_with(".jpg"));

        let storage = MediaStorage::new(tmp.path());
        let on_disk = storage.resolve(&stored).unwrap();
        assert!(on_disk.exists());

        let (_, body) = send(
            app.clone(),
            caller(owner, 2),
            "GET",
            &format!("/api/archivos?id_archivo={}", id),
            json!(null),
        )
        .await;
        assert_eq!(body["archivo"]["titulo"], "Logo");
        assert_eq!(body["archivo"]["tamano_bytes"], 4);
        assert_eq!(body["archivo"]["ancho"], 64);

        let (status, _) = send(
            app.clone(),
            caller(stranger, 2),
            "DELETE",
            &format!("/api/archivos?id_archivo={}", id),
            json!(null),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            app.clone(),
            caller(owner, 2),
            "DELETE",
            &format!("/api/archivos?id_archivo={}", id),
            json!(null),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(!on_disk.exists());

        let (status, body) = send(
            app,
            caller(owner, 2),
            "DELETE",
            &format!("/api/archivos?id_archivo={}", id),
            json!(null),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["mensaje"], "archivo_no_encontrado");

        test_support::cleanup_user(&pool, owner).await;
        test_support::cleanup_user(&pool, stranger).await;
    }
}
