//! Error envelope shared by every endpoint
//!
//! Failures reach the client as `{"ok": false, "mensaje": "<code>"}` with a
//! fixed string code. Database and I/O details are logged, never returned.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub mensaje: &'static str,
}

/// API error types, one per HTTP status family
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Missing or invalid input (400)
    #[error("{0}")]
    BadRequest(&'static str),

    /// No valid session cookie (401)
    #[error("sesion_no_iniciada")]
    Unauthenticated,

    /// Login rejected (401)
    #[error("credenciales_invalidas")]
    InvalidCredentials,

    /// Caller does not own the resource (403)
    #[error("acceso_denegado")]
    AccessDenied,

    /// Entity-specific not-found code (404)
    #[error("{0}")]
    NotFound(&'static str),

    /// Fixed failure code for an operation (500)
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::AccessDenied => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wire code sent in the `mensaje` field
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(code) | ApiError::NotFound(code) | ApiError::Internal(code) => {
                code
            }
            ApiError::Unauthenticated => "sesion_no_iniciada",
            ApiError::InvalidCredentials => "credenciales_invalidas",
            ApiError::AccessDenied => "acceso_denegado",
        }
    }

    /// Shorthand for the generic validation failure
    pub fn incomplete() -> Self {
        ApiError::BadRequest("datos_incompletos")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            ok: false,
            mensaje: self.code(),
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Converts any failure into a logged `ApiError::Internal` with a fixed code
pub trait OrInternal<T> {
    fn or_internal(self, code: &'static str) -> Result<T, ApiError>;
}

impl<T, E: std::fmt::Display> OrInternal<T> for Result<T, E> {
    fn or_internal(self, code: &'static str) -> Result<T, ApiError> {
        self.map_err(|err| {
            tracing::error!(code, "Request failed: {}", err);
            ApiError::Internal(code)
        })
    }
}

/// Plain `{"ok": true}` acknowledgement
#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// `{"ok": true}` as a handler return value
pub fn ack() -> Json<OkResponse> {
    Json(OkResponse { ok: true })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::incomplete().status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::AccessDenied.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::NotFound("diagrama_no_encontrado").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Internal("error_diagramas").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_display_is_wire_code() {
        assert_eq!(ApiError::AccessDenied.to_string(), "acceso_denegado");
        assert_eq!(
            ApiError::BadRequest("extension_invalida").to_string(),
            "extension_invalida"
        );
        assert_eq!(ApiError::Unauthenticated.code(), "sesion_no_iniciada");
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let (status, json) = body_json(ApiError::NotFound("elemento_no_encontrado")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json, serde_json::json!({"ok": false, "mensaje": "elemento_no_encontrado"}));
    }

    #[test]
    fn test_or_internal_maps_any_error() {
        let result: Result<(), std::io::Error> =
            Err(std::io::Error::other("disk on fire"));
        let err = result.or_internal("error_subir_archivo").unwrap_err();
        assert_eq!(err, ApiError::Internal("error_subir_archivo"));
        assert_eq!(err.code(), "error_subir_archivo");
    }

    #[test]
    fn test_ok_response_serialization() {
        let json = serde_json::to_string(&ack().0).unwrap();
        assert_eq!(json, r#"{"ok":true}"#);
    }
}
