//! Request helpers for handler tests

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use tower::ServiceExt;

use crate::core::auth::SessionUser;
use crate::core::db::models::ADMIN_ROLE_ID;

pub fn caller(user_id: i32, role_id: i32) -> SessionUser {
    SessionUser {
        user_id,
        role_id,
        username: format!("user{}", user_id),
        role_name: if role_id == ADMIN_ROLE_ID {
            "ADMIN".to_string()
        } else {
            "USUARIO".to_string()
        },
    }
}

/// Send a JSON request as `user`, bypassing the session gate
pub async fn send(
    router: Router,
    user: SessionUser,
    method: &str,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body.to_string()))
        .unwrap();
    request.extensions_mut().insert(user);

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
}
