//! Ownership checks shared by every resource handler
//!
//! Diagrams and media files are owned directly by a user. Elements and
//! connections are owned through their diagram. Admins pass every check,
//! but a resource that does not exist is reported as missing regardless of
//! the caller's role.

use derive_more::Display;
use sqlx::PgPool;

use crate::core::api::ApiError;
use crate::core::auth::SessionUser;

/// A row whose owner can be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum OwnedResource {
    #[display("diagram {_0}")]
    Diagram(i32),
    #[display("element {_0}")]
    Element(i32),
    #[display("connection {_0}")]
    Connection(i32),
    #[display("media file {_0}")]
    MediaFile(i32),
}

impl OwnedResource {
    fn id(&self) -> i32 {
        match *self {
            OwnedResource::Diagram(id)
            | OwnedResource::Element(id)
            | OwnedResource::Connection(id)
            | OwnedResource::MediaFile(id) => id,
        }
    }

    fn owner_query(&self) -> &'static str {
        match self {
            OwnedResource::Diagram(_) => "SELECT owner_id FROM diagrams WHERE id = $1",
            OwnedResource::Element(_) => {
                "SELECT d.owner_id FROM elements e \
                 JOIN diagrams d ON d.id = e.diagram_id WHERE e.id = $1"
            }
            OwnedResource::Connection(_) => {
                "SELECT d.owner_id FROM connections c \
                 JOIN diagrams d ON d.id = c.diagram_id WHERE c.id = $1"
            }
            OwnedResource::MediaFile(_) => "SELECT owner_id FROM media_files WHERE id = $1",
        }
    }

    /// Wire code returned when the row does not exist
    pub fn not_found_code(&self) -> &'static str {
        match self {
            OwnedResource::Diagram(_) => "diagrama_no_encontrado",
            OwnedResource::Element(_) => "elemento_no_encontrado",
            OwnedResource::Connection(_) => "conexion_no_encontrada",
            OwnedResource::MediaFile(_) => "archivo_no_encontrado",
        }
    }
}

/// Access decision for a resolved owner
pub fn authorize(caller: &SessionUser, owner_id: i32) -> bool {
    caller.is_admin() || caller.user_id == owner_id
}

/// Gate for admin-only operations
pub fn require_admin(caller: &SessionUser) -> Result<(), ApiError> {
    if caller.is_admin() {
        Ok(())
    } else {
        tracing::debug!("User {} denied an admin-only operation", caller.user_id);
        Err(ApiError::AccessDenied)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("{0} not found")]
    Missing(OwnedResource),

    #[error("access to {0} denied")]
    Denied(OwnedResource),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AccessError {
    /// Map onto the wire error. Database failures use the caller's operation code.
    pub fn into_api_error(self, internal_code: &'static str) -> ApiError {
        match self {
            AccessError::Missing(resource) => ApiError::NotFound(resource.not_found_code()),
            AccessError::Denied(_) => ApiError::AccessDenied,
            AccessError::Database(err) => {
                tracing::error!(code = internal_code, "Owner lookup failed: {}", err);
                ApiError::Internal(internal_code)
            }
        }
    }
}

/// Resolves owners and applies [`authorize`]
#[derive(Clone)]
pub struct AccessGuard {
    pool: PgPool,
}

impl AccessGuard {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Owner user id, or `None` when the row does not exist
    pub async fn owner_of(&self, resource: OwnedResource) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(resource.owner_query())
            .bind(resource.id())
            .fetch_optional(&self.pool)
            .await
    }

    /// Require that `caller` may act on `resource`
    pub async fn check(
        &self,
        caller: &SessionUser,
        resource: OwnedResource,
    ) -> Result<(), AccessError> {
        let owner = self
            .owner_of(resource)
            .await?
            .ok_or(AccessError::Missing(resource))?;

        if authorize(caller, owner) {
            Ok(())
        } else {
            tracing::debug!("User {} denied access to {}", caller.user_id, resource);
            Err(AccessError::Denied(resource))
        }
    }

    /// [`check`](Self::check) mapped straight onto the wire error
    pub async fn require(
        &self,
        caller: &SessionUser,
        resource: OwnedResource,
        internal_code: &'static str,
    ) -> Result<(), ApiError> {
        self.check(caller, resource)
            .await
            .map_err(|err| err.into_api_error(internal_code))
    }
}
