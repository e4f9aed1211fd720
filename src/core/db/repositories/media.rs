//! Media file repository
//!
//! Only metadata lives in the database; the bytes are handled by
//! `crate::core::media::storage`.

use sqlx::PgPool;

use super::RepositoryError;
use crate::core::db::models::{CreateMediaFile, MediaFile};

const MEDIA_COLUMNS: &str = "id, owner_id, kind, title, description, size_bytes, \
     duration_seconds, width, height, path, created_at, updated_at";

#[derive(Clone)]
pub struct MediaRepository {
    pool: PgPool,
}

impl MediaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, dto: &CreateMediaFile) -> Result<i32, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO media_files (owner_id, kind, title, description, size_bytes,
                                     duration_seconds, width, height, path)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(dto.owner_id)
        .bind(dto.kind.as_str())
        .bind(&dto.title)
        .bind(&dto.description)
        .bind(dto.size_bytes)
        .bind(dto.duration_seconds)
        .bind(dto.width)
        .bind(dto.height)
        .bind(&dto.path)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<MediaFile>, RepositoryError> {
        let file = sqlx::query_as::<_, MediaFile>(&format!(
            "SELECT {} FROM media_files WHERE id = $1",
            MEDIA_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(file)
    }

    pub async fn list_all(&self) -> Result<Vec<MediaFile>, RepositoryError> {
        let files = sqlx::query_as::<_, MediaFile>(&format!(
            "SELECT {} FROM media_files ORDER BY id",
            MEDIA_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(files)
    }

    pub async fn list_by_owner(&self, owner_id: i32) -> Result<Vec<MediaFile>, RepositoryError> {
        let files = sqlx::query_as::<_, MediaFile>(&format!(
            "SELECT {} FROM media_files WHERE owner_id = $1 ORDER BY id",
            MEDIA_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(files)
    }

    /// Delete the row, returning the stored path so the caller can remove the file
    pub async fn delete(&self, id: i32) -> Result<Option<String>, RepositoryError> {
        let path = sqlx::query_scalar::<_, String>(
            "DELETE FROM media_files WHERE id = $1 RETURNING path",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(path)
    }
}
