//! Join tables linking media files to diagrams and elements

use sqlx::PgPool;

use super::RepositoryError;
use crate::core::db::models::{
    CreateDiagramMedia, CreateElementMedia, DiagramMediaItem, ElementMediaItem,
};

#[derive(Clone)]
pub struct DiagramMediaRepository {
    pool: PgPool,
}

impl DiagramMediaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attachments of a diagram, ordered by `sort_order` then media id
    pub async fn list_by_diagram(
        &self,
        diagram_id: i32,
    ) -> Result<Vec<DiagramMediaItem>, RepositoryError> {
        let items = sqlx::query_as::<_, DiagramMediaItem>(
            r#"
            SELECT dm.diagram_id, dm.media_id, dm.description, dm.sort_order, dm.created_at,
                   m.kind AS media_kind, m.title, m.path
            FROM diagram_media dm
            JOIN media_files m ON m.id = dm.media_id
            WHERE dm.diagram_id = $1
            ORDER BY dm.sort_order, dm.media_id
            "#,
        )
        .bind(diagram_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Fails with a unique violation when the pair is already attached
    pub async fn create(&self, dto: &CreateDiagramMedia) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO diagram_media (diagram_id, media_id, description, sort_order)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(dto.diagram_id)
        .bind(dto.media_id)
        .bind(&dto.description)
        .bind(dto.sort_order)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete(&self, diagram_id: i32, media_id: i32) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM diagram_media WHERE diagram_id = $1 AND media_id = $2")
            .bind(diagram_id)
            .bind(media_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(Clone)]
pub struct ElementMediaRepository {
    pool: PgPool,
}

impl ElementMediaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_by_element(
        &self,
        element_id: i32,
    ) -> Result<Vec<ElementMediaItem>, RepositoryError> {
        let items = sqlx::query_as::<_, ElementMediaItem>(
            r#"
            SELECT em.element_id, em.media_id, em.usage_kind AS usage, em.created_at,
                   m.kind AS media_kind, m.title, m.path
            FROM element_media em
            JOIN media_files m ON m.id = em.media_id
            WHERE em.element_id = $1
            ORDER BY em.media_id
            "#,
        )
        .bind(element_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    pub async fn create(&self, dto: &CreateElementMedia) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO element_media (element_id, media_id, usage_kind) VALUES ($1, $2, $3)",
        )
        .bind(dto.element_id)
        .bind(dto.media_id)
        .bind(dto.usage.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete(&self, element_id: i32, media_id: i32) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM element_media WHERE element_id = $1 AND media_id = $2")
            .bind(element_id)
            .bind(media_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
