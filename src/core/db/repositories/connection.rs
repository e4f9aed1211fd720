//! Connection repository for database operations

use sqlx::PgPool;

use super::RepositoryError;
use crate::core::db::models::{Connection, ConnectionFields};

const CONNECTION_COLUMNS: &str = "id, diagram_id, source_id, target_id, kind, label, \
     points_json, style_json, created_at, updated_at";

#[derive(Clone)]
pub struct ConnectionRepository {
    pool: PgPool,
}

impl ConnectionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, fields: &ConnectionFields) -> Result<i32, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO connections (diagram_id, source_id, target_id, kind, label, points_json, style_json)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(fields.diagram_id)
        .bind(fields.source_id)
        .bind(fields.target_id)
        .bind(fields.kind.as_str())
        .bind(&fields.label)
        .bind(&fields.points_json)
        .bind(&fields.style_json)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Connection>, RepositoryError> {
        let connection = sqlx::query_as::<_, Connection>(&format!(
            "SELECT {} FROM connections WHERE id = $1",
            CONNECTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(connection)
    }

    /// Connections of a diagram, ordered by id
    pub async fn list_by_diagram(&self, diagram_id: i32) -> Result<Vec<Connection>, RepositoryError> {
        let connections = sqlx::query_as::<_, Connection>(&format!(
            "SELECT {} FROM connections WHERE diagram_id = $1 ORDER BY id",
            CONNECTION_COLUMNS
        ))
        .bind(diagram_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(connections)
    }

    pub async fn update(&self, id: i32, fields: &ConnectionFields) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE connections
            SET diagram_id = $2, source_id = $3, target_id = $4, kind = $5,
                label = $6, points_json = $7, style_json = $8
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(fields.diagram_id)
        .bind(fields.source_id)
        .bind(fields.target_id)
        .bind(fields.kind.as_str())
        .bind(&fields.label)
        .bind(&fields.points_json)
        .bind(&fields.style_json)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i32) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM connections WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
