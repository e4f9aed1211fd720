//! Element repository for database operations

use sqlx::PgPool;

use super::RepositoryError;
use crate::core::db::models::{Element, ElementFields};

const ELEMENT_COLUMNS: &str = "id, diagram_id, parent_id, kind, label, pos_x, pos_y, width, \
     height, rotation_degrees, z_order, style_json, metadata_json, created_at, updated_at";

#[derive(Clone)]
pub struct ElementRepository {
    pool: PgPool,
}

impl ElementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert an element and return its id
    pub async fn create(&self, fields: &ElementFields) -> Result<i32, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO elements (diagram_id, parent_id, kind, label, pos_x, pos_y, width, height,
                                  rotation_degrees, z_order, style_json, metadata_json)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            "#,
        )
        .bind(fields.diagram_id)
        .bind(fields.parent_id)
        .bind(fields.kind.as_str())
        .bind(&fields.label)
        .bind(fields.pos_x)
        .bind(fields.pos_y)
        .bind(fields.width)
        .bind(fields.height)
        .bind(fields.rotation_degrees)
        .bind(fields.z_order)
        .bind(&fields.style_json)
        .bind(&fields.metadata_json)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Element>, RepositoryError> {
        let element = sqlx::query_as::<_, Element>(&format!(
            "SELECT {} FROM elements WHERE id = $1",
            ELEMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(element)
    }

    /// Elements of a diagram, ordered by id
    pub async fn list_by_diagram(&self, diagram_id: i32) -> Result<Vec<Element>, RepositoryError> {
        let elements = sqlx::query_as::<_, Element>(&format!(
            "SELECT {} FROM elements WHERE diagram_id = $1 ORDER BY id",
            ELEMENT_COLUMNS
        ))
        .bind(diagram_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(elements)
    }

    /// Count how many of `ids` are elements of `diagram_id`.
    /// Duplicate ids are counted once.
    pub async fn count_in_diagram(&self, ids: &[i32], diagram_id: i32) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM elements WHERE id = ANY($1) AND diagram_id = $2",
        )
        .bind(ids)
        .bind(diagram_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Check if making `new_parent_id` the parent of `element_id` would close a loop
    pub async fn would_create_cycle(
        &self,
        element_id: i32,
        new_parent_id: i32,
    ) -> Result<bool, RepositoryError> {
        if element_id == new_parent_id {
            return Ok(true);
        }

        // The new parent must not sit anywhere below the element
        let is_descendant = sqlx::query_scalar::<_, bool>(
            r#"
            WITH RECURSIVE descendants AS (
                SELECT id FROM elements WHERE parent_id = $1
                UNION
                SELECT e.id FROM elements e
                INNER JOIN descendants d ON e.parent_id = d.id
            )
            SELECT EXISTS(SELECT 1 FROM descendants WHERE id = $2)
            "#,
        )
        .bind(element_id)
        .bind(new_parent_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(is_descendant)
    }

    /// Whether the element has children or takes part in a connection
    pub async fn has_links(&self, id: i32) -> Result<bool, RepositoryError> {
        let linked = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM elements WHERE parent_id = $1)
                OR EXISTS(SELECT 1 FROM connections
                          WHERE source_id = $1 OR target_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(linked)
    }

    /// Replace the editable columns. Returns false when no row matched.
    pub async fn update(&self, id: i32, fields: &ElementFields) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE elements
            SET diagram_id = $2, parent_id = $3, kind = $4, label = $5, pos_x = $6, pos_y = $7,
                width = $8, height = $9, rotation_degrees = $10, z_order = $11,
                style_json = $12, metadata_json = $13
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(fields.diagram_id)
        .bind(fields.parent_id)
        .bind(fields.kind.as_str())
        .bind(&fields.label)
        .bind(fields.pos_x)
        .bind(fields.pos_y)
        .bind(fields.width)
        .bind(fields.height)
        .bind(fields.rotation_degrees)
        .bind(fields.z_order)
        .bind(&fields.style_json)
        .bind(&fields.metadata_json)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i32) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM elements WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
