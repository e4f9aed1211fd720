//! Diagram repository for database operations
//!
//! Provides CRUD operations for diagrams. Deleting a diagram cascades to its
//! elements, connections and media attachments.

use sqlx::PgPool;

use super::RepositoryError;
use crate::core::db::models::{Diagram, DiagramFields};

const DIAGRAM_COLUMNS: &str = "id, owner_id, name, description, status, canvas_width, \
     canvas_height, config_json, created_at, updated_at";

/// Diagram repository for database operations
#[derive(Clone)]
pub struct DiagramRepository {
    pool: PgPool,
}

impl DiagramRepository {
    /// Create a new diagram repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new diagram and return its id
    pub async fn create(&self, owner_id: i32, fields: &DiagramFields) -> Result<i32, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO diagrams (owner_id, name, description, status, canvas_width, canvas_height, config_json)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(owner_id)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.status.as_str())
        .bind(fields.canvas_width)
        .bind(fields.canvas_height)
        .bind(&fields.config_json)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Find diagram by ID
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Diagram>, RepositoryError> {
        let diagram = sqlx::query_as::<_, Diagram>(&format!(
            "SELECT {} FROM diagrams WHERE id = $1",
            DIAGRAM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(diagram)
    }

    /// List every diagram, ordered by id
    pub async fn list_all(&self) -> Result<Vec<Diagram>, RepositoryError> {
        let diagrams = sqlx::query_as::<_, Diagram>(&format!(
            "SELECT {} FROM diagrams ORDER BY id",
            DIAGRAM_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(diagrams)
    }

    /// List diagrams owned by a user, ordered by id
    pub async fn list_by_owner(&self, owner_id: i32) -> Result<Vec<Diagram>, RepositoryError> {
        let diagrams = sqlx::query_as::<_, Diagram>(&format!(
            "SELECT {} FROM diagrams WHERE owner_id = $1 ORDER BY id",
            DIAGRAM_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(diagrams)
    }

    /// Replace the editable columns. Returns false when no row matched.
    pub async fn update(&self, id: i32, fields: &DiagramFields) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE diagrams
            SET name = $2, description = $3, status = $4,
                canvas_width = $5, canvas_height = $6, config_json = $7
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(fields.status.as_str())
        .bind(fields.canvas_width)
        .bind(fields.canvas_height)
        .bind(&fields.config_json)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete diagram
    pub async fn delete(&self, id: i32) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM diagrams WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::models::DiagramStatus;
    use crate::core::db::repositories::test_support;

    fn fields(name: &str) -> DiagramFields {
        DiagramFields {
            name: name.to_string(),
            description: Some("Sistema de ventas".to_string()),
            status: DiagramStatus::Draft,
            canvas_width: 1920,
            canvas_height: 1080,
            config_json: Some(r#"{"grid":10}"#.to_string()),
        }
    }

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::DatabaseError(sqlx::Error::RowNotFound);
        assert!(err.to_string().starts_with("Database error"));
    }

    // ========================================================================
    // Integration Tests (require database)
    // ========================================================================

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_create_and_find_round_trip() {
        let pool = test_support::pool().await;
        let user_id = test_support::user(&pool).await;
        let repo = DiagramRepository::new(pool.clone());

        let id = repo.create(user_id, &fields("Ventas")).await.unwrap();
        let diagram = repo.find_by_id(id).await.unwrap().unwrap();

        assert_eq!(diagram.owner_id, user_id);
        assert_eq!(diagram.name, "Ventas");
        assert_eq!(diagram.description.as_deref(), Some("Sistema de ventas"));
        assert_eq!(diagram.status, DiagramStatus::Draft);
        assert_eq!(diagram.canvas_width, 1920);
        assert_eq!(diagram.canvas_height, 1080);
        assert_eq!(diagram.config_json.as_deref(), Some(r#"{"grid":10}"#));

        test_support::cleanup_user(&pool, user_id).await;
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_list_by_owner_is_scoped_and_ordered() {
        let pool = test_support::pool().await;
        let owner = test_support::user(&pool).await;
        let other = test_support::user(&pool).await;
        let repo = DiagramRepository::new(pool.clone());

        let first = repo.create(owner, &fields("A")).await.unwrap();
        let second = repo.create(owner, &fields("B")).await.unwrap();
        repo.create(other, &fields("C")).await.unwrap();

        let ids: Vec<i32> = repo
            .list_by_owner(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![first, second]);

        test_support::cleanup_user(&pool, owner).await;
        test_support::cleanup_user(&pool, other).await;
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_update_and_delete() {
        let pool = test_support::pool().await;
        let user_id = test_support::user(&pool).await;
        let repo = DiagramRepository::new(pool.clone());

        let id = repo.create(user_id, &fields("Old")).await.unwrap();
        let mut changed = fields("New");
        changed.status = DiagramStatus::Archived;
        changed.description = None;

        assert!(repo.update(id, &changed).await.unwrap());
        let diagram = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(diagram.name, "New");
        assert_eq!(diagram.status, DiagramStatus::Archived);
        assert!(diagram.description.is_none());

        assert!(repo.delete(id).await.unwrap());
        assert!(!repo.delete(id).await.unwrap());
        assert!(!repo.update(id, &changed).await.unwrap());

        test_support::cleanup_user(&pool, user_id).await;
    }
}
