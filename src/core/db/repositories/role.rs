//! Role repository

use sqlx::PgPool;

use super::RepositoryError;
use crate::core::db::models::{Role, RoleFields};

#[derive(Clone)]
pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All roles ordered by id
    pub async fn list(&self) -> Result<Vec<Role>, RepositoryError> {
        let roles = sqlx::query_as::<_, Role>("SELECT id, name, description FROM roles ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(roles)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Role>, RepositoryError> {
        let role =
            sqlx::query_as::<_, Role>("SELECT id, name, description FROM roles WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(role)
    }

    pub async fn create(&self, fields: &RoleFields) -> Result<i32, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO roles (name, description) VALUES ($1, $2) RETURNING id",
        )
        .bind(&fields.name)
        .bind(&fields.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn update(&self, id: i32, fields: &RoleFields) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE roles SET name = $2, description = $3 WHERE id = $1")
            .bind(id)
            .bind(&fields.name)
            .bind(&fields.description)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Fails with a foreign-key violation while users still reference the role
    pub async fn delete(&self, id: i32) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::repositories::test_support;

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_seeded_roles() {
        let repo = RoleRepository::new(test_support::pool().await);

        let roles = repo.list().await.unwrap();
        assert!(roles.len() >= 2);
        assert_eq!(roles[0].id, 1);
        assert_eq!(roles[0].name, "ADMIN");
        assert!(roles.windows(2).all(|pair| pair[0].id < pair[1].id));
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_role_lifecycle() {
        let repo = RoleRepository::new(test_support::pool().await);
        let fields = RoleFields {
            name: test_support::unique_name("REVISOR"),
            description: Some("Solo lectura".to_string()),
        };

        let id = repo.create(&fields).await.unwrap();
        let role = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(role.name, fields.name);
        assert_eq!(role.description.as_deref(), Some("Solo lectura"));

        let renamed = RoleFields {
            name: test_support::unique_name("EDITOR"),
            description: None,
        };
        assert!(repo.update(id, &renamed).await.unwrap());
        assert!(repo.find_by_id(id).await.unwrap().unwrap().description.is_none());

        assert!(repo.delete(id).await.unwrap());
        assert!(!repo.delete(id).await.unwrap());
    }
}
