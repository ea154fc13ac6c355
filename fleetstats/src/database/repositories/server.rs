//! Server registry repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::database::models::{ServerInput, UpstreamServer};
use crate::database::time::now_ms;
use crate::{Error, Result};

/// Server registry repository trait.
#[async_trait]
pub trait ServerRepository: Send + Sync {
    async fn list_servers(&self) -> Result<Vec<UpstreamServer>>;
    async fn get_server(&self, id: i64) -> Result<Option<UpstreamServer>>;
    async fn create_server(&self, input: &ServerInput) -> Result<UpstreamServer>;
    async fn update_server(&self, id: i64, input: &ServerInput) -> Result<UpstreamServer>;
    async fn delete_server(&self, id: i64) -> Result<()>;
}

/// SQLx implementation of ServerRepository.
pub struct SqlxServerRepository {
    pool: SqlitePool,
}

impl SqlxServerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServerRepository for SqlxServerRepository {
    async fn list_servers(&self) -> Result<Vec<UpstreamServer>> {
        let servers = sqlx::query_as::<_, UpstreamServer>("SELECT * FROM servers ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(servers)
    }

    async fn get_server(&self, id: i64) -> Result<Option<UpstreamServer>> {
        let server = sqlx::query_as::<_, UpstreamServer>("SELECT * FROM servers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(server)
    }

    async fn create_server(&self, input: &ServerInput) -> Result<UpstreamServer> {
        let now = now_ms();
        let server = sqlx::query_as::<_, UpstreamServer>(
            r#"
            INSERT INTO servers (name, base_url, credential, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.base_url)
        .bind(&input.credential)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(server)
    }

    async fn update_server(&self, id: i64, input: &ServerInput) -> Result<UpstreamServer> {
        sqlx::query_as::<_, UpstreamServer>(
            r#"
            UPDATE servers SET name = ?, base_url = ?, credential = ?, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.base_url)
        .bind(&input.credential)
        .bind(now_ms())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::not_found("Server", id.to_string()))
    }

    async fn delete_server(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM servers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("Server", id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;

    fn input(name: &str) -> ServerInput {
        ServerInput {
            name: name.to_string(),
            base_url: format!("http://{name}.local:8181"),
            credential: format!("{name}-key"),
        }
    }

    #[tokio::test]
    async fn crud_round_trip() {
        let repo = SqlxServerRepository::new(test_pool().await);

        let a = repo.create_server(&input("alpha")).await.unwrap();
        let b = repo.create_server(&input("beta")).await.unwrap();
        assert!(b.id > a.id);

        let listed = repo.list_servers().await.unwrap();
        assert_eq!(
            listed.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            vec!["alpha", "beta"]
        );

        let updated = repo.update_server(a.id, &input("gamma")).await.unwrap();
        assert_eq!(updated.name, "gamma");
        assert_eq!(updated.credential, "gamma-key");

        repo.delete_server(b.id).await.unwrap();
        assert!(repo.get_server(b.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let repo = SqlxServerRepository::new(test_pool().await);
        assert!(matches!(
            repo.update_server(99, &input("x")).await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            repo.delete_server(99).await,
            Err(Error::NotFound { .. })
        ));
    }
}
