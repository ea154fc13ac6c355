//! Persistent geo cache repository.

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::Result;
use crate::database::models::GeoCacheDbModel;

/// Keys bound per `IN (...)` clause; well under SQLite's variable limit.
const LOOKUP_CHUNK: usize = 500;

/// Geo cache repository trait. Keys are already normalized by the caller.
#[async_trait]
pub trait GeoCacheRepository: Send + Sync {
    /// Fetch every cached row among `keys`; missing keys are simply absent.
    async fn get_many(&self, keys: &[String]) -> Result<Vec<GeoCacheDbModel>>;
    async fn get(&self, key: &str) -> Result<Option<GeoCacheDbModel>>;
    /// Insert or overwrite a row.
    async fn upsert(&self, entry: &GeoCacheDbModel) -> Result<()>;
}

/// SQLx implementation of GeoCacheRepository.
pub struct SqlxGeoCacheRepository {
    pool: SqlitePool,
}

impl SqlxGeoCacheRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GeoCacheRepository for SqlxGeoCacheRepository {
    async fn get_many(&self, keys: &[String]) -> Result<Vec<GeoCacheDbModel>> {
        let mut rows = Vec::with_capacity(keys.len());
        for chunk in keys.chunks(LOOKUP_CHUNK) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("SELECT * FROM geo_cache WHERE ip_key IN (");
            let mut separated = builder.separated(", ");
            for key in chunk {
                separated.push_bind(key.as_str());
            }
            separated.push_unseparated(")");

            let found = builder
                .build_query_as::<GeoCacheDbModel>()
                .fetch_all(&self.pool)
                .await?;
            rows.extend(found);
        }
        Ok(rows)
    }

    async fn get(&self, key: &str) -> Result<Option<GeoCacheDbModel>> {
        let row = sqlx::query_as::<_, GeoCacheDbModel>("SELECT * FROM geo_cache WHERE ip_key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn upsert(&self, entry: &GeoCacheDbModel) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO geo_cache (ip_key, lat, lon, city, country, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(ip_key) DO UPDATE SET
                lat = excluded.lat,
                lon = excluded.lon,
                city = excluded.city,
                country = excluded.country,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&entry.ip_key)
        .bind(entry.lat)
        .bind(entry.lon)
        .bind(&entry.city)
        .bind(&entry.country)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;

    fn row(key: &str, lat: f64) -> GeoCacheDbModel {
        GeoCacheDbModel {
            ip_key: key.to_string(),
            lat,
            lon: 2.0,
            city: Some("Paris".to_string()),
            country: None,
            updated_at: 1,
        }
    }

    #[tokio::test]
    async fn get_many_returns_only_hits() {
        let repo = SqlxGeoCacheRepository::new(test_pool().await);
        repo.upsert(&row("1_1_1_1", 1.0)).await.unwrap();
        repo.upsert(&row("2_2_2_2", 2.0)).await.unwrap();

        let keys = vec![
            "1_1_1_1".to_string(),
            "2_2_2_2".to_string(),
            "3_3_3_3".to_string(),
        ];
        let mut found = repo.get_many(&keys).await.unwrap();
        found.sort_by(|a, b| a.ip_key.cmp(&b.ip_key));
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].lat, 2.0);

        assert!(repo.get_many(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_overwrites() {
        let repo = SqlxGeoCacheRepository::new(test_pool().await);
        repo.upsert(&row("1_1_1_1", 1.0)).await.unwrap();
        repo.upsert(&row("1_1_1_1", 9.0)).await.unwrap();
        let stored = repo.get("1_1_1_1").await.unwrap().unwrap();
        assert_eq!(stored.lat, 9.0);
    }
}
