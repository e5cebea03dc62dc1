use chrono::Utc;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser};
use crate::repository::{DocumentKey, DocumentStore, StorageError};

const UPSERT_DOCUMENT: &str = r"
    INSERT INTO documents (key, body, updated_at)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(key) DO UPDATE SET
        body = excluded.body,
        updated_at = excluded.updated_at
";

#[async_trait::async_trait]
impl DocumentStore for SqliteRepository {
    async fn read_document(&self, key: DocumentKey) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT body FROM documents WHERE key = ?1")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.map(|row| row.try_get::<String, _>("body").map_err(ser))
            .transpose()
    }

    async fn write_document(&self, key: DocumentKey, body: &str) -> Result<(), StorageError> {
        sqlx::query(UPSERT_DOCUMENT)
            .bind(key.as_str())
            .bind(body)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }

    async fn write_documents(&self, docs: &[(DocumentKey, String)]) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let now = Utc::now();
        for (key, body) in docs {
            sqlx::query(UPSERT_DOCUMENT)
                .bind(key.as_str())
                .bind(body.as_str())
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
        }
        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
