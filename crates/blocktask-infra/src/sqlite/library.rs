//! SQLite library repository implementation.

use blocktask_core::repository::LibraryRepository;
use blocktask_types::error::RepositoryError;
use blocktask_types::library::{LibraryItem, LibraryKind};
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `LibraryRepository`.
pub struct SqliteLibraryRepository {
    pool: DatabasePool,
}

impl SqliteLibraryRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn item_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<LibraryItem, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Query(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Query(e.to_string()))?;
    let keywords: Option<String> = row
        .try_get("keywords")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let keywords = keywords
        .as_deref()
        .map(serde_json::from_str::<Vec<String>>)
        .transpose()
        .map_err(|e| RepositoryError::Query(format!("invalid keywords JSON: {e}")))?;
    Ok(LibraryItem { id, name, keywords })
}

impl LibraryRepository for SqliteLibraryRepository {
    async fn list(&self, kind: LibraryKind) -> Result<Vec<LibraryItem>, RepositoryError> {
        let rows = sqlx::query("SELECT id, name, keywords FROM library_items WHERE kind = ? ORDER BY id")
            .bind(kind.as_str())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter().map(item_from_row).collect()
    }

    async fn put(&self, kind: LibraryKind, item: &LibraryItem) -> Result<(), RepositoryError> {
        let keywords = item
            .keywords
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(
            "INSERT INTO library_items (kind, id, name, keywords) VALUES (?, ?, ?, ?)
             ON CONFLICT(kind, id) DO UPDATE SET name = excluded.name, keywords = excluded.keywords",
        )
        .bind(kind.as_str())
        .bind(item.id)
        .bind(&item.name)
        .bind(keywords)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tracing::debug!(%kind, id = item.id, "stored library item");
        Ok(())
    }

    async fn delete(&self, kind: LibraryKind, id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM library_items WHERE kind = ? AND id = ?")
            .bind(kind.as_str())
            .bind(id)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
