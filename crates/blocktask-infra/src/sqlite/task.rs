//! SQLite task store implementation.
//!
//! Implements `TaskStore` from `blocktask-core`. The program is kept as a JSON
//! document with unset leaves omitted, the same shape the editor writes.

use blocktask_core::codec::document::{from_value, to_graphic_value};
use blocktask_core::repository::TaskFilter;
use blocktask_core::repository::TaskStore;
use blocktask_types::error::RepositoryError;
use blocktask_types::program::Program;
use blocktask_types::task::TaskRecord;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `TaskStore`.
pub struct SqliteTaskStore {
    pool: DatabasePool,
}

impl SqliteTaskStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to a domain `TaskRecord`.
struct TaskRow {
    id: String,
    name: String,
    description: Option<String>,
    shared: bool,
    program: String,
    created_at: String,
    updated_at: String,
}

impl TaskRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            shared: row.try_get("shared")?,
            program: row.try_get("program")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_record(self) -> Result<TaskRecord, RepositoryError> {
        let id = self
            .id
            .parse::<Uuid>()
            .map_err(|e| RepositoryError::Query(format!("invalid task id: {e}")))?;

        Ok(TaskRecord {
            id,
            name: self.name,
            description: self.description,
            shared: self.shared,
            program: decode_program(&self.program)?,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn encode_program(program: &Program) -> Result<String, RepositoryError> {
    let value = to_graphic_value(&program.clone().into())
        .map_err(|e| RepositoryError::Query(format!("cannot encode program: {e}")))?;
    Ok(value.to_string())
}

fn decode_program(blob: &str) -> Result<Program, RepositoryError> {
    let value: serde_json::Value = serde_json::from_str(blob)
        .map_err(|e| RepositoryError::Query(format!("invalid program JSON: {e}")))?;
    from_value(value)
        .map(|doc| doc.program)
        .map_err(|e| RepositoryError::Query(format!("invalid program document: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

impl TaskStore for SqliteTaskStore {
    async fn get(&self, id: &Uuid) -> Result<Option<TaskRecord>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let task_row =
                    TaskRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(task_row.into_record()?))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, record: &TaskRecord) -> Result<(), RepositoryError> {
        let program = encode_program(&record.program)?;

        sqlx::query(
            "INSERT INTO tasks (id, name, description, shared, program, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                shared = excluded.shared,
                program = excluded.program,
                updated_at = excluded.updated_at",
        )
        .bind(record.id.to_string())
        .bind(&record.name)
        .bind(&record.description)
        .bind(record.shared)
        .bind(&program)
        .bind(format_datetime(&record.created_at))
        .bind(format_datetime(&record.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tracing::info!(task = %record.id, "stored task program");
        Ok(())
    }

    async fn list(&self, filter: Option<TaskFilter>) -> Result<Vec<TaskRecord>, RepositoryError> {
        let filter = filter.unwrap_or_default();

        let mut sql = String::from("SELECT * FROM tasks");
        if filter.shared_only {
            sql.push_str(" WHERE shared = 1");
        }
        sql.push_str(&format!(" ORDER BY updated_at {}", filter.sort_order.as_sql()));
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut tasks = Vec::with_capacity(rows.len());
        for row in &rows {
            let task_row =
                TaskRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            tasks.push(task_row.into_record()?);
        }
        Ok(tasks)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
