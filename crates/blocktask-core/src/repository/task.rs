//! Task store trait definition.

use blocktask_types::error::RepositoryError;
use blocktask_types::task::TaskRecord;
use uuid::Uuid;

use super::SortOrder;

/// Filter criteria for listing tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Only tasks shared with other operators.
    pub shared_only: bool,
    /// Direction by `updated_at`.
    pub sort_order: SortOrder,
    pub limit: Option<i64>,
}

/// Persistence of task programs under an opaque task id.
///
/// Implementations live in blocktask-infra (e.g., SqliteTaskStore).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait TaskStore: Send + Sync {
    /// Get a task by id.
    fn get(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<TaskRecord>, RepositoryError>> + Send;

    /// Insert or replace a task. Last write wins.
    fn put(
        &self,
        record: &TaskRecord,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn list(
        &self,
        filter: Option<TaskFilter>,
    ) -> impl std::future::Future<Output = Result<Vec<TaskRecord>, RepositoryError>> + Send;

    /// Delete a task. Returns `true` if it existed.
    fn delete(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}
