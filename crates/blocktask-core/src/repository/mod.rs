//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (blocktask-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod library;
pub mod task;

pub use library::{load_catalog, LibraryRepository};
pub use task::{TaskFilter, TaskStore};

/// Sort order for list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}
