use thiserror::Error;

/// Errors from repository operations (used by trait definitions in blocktask-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        assert_eq!(RepositoryError::NotFound.to_string(), "entity not found");
        assert_eq!(
            RepositoryError::Query("bad row".to_string()).to_string(),
            "query error: bad row"
        );
        assert_eq!(
            RepositoryError::Conflict("duplicate name".to_string()).to_string(),
            "conflict: duplicate name"
        );
    }
}
