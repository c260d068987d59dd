//! Library repository trait definition.

use blocktask_types::error::RepositoryError;
use blocktask_types::library::{LibraryItem, LibraryKind};

use crate::library::LibraryCatalog;

/// Read access to the object/location/action libraries, plus the upkeep
/// the CLI needs to seed them.
pub trait LibraryRepository: Send + Sync {
    /// All items of one kind, ordered by id.
    fn list(
        &self,
        kind: LibraryKind,
    ) -> impl std::future::Future<Output = Result<Vec<LibraryItem>, RepositoryError>> + Send;

    /// Insert or replace an item.
    fn put(
        &self,
        kind: LibraryKind,
        item: &LibraryItem,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete an item. Returns `true` if it existed.
    fn delete(
        &self,
        kind: LibraryKind,
        id: i64,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}

/// Snapshot every library kind into a catalog for validation and resolution.
pub async fn load_catalog<R: LibraryRepository>(repo: &R) -> Result<LibraryCatalog, RepositoryError> {
    let mut catalog = LibraryCatalog::new();
    for kind in LibraryKind::ALL {
        catalog = catalog.with(kind, repo.list(kind).await?);
    }
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryLibrary {
        items: Mutex<BTreeMap<(LibraryKind, i64), LibraryItem>>,
    }

    impl LibraryRepository for MemoryLibrary {
        async fn list(&self, kind: LibraryKind) -> Result<Vec<LibraryItem>, RepositoryError> {
            let items = self.items.lock().unwrap();
            Ok(items
                .iter()
                .filter(|((k, _), _)| *k == kind)
                .map(|(_, item)| item.clone())
                .collect())
        }

        async fn put(&self, kind: LibraryKind, item: &LibraryItem) -> Result<(), RepositoryError> {
            self.items.lock().unwrap().insert((kind, item.id), item.clone());
            Ok(())
        }

        async fn delete(&self, kind: LibraryKind, id: i64) -> Result<bool, RepositoryError> {
            Ok(self.items.lock().unwrap().remove(&(kind, id)).is_some())
        }
    }

    #[tokio::test]
    async fn test_load_catalog_covers_every_kind() {
        let repo = MemoryLibrary::default();
        repo.put(
            LibraryKind::Object,
            &LibraryItem { id: 1, name: "Cup".into(), keywords: None },
        )
        .await
        .unwrap();
        repo.put(
            LibraryKind::Location,
            &LibraryItem { id: 1, name: "Tray".into(), keywords: None },
        )
        .await
        .unwrap();

        let catalog = load_catalog(&repo).await.unwrap();
        assert!(catalog.contains(LibraryKind::Object, 1));
        assert!(catalog.contains(LibraryKind::Location, 1));
        assert!(!catalog.contains(LibraryKind::Action, 1));
        assert!(repo.delete(LibraryKind::Object, 1).await.unwrap());
        assert!(!repo.delete(LibraryKind::Object, 1).await.unwrap());
    }
}
