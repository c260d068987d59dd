use std::collections::BTreeMap;

use blocktask_types::library::{LibraryItem, LibraryKind};

/// Outcome of looking a name up in the library.
///
/// Unmatched names keep the requested text and carry no id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub id: Option<i64>,
    pub name: String,
    pub keywords: Option<Vec<String>>,
}

/// Snapshot of the library, grouped by entity kind.
#[derive(Debug, Clone, Default)]
pub struct LibraryCatalog {
    items: BTreeMap<LibraryKind, Vec<LibraryItem>>,
}

impl LibraryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: LibraryKind, items: Vec<LibraryItem>) -> Self {
        self.items.insert(kind, items);
        self
    }

    pub fn insert(&mut self, kind: LibraryKind, item: LibraryItem) {
        self.items.entry(kind).or_default().push(item);
    }

    pub fn items(&self, kind: LibraryKind) -> &[LibraryItem] {
        self.items.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn by_id(&self, kind: LibraryKind, id: i64) -> Option<&LibraryItem> {
        self.items(kind).iter().find(|item| item.id == id)
    }

    pub fn contains(&self, kind: LibraryKind, id: i64) -> bool {
        self.by_id(kind, id).is_some()
    }

    /// Find the item a spoken or typed name refers to.
    ///
    /// An exact name match (ignoring case) wins; failing that, the first item
    /// listing the name among its keywords (ignoring case).
    pub fn find(&self, kind: LibraryKind, name: &str) -> Option<&LibraryItem> {
        let wanted = name.trim().to_lowercase();
        let items = self.items(kind);
        items
            .iter()
            .find(|item| item.name.to_lowercase() == wanted)
            .or_else(|| {
                items.iter().find(|item| {
                    item.keywords
                        .as_deref()
                        .is_some_and(|kw| kw.iter().any(|k| k.trim().to_lowercase() == wanted))
                })
            })
    }

    pub fn resolve_name(&self, kind: LibraryKind, name: &str) -> Resolution {
        match self.find(kind, name) {
            Some(item) => Resolution {
                id: Some(item.id),
                name: item.name.clone(),
                keywords: item.keywords.clone(),
            },
            None => Resolution {
                id: None,
                name: name.to_string(),
                keywords: None,
            },
        }
    }
}
