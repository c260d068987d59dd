//! Library entity types.
//!
//! Objects, locations and actions are defined elsewhere (CRUD screens) and
//! referenced by task programs through their id and name.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The three kinds of library entity a task program can reference.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum LibraryKind {
    Object,
    Location,
    Action,
}

impl LibraryKind {
    pub const ALL: [LibraryKind; 3] = [LibraryKind::Object, LibraryKind::Location, LibraryKind::Action];

    /// Lowercase storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LibraryKind::Object => "object",
            LibraryKind::Location => "location",
            LibraryKind::Action => "action",
        }
    }

    /// Capitalized label used in user-facing warnings.
    pub fn label(&self) -> &'static str {
        match self {
            LibraryKind::Object => "Object",
            LibraryKind::Location => "Location",
            LibraryKind::Action => "Action",
        }
    }
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LibraryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "object" | "objects" => Ok(LibraryKind::Object),
            "location" | "locations" => Ok(LibraryKind::Location),
            "action" | "actions" => Ok(LibraryKind::Action),
            other => Err(format!("unknown library kind '{other}'")),
        }
    }
}

/// A library entity as supplied by the library collaborator.
///
/// Consumed only to populate reference fields; the core never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LibraryItem {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
}

impl LibraryItem {
    /// Keywords joined with commas, the form shown in tooltips and tables.
    pub fn keywords_joined(&self) -> String {
        self.keywords
            .as_deref()
            .map(|k| k.join(","))
            .unwrap_or_default()
    }
}
