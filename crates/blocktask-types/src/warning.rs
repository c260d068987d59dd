//! Soft validation warnings.
//!
//! Warnings never block editing or saving. They are attached to the offending
//! block (when there is one) and surfaced by the presentation layer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::block::{BlockId, BlockKind, SocketName, StepKind};
use crate::library::LibraryKind;

/// What a warning is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WarningKind {
    /// A library reference with no id, or an id the library does not know.
    UnresolvedReference { entity: LibraryKind, name: Option<String> },
    /// A required value socket is empty.
    MissingInput { socket: SocketName },
    /// A non-empty branch lacks a mandatory step.
    MissingStep { step: StepKind },
    /// A branch holds more than one block of the same step kind.
    DuplicateStep { step: StepKind },
    /// A logic block nested inside DO/OTHERWISE, which documents cannot express.
    NestedControl,
    /// A top-level chain that does not contribute to the program.
    OrphanChain { head: BlockKind },
    /// A repeat block without a count.
    MissingRepeatCount,
    /// A document control type the grammar does not know.
    UnknownControlType { value: String },
    /// A document event type the grammar does not know.
    UnknownEventType { value: String },
    /// A field value outside its declared range was clamped on load.
    FieldClamped { field: String, from: i64, to: i64 },
    /// A field in a loaded document the grammar does not accept; dropped.
    InvalidField { field: String, reason: String },
    /// A link in a loaded document that the grammar rejects.
    RejectedLink { parent: BlockKind, socket: SocketName, child: BlockKind },
}

/// One advisory finding about a block graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// The offending block, when the warning is about a specific one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockId>,
    #[serde(flatten)]
    pub kind: WarningKind,
}

impl Warning {
    pub fn at(block: BlockId, kind: WarningKind) -> Self {
        Self { block: Some(block), kind }
    }

    /// Human-readable message.
    pub fn message(&self) -> String {
        match &self.kind {
            WarningKind::UnresolvedReference { entity, .. } => format!("{} not defined", entity.label()),
            WarningKind::MissingInput { socket } => format!("{socket} input is empty"),
            WarningKind::MissingStep { step } => format!("branch has no {step} step"),
            WarningKind::DuplicateStep { step } => {
                format!("more than one {step} step in one branch; only the first is saved")
            }
            WarningKind::NestedControl => "logic blocks inside DO/OTHERWISE are not saved".to_string(),
            WarningKind::OrphanChain { head } => format!("detached chain starting at '{head}' is not saved"),
            WarningKind::MissingRepeatCount => "repeat has no count".to_string(),
            WarningKind::UnknownControlType { value } => {
                format!("unknown control type '{value}', loaded as a plain chain")
            }
            WarningKind::UnknownEventType { value } => format!("unknown event type '{value}'"),
            WarningKind::FieldClamped { field, from, to } => {
                format!("{field} {from} out of range, clamped to {to}")
            }
            WarningKind::InvalidField { field, reason } => format!("field '{field}' dropped: {reason}"),
            WarningKind::RejectedLink { parent, socket, child } => {
                format!("'{child}' cannot connect to {parent}.{socket}; left detached")
            }
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.block {
            Some(id) => write!(f, "{id}: {}", self.message()),
            None => f.write_str(&self.message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unresolved_reference_message() {
        let w = Warning::at(
            BlockId(4),
            WarningKind::UnresolvedReference { entity: LibraryKind::Object, name: None },
        );
        assert_eq!(w.message(), "Object not defined");
        assert_eq!(w.to_string(), "#4: Object not defined");
    }

    #[test]
    fn test_warning_serializes_flat() {
        let w = Warning::at(BlockId(2), WarningKind::DuplicateStep { step: StepKind::Pick });
        assert_eq!(
            serde_json::to_value(&w).unwrap(),
            json!({"block": 2, "type": "duplicate_step", "step": "pick"})
        );
    }
}
