//! Graph change notifications.
//!
//! Published by an edit session whenever its block graph mutates, so the
//! presentation adapter can re-render without sharing mutable state.

use serde::{Deserialize, Serialize};

use crate::block::{BlockId, BlockKind, FieldValue, SocketName};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphEvent {
    BlockInserted {
        block: BlockId,
        kind: BlockKind,
    },
    Connected {
        parent: BlockId,
        socket: SocketName,
        child: BlockId,
    },
    Disconnected {
        parent: BlockId,
        socket: SocketName,
        child: BlockId,
    },
    SubtreeRemoved {
        removed: Vec<BlockId>,
    },
    FieldChanged {
        block: BlockId,
        field: String,
        value: FieldValue,
    },
    /// The whole graph was replaced, e.g. after loading a document.
    Reloaded {
        blocks: usize,
    },
}
