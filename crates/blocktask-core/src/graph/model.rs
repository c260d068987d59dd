//! Arena-backed block graph.
//!
//! Blocks live in a map keyed by [`BlockId`]; links are stored on the parent
//! (socket -> child) and mirrored in a child -> parent index. Every mutation
//! goes through a method that keeps the graph a forest: a block has at most
//! one parent, links are type-checked against the registry, and a link that
//! would close a cycle is refused.

use std::collections::BTreeMap;
use std::sync::Arc;

use blocktask_types::block::{BlockId, BlockKind, FieldValue, Position, SocketName};
use blocktask_types::warning::Warning;
use thiserror::Error;

use crate::grammar::{BlockTypeRegistry, FieldRejection};

/// Structural violations. Rejected at the call site; never enter the graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("block {0} does not exist")]
    UnknownBlock(BlockId),

    #[error("'{kind}' blocks have no {socket} socket")]
    UnknownSocket { kind: BlockKind, socket: SocketName },

    #[error("'{child}' cannot connect to {parent}.{socket}")]
    InvalidConnection {
        parent: BlockKind,
        socket: SocketName,
        child: BlockKind,
    },

    #[error("block {0} already has a parent")]
    AlreadyConnected(BlockId),

    #[error("block {0} has no parent")]
    NotConnected(BlockId),

    #[error("socket {socket} of block {block} is occupied")]
    SocketOccupied { block: BlockId, socket: SocketName },

    #[error("connecting {child} under {parent} would create a cycle")]
    CycleDetected { parent: BlockId, child: BlockId },

    #[error("invalid field on block {block}: {source}")]
    InvalidField {
        block: BlockId,
        #[source]
        source: FieldRejection,
    },
}

/// A typed node of the diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    pub fields: BTreeMap<String, FieldValue>,
    /// Socket -> child. Includes the `Next` chain link.
    pub inputs: BTreeMap<SocketName, BlockId>,
    /// Presentation metadata, ignored by equality of graphs.
    pub position: Option<Position>,
}

impl Block {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn input(&self, socket: SocketName) -> Option<BlockId> {
        self.inputs.get(&socket).copied()
    }

    pub fn next(&self) -> Option<BlockId> {
        self.input(SocketName::Next)
    }
}

/// A forest of blocks under one grammar.
#[derive(Debug, Clone)]
pub struct BlockGraph {
    registry: Arc<BlockTypeRegistry>,
    blocks: BTreeMap<BlockId, Block>,
    parents: BTreeMap<BlockId, (BlockId, SocketName)>,
    /// Unparented blocks in document order.
    roots: Vec<BlockId>,
    /// Diagnostics recorded while loading a document.
    pinned: Vec<Warning>,
    next_id: u32,
}

impl BlockGraph {
    pub fn new(registry: Arc<BlockTypeRegistry>) -> Self {
        Self {
            registry,
            blocks: BTreeMap::new(),
            parents: BTreeMap::new(),
            roots: Vec::new(),
            pinned: Vec::new(),
            next_id: 0,
        }
    }

    pub fn registry(&self) -> &BlockTypeRegistry {
        &self.registry
    }

    pub fn shared_registry(&self) -> Arc<BlockTypeRegistry> {
        Arc::clone(&self.registry)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    pub fn block(&self, id: BlockId) -> Result<&Block, GraphError> {
        self.blocks.get(&id).ok_or(GraphError::UnknownBlock(id))
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    pub fn roots(&self) -> &[BlockId] {
        &self.roots
    }

    pub fn child(&self, parent: BlockId, socket: SocketName) -> Option<BlockId> {
        self.blocks.get(&parent)?.input(socket)
    }

    pub fn parent(&self, child: BlockId) -> Option<(BlockId, SocketName)> {
        self.parents.get(&child).copied()
    }

    /// `head` followed by every block reached through `Next`.
    pub fn chain(&self, head: BlockId) -> Vec<BlockId> {
        let mut chain = Vec::new();
        let mut cursor = self.blocks.get(&head).map(|b| b.id);
        while let Some(id) = cursor {
            chain.push(id);
            cursor = self.blocks.get(&id).and_then(Block::next);
        }
        chain
    }

    /// The chain plugged into a statement socket, empty when the socket is.
    pub fn branch(&self, parent: BlockId, socket: SocketName) -> Vec<BlockId> {
        self.child(parent, socket)
            .map(|head| self.chain(head))
            .unwrap_or_default()
    }

    /// `id` and everything below it, preorder.
    pub fn descendants(&self, id: BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(block) = self.blocks.get(&current) else {
                continue;
            };
            out.push(current);
            // Reverse so the first socket is visited first.
            stack.extend(block.inputs.values().rev().copied());
        }
        out
    }

    /// True when `ancestor` is `id` or lies on the path from `id` to its root.
    pub fn is_ancestor(&self, ancestor: BlockId, id: BlockId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parents.get(&current).map(|(p, _)| *p);
        }
        false
    }

    pub fn pinned(&self) -> &[Warning] {
        &self.pinned
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Add an unconnected block of `kind` with the registry's default fields.
    pub fn insert_block(&mut self, kind: BlockKind) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id += 1;
        let fields = self.registry.default_fields(kind);
        self.blocks.insert(
            id,
            Block {
                id,
                kind,
                fields,
                inputs: BTreeMap::new(),
                position: None,
            },
        );
        self.roots.push(id);
        tracing::debug!("inserted {kind} block {id}");
        id
    }

    /// Assign a field after checking it against the registry.
    pub fn set_field(
        &mut self,
        id: BlockId,
        name: &str,
        value: FieldValue,
    ) -> Result<(), GraphError> {
        let kind = self.block(id)?.kind;
        self.registry
            .check_field(kind, name, &value)
            .map_err(|source| GraphError::InvalidField { block: id, source })?;
        if let Some(block) = self.blocks.get_mut(&id) {
            block.fields.insert(name.to_string(), value);
        }
        Ok(())
    }

    pub fn clear_field(&mut self, id: BlockId, name: &str) -> Result<Option<FieldValue>, GraphError> {
        let block = self.blocks.get_mut(&id).ok_or(GraphError::UnknownBlock(id))?;
        Ok(block.fields.remove(name))
    }

    pub fn set_position(&mut self, id: BlockId, position: Position) -> Result<(), GraphError> {
        let block = self.blocks.get_mut(&id).ok_or(GraphError::UnknownBlock(id))?;
        block.position = Some(position);
        Ok(())
    }

    /// Plug the root block `child` into `socket` of `parent`.
    pub fn connect(
        &mut self,
        parent: BlockId,
        socket: SocketName,
        child: BlockId,
    ) -> Result<(), GraphError> {
        let parent_block = self.block(parent)?;
        let child_kind = self.block(child)?.kind;
        let parent_kind = parent_block.kind;

        let spec = self
            .registry
            .socket(parent_kind, socket)
            .ok_or(GraphError::UnknownSocket { kind: parent_kind, socket })?;
        if !spec.accepts.contains(&child_kind) {
            return Err(GraphError::InvalidConnection {
                parent: parent_kind,
                socket,
                child: child_kind,
            });
        }
        if self.parents.contains_key(&child) {
            return Err(GraphError::AlreadyConnected(child));
        }
        if parent_block.inputs.contains_key(&socket) {
            return Err(GraphError::SocketOccupied { block: parent, socket });
        }
        if self.is_ancestor(child, parent) {
            return Err(GraphError::CycleDetected { parent, child });
        }

        if let Some(block) = self.blocks.get_mut(&parent) {
            block.inputs.insert(socket, child);
        }
        self.parents.insert(child, (parent, socket));
        self.roots.retain(|r| *r != child);
        tracing::debug!("connected {child} to {parent}.{socket}");
        Ok(())
    }

    /// Detach `child` from its parent; it becomes the head of a new root chain.
    pub fn disconnect(&mut self, child: BlockId) -> Result<(BlockId, SocketName), GraphError> {
        self.block(child)?;
        let (parent, socket) = self
            .parents
            .remove(&child)
            .ok_or(GraphError::NotConnected(child))?;
        if let Some(block) = self.blocks.get_mut(&parent) {
            block.inputs.remove(&socket);
        }
        self.roots.push(child);
        tracing::debug!("disconnected {child} from {parent}.{socket}");
        Ok((parent, socket))
    }

    /// Delete `id` and everything below it (inputs, branches and the rest of
    /// its chain). Returns the removed ids, preorder.
    pub fn remove_subtree(&mut self, id: BlockId) -> Result<Vec<BlockId>, GraphError> {
        self.block(id)?;
        if self.parents.contains_key(&id) {
            self.disconnect(id)?;
        }
        let removed = self.descendants(id);
        for gone in &removed {
            self.blocks.remove(gone);
            self.parents.remove(gone);
        }
        self.roots.retain(|r| !removed.contains(r));
        self.pinned
            .retain(|w| w.block.is_none_or(|b| !removed.contains(&b)));
        tracing::debug!("removed {} block(s) under {id}", removed.len());
        Ok(removed)
    }

    /// Record a load-time diagnostic; reported by the validator.
    pub fn pin(&mut self, warning: Warning) {
        self.pinned.push(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocktask_types::block::FIELD_TIMES;
    use blocktask_types::warning::WarningKind;

    fn graph() -> BlockGraph {
        BlockGraph::new(Arc::new(BlockTypeRegistry::standard()))
    }

    const SOCKETS: [SocketName; 7] = [
        SocketName::Object,
        SocketName::Location,
        SocketName::Action,
        SocketName::When,
        SocketName::Do,
        SocketName::Otherwise,
        SocketName::Next,
    ];

    #[test]
    fn test_connect_succeeds_iff_kind_accepted() {
        let registry = BlockTypeRegistry::standard();
        for parent_kind in BlockKind::ALL {
            for child_kind in BlockKind::ALL {
                for socket in SOCKETS {
                    let mut g = graph();
                    let a = g.insert_block(parent_kind);
                    let b = g.insert_block(child_kind);
                    let expected = registry
                        .accepted_kinds(parent_kind, socket)
                        .contains(&child_kind);
                    let result = g.connect(a, socket, b);
                    assert_eq!(
                        result.is_ok(),
                        expected,
                        "{parent_kind}.{socket} <- {child_kind}: {result:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_location_ref_into_pick_object_rejected() {
        let mut g = graph();
        let pick = g.insert_block(BlockKind::Pick);
        let loc = g.insert_block(BlockKind::LocationRef);
        let err = g.connect(pick, SocketName::Object, loc).unwrap_err();
        assert_eq!(
            err,
            GraphError::InvalidConnection {
                parent: BlockKind::Pick,
                socket: SocketName::Object,
                child: BlockKind::LocationRef,
            }
        );
        // Nothing changed.
        assert_eq!(g.child(pick, SocketName::Object), None);
        assert_eq!(g.roots(), &[pick, loc]);
    }

    #[test]
    fn test_connect_updates_roots_and_parent() {
        let mut g = graph();
        let pick = g.insert_block(BlockKind::Pick);
        let place = g.insert_block(BlockKind::Place);
        g.connect(pick, SocketName::Next, place).unwrap();
        assert_eq!(g.roots(), &[pick]);
        assert_eq!(g.parent(place), Some((pick, SocketName::Next)));
        assert_eq!(g.chain(pick), vec![pick, place]);
    }

    #[test]
    fn test_second_parent_rejected() {
        let mut g = graph();
        let loop_a = g.insert_block(BlockKind::Loop);
        let loop_b = g.insert_block(BlockKind::Loop);
        let pick = g.insert_block(BlockKind::Pick);
        g.connect(loop_a, SocketName::Do, pick).unwrap();
        let err = g.connect(loop_b, SocketName::Do, pick).unwrap_err();
        assert_eq!(err, GraphError::AlreadyConnected(pick));
    }

    #[test]
    fn test_occupied_socket_rejected() {
        let mut g = graph();
        let pick = g.insert_block(BlockKind::Pick);
        let a = g.insert_block(BlockKind::ObjectRef);
        let b = g.insert_block(BlockKind::ObjectRef);
        g.connect(pick, SocketName::Object, a).unwrap();
        let err = g.connect(pick, SocketName::Object, b).unwrap_err();
        assert!(matches!(err, GraphError::SocketOccupied { .. }));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut g = graph();
        let outer = g.insert_block(BlockKind::Loop);
        let inner = g.insert_block(BlockKind::Repeat);
        g.connect(outer, SocketName::Do, inner).unwrap();
        // outer is inner's ancestor.
        let err = g.connect(inner, SocketName::Next, outer).unwrap_err();
        assert_eq!(err, GraphError::CycleDetected { parent: inner, child: outer });

        let err = g.connect(outer, SocketName::Next, outer).unwrap_err();
        assert_eq!(err, GraphError::CycleDetected { parent: outer, child: outer });
    }

    #[test]
    fn test_disconnect_makes_new_root() {
        let mut g = graph();
        let pick = g.insert_block(BlockKind::Pick);
        let processing = g.insert_block(BlockKind::Processing);
        let place = g.insert_block(BlockKind::Place);
        g.connect(pick, SocketName::Next, processing).unwrap();
        g.connect(processing, SocketName::Next, place).unwrap();

        let (parent, socket) = g.disconnect(processing).unwrap();
        assert_eq!((parent, socket), (pick, SocketName::Next));
        assert_eq!(g.roots(), &[pick, processing]);
        // The rest of the chain travels with it.
        assert_eq!(g.chain(processing), vec![processing, place]);
        assert_eq!(g.disconnect(pick), Err(GraphError::NotConnected(pick)));
    }

    #[test]
    fn test_remove_subtree_takes_branches_and_chain() {
        let mut g = graph();
        let repeat = g.insert_block(BlockKind::Repeat);
        let pick = g.insert_block(BlockKind::Pick);
        let obj = g.insert_block(BlockKind::ObjectRef);
        let place = g.insert_block(BlockKind::Place);
        let after = g.insert_block(BlockKind::Loop);
        g.connect(repeat, SocketName::Do, pick).unwrap();
        g.connect(pick, SocketName::Object, obj).unwrap();
        g.connect(pick, SocketName::Next, place).unwrap();
        g.connect(repeat, SocketName::Next, after).unwrap();
        g.pin(Warning::at(obj, WarningKind::MissingRepeatCount));

        let removed = g.remove_subtree(pick).unwrap();
        assert_eq!(removed, vec![pick, obj, place]);
        assert_eq!(g.len(), 2);
        assert_eq!(g.child(repeat, SocketName::Do), None);
        assert!(g.pinned().is_empty());

        let removed = g.remove_subtree(repeat).unwrap();
        assert_eq!(removed, vec![repeat, after]);
        assert!(g.is_empty());
        assert!(g.roots().is_empty());
    }

    #[test]
    fn test_insert_applies_default_fields() {
        let mut g = graph();
        let repeat = g.insert_block(BlockKind::Repeat);
        assert_eq!(
            g.block(repeat).unwrap().field(FIELD_TIMES),
            Some(&FieldValue::Int(2))
        );
    }

    #[test]
    fn test_set_field_out_of_range_is_hard_error() {
        let mut g = graph();
        let repeat = g.insert_block(BlockKind::Repeat);
        let err = g.set_field(repeat, FIELD_TIMES, FieldValue::Int(0)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("1..=99"), "got: {msg}");
        g.set_field(repeat, FIELD_TIMES, FieldValue::Int(7)).unwrap();
        assert_eq!(g.block(repeat).unwrap().field(FIELD_TIMES), Some(&FieldValue::Int(7)));
    }

    #[test]
    fn test_unknown_block_errors() {
        let mut g = graph();
        let pick = g.insert_block(BlockKind::Pick);
        let ghost = BlockId(99);
        assert_eq!(
            g.connect(pick, SocketName::Next, ghost),
            Err(GraphError::UnknownBlock(ghost))
        );
        assert_eq!(g.remove_subtree(ghost), Err(GraphError::UnknownBlock(ghost)));
    }
}
