//! Editing session over one block graph.
//!
//! The session exclusively owns its graph. Every successful mutation is
//! published on the session's [`EventBus`] so the presentation adapter can
//! follow along without touching the graph itself. Failed mutations publish
//! nothing and leave the graph unchanged.

use std::sync::Arc;

use blocktask_types::block::{BlockId, BlockKind, FieldValue, SocketName, WireWorkspace};
use blocktask_types::config::LayoutDefaults;
use blocktask_types::event::GraphEvent;
use blocktask_types::program::Program;
use blocktask_types::warning::Warning;

use crate::codec::wire::{graph_to_wire, wire_to_graph};
use crate::codec::{deserialize, serialize};
use crate::event::EventBus;
use crate::grammar::BlockTypeRegistry;
use crate::graph::{validate, BlockGraph, GraphError};
use crate::library::LibraryCatalog;

pub struct EditSession {
    graph: BlockGraph,
    layout: LayoutDefaults,
    events: EventBus,
}

impl EditSession {
    /// An empty session.
    pub fn new(registry: Arc<BlockTypeRegistry>, layout: LayoutDefaults, events: EventBus) -> Self {
        Self {
            graph: BlockGraph::new(registry),
            layout,
            events,
        }
    }

    /// Open a session on a stored program.
    pub fn open(
        program: &Program,
        registry: Arc<BlockTypeRegistry>,
        layout: LayoutDefaults,
        events: EventBus,
    ) -> Self {
        let mut session = Self::new(registry, layout, events);
        session.load(program);
        session
    }

    pub fn graph(&self) -> &BlockGraph {
        &self.graph
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Replace the graph with one built from `program`.
    pub fn load(&mut self, program: &Program) {
        self.graph = deserialize(program, self.graph.shared_registry(), &self.layout);
        self.reloaded();
    }

    /// Replace the graph with an editor workspace.
    pub fn load_wire(&mut self, workspace: &WireWorkspace) {
        self.graph = wire_to_graph(workspace, self.graph.shared_registry(), &self.layout);
        self.reloaded();
    }

    fn reloaded(&self) {
        tracing::debug!("edit session reloaded with {} block(s)", self.graph.len());
        self.events.publish(GraphEvent::Reloaded { blocks: self.graph.len() });
    }

    pub fn insert_block(&mut self, kind: BlockKind) -> BlockId {
        let block = self.graph.insert_block(kind);
        self.events.publish(GraphEvent::BlockInserted { block, kind });
        block
    }

    pub fn connect(&mut self, parent: BlockId, socket: SocketName, child: BlockId) -> Result<(), GraphError> {
        self.graph.connect(parent, socket, child)?;
        self.events.publish(GraphEvent::Connected { parent, socket, child });
        Ok(())
    }

    pub fn disconnect(&mut self, child: BlockId) -> Result<(), GraphError> {
        let (parent, socket) = self.graph.disconnect(child)?;
        self.events.publish(GraphEvent::Disconnected { parent, socket, child });
        Ok(())
    }

    pub fn remove_subtree(&mut self, id: BlockId) -> Result<Vec<BlockId>, GraphError> {
        let removed = self.graph.remove_subtree(id)?;
        self.events.publish(GraphEvent::SubtreeRemoved { removed: removed.clone() });
        Ok(removed)
    }

    pub fn set_field(&mut self, block: BlockId, field: &str, value: FieldValue) -> Result<(), GraphError> {
        self.graph.set_field(block, field, value.clone())?;
        self.events.publish(GraphEvent::FieldChanged {
            block,
            field: field.to_string(),
            value,
        });
        Ok(())
    }

    pub fn warnings(&self, catalog: Option<&LibraryCatalog>) -> Vec<Warning> {
        validate(&self.graph, catalog)
    }

    /// Serialize for storage. Warnings do not block saving.
    pub fn save(&self) -> Program {
        let program = serialize(&self.graph);
        tracing::info!("saved edit session ({} block(s))", self.graph.len());
        program
    }

    pub fn to_wire(&self) -> WireWorkspace {
        graph_to_wire(&self.graph)
    }
}

impl std::fmt::Debug for EditSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditSession")
            .field("blocks", &self.graph.len())
            .field("roots", &self.graph.roots().len())
            .field("events", &self.events)
            .finish()
    }
}
