//! Editor node tree <-> graph.
//!
//! The block editor exchanges its workspace as nested nodes: value and
//! statement inputs keyed by socket name, the chain continuation under
//! `next`, canvas coordinates on root nodes only.

use std::sync::Arc;

use blocktask_types::block::{BlockId, FieldValue, Position, SocketName, WireNode, WireWorkspace};
use blocktask_types::config::LayoutDefaults;
use blocktask_types::warning::{Warning, WarningKind};

use super::{link_or_pin, set_or_pin};
use crate::grammar::{BlockTypeRegistry, FieldRejection};
use crate::graph::BlockGraph;

/// Export every root chain of `graph` as editor nodes.
pub fn graph_to_wire(graph: &BlockGraph) -> WireWorkspace {
    let blocks = graph
        .roots()
        .iter()
        .filter_map(|&root| {
            let mut node = node(graph, root)?;
            if let Some(Position { x, y }) = graph.get(root).and_then(|b| b.position) {
                node.x = Some(x);
                node.y = Some(y);
            }
            Some(node)
        })
        .collect();
    WireWorkspace { blocks }
}

fn node(graph: &BlockGraph, id: BlockId) -> Option<WireNode> {
    let block = graph.get(id)?;
    let mut node = WireNode::new(block.kind);
    node.fields = block.fields.clone();
    for (&socket, &child) in &block.inputs {
        let Some(child) = self::node(graph, child) else { continue };
        if socket == SocketName::Next {
            node.next = Some(Box::new(child));
        } else {
            node.inputs.insert(socket, child);
        }
    }
    Some(node)
}

/// Load an editor workspace into a graph.
///
/// Fields and links follow the graph rules. A link the grammar refuses
/// leaves the child chain detached and pins a warning; an out-of-range
/// number is clamped. Roots without coordinates get layout defaults.
pub fn wire_to_graph(workspace: &WireWorkspace, registry: Arc<BlockTypeRegistry>, layout: &LayoutDefaults) -> BlockGraph {
    let mut graph = BlockGraph::new(registry);
    for root in &workspace.blocks {
        let id = build(&mut graph, root);
        if let (Some(x), Some(y)) = (root.x, root.y) {
            let _ = graph.set_position(id, Position { x, y });
        }
    }

    let unplaced: Vec<(usize, BlockId)> = graph
        .roots()
        .iter()
        .enumerate()
        .filter(|(_, id)| graph.get(**id).is_some_and(|b| b.position.is_none()))
        .map(|(index, id)| (index, *id))
        .collect();
    for (index, id) in unplaced {
        let _ = graph.set_position(id, layout.position(index));
    }

    tracing::debug!(
        "loaded editor workspace: {} block(s), {} root(s)",
        graph.len(),
        graph.roots().len()
    );
    graph
}

fn build(graph: &mut BlockGraph, node: &WireNode) -> BlockId {
    let id = graph.insert_block(node.kind);

    // The node's fields replace the registry defaults.
    let defaults: Vec<String> = graph
        .get(id)
        .map(|b| b.fields.keys().cloned().collect())
        .unwrap_or_default();
    for name in defaults.iter().filter(|name| !node.fields.contains_key(*name)) {
        let _ = graph.clear_field(id, name);
    }
    for (name, value) in &node.fields {
        load_field(graph, id, name, value);
    }

    for (&socket, child) in &node.inputs {
        let child = build(graph, child);
        link_or_pin(graph, id, socket, child);
    }
    if let Some(next) = &node.next {
        let next = build(graph, next);
        link_or_pin(graph, id, SocketName::Next, next);
    }
    id
}

fn load_field(graph: &mut BlockGraph, id: BlockId, name: &str, value: &FieldValue) {
    let checked = graph
        .get(id)
        .map(|b| graph.registry().check_field(b.kind, name, value));
    if let Some(Err(FieldRejection::OutOfRange { min, max, value, .. })) = checked {
        let clamped = value.clamp(min, max);
        tracing::warn!("{name} {value} on {id} clamped to {clamped}");
        graph.pin(Warning::at(
            id,
            WarningKind::FieldClamped { field: name.to_string(), from: value, to: clamped },
        ));
        set_or_pin(graph, id, name, FieldValue::Int(clamped));
    } else {
        set_or_pin(graph, id, name, value.clone());
    }
}
