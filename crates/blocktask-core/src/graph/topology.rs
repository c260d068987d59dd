//! petgraph views of a block graph.
//!
//! Used to compare graphs structurally (kinds, fields, socket topology;
//! layout ignored) and to export a Graphviz rendering for the CLI.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use blocktask_types::block::{BlockId, BlockKind, FieldValue, SocketName};
use petgraph::algo::is_isomorphic_matching;
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};

use super::model::BlockGraph;

/// Node weight: everything about a block except its id and layout.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeLabel {
    pub kind: BlockKind,
    pub fields: BTreeMap<String, FieldValue>,
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for (name, value) in &self.fields {
            write!(f, " {name}={value}")?;
        }
        Ok(())
    }
}

/// Directed graph with parent -> child edges labelled by socket.
pub fn to_digraph(graph: &BlockGraph) -> DiGraph<NodeLabel, SocketName> {
    let mut out = DiGraph::new();
    let mut index: HashMap<BlockId, NodeIndex> = HashMap::new();

    for block in graph.blocks() {
        let idx = out.add_node(NodeLabel {
            kind: block.kind,
            fields: block.fields.clone(),
        });
        index.insert(block.id, idx);
    }
    for block in graph.blocks() {
        for (socket, child) in &block.inputs {
            if let (Some(&from), Some(&to)) = (index.get(&block.id), index.get(child)) {
                out.add_edge(from, to, *socket);
            }
        }
    }
    out
}

/// Same kinds, fields and socket topology.
pub fn is_isomorphic(a: &BlockGraph, b: &BlockGraph) -> bool {
    let ga = to_digraph(a);
    let gb = to_digraph(b);
    is_isomorphic_matching(&ga, &gb, |x, y| x == y, |e1, e2| e1 == e2)
}

/// Graphviz DOT rendering.
pub fn to_dot(graph: &BlockGraph) -> String {
    format!("{}", Dot::new(&to_digraph(graph)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::grammar::BlockTypeRegistry;

    fn pick_place(object: &str) -> BlockGraph {
        let mut g = BlockGraph::new(Arc::new(BlockTypeRegistry::standard()));
        let pick = g.insert_block(BlockKind::Pick);
        let obj = g.insert_block(BlockKind::ObjectRef);
        let place = g.insert_block(BlockKind::Place);
        g.set_field(obj, "name", FieldValue::from(object)).unwrap();
        g.connect(pick, SocketName::Object, obj).unwrap();
        g.connect(pick, SocketName::Next, place).unwrap();
        g
    }

    #[test]
    fn test_isomorphic_ignores_insertion_order() {
        let a = pick_place("cup");

        let mut b = BlockGraph::new(Arc::new(BlockTypeRegistry::standard()));
        let place = b.insert_block(BlockKind::Place);
        let obj = b.insert_block(BlockKind::ObjectRef);
        let pick = b.insert_block(BlockKind::Pick);
        b.set_field(obj, "name", FieldValue::from("cup")).unwrap();
        b.connect(pick, SocketName::Next, place).unwrap();
        b.connect(pick, SocketName::Object, obj).unwrap();

        assert!(is_isomorphic(&a, &b));
    }

    #[test]
    fn test_field_difference_breaks_isomorphism() {
        assert!(!is_isomorphic(&pick_place("cup"), &pick_place("bolt")));
    }

    #[test]
    fn test_dot_mentions_sockets() {
        let dot = to_dot(&pick_place("cup"));
        assert!(dot.contains("OBJECT"), "got: {dot}");
        assert!(dot.contains("name=cup"), "got: {dot}");
    }
}
