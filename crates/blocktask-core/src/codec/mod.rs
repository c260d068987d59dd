//! AST codec between block graphs and task programs.
//!
//! - [`serialize`] walks a graph into the canonical [`Program`].
//! - [`deserialize`] rebuilds a graph from a program, placing roots at the
//!   configured layout defaults.
//! - [`wire`] converts graphs to and from the editor's node tree.
//! - [`document`] reads documents (JSON or YAML, either surface variant) and
//!   emits the graphic or nullable variant.
//!
//! Decoding never fails on a well-typed document: unknown enum values and
//! links the grammar refuses are pinned to the graph as warnings instead.
//!
//! [`Program`]: blocktask_types::program::Program

pub mod deserialize;
pub mod document;
pub mod serialize;
pub mod wire;

use blocktask_types::block::{BlockId, FieldValue, SocketName};
use blocktask_types::warning::{Warning, WarningKind};
use thiserror::Error;

use crate::graph::BlockGraph;

pub use deserialize::deserialize;
pub use serialize::serialize;

/// Errors reading or writing documents. Decoding a parsed document is total.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

/// Connect `child` under `parent`, or leave it as a root and pin why.
pub(crate) fn link_or_pin(graph: &mut BlockGraph, parent: BlockId, socket: SocketName, child: BlockId) -> bool {
    let Err(err) = graph.connect(parent, socket, child) else {
        return true;
    };
    tracing::warn!("left {child} detached: {err}");
    let kinds = graph.get(parent).zip(graph.get(child)).map(|(p, c)| (p.kind, c.kind));
    if let Some((parent_kind, child_kind)) = kinds {
        graph.pin(Warning::at(
            child,
            WarningKind::RejectedLink { parent: parent_kind, socket, child: child_kind },
        ));
    }
    false
}

/// Assign a field, or pin it as dropped.
pub(crate) fn set_or_pin(graph: &mut BlockGraph, id: BlockId, field: &str, value: FieldValue) {
    if let Err(err) = graph.set_field(id, field, value) {
        tracing::warn!("dropped field '{field}' on {id}: {err}");
        let reason = match &err {
            crate::graph::GraphError::InvalidField { source, .. } => source.to_string(),
            other => other.to_string(),
        };
        graph.pin(Warning::at(id, WarningKind::InvalidField { field: field.to_string(), reason }));
    }
}

#[cfg(test)]
mod proptests {
    use std::sync::Arc;

    use blocktask_types::config::LayoutDefaults;
    use proptest::prelude::*;

    use super::document::{parse_document, to_graphic_value, to_nullable_value};
    use super::wire::{graph_to_wire, wire_to_graph};
    use super::*;
    use crate::grammar::BlockTypeRegistry;
    use crate::graph::topology::is_isomorphic;
    use crate::graph::validate;
    use crate::testing::{arb_graph_plan, arb_program, arb_well_formed_program};

    fn registry() -> Arc<BlockTypeRegistry> {
        Arc::new(BlockTypeRegistry::standard())
    }

    proptest! {
        #[test]
        fn program_survives_graph_round_trip(program in arb_well_formed_program()) {
            let graph = deserialize(&program, registry(), &LayoutDefaults::default());
            prop_assert!(validate(&graph, None).is_empty());
            prop_assert_eq!(serialize(&graph), program);
        }

        #[test]
        fn zero_warning_graph_survives_program_round_trip(program in arb_well_formed_program()) {
            let graph = deserialize(&program, registry(), &LayoutDefaults::default());
            prop_assume!(validate(&graph, None).is_empty());
            let again = deserialize(&serialize(&graph), registry(), &LayoutDefaults::default());
            prop_assert!(is_isomorphic(&graph, &again));
        }

        #[test]
        fn graph_survives_wire_round_trip(program in arb_program()) {
            let graph = deserialize(&program, registry(), &LayoutDefaults::default());
            let text = serde_json::to_string(&graph_to_wire(&graph)).unwrap();
            let wire = serde_json::from_str(&text).unwrap();
            let reloaded = wire_to_graph(&wire, registry(), &LayoutDefaults::default());
            prop_assert!(is_isomorphic(&graph, &reloaded));
        }

        #[test]
        fn graphic_document_reads_back(program in arb_well_formed_program()) {
            let text = to_graphic_value(&program.clone().into()).unwrap().to_string();
            prop_assert_eq!(parse_document(&text).unwrap().program, program);
        }

        #[test]
        fn nullable_document_reads_back(program in arb_program()) {
            let text = to_nullable_value(&program.clone().into()).unwrap().to_string();
            let read = parse_document(&text).unwrap().program;
            prop_assert_eq!(
                to_nullable_value(&read.into()).unwrap(),
                to_nullable_value(&program.into()).unwrap()
            );
        }

        #[test]
        fn built_graph_without_warnings_survives_program_round_trip(plan in arb_graph_plan()) {
            let graph = plan.build(registry());
            if validate(&graph, None).is_empty() {
                let again = deserialize(&serialize(&graph), registry(), &LayoutDefaults::default());
                prop_assert!(is_isomorphic(&graph, &again));
            }
        }

        #[test]
        fn built_graph_steps_survive_graphic_document(plan in arb_graph_plan()) {
            let program = serialize(&plan.build(registry()));
            let text = to_graphic_value(&program.clone().into()).unwrap().to_string();
            let read = parse_document(&text).unwrap().program;
            let reloaded = deserialize(&read, registry(), &LayoutDefaults::default());
            prop_assert_eq!(serialize(&reloaded), program);
        }

        #[test]
        fn decoding_never_panics(program in arb_program()) {
            let graph = deserialize(&program, registry(), &LayoutDefaults::default());
            let _ = validate(&graph, None);
            let _ = serialize(&graph);
        }
    }
}
