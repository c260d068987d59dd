//! Soft validation of a block graph.
//!
//! The graph model already refuses illegal links, so everything reported here
//! is advisory: the editor keeps working and saving is still allowed. The
//! branch rules mirror what the codec does with a graph, so a graph with no
//! warnings serializes without losing anything.

use std::collections::BTreeSet;

use blocktask_types::block::{
    BlockId, BlockKind, FieldValue, SocketName, StepKind, FIELD_ID, FIELD_NAME, FIELD_TIMES,
};
use blocktask_types::warning::{Warning, WarningKind};

use super::model::BlockGraph;
use crate::library::LibraryCatalog;

/// A root chain split at its first logic block.
pub(crate) struct RootChain {
    pub steps: Vec<BlockId>,
    pub controls: Vec<BlockId>,
}

/// Root chains the codec reads, in document order, plus the roots it ignores.
pub(crate) struct TopLevel {
    pub chains: Vec<RootChain>,
    pub orphans: Vec<BlockId>,
}

/// Classify roots the same way serialization walks them.
///
/// A root counts when its head may start a program; only the first root
/// carrying logic blocks provides the control chain, later ones are orphans.
pub(crate) fn top_level(graph: &BlockGraph) -> TopLevel {
    let mut chains = Vec::new();
    let mut orphans = Vec::new();
    let mut has_control = false;

    for &head in graph.roots() {
        let Some(block) = graph.get(head) else { continue };
        if !graph.registry().is_root_kind(block.kind) {
            orphans.push(head);
            continue;
        }
        let chain = graph.chain(head);
        let split = chain
            .iter()
            .position(|id| graph.get(*id).is_some_and(|b| b.kind.is_logic()))
            .unwrap_or(chain.len());
        let (steps, controls) = chain.split_at(split);
        if !controls.is_empty() {
            if has_control {
                orphans.push(head);
                continue;
            }
            has_control = true;
        }
        chains.push(RootChain {
            steps: steps.to_vec(),
            controls: controls.to_vec(),
        });
    }
    TopLevel { chains, orphans }
}

/// Report every soft warning for `graph`.
///
/// With a catalog, reference ids are checked against it; without one only
/// missing ids are reported.
pub fn validate(graph: &BlockGraph, catalog: Option<&LibraryCatalog>) -> Vec<Warning> {
    let mut warnings: Vec<Warning> = graph.pinned().to_vec();

    for block in graph.blocks() {
        if let Some(entity) = block.kind.entity() {
            let id = block.field(FIELD_ID).and_then(FieldValue::as_int);
            let known = match (id, catalog) {
                (None, _) => false,
                (Some(id), Some(catalog)) => catalog.contains(entity, id),
                (Some(_), None) => true,
            };
            if !known {
                let name = block
                    .field(FIELD_NAME)
                    .and_then(FieldValue::as_text)
                    .map(str::to_string);
                warnings.push(Warning::at(
                    block.id,
                    WarningKind::UnresolvedReference { entity, name },
                ));
            }
        }

        if let Some(spec) = graph.registry().spec(block.kind) {
            for socket in spec.sockets.iter().filter(|s| s.required) {
                if block.input(socket.name).is_none() {
                    warnings.push(Warning::at(
                        block.id,
                        WarningKind::MissingInput { socket: socket.name },
                    ));
                }
            }
        }

        if block.kind == BlockKind::Repeat && block.field(FIELD_TIMES).is_none() {
            warnings.push(Warning::at(block.id, WarningKind::MissingRepeatCount));
        }

        if block.kind.is_logic() {
            let mut sockets = vec![SocketName::Do];
            if block.kind == BlockKind::WhenOtherwise {
                sockets.push(SocketName::Otherwise);
            }
            for socket in sockets {
                let branch = graph.branch(block.id, socket);
                check_branch(graph, Some(block.id), &branch, true, &mut warnings);
            }
        }
    }

    let top = top_level(graph);
    let top_steps: Vec<BlockId> = top
        .chains
        .iter()
        .flat_map(|c| c.steps.iter().copied())
        .collect();
    check_branch(graph, None, &top_steps, false, &mut warnings);
    for head in top.orphans {
        if let Some(block) = graph.get(head) {
            warnings.push(Warning::at(head, WarningKind::OrphanChain { head: block.kind }));
        }
    }

    tracing::debug!("validated {} block(s): {} warning(s)", graph.len(), warnings.len());
    warnings
}

/// Step rules for one branch.
///
/// `required` branches (DO/OTHERWISE) need pick and place even when empty;
/// the top level only needs them once it holds any step.
fn check_branch(
    graph: &BlockGraph,
    owner: Option<BlockId>,
    branch: &[BlockId],
    required: bool,
    warnings: &mut Vec<Warning>,
) {
    let mut seen: BTreeSet<StepKind> = BTreeSet::new();
    for &id in branch {
        let Some(block) = graph.get(id) else { continue };
        if let Some(step) = block.kind.step_kind() {
            if !seen.insert(step) {
                warnings.push(Warning::at(id, WarningKind::DuplicateStep { step }));
            }
        } else if block.kind.is_logic() && owner.is_some() {
            warnings.push(Warning::at(id, WarningKind::NestedControl));
        }
    }

    if seen.is_empty() && !required {
        return;
    }
    for step in [StepKind::Pick, StepKind::Place] {
        if !seen.contains(&step) {
            warnings.push(Warning {
                block: owner,
                kind: WarningKind::MissingStep { step },
            });
        }
    }
}
