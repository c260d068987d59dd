//! Program -> Graph.

use std::sync::Arc;

use blocktask_types::block::{BlockId, BlockKind, FieldValue, SocketName, FIELD_ID, FIELD_NAME, FIELD_TIMES};
use blocktask_types::config::LayoutDefaults;
use blocktask_types::program::{Control, ControlType, Event, EventType, Program, StepRef, Steps};
use blocktask_types::warning::{Warning, WarningKind};

use super::{link_or_pin, set_or_pin};
use crate::grammar::BlockTypeRegistry;
use crate::graph::BlockGraph;

/// Rebuild a block graph from a program.
///
/// The top-level steps form one chain; the control chain follows it when the
/// grammar allows, otherwise it starts a root of its own. Roots are placed
/// from `layout` in document order. Nothing here fails: anything the grammar
/// cannot hold is pinned to the graph as a warning.
pub fn deserialize(program: &Program, registry: Arc<BlockTypeRegistry>, layout: &LayoutDefaults) -> BlockGraph {
    let mut builder = Builder {
        graph: BlockGraph::new(registry),
    };

    let top = builder.steps(&program.steps());
    if let Some(control) = program.control.as_deref() {
        builder.control_chain(control, top.map(|(_, tail)| tail));
    }

    let mut graph = builder.graph;
    let roots = graph.roots().to_vec();
    for (index, root) in roots.into_iter().enumerate() {
        // Roots come from this graph.
        let _ = graph.set_position(root, layout.position(index));
    }
    tracing::debug!(
        "deserialized program into {} block(s), {} root(s), {} pinned warning(s)",
        graph.len(),
        graph.roots().len(),
        graph.pinned().len()
    );
    graph
}

struct Builder {
    graph: BlockGraph,
}

impl Builder {
    fn link(&mut self, parent: BlockId, socket: SocketName, child: BlockId) -> bool {
        link_or_pin(&mut self.graph, parent, socket, child)
    }

    fn kind(&self, id: BlockId) -> Option<BlockKind> {
        self.graph.get(id).map(|b| b.kind)
    }

    fn set(&mut self, id: BlockId, field: &str, value: FieldValue) {
        set_or_pin(&mut self.graph, id, field, value);
    }

    /// A library reference block, or `None` for a blank reference.
    fn reference<R: StepRef>(&mut self, kind: BlockKind, r: &R) -> Option<BlockId> {
        if r.is_blank() {
            return None;
        }
        let id = self.graph.insert_block(kind);
        if let Some(name) = r.name() {
            self.set(id, FIELD_NAME, FieldValue::from(name));
        }
        if let Some(ref_id) = r.id() {
            self.set(id, FIELD_ID, FieldValue::Int(ref_id));
        }
        Some(id)
    }

    /// A step block with its reference plugged into `socket`.
    fn step<R: StepRef>(&mut self, kind: BlockKind, socket: SocketName, ref_kind: BlockKind, r: &R) -> BlockId {
        let id = self.graph.insert_block(kind);
        if let Some(value) = self.reference(ref_kind, r) {
            self.link(id, socket, value);
        }
        id
    }

    /// Build `pick -> processing -> place` from the present steps.
    ///
    /// Returns the head and tail of the chain.
    fn steps(&mut self, steps: &Steps) -> Option<(BlockId, BlockId)> {
        let mut chain = Vec::with_capacity(3);
        if let Some(pick) = &steps.pick {
            chain.push(self.step(BlockKind::Pick, SocketName::Object, BlockKind::ObjectRef, pick));
        }
        if let Some(processing) = &steps.processing {
            chain.push(self.step(BlockKind::Processing, SocketName::Action, BlockKind::ActionRef, processing));
        }
        if let Some(place) = &steps.place {
            chain.push(self.step(BlockKind::Place, SocketName::Location, BlockKind::LocationRef, place));
        }
        for pair in chain.windows(2) {
            self.link(pair[0], SocketName::Next, pair[1]);
        }
        Some((*chain.first()?, *chain.last()?))
    }

    fn branch(&mut self, owner: BlockId, socket: SocketName, steps: &Steps) {
        if let Some((head, _)) = self.steps(steps) {
            self.link(owner, socket, head);
        }
    }

    /// Unroll the control chain into linked logic blocks.
    fn control_chain(&mut self, first: &Control, tail: Option<BlockId>) {
        let mut previous: Option<BlockId> = None;
        for control in first.iter() {
            let kind = match &control.control_type {
                Some(ControlType::Loop) => BlockKind::Loop,
                Some(ControlType::Repeat) => BlockKind::Repeat,
                Some(ControlType::When) => BlockKind::When,
                Some(ControlType::WhenOtherwise) => BlockKind::WhenOtherwise,
                Some(ControlType::Other(value)) => {
                    self.bare_chain(value, control);
                    continue;
                }
                None if is_blank(control) => continue,
                None => {
                    self.bare_chain("null", control);
                    continue;
                }
            };

            let id = self.graph.insert_block(kind);
            self.fill_logic(id, kind, control);

            match (previous, tail) {
                (Some(prev), _) => {
                    self.link(prev, SocketName::Next, id);
                }
                (None, Some(tail)) => {
                    let follows = self
                        .kind(tail)
                        .is_some_and(|t| self.graph.registry().accepts(t, SocketName::Next, kind));
                    if follows {
                        self.link(tail, SocketName::Next, id);
                    }
                }
                (None, None) => {}
            }
            previous = Some(id);
        }
    }

    /// Steps of a control the grammar cannot express, kept as a plain chain.
    fn bare_chain(&mut self, value: &str, control: &Control) {
        tracing::warn!("unknown control type '{value}', loading its steps as a plain chain");
        let head = self.steps(&control.steps()).map(|(head, _)| head);
        self.graph.pin(Warning {
            block: head,
            kind: WarningKind::UnknownControlType { value: value.to_string() },
        });
    }

    fn fill_logic(&mut self, id: BlockId, kind: BlockKind, control: &Control) {
        match kind {
            BlockKind::Repeat => self.repeat_count(id, control.times),
            BlockKind::When | BlockKind::WhenOtherwise => {
                if let Some(event) = &control.event {
                    self.event(id, event);
                }
            }
            _ => {}
        }

        self.branch(id, SocketName::Do, &control.steps());
        if kind == BlockKind::WhenOtherwise {
            if let Some(otherwise) = &control.otherwise {
                self.branch(id, SocketName::Otherwise, otherwise);
            }
        }
    }

    fn repeat_count(&mut self, id: BlockId, times: Option<i64>) {
        let Some(times) = times else {
            // Drop the registry default so the missing count stays visible.
            let _ = self.graph.clear_field(id, FIELD_TIMES);
            return;
        };
        let clamped = self
            .graph
            .registry()
            .field(BlockKind::Repeat, FIELD_TIMES)
            .and_then(|spec| spec.clamp(times))
            .unwrap_or(times);
        if clamped != times {
            tracing::warn!("repeat count {times} clamped to {clamped}");
            self.graph.pin(Warning::at(
                id,
                WarningKind::FieldClamped { field: FIELD_TIMES.to_string(), from: times, to: clamped },
            ));
        }
        self.set(id, FIELD_TIMES, FieldValue::Int(clamped));
    }

    fn event(&mut self, owner: BlockId, event: &Event) {
        let signal = match &event.event_type {
            Some(EventType::Sensor) => self.graph.insert_block(BlockKind::SensorSignal),
            Some(EventType::Human) => self.graph.insert_block(BlockKind::HumanFeedback),
            Some(EventType::FindObject) => {
                let target = event.find_object.clone().unwrap_or_default();
                self.step(BlockKind::FindObject, SocketName::Object, BlockKind::ObjectRef, &target)
            }
            Some(EventType::Other(value)) => {
                tracing::warn!("unknown event type '{value}'");
                self.graph.pin(Warning::at(
                    owner,
                    WarningKind::UnknownEventType { value: value.clone() },
                ));
                return;
            }
            None => return,
        };
        self.link(owner, SocketName::When, signal);
    }
}

fn is_blank(control: &Control) -> bool {
    control.times.is_none()
        && control.event.as_ref().is_none_or(|e| e.event_type.is_none() && e.find_object.as_ref().is_none_or(StepRef::is_blank))
        && control.otherwise.as_ref().is_none_or(|o| steps_blank(o))
        && steps_blank(&control.steps())
}

fn steps_blank(steps: &Steps) -> bool {
    steps.pick.as_ref().is_none_or(StepRef::is_blank)
        && steps.processing.as_ref().is_none_or(StepRef::is_blank)
        && steps.place.as_ref().is_none_or(StepRef::is_blank)
}

#[cfg(test)]
mod tests {
    use super::*;

    use blocktask_types::block::Position;
    use blocktask_types::program::{LocationRef, ObjectRef};

    use crate::codec::serialize;
    use crate::graph::validate;

    fn registry() -> Arc<BlockTypeRegistry> {
        Arc::new(BlockTypeRegistry::standard())
    }

    fn load(program: &Program) -> BlockGraph {
        deserialize(program, registry(), &LayoutDefaults::default())
    }

    fn object(name: &str, id: i64) -> Option<ObjectRef> {
        Some(ObjectRef { object: Some(name.into()), object_id: Some(id) })
    }

    fn location(name: &str, id: i64) -> Option<LocationRef> {
        Some(LocationRef { location: Some(name.into()), location_id: Some(id) })
    }

    fn kinds(graph: &BlockGraph, ids: &[BlockId]) -> Vec<BlockKind> {
        ids.iter().filter_map(|id| graph.get(*id)).map(|b| b.kind).collect()
    }

    #[test]
    fn test_empty_program_is_empty_graph() {
        let graph = load(&Program::default());
        assert!(graph.is_empty());
        assert!(validate(&graph, None).is_empty());
    }

    #[test]
    fn test_top_level_steps_form_one_chain() {
        let program = Program {
            pick: object("A", 1),
            place: location("B", 2),
            ..Default::default()
        };
        let graph = load(&program);
        assert_eq!(graph.roots().len(), 1);
        let head = graph.roots()[0];
        assert_eq!(kinds(&graph, &graph.chain(head)), vec![BlockKind::Pick, BlockKind::Place]);
        assert_eq!(
            graph.get(head).unwrap().position,
            Some(Position { x: 200.0, y: 100.0 })
        );
        assert_eq!(serialize(&graph), program);
    }

    #[test]
    fn test_repeat_unrolls_into_do_branch() {
        let program = Program {
            control: Some(Box::new(Control {
                control_type: Some(ControlType::Repeat),
                times: Some(3),
                pick: object("A", 1),
                place: location("B", 2),
                ..Default::default()
            })),
            ..Default::default()
        };
        let graph = load(&program);
        let repeat = graph.roots()[0];
        assert_eq!(graph.get(repeat).unwrap().kind, BlockKind::Repeat);
        assert_eq!(graph.get(repeat).unwrap().field(FIELD_TIMES), Some(&FieldValue::Int(3)));
        assert_eq!(
            kinds(&graph, &graph.branch(repeat, SocketName::Do)),
            vec![BlockKind::Pick, BlockKind::Place]
        );
        assert!(validate(&graph, None).is_empty());
        assert_eq!(serialize(&graph), program);
    }

    #[test]
    fn test_control_chain_follows_in_own_root() {
        let program = Program {
            pick: object("A", 1),
            place: location("B", 2),
            control: Some(Box::new(Control {
                control_type: Some(ControlType::Loop),
                pick: object("C", 3),
                place: location("D", 4),
                control: Some(Box::new(Control {
                    control_type: Some(ControlType::When),
                    event: Some(Event { event_type: Some(EventType::Sensor), find_object: None }),
                    pick: object("E", 5),
                    place: location("F", 6),
                    ..Default::default()
                })),
                ..Default::default()
            })),
            ..Default::default()
        };
        let graph = load(&program);
        assert_eq!(graph.roots().len(), 2);
        let logic = graph.roots()[1];
        assert_eq!(kinds(&graph, &graph.chain(logic)), vec![BlockKind::Loop, BlockKind::When]);
        assert_eq!(
            graph.get(logic).unwrap().position,
            Some(Position { x: 200.0, y: 250.0 })
        );
        assert!(validate(&graph, None).is_empty());
        assert_eq!(serialize(&graph), program);
    }

    #[test]
    fn test_when_otherwise_follows_processing() {
        let program = Program {
            pick: object("A", 1),
            processing: Some(blocktask_types::program::ActionRef {
                action: Some("drill".into()),
                action_id: Some(7),
            }),
            control: Some(Box::new(Control {
                control_type: Some(ControlType::WhenOtherwise),
                event: Some(Event {
                    event_type: Some(EventType::FindObject),
                    find_object: object("cup", 8),
                }),
                otherwise: Some(Steps { pick: None, processing: None, place: location("bin", 9) }),
                pick: object("C", 3),
                place: location("D", 4),
                ..Default::default()
            })),
            ..Default::default()
        };
        let graph = load(&program);
        assert_eq!(graph.roots().len(), 1);
        let chain = graph.chain(graph.roots()[0]);
        assert_eq!(
            kinds(&graph, &chain),
            vec![BlockKind::Pick, BlockKind::Processing, BlockKind::WhenOtherwise]
        );
        assert_eq!(serialize(&graph), program);
    }

    #[test]
    fn test_unknown_control_type_loads_bare_chain_with_warning() {
        let program = Program {
            control: Some(Box::new(Control {
                control_type: Some(ControlType::Other("PARALLEL".into())),
                pick: object("A", 1),
                place: location("B", 2),
                ..Default::default()
            })),
            ..Default::default()
        };
        let graph = load(&program);
        let head = graph.roots()[0];
        assert_eq!(kinds(&graph, &graph.chain(head)), vec![BlockKind::Pick, BlockKind::Place]);
        assert!(graph.blocks().all(|b| !b.kind.is_logic()));

        let warnings = validate(&graph, None);
        assert!(warnings.contains(&Warning::at(
            head,
            WarningKind::UnknownControlType { value: "PARALLEL".into() }
        )));
    }

    #[test]
    fn test_chat_draft_without_ids_flags_unresolved() {
        let program = Program {
            pick: Some(ObjectRef { object: Some("cup".into()), object_id: None }),
            place: location("tray", 2),
            ..Default::default()
        };
        let graph = load(&program);
        let warnings = validate(&graph, None);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message(), "Object not defined");
    }

    #[test]
    fn test_repeat_count_clamped_and_pinned() {
        let program = Program {
            control: Some(Box::new(Control {
                control_type: Some(ControlType::Repeat),
                times: Some(150),
                pick: object("A", 1),
                place: location("B", 2),
                ..Default::default()
            })),
            ..Default::default()
        };
        let graph = load(&program);
        let repeat = graph.roots()[0];
        assert_eq!(graph.get(repeat).unwrap().field(FIELD_TIMES), Some(&FieldValue::Int(99)));
        assert_eq!(
            graph.pinned(),
            &[Warning::at(
                repeat,
                WarningKind::FieldClamped { field: "times".into(), from: 150, to: 99 }
            )]
        );
    }

    #[test]
    fn test_repeat_without_count_reports_missing() {
        let program = Program {
            control: Some(Box::new(Control {
                control_type: Some(ControlType::Repeat),
                pick: object("A", 1),
                place: location("B", 2),
                ..Default::default()
            })),
            ..Default::default()
        };
        let graph = load(&program);
        let repeat = graph.roots()[0];
        assert_eq!(graph.get(repeat).unwrap().field(FIELD_TIMES), None);
        assert_eq!(
            validate(&graph, None),
            vec![Warning::at(repeat, WarningKind::MissingRepeatCount)]
        );
    }

    #[test]
    fn test_branch_without_pick_is_rejected_link() {
        let program = Program {
            control: Some(Box::new(Control {
                control_type: Some(ControlType::Loop),
                processing: Some(blocktask_types::program::ActionRef {
                    action: Some("drill".into()),
                    action_id: Some(1),
                }),
                place: location("B", 2),
                ..Default::default()
            })),
            ..Default::default()
        };
        let graph = load(&program);
        let pinned = graph.pinned();
        assert_eq!(pinned.len(), 1);
        assert_eq!(
            pinned[0].kind,
            WarningKind::RejectedLink {
                parent: BlockKind::Loop,
                socket: SocketName::Do,
                child: BlockKind::Processing,
            }
        );
        // Left detached as its own root.
        assert_eq!(graph.roots().len(), 2);
    }

    #[test]
    fn test_blank_placeholder_control_is_skipped() {
        let mut program = Program::placeholder();
        program.pick = None;
        program.processing = None;
        program.place = None;
        let graph = load(&program);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_unknown_event_type_pinned() {
        let program = Program {
            control: Some(Box::new(Control {
                control_type: Some(ControlType::When),
                event: Some(Event { event_type: Some(EventType::Other("VOICE".into())), find_object: None }),
                pick: object("A", 1),
                place: location("B", 2),
                ..Default::default()
            })),
            ..Default::default()
        };
        let graph = load(&program);
        let when = graph.roots()[0];
        let warnings = validate(&graph, None);
        assert!(warnings.contains(&Warning::at(when, WarningKind::UnknownEventType { value: "VOICE".into() })));
        assert!(warnings.contains(&Warning::at(when, WarningKind::MissingInput { socket: SocketName::When })));
    }
}
