//! Graph -> Program.

use blocktask_types::block::{BlockId, BlockKind, FieldValue, SocketName, FIELD_ID, FIELD_NAME, FIELD_TIMES};
use blocktask_types::program::{
    ActionRef, Control, ControlType, Event, EventType, LocationRef, ObjectRef, Program, StepRef, Steps,
};

use crate::graph::validate::top_level;
use crate::graph::BlockGraph;

/// Serialize a block graph into the canonical program.
///
/// Top-level roots contribute steps in document order; the first root chain
/// carrying logic blocks becomes the control chain. Within one branch only
/// the first block of each step kind is kept; the validator reports the rest.
pub fn serialize(graph: &BlockGraph) -> Program {
    let top = top_level(graph);
    let mut steps = StepSlots::default();
    let mut control = None;

    for chain in &top.chains {
        for &id in &chain.steps {
            steps.take(graph, id);
        }
        if control.is_none() && !chain.controls.is_empty() {
            control = control_chain(graph, &chain.controls);
        }
    }

    let Steps { pick, processing, place } = steps.into_steps();
    let program = Program { pick, processing, place, control };
    tracing::debug!(
        "serialized {} block(s), {} control step(s)",
        graph.len(),
        program.control.as_deref().map_or(0, |c| c.iter().count())
    );
    program
}

/// First-wins slots for one branch.
#[derive(Default)]
struct StepSlots {
    pick: Option<ObjectRef>,
    processing: Option<ActionRef>,
    place: Option<LocationRef>,
}

impl StepSlots {
    fn take(&mut self, graph: &BlockGraph, id: BlockId) {
        let Some(block) = graph.get(id) else { return };
        match block.kind {
            BlockKind::Pick => {
                if self.pick.is_none() {
                    self.pick = Some(read_ref(graph, id, SocketName::Object));
                }
            }
            BlockKind::Processing => {
                if self.processing.is_none() {
                    self.processing = Some(read_ref(graph, id, SocketName::Action));
                }
            }
            BlockKind::Place => {
                if self.place.is_none() {
                    self.place = Some(read_ref(graph, id, SocketName::Location));
                }
            }
            // Logic inside a branch has no place in the document.
            BlockKind::Loop | BlockKind::Repeat | BlockKind::When | BlockKind::WhenOtherwise => {}
            // Value blocks never sit in a statement chain.
            BlockKind::FindObject
            | BlockKind::SensorSignal
            | BlockKind::HumanFeedback
            | BlockKind::ObjectRef
            | BlockKind::LocationRef
            | BlockKind::ActionRef => {}
        }
    }

    fn into_steps(self) -> Steps {
        Steps {
            pick: self.pick,
            processing: self.processing,
            place: self.place,
        }
    }
}

fn branch_steps(graph: &BlockGraph, owner: BlockId, socket: SocketName) -> Steps {
    let mut slots = StepSlots::default();
    for id in graph.branch(owner, socket) {
        slots.take(graph, id);
    }
    slots.into_steps()
}

/// Read the reference plugged into `socket` of `owner`; blank when empty.
fn read_ref<R: StepRef>(graph: &BlockGraph, owner: BlockId, socket: SocketName) -> R {
    let Some(block) = graph.child(owner, socket).and_then(|id| graph.get(id)) else {
        return R::default();
    };
    let name = block
        .field(FIELD_NAME)
        .and_then(FieldValue::as_text)
        .map(str::to_string);
    let id = block.field(FIELD_ID).and_then(FieldValue::as_int);
    R::new(name, id)
}

fn control_type(kind: BlockKind) -> Option<ControlType> {
    match kind {
        BlockKind::Loop => Some(ControlType::Loop),
        BlockKind::Repeat => Some(ControlType::Repeat),
        BlockKind::When => Some(ControlType::When),
        BlockKind::WhenOtherwise => Some(ControlType::WhenOtherwise),
        BlockKind::Pick
        | BlockKind::Place
        | BlockKind::Processing
        | BlockKind::FindObject
        | BlockKind::SensorSignal
        | BlockKind::HumanFeedback
        | BlockKind::ObjectRef
        | BlockKind::LocationRef
        | BlockKind::ActionRef => None,
    }
}

/// Build the control chain back to front so each node owns its successor.
fn control_chain(graph: &BlockGraph, controls: &[BlockId]) -> Option<Box<Control>> {
    let mut next: Option<Box<Control>> = None;
    for &id in controls.iter().rev() {
        if let Some(mut node) = control_node(graph, id) {
            node.control = next.take();
            next = Some(Box::new(node));
        }
    }
    next
}

fn control_node(graph: &BlockGraph, id: BlockId) -> Option<Control> {
    let block = graph.get(id)?;
    let control_type = control_type(block.kind)?;
    let Steps { pick, processing, place } = branch_steps(graph, id, SocketName::Do);

    let times = match control_type {
        ControlType::Repeat => block.field(FIELD_TIMES).and_then(FieldValue::as_int),
        _ => None,
    };
    let event = match control_type {
        ControlType::When | ControlType::WhenOtherwise => Some(read_event(graph, id)),
        _ => None,
    };
    let otherwise = match control_type {
        ControlType::WhenOtherwise => Some(branch_steps(graph, id, SocketName::Otherwise)),
        _ => None,
    };

    Some(Control {
        control_type: Some(control_type),
        times,
        event,
        otherwise,
        pick,
        processing,
        place,
        control: None,
    })
}

fn read_event(graph: &BlockGraph, owner: BlockId) -> Event {
    let Some(child) = graph.child(owner, SocketName::When).and_then(|id| graph.get(id)) else {
        return Event::default();
    };
    match child.kind {
        BlockKind::SensorSignal => Event {
            event_type: Some(EventType::Sensor),
            find_object: None,
        },
        BlockKind::HumanFeedback => Event {
            event_type: Some(EventType::Human),
            find_object: None,
        },
        BlockKind::FindObject => Event {
            event_type: Some(EventType::FindObject),
            find_object: graph
                .child(child.id, SocketName::Object)
                .map(|_| read_ref(graph, child.id, SocketName::Object)),
        },
        BlockKind::Pick
        | BlockKind::Place
        | BlockKind::Processing
        | BlockKind::Loop
        | BlockKind::Repeat
        | BlockKind::When
        | BlockKind::WhenOtherwise
        | BlockKind::ObjectRef
        | BlockKind::LocationRef
        | BlockKind::ActionRef => Event::default(),
    }
}
