//! Proptest strategies over task programs and editor-built graphs.

use std::sync::Arc;

use blocktask_types::block::{BlockId, BlockKind, FieldValue, SocketName, FIELD_ID, FIELD_NAME, FIELD_TIMES};
use blocktask_types::program::{
    ActionRef, Control, ControlType, Event, EventType, LocationRef, ObjectRef, Program, Steps,
};
use proptest::prelude::*;

use crate::grammar::{BlockTypeRegistry, REPEAT_MAX, REPEAT_MIN};
use crate::graph::BlockGraph;

fn arb_name() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{0,6}"
}

fn arb_id() -> impl Strategy<Value = i64> {
    1i64..500
}

// ---------------------------------------------------------------------------
// Well-formed programs
// ---------------------------------------------------------------------------

fn resolved_object() -> impl Strategy<Value = ObjectRef> {
    (arb_name(), arb_id()).prop_map(|(n, id)| ObjectRef { object: Some(n), object_id: Some(id) })
}

fn resolved_location() -> impl Strategy<Value = LocationRef> {
    (arb_name(), arb_id()).prop_map(|(n, id)| LocationRef { location: Some(n), location_id: Some(id) })
}

fn resolved_action() -> impl Strategy<Value = ActionRef> {
    (arb_name(), arb_id()).prop_map(|(n, id)| ActionRef { action: Some(n), action_id: Some(id) })
}

/// A triple with mandatory pick and place.
fn complete_steps() -> impl Strategy<Value = Steps> {
    (resolved_object(), proptest::option::of(resolved_action()), resolved_location()).prop_map(
        |(pick, processing, place)| Steps {
            pick: Some(pick),
            processing,
            place: Some(place),
        },
    )
}

fn well_formed_control() -> impl Strategy<Value = Control> {
    let kind = prop_oneof![
        Just(ControlType::Loop),
        Just(ControlType::Repeat),
        Just(ControlType::When),
        Just(ControlType::WhenOtherwise),
    ];
    let event = prop_oneof![
        Just(Event { event_type: Some(EventType::Sensor), find_object: None }),
        Just(Event { event_type: Some(EventType::Human), find_object: None }),
        resolved_object().prop_map(|o| Event {
            event_type: Some(EventType::FindObject),
            find_object: Some(o),
        }),
    ];
    (kind, 1i64..=99, event, complete_steps(), complete_steps()).prop_map(
        |(kind, times, event, body, otherwise)| {
            let conditional = matches!(kind, ControlType::When | ControlType::WhenOtherwise);
            Control {
                times: (kind == ControlType::Repeat).then_some(times),
                event: conditional.then_some(event),
                otherwise: (kind == ControlType::WhenOtherwise).then_some(otherwise),
                control_type: Some(kind),
                pick: body.pick,
                processing: body.processing,
                place: body.place,
                control: None,
            }
        },
    )
}

fn chain(controls: Vec<Control>) -> Option<Box<Control>> {
    controls.into_iter().rev().fold(None, |next, mut control| {
        control.control = next;
        Some(Box::new(control))
    })
}

/// Programs every field of which the block grammar can represent.
pub fn arb_well_formed_program() -> impl Strategy<Value = Program> {
    (
        proptest::option::of(complete_steps()),
        proptest::collection::vec(well_formed_control(), 0..4),
    )
        .prop_map(|(top, controls)| {
            let top = top.unwrap_or_default();
            Program {
                pick: top.pick,
                processing: top.processing,
                place: top.place,
                control: chain(controls),
            }
        })
}

// ---------------------------------------------------------------------------
// Arbitrary (partial) programs
// ---------------------------------------------------------------------------

fn partial_object() -> impl Strategy<Value = Option<ObjectRef>> {
    proptest::option::of(
        (proptest::option::of(arb_name()), proptest::option::of(arb_id()))
            .prop_map(|(object, object_id)| ObjectRef { object, object_id }),
    )
}

fn partial_location() -> impl Strategy<Value = Option<LocationRef>> {
    proptest::option::of(
        (proptest::option::of(arb_name()), proptest::option::of(arb_id()))
            .prop_map(|(location, location_id)| LocationRef { location, location_id }),
    )
}

fn partial_action() -> impl Strategy<Value = Option<ActionRef>> {
    proptest::option::of(
        (proptest::option::of(arb_name()), proptest::option::of(arb_id()))
            .prop_map(|(action, action_id)| ActionRef { action, action_id }),
    )
}

fn partial_steps() -> impl Strategy<Value = Steps> {
    (partial_object(), partial_action(), partial_location())
        .prop_map(|(pick, processing, place)| Steps { pick, processing, place })
}

fn partial_control() -> impl Strategy<Value = Control> {
    let kind = proptest::option::of(prop_oneof![
        Just(ControlType::Loop),
        Just(ControlType::Repeat),
        Just(ControlType::When),
        Just(ControlType::WhenOtherwise),
        Just(ControlType::Other("PARALLEL".to_string())),
    ]);
    let event = proptest::option::of(
        (
            proptest::option::of(prop_oneof![
                Just(EventType::Sensor),
                Just(EventType::Human),
                Just(EventType::FindObject),
            ]),
            partial_object(),
        )
            .prop_map(|(event_type, find_object)| Event { event_type, find_object }),
    );
    (
        kind,
        proptest::option::of(-5i64..120),
        event,
        proptest::option::of(partial_steps()),
        partial_steps(),
    )
        .prop_map(|(control_type, times, event, otherwise, body)| Control {
            control_type,
            times,
            event,
            otherwise,
            pick: body.pick,
            processing: body.processing,
            place: body.place,
            control: None,
        })
}

/// Any program, including blank references and unset leaves anywhere.
pub fn arb_program() -> impl Strategy<Value = Program> {
    (
        partial_steps(),
        proptest::option::of(proptest::collection::vec(partial_control(), 1..4)),
    )
        .prop_map(|(top, controls)| Program {
            pick: top.pick,
            processing: top.processing,
            place: top.place,
            control: controls.and_then(chain),
        })
}

// ---------------------------------------------------------------------------
// Graphs built block by block
// ---------------------------------------------------------------------------

/// Reference block contents: a name and maybe a library id.
#[derive(Debug, Clone)]
struct RefPlan {
    name: String,
    id: Option<i64>,
}

/// A step block; `None` leaves its value socket empty.
#[derive(Debug, Clone)]
struct StepPlan {
    kind: BlockKind,
    reference: Option<RefPlan>,
}

#[derive(Debug, Clone)]
enum SignalPlan {
    Sensor,
    Human,
    Find(Option<RefPlan>),
}

#[derive(Debug, Clone)]
struct ControlPlan {
    kind: BlockKind,
    times: i64,
    signal: Option<SignalPlan>,
    body: Vec<StepPlan>,
    otherwise: Vec<StepPlan>,
}

#[derive(Debug, Clone)]
struct PlannedBlock {
    kind: BlockKind,
    fields: Vec<(&'static str, FieldValue)>,
}

/// Blocks and candidate links, indexed by position in `blocks`.
#[derive(Debug, Clone, Default)]
struct Layout {
    blocks: Vec<PlannedBlock>,
    links: Vec<(usize, SocketName, usize)>,
}

impl Layout {
    fn of(top: &[StepPlan], controls: &[ControlPlan]) -> Self {
        let mut layout = Self::default();
        layout.chain(top);
        let mut previous = None;
        for plan in controls {
            let control = layout.control(plan);
            if let Some(p) = previous {
                layout.links.push((p, SocketName::Next, control));
            }
            previous = Some(control);
        }
        layout
    }

    fn block(&mut self, kind: BlockKind, fields: Vec<(&'static str, FieldValue)>) -> usize {
        self.blocks.push(PlannedBlock { kind, fields });
        self.blocks.len() - 1
    }

    fn reference(&mut self, kind: BlockKind, plan: &RefPlan) -> usize {
        let mut fields = vec![(FIELD_NAME, FieldValue::from(plan.name.as_str()))];
        if let Some(id) = plan.id {
            fields.push((FIELD_ID, FieldValue::Int(id)));
        }
        self.block(kind, fields)
    }

    /// Lay out a NEXT chain and return its head.
    fn chain(&mut self, steps: &[StepPlan]) -> Option<usize> {
        let mut head = None;
        let mut previous = None;
        for step in steps {
            let block = self.block(step.kind, Vec::new());
            if let Some(plan) = &step.reference {
                let (kind, socket) = match step.kind {
                    BlockKind::Pick => (BlockKind::ObjectRef, SocketName::Object),
                    BlockKind::Processing => (BlockKind::ActionRef, SocketName::Action),
                    _ => (BlockKind::LocationRef, SocketName::Location),
                };
                let child = self.reference(kind, plan);
                self.links.push((block, socket, child));
            }
            match previous {
                Some(p) => self.links.push((p, SocketName::Next, block)),
                None => head = Some(block),
            }
            previous = Some(block);
        }
        head
    }

    fn control(&mut self, plan: &ControlPlan) -> usize {
        let fields = match plan.kind {
            BlockKind::Repeat => vec![(FIELD_TIMES, FieldValue::Int(plan.times))],
            _ => Vec::new(),
        };
        let control = self.block(plan.kind, fields);

        let conditional = matches!(plan.kind, BlockKind::When | BlockKind::WhenOtherwise);
        if let (true, Some(signal)) = (conditional, &plan.signal) {
            let event = match signal {
                SignalPlan::Sensor => self.block(BlockKind::SensorSignal, Vec::new()),
                SignalPlan::Human => self.block(BlockKind::HumanFeedback, Vec::new()),
                SignalPlan::Find(target) => {
                    let find = self.block(BlockKind::FindObject, Vec::new());
                    if let Some(target) = target {
                        let object = self.reference(BlockKind::ObjectRef, target);
                        self.links.push((find, SocketName::Object, object));
                    }
                    find
                }
            };
            self.links.push((control, SocketName::When, event));
        }
        if let Some(head) = self.chain(&plan.body) {
            self.links.push((control, SocketName::Do, head));
        }
        if plan.kind == BlockKind::WhenOtherwise {
            if let Some(head) = self.chain(&plan.otherwise) {
                self.links.push((control, SocketName::Otherwise, head));
            }
        }
        control
    }
}

/// A graph to assemble with `insert_block`/`connect`, in a shuffled order.
#[derive(Debug, Clone)]
pub struct GraphPlan {
    blocks: Vec<PlannedBlock>,
    links: Vec<(usize, SocketName, usize)>,
    order: Vec<usize>,
}

impl GraphPlan {
    /// Insert blocks in plan order, then make every link the grammar allows.
    /// A refused link leaves its child chain as a root of its own.
    pub fn build(&self, registry: Arc<BlockTypeRegistry>) -> BlockGraph {
        let mut graph = BlockGraph::new(registry);
        let mut ids = vec![BlockId(0); self.blocks.len()];
        for &index in &self.order {
            let planned = &self.blocks[index];
            let id = graph.insert_block(planned.kind);
            for (name, value) in &planned.fields {
                graph.set_field(id, name, value.clone()).unwrap();
            }
            ids[index] = id;
        }
        for &(parent, socket, child) in &self.links {
            let allowed = graph
                .registry()
                .accepts(self.blocks[parent].kind, socket, self.blocks[child].kind);
            if allowed {
                graph.connect(ids[parent], socket, ids[child]).unwrap();
            }
        }
        graph
    }
}

fn arb_ref_plan() -> impl Strategy<Value = Option<RefPlan>> {
    prop_oneof![
        6 => (arb_name(), arb_id()).prop_map(|(name, id)| Some(RefPlan { name, id: Some(id) })),
        1 => arb_name().prop_map(|name| Some(RefPlan { name, id: None })),
        1 => Just(None),
    ]
}

/// Steps in pick, processing, place order, any of them possibly missing.
fn arb_chain(len: std::ops::RangeInclusive<usize>) -> impl Strategy<Value = Vec<StepPlan>> {
    proptest::sample::subsequence(vec![BlockKind::Pick, BlockKind::Processing, BlockKind::Place], len)
        .prop_flat_map(|kinds| {
            kinds
                .into_iter()
                .map(|kind| arb_ref_plan().prop_map(move |reference| StepPlan { kind, reference }))
                .collect::<Vec<_>>()
        })
}

fn arb_control_plan() -> impl Strategy<Value = ControlPlan> {
    let kind = prop_oneof![
        Just(BlockKind::Loop),
        Just(BlockKind::Repeat),
        Just(BlockKind::When),
        Just(BlockKind::WhenOtherwise),
    ];
    let signal = proptest::option::weighted(
        0.85,
        prop_oneof![
            Just(SignalPlan::Sensor),
            Just(SignalPlan::Human),
            arb_ref_plan().prop_map(SignalPlan::Find),
        ],
    );
    (kind, REPEAT_MIN..=REPEAT_MAX, signal, arb_chain(0..=3), arb_chain(0..=3)).prop_map(
        |(kind, times, signal, body, otherwise)| ControlPlan { kind, times, signal, body, otherwise },
    )
}

/// Editor-shaped graphs: a top step chain and a control chain, with empty
/// value sockets, unlinked branches and any insertion order.
pub fn arb_graph_plan() -> impl Strategy<Value = GraphPlan> {
    (arb_chain(0..=3), proptest::collection::vec(arb_control_plan(), 0..3))
        .prop_map(|(top, controls)| Layout::of(&top, &controls))
        .prop_flat_map(|layout| {
            let order: Vec<usize> = (0..layout.blocks.len()).collect();
            let links = layout.links.clone();
            (Just(layout.blocks), Just(order).prop_shuffle(), Just(links).prop_shuffle())
        })
        .prop_map(|(blocks, order, links)| GraphPlan { blocks, links, order })
}
