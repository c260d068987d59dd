//! Canonical task program document.
//!
//! The block editor and the conversational builder both converge on
//! [`Program`]: a set of pick/processing/place steps plus an optional
//! recursive [`Control`] chain. It is the durable artifact persisted through
//! the task store and handed to the execution service.
//!
//! Two surface variants exist on the wire. The graphic variant omits unset
//! leaves; the chat variant carries every leaf as an explicit `null`. Reads
//! accept both (plus the chat aliases such as `control_pick`), so in memory a
//! leaf is simply `None` either way.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use crate::library::LibraryKind;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Flow-control kind of a [`Control`] node.
///
/// Unrecognized values are kept verbatim in [`ControlType::Other`] so a
/// document never fails to load because of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ControlType {
    Repeat,
    Loop,
    When,
    WhenOtherwise,
    Other(String),
}

impl ControlType {
    pub fn as_str(&self) -> &str {
        match self {
            ControlType::Repeat => "REPEAT",
            ControlType::Loop => "LOOP",
            ControlType::When => "WHEN",
            ControlType::WhenOtherwise => "WHEN_OTHERWISE",
            ControlType::Other(s) => s,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ControlType::Other(_))
    }
}

impl From<String> for ControlType {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "REPEAT" => ControlType::Repeat,
            "LOOP" => ControlType::Loop,
            "WHEN" => ControlType::When,
            "WHEN_OTHERWISE" | "WHENOTHERWISE" => ControlType::WhenOtherwise,
            _ => ControlType::Other(s),
        }
    }
}

impl From<ControlType> for String {
    fn from(t: ControlType) -> Self {
        match t {
            ControlType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event that guards a `WHEN` / `WHEN_OTHERWISE` control.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    Sensor,
    Human,
    FindObject,
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Sensor => "SENSOR",
            EventType::Human => "HUMAN",
            EventType::FindObject => "FIND_OBJECT",
            EventType::Other(s) => s,
        }
    }
}

impl From<String> for EventType {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "SENSOR" | "SENSOR_SIGNAL" => EventType::Sensor,
            "HUMAN" | "HUMAN_FEEDBACK" => EventType::Human,
            "FIND_OBJECT" | "FIND" => EventType::FindObject,
            _ => EventType::Other(s),
        }
    }
}

impl From<EventType> for String {
    fn from(t: EventType) -> Self {
        match t {
            EventType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Step references
// ---------------------------------------------------------------------------

/// Common view over the three library reference shapes.
pub trait StepRef: Default + Clone {
    const ENTITY: LibraryKind;

    fn new(name: Option<String>, id: Option<i64>) -> Self;
    fn name(&self) -> Option<&str>;
    fn id(&self) -> Option<i64>;

    /// True when neither the name nor the id is set.
    fn is_blank(&self) -> bool {
        self.name().is_none() && self.id().is_none()
    }
}

/// Reference to an object, used by `pick` and `find_object`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ObjectRef {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub object_id: Option<i64>,
}

/// Reference to a location, used by `place`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LocationRef {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub location_id: Option<i64>,
}

/// Reference to an action, used by `processing`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ActionRef {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub action_id: Option<i64>,
}

impl StepRef for ObjectRef {
    const ENTITY: LibraryKind = LibraryKind::Object;

    fn new(name: Option<String>, id: Option<i64>) -> Self {
        Self { object: name, object_id: id }
    }
    fn name(&self) -> Option<&str> {
        self.object.as_deref()
    }
    fn id(&self) -> Option<i64> {
        self.object_id
    }
}

impl StepRef for LocationRef {
    const ENTITY: LibraryKind = LibraryKind::Location;

    fn new(name: Option<String>, id: Option<i64>) -> Self {
        Self { location: name, location_id: id }
    }
    fn name(&self) -> Option<&str> {
        self.location.as_deref()
    }
    fn id(&self) -> Option<i64> {
        self.location_id
    }
}

impl StepRef for ActionRef {
    const ENTITY: LibraryKind = LibraryKind::Action;

    fn new(name: Option<String>, id: Option<i64>) -> Self {
        Self { action: name, action_id: id }
    }
    fn name(&self) -> Option<&str> {
        self.action.as_deref()
    }
    fn id(&self) -> Option<i64> {
        self.action_id
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// Guard of a conditional control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct Event {
    #[schemars(with = "Option<String>")]
    pub event_type: Option<EventType>,
    pub find_object: Option<ObjectRef>,
}

/// `find_object` arrives either as a reference record or, from older
/// editors, as a bare name with a sibling `find_object_id`.
#[derive(Deserialize)]
#[serde(untagged)]
enum FindObjectField {
    Name(String),
    Ref(ObjectRef),
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(default)]
    event_type: Option<EventType>,
    #[serde(default)]
    find_object: Option<FindObjectField>,
    #[serde(default)]
    find_object_id: Option<i64>,
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawEvent::deserialize(deserializer)?;
        let find_object = match raw.find_object {
            Some(FindObjectField::Ref(r)) => Some(r),
            Some(FindObjectField::Name(name)) => Some(ObjectRef {
                object: Some(name),
                object_id: raw.find_object_id,
            }),
            None => raw.find_object_id.map(|id| ObjectRef {
                object: None,
                object_id: Some(id),
            }),
        };
        Ok(Event {
            event_type: raw.event_type,
            find_object,
        })
    }
}

// ---------------------------------------------------------------------------
// Steps, Control, Program
// ---------------------------------------------------------------------------

/// A pick/processing/place triple, as held by an `otherwise` branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Steps {
    #[serde(default, alias = "otherwise_pick")]
    pub pick: Option<ObjectRef>,
    #[serde(default, alias = "otherwise_processing")]
    pub processing: Option<ActionRef>,
    #[serde(default, alias = "otherwise_place")]
    pub place: Option<LocationRef>,
}

impl Steps {
    pub fn is_empty(&self) -> bool {
        self.pick.is_none() && self.processing.is_none() && self.place.is_none()
    }
}

/// One flow-control step and the steps it wraps.
///
/// `control` is the next control step in sequence, owned by this node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Control {
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub control_type: Option<ControlType>,
    #[serde(default)]
    pub times: Option<i64>,
    #[serde(default)]
    pub event: Option<Event>,
    #[serde(default)]
    pub otherwise: Option<Steps>,
    #[serde(default, alias = "control_pick")]
    pub pick: Option<ObjectRef>,
    #[serde(default, alias = "control_processing")]
    pub processing: Option<ActionRef>,
    #[serde(default, alias = "control_place")]
    pub place: Option<LocationRef>,
    #[serde(default)]
    pub control: Option<Box<Control>>,
}

impl Control {
    /// The DO branch as a triple.
    pub fn steps(&self) -> Steps {
        Steps {
            pick: self.pick.clone(),
            processing: self.processing.clone(),
            place: self.place.clone(),
        }
    }

    /// Iterate this node and every following control step.
    pub fn iter(&self) -> ControlIter<'_> {
        ControlIter { next: Some(self) }
    }
}

pub struct ControlIter<'a> {
    next: Option<&'a Control>,
}

impl<'a> Iterator for ControlIter<'a> {
    type Item = &'a Control;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.control.as_deref();
        Some(current)
    }
}

/// The canonical task program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Program {
    #[serde(default)]
    pub pick: Option<ObjectRef>,
    #[serde(default)]
    pub processing: Option<ActionRef>,
    #[serde(default)]
    pub place: Option<LocationRef>,
    #[serde(default)]
    pub control: Option<Box<Control>>,
}

impl Program {
    /// The top-level triple.
    pub fn steps(&self) -> Steps {
        Steps {
            pick: self.pick.clone(),
            processing: self.processing.clone(),
            place: self.place.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pick.is_none() && self.processing.is_none() && self.place.is_none() && self.control.is_none()
    }

    /// The starting document of a conversation: every leaf present and null.
    pub fn placeholder() -> Self {
        Program {
            pick: Some(ObjectRef::default()),
            processing: Some(ActionRef::default()),
            place: Some(LocationRef::default()),
            control: Some(Box::new(Control {
                control_type: None,
                times: None,
                event: Some(Event {
                    event_type: None,
                    find_object: Some(ObjectRef::default()),
                }),
                otherwise: Some(Steps {
                    pick: Some(ObjectRef::default()),
                    processing: Some(ActionRef::default()),
                    place: Some(LocationRef::default()),
                }),
                pick: Some(ObjectRef::default()),
                processing: Some(ActionRef::default()),
                place: Some(LocationRef::default()),
                control: None,
            })),
        }
    }
}

/// The persisted envelope: `{ "program": { ... } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaskDocument {
    #[serde(default)]
    pub program: Program,
}

impl From<Program> for TaskDocument {
    fn from(program: Program) -> Self {
        Self { program }
    }
}
