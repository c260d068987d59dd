//! Block diagram vocabulary.
//!
//! The closed set of block kinds, their sockets, scalar field values, and the
//! serialized node tree exchanged with the block editor.

use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::library::LibraryKind;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Arena index of a block within one graph.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Block kinds
// ---------------------------------------------------------------------------

/// Every block the task grammar knows about.
///
/// Legacy editor names (`pick_block`, `object_block`, ...) are accepted on
/// read.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    #[serde(alias = "pick_block")]
    Pick,
    #[serde(alias = "place_block")]
    Place,
    #[serde(alias = "processing_block")]
    Processing,
    #[serde(alias = "loop_block")]
    Loop,
    #[serde(alias = "repeat_block")]
    Repeat,
    #[serde(alias = "when_block")]
    When,
    #[serde(alias = "when_otherwise_block")]
    WhenOtherwise,
    #[serde(alias = "find_object_block")]
    FindObject,
    #[serde(alias = "sensor_signal_block")]
    SensorSignal,
    #[serde(alias = "human_feedback_block")]
    HumanFeedback,
    #[serde(alias = "object_block")]
    ObjectRef,
    #[serde(alias = "location_block")]
    LocationRef,
    #[serde(alias = "action_block")]
    ActionRef,
}

/// Broad grouping of block kinds, mirroring the editor toolbox categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockCategory {
    Step,
    Logic,
    Event,
    Library,
}

/// The three step kinds that make up a pick/processing/place triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Pick,
    Processing,
    Place,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StepKind::Pick => "pick",
            StepKind::Processing => "processing",
            StepKind::Place => "place",
        })
    }
}

impl BlockKind {
    pub const ALL: [BlockKind; 13] = [
        BlockKind::Pick,
        BlockKind::Place,
        BlockKind::Processing,
        BlockKind::Loop,
        BlockKind::Repeat,
        BlockKind::When,
        BlockKind::WhenOtherwise,
        BlockKind::FindObject,
        BlockKind::SensorSignal,
        BlockKind::HumanFeedback,
        BlockKind::ObjectRef,
        BlockKind::LocationRef,
        BlockKind::ActionRef,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Pick => "pick",
            BlockKind::Place => "place",
            BlockKind::Processing => "processing",
            BlockKind::Loop => "loop",
            BlockKind::Repeat => "repeat",
            BlockKind::When => "when",
            BlockKind::WhenOtherwise => "when_otherwise",
            BlockKind::FindObject => "find_object",
            BlockKind::SensorSignal => "sensor_signal",
            BlockKind::HumanFeedback => "human_feedback",
            BlockKind::ObjectRef => "object_ref",
            BlockKind::LocationRef => "location_ref",
            BlockKind::ActionRef => "action_ref",
        }
    }

    pub fn category(&self) -> BlockCategory {
        match self {
            BlockKind::Pick | BlockKind::Place | BlockKind::Processing => BlockCategory::Step,
            BlockKind::Loop | BlockKind::Repeat | BlockKind::When | BlockKind::WhenOtherwise => {
                BlockCategory::Logic
            }
            BlockKind::FindObject | BlockKind::SensorSignal | BlockKind::HumanFeedback => {
                BlockCategory::Event
            }
            BlockKind::ObjectRef | BlockKind::LocationRef | BlockKind::ActionRef => {
                BlockCategory::Library
            }
        }
    }

    pub fn step_kind(&self) -> Option<StepKind> {
        match self {
            BlockKind::Pick => Some(StepKind::Pick),
            BlockKind::Processing => Some(StepKind::Processing),
            BlockKind::Place => Some(StepKind::Place),
            _ => None,
        }
    }

    pub fn is_logic(&self) -> bool {
        self.category() == BlockCategory::Logic
    }

    /// Library entity referenced by a `*_ref` block.
    pub fn entity(&self) -> Option<LibraryKind> {
        match self {
            BlockKind::ObjectRef => Some(LibraryKind::Object),
            BlockKind::LocationRef => Some(LibraryKind::Location),
            BlockKind::ActionRef => Some(LibraryKind::Action),
            _ => None,
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Sockets
// ---------------------------------------------------------------------------

/// Named connection point on a block.
///
/// `Next` is the chain continuation below a statement block.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SocketName {
    Object,
    Location,
    Action,
    When,
    Do,
    Otherwise,
    Next,
}

/// Whether a socket holds one value block or a chain of statement blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketMode {
    Value,
    Statement,
}

impl SocketName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SocketName::Object => "OBJECT",
            SocketName::Location => "LOCATION",
            SocketName::Action => "ACTION",
            SocketName::When => "WHEN",
            SocketName::Do => "DO",
            SocketName::Otherwise => "OTHERWISE",
            SocketName::Next => "NEXT",
        }
    }

    pub fn mode(&self) -> SocketMode {
        match self {
            SocketName::Object | SocketName::Location | SocketName::Action | SocketName::When => {
                SocketMode::Value
            }
            SocketName::Do | SocketName::Otherwise | SocketName::Next => SocketMode::Statement,
        }
    }
}

impl fmt::Display for SocketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

/// Field name holding a library reference's display name.
pub const FIELD_NAME: &str = "name";
/// Field name holding a library reference's resolved id.
pub const FIELD_ID: &str = "id";
/// Field name holding a repeat count.
pub const FIELD_TIMES: &str = "times";

/// Scalar stored in a block field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl FieldValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(n) => Some(*n),
            FieldValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(n) => write!(f, "{n}"),
            FieldValue::Float(x) => write!(f, "{x}"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Int(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

// ---------------------------------------------------------------------------
// Layout and wire tree
// ---------------------------------------------------------------------------

/// Editor canvas position. Presentation metadata only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Serialized block node exchanged with the block editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WireNode {
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Box<WireNode>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<SocketName, WireNode>,
}

impl WireNode {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            fields: BTreeMap::new(),
            x: None,
            y: None,
            next: None,
            inputs: BTreeMap::new(),
        }
    }
}

/// Every top-level chain of an editor workspace, in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct WireWorkspace {
    #[serde(default)]
    pub blocks: Vec<WireNode>,
}

/// Editor payloads arrive either as a whole workspace or as a single root node.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WirePayload {
    Workspace(WireWorkspace),
    Node(WireNode),
}

impl From<WirePayload> for WireWorkspace {
    fn from(payload: WirePayload) -> Self {
        match payload {
            WirePayload::Workspace(ws) => ws,
            WirePayload::Node(node) => WireWorkspace { blocks: vec![node] },
        }
    }
}
