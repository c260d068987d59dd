//! Block Type Registry.
//!
//! The grammar of the task diagram as an immutable value: every block kind,
//! the sockets it exposes, which kinds each socket accepts, and the fields it
//! carries. The graph model, the validator and the codec all take a
//! `&BlockTypeRegistry` rather than consulting shared state, so a different
//! grammar can be injected (tests do this) without touching them.

use std::collections::BTreeMap;

use blocktask_types::block::{
    BlockKind, FieldValue, SocketMode, SocketName, FIELD_ID, FIELD_NAME, FIELD_TIMES,
};
use thiserror::Error;

use BlockKind::*;

// ---------------------------------------------------------------------------
// Accepted-kind sets
// ---------------------------------------------------------------------------

const LOGIC: &[BlockKind] = &[Loop, Repeat, When, WhenOtherwise];
const BRANCH_HEAD: &[BlockKind] = &[Pick, Loop, Repeat, When, WhenOtherwise];
const BRANCH_HEAD_OR_PLACE: &[BlockKind] = &[Pick, Place, Loop, Repeat, When, WhenOtherwise];
const EVENTS: &[BlockKind] = &[FindObject, SensorSignal, HumanFeedback];
const AFTER_PICK: &[BlockKind] = &[Place, Processing];
const AFTER_PROCESSING: &[BlockKind] = &[Place, Processing, WhenOtherwise];

/// Repeat count bounds and default, as the editor's number field declares them.
pub const REPEAT_MIN: i64 = 1;
pub const REPEAT_MAX: i64 = 99;
pub const REPEAT_DEFAULT: i64 = 2;

// ---------------------------------------------------------------------------
// Specs
// ---------------------------------------------------------------------------

/// Scalar type of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
    Bounded { min: i64, max: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    /// Value given to freshly inserted blocks.
    pub default: Option<FieldValue>,
}

impl FieldSpec {
    /// Clamp an integer into this field's bounds. `None` for non-numeric fields.
    pub fn clamp(&self, value: i64) -> Option<i64> {
        match self.ty {
            FieldType::Bounded { min, max } => Some(value.clamp(min, max)),
            FieldType::Integer => Some(value),
            FieldType::Text => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SocketSpec {
    pub name: SocketName,
    pub accepts: Vec<BlockKind>,
    /// An empty required socket is reported by the validator.
    pub required: bool,
}

impl SocketSpec {
    pub fn mode(&self) -> SocketMode {
        self.name.mode()
    }
}

/// Everything the grammar says about one block kind.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSpec {
    pub kind: BlockKind,
    pub sockets: Vec<SocketSpec>,
    pub fields: Vec<FieldSpec>,
    /// May head a top-level chain.
    pub root: bool,
}

impl BlockSpec {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            sockets: Vec::new(),
            fields: Vec::new(),
            root: false,
        }
    }

    pub fn input(mut self, name: SocketName, accepts: &[BlockKind], required: bool) -> Self {
        self.sockets.push(SocketSpec {
            name,
            accepts: accepts.to_vec(),
            required,
        });
        self
    }

    pub fn field(mut self, name: &'static str, ty: FieldType, default: Option<FieldValue>) -> Self {
        self.fields.push(FieldSpec { name, ty, default });
        self
    }

    pub fn root(mut self) -> Self {
        self.root = true;
        self
    }

    fn reference(kind: BlockKind) -> Self {
        Self::new(kind)
            .field(FIELD_NAME, FieldType::Text, None)
            .field(FIELD_ID, FieldType::Integer, None)
    }
}

/// Why a field assignment was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldRejection {
    #[error("block '{kind}' has no field '{field}'")]
    Unknown { kind: BlockKind, field: String },

    #[error("field '{field}' expects {expected}")]
    WrongType { field: String, expected: &'static str },

    #[error("field '{field}' must be within {min}..={max}, got {value}")]
    OutOfRange { field: String, min: i64, max: i64, value: i64 },
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Immutable grammar table keyed by block kind.
#[derive(Debug, Clone)]
pub struct BlockTypeRegistry {
    specs: BTreeMap<BlockKind, BlockSpec>,
}

impl BlockTypeRegistry {
    /// The pick/place/process grammar.
    pub fn standard() -> Self {
        use SocketName as S;

        Self::from_specs([
            BlockSpec::new(Pick)
                .input(S::Object, &[ObjectRef], true)
                .input(S::Next, AFTER_PICK, false)
                .root(),
            BlockSpec::new(Place).input(S::Location, &[LocationRef], true),
            BlockSpec::new(Processing)
                .input(S::Action, &[ActionRef], true)
                .input(S::Next, AFTER_PROCESSING, false),
            BlockSpec::new(Loop)
                .input(S::Do, BRANCH_HEAD, false)
                .input(S::Next, LOGIC, false)
                .root(),
            BlockSpec::new(Repeat)
                .input(S::Do, BRANCH_HEAD, false)
                .input(S::Next, LOGIC, false)
                .field(
                    FIELD_TIMES,
                    FieldType::Bounded { min: REPEAT_MIN, max: REPEAT_MAX },
                    Some(FieldValue::Int(REPEAT_DEFAULT)),
                )
                .root(),
            BlockSpec::new(When)
                .input(S::When, EVENTS, true)
                .input(S::Do, BRANCH_HEAD, false)
                .input(S::Next, LOGIC, false)
                .root(),
            BlockSpec::new(WhenOtherwise)
                .input(S::When, EVENTS, true)
                .input(S::Do, BRANCH_HEAD_OR_PLACE, false)
                .input(S::Otherwise, BRANCH_HEAD_OR_PLACE, false)
                .input(S::Next, LOGIC, false)
                .root(),
            BlockSpec::new(FindObject).input(S::Object, &[ObjectRef], true),
            BlockSpec::new(SensorSignal),
            BlockSpec::new(HumanFeedback),
            BlockSpec::reference(ObjectRef),
            BlockSpec::reference(LocationRef),
            BlockSpec::reference(ActionRef),
        ])
    }

    pub fn from_specs(specs: impl IntoIterator<Item = BlockSpec>) -> Self {
        Self {
            specs: specs.into_iter().map(|s| (s.kind, s)).collect(),
        }
    }

    pub fn spec(&self, kind: BlockKind) -> Option<&BlockSpec> {
        self.specs.get(&kind)
    }

    pub fn specs(&self) -> impl Iterator<Item = &BlockSpec> {
        self.specs.values()
    }

    pub fn socket(&self, kind: BlockKind, socket: SocketName) -> Option<&SocketSpec> {
        self.spec(kind)?.sockets.iter().find(|s| s.name == socket)
    }

    /// Kinds that may be plugged into `socket` of a `kind` block.
    ///
    /// Empty when the block has no such socket.
    pub fn accepted_kinds(&self, kind: BlockKind, socket: SocketName) -> &[BlockKind] {
        self.socket(kind, socket)
            .map(|s| s.accepts.as_slice())
            .unwrap_or(&[])
    }

    pub fn accepts(&self, parent: BlockKind, socket: SocketName, child: BlockKind) -> bool {
        self.accepted_kinds(parent, socket).contains(&child)
    }

    pub fn is_root_kind(&self, kind: BlockKind) -> bool {
        self.spec(kind).is_some_and(|s| s.root)
    }

    pub fn field(&self, kind: BlockKind, name: &str) -> Option<&FieldSpec> {
        self.spec(kind)?.fields.iter().find(|f| f.name == name)
    }

    /// Default field values for a freshly inserted block.
    pub fn default_fields(&self, kind: BlockKind) -> BTreeMap<String, FieldValue> {
        self.spec(kind)
            .map(|s| {
                s.fields
                    .iter()
                    .filter_map(|f| f.default.clone().map(|v| (f.name.to_string(), v)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Check a field assignment against the declared type and bounds.
    pub fn check_field(
        &self,
        kind: BlockKind,
        name: &str,
        value: &FieldValue,
    ) -> Result<(), FieldRejection> {
        let spec = self.field(kind, name).ok_or_else(|| FieldRejection::Unknown {
            kind,
            field: name.to_string(),
        })?;

        match spec.ty {
            FieldType::Text => match value {
                FieldValue::Text(_) => Ok(()),
                _ => Err(FieldRejection::WrongType {
                    field: name.to_string(),
                    expected: "text",
                }),
            },
            FieldType::Integer => value.as_int().map(|_| ()).ok_or(FieldRejection::WrongType {
                field: name.to_string(),
                expected: "an integer",
            }),
            FieldType::Bounded { min, max } => {
                let n = value.as_int().ok_or(FieldRejection::WrongType {
                    field: name.to_string(),
                    expected: "an integer",
                })?;
                if (min..=max).contains(&n) {
                    Ok(())
                } else {
                    Err(FieldRejection::OutOfRange {
                        field: name.to_string(),
                        min,
                        max,
                        value: n,
                    })
                }
            }
        }
    }
}

impl Default for BlockTypeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
