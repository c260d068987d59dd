//! Document surface variants.
//!
//! Reading is lenient: JSON or YAML, wrapped in `{ "program": ... }` or bare,
//! with unset leaves omitted or null. Writing picks one variant explicitly.

use blocktask_types::program::{Control, Event, Program, Steps, TaskDocument};
use serde_json::{Map, Value};

use super::CodecError;

/// Serialize with every unset leaf omitted (the editor's variant).
pub fn to_graphic_value(document: &TaskDocument) -> Result<Value, CodecError> {
    let mut program = serde_json::to_value(&document.program)?;
    prune(&mut program);
    let mut root = Map::new();
    root.insert("program".to_string(), program);
    Ok(Value::Object(root))
}

/// Serialize with every leaf present, unset ones as `null` (the chat variant).
pub fn to_nullable_value(document: &TaskDocument) -> Result<Value, CodecError> {
    let mut program = document.program.clone();
    fill_program(&mut program);
    Ok(serde_json::to_value(TaskDocument { program })?)
}

/// Parse a document from JSON or YAML text.
///
/// A top-level `program` key marks the wrapped form; anything else is read as
/// a bare program.
pub fn parse_document(text: &str) -> Result<TaskDocument, CodecError> {
    from_value(parse_value(text)?)
}

/// Parse JSON or YAML text into a generic value.
///
/// Text that opens with `{` is JSON and its syntax errors are reported as
/// such; anything else that is not JSON is retried as YAML.
pub fn parse_value(text: &str) -> Result<Value, CodecError> {
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(json_err) if text.trim_start().starts_with('{') => Err(json_err.into()),
        Err(_) => Ok(serde_yaml_ng::from_str(text)?),
    }
}

/// Read an already parsed document value.
pub fn from_value(value: Value) -> Result<TaskDocument, CodecError> {
    let wrapped = value.as_object().is_some_and(|o| o.contains_key("program"));
    if wrapped {
        Ok(serde_json::from_value(value)?)
    } else if value.is_null() {
        Ok(TaskDocument::default())
    } else {
        Ok(TaskDocument::from(serde_json::from_value::<Program>(value)?))
    }
}

/// Records that stand for a block on the canvas even with no reference set.
const STEP_KEYS: [&str; 4] = ["pick", "processing", "place", "find_object"];

/// Drop nulls, and containers left empty by dropping them. A step record is
/// kept as `{}` so the step block survives a reload.
fn prune(value: &mut Value) {
    if let Value::Object(map) = value {
        for child in map.values_mut() {
            prune(child);
        }
        map.retain(|key, v| {
            let empty = v.as_object().is_some_and(Map::is_empty);
            !v.is_null() && (!empty || STEP_KEYS.contains(&key.as_str()))
        });
    }
}

fn fill_steps(steps: &mut Steps) {
    steps.pick.get_or_insert_default();
    steps.processing.get_or_insert_default();
    steps.place.get_or_insert_default();
}

fn fill_control(control: &mut Control) {
    control.pick.get_or_insert_default();
    control.processing.get_or_insert_default();
    control.place.get_or_insert_default();
    let event = control.event.get_or_insert_with(Event::default);
    event.find_object.get_or_insert_default();
    fill_steps(control.otherwise.get_or_insert_default());
    if let Some(next) = control.control.as_deref_mut() {
        fill_control(next);
    }
}

fn fill_program(program: &mut Program) {
    program.pick.get_or_insert_default();
    program.processing.get_or_insert_default();
    program.place.get_or_insert_default();
    fill_control(program.control.get_or_insert_default());
}
