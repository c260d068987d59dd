//! Incremental merge of conversational drafts.
//!
//! Each agent turn produces a partial program. Folding it into the running
//! document must only ever add information: a leaf the turn leaves unset
//! keeps its previous value, a leaf the turn sets overwrites it. Records
//! (`event`, `otherwise`, each step reference and every node of the control
//! chain) are merged the same way, leaf by leaf, so a turn that sends a
//! `control` record with a null `control_type` keeps the type resolved by an
//! earlier turn.

use blocktask_types::program::{Control, Event, Program, StepRef, Steps};

/// Fold `incoming` into `previous`. Pure and idempotent.
pub fn merge(previous: &Program, incoming: &Program) -> Program {
    Program {
        pick: record(&previous.pick, &incoming.pick, merge_ref),
        processing: record(&previous.processing, &incoming.processing, merge_ref),
        place: record(&previous.place, &incoming.place, merge_ref),
        control: record(&previous.control, &incoming.control, |p, i| {
            Box::new(merge_control(p, i))
        }),
    }
}

fn leaf<T: Clone>(previous: &Option<T>, incoming: &Option<T>) -> Option<T> {
    incoming.as_ref().or(previous.as_ref()).cloned()
}

fn record<T: Clone>(previous: &Option<T>, incoming: &Option<T>, f: impl FnOnce(&T, &T) -> T) -> Option<T> {
    match (previous, incoming) {
        (Some(p), Some(i)) => Some(f(p, i)),
        _ => leaf(previous, incoming),
    }
}

fn merge_ref<R: StepRef>(previous: &R, incoming: &R) -> R {
    R::new(
        incoming.name().or(previous.name()).map(str::to_string),
        incoming.id().or(previous.id()),
    )
}

fn merge_steps(previous: &Steps, incoming: &Steps) -> Steps {
    Steps {
        pick: record(&previous.pick, &incoming.pick, merge_ref),
        processing: record(&previous.processing, &incoming.processing, merge_ref),
        place: record(&previous.place, &incoming.place, merge_ref),
    }
}

fn merge_event(previous: &Event, incoming: &Event) -> Event {
    Event {
        event_type: leaf(&previous.event_type, &incoming.event_type),
        find_object: record(&previous.find_object, &incoming.find_object, merge_ref),
    }
}

fn merge_control(previous: &Control, incoming: &Control) -> Control {
    Control {
        control_type: leaf(&previous.control_type, &incoming.control_type),
        times: leaf(&previous.times, &incoming.times),
        event: record(&previous.event, &incoming.event, merge_event),
        otherwise: record(&previous.otherwise, &incoming.otherwise, merge_steps),
        pick: record(&previous.pick, &incoming.pick, merge_ref),
        processing: record(&previous.processing, &incoming.processing, merge_ref),
        place: record(&previous.place, &incoming.place, merge_ref),
        control: record(&previous.control, &incoming.control, |p, i| {
            Box::new(merge_control(p, i))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocktask_types::program::{ControlType, EventType, ObjectRef};
    use serde_json::json;

    fn program(value: serde_json::Value) -> Program {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_control_type_survives_null_turn() {
        let previous = program(json!({"control": {"control_type": "REPEAT", "times": 2}}));
        let incoming = program(json!({"control": {"control_type": null, "times": 3}}));
        let merged = merge(&previous, &incoming);
        let control = merged.control.unwrap();
        assert_eq!(control.control_type, Some(ControlType::Repeat));
        assert_eq!(control.times, Some(3));
    }

    #[test]
    fn test_later_turn_overwrites_set_leaf() {
        let previous = program(json!({"pick": {"object": "cup", "object_id": 4}}));
        let incoming = program(json!({"pick": {"object": "bolt", "object_id": null}}));
        let merged = merge(&previous, &incoming);
        assert_eq!(
            merged.pick,
            Some(ObjectRef { object: Some("bolt".into()), object_id: Some(4) })
        );
    }

    #[test]
    fn test_null_record_keeps_previous() {
        let previous = program(json!({
            "control": {
                "control_type": "WHEN",
                "event": {"event_type": "FIND_OBJECT", "find_object": {"object": "cup"}}
            }
        }));
        let incoming = program(json!({"control": {"event": null, "control_pick": {"object": "cup"}}}));
        let merged = merge(&previous, &incoming);
        let control = merged.control.unwrap();
        let event = control.event.unwrap();
        assert_eq!(event.event_type, Some(EventType::FindObject));
        assert_eq!(event.find_object.unwrap().object.as_deref(), Some("cup"));
        assert_eq!(control.pick.unwrap().object.as_deref(), Some("cup"));
    }

    #[test]
    fn test_nested_control_chain_merges_deeply() {
        let previous = program(json!({
            "control": {"control_type": "LOOP", "control": {"control_type": "WHEN"}}
        }));
        let incoming = program(json!({
            "control": {"control": {"event": {"event_type": "SENSOR"}}}
        }));
        let merged = merge(&previous, &incoming);
        let second = merged.control.unwrap().control.unwrap();
        assert_eq!(second.control_type, Some(ControlType::When));
        assert_eq!(second.event.unwrap().event_type, Some(EventType::Sensor));
    }

    #[test]
    fn test_merge_into_placeholder_fills_slots() {
        let incoming = program(json!({"place": {"location": "tray"}}));
        let merged = merge(&Program::placeholder(), &incoming);
        assert_eq!(merged.place.unwrap().location.as_deref(), Some("tray"));
        assert_eq!(merged.pick, Some(ObjectRef::default()));
        assert!(merged.control.is_some());
    }
}
