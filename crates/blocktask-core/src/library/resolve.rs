//! Fill in and refresh library references.
//!
//! Chat drafts name entities without ids; stored programs may point at items
//! that were renamed since. Both are repaired against a [`LibraryCatalog`]
//! before the program reaches the editor or the store.

use blocktask_types::program::{
    ActionRef, Control, LocationRef, ObjectRef, Program, StepRef, Steps,
};

use super::catalog::LibraryCatalog;

/// Whether a reference that already has an id should be renamed from the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    FillMissing,
    Refresh,
}

fn fix<R: StepRef>(slot: &mut Option<R>, catalog: &LibraryCatalog, mode: Mode) {
    let Some(current) = slot.as_ref() else {
        return;
    };
    let replacement = match (current.id(), current.name()) {
        (Some(id), _) if mode == Mode::Refresh => catalog
            .by_id(R::ENTITY, id)
            .map(|item| R::new(Some(item.name.clone()), Some(item.id))),
        (Some(_), _) => None,
        (None, Some(name)) => {
            let resolution = catalog.resolve_name(R::ENTITY, name);
            resolution
                .id
                .map(|id| R::new(Some(resolution.name), Some(id)))
        }
        (None, None) => None,
    };
    if let Some(r) = replacement {
        *slot = Some(r);
    }
}

fn fix_steps(
    pick: &mut Option<ObjectRef>,
    processing: &mut Option<ActionRef>,
    place: &mut Option<LocationRef>,
    catalog: &LibraryCatalog,
    mode: Mode,
) {
    fix(pick, catalog, mode);
    fix(processing, catalog, mode);
    fix(place, catalog, mode);
}

fn fix_control(control: &mut Control, catalog: &LibraryCatalog, mode: Mode) {
    fix_steps(
        &mut control.pick,
        &mut control.processing,
        &mut control.place,
        catalog,
        mode,
    );
    if let Some(event) = control.event.as_mut() {
        fix(&mut event.find_object, catalog, mode);
    }
    if let Some(Steps { pick, processing, place }) = control.otherwise.as_mut() {
        fix_steps(pick, processing, place, catalog, mode);
    }
    if let Some(next) = control.control.as_deref_mut() {
        fix_control(next, catalog, mode);
    }
}

fn apply(program: &Program, catalog: &LibraryCatalog, mode: Mode) -> Program {
    let mut out = program.clone();
    fix_steps(
        &mut out.pick,
        &mut out.processing,
        &mut out.place,
        catalog,
        mode,
    );
    if let Some(control) = out.control.as_deref_mut() {
        fix_control(control, catalog, mode);
    }
    out
}

/// Give every id-less reference the id of the library item its name matches.
pub fn resolve_program(program: &Program, catalog: &LibraryCatalog) -> Program {
    apply(program, catalog, Mode::FillMissing)
}

/// As [`resolve_program`], and additionally rename references whose id is
/// known to the library under a different name.
pub fn refresh_program(program: &Program, catalog: &LibraryCatalog) -> Program {
    apply(program, catalog, Mode::Refresh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocktask_types::library::{LibraryItem, LibraryKind};
    use blocktask_types::program::{ControlType, Event, EventType};

    fn catalog() -> LibraryCatalog {
        LibraryCatalog::new()
            .with(
                LibraryKind::Object,
                vec![LibraryItem {
                    id: 5,
                    name: "Red Cup".to_string(),
                    keywords: Some(vec!["cup".to_string()]),
                }],
            )
            .with(
                LibraryKind::Location,
                vec![LibraryItem { id: 9, name: "Tray".to_string(), keywords: None }],
            )
    }

    fn named(object: &str) -> Option<ObjectRef> {
        Some(ObjectRef { object: Some(object.to_string()), object_id: None })
    }

    #[test]
    fn test_resolve_fills_ids_everywhere() {
        let program = Program {
            pick: named("cup"),
            place: Some(LocationRef { location: Some("tray".to_string()), location_id: None }),
            control: Some(Box::new(Control {
                control_type: Some(ControlType::When),
                event: Some(Event {
                    event_type: Some(EventType::FindObject),
                    find_object: named("CUP"),
                }),
                pick: named("red cup"),
                ..Default::default()
            })),
            ..Default::default()
        };

        let resolved = resolve_program(&program, &catalog());
        assert_eq!(
            resolved.pick,
            Some(ObjectRef { object: Some("Red Cup".to_string()), object_id: Some(5) })
        );
        assert_eq!(resolved.place.unwrap().location_id, Some(9));
        let control = resolved.control.unwrap();
        assert_eq!(control.pick.unwrap().object_id, Some(5));
        assert_eq!(control.event.unwrap().find_object.unwrap().object_id, Some(5));
    }

    #[test]
    fn test_unknown_name_stays_unresolved() {
        let program = Program { pick: named("spanner"), ..Default::default() };
        let resolved = resolve_program(&program, &catalog());
        assert_eq!(resolved.pick, named("spanner"));
    }

    #[test]
    fn test_refresh_renames_by_id_but_resolve_does_not() {
        let program = Program {
            pick: Some(ObjectRef { object: Some("Old Cup".to_string()), object_id: Some(5) }),
            ..Default::default()
        };
        assert_eq!(resolve_program(&program, &catalog()), program);
        let refreshed = refresh_program(&program, &catalog());
        assert_eq!(refreshed.pick.unwrap().object.as_deref(), Some("Red Cup"));
    }
}
