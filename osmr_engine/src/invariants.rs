/// OSMR: Invariant Checks
///
/// Run after every applied step and once more at program exit.
/// Returns the first failure as `ResolveError::InvariantViolation`.
///
/// Identities of trivial classes are skipped: their lifecycle events are
/// not recorded.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{EventKind, ObjectId, ObjectState, SimState};
use crate::error::{ResolveError, Result};
use crate::state::Catalog;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Checks that hold after every step.
pub fn validate_invariants(catalog: &Catalog, state: &SimState) -> Result<()> {
    let observed = observed_ids(catalog, state);
    check_constructed_before_use(state, &observed)?;
    check_single_destruct(state, &observed)?;
    check_nothing_after_destruct(state, &observed)?;
    check_state_matches_trace(state, &observed)?;
    Ok(())
}

/// Checks that hold once every scope is closed.
pub fn validate_exit(catalog: &Catalog, state: &SimState) -> Result<()> {
    validate_invariants(catalog, state)?;
    check_no_open_scopes(state)?;
    check_all_destroyed(state)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Individual checks (private)
// ---------------------------------------------------------------------------

fn observed_ids(catalog: &Catalog, state: &SimState) -> BTreeSet<ObjectId> {
    state
        .objects
        .values()
        .filter(|r| {
            catalog
                .classes
                .get(&r.class)
                .is_some_and(|table| !table.trivial)
        })
        .map(|r| r.id)
        .collect()
}

fn violation(tag: &str, message: String) -> ResolveError {
    ResolveError::InvariantViolation(format!("[INVARIANT:{}] {}", tag, message))
}

/// INV-1: An identity's first event is one of its constructions.
fn check_constructed_before_use(state: &SimState, observed: &BTreeSet<ObjectId>) -> Result<()> {
    let mut constructed: BTreeSet<ObjectId> = BTreeSet::new();
    for event in &state.trace {
        if let Some(source) = event.source {
            if observed.contains(&source) && !constructed.contains(&source) {
                return Err(violation(
                    "construct_first",
                    format!("{} used as a source before construction", source),
                ));
            }
        }
        if !observed.contains(&event.object) {
            continue;
        }
        match event.kind {
            EventKind::Construct | EventKind::CopyConstruct | EventKind::MoveConstruct => {
                if !constructed.insert(event.object) {
                    return Err(violation(
                        "construct_first",
                        format!("{}{} constructed twice", event.class, event.object),
                    ));
                }
            }
            _ if !constructed.contains(&event.object) => {
                return Err(violation(
                    "construct_first",
                    format!(
                        "{} before construction of {}{}",
                        event.kind, event.class, event.object
                    ),
                ));
            }
            _ => {}
        }
    }
    Ok(())
}

/// INV-2: No identity is destructed twice.
fn check_single_destruct(state: &SimState, observed: &BTreeSet<ObjectId>) -> Result<()> {
    let mut destructs: BTreeMap<ObjectId, usize> = BTreeMap::new();
    for event in state.trace.iter().filter(|e| e.kind == EventKind::Destruct) {
        let n = destructs.entry(event.object).or_insert(0);
        *n += 1;
        if *n > 1 && observed.contains(&event.object) {
            return Err(violation(
                "single_destruct",
                format!("{}{} destructed {} times", event.class, event.object, n),
            ));
        }
    }
    Ok(())
}

/// INV-3: Nothing names an identity after its destruct event.
fn check_nothing_after_destruct(state: &SimState, observed: &BTreeSet<ObjectId>) -> Result<()> {
    let mut destroyed: BTreeSet<ObjectId> = BTreeSet::new();
    for event in &state.trace {
        let named = [Some(event.object), event.source];
        for id in named.into_iter().flatten() {
            if observed.contains(&id) && destroyed.contains(&id) {
                return Err(violation(
                    "after_destruct",
                    format!("{} names {} after its destruction", event.kind, id),
                ));
            }
        }
        if event.kind == EventKind::Destruct {
            destroyed.insert(event.object);
        }
    }
    Ok(())
}

/// INV-4: The object table agrees with the trace.
fn check_state_matches_trace(state: &SimState, observed: &BTreeSet<ObjectId>) -> Result<()> {
    let destructed: BTreeSet<ObjectId> = state
        .trace
        .iter()
        .filter(|e| e.kind == EventKind::Destruct)
        .map(|e| e.object)
        .collect();

    for id in observed {
        let Some(record) = state.objects.get(id) else {
            continue;
        };
        let is_destroyed = record.state == ObjectState::Destroyed;
        if is_destroyed != destructed.contains(id) {
            return Err(violation(
                "state_trace",
                format!(
                    "{}{} is {:?} but its destruct event is {}",
                    record.class,
                    id,
                    record.state,
                    if destructed.contains(id) { "present" } else { "missing" }
                ),
            ));
        }
        if record.state == ObjectState::Uninitialized {
            return Err(violation(
                "state_trace",
                format!("{}{} was allocated but never constructed", record.class, id),
            ));
        }
    }
    Ok(())
}

/// INV-5: Program exit closes the program scope.
fn check_no_open_scopes(state: &SimState) -> Result<()> {
    if !state.scopes.is_empty() {
        return Err(violation(
            "open_scope",
            format!("{} scope(s) still open at exit", state.scopes.len()),
        ));
    }
    Ok(())
}

/// INV-6: Every constructed identity is destroyed before exit.
fn check_all_destroyed(state: &SimState) -> Result<()> {
    for record in state.objects.values() {
        if record.state != ObjectState::Destroyed {
            return Err(violation(
                "leak",
                format!("{}{} is {:?} at exit", record.class, record.id, record.state),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ObjectRecord, TraceEvent};
    use crate::members::ClassDescriptor;
    use crate::program::Program;
    use crate::state::build_catalog;

    fn catalog() -> Catalog {
        build_catalog(&Program {
            classes: vec![ClassDescriptor::new("Wd")],
            ..Default::default()
        })
        .unwrap()
    }

    fn event(kind: EventKind, id: u64) -> TraceEvent {
        TraceEvent {
            kind,
            object: ObjectId(id),
            class: "Wd".to_string(),
            source: None,
            callee: None,
        }
    }

    fn state_with(trace: Vec<TraceEvent>, object_state: ObjectState) -> SimState {
        let mut s = SimState::default();
        s.objects.insert(
            ObjectId(1),
            ObjectRecord {
                id: ObjectId(1),
                class: "Wd".to_string(),
                state: object_state,
            },
        );
        s.trace = trace;
        s
    }

    #[test]
    fn test_consistent_state_passes() {
        let s = state_with(
            vec![event(EventKind::Construct, 1), event(EventKind::Destruct, 1)],
            ObjectState::Destroyed,
        );
        assert!(validate_invariants(&catalog(), &s).is_ok());
    }

    #[test]
    fn test_double_destruct_detected() {
        let s = state_with(
            vec![
                event(EventKind::Construct, 1),
                event(EventKind::Destruct, 1),
                event(EventKind::Destruct, 1),
            ],
            ObjectState::Destroyed,
        );
        let err = validate_invariants(&catalog(), &s).unwrap_err();
        assert!(err.to_string().contains("[INVARIANT:single_destruct]"), "{}", err);
    }

    #[test]
    fn test_event_before_construct_detected() {
        let s = state_with(vec![event(EventKind::Destruct, 1)], ObjectState::Destroyed);
        let err = validate_invariants(&catalog(), &s).unwrap_err();
        assert!(err.to_string().contains("[INVARIANT:construct_first]"), "{}", err);
    }

    #[test]
    fn test_missing_destruct_event_detected() {
        let s = state_with(vec![event(EventKind::Construct, 1)], ObjectState::Destroyed);
        let err = validate_invariants(&catalog(), &s).unwrap_err();
        assert!(err.to_string().contains("[INVARIANT:state_trace]"), "{}", err);
    }

    #[test]
    fn test_leak_detected_at_exit() {
        let mut s = state_with(vec![event(EventKind::Construct, 1)], ObjectState::Live);
        s.scopes.clear();
        let err = validate_exit(&catalog(), &s).unwrap_err();
        assert!(err.to_string().contains("[INVARIANT:leak]"), "{}", err);
    }

    #[test]
    fn test_open_scope_detected_at_exit() {
        let s = SimState::default();
        let err = validate_exit(&catalog(), &s).unwrap_err();
        assert_eq!(err.code(), "InvariantViolation");
    }
}
