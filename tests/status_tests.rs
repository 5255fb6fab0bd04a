// Tests for the status state machine and its observable cell

use parla_live::session::StatusCell;
use parla_live::Status;

#[test]
fn test_legal_transitions() {
    use Status::*;

    assert!(Idle.can_transition(Connecting));
    assert!(Connecting.can_transition(Listening));
    assert!(Connecting.can_transition(Error));
    assert!(Listening.can_transition(Speaking));
    assert!(Speaking.can_transition(Listening));

    // Stop reaches Idle from anywhere; any state can fail into Error.
    for state in [Idle, Connecting, Listening, Speaking, Error] {
        assert!(state.can_transition(Idle), "{state:?} -> Idle");
        assert!(state.can_transition(Error), "{state:?} -> Error");
    }
}

#[test]
fn test_illegal_transitions() {
    use Status::*;

    assert!(!Idle.can_transition(Listening));
    assert!(!Idle.can_transition(Speaking));
    assert!(!Connecting.can_transition(Speaking));
    assert!(!Listening.can_transition(Connecting));
    assert!(!Speaking.can_transition(Connecting));
    assert!(!Error.can_transition(Connecting));
    assert!(!Error.can_transition(Listening));
    assert!(!Error.can_transition(Speaking));
}

#[test]
fn test_cell_applies_legal_edges() {
    let (cell, rx) = StatusCell::new();
    assert_eq!(cell.current(), Status::Idle);

    assert!(cell.transition(Status::Connecting));
    assert!(cell.transition(Status::Listening));
    assert!(cell.transition(Status::Speaking));
    assert_eq!(*rx.borrow(), Status::Speaking);
}

#[test]
fn test_cell_rejects_illegal_edges() {
    let (cell, rx) = StatusCell::new();

    assert!(!cell.transition(Status::Speaking));
    assert_eq!(cell.current(), Status::Idle);
    assert_eq!(*rx.borrow(), Status::Idle);
}

#[test]
fn test_cell_self_transition_is_noop() {
    let (cell, _rx) = StatusCell::new();
    assert!(cell.transition(Status::Idle));
    assert_eq!(cell.current(), Status::Idle);
}

#[test]
fn test_error_is_absorbing_until_stop() {
    let (cell, _rx) = StatusCell::new();
    cell.transition(Status::Connecting);
    cell.transition(Status::Error);

    assert!(!cell.transition(Status::Listening));
    assert_eq!(cell.current(), Status::Error);

    // stop() is the way out
    assert!(cell.transition(Status::Idle));
    assert_eq!(cell.current(), Status::Idle);
}
