//! Engine tests: dispatch, history, redo determinism and listeners.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use scorekit::commands::Command;
use scorekit::{
    Dispatch, DurationKind::*, EngineError, Event, KeySignature, Note, NoopLogger, Score,
    ScoreEngine, TimeSignature,
};

fn engine() -> ScoreEngine {
    let score = Score::new("Test", TimeSignature::COMMON, KeySignature::default());
    ScoreEngine::with_logger(score, NoopLogger)
}

#[test]
fn dispatch_undo_redo() {
    let mut engine = engine();
    let original = engine.state().clone();

    let event = Event::note(Quarter, "C4");
    assert_eq!(engine.dispatch(Command::add_event(0, 0, None, event.clone())), Dispatch::Applied);
    let edited = engine.state().clone();
    assert_eq!(edited.measure(0, 0).unwrap().events, vec![event]);
    assert!(engine.can_undo());
    assert!(!engine.can_redo());

    assert!(engine.undo());
    assert_eq!(engine.state(), &original);
    assert!(engine.can_redo());

    assert!(engine.redo());
    assert_eq!(engine.state(), &edited);
    assert!(!engine.redo(), "redo stack is empty");
}

#[test]
fn no_ops_stay_off_the_history() {
    let mut engine = engine();
    let outcome = engine.dispatch(Command::DeleteEvent {
        staff: 0,
        measure: 0,
        event_id: "missing".into(),
    });
    assert_eq!(outcome, Dispatch::Unchanged);
    assert_eq!(engine.history_len(), 0);
    assert!(!engine.undo());
}

#[test]
fn invalid_results_are_rejected() {
    let mut engine = engine();
    let before = engine.state().clone();

    // A rest holding a pitched note breaks the event invariant.
    let mut bad = Event::rest(Quarter, false);
    bad.notes = vec![Note::new("C4")];
    let outcome = engine.dispatch(Command::add_event(0, 0, None, bad));

    assert!(matches!(outcome, Dispatch::Rejected(EngineError::InvalidEvent { .. })), "{outcome:?}");
    assert_eq!(engine.state(), &before);
    assert_eq!(engine.history_len(), 0);
}

#[test]
fn new_dispatch_clears_redo() {
    let mut engine = engine();
    engine.dispatch(Command::add_event(0, 0, None, Event::note(Quarter, "C4")));
    engine.undo();
    assert!(engine.can_redo());

    engine.dispatch(Command::add_event(0, 0, None, Event::note(Quarter, "D4")));
    assert!(!engine.can_redo());
}

#[test]
fn redo_reproduces_generated_ids() {
    let mut engine = engine();
    for pitch in ["C4", "D4", "E4", "F4", "G4"] {
        engine.dispatch(Command::add_event(0, 0, None, Event::note(Half, pitch)));
    }
    engine.dispatch(Command::change_time_signature(TimeSignature::new(3, 4).unwrap()));
    let reflowed = engine.state().clone();

    engine.undo();
    engine.redo();
    assert_eq!(engine.state(), &reflowed, "redo must rebuild identical ids");

    engine.dispatch(Command::add_measure(None));
    engine.dispatch(Command::toggle_grand_staff());
    let grand = engine.state().clone();
    engine.undo();
    engine.undo();
    engine.redo();
    engine.redo();
    assert_eq!(engine.state(), &grand);
}

#[test]
fn undo_walks_back_to_the_start() {
    let mut engine = engine();
    let original = engine.state().clone();
    engine.dispatch(Command::SetTitle { title: "One".into() });
    engine.dispatch(Command::SetTempo { bpm: 80 });
    engine.dispatch(Command::TogglePickup);
    assert_eq!(engine.history_len(), 3);

    while engine.undo() {}
    assert_eq!(engine.state(), &original);
}

#[test]
fn listeners_see_every_change() {
    let mut engine = engine();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let id = engine.subscribe(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    engine.dispatch(Command::SetTitle { title: "Changed".into() });
    engine.dispatch(Command::SetTitle { title: "Changed".into() });
    engine.undo();
    engine.redo();
    assert_eq!(calls.load(Ordering::SeqCst), 3, "no-op dispatch does not notify");

    assert!(engine.unsubscribe(id));
    assert!(!engine.unsubscribe(id));
    engine.dispatch(Command::SetTempo { bpm: 60 });
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
