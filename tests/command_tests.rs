//! Command tests: each command's effect, its no-op cases, and that undo
//! restores the exact prior score.

use pretty_assertions::assert_eq;
use scorekit::commands::{
    can_add_event, can_modify_duration, can_toggle_dot, Command, TransposeMode,
};
use scorekit::duration::{capacity, total_quants};
use scorekit::{
    Accidental, Clef, DurationKind::*, Event, KeySignature, NoteRef, Score, TimeSignature,
};

fn score_with(events: Vec<Event>) -> Score {
    let mut score = Score::new("Test", TimeSignature::COMMON, KeySignature::default());
    score.measure_mut(0, 0).unwrap().events = events;
    score
}

fn events(score: &Score) -> &[Event] {
    &score.measure(0, 0).unwrap().events
}

/// Execute, then undo, and check the round trip lands on the input.
fn assert_undo_restores(command: &Command, score: &Score) -> Score {
    let outcome = command.execute(score);
    assert!(!outcome.is_unchanged(), "{} should change the score", command.name());
    let restored = command.undo(&outcome.score, &outcome.undo);
    assert_eq!(&restored, score, "undo of {} must restore the score", command.name());
    outcome.score
}

#[test]
fn add_event_appends_and_inserts() {
    let first = Event::note(Quarter, "C4");
    let score = score_with(vec![first.clone()]);

    let appended = Event::note(Quarter, "E4");
    let next = assert_undo_restores(&Command::add_event(0, 0, None, appended.clone()), &score);
    assert_eq!(events(&next)[1].id, appended.id);

    let inserted = Event::note(Quarter, "D4");
    let next = assert_undo_restores(&Command::add_event(0, 0, Some(0), inserted.clone()), &next);
    let ids: Vec<&str> = events(&next).iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec![inserted.id.as_str(), first.id.as_str(), appended.id.as_str()]);
}

#[test]
fn add_event_never_lands_inside_a_tuplet() {
    let trio: Vec<Event> = (0..3).map(|_| Event::note(Eighth, "G4")).collect();
    let score = score_with(trio.clone());
    let score = Command::apply_tuplet(0, 0, &trio[0].id, [3, 2]).execute(&score).score;

    let extra = Event::note(Quarter, "C5");
    let next = Command::add_event(0, 0, Some(1), extra.clone()).execute(&score).score;
    assert_eq!(events(&next)[3].id, extra.id, "insertion moves past the group");
}

#[test]
fn untouched_measures_stay_shared() {
    let mut score = score_with(vec![Event::note(Quarter, "C4")]);
    score = Command::add_measure(None).execute(&score).score;

    let next = Command::add_event(0, 0, None, Event::note(Quarter, "D4")).execute(&score).score;
    assert!(std::sync::Arc::ptr_eq(&score.staves[0].measures[1], &next.staves[0].measures[1]));
    assert!(!std::sync::Arc::ptr_eq(&score.staves[0].measures[0], &next.staves[0].measures[0]));
}

#[test]
fn index_miss_is_a_no_op() {
    let score = score_with(vec![Event::note(Quarter, "C4")]);
    let commands = [
        Command::DeleteEvent { staff: 0, measure: 0, event_id: "missing".into() },
        Command::DeleteEvent { staff: 3, measure: 0, event_id: "missing".into() },
        Command::add_note(0, 7, "missing", "E4"),
        Command::RemoveTuplet { staff: 0, measure: 0, event_id: "missing".into() },
    ];
    for command in &commands {
        let outcome = command.execute(&score);
        assert!(outcome.is_unchanged(), "{} should be a no-op", command.name());
        assert_eq!(outcome.score, score);
    }
}

#[test]
fn chord_notes_add_and_remove() {
    let event = Event::note(Quarter, "C4");
    let event_id = event.id.clone();
    let score = score_with(vec![event]);

    let next = assert_undo_restores(&Command::add_note(0, 0, &event_id, "E4"), &score);
    assert!(events(&next)[0].is_chord());

    // Same pitch twice is refused.
    assert!(Command::add_note(0, 0, &event_id, "E4").execute(&next).is_unchanged());

    let e4 = events(&next)[0].notes[1].id.clone();
    let next = assert_undo_restores(
        &Command::DeleteNote { staff: 0, measure: 0, event_id: event_id.clone(), note_id: e4 },
        &next,
    );
    assert_eq!(events(&next)[0].notes.len(), 1);
}

#[test]
fn deleting_the_last_note_deletes_the_event() {
    let event = Event::note(Quarter, "C4");
    let (event_id, note_id) = (event.id.clone(), event.notes[0].id.clone());
    let score = score_with(vec![event]);

    let delete = Command::DeleteNote {
        staff: 0,
        measure: 0,
        event_id,
        note_id,
    };
    let next = assert_undo_restores(&delete, &score);
    assert!(events(&next).is_empty());
}

#[test]
fn pitch_and_notation_edits_undo() {
    let event = Event::note(Quarter, "C4");
    let (event_id, note_id) = (event.id.clone(), event.notes[0].id.clone());
    let score = score_with(vec![event]);

    let change = Command::ChangePitch {
        staff: 0,
        measure: 0,
        event_id: event_id.clone(),
        note_id: note_id.clone(),
        pitch: "F#4".into(),
    };
    let next = assert_undo_restores(&change, &score);
    assert_eq!(events(&next)[0].notes[0].pitch.as_deref(), Some("F#4"));

    let bad = Command::ChangePitch {
        staff: 0,
        measure: 0,
        event_id: event_id.clone(),
        note_id: note_id.clone(),
        pitch: "H9".into(),
    };
    assert!(bad.execute(&score).is_unchanged());

    let tie = Command::ToggleTie {
        staff: 0,
        measure: 0,
        event_id: event_id.clone(),
        note_id: note_id.clone(),
    };
    assert!(events(&assert_undo_restores(&tie, &score))[0].notes[0].tied);

    let acc = Command::SetAccidental {
        staff: 0,
        measure: 0,
        event_id: event_id.clone(),
        note_id,
        accidental: Some(Accidental::Natural),
    };
    assert_undo_restores(&acc, &score);

    let dur = Command::SetDuration {
        staff: 0,
        measure: 0,
        event_id: event_id.clone(),
        duration: Half,
    };
    assert_eq!(events(&assert_undo_restores(&dur, &score))[0].duration, Half);

    let dot = Command::ToggleDot { staff: 0, measure: 0, event_id };
    assert!(events(&assert_undo_restores(&dot, &score))[0].dotted);
}

#[test]
fn toggle_rest_round_trip() {
    let event = Event::chord(Quarter, &["C4", "E4"]);
    let event_id = event.id.clone();
    let score = score_with(vec![event]);

    let to_rest = assert_undo_restores(&Command::toggle_rest(0, 0, &event_id, "G4"), &score);
    let rest = &events(&to_rest)[0];
    assert!(rest.is_rest);
    assert_eq!(rest.notes.len(), 1);
    assert_eq!(rest.notes[0].pitch, None);

    let back = assert_undo_restores(&Command::toggle_rest(0, 0, &event_id, "G4"), &to_rest);
    assert_eq!(events(&back)[0].notes[0].pitch.as_deref(), Some("G4"));
}

#[test]
fn triplet_quarters_fill_two_beats() {
    let trio: Vec<Event> = (0..3).map(|_| Event::note(Quarter, "A4")).collect();
    let score = score_with(trio.clone());

    let next = assert_undo_restores(&Command::apply_tuplet(0, 0, &trio[0].id, [3, 2]), &score);
    let quants: Vec<u32> = events(&next).iter().map(scorekit::duration::event_quants).collect();
    assert_eq!(quants, vec![10, 11, 11]);
    assert_eq!(total_quants(events(&next)), 32);

    let positions: Vec<u32> = events(&next)
        .iter()
        .map(|e| e.tuplet.as_ref().unwrap().position)
        .collect();
    assert_eq!(positions, vec![0, 1, 2]);

    // Not enough events left for a second group.
    assert!(Command::apply_tuplet(0, 0, &trio[1].id, [3, 2]).execute(&next).is_unchanged());

    let removed = assert_undo_restores(
        &Command::RemoveTuplet { staff: 0, measure: 0, event_id: trio[2].id.clone() },
        &next,
    );
    assert!(events(&removed).iter().all(|e| e.tuplet.is_none()));
}

#[test]
fn deleting_a_tuplet_member_dissolves_the_group() {
    let trio: Vec<Event> = (0..3).map(|_| Event::note(Eighth, "A4")).collect();
    let score = score_with(trio.clone());
    let score = Command::apply_tuplet(0, 0, &trio[0].id, [3, 2]).execute(&score).score;

    let next = assert_undo_restores(
        &Command::DeleteEvent { staff: 0, measure: 0, event_id: trio[0].id.clone() },
        &score,
    );
    assert_eq!(events(&next).len(), 2);
    assert!(events(&next).iter().all(|e| e.tuplet.is_none()));
    assert!(next.validate().is_ok());
}

#[test]
fn transpose_diatonic_and_chromatic() {
    let event = Event::chord(Quarter, &["C4", "E4"]);
    let refs: Vec<NoteRef> = event
        .notes
        .iter()
        .map(|n| NoteRef {
            staff_index: 0,
            measure_index: 0,
            event_id: event.id.clone(),
            note_id: n.id.clone(),
        })
        .collect();
    let score = score_with(vec![event]);

    let up_a_step = Command::Transpose {
        notes: refs.clone(),
        steps: 1,
        mode: TransposeMode::Diatonic,
    };
    let next = assert_undo_restores(&up_a_step, &score);
    let pitches: Vec<&str> = events(&next)[0]
        .notes
        .iter()
        .filter_map(|n| n.pitch.as_deref())
        .collect();
    assert_eq!(pitches, vec!["D4", "F4"]);

    let up_a_semitone = Command::Transpose {
        notes: refs,
        steps: 1,
        mode: TransposeMode::Chromatic,
    };
    let next = assert_undo_restores(&up_a_semitone, &score);
    let pitches: Vec<&str> = events(&next)[0]
        .notes
        .iter()
        .filter_map(|n| n.pitch.as_deref())
        .collect();
    assert_eq!(pitches, vec!["C#4", "F4"]);
}

#[test]
fn measure_commands_keep_staves_aligned() {
    let score = Score::grand_staff("Duet", TimeSignature::COMMON, KeySignature::default());

    let added = assert_undo_restores(&Command::add_measure(Some(0)), &score);
    assert_eq!(added.staves[0].measures.len(), 2);
    assert_eq!(added.staves[1].measures.len(), 2);
    assert!(added.validate().is_ok());

    let deleted = assert_undo_restores(&Command::DeleteMeasure { index: 1 }, &added);
    assert_eq!(deleted.measure_count(), 1);

    // The only measure is never deleted.
    assert!(Command::DeleteMeasure { index: 0 }.execute(&score).is_unchanged());
}

#[test]
fn pickup_toggles_on_every_staff() {
    let score = Score::grand_staff("Duet", TimeSignature::COMMON, KeySignature::default());
    let next = assert_undo_restores(&Command::TogglePickup, &score);
    assert!(next.staves.iter().all(|s| s.measures[0].is_pickup));
}

#[test]
fn grand_staff_merges_and_splits() {
    let mut score = score_with(vec![Event::note(Quarter, "C4")]);
    score = Command::add_measure(None).execute(&score).score;

    let merged = assert_undo_restores(&Command::toggle_grand_staff(), &score);
    assert_eq!(merged.staves.len(), 2);
    assert_eq!(merged.staves[1].clef, Clef::Bass);
    assert_eq!(merged.staves[1].measures.len(), 2);
    assert!(merged.validate().is_ok());

    let split = assert_undo_restores(&Command::toggle_grand_staff(), &merged);
    assert_eq!(split.staves.len(), 1);
}

#[test]
fn score_attributes() {
    let score = score_with(vec![Event::note(Quarter, "F4")]);

    let change_key = Command::ChangeKeySignature {
        key_signature: KeySignature::new(-1),
    };
    let key = assert_undo_restores(&change_key, &score);
    assert_eq!(key.key_signature, KeySignature::new(-1));
    assert_eq!(key.staves[0].key_signature, KeySignature::new(-1));

    let clef = assert_undo_restores(&Command::SetClef { staff: 0, clef: Clef::Alto }, &score);
    assert_eq!(clef.staves[0].clef, Clef::Alto);

    assert_undo_restores(&Command::SetTitle { title: "Renamed".into() }, &score);
    assert_undo_restores(&Command::SetTempo { bpm: 90 }, &score);
    assert!(Command::SetTempo { bpm: 120 }.execute(&score).is_unchanged());
}

#[test]
fn capacity_guards() {
    let cap = capacity(&TimeSignature::COMMON);
    let three: Vec<Event> = (0..3).map(|_| Event::note(Quarter, "C4")).collect();

    assert!(can_add_event(&three, Quarter, false, cap));
    assert!(!can_add_event(&three, Quarter, true, cap));
    assert!(!can_add_event(&three, Half, false, cap));

    assert!(can_modify_duration(&three, &three[0].id, Half, cap));
    assert!(!can_modify_duration(&three, &three[0].id, Whole, cap));
    assert!(!can_modify_duration(&three, "missing", Eighth, cap));

    assert!(can_toggle_dot(&three, &three[0].id, cap));
    let full: Vec<Event> = (0..4).map(|_| Event::note(Quarter, "C4")).collect();
    assert!(!can_toggle_dot(&full, &full[0].id, cap));

    let tiny = vec![Event::note(SixtyFourth, "C4")];
    assert!(!can_toggle_dot(&tiny, &tiny[0].id, cap), "a 64th is never dotted");
}

#[test]
fn commands_serialize_with_a_type_tag() {
    let command = Command::DeleteEvent { staff: 0, measure: 2, event_id: "e1".into() };
    let json = serde_json::to_value(&command).unwrap();
    assert_eq!(json["type"], "deleteEvent");
    assert_eq!(json["eventId"], "e1");

    let back: Command = serde_json::from_value(json).unwrap();
    assert_eq!(back, command);
}
