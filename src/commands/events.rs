//! Event- and note-level edits inside one measure.
//!
//! Every function edits the measure in place and returns whether anything
//! changed; the caller turns `false` into a no-op.

use crate::layout::tuplets::group_containing;
use crate::model::{Accidental, DurationKind, Event, Measure, Note};
use crate::pitch::Pitch;

pub(super) fn add_event(m: &mut Measure, index: Option<usize>, event: &Event) -> bool {
    if m.event_index(&event.id).is_some() {
        return false;
    }
    let mut at = index.unwrap_or(m.events.len()).min(m.events.len());
    // Never land inside a tuplet group: move past its last member.
    if at > 0 && at < m.events.len() {
        if let Some(group) = group_containing(&m.events, at) {
            if group.start < at {
                at = group.start + group.len;
            }
        }
    }
    m.events.insert(at, event.clone());
    true
}

pub(super) fn delete_event(m: &mut Measure, event_id: &str) -> bool {
    let Some(idx) = m.event_index(event_id) else {
        return false;
    };
    remove_event_at(m, idx);
    true
}

/// Remove an event; the rest of its tuplet group, if any, is dissolved so
/// no group is left without its position-0 member or with a wrong size.
fn remove_event_at(m: &mut Measure, idx: usize) {
    if let Some(group) = group_containing(&m.events, idx) {
        for e in &mut m.events[group.start..group.start + group.len] {
            e.tuplet = None;
        }
    }
    m.events.remove(idx);
}

pub(super) fn add_note(m: &mut Measure, event_id: &str, note: &Note) -> bool {
    let Some(pitch) = note.pitch.as_deref() else {
        return false;
    };
    if pitch.parse::<Pitch>().is_err() {
        return false;
    }
    let Some(event) = m.event_mut(event_id) else {
        return false;
    };
    if event.note_index(&note.id).is_some()
        || event.notes.iter().any(|n| n.pitch.as_deref() == Some(pitch))
    {
        return false;
    }
    if event.is_rest {
        event.is_rest = false;
        event.notes.clear();
    }
    event.notes.push(note.clone());
    true
}

pub(super) fn delete_note(m: &mut Measure, event_id: &str, note_id: &str) -> bool {
    let Some(idx) = m.event_index(event_id) else {
        return false;
    };
    let Some(note_idx) = m.events[idx].note_index(note_id) else {
        return false;
    };
    if m.events[idx].notes.len() == 1 {
        remove_event_at(m, idx);
    } else {
        m.events[idx].notes.remove(note_idx);
    }
    true
}

pub(super) fn change_pitch(m: &mut Measure, event_id: &str, note_id: &str, pitch: &str) -> bool {
    if pitch.parse::<Pitch>().is_err() {
        return false;
    }
    let Some(note) = note_mut(m, event_id, note_id) else {
        return false;
    };
    match note.pitch.as_deref() {
        None => false,
        Some(current) if current == pitch => false,
        Some(_) => {
            note.pitch = Some(pitch.to_string());
            note.accidental = None;
            true
        }
    }
}

pub(super) fn set_duration(m: &mut Measure, event_id: &str, duration: DurationKind) -> bool {
    match m.event_mut(event_id) {
        Some(e) if e.duration != duration => {
            e.duration = duration;
            true
        }
        _ => false,
    }
}

pub(super) fn toggle_dot(m: &mut Measure, event_id: &str) -> bool {
    match m.event_mut(event_id) {
        Some(e) => {
            e.dotted = !e.dotted;
            true
        }
        None => false,
    }
}

pub(super) fn toggle_rest(m: &mut Measure, event_id: &str, pitch: &str, note_id: &str) -> bool {
    let Some(event) = m.event_mut(event_id) else {
        return false;
    };
    if event.is_rest {
        if pitch.parse::<Pitch>().is_err() {
            return false;
        }
        event.is_rest = false;
        event.notes = vec![Note::with_id(note_id, Some(pitch.to_string()))];
    } else {
        event.is_rest = true;
        event.notes = vec![Note::with_id(note_id, None)];
    }
    true
}

pub(super) fn toggle_tie(m: &mut Measure, event_id: &str, note_id: &str) -> bool {
    match note_mut(m, event_id, note_id) {
        Some(note) if note.pitch.is_some() => {
            note.tied = !note.tied;
            true
        }
        _ => false,
    }
}

pub(super) fn set_accidental(
    m: &mut Measure,
    event_id: &str,
    note_id: &str,
    accidental: Option<Accidental>,
) -> bool {
    match note_mut(m, event_id, note_id) {
        Some(note) if note.pitch.is_some() && note.accidental != accidental => {
            note.accidental = accidental;
            true
        }
        _ => false,
    }
}

fn note_mut<'a>(m: &'a mut Measure, event_id: &str, note_id: &str) -> Option<&'a mut Note> {
    m.event_mut(event_id)?
        .notes
        .iter_mut()
        .find(|n| n.id == note_id)
}
