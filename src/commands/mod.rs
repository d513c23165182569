//! Score-mutating commands.
//!
//! A [`Command`] is a plain value. [`Command::execute`] is a pure function
//! from one score revision to the next and returns, next to the new score,
//! an [`UndoRecord`] holding exactly the subtrees it replaced.
//! [`Command::undo`] puts those subtrees back. Nothing is stored inside the
//! command itself, so a command can be re-executed on redo.
//!
//! Commands never fail: an id or index that no longer exists makes the
//! command a no-op ([`UndoRecord::Unchanged`]). Capacity is the caller's
//! business (see [`guards`]).

mod events;
pub mod guards;
mod structure;
mod transpose;
mod tuplets;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ids::{fresh_id, IdSeed};
use crate::model::{
    Accidental, Clef, DurationKind, Event, KeySignature, Measure, Note, Score, Staff, TimeSignature,
};
use crate::selection::NoteRef;

pub use guards::{can_add_event, can_modify_duration, can_toggle_dot};

/// How [`Command::Transpose`] moves pitches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransposeMode {
    /// Scale steps within the staff's key
    Diatonic,
    /// Semitones, respelled for the staff's key
    Chromatic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    /// Insert `event` before position `index` (append when `None`).
    AddEvent {
        staff: usize,
        measure: usize,
        index: Option<usize>,
        event: Event,
    },
    DeleteEvent {
        staff: usize,
        measure: usize,
        event_id: String,
    },
    /// Add a notehead to an event (turns a rest into a note).
    AddNote {
        staff: usize,
        measure: usize,
        event_id: String,
        note: Note,
    },
    /// Remove a notehead; removing the last one deletes the event.
    DeleteNote {
        staff: usize,
        measure: usize,
        event_id: String,
        note_id: String,
    },
    ChangePitch {
        staff: usize,
        measure: usize,
        event_id: String,
        note_id: String,
        pitch: String,
    },
    SetDuration {
        staff: usize,
        measure: usize,
        event_id: String,
        duration: DurationKind,
    },
    ToggleDot {
        staff: usize,
        measure: usize,
        event_id: String,
    },
    /// Rest → single note at `pitch`, note or chord → rest. `note_id` names
    /// the notehead or placeholder created.
    ToggleRest {
        staff: usize,
        measure: usize,
        event_id: String,
        pitch: String,
        note_id: String,
    },
    ToggleTie {
        staff: usize,
        measure: usize,
        event_id: String,
        note_id: String,
    },
    SetAccidental {
        staff: usize,
        measure: usize,
        event_id: String,
        note_id: String,
        accidental: Option<Accidental>,
    },
    /// Group `ratio[0]` events starting at `event_id` under `ratio`.
    ApplyTuplet {
        staff: usize,
        measure: usize,
        event_id: String,
        ratio: [u32; 2],
        group_id: String,
    },
    /// Dissolve the whole tuplet group containing `event_id`.
    RemoveTuplet {
        staff: usize,
        measure: usize,
        event_id: String,
    },
    Transpose {
        notes: Vec<NoteRef>,
        steps: i32,
        mode: TransposeMode,
    },
    /// Change the score's meter and reflow every staff.
    ChangeTimeSignature {
        time_signature: TimeSignature,
        seed: IdSeed,
    },
    ChangeKeySignature {
        key_signature: KeySignature,
    },
    SetClef {
        staff: usize,
        clef: Clef,
    },
    /// Insert an empty measure in every staff before `index` (append when `None`).
    AddMeasure {
        index: Option<usize>,
        seed: IdSeed,
    },
    DeleteMeasure {
        index: usize,
    },
    TogglePickup,
    /// One staff → add a bass staff; several → drop the last one.
    ToggleGrandStaff {
        seed: IdSeed,
    },
    SetTitle {
        title: String,
    },
    SetTempo {
        bpm: u32,
    },
}

/// Prior version of one measure.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureSnapshot {
    pub staff: usize,
    pub measure: usize,
    pub prior: Arc<Measure>,
}

/// What a command replaced, for [`Command::undo`].
#[derive(Debug, Clone, PartialEq)]
pub enum UndoRecord {
    /// The command was a no-op.
    Unchanged,
    /// Measures edited in place.
    Measures(Vec<MeasureSnapshot>),
    /// A staff's own fields changed.
    Staff { staff: usize, prior: Arc<Staff> },
    /// Staves or measures were added, removed or reflowed. The snapshot
    /// shares every subtree with the revision it came from.
    Score(Box<Score>),
}

/// Result of [`Command::execute`].
#[derive(Debug, Clone)]
pub struct Outcome {
    pub score: Score,
    pub undo: UndoRecord,
}

impl Outcome {
    pub(crate) fn unchanged(score: &Score) -> Self {
        Outcome {
            score: score.clone(),
            undo: UndoRecord::Unchanged,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        self.undo == UndoRecord::Unchanged
    }
}

impl Command {
    pub fn add_event(staff: usize, measure: usize, index: Option<usize>, event: Event) -> Self {
        Command::AddEvent {
            staff,
            measure,
            index,
            event,
        }
    }

    pub fn add_note(staff: usize, measure: usize, event_id: &str, pitch: &str) -> Self {
        Command::AddNote {
            staff,
            measure,
            event_id: event_id.to_string(),
            note: Note::new(pitch),
        }
    }

    pub fn toggle_rest(staff: usize, measure: usize, event_id: &str, pitch: &str) -> Self {
        Command::ToggleRest {
            staff,
            measure,
            event_id: event_id.to_string(),
            pitch: pitch.to_string(),
            note_id: fresh_id(),
        }
    }

    pub fn apply_tuplet(staff: usize, measure: usize, event_id: &str, ratio: [u32; 2]) -> Self {
        Command::ApplyTuplet {
            staff,
            measure,
            event_id: event_id.to_string(),
            ratio,
            group_id: fresh_id(),
        }
    }

    pub fn change_time_signature(time_signature: TimeSignature) -> Self {
        Command::ChangeTimeSignature {
            time_signature,
            seed: IdSeed::new(),
        }
    }

    pub fn add_measure(index: Option<usize>) -> Self {
        Command::AddMeasure {
            index,
            seed: IdSeed::new(),
        }
    }

    pub fn toggle_grand_staff() -> Self {
        Command::ToggleGrandStaff { seed: IdSeed::new() }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::AddEvent { .. } => "AddEvent",
            Command::DeleteEvent { .. } => "DeleteEvent",
            Command::AddNote { .. } => "AddNote",
            Command::DeleteNote { .. } => "DeleteNote",
            Command::ChangePitch { .. } => "ChangePitch",
            Command::SetDuration { .. } => "SetDuration",
            Command::ToggleDot { .. } => "ToggleDot",
            Command::ToggleRest { .. } => "ToggleRest",
            Command::ToggleTie { .. } => "ToggleTie",
            Command::SetAccidental { .. } => "SetAccidental",
            Command::ApplyTuplet { .. } => "ApplyTuplet",
            Command::RemoveTuplet { .. } => "RemoveTuplet",
            Command::Transpose { .. } => "Transpose",
            Command::ChangeTimeSignature { .. } => "ChangeTimeSignature",
            Command::ChangeKeySignature { .. } => "ChangeKeySignature",
            Command::SetClef { .. } => "SetClef",
            Command::AddMeasure { .. } => "AddMeasure",
            Command::DeleteMeasure { .. } => "DeleteMeasure",
            Command::TogglePickup => "TogglePickup",
            Command::ToggleGrandStaff { .. } => "ToggleGrandStaff",
            Command::SetTitle { .. } => "SetTitle",
            Command::SetTempo { .. } => "SetTempo",
        }
    }

    /// Produce the next revision of `score`.
    pub fn execute(&self, score: &Score) -> Outcome {
        match self {
            Command::AddEvent { staff, measure, index, event } => {
                edit_measure(score, *staff, *measure, |m| events::add_event(m, *index, event))
            }
            Command::DeleteEvent { staff, measure, event_id } => {
                edit_measure(score, *staff, *measure, |m| events::delete_event(m, event_id))
            }
            Command::AddNote { staff, measure, event_id, note } => {
                edit_measure(score, *staff, *measure, |m| events::add_note(m, event_id, note))
            }
            Command::DeleteNote { staff, measure, event_id, note_id } => {
                edit_measure(score, *staff, *measure, |m| events::delete_note(m, event_id, note_id))
            }
            Command::ChangePitch { staff, measure, event_id, note_id, pitch } => {
                edit_measure(score, *staff, *measure, |m| {
                    events::change_pitch(m, event_id, note_id, pitch)
                })
            }
            Command::SetDuration { staff, measure, event_id, duration } => {
                edit_measure(score, *staff, *measure, |m| {
                    events::set_duration(m, event_id, *duration)
                })
            }
            Command::ToggleDot { staff, measure, event_id } => {
                edit_measure(score, *staff, *measure, |m| events::toggle_dot(m, event_id))
            }
            Command::ToggleRest { staff, measure, event_id, pitch, note_id } => {
                edit_measure(score, *staff, *measure, |m| {
                    events::toggle_rest(m, event_id, pitch, note_id)
                })
            }
            Command::ToggleTie { staff, measure, event_id, note_id } => {
                edit_measure(score, *staff, *measure, |m| events::toggle_tie(m, event_id, note_id))
            }
            Command::SetAccidental { staff, measure, event_id, note_id, accidental } => {
                edit_measure(score, *staff, *measure, |m| {
                    events::set_accidental(m, event_id, note_id, *accidental)
                })
            }
            Command::ApplyTuplet { staff, measure, event_id, ratio, group_id } => {
                edit_measure(score, *staff, *measure, |m| {
                    tuplets::apply_tuplet(m, event_id, *ratio, group_id)
                })
            }
            Command::RemoveTuplet { staff, measure, event_id } => {
                edit_measure(score, *staff, *measure, |m| tuplets::remove_tuplet(m, event_id))
            }
            Command::Transpose { notes, steps, mode } => {
                transpose::transpose(score, notes, *steps, *mode)
            }
            Command::ChangeTimeSignature { time_signature, seed } => {
                structure::change_time_signature(score, *time_signature, seed)
            }
            Command::ChangeKeySignature { key_signature } => {
                structure::change_key_signature(score, *key_signature)
            }
            Command::SetClef { staff, clef } => structure::set_clef(score, *staff, *clef),
            Command::AddMeasure { index, seed } => structure::add_measure(score, *index, seed),
            Command::DeleteMeasure { index } => structure::delete_measure(score, *index),
            Command::TogglePickup => structure::toggle_pickup(score),
            Command::ToggleGrandStaff { seed } => structure::toggle_grand_staff(score, seed),
            Command::SetTitle { title } => edit_score(score, |s| {
                if s.title == *title {
                    return false;
                }
                s.title = title.clone();
                true
            }),
            Command::SetTempo { bpm } => edit_score(score, |s| {
                if s.bpm == *bpm || *bpm == 0 {
                    return false;
                }
                s.bpm = *bpm;
                true
            }),
        }
    }

    /// Revert an earlier `execute` given the record it returned.
    pub fn undo(&self, score: &Score, record: &UndoRecord) -> Score {
        match record {
            UndoRecord::Unchanged => score.clone(),
            UndoRecord::Measures(snapshots) => {
                let mut next = score.clone();
                for snap in snapshots.iter().rev() {
                    if let Some(slot) = next
                        .staff_mut(snap.staff)
                        .and_then(|s| s.measures.get_mut(snap.measure))
                    {
                        *slot = Arc::clone(&snap.prior);
                    }
                }
                next
            }
            UndoRecord::Staff { staff, prior } => {
                let mut next = score.clone();
                if let Some(slot) = next.staves.get_mut(*staff) {
                    *slot = Arc::clone(prior);
                }
                next
            }
            UndoRecord::Score(prior) => prior.as_ref().clone(),
        }
    }
}

/// Run `edit` on a copy-on-write measure; a `false` return means nothing
/// changed and the input score is returned as is.
pub(crate) fn edit_measure<F>(score: &Score, staff: usize, measure: usize, edit: F) -> Outcome
where
    F: FnOnce(&mut Measure) -> bool,
{
    let Some(prior) = score
        .staves
        .get(staff)
        .and_then(|s| s.measures.get(measure))
        .cloned()
    else {
        return Outcome::unchanged(score);
    };

    let mut next = score.clone();
    let changed = next.measure_mut(staff, measure).map_or(false, edit);
    if !changed {
        return Outcome::unchanged(score);
    }
    Outcome {
        score: next,
        undo: UndoRecord::Measures(vec![MeasureSnapshot { staff, measure, prior }]),
    }
}

/// Run `edit` on a copy of the whole score, keeping the original for undo.
pub(crate) fn edit_score<F>(score: &Score, edit: F) -> Outcome
where
    F: FnOnce(&mut Score) -> bool,
{
    let mut next = score.clone();
    if !edit(&mut next) {
        return Outcome::unchanged(score);
    }
    Outcome {
        score: next,
        undo: UndoRecord::Score(Box::new(score.clone())),
    }
}
