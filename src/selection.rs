//! Selection value type.
//!
//! A selection travels alongside the score rather than inside it. It keeps
//! a focused note, the full list of selected notes, and the anchor that
//! shift-extension grows a rectangular range from.

use serde::{Deserialize, Serialize};

use crate::model::Score;

/// Address of one note in a score.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRef {
    pub staff_index: usize,
    pub measure_index: usize,
    pub event_id: String,
    pub note_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub staff_index: usize,
    pub measure_index: Option<usize>,
    pub event_id: Option<String>,
    pub note_id: Option<String>,
    pub selected_notes: Vec<NoteRef>,
    pub anchor: Option<NoteRef>,
}

impl Selection {
    pub fn empty() -> Self {
        Selection::default()
    }

    /// Select a single note and make it the anchor.
    pub fn select(target: NoteRef) -> Self {
        Selection {
            staff_index: target.staff_index,
            measure_index: Some(target.measure_index),
            event_id: Some(target.event_id.clone()),
            note_id: Some(target.note_id.clone()),
            selected_notes: vec![target.clone()],
            anchor: Some(target),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selected_notes.is_empty()
    }

    pub fn contains(&self, target: &NoteRef) -> bool {
        self.selected_notes.contains(target)
    }

    /// Add or remove one note (ctrl-click). The focus moves to the toggled
    /// note when it was added, or to the last remaining note otherwise.
    pub fn toggle_note(&self, target: NoteRef) -> Selection {
        let mut next = self.clone();
        if let Some(pos) = next.selected_notes.iter().position(|n| *n == target) {
            next.selected_notes.remove(pos);
            match next.selected_notes.last().cloned() {
                Some(last) => next.focus(&last),
                None => return Selection::empty(),
            }
        } else {
            next.focus(&target);
            if next.anchor.is_none() {
                next.anchor = Some(target.clone());
            }
            next.selected_notes.push(target);
        }
        next
    }

    /// Extend from the anchor to `target` (shift-click): selects every note
    /// whose staff lies between the two staves and whose event lies between
    /// the two events in reading order.
    pub fn extend_to(&self, score: &Score, target: NoteRef) -> Selection {
        let anchor = match &self.anchor {
            Some(a) => a.clone(),
            None => return Selection::select(target),
        };

        let (Some(a_pos), Some(t_pos)) =
            (event_order(score, &anchor), event_order(score, &target))
        else {
            return Selection::select(target);
        };
        let (lo, hi) = if a_pos <= t_pos { (a_pos, t_pos) } else { (t_pos, a_pos) };
        let staff_lo = anchor.staff_index.min(target.staff_index);
        let staff_hi = anchor.staff_index.max(target.staff_index);

        let mut selected = Vec::new();
        for (si, staff) in score.staves.iter().enumerate() {
            if si < staff_lo || si > staff_hi {
                continue;
            }
            let mut quant_start = 0u64;
            for (mi, measure) in staff.measures.iter().enumerate() {
                for event in &measure.events {
                    let pos = (mi, quant_start);
                    quant_start += crate::duration::event_quants(event) as u64;
                    if pos < lo || pos > hi {
                        continue;
                    }
                    for note in &event.notes {
                        selected.push(NoteRef {
                            staff_index: si,
                            measure_index: mi,
                            event_id: event.id.clone(),
                            note_id: note.id.clone(),
                        });
                    }
                }
                quant_start = 0;
            }
        }

        let mut next = Selection {
            selected_notes: selected,
            anchor: Some(anchor),
            ..Selection::default()
        };
        next.focus(&target);
        next
    }

    pub fn clear(&self) -> Selection {
        Selection::empty()
    }

    fn focus(&mut self, target: &NoteRef) {
        self.staff_index = target.staff_index;
        self.measure_index = Some(target.measure_index);
        self.event_id = Some(target.event_id.clone());
        self.note_id = Some(target.note_id.clone());
    }
}

/// Reading-order key of a note's event: (measure, start quant). Using time
/// rather than event index lets the range span staves with different
/// rhythms.
fn event_order(score: &Score, target: &NoteRef) -> Option<(usize, u64)> {
    let measure = score.measure(target.staff_index, target.measure_index)?;
    let mut start = 0u64;
    for event in &measure.events {
        if event.id == target.event_id {
            return Some((target.measure_index, start));
        }
        start += crate::duration::event_quants(event) as u64;
    }
    None
}
