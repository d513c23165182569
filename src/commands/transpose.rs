use std::collections::BTreeMap;

use super::{MeasureSnapshot, Outcome, TransposeMode, UndoRecord};
use crate::model::Score;
use crate::pitch::Pitch;
use crate::selection::NoteRef;

/// Transpose every referenced pitched note. Each touched measure is
/// snapshotted once; references that no longer resolve are skipped.
pub(super) fn transpose(
    score: &Score,
    notes: &[NoteRef],
    steps: i32,
    mode: TransposeMode,
) -> Outcome {
    if steps == 0 {
        return Outcome::unchanged(score);
    }

    let mut by_measure: BTreeMap<(usize, usize), Vec<&NoteRef>> = BTreeMap::new();
    for r in notes {
        by_measure.entry((r.staff_index, r.measure_index)).or_default().push(r);
    }

    let mut next = score.clone();
    let mut snapshots = Vec::new();

    for ((si, mi), refs) in by_measure {
        let Some(prior) = score.staves.get(si).and_then(|s| s.measures.get(mi)).cloned() else {
            continue;
        };
        let key = score.staves[si].key_signature;
        let Some(measure) = next.measure_mut(si, mi) else {
            continue;
        };

        let mut touched = false;
        for r in refs {
            let Some(note) = measure
                .event_mut(&r.event_id)
                .and_then(|e| e.notes.iter_mut().find(|n| n.id == r.note_id))
            else {
                continue;
            };
            let Some(pitch) = note.pitch.as_deref().and_then(|p| p.parse::<Pitch>().ok()) else {
                continue;
            };
            let moved = match mode {
                TransposeMode::Diatonic => pitch.transpose_diatonic(steps, key),
                TransposeMode::Chromatic => pitch.transpose_chromatic(steps, key),
            };
            note.pitch = Some(moved.to_string());
            note.accidental = None;
            touched = true;
        }

        if touched {
            snapshots.push(MeasureSnapshot {
                staff: si,
                measure: mi,
                prior,
            });
        } else if let Some(slot) = next.staff_mut(si).and_then(|s| s.measures.get_mut(mi)) {
            // measure_mut already cloned it; put the shared one back
            *slot = prior;
        }
    }

    if snapshots.is_empty() {
        return Outcome::unchanged(score);
    }
    Outcome {
        score: next,
        undo: UndoRecord::Measures(snapshots),
    }
}
