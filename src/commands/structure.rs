//! Commands that add, remove or reshape measures and staves, or change
//! score-wide attributes. They all snapshot the whole score for undo; the
//! snapshot shares every untouched subtree.

use std::sync::Arc;

use super::{edit_score, Outcome, UndoRecord};
use crate::ids::IdSeed;
use crate::model::{Clef, KeySignature, Measure, Score, Staff, TimeSignature};
use crate::reflow::reflow_score;

pub(super) fn change_time_signature(
    score: &Score,
    time_signature: TimeSignature,
    seed: &IdSeed,
) -> Outcome {
    if score.time_signature == time_signature {
        return Outcome::unchanged(score);
    }
    Outcome {
        score: reflow_score(score, time_signature, seed),
        undo: UndoRecord::Score(Box::new(score.clone())),
    }
}

/// Set the key on the score and on every staff.
pub(super) fn change_key_signature(score: &Score, key_signature: KeySignature) -> Outcome {
    edit_score(score, |s| {
        let staves_match = s.staves.iter().all(|st| st.key_signature == key_signature);
        if s.key_signature == key_signature && staves_match {
            return false;
        }
        s.key_signature = key_signature;
        for staff in &mut s.staves {
            if staff.key_signature != key_signature {
                Arc::make_mut(staff).key_signature = key_signature;
            }
        }
        true
    })
}

pub(super) fn set_clef(score: &Score, staff: usize, clef: Clef) -> Outcome {
    match score.staves.get(staff) {
        Some(prior) if prior.clef != clef => {
            let mut next = score.clone();
            if let Some(s) = next.staff_mut(staff) {
                s.clef = clef;
            }
            Outcome {
                score: next,
                undo: UndoRecord::Staff {
                    staff,
                    prior: Arc::clone(prior),
                },
            }
        }
        _ => Outcome::unchanged(score),
    }
}

/// Insert one empty measure per staff at the same index.
pub(super) fn add_measure(score: &Score, index: Option<usize>, seed: &IdSeed) -> Outcome {
    let count = score.measure_count();
    let at = index.unwrap_or(count).min(count);
    edit_score(score, |s| {
        for staff in &mut s.staves {
            let staff = Arc::make_mut(staff);
            let id = seed.derive(&staff.id);
            staff.measures.insert(at, Arc::new(Measure::with_id(id)));
        }
        true
    })
}

/// Remove the measure at `index` from every staff. The last remaining
/// measure is never removed.
pub(super) fn delete_measure(score: &Score, index: usize) -> Outcome {
    let count = score.measure_count();
    if count <= 1 || index >= count {
        return Outcome::unchanged(score);
    }
    edit_score(score, |s| {
        for staff in &mut s.staves {
            let staff = Arc::make_mut(staff);
            if index < staff.measures.len() {
                staff.measures.remove(index);
            }
        }
        // A pickup only makes sense as the first measure.
        if index == 0 {
            for staff in &mut s.staves {
                if staff.measures.first().map_or(false, |m| m.is_pickup) {
                    if let Some(first) = Arc::make_mut(staff).measures.first_mut() {
                        Arc::make_mut(first).is_pickup = false;
                    }
                }
            }
        }
        true
    })
}

/// Flip the pickup flag of the first measure on every staff.
pub(super) fn toggle_pickup(score: &Score) -> Outcome {
    let Some(currently) = score.measure(0, 0).map(|m| m.is_pickup) else {
        return Outcome::unchanged(score);
    };
    edit_score(score, |s| {
        for staff in &mut s.staves {
            if let Some(first) = Arc::make_mut(staff).measures.first_mut() {
                Arc::make_mut(first).is_pickup = !currently;
            }
        }
        true
    })
}

/// One staff: add a bass staff with empty, index-aligned measures (and the
/// pickup flag mirrored). Several staves: drop the last one.
pub(super) fn toggle_grand_staff(score: &Score, seed: &IdSeed) -> Outcome {
    edit_score(score, |s| {
        if s.staves.len() > 1 {
            s.staves.pop();
            return true;
        }
        let Some(upper) = s.staves.first().cloned() else {
            return false;
        };
        let staff_id = seed.derive("staff");
        let measures = upper
            .measures
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let mut measure = Measure::with_id(seed.derive(&format!("{staff_id}/m{i}")));
                measure.is_pickup = m.is_pickup;
                Arc::new(measure)
            })
            .collect();
        s.staves.push(Arc::new(Staff {
            id: staff_id,
            clef: Clef::Bass,
            key_signature: upper.key_signature,
            measures,
        }));
        true
    })
}
