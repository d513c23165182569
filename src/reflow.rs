//! Reflow a staff into measures of a new time signature.
//!
//! All events of the staff are laid end to end and re-chunked into
//! measures of the new capacity. An event that straddles a new barline is
//! split into tied pieces (via [`decompose`]), so the total performed
//! length never changes. Ties between unsplit events are cleared. A tuplet
//! group that does not fit closes the current measure early and opens the
//! next one; a group longer than a whole measure is written out as tied
//! plain notes.

use std::sync::Arc;

use crate::duration::{capacity, decompose, event_quants, total_quants, DurationPiece};
use crate::ids::IdSeed;
use crate::layout::tuplets::tuplet_groups;
use crate::model::{Event, Measure, Score, Staff, TimeSignature};

/// Reflow every staff of `score` into `time_signature` and pad shorter
/// staves with empty measures so all staves stay index-aligned.
pub fn reflow_score(score: &Score, time_signature: TimeSignature, seed: &IdSeed) -> Score {
    let mut staves: Vec<Staff> = score
        .staves
        .iter()
        .map(|s| reflow_staff(s, &time_signature, seed))
        .collect();

    let count = staves.iter().map(|s| s.measures.len()).max().unwrap_or(1);
    for staff in &mut staves {
        let mut pad = staff.measures.len();
        while staff.measures.len() < count {
            let id = seed.derive(&format!("{}/pad{}", staff.id, pad));
            staff.measures.push(Arc::new(Measure::with_id(id)));
            pad += 1;
        }
    }

    Score {
        time_signature,
        staves: staves.into_iter().map(Arc::new).collect(),
        ..score.clone()
    }
}

/// Reflow one staff. Ids of new measures and of continuation pieces are
/// derived from `seed`; an event keeps its own id for its first piece.
pub fn reflow_staff(staff: &Staff, time_signature: &TimeSignature, seed: &IdSeed) -> Staff {
    // Never zero, so every new measure has room for at least one piece.
    let full = capacity(time_signature).max(1);
    let pickup = staff.measures.first().filter(|m| m.is_pickup);
    let first_capacity = match pickup.map(|m| total_quants(&m.events)) {
        Some(total) if total > 0 => total.min(full),
        _ => full,
    };

    let mut packer = Packer {
        staff_id: &staff.id,
        seed,
        full,
        capacity: first_capacity,
        pickup: pickup.is_some(),
        used: 0,
        current: Vec::new(),
        measures: Vec::new(),
    };

    for measure in &staff.measures {
        let groups = tuplet_groups(&measure.events);
        let mut i = 0;
        while i < measure.events.len() {
            match groups.iter().find(|g| g.start == i) {
                Some(g) => {
                    packer.push_group(&measure.events[g.start..g.start + g.len]);
                    i += g.len;
                }
                None if measure.events[i].tuplet.is_some() => {
                    packer.push_group(&measure.events[i..=i]);
                    i += 1;
                }
                None => {
                    packer.push_event(&measure.events[i]);
                    i += 1;
                }
            }
        }
    }

    Staff {
        measures: packer.finish(),
        ..staff.clone()
    }
}

struct Packer<'a> {
    staff_id: &'a str,
    seed: &'a IdSeed,
    full: u32,
    /// Capacity of the measure being filled
    capacity: u32,
    pickup: bool,
    used: u32,
    current: Vec<Event>,
    measures: Vec<Arc<Measure>>,
}

impl Packer<'_> {
    fn close(&mut self) {
        let index = self.measures.len();
        let id = self.seed.derive(&format!("{}/m{}", self.staff_id, index));
        self.measures.push(Arc::new(Measure {
            id,
            events: std::mem::take(&mut self.current),
            is_pickup: index == 0 && self.pickup,
        }));
        self.used = 0;
        self.capacity = self.full;
    }

    fn room(&self) -> u32 {
        self.capacity.saturating_sub(self.used)
    }

    /// Place a tuplet group whole. A group that cannot fit even an empty
    /// measure is written out as plain tied pieces instead.
    fn push_group(&mut self, group: &[Event]) {
        let total = total_quants(group);
        if total > self.full || (self.used == 0 && total > self.capacity) {
            for event in group {
                self.push_pieces(event, event_quants(event));
            }
            return;
        }
        if total > self.room() && self.used > 0 {
            self.close();
        }
        self.current.extend(group.iter().map(untied));
        self.used += total;
        if self.used >= self.capacity {
            self.close();
        }
    }

    fn push_event(&mut self, event: &Event) {
        if self.room() == 0 {
            self.close();
        }
        let q = event_quants(event);
        if q <= self.room() {
            self.current.push(untied(event));
            self.used += q;
            if self.used >= self.capacity {
                self.close();
            }
            return;
        }
        self.push_pieces(event, q);
    }

    /// Write `q` quants of `event` as decomposed pieces. The first segment
    /// fills this measure, the following ones fill whole measures until the
    /// length is used up.
    fn push_pieces(&mut self, event: &Event, q: u32) {
        if self.room() == 0 {
            self.close();
        }
        let mut segments = Vec::new();
        let mut remaining = q;
        let mut room = self.room();
        while remaining > 0 && room > 0 {
            let take = remaining.min(room);
            segments.push(take);
            remaining -= take;
            room = self.full;
        }
        let plan: Vec<(usize, DurationPiece)> = segments
            .iter()
            .enumerate()
            .flat_map(|(seg, &take)| decompose(take).into_iter().map(move |p| (seg, p)))
            .collect();

        let last = plan.len().saturating_sub(1);
        let mut segment = 0;
        for (k, (seg, piece)) in plan.into_iter().enumerate() {
            if seg != segment {
                self.close();
                segment = seg;
            }
            let mut part = event.clone();
            if k > 0 {
                part.id = self.seed.derive(&format!("{}#{}", event.id, k));
                for note in &mut part.notes {
                    note.id = self.seed.derive(&format!("{}#{}", note.id, k));
                }
            }
            part.duration = piece.duration;
            part.dotted = piece.dotted;
            part.tuplet = None;
            // Every piece but the last ties over; the last keeps each
            // note's own original tie.
            for (note, original) in part.notes.iter_mut().zip(&event.notes) {
                note.tied = if k == last { original.tied } else { note.pitch.is_some() };
            }
            self.used += piece.quants();
            self.current.push(part);
        }
        if self.used >= self.capacity {
            self.close();
        }
    }

    fn finish(mut self) -> Vec<Arc<Measure>> {
        if !self.current.is_empty() || self.measures.is_empty() {
            self.close();
        }
        self.measures
    }
}

/// Copy of `event` with every tie cleared. Flattening drops ties between
/// events; only the pieces of a split event are tied together.
fn untied(event: &Event) -> Event {
    let mut event = event.clone();
    for note in &mut event.notes {
        note.tied = false;
    }
    event
}
