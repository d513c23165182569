//! Capacity guards.
//!
//! Callers consult these before issuing a command; the engine itself only
//! validates structure. Each guard adds the candidate's new length to the
//! total of all *other* events and compares against `capacity`.

use crate::duration::{event_quants, quants_of};
use crate::model::{DurationKind, Event};

/// Whether a new `(duration, dotted)` event fits into `events`.
pub fn can_add_event(
    events: &[Event],
    duration: DurationKind,
    dotted: bool,
    capacity: u32,
) -> bool {
    total_except(events, None) + quants_of(duration, dotted, None) <= capacity
}

/// Whether `event_id` can take `duration` (keeping its dot and tuplet).
pub fn can_modify_duration(
    events: &[Event],
    event_id: &str,
    duration: DurationKind,
    capacity: u32,
) -> bool {
    let Some(event) = events.iter().find(|e| e.id == event_id) else {
        return false;
    };
    let candidate = quants_of(duration, event.dotted, event.tuplet.as_ref());
    total_except(events, Some(event_id)) + candidate <= capacity
}

/// Whether `event_id` can have its dot toggled. A 64th never takes a dot:
/// its dotted length is not a whole number of quants.
pub fn can_toggle_dot(events: &[Event], event_id: &str, capacity: u32) -> bool {
    let Some(event) = events.iter().find(|e| e.id == event_id) else {
        return false;
    };
    if !event.dotted && event.duration == DurationKind::SixtyFourth {
        return false;
    }
    let candidate = quants_of(event.duration, !event.dotted, event.tuplet.as_ref());
    total_except(events, Some(event_id)) + candidate <= capacity
}

fn total_except(events: &[Event], skip: Option<&str>) -> u32 {
    events
        .iter()
        .filter(|e| Some(e.id.as_str()) != skip)
        .map(event_quants)
        .sum()
}
