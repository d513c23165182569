use crate::layout::tuplets::group_containing;
use crate::model::{Measure, Tuplet};

/// Put `ratio[0]` consecutive events, starting at `event_id`, under one
/// tuplet. Refuses when there are not enough events or one of them already
/// belongs to a group.
pub(super) fn apply_tuplet(
    m: &mut Measure,
    event_id: &str,
    ratio: [u32; 2],
    group_id: &str,
) -> bool {
    let [actual, normal] = ratio;
    if actual < 2 || normal == 0 {
        return false;
    }
    let Some(start) = m.event_index(event_id) else {
        return false;
    };
    let end = start + actual as usize;
    if end > m.events.len() || m.events[start..end].iter().any(|e| e.tuplet.is_some()) {
        return false;
    }

    let base_duration = m.events[start].duration;
    for (position, event) in m.events[start..end].iter_mut().enumerate() {
        event.tuplet = Some(Tuplet {
            ratio,
            group_size: actual,
            position: position as u32,
            base_duration: Some(base_duration),
            id: Some(group_id.to_string()),
        });
    }
    true
}

/// Clear the tuplet from every member of the group containing `event_id`.
pub(super) fn remove_tuplet(m: &mut Measure, event_id: &str) -> bool {
    let Some(idx) = m.event_index(event_id) else {
        return false;
    };
    let Some(group) = group_containing(&m.events, idx) else {
        return false;
    };
    for event in &mut m.events[group.start..group.start + group.len] {
        event.tuplet = None;
    }
    true
}
