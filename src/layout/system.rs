//! Grand-staff synchronization: one quant → X map for the simultaneous
//! measures of every staff, so notes sounding together line up vertically.

use std::collections::{BTreeMap, BTreeSet};

use super::accidentals::measure_accidentals;
use super::chord::chord_layout;
use super::constants::*;
use super::measure::{base_width, event_metrics, EventMetrics, ForcedPositions};
use crate::duration::event_quants;
use crate::model::{Clef, Event, KeySignature, Score};

/// One staff's measure at the index being synchronized.
#[derive(Debug, Clone, Copy)]
pub struct StaffMeasure<'a> {
    pub events: &'a [Event],
    pub clef: Clef,
    pub key: KeySignature,
}

/// Notehead X for every time point (event start or end on any staff).
///
/// The first time point sits after the left pad plus the widest leading
/// accidental starting there. Each following one adds the segment width:
/// the larger of `sqrt(segment quants) × unit` and the minimum width of
/// every event starting at the segment, plus the widest trailing padding of
/// those events and the widest leading padding of the events starting at
/// the next point.
pub fn synchronize(measures: &[StaffMeasure<'_>]) -> ForcedPositions {
    let mut points: BTreeSet<u32> = BTreeSet::new();
    let mut starting: BTreeMap<u32, Vec<EventMetrics>> = BTreeMap::new();

    for m in measures {
        let accidentals = measure_accidentals(m.events, m.key);
        let mut quant = 0;
        for (event, shown) in m.events.iter().zip(&accidentals) {
            let chord = chord_layout(event, m.clef, None);
            starting
                .entry(quant)
                .or_default()
                .push(event_metrics(event, shown, chord.as_ref()));
            points.insert(quant);
            quant += event_quants(event);
            points.insert(quant);
        }
    }

    let widest = |quant: u32, f: fn(&EventMetrics) -> f64| {
        starting
            .get(&quant)
            .map_or(0.0, |ms| ms.iter().map(f).fold(0.0, f64::max))
    };

    let mut positions = ForcedPositions::new();
    let points: Vec<u32> = points.into_iter().collect();
    let Some(&first) = points.first() else {
        return positions;
    };
    let mut x = MEASURE_LEFT_PAD + widest(first, |m| m.leading);
    positions.insert(first, x);
    for pair in points.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let segment = base_width((to - from) as f64).max(widest(from, |m| m.min_width));
        x += segment + widest(from, |m| m.trailing) + widest(to, |m| m.leading);
        positions.insert(to, x);
    }
    positions
}

/// Synchronize measure `index` across every staff of `score`.
pub fn synchronize_score_measure(score: &Score, index: usize) -> ForcedPositions {
    let measures: Vec<StaffMeasure<'_>> = score
        .staves
        .iter()
        .filter_map(|staff| {
            staff.measures.get(index).map(|m| StaffMeasure {
                events: &m.events,
                clef: staff.clef,
                key: staff.key_signature,
            })
        })
        .collect();
    synchronize(&measures)
}
