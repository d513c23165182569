//! Beaming: which events share a beam, and the beam's slanted geometry.

use serde::Serialize;

use super::chord::{chord_layout, ChordLayout, StemDirection};
use super::clamp_slope;
use super::constants::*;
use super::tuplets::tuplet_groups;
use crate::duration::{beam_span, capacity, event_quants};
use crate::model::{Clef, DurationKind, Event, TimeSignature};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeamStem {
    pub event_index: usize,
    pub event_id: String,
    pub x: f64,
    pub base_y: f64,
    pub end_y: f64,
}

/// One beam stroke; level 1 is the primary beam.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeamSegment {
    pub level: u32,
    pub x_start: f64,
    pub y_start: f64,
    pub x_end: f64,
    pub y_end: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeamGroup {
    pub events: Vec<usize>,
    pub direction: StemDirection,
    pub slope: f64,
    pub stems: Vec<BeamStem>,
    pub segments: Vec<BeamSegment>,
}

/// Split a measure's events into beam groups (indices, two or more each).
///
/// A quarter-or-longer event, a rest, a change of note value, a tuplet
/// boundary, or reaching a beat boundary closes the open group.
pub fn group_events(events: &[Event], time_signature: &TimeSignature) -> Vec<Vec<usize>> {
    let mut tuplet_of = vec![None; events.len()];
    for g in tuplet_groups(events) {
        for slot in &mut tuplet_of[g.start..g.end()] {
            *slot = Some(g.start);
        }
    }

    let full = capacity(time_signature);
    let mut groups = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut current_type: Option<DurationKind> = None;
    let mut current_tuplet: Option<usize> = None;
    let mut quant = 0;

    let mut finalize = |current: &mut Vec<usize>| {
        if current.len() >= 2 {
            groups.push(std::mem::take(current));
        } else {
            current.clear();
        }
    };

    for (i, event) in events.iter().enumerate() {
        let beamable = event.duration.is_flagged()
            && !event.is_rest
            && event.pitched_notes().next().is_some();
        if !beamable {
            finalize(&mut current);
            current_type = None;
        } else {
            let span = beam_span(time_signature, event.duration).min(full).max(1);
            let changed = current_type != Some(event.duration) || current_tuplet != tuplet_of[i];
            if changed || (!current.is_empty() && quant % span == 0) {
                finalize(&mut current);
            }
            current.push(i);
            current_type = Some(event.duration);
            current_tuplet = tuplet_of[i];
        }
        quant += event_quants(event);
    }
    finalize(&mut current);
    groups
}

/// Beam groups with stems as computed from the events alone.
pub fn beam_groups(
    events: &[Event],
    positions: &[f64],
    clef: Clef,
    time_signature: &TimeSignature,
) -> Vec<BeamGroup> {
    let mut layouts: Vec<Option<ChordLayout>> =
        events.iter().map(|e| chord_layout(e, clef, None)).collect();
    beam_layouts(events, positions, &mut layouts, time_signature)
}

/// Compute beams and re-aim the stems of every beamed chord in `layouts`
/// at its beam.
pub fn beam_layouts(
    events: &[Event],
    positions: &[f64],
    layouts: &mut [Option<ChordLayout>],
    time_signature: &TimeSignature,
) -> Vec<BeamGroup> {
    group_events(events, time_signature)
        .into_iter()
        .filter_map(|members| beam(events, positions, layouts, members))
        .collect()
}

fn beam(
    events: &[Event],
    positions: &[f64],
    layouts: &mut [Option<ChordLayout>],
    members: Vec<usize>,
) -> Option<BeamGroup> {
    let first = *members.first()?;
    let last = *members.last()?;
    if last >= positions.len() || last >= layouts.len() {
        return None;
    }
    let chords: Vec<&ChordLayout> = members.iter().filter_map(|&i| layouts[i].as_ref()).collect();
    if chords.len() != members.len() {
        return None;
    }

    // The chord whose average notehead is farthest from the middle line
    // decides for the whole group.
    let farthest = chords
        .iter()
        .map(|c| c.average_y())
        .fold(MIDDLE_LINE_Y, |far, y| {
            if (y - MIDDLE_LINE_Y).abs() > (far - MIDDLE_LINE_Y).abs() {
                y
            } else {
                far
            }
        });
    let direction = StemDirection::for_y(farthest);
    let up = direction == StemDirection::Up;

    let stem_offset = if up { NOTEHEAD_RX - STEM_INSET } else { -(NOTEHEAD_RX - STEM_INSET) };
    let outer = |c: &ChordLayout| if up { c.top_y() } else { c.bottom_y() };
    let toward_beam = |y: f64, len: f64| if up { y - len } else { y + len };

    let stem_xs: Vec<f64> = members.iter().map(|&i| positions[i] + stem_offset).collect();
    let outers: Vec<f64> = chords.iter().map(|c| outer(c)).collect();
    let first_x = stem_xs[0];
    let last_x = stem_xs[stem_xs.len() - 1];
    let dx = last_x - first_x;

    let kind = events[first].duration;
    let length = super::chord::stem_length(kind);
    let (y0, y1) = clamp_slope(
        toward_beam(outers[0], length),
        toward_beam(outers[outers.len() - 1], length),
        dx,
        MAX_BEAM_SLOPE,
    );
    let slope = if dx.abs() < 0.1 { 0.0 } else { (y1 - y0) / dx };

    // Shift the whole line by the largest minimum-stem shortfall.
    let shortfall = stem_xs
        .iter()
        .zip(&outers)
        .map(|(&x, &note_y)| {
            let beam_y = y0 + slope * (x - first_x);
            let stem = if up { note_y - beam_y } else { beam_y - note_y };
            MIN_BEAM_STEM - stem
        })
        .fold(0.0_f64, f64::max);
    let shift = if up { -shortfall } else { shortfall };
    let beam_y = |x: f64| y0 + shift + slope * (x - first_x);

    let mut stems = Vec::with_capacity(members.len());
    for (&i, &x) in members.iter().zip(&stem_xs) {
        let end_y = beam_y(x);
        if let Some(layout) = layouts[i].as_mut() {
            layout.set_stem(direction, end_y);
            stems.push(BeamStem {
                event_index: i,
                event_id: events[i].id.clone(),
                x,
                base_y: layout.stem_base_y,
                end_y,
            });
        }
    }

    let x_start = first_x - BEAM_EDGE_EXTENSION;
    let x_end = last_x + BEAM_EDGE_EXTENSION;
    let toward_notes = if up { BEAM_SPACING } else { -BEAM_SPACING };
    let segments = (1..=kind.flag_count().max(1))
        .map(|level| {
            let offset = toward_notes * (level - 1) as f64;
            BeamSegment {
                level,
                x_start,
                y_start: beam_y(x_start) + offset,
                x_end,
                y_end: beam_y(x_end) + offset,
            }
        })
        .collect();

    Some(BeamGroup {
        events: members,
        direction,
        slope,
        stems,
        segments,
    })
}
