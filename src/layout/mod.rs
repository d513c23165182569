//! Layout engine: turns a score into measure, beam and tuplet geometry.
//!
//! The per-measure query functions ([`layout_measure`], [`synchronize`],
//! [`beam_groups`], [`tuplet_brackets`]) are pure and can be called on their
//! own. [`layout_score`] runs them over a whole score and breaks the
//! measures into systems.

pub mod accidentals;
pub mod beams;
pub mod chord;
pub(crate) mod constants;
pub mod measure;
pub mod system;
pub mod tuplets;

use serde::Serialize;

use crate::model::{KeySignature, Score};
use constants::*;

pub use beams::{beam_groups, beam_layouts, group_events, BeamGroup, BeamSegment, BeamStem};
pub use chord::{chord_layout, pitch_to_staff_y, ChordLayout, LedgerLine, NoteHead, StemDirection};
pub use measure::{
    hit_test, layout_measure, ForcedPositions, HitZone, HitZoneKind, MeasureLayout, Placeholder,
    ProcessedEvent,
};
pub use system::{synchronize, synchronize_score_measure, StaffMeasure};
pub use tuplets::{brackets_for_layouts, tuplet_brackets, tuplet_groups, TupletBracket, TupletGroup};

/// Clamp the slope of the line from `y_start` to `y_end` over `dx` to
/// `±max`, pivoting around the midpoint.
pub(crate) fn clamp_slope(y_start: f64, y_end: f64, dx: f64, max: f64) -> (f64, f64) {
    let mid = (y_start + y_end) / 2.0;
    if dx.abs() < 0.1 {
        return (mid, mid);
    }
    let slope = (y_end - y_start) / dx;
    if slope.abs() <= max {
        return (y_start, y_end);
    }
    let half_rise = max.copysign(slope) * dx / 2.0;
    (mid - half_rise, mid + half_rise)
}

pub(crate) fn key_sig_width(key: KeySignature) -> f64 {
    match key.fifths {
        f if f > 0 => f as f64 * KEY_SIG_SHARP_SPACE,
        f if f < 0 => f.unsigned_abs() as f64 * KEY_SIG_FLAT_SPACE,
        _ => 0.0,
    }
}

/// One staff's share of a measure column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffMeasureLayout {
    pub staff_index: usize,
    /// Top of the staff, relative to the system
    pub y: f64,
    pub measure: MeasureLayout,
    pub beams: Vec<BeamGroup>,
    pub tuplets: Vec<TupletBracket>,
}

/// Measure index `index` on every staff, sharing one quant → X map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureColumn {
    pub index: usize,
    pub x: f64,
    pub width: f64,
    pub forced_positions: ForcedPositions,
    pub staves: Vec<StaffMeasureLayout>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemLayout {
    pub y: f64,
    pub x_start: f64,
    pub x_end: f64,
    pub prefix_width: f64,
    pub show_time_signature: bool,
    pub measures: Vec<MeasureColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreLayout {
    pub page_width: f64,
    pub systems: Vec<SystemLayout>,
    pub total_height: f64,
}

/// Lay out every measure of `score` and break them greedily into systems of
/// `page_width` (default 820). Every system but the last is stretched to
/// the full line.
pub fn layout_score(score: &Score, page_width: Option<f64>) -> ScoreLayout {
    let page_width = page_width.unwrap_or(DEFAULT_PAGE_WIDTH);
    let content_width = page_width - PAGE_MARGIN_LEFT - PAGE_MARGIN_RIGHT;
    let key_width = score
        .staves
        .iter()
        .map(|s| key_sig_width(s.key_signature))
        .fold(key_sig_width(score.key_signature), f64::max);
    let first_prefix = CLEF_SPACE + key_width + TIME_SIG_SPACE;
    let later_prefix = CLEF_SPACE + key_width;

    let natural: Vec<(ForcedPositions, f64)> = (0..score.measure_count())
        .map(|mi| {
            let forced = synchronize_score_measure(score, mi);
            let width = column(score, mi, &forced, 0.0).width;
            (forced, width)
        })
        .collect();

    // Greedy line breaking on natural widths.
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut current_width = 0.0;
    for (mi, (_, width)) in natural.iter().enumerate() {
        let prefix = if groups.is_empty() { first_prefix } else { later_prefix };
        if !current.is_empty() && current_width + width > content_width - prefix {
            groups.push(std::mem::take(&mut current));
            current_width = 0.0;
        }
        current.push(mi);
        current_width += width;
    }
    if !current.is_empty() {
        groups.push(current);
    }

    let staff_count = score.staves.len().max(1) as f64;
    let system_height = staff_count * STAFF_HEIGHT + (staff_count - 1.0) * GRAND_STAFF_GAP;
    let group_count = groups.len();
    let mut y = PAGE_MARGIN_TOP;
    let mut systems = Vec::with_capacity(group_count);

    for (si, group) in groups.into_iter().enumerate() {
        let show_time_signature = si == 0;
        let prefix_width = if show_time_signature { first_prefix } else { later_prefix };
        let x_start = PAGE_MARGIN_LEFT + prefix_width;
        let x_end = PAGE_MARGIN_LEFT + content_width;

        let total: f64 = group.iter().map(|&mi| natural[mi].1).sum();
        let last = si + 1 == group_count;
        let scale = if !last && total > 0.0 {
            ((x_end - x_start) / total).max(1.0)
        } else {
            1.0
        };

        let mut x = x_start;
        let mut measures = Vec::with_capacity(group.len());
        for mi in group {
            let forced: ForcedPositions =
                natural[mi].0.iter().map(|(&q, &px)| (q, px * scale)).collect();
            let mut col = column(score, mi, &forced, natural[mi].1 * scale);
            col.x = x;
            x += col.width;
            measures.push(col);
        }

        systems.push(SystemLayout {
            y,
            x_start,
            x_end: if last { x } else { x_end },
            prefix_width,
            show_time_signature,
            measures,
        });
        y += system_height + SYSTEM_SPACING;
    }

    ScoreLayout {
        page_width,
        systems,
        total_height: y,
    }
}

/// Lay out measure `mi` of every staff against `forced`; the column is at
/// least `min_width` wide and every staff measure is widened to match.
fn column(score: &Score, mi: usize, forced: &ForcedPositions, min_width: f64) -> MeasureColumn {
    let mut staves: Vec<StaffMeasureLayout> = score
        .staves
        .iter()
        .enumerate()
        .filter_map(|(si, staff)| {
            let measure = staff.measures.get(mi)?;
            let mut layout = layout_measure(
                &measure.events,
                staff.clef,
                staff.key_signature,
                measure.is_pickup,
                Some(forced),
            );
            let mut chords: Vec<Option<ChordLayout>> =
                layout.processed_events.iter_mut().map(|p| p.chord.take()).collect();
            let beams = beam_layouts(
                &measure.events,
                &layout.event_positions,
                &mut chords,
                &score.time_signature,
            );
            let tuplets = brackets_for_layouts(&measure.events, &layout.event_positions, &chords);
            for (p, chord) in layout.processed_events.iter_mut().zip(chords) {
                p.chord = chord;
            }
            Some(StaffMeasureLayout {
                staff_index: si,
                y: si as f64 * (STAFF_HEIGHT + GRAND_STAFF_GAP),
                measure: layout,
                beams,
                tuplets,
            })
        })
        .collect();

    let width = staves
        .iter()
        .map(|s| s.measure.total_width)
        .fold(min_width, f64::max);
    for staff in &mut staves {
        widen(&mut staff.measure, width);
    }

    MeasureColumn {
        index: mi,
        x: 0.0,
        width,
        forced_positions: forced.clone(),
        staves,
    }
}

/// Stretch a measure to `width`: the trailing zone and the placeholder
/// follow the new right edge.
fn widen(layout: &mut MeasureLayout, width: f64) {
    if width <= layout.total_width {
        return;
    }
    layout.total_width = width;
    if let Some(last) = layout.hit_zones.last_mut() {
        if last.kind == HitZoneKind::Append {
            last.x_end = width;
        }
    }
    if let Some(p) = layout.placeholder.as_mut() {
        *p = Placeholder {
            x: width / 2.0,
            width,
        };
    }
}
