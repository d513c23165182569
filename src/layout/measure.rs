//! Horizontal layout of one measure: event X positions, widths, hit zones
//! and the empty-measure placeholder.

use std::collections::BTreeMap;

use serde::Serialize;

use super::accidentals::measure_accidentals;
use super::chord::{chord_layout, ChordLayout};
use super::constants::*;
use super::tuplets::tuplet_groups;
use crate::duration::{event_quants, quants_of};
use crate::model::{Accidental, Clef, Event, KeySignature};

/// Notehead X per quant offset, shared by every staff of a system.
pub type ForcedPositions = BTreeMap<u32, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HitZoneKind {
    /// Click selects the event (or adds to its chord)
    Event,
    /// Click inserts a new event at `index`
    Insert,
    /// Click appends at the end of the measure (or fills an empty one)
    Append,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HitZone {
    pub kind: HitZoneKind,
    pub x_start: f64,
    pub x_end: f64,
    /// Event index for `Event`, insertion index otherwise
    pub index: usize,
    pub event_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedEvent {
    pub index: usize,
    pub event_id: String,
    pub x: f64,
    pub start_quant: u32,
    pub quants: u32,
    pub is_rest: bool,
    /// Displayed accidental per note, in the event's note order
    pub accidentals: Vec<Option<Accidental>>,
    pub chord: Option<ChordLayout>,
    /// Start index of the tuplet group this event belongs to
    pub tuplet_start: Option<usize>,
}

/// Centered whole-rest placeholder of an empty measure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Placeholder {
    pub x: f64,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureLayout {
    pub hit_zones: Vec<HitZone>,
    /// Notehead X per event, measure-relative
    pub event_positions: Vec<f64>,
    pub total_width: f64,
    pub processed_events: Vec<ProcessedEvent>,
    pub placeholder: Option<Placeholder>,
}

/// Horizontal space one event asks for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct EventMetrics {
    /// Room left of the notehead (accidentals)
    pub leading: f64,
    /// Duration-driven width, floored by the legible minimum
    pub body: f64,
    pub min_width: f64,
    /// Room right of the notehead (displaced seconds, dots)
    pub trailing: f64,
}

pub(crate) fn base_width(quants: f64) -> f64 {
    quants.max(0.0).sqrt() * SPACING_UNIT
}

pub(crate) fn event_metrics(
    event: &Event,
    accidentals: &[Option<Accidental>],
    chord: Option<&ChordLayout>,
) -> EventMetrics {
    let nominal = quants_of(event.duration, event.dotted, None) as f64;
    let scale = match &event.tuplet {
        Some(t) if t.actual() > 0 => (t.normal() as f64 / t.actual() as f64).sqrt(),
        _ => 1.0,
    };
    let min_width = min_width_factor(event.duration) * SPACING_UNIT;
    let leading = if accidentals.iter().any(Option::is_some) { ACCIDENTAL_PAD } else { 0.0 };
    let mut trailing = 0.0;
    if chord.map_or(false, |c| c.has_seconds) {
        trailing += SECOND_PAD;
    }
    if event.dotted {
        trailing += DOT_PAD;
    }
    EventMetrics {
        leading,
        body: (base_width(nominal) * scale).max(min_width),
        min_width,
        trailing,
    }
}

/// Lay out one measure. With `forced`, any event whose start quant has an
/// entry is placed at that X instead of the running cursor.
pub fn layout_measure(
    events: &[Event],
    clef: Clef,
    key: KeySignature,
    is_pickup: bool,
    forced: Option<&ForcedPositions>,
) -> MeasureLayout {
    if events.is_empty() {
        return empty_measure(is_pickup, forced);
    }

    let accidentals = measure_accidentals(events, key);
    let groups = tuplet_groups(events);
    let mut tuplet_of = vec![None; events.len()];
    for g in &groups {
        for slot in &mut tuplet_of[g.start..g.end()] {
            *slot = Some(g.start);
        }
    }

    let chords: Vec<Option<ChordLayout>> =
        events.iter().map(|e| chord_layout(e, clef, None)).collect();
    let metrics: Vec<EventMetrics> = events
        .iter()
        .zip(&chords)
        .enumerate()
        .map(|(i, (e, c))| event_metrics(e, &accidentals[i], c.as_ref()))
        .collect();

    let mut cursor = MEASURE_LEFT_PAD;
    let mut quant = 0;
    let mut positions = Vec::with_capacity(events.len());
    let mut processed = Vec::with_capacity(events.len());

    let mut i = 0;
    while i < events.len() {
        // A tuplet group reserves its whole width up front.
        let len = groups.iter().find(|g| g.start == i).map_or(1, |g| g.len);
        let unit = &metrics[i..i + len];
        let unit_width: f64 = unit.iter().map(|m| m.leading + m.body + m.trailing).sum();
        let unit_start = forced
            .and_then(|f| f.get(&quant).copied())
            .map_or(cursor, |x| x - unit[0].leading);

        let mut member_cursor = unit_start;
        for (k, m) in unit.iter().enumerate() {
            let j = i + k;
            let event = &events[j];
            let x = forced
                .and_then(|f| f.get(&quant).copied())
                .unwrap_or(member_cursor + m.leading);
            member_cursor = x + m.body + m.trailing;

            let quants = event_quants(event);
            positions.push(x);
            processed.push(ProcessedEvent {
                index: j,
                event_id: event.id.clone(),
                x,
                start_quant: quant,
                quants,
                is_rest: event.is_rest,
                accidentals: accidentals[j].clone(),
                chord: chords[j].clone(),
                tuplet_start: tuplet_of[j],
            });
            quant += quants;
        }
        cursor = if len > 1 {
            member_cursor.max(unit_start + unit_width)
        } else {
            member_cursor
        };
        i += len;
    }

    let forced_end = forced.and_then(|f| f.get(&quant).copied()).unwrap_or(0.0);
    let total_width = (cursor.max(forced_end) + MEASURE_RIGHT_PAD).max(MIN_MEASURE_WIDTH);
    let hit_zones = hit_zones(events, &positions, &tuplet_of, total_width);

    MeasureLayout {
        hit_zones,
        event_positions: positions,
        total_width,
        processed_events: processed,
        placeholder: None,
    }
}

fn empty_measure(is_pickup: bool, forced: Option<&ForcedPositions>) -> MeasureLayout {
    let minimum = if is_pickup { MIN_MEASURE_WIDTH } else { EMPTY_MEASURE_WIDTH };
    let forced_end = forced
        .and_then(|f| f.values().copied().reduce(f64::max))
        .map_or(0.0, |x| x + MEASURE_RIGHT_PAD);
    let total_width = minimum.max(forced_end);
    MeasureLayout {
        hit_zones: vec![HitZone {
            kind: HitZoneKind::Append,
            x_start: 0.0,
            x_end: total_width,
            index: 0,
            event_id: None,
        }],
        event_positions: Vec::new(),
        total_width,
        processed_events: Vec::new(),
        placeholder: Some(Placeholder {
            x: total_width / 2.0,
            width: total_width,
        }),
    }
}

/// Insert / event / insert … / append, left to right. No insert zone opens
/// inside a tuplet group. Each new zone caps the previous one's end at its
/// own start so zones never overlap.
fn hit_zones(
    events: &[Event],
    positions: &[f64],
    tuplet_of: &[Option<usize>],
    total_width: f64,
) -> Vec<HitZone> {
    let mut zones: Vec<HitZone> = Vec::with_capacity(events.len() * 2 + 1);
    let push = |zones: &mut Vec<HitZone>, mut zone: HitZone| {
        if let Some(prev) = zones.last_mut() {
            zone.x_start = zone.x_start.max(prev.x_start);
            prev.x_end = prev.x_end.min(zone.x_start);
        }
        if zone.x_end > zone.x_start {
            zones.push(zone);
        }
    };

    let mut previous_end = 0.0;
    for (i, (event, &x)) in events.iter().zip(positions).enumerate() {
        let inside_group = i > 0 && tuplet_of[i].is_some() && tuplet_of[i] == tuplet_of[i - 1];
        let start = x - EVENT_HIT_RADIUS;
        if !inside_group {
            push(
                &mut zones,
                HitZone {
                    kind: HitZoneKind::Insert,
                    x_start: previous_end,
                    x_end: start,
                    index: i,
                    event_id: None,
                },
            );
        }
        let end = x + EVENT_HIT_RADIUS;
        push(
            &mut zones,
            HitZone {
                kind: HitZoneKind::Event,
                x_start: start,
                x_end: end,
                index: i,
                event_id: Some(event.id.clone()),
            },
        );
        previous_end = end;
    }
    push(
        &mut zones,
        HitZone {
            kind: HitZoneKind::Append,
            x_start: previous_end,
            x_end: total_width,
            index: events.len(),
            event_id: None,
        },
    );
    zones
}

/// Zone under `x`, if any.
pub fn hit_test(layout: &MeasureLayout, x: f64) -> Option<&HitZone> {
    layout.hit_zones.iter().find(|z| z.x_start <= x && x < z.x_end)
}
