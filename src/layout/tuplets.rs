//! Tuplet grouping and bracket geometry.

use serde::Serialize;

use super::chord::{chord_layout, ChordLayout, StemDirection};
use super::clamp_slope;
use super::constants::*;
use crate::duration::quants_of;
use crate::model::{Clef, Event};

/// A contiguous run of events under one tuplet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TupletGroup {
    pub start: usize,
    pub len: usize,
    pub ratio: [u32; 2],
    pub id: Option<String>,
}

impl TupletGroup {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..self.end()).contains(&index)
    }
}

/// Every tuplet group of a measure, in order. A group starts at a
/// position-0 member and runs while the tuplet id matches; members without
/// an id are collected until their nominal length reaches
/// `actual × base duration`.
pub fn tuplet_groups(events: &[Event]) -> Vec<TupletGroup> {
    let mut groups = Vec::new();
    let mut i = 0;
    while i < events.len() {
        let Some(t) = events[i].tuplet.as_ref().filter(|t| t.position == 0) else {
            i += 1;
            continue;
        };
        let mut len = 1;
        match &t.id {
            Some(id) => {
                while let Some(next) = events.get(i + len).and_then(|e| e.tuplet.as_ref()) {
                    if next.id.as_ref() != Some(id) {
                        break;
                    }
                    len += 1;
                }
            }
            None => {
                let base = t.base_duration.unwrap_or(events[i].duration);
                let target = t.actual() * quants_of(base, false, None);
                let mut filled = quants_of(events[i].duration, events[i].dotted, None);
                while filled < target {
                    let Some(next) = events.get(i + len) else { break };
                    match &next.tuplet {
                        Some(nt) if nt.id.is_none() && nt.position != 0 => {
                            filled += quants_of(next.duration, next.dotted, None);
                            len += 1;
                        }
                        _ => break,
                    }
                }
            }
        }
        groups.push(TupletGroup {
            start: i,
            len,
            ratio: t.ratio,
            id: t.id.clone(),
        });
        i += len;
    }
    groups
}

/// The group holding `events[index]`. A tuplet event not reachable from a
/// position-0 member forms a group of its own.
pub fn group_containing(events: &[Event], index: usize) -> Option<TupletGroup> {
    let event = events.get(index)?;
    let tuplet = event.tuplet.as_ref()?;
    tuplet_groups(events)
        .into_iter()
        .find(|g| g.contains(index))
        .or_else(|| {
            Some(TupletGroup {
                start: index,
                len: 1,
                ratio: tuplet.ratio,
                id: tuplet.id.clone(),
            })
        })
}

/// Bracket geometry, in measure-relative X and staff-relative Y.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TupletBracket {
    pub group: TupletGroup,
    /// Majority stem direction of the members
    pub direction: StemDirection,
    /// Bracket drawn above the notes
    pub above: bool,
    pub x_start: f64,
    pub y_start: f64,
    pub x_end: f64,
    pub y_end: f64,
    /// Signed length of the end hooks, pointing toward the notes
    pub hook: f64,
    pub number: u32,
    pub number_x: f64,
    pub number_y: f64,
}

/// Brackets for every tuplet group, with stems as the chord layouts alone
/// would draw them.
pub fn tuplet_brackets(events: &[Event], positions: &[f64], clef: Clef) -> Vec<TupletBracket> {
    let layouts: Vec<Option<ChordLayout>> =
        events.iter().map(|e| chord_layout(e, clef, None)).collect();
    brackets_for_layouts(events, positions, &layouts)
}

/// Brackets from already settled chord layouts (for instance after
/// beaming re-aimed the stems).
pub fn brackets_for_layouts(
    events: &[Event],
    positions: &[f64],
    layouts: &[Option<ChordLayout>],
) -> Vec<TupletBracket> {
    tuplet_groups(events)
        .into_iter()
        .filter(|g| g.end() <= positions.len() && g.end() <= layouts.len())
        .map(|g| bracket(g, positions, layouts))
        .collect()
}

fn bracket(
    group: TupletGroup,
    positions: &[f64],
    layouts: &[Option<ChordLayout>],
) -> TupletBracket {
    let members = group.start..group.end();
    let ups = layouts[members.clone()]
        .iter()
        .flatten()
        .filter(|l| l.direction == StemDirection::Up)
        .count();
    let downs = layouts[members.clone()].iter().flatten().count() - ups;
    let direction = if downs > ups { StemDirection::Down } else { StemDirection::Up };
    // Bracket on the notehead side, away from the stems.
    let above = direction == StemDirection::Down;
    let side = if above { StemDirection::Up } else { StemDirection::Down };

    // Outermost Y each member reaches on the bracket side.
    let limit = |i: usize| match &layouts[i] {
        Some(l) => l.extent(side),
        None if above => MIDDLE_LINE_Y - STAFF_LINE_SPACING,
        None => MIDDLE_LINE_Y + STAFF_LINE_SPACING,
    };
    let pad = if above { -TUPLET_PADDING } else { TUPLET_PADDING };

    let x_start = positions[group.start] - TUPLET_RADIUS;
    let x_end = positions[group.end() - 1] + TUPLET_RADIUS;
    let dx = x_end - x_start;
    let (mut y_start, mut y_end) = clamp_slope(
        limit(group.start) + pad,
        limit(group.end() - 1) + pad,
        dx,
        MAX_TUPLET_SLOPE,
    );

    // Uniform shift by the worst clearance violation.
    let line_y = |x: f64, ys: f64, ye: f64| {
        if dx.abs() < 0.1 {
            ys
        } else {
            ys + (ye - ys) * (x - x_start) / dx
        }
    };
    let mut shift = 0.0_f64;
    for i in members {
        let wanted = limit(i) + pad;
        let y = line_y(positions[i], y_start, y_end);
        let violation = if above { y - wanted } else { wanted - y };
        shift = shift.max(violation);
    }
    if above {
        y_start -= shift;
        y_end -= shift;
    } else {
        y_start += shift;
        y_end += shift;
    }

    let number_offset = if above { -TUPLET_NUMBER_OFFSET } else { TUPLET_NUMBER_OFFSET };
    TupletBracket {
        number: group.ratio[0],
        group,
        direction,
        above,
        x_start,
        y_start,
        x_end,
        y_end,
        hook: if above { TUPLET_HOOK } else { -TUPLET_HOOK },
        number_x: (x_start + x_end) / 2.0,
        number_y: (y_start + y_end) / 2.0 + number_offset,
    }
}
