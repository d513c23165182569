//! Chord & stem geometry: notehead Y per clef, stem direction and length,
//! second-interval notehead shifts, ledger lines.
//!
//! Y values are staff-relative: 0 is the top line, 40 the bottom line,
//! growing downward.

use serde::Serialize;

use super::constants::*;
use crate::model::{Clef, DurationKind, Event};
use crate::pitch::Pitch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StemDirection {
    Up,
    Down,
}

impl StemDirection {
    /// Direction a stem at staff-relative `y` takes on its own.
    pub fn for_y(y: f64) -> Self {
        if y <= MIDDLE_LINE_Y {
            StemDirection::Down
        } else {
            StemDirection::Up
        }
    }
}

/// Staff steps above the bottom line (bottom line = 0, top line = 8).
pub fn staff_position(pitch: &Pitch, clef: Clef) -> i32 {
    // Reference pitch and the bottom-line-relative step of its clef line.
    let (reference, step) = match clef {
        Clef::Treble => (4 * 7 + 4, 2), // G4 on line 2
        Clef::Bass => (3 * 7 + 3, 6),   // F3 on line 4
        Clef::Alto => (4 * 7, 4),       // C4 on line 3
        Clef::Tenor => (4 * 7, 6),      // C4 on line 4
    };
    pitch.diatonic_index() - reference + step
}

pub fn pitch_to_staff_y(pitch: &Pitch, clef: Clef) -> f64 {
    STAFF_HEIGHT - staff_position(pitch, clef) as f64 * STAFF_STEP
}

/// Unbeamed stem length: flags need extra room from the 16th down.
pub fn stem_length(kind: DurationKind) -> f64 {
    if !kind.has_stem() {
        return 0.0;
    }
    let extra = match kind.flag_count() {
        2 => 4.0,
        3 => 9.0,
        4 => 13.0,
        _ => 0.0,
    };
    STEM_LENGTH + extra
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteHead {
    pub note_id: String,
    pub y: f64,
    /// Staff steps above the bottom line
    pub position: i32,
    /// Horizontal displacement from the event X (non-zero for seconds)
    pub x_offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerLine {
    pub y: f64,
    pub x_start: f64,
    pub x_end: f64,
}

/// Vertical layout of one pitched event. X values are relative to the
/// event's X.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChordLayout {
    /// Sorted top to bottom
    pub noteheads: Vec<NoteHead>,
    pub direction: StemDirection,
    pub stem_x: f64,
    /// Notehead end of the stem
    pub stem_base_y: f64,
    /// Free end of the stem (beam or flag side)
    pub stem_end_y: f64,
    pub has_stem: bool,
    pub has_seconds: bool,
    pub ledger_lines: Vec<LedgerLine>,
}

impl ChordLayout {
    pub fn top_y(&self) -> f64 {
        self.noteheads.first().map_or(MIDDLE_LINE_Y, |n| n.y)
    }

    pub fn bottom_y(&self) -> f64 {
        self.noteheads.last().map_or(MIDDLE_LINE_Y, |n| n.y)
    }

    pub fn average_y(&self) -> f64 {
        if self.noteheads.is_empty() {
            return MIDDLE_LINE_Y;
        }
        self.noteheads.iter().map(|n| n.y).sum::<f64>() / self.noteheads.len() as f64
    }

    /// Notehead nearest the free end of the stem.
    pub fn outer_notehead_y(&self) -> f64 {
        match self.direction {
            StemDirection::Up => self.top_y(),
            StemDirection::Down => self.bottom_y(),
        }
    }

    /// Re-aim the stem at `direction` and `end_y` (used by beams).
    pub fn set_stem(&mut self, direction: StemDirection, end_y: f64) {
        self.direction = direction;
        self.stem_x = stem_x(direction);
        self.stem_base_y = match direction {
            StemDirection::Up => self.bottom_y(),
            StemDirection::Down => self.top_y(),
        };
        self.stem_end_y = end_y;
    }

    /// Extreme Y of the whole chord on the `direction` side, stem included
    /// only when it points that way.
    pub fn extent(&self, direction: StemDirection) -> f64 {
        let stem_there = self.has_stem && self.direction == direction;
        match direction {
            StemDirection::Up if stem_there => self.stem_end_y.min(self.top_y() - NOTEHEAD_RY),
            StemDirection::Up => self.top_y() - NOTEHEAD_RY,
            StemDirection::Down if stem_there => self.stem_end_y.max(self.bottom_y() + NOTEHEAD_RY),
            StemDirection::Down => self.bottom_y() + NOTEHEAD_RY,
        }
    }
}

fn stem_x(direction: StemDirection) -> f64 {
    match direction {
        StemDirection::Up => NOTEHEAD_RX - STEM_INSET,
        StemDirection::Down => -(NOTEHEAD_RX - STEM_INSET),
    }
}

/// Lay out the pitched notes of `event`. Returns `None` for rests and for
/// events with no parseable pitch.
pub fn chord_layout(
    event: &Event,
    clef: Clef,
    forced: Option<StemDirection>,
) -> Option<ChordLayout> {
    if event.is_rest {
        return None;
    }
    let mut noteheads: Vec<NoteHead> = event
        .pitched_notes()
        .filter_map(|(note, p)| {
            let pitch: Pitch = p.parse().ok()?;
            let position = staff_position(&pitch, clef);
            Some(NoteHead {
                note_id: note.id.clone(),
                y: STAFF_HEIGHT - position as f64 * STAFF_STEP,
                position,
                x_offset: 0.0,
            })
        })
        .collect();
    if noteheads.is_empty() {
        return None;
    }
    noteheads.sort_by(|a, b| b.position.cmp(&a.position));

    let direction = forced.unwrap_or_else(|| {
        let farthest = noteheads.iter().fold(&noteheads[0], |far, n| {
            if (n.y - MIDDLE_LINE_Y).abs() > (far.y - MIDDLE_LINE_Y).abs() {
                n
            } else {
                far
            }
        });
        StemDirection::for_y(farthest.y)
    });

    let has_seconds = shift_seconds(&mut noteheads, direction);
    let ledger_lines = ledger_lines(&noteheads);
    let has_stem = event.duration.has_stem();

    let top = noteheads[0].y;
    let bottom = noteheads[noteheads.len() - 1].y;
    let length = stem_length(event.duration);
    let (stem_base_y, stem_end_y) = match direction {
        StemDirection::Up => (bottom, top - length),
        StemDirection::Down => (top, bottom + length),
    };

    Some(ChordLayout {
        noteheads,
        direction,
        stem_x: stem_x(direction),
        stem_base_y,
        stem_end_y,
        has_stem,
        has_seconds,
        ledger_lines,
    })
}

/// Shift noteheads a second away from their neighbour. Stem up walks from
/// the bottom and displaces the upper note; stem down walks from the top and
/// displaces the lower note. In a cluster the shift alternates.
fn shift_seconds(noteheads: &mut [NoteHead], direction: StemDirection) -> bool {
    let n = noteheads.len();
    let order: Vec<usize> = match direction {
        StemDirection::Up => (0..n).rev().collect(),
        StemDirection::Down => (0..n).collect(),
    };
    let mut any = false;
    let mut previous_shifted = false;
    for pair in order.windows(2) {
        let (anchor, next) = (pair[0], pair[1]);
        let second = (noteheads[anchor].position - noteheads[next].position).abs() == 1;
        if second && !previous_shifted {
            noteheads[next].x_offset = SECOND_SHIFT;
            previous_shifted = true;
            any = true;
        } else {
            previous_shifted = false;
        }
    }
    any
}

fn ledger_lines(noteheads: &[NoteHead]) -> Vec<LedgerLine> {
    let span = |filter: &dyn Fn(&NoteHead) -> bool| {
        let shifted = noteheads.iter().filter(|n| filter(n)).any(|n| n.x_offset != 0.0);
        let right = if shifted { SECOND_SHIFT } else { 0.0 };
        (-NOTEHEAD_RX - LEDGER_LINE_EXTEND, right + NOTEHEAD_RX + LEDGER_LINE_EXTEND)
    };

    let mut lines = Vec::new();
    let top = noteheads.first().map_or(0.0, |n| n.y);
    if top < 0.0 {
        let mut y = -STAFF_LINE_SPACING;
        while y >= top - 1.0 {
            let (x_start, x_end) = span(&|n: &NoteHead| n.y <= y + STAFF_STEP);
            lines.push(LedgerLine { y, x_start, x_end });
            y -= STAFF_LINE_SPACING;
        }
    }
    let bottom = noteheads.last().map_or(STAFF_HEIGHT, |n| n.y);
    if bottom > STAFF_HEIGHT {
        let mut y = STAFF_HEIGHT + STAFF_LINE_SPACING;
        while y <= bottom + 1.0 {
            let (x_start, x_end) = span(&|n: &NoteHead| n.y >= y - STAFF_STEP);
            lines.push(LedgerLine { y, x_start, x_end });
            y += STAFF_LINE_SPACING;
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DurationKind::*;

    fn layout(pitches: &[&str]) -> ChordLayout {
        chord_layout(&Event::chord(Quarter, pitches), Clef::Treble, None).unwrap()
    }

    #[test]
    fn treble_and_bass_reference_lines() {
        let b4: Pitch = "B4".parse().unwrap();
        assert_eq!(pitch_to_staff_y(&b4, Clef::Treble), MIDDLE_LINE_Y);
        let d3: Pitch = "D3".parse().unwrap();
        assert_eq!(pitch_to_staff_y(&d3, Clef::Bass), MIDDLE_LINE_Y);
        let c4: Pitch = "C4".parse().unwrap();
        assert_eq!(pitch_to_staff_y(&c4, Clef::Alto), MIDDLE_LINE_Y);
        assert_eq!(pitch_to_staff_y(&c4, Clef::Treble), 50.0);
    }

    #[test]
    fn stem_direction_follows_farthest_note() {
        assert_eq!(layout(&["B4"]).direction, StemDirection::Down);
        assert_eq!(layout(&["A4"]).direction, StemDirection::Up);
        // E4 sits four steps below the middle line, D5 two above.
        assert_eq!(layout(&["E4", "D5"]).direction, StemDirection::Up);
        assert_eq!(layout(&["A4", "F5"]).direction, StemDirection::Down);
    }

    #[test]
    fn second_shifts_upper_note_when_stem_up() {
        let chord = layout(&["F4", "G4"]);
        assert_eq!(chord.direction, StemDirection::Up);
        assert!(chord.has_seconds);
        // Sorted top to bottom: G4 then F4.
        assert_eq!(chord.noteheads[0].x_offset, SECOND_SHIFT);
        assert_eq!(chord.noteheads[1].x_offset, 0.0);
    }

    #[test]
    fn second_shifts_lower_note_when_stem_down() {
        let chord = layout(&["D5", "E5"]);
        assert_eq!(chord.direction, StemDirection::Down);
        assert_eq!(chord.noteheads[0].x_offset, 0.0);
        assert_eq!(chord.noteheads[1].x_offset, SECOND_SHIFT);
    }

    #[test]
    fn ledger_lines_below_treble_staff() {
        let chord = layout(&["A3"]);
        let ys: Vec<f64> = chord.ledger_lines.iter().map(|l| l.y).collect();
        assert_eq!(ys, vec![50.0, 60.0]);
    }

    #[test]
    fn rests_have_no_chord_layout() {
        assert!(chord_layout(&Event::rest(Quarter, false), Clef::Treble, None).is_none());
    }
}
