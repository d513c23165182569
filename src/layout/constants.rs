//! Shared constants for the layout engine (all in SVG user units).

use crate::model::DurationKind;

// ── Page & margins ──────────────────────────────────────────────────
pub(crate) const DEFAULT_PAGE_WIDTH: f64 = 820.0;
pub(crate) const PAGE_MARGIN_LEFT: f64 = 50.0;
pub(crate) const PAGE_MARGIN_RIGHT: f64 = 30.0;
pub(crate) const PAGE_MARGIN_TOP: f64 = 30.0;

// ── Staff dimensions ────────────────────────────────────────────────
pub(crate) const STAFF_LINE_SPACING: f64 = 10.0; // distance between staff lines
pub(crate) const STAFF_HEIGHT: f64 = 40.0; // 5 lines, 4 spaces
pub(crate) const STAFF_STEP: f64 = STAFF_LINE_SPACING / 2.0; // line to adjacent space
pub(crate) const MIDDLE_LINE_Y: f64 = 20.0;
pub(crate) const SYSTEM_SPACING: f64 = 90.0; // vertical space between systems
pub(crate) const GRAND_STAFF_GAP: f64 = 60.0; // vertical gap between staves of one system

// ── Prefix widths ───────────────────────────────────────────────────
pub(crate) const CLEF_SPACE: f64 = 32.0;
pub(crate) const KEY_SIG_SHARP_SPACE: f64 = 10.0;
pub(crate) const KEY_SIG_FLAT_SPACE: f64 = 8.0;
pub(crate) const TIME_SIG_SPACE: f64 = 24.0;

// ── Note dimensions ─────────────────────────────────────────────────
pub(crate) const NOTEHEAD_RX: f64 = 5.5; // notehead ellipse x-radius
pub(crate) const NOTEHEAD_RY: f64 = 4.0; // notehead ellipse y-radius
pub(crate) const STEM_LENGTH: f64 = 30.0;
pub(crate) const STEM_INSET: f64 = 1.0; // stem sits this far inside the notehead edge
pub(crate) const LEDGER_LINE_EXTEND: f64 = 5.0;
pub(crate) const SECOND_SHIFT: f64 = 2.0 * NOTEHEAD_RX - 1.0; // notehead displaced by a second

// ── Beams ───────────────────────────────────────────────────────────
pub(crate) const BEAM_THICKNESS: f64 = 4.0;
pub(crate) const BEAM_SPACING: f64 = BEAM_THICKNESS + 3.0; // primary → secondary offset
pub(crate) const BEAM_EDGE_EXTENSION: f64 = 0.6;
pub(crate) const MAX_BEAM_SLOPE: f64 = 0.5;
pub(crate) const MIN_BEAM_STEM: f64 = 18.0;

// ── Tuplets ─────────────────────────────────────────────────────────
pub(crate) const TUPLET_PADDING: f64 = 8.0; // bracket clearance from notes
pub(crate) const TUPLET_RADIUS: f64 = NOTEHEAD_RX + 2.0; // bracket overhang past end notes
pub(crate) const MAX_TUPLET_SLOPE: f64 = 0.3;
pub(crate) const TUPLET_HOOK: f64 = 5.0;
pub(crate) const TUPLET_NUMBER_OFFSET: f64 = 4.0;

// ── Measure spacing ─────────────────────────────────────────────────
pub(crate) const SPACING_UNIT: f64 = 12.0; // width per sqrt(quant)
pub(crate) const MEASURE_LEFT_PAD: f64 = 16.0;
pub(crate) const MEASURE_RIGHT_PAD: f64 = 12.0;
pub(crate) const ACCIDENTAL_PAD: f64 = 10.0;
pub(crate) const SECOND_PAD: f64 = SECOND_SHIFT;
pub(crate) const DOT_PAD: f64 = 6.0;
pub(crate) const MIN_MEASURE_WIDTH: f64 = 38.0;
pub(crate) const EMPTY_MEASURE_WIDTH: f64 = 80.0;
pub(crate) const EVENT_HIT_RADIUS: f64 = NOTEHEAD_RX + 4.0;

/// Legible minimum width of an event, as a multiple of `SPACING_UNIT`.
pub(crate) fn min_width_factor(kind: DurationKind) -> f64 {
    match kind {
        DurationKind::Whole => 3.2,
        DurationKind::Half => 2.6,
        DurationKind::Quarter => 2.2,
        DurationKind::Eighth => 2.0,
        DurationKind::Sixteenth | DurationKind::ThirtySecond | DurationKind::SixtyFourth => 1.8,
    }
}
