//! Duration model: symbolic note values ⇄ integer quants.
//!
//! One quant is a 64th note, so a 4/4 measure holds 64 quants. Every
//! capacity check, beaming decision and spacing computation works on
//! these integers.

use num_rational::Ratio;
use serde::{Deserialize, Serialize};

use crate::model::{DurationKind, Event, TimeSignature, Tuplet};

/// Quants in a whole note.
pub const QUANTS_PER_WHOLE: u32 = 64;

impl DurationKind {
    /// Every duration, longest first.
    pub const ALL: [DurationKind; 7] = [
        DurationKind::Whole,
        DurationKind::Half,
        DurationKind::Quarter,
        DurationKind::Eighth,
        DurationKind::Sixteenth,
        DurationKind::ThirtySecond,
        DurationKind::SixtyFourth,
    ];

    /// Undotted length in quants.
    pub fn base_quants(self) -> u32 {
        match self {
            DurationKind::Whole => 64,
            DurationKind::Half => 32,
            DurationKind::Quarter => 16,
            DurationKind::Eighth => 8,
            DurationKind::Sixteenth => 4,
            DurationKind::ThirtySecond => 2,
            DurationKind::SixtyFourth => 1,
        }
    }

    /// Number of flags (and therefore beams) drawn for this value.
    pub fn flag_count(self) -> u32 {
        match self {
            DurationKind::Eighth => 1,
            DurationKind::Sixteenth => 2,
            DurationKind::ThirtySecond => 3,
            DurationKind::SixtyFourth => 4,
            _ => 0,
        }
    }

    /// Eighth or shorter.
    pub fn is_flagged(self) -> bool {
        self.flag_count() > 0
    }

    pub fn has_stem(self) -> bool {
        self != DurationKind::Whole
    }
}

/// Exact nominal length (dot applied, tuplet not applied).
fn nominal(duration: DurationKind, dotted: bool) -> Ratio<u32> {
    let base = Ratio::from_integer(duration.base_quants());
    if dotted {
        base * Ratio::new(3, 2)
    } else {
        base
    }
}

/// Length in quants of a `(duration, dotted, tuplet)` combination.
///
/// Tuplet members use the cumulative-floor rule: the member at position `p`
/// gets `floor((p+1)·q·n/a) − floor(p·q·n/a)`, so a uniform group of
/// `groupSize` members always sums to exactly `floor(groupSize·q·n/a)`
/// (three triplet quarters are 10 + 11 + 11 = 32). A dotted 64th floors to 1.
pub fn quants_of(duration: DurationKind, dotted: bool, tuplet: Option<&Tuplet>) -> u32 {
    let q = nominal(duration, dotted);
    match tuplet {
        Some(t) if t.actual() > 0 && t.normal() > 0 => {
            let scaled = q * Ratio::new(t.normal(), t.actual());
            let p = t.position;
            let end = (scaled * (p + 1)).floor().to_integer();
            let start = (scaled * p).floor().to_integer();
            end - start
        }
        _ => q.floor().to_integer(),
    }
}

/// Length of one event in quants.
pub fn event_quants(event: &Event) -> u32 {
    quants_of(event.duration, event.dotted, event.tuplet.as_ref())
}

/// Sum of event lengths.
pub fn total_quants<'a, I>(events: I) -> u32
where
    I: IntoIterator<Item = &'a Event>,
{
    events.into_iter().map(event_quants).sum()
}

/// Quant capacity of a full measure in `ts`.
pub fn capacity(ts: &TimeSignature) -> u32 {
    QUANTS_PER_WHOLE * ts.beats() / ts.beat_type()
}

/// Span, in quants, that a beam of `kind` notes may not cross.
///
/// Simple meters break at every beat, compound meters at every dotted beat.
/// Eighths in 4/4 group by half measure.
pub fn beam_span(ts: &TimeSignature, kind: DurationKind) -> u32 {
    let beat = (QUANTS_PER_WHOLE / ts.beat_type()).max(1);
    if ts.is_compound() {
        beat * 3
    } else if *ts == TimeSignature::COMMON && kind == DurationKind::Eighth {
        capacity(ts) / 2
    } else {
        beat
    }
}

/// One piece of a decomposed length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationPiece {
    pub duration: DurationKind,
    pub dotted: bool,
}

impl DurationPiece {
    pub fn quants(&self) -> u32 {
        quants_of(self.duration, self.dotted, None)
    }
}

/// Writable lengths, largest first. The smallest entry is one quant, so the
/// greedy walk always terminates, and for this table greedy yields the
/// fewest pieces for every length up to a dotted whole.
const DECOMPOSITION_TABLE: [(u32, DurationKind, bool); 13] = [
    (96, DurationKind::Whole, true),
    (64, DurationKind::Whole, false),
    (48, DurationKind::Half, true),
    (32, DurationKind::Half, false),
    (24, DurationKind::Quarter, true),
    (16, DurationKind::Quarter, false),
    (12, DurationKind::Eighth, true),
    (8, DurationKind::Eighth, false),
    (6, DurationKind::Sixteenth, true),
    (4, DurationKind::Sixteenth, false),
    (3, DurationKind::ThirtySecond, true),
    (2, DurationKind::ThirtySecond, false),
    (1, DurationKind::SixtyFourth, false),
];

/// Split `quants` into writable note values, largest first.
pub fn decompose(mut quants: u32) -> Vec<DurationPiece> {
    let mut pieces = Vec::new();
    for &(value, duration, dotted) in &DECOMPOSITION_TABLE {
        while quants >= value {
            pieces.push(DurationPiece { duration, dotted });
            quants -= value;
        }
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fewest_pieces(q: u32) -> usize {
        let mut best = vec![usize::MAX; q as usize + 1];
        best[0] = 0;
        for n in 1..=q as usize {
            for &(value, _, _) in &DECOMPOSITION_TABLE {
                let v = value as usize;
                if v <= n && best[n - v] != usize::MAX {
                    best[n] = best[n].min(best[n - v] + 1);
                }
            }
        }
        best[q as usize]
    }

    #[test]
    fn base_values() {
        assert_eq!(quants_of(DurationKind::Whole, false, None), 64);
        assert_eq!(quants_of(DurationKind::Quarter, true, None), 24);
        assert_eq!(quants_of(DurationKind::SixtyFourth, false, None), 1);
        assert_eq!(quants_of(DurationKind::SixtyFourth, true, None), 1);
    }

    #[test]
    fn decompose_is_minimal_up_to_a_measure() {
        for q in 1..=64 {
            let pieces = decompose(q);
            let sum: u32 = pieces.iter().map(|p| p.quants()).sum();
            assert_eq!(sum, q, "pieces of {q} must sum back");
            assert_eq!(pieces.len(), fewest_pieces(q), "decomposition of {q} is not minimal");
        }
    }

    #[test]
    fn decompose_zero_is_empty() {
        assert!(decompose(0).is_empty());
    }

    #[test]
    fn beam_spans() {
        let common = TimeSignature::COMMON;
        assert_eq!(beam_span(&common, DurationKind::Eighth), 32);
        assert_eq!(beam_span(&common, DurationKind::Sixteenth), 16);
        let six_eight = TimeSignature::new(6, 8).unwrap();
        assert_eq!(beam_span(&six_eight, DurationKind::Eighth), 24);
        let three_four = TimeSignature::new(3, 4).unwrap();
        assert_eq!(beam_span(&three_four, DurationKind::Eighth), 16);
        let three_eight = TimeSignature::new(3, 8).unwrap();
        assert_eq!(beam_span(&three_eight, DurationKind::Eighth), 24);
    }
}
