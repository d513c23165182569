//! Which accidentals a measure displays.
//!
//! Context is per measure and per letter+octave, seeded from the key
//! signature. A note shows an accidental when its alteration differs from
//! the running context or when it carries an explicit one; a note continuing
//! a tie from the previous event shows none.

use std::collections::HashMap;

use crate::model::{Accidental, Event, KeySignature};
use crate::pitch::{key_alteration, Pitch};

pub struct AccidentalContext {
    key: KeySignature,
    altered: HashMap<(u8, i32), i8>,
}

impl AccidentalContext {
    pub fn new(key: KeySignature) -> Self {
        AccidentalContext {
            key,
            altered: HashMap::new(),
        }
    }

    /// Alteration currently in force for the pitch's letter and octave.
    pub fn current(&self, pitch: &Pitch) -> i8 {
        self.altered
            .get(&(pitch.letter, pitch.octave))
            .copied()
            .unwrap_or_else(|| key_alteration(self.key, pitch.letter))
    }

    /// Accidental to display for `pitch`; updates the context.
    pub fn resolve(&mut self, pitch: &Pitch, explicit: Option<Accidental>) -> Option<Accidental> {
        if explicit.is_none() && pitch.alter == self.current(pitch) {
            return None;
        }
        self.altered.insert((pitch.letter, pitch.octave), pitch.alter);
        explicit.or_else(|| Accidental::from_alter(pitch.alter))
    }
}

/// Displayed accidental per note, indexed `[event][note]`.
pub fn measure_accidentals(events: &[Event], key: KeySignature) -> Vec<Vec<Option<Accidental>>> {
    let mut context = AccidentalContext::new(key);
    let mut tied_from_previous: Vec<Pitch> = Vec::new();

    events
        .iter()
        .map(|event| {
            let mut tied_here = Vec::new();
            let shown: Vec<Option<Accidental>> = event
                .notes
                .iter()
                .map(|note| {
                    let pitch: Pitch = note.pitch.as_deref()?.parse().ok()?;
                    if note.tied {
                        tied_here.push(pitch);
                    }
                    if tied_from_previous.contains(&pitch) && note.accidental.is_none() {
                        return None;
                    }
                    context.resolve(&pitch, note.accidental)
                })
                .collect();
            tied_from_previous = tied_here;
            shown
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DurationKind::Quarter;

    fn shown(pitches: &[&str], key: i32) -> Vec<Option<Accidental>> {
        let events: Vec<Event> = pitches.iter().map(|p| Event::note(Quarter, *p)).collect();
        measure_accidentals(&events, KeySignature::new(key))
            .into_iter()
            .map(|e| e[0])
            .collect()
    }

    #[test]
    fn accidental_carries_through_the_measure() {
        assert_eq!(
            shown(&["F#4", "F#4", "F4"], 0),
            vec![Some(Accidental::Sharp), None, Some(Accidental::Natural)]
        );
    }

    #[test]
    fn key_signature_seeds_the_context() {
        assert_eq!(shown(&["F#4", "F4"], 1), vec![None, Some(Accidental::Natural)]);
    }

    #[test]
    fn context_is_per_octave() {
        assert_eq!(
            shown(&["C#4", "C#5"], 0),
            vec![Some(Accidental::Sharp), Some(Accidental::Sharp)]
        );
    }

    #[test]
    fn tie_continuation_shows_nothing() {
        let mut first = Event::note(Quarter, "Bb4");
        first.notes[0].tied = true;
        let events = vec![first, Event::note(Quarter, "Bb4")];
        let shown = measure_accidentals(&events, KeySignature::new(0));
        assert_eq!(shown, vec![vec![Some(Accidental::Flat)], vec![None]]);
    }
}
