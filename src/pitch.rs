//! Pitch spelling, staff steps and transposition.
//!
//! Pitches are stored on notes as strings (`"C4"`, `"F#5"`, `"Bb3"`,
//! `"Ebb2"`, `"F##4"`); this module is the only place that parses them.

use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;
use crate::model::KeySignature;

const LETTERS: [char; 7] = ['C', 'D', 'E', 'F', 'G', 'A', 'B'];
const LETTER_SEMITONES: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];
/// Letters (as indices into `LETTERS`) in the order sharps are added.
const SHARP_ORDER: [usize; 7] = [3, 0, 4, 1, 5, 2, 6];
/// Letters in the order flats are added.
const FLAT_ORDER: [usize; 7] = [6, 2, 5, 1, 4, 0, 3];

/// A spelled pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pitch {
    /// 0 = C … 6 = B
    pub letter: u8,
    /// Semitone alteration, −2 ..= 2
    pub alter: i8,
    /// Scientific octave (middle C = C4)
    pub octave: i32,
}

impl Pitch {
    pub fn new(letter: u8, alter: i8, octave: i32) -> Self {
        Pitch {
            letter: letter % 7,
            alter,
            octave,
        }
    }

    /// Diatonic position counted in staff steps from C0.
    pub fn diatonic_index(&self) -> i32 {
        self.octave * 7 + self.letter as i32
    }

    /// MIDI note number (C4 = 60).
    pub fn midi(&self) -> i32 {
        (self.octave + 1) * 12 + LETTER_SEMITONES[self.letter as usize] + self.alter as i32
    }

    pub fn letter_char(&self) -> char {
        LETTERS[self.letter as usize]
    }

    /// Move by `steps` scale degrees; the new note takes the alteration the
    /// key signature gives its letter.
    pub fn transpose_diatonic(&self, steps: i32, key: KeySignature) -> Pitch {
        let idx = self.diatonic_index() + steps;
        let letter = idx.rem_euclid(7) as u8;
        let octave = idx.div_euclid(7);
        Pitch::new(letter, key_alteration(key, letter), octave)
    }

    /// Move by `semitones` and respell for `key`.
    pub fn transpose_chromatic(&self, semitones: i32, key: KeySignature) -> Pitch {
        spell_midi(self.midi() + semitones, key)
    }
}

impl FromStr for Pitch {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || EngineError::InvalidPitch(s.to_string());
        let mut chars = s.trim().chars().peekable();

        let letter_ch = chars.next().ok_or_else(err)?.to_ascii_uppercase();
        let letter = LETTERS.iter().position(|&c| c == letter_ch).ok_or_else(err)? as u8;

        let mut alter: i8 = 0;
        while let Some(&c) = chars.peek() {
            match c {
                '#' => alter += 1,
                'b' => alter -= 1,
                _ => break,
            }
            chars.next();
        }
        if !(-2..=2).contains(&alter) {
            return Err(err());
        }

        let rest: String = chars.collect();
        let octave: i32 = rest.parse().map_err(|_| err())?;
        Ok(Pitch::new(letter, alter, octave))
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let acc = match self.alter {
            -2 => "bb",
            -1 => "b",
            1 => "#",
            2 => "##",
            _ => "",
        };
        write!(f, "{}{}{}", self.letter_char(), acc, self.octave)
    }
}

/// Alteration the key signature applies to `letter`.
pub fn key_alteration(key: KeySignature, letter: u8) -> i8 {
    let letter = (letter % 7) as usize;
    let count = key.fifths.unsigned_abs().min(7) as usize;
    if key.fifths > 0 && SHARP_ORDER[..count].contains(&letter) {
        1
    } else if key.fifths < 0 && FLAT_ORDER[..count].contains(&letter) {
        -1
    } else {
        0
    }
}

/// Whether `pitch` is a member of the key's major scale.
pub fn in_key(pitch: &Pitch, key: KeySignature) -> bool {
    key_alteration(key, pitch.letter) == pitch.alter
}

/// Spell a MIDI number, preferring scale members of `key`, then naturals,
/// then sharps in sharp keys (and C) or flats in flat keys.
pub fn spell_midi(midi: i32, key: KeySignature) -> Pitch {
    let pc = midi.rem_euclid(12);
    let preferred_alter = if key.fifths < 0 { -1 } else { 1 };

    let candidates = (0..7u8).filter_map(|letter| {
        let mut alter = pc - LETTER_SEMITONES[letter as usize];
        if alter > 6 {
            alter -= 12;
        } else if alter < -6 {
            alter += 12;
        }
        if !(-2..=2).contains(&alter) {
            return None;
        }
        let octave = (midi - alter - LETTER_SEMITONES[letter as usize]).div_euclid(12) - 1;
        Some(Pitch::new(letter, alter as i8, octave))
    });

    let rank = |p: &Pitch| {
        if in_key(p, key) {
            0
        } else if p.alter == 0 {
            1
        } else if p.alter as i32 == preferred_alter {
            2
        } else if p.alter.abs() == 1 {
            3
        } else {
            4
        }
    };

    candidates
        .min_by_key(|p| rank(p))
        .unwrap_or_else(|| Pitch::new(0, 0, midi.div_euclid(12) - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Pitch {
        s.parse().unwrap()
    }

    #[test]
    fn parse_and_format() {
        assert_eq!(p("C4").midi(), 60);
        assert_eq!(p("F#5").to_string(), "F#5");
        assert_eq!(p("Bb3").midi(), 58);
        assert_eq!(p("Ebb4").alter, -2);
        assert!("H4".parse::<Pitch>().is_err());
        assert!("C###4".parse::<Pitch>().is_err());
        assert!("C".parse::<Pitch>().is_err());
    }

    #[test]
    fn key_alterations() {
        let d_major = KeySignature::new(2);
        assert_eq!(key_alteration(d_major, 3), 1); // F#
        assert_eq!(key_alteration(d_major, 0), 1); // C#
        assert_eq!(key_alteration(d_major, 4), 0); // G
        let b_flat = KeySignature::new(-2);
        assert_eq!(key_alteration(b_flat, 6), -1); // Bb
        assert_eq!(key_alteration(b_flat, 2), -1); // Eb
        assert_eq!(key_alteration(b_flat, 5), 0); // A
    }

    #[test]
    fn diatonic_transposition_follows_key() {
        let g_major = KeySignature::new(1);
        assert_eq!(p("E4").transpose_diatonic(1, g_major).to_string(), "F#4");
        assert_eq!(p("B4").transpose_diatonic(1, g_major).to_string(), "C5");
        assert_eq!(p("C4").transpose_diatonic(-1, g_major).to_string(), "B3");
    }

    #[test]
    fn chromatic_transposition_respells() {
        let f_major = KeySignature::new(-1);
        assert_eq!(p("A4").transpose_chromatic(1, f_major).to_string(), "Bb4");
        let c_major = KeySignature::default();
        assert_eq!(p("F4").transpose_chromatic(1, c_major).to_string(), "F#4");
        assert_eq!(p("B4").transpose_chromatic(1, c_major).to_string(), "C5");
        let e_flat = KeySignature::new(-3);
        assert_eq!(p("D4").transpose_chromatic(1, e_flat).to_string(), "Eb4");
    }
}
