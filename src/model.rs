//! Data model for an editable score.
//!
//! The tree is Score → Staff → Measure → Event → Note. Staves and measures
//! sit behind `Arc` so a new revision shares every subtree it did not touch;
//! [`Score::staff_mut`] and [`Score::measure_mut`] are the copy-on-write
//! paths every command goes through.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::ids::fresh_id;

/// Symbolic note value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationKind {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
    SixtyFourth,
}

/// Displayed accidental.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Accidental {
    DoubleFlat,
    Flat,
    Natural,
    Sharp,
    DoubleSharp,
}

impl Accidental {
    /// Chromatic alteration in semitones.
    pub fn alter(self) -> i8 {
        match self {
            Accidental::DoubleFlat => -2,
            Accidental::Flat => -1,
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::DoubleSharp => 2,
        }
    }

    pub fn from_alter(alter: i8) -> Option<Accidental> {
        match alter {
            -2 => Some(Accidental::DoubleFlat),
            -1 => Some(Accidental::Flat),
            0 => Some(Accidental::Natural),
            1 => Some(Accidental::Sharp),
            2 => Some(Accidental::DoubleSharp),
            _ => None,
        }
    }
}

/// Clef of a staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Clef {
    #[default]
    Treble,
    Bass,
    Alto,
    Tenor,
}

/// Key signature as a position on the circle of fifths
/// (positive = sharps, negative = flats).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "KeyRepr", into = "String")]
pub struct KeySignature {
    pub fifths: i32,
}

const MAJOR_KEYS: [&str; 15] = [
    "Cb", "Gb", "Db", "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E", "B", "F#", "C#",
];
const MINOR_KEYS: [&str; 15] = [
    "Abm", "Ebm", "Bbm", "Fm", "Cm", "Gm", "Dm", "Am", "Em", "Bm", "F#m", "C#m", "G#m", "D#m",
    "A#m",
];

impl KeySignature {
    pub fn new(fifths: i32) -> Self {
        KeySignature { fifths }
    }

    /// Parse a key name such as `"Bb"`, `"F#"` or `"Em"`.
    pub fn parse(name: &str) -> Result<Self, EngineError> {
        let name = name.trim();
        let lookup = |table: &[&str; 15]| table.iter().position(|k| *k == name);
        lookup(&MAJOR_KEYS)
            .or_else(|| lookup(&MINOR_KEYS))
            .map(|i| KeySignature::new(i as i32 - 7))
            .ok_or_else(|| EngineError::InvalidKeySignature(name.to_string()))
    }

    /// Major-key name for this signature.
    pub fn name(&self) -> &'static str {
        let idx = (self.fifths.clamp(-7, 7) + 7) as usize;
        MAJOR_KEYS[idx]
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeyRepr {
    Fifths(i32),
    Name(String),
}

impl TryFrom<KeyRepr> for KeySignature {
    type Error = EngineError;

    fn try_from(repr: KeyRepr) -> Result<Self, Self::Error> {
        match repr {
            KeyRepr::Fifths(f) if (-7..=7).contains(&f) => Ok(KeySignature::new(f)),
            KeyRepr::Fifths(f) => Err(EngineError::InvalidKeySignature(f.to_string())),
            KeyRepr::Name(name) => KeySignature::parse(&name),
        }
    }
}

impl From<KeySignature> for String {
    fn from(k: KeySignature) -> Self {
        k.name().to_string()
    }
}

/// Time signature, serialized as `"beats/beatType"`.
///
/// Only [`TimeSignature::new`] and [`TimeSignature::parse`] build one, so
/// every value has a non-zero measure capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSignature {
    /// Numerator (e.g., 3 in 3/4)
    beats: u32,
    /// Denominator (e.g., 4 in 3/4)
    beat_type: u32,
}

impl TimeSignature {
    pub const COMMON: TimeSignature = TimeSignature { beats: 4, beat_type: 4 };

    pub fn new(beats: u32, beat_type: u32) -> Result<Self, EngineError> {
        let valid_type = beat_type.is_power_of_two() && beat_type <= 64;
        if beats == 0 || beats > 32 || !valid_type {
            return Err(EngineError::InvalidTimeSignature(format!("{beats}/{beat_type}")));
        }
        Ok(TimeSignature { beats, beat_type })
    }

    pub fn parse(s: &str) -> Result<Self, EngineError> {
        let err = || EngineError::InvalidTimeSignature(s.to_string());
        let (b, t) = s.trim().split_once('/').ok_or_else(err)?;
        let beats = b.trim().parse().map_err(|_| err())?;
        let beat_type = t.trim().parse().map_err(|_| err())?;
        TimeSignature::new(beats, beat_type)
    }

    pub fn beats(&self) -> u32 {
        self.beats
    }

    pub fn beat_type(&self) -> u32 {
        self.beat_type
    }

    /// 3/8, 6/8, 9/8, 12/8 and friends: beats grouped in threes.
    pub fn is_compound(&self) -> bool {
        self.beat_type >= 8 && self.beats % 3 == 0
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature::COMMON
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats, self.beat_type)
    }
}

impl TryFrom<String> for TimeSignature {
    type Error = EngineError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        TimeSignature::parse(&s)
    }
}

impl From<TimeSignature> for String {
    fn from(ts: TimeSignature) -> Self {
        ts.to_string()
    }
}

/// Tuplet membership of one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tuplet {
    /// `[actual, normal]`: `actual` notes in the time of `normal`
    pub ratio: [u32; 2],
    /// Number of events in the group
    pub group_size: u32,
    /// 0-based index of this event within its group
    pub position: u32,
    /// Note value the ratio is counted in; defaults to the group's first event
    #[serde(default)]
    pub base_duration: Option<DurationKind>,
    /// Group id shared by every member
    #[serde(default)]
    pub id: Option<String>,
}

impl Tuplet {
    pub fn actual(&self) -> u32 {
        self.ratio[0]
    }

    pub fn normal(&self) -> u32 {
        self.ratio[1]
    }
}

/// A single notehead (or the rest placeholder when `pitch` is `None`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    /// Scientific pitch such as `"C4"`, `"F#5"`, `"Bb3"`; `None` for a rest
    pub pitch: Option<String>,
    /// Explicitly requested accidental, shown even when the key implies it
    #[serde(default)]
    pub accidental: Option<Accidental>,
    /// Tied to the same pitch in the following event
    #[serde(default)]
    pub tied: bool,
}

impl Note {
    pub fn new(pitch: impl Into<String>) -> Self {
        Note::with_id(fresh_id(), Some(pitch.into()))
    }

    pub fn rest() -> Self {
        Note::with_id(fresh_id(), None)
    }

    pub fn with_id(id: impl Into<String>, pitch: Option<String>) -> Self {
        Note {
            id: id.into(),
            pitch,
            accidental: None,
            tied: false,
        }
    }
}

/// One musical moment: a note, a chord or a rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub duration: DurationKind,
    #[serde(default)]
    pub dotted: bool,
    pub notes: Vec<Note>,
    #[serde(default)]
    pub is_rest: bool,
    #[serde(default)]
    pub tuplet: Option<Tuplet>,
}

impl Event {
    pub fn new(duration: DurationKind, dotted: bool, notes: Vec<Note>) -> Self {
        Event {
            id: fresh_id(),
            duration,
            dotted,
            notes,
            is_rest: false,
            tuplet: None,
        }
    }

    /// A single-note event.
    pub fn note(duration: DurationKind, pitch: impl Into<String>) -> Self {
        Event::new(duration, false, vec![Note::new(pitch)])
    }

    pub fn chord(duration: DurationKind, pitches: &[&str]) -> Self {
        Event::new(duration, false, pitches.iter().map(|p| Note::new(*p)).collect())
    }

    pub fn rest(duration: DurationKind, dotted: bool) -> Self {
        Event {
            is_rest: true,
            ..Event::new(duration, dotted, vec![Note::rest()])
        }
    }

    pub fn dotted(mut self) -> Self {
        self.dotted = true;
        self
    }

    pub fn is_chord(&self) -> bool {
        self.notes.len() > 1
    }

    pub fn note_index(&self, note_id: &str) -> Option<usize> {
        self.notes.iter().position(|n| n.id == note_id)
    }

    /// Pitched notes only.
    pub fn pitched_notes(&self) -> impl Iterator<Item = (&Note, &str)> {
        self.notes
            .iter()
            .filter_map(|n| n.pitch.as_deref().map(|p| (n, p)))
    }

    fn check(&self) -> Result<(), String> {
        if self.notes.is_empty() {
            return Err("event has no notes".into());
        }
        if self.is_rest && (self.notes.len() != 1 || self.notes[0].pitch.is_some()) {
            return Err("rest must hold exactly one unpitched note".into());
        }
        let mut seen = HashSet::new();
        if !self.notes.iter().all(|n| seen.insert(n.id.as_str())) {
            return Err("duplicate note id".into());
        }
        if let Some(t) = &self.tuplet {
            if t.actual() == 0 || t.normal() == 0 {
                return Err("tuplet ratio must be positive".into());
            }
        }
        Ok(())
    }
}

/// A single measure (bar) of one staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    pub id: String,
    pub events: Vec<Event>,
    /// Incomplete first measure (anacrusis)
    #[serde(default)]
    pub is_pickup: bool,
}

impl Measure {
    pub fn new() -> Self {
        Measure::with_id(fresh_id())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Measure {
            id: id.into(),
            events: Vec::new(),
            is_pickup: false,
        }
    }

    pub fn with_events(events: Vec<Event>) -> Self {
        Measure {
            events,
            ..Measure::new()
        }
    }

    pub fn event_index(&self, event_id: &str) -> Option<usize> {
        self.events.iter().position(|e| e.id == event_id)
    }

    pub fn event(&self, event_id: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.id == event_id)
    }

    pub fn event_mut(&mut self, event_id: &str) -> Option<&mut Event> {
        self.events.iter_mut().find(|e| e.id == event_id)
    }
}

impl Default for Measure {
    fn default() -> Self {
        Self::new()
    }
}

/// One staff; every staff of a score has index-aligned measures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: String,
    #[serde(default)]
    pub clef: Clef,
    #[serde(default)]
    pub key_signature: KeySignature,
    pub measures: Vec<Arc<Measure>>,
}

impl Staff {
    /// A staff with `measure_count` empty measures.
    pub fn new(clef: Clef, key_signature: KeySignature, measure_count: usize) -> Self {
        Staff {
            id: fresh_id(),
            clef,
            key_signature,
            measures: (0..measure_count).map(|_| Arc::new(Measure::new())).collect(),
        }
    }
}

/// Top-level unit of persistence and undo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub time_signature: TimeSignature,
    #[serde(default)]
    pub key_signature: KeySignature,
    #[serde(default = "default_bpm")]
    pub bpm: u32,
    pub staves: Vec<Arc<Staff>>,
}

pub(crate) fn default_bpm() -> u32 {
    120
}

impl Score {
    /// A single treble staff with one empty measure.
    pub fn new(
        title: impl Into<String>,
        time_signature: TimeSignature,
        key_signature: KeySignature,
    ) -> Self {
        Score {
            title: title.into(),
            time_signature,
            key_signature,
            bpm: default_bpm(),
            staves: vec![Arc::new(Staff::new(Clef::Treble, key_signature, 1))],
        }
    }

    /// Treble + bass staves with one empty measure each.
    pub fn grand_staff(
        title: impl Into<String>,
        time_signature: TimeSignature,
        key_signature: KeySignature,
    ) -> Self {
        let mut score = Score::new(title, time_signature, key_signature);
        score
            .staves
            .push(Arc::new(Staff::new(Clef::Bass, key_signature, 1)));
        score
    }

    /// Number of measures (taken from the first staff).
    pub fn measure_count(&self) -> usize {
        self.staves.first().map_or(0, |s| s.measures.len())
    }

    pub fn staff(&self, staff: usize) -> Option<&Staff> {
        self.staves.get(staff).map(|s| s.as_ref())
    }

    pub fn measure(&self, staff: usize, measure: usize) -> Option<&Measure> {
        self.staff(staff)
            .and_then(|s| s.measures.get(measure))
            .map(|m| m.as_ref())
    }

    pub fn event(&self, staff: usize, measure: usize, event_id: &str) -> Option<&Event> {
        self.measure(staff, measure).and_then(|m| m.event(event_id))
    }

    /// Copy-on-write access to a staff: clones it only if another revision
    /// still shares it.
    pub fn staff_mut(&mut self, staff: usize) -> Option<&mut Staff> {
        self.staves.get_mut(staff).map(Arc::make_mut)
    }

    /// Copy-on-write access to a measure: clones the staff and the measure
    /// only if another revision still shares them.
    pub fn measure_mut(&mut self, staff: usize, measure: usize) -> Option<&mut Measure> {
        self.staff_mut(staff)
            .and_then(|s| s.measures.get_mut(measure))
            .map(Arc::make_mut)
    }

    /// Check every structural invariant a command result must satisfy.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.staves.is_empty() {
            return Err(EngineError::InvalidStructure("score has no staves".into()));
        }
        let expected = self.measure_count();
        if expected == 0 {
            return Err(EngineError::InvalidStructure("score has no measures".into()));
        }
        for (si, staff) in self.staves.iter().enumerate() {
            if staff.measures.len() != expected {
                return Err(EngineError::MisalignedStaves {
                    staff: si,
                    expected,
                    found: staff.measures.len(),
                });
            }
            for (mi, measure) in staff.measures.iter().enumerate() {
                validate_measure(si, mi, measure)?;
            }
        }
        Ok(())
    }
}

fn validate_measure(staff: usize, measure: usize, m: &Measure) -> Result<(), EngineError> {
    let invalid = |event: &Event, message: String| EngineError::InvalidEvent {
        staff,
        measure,
        event_id: event.id.clone(),
        message,
    };

    let mut finished_groups: HashSet<&str> = HashSet::new();
    let mut open_group: Option<&str> = None;

    for event in &m.events {
        event.check().map_err(|msg| invalid(event, msg))?;

        let group = event.tuplet.as_ref().and_then(|t| t.id.as_deref());
        if open_group.is_some() && open_group != group {
            finished_groups.extend(open_group.take());
        }
        if let (Some(t), Some(id)) = (&event.tuplet, group) {
            if finished_groups.contains(id) {
                return Err(invalid(event, format!("tuplet group '{id}' is not contiguous")));
            }
            let starts_group = open_group.is_none();
            if starts_group != (t.position == 0) {
                return Err(invalid(event, format!("tuplet group '{id}' must start at position 0")));
            }
            open_group = Some(id);
        }
    }
    Ok(())
}
