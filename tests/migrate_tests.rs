//! Document load/save tests, including the staff-less legacy shape.

use pretty_assertions::assert_eq;
use scorekit::{
    layout_score_json, load_score_json, score_to_json, Clef, DurationKind, EngineError, Event,
    KeySignature, Score, TimeSignature,
};

const LEGACY: &str = r#"{
    "title": "Old Tune",
    "timeSignature": "3/4",
    "keySignature": "Bb",
    "measures": [
        {
            "id": "m1",
            "events": [
                { "id": "e1", "duration": "half", "notes": [{ "id": "n1", "pitch": "Bb4" }] },
                { "id": "e2", "duration": "quarter", "isRest": true, "notes": [{ "id": "n2", "pitch": null }] }
            ]
        }
    ]
}"#;

#[test]
fn legacy_documents_become_one_staff() {
    let score = load_score_json(LEGACY).expect("legacy document should load");

    assert_eq!(score.title, "Old Tune");
    assert_eq!(score.time_signature, TimeSignature::new(3, 4).unwrap());
    assert_eq!(score.key_signature, KeySignature::new(-2));
    assert_eq!(score.bpm, 120);
    assert_eq!(score.staves.len(), 1);

    let staff = &score.staves[0];
    assert_eq!(staff.clef, Clef::Treble);
    assert_eq!(staff.key_signature, KeySignature::new(-2));
    assert_eq!(staff.measures[0].id, "m1");
    assert_eq!(staff.measures[0].events.len(), 2);
    assert!(staff.measures[0].events[1].is_rest);
}

#[test]
fn legacy_clef_and_numeric_key() {
    let json = r#"{ "clef": "bass", "keySignature": 3, "measures": [] }"#;
    let score = load_score_json(json).unwrap();
    assert_eq!(score.staves[0].clef, Clef::Bass);
    assert_eq!(score.key_signature, KeySignature::new(3));
    assert_eq!(score.measure_count(), 1, "an empty document still gets a measure");
}

#[test]
fn save_then_load_is_lossless() {
    let six_eight = TimeSignature::new(6, 8).unwrap();
    let mut score = Score::grand_staff("Duet", six_eight, KeySignature::new(1));
    score.measure_mut(0, 0).unwrap().events =
        vec![Event::note(DurationKind::Eighth, "F#5").dotted()];

    let json = score_to_json(&score).unwrap();
    assert!(json.contains("\"timeSignature\": \"6/8\""));
    assert!(json.contains("\"keySignature\": \"G\""));

    let loaded = load_score_json(&json).unwrap();
    assert_eq!(loaded, score);
}

#[test]
fn bad_documents_are_errors() {
    assert!(matches!(load_score_json("{ not json"), Err(EngineError::Json(_))));
    assert!(matches!(
        load_score_json(r#"{ "title": "Nothing" }"#),
        Err(EngineError::InvalidStructure(_))
    ));
    assert!(load_score_json(r#"{ "timeSignature": "3/5", "measures": [] }"#).is_err());
    assert!(load_score_json(r#"{ "keySignature": "H", "measures": [] }"#).is_err());

    let misaligned = r#"{
        "staves": [
            { "id": "a", "measures": [{ "id": "m1", "events": [] }, { "id": "m2", "events": [] }] },
            { "id": "b", "measures": [{ "id": "m3", "events": [] }] }
        ]
    }"#;
    assert_eq!(
        load_score_json(misaligned),
        Err(EngineError::MisalignedStaves { staff: 1, expected: 2, found: 1 })
    );
}

#[test]
fn layout_straight_from_json() {
    let out = layout_score_json(LEGACY, Some(600.0)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["pageWidth"], 600.0);
    assert_eq!(value["systems"].as_array().map(Vec::len), Some(1));

    assert!(layout_score_json("[]", None).is_err());
}
