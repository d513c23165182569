//! Score JSON load/save.
//!
//! Older documents have no `staves` array: their measures sit directly on
//! the score. Those are migrated at load time into a single staff carrying
//! the document's clef (treble when absent) and key.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::EngineError;
use crate::ids::fresh_id;
use crate::model::{default_bpm, Clef, KeySignature, Measure, Score, Staff, TimeSignature};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyScore {
    #[serde(default)]
    title: String,
    #[serde(default)]
    time_signature: TimeSignature,
    #[serde(default)]
    key_signature: KeySignature,
    #[serde(default = "default_bpm")]
    bpm: u32,
    #[serde(default)]
    clef: Clef,
    measures: Vec<Measure>,
}

impl From<LegacyScore> for Score {
    fn from(legacy: LegacyScore) -> Self {
        let mut measures: Vec<Arc<Measure>> = legacy.measures.into_iter().map(Arc::new).collect();
        if measures.is_empty() {
            measures.push(Arc::new(Measure::new()));
        }
        Score {
            title: legacy.title,
            time_signature: legacy.time_signature,
            key_signature: legacy.key_signature,
            bpm: legacy.bpm,
            staves: vec![Arc::new(Staff {
                id: fresh_id(),
                clef: legacy.clef,
                key_signature: legacy.key_signature,
                measures,
            })],
        }
    }
}

/// Parse a score document, migrating the staff-less shape, and validate it.
pub fn load_score_json(json: &str) -> Result<Score, EngineError> {
    let value: Value = serde_json::from_str(json)?;
    let score = if value.get("staves").is_some() {
        serde_json::from_value::<Score>(value)?
    } else if value.get("measures").is_some() {
        Score::from(serde_json::from_value::<LegacyScore>(value)?)
    } else {
        return Err(EngineError::InvalidStructure(
            "document has neither staves nor measures".into(),
        ));
    };
    score.validate()?;
    Ok(score)
}

/// Serialize a score to pretty-printed JSON.
pub fn score_to_json(score: &Score) -> Result<String, EngineError> {
    Ok(serde_json::to_string_pretty(score)?)
}
