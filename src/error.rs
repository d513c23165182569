//! Error types for loading and validating scores.
//!
//! Command execution and layout never return these to the caller: a
//! structurally invalid command result is rejected by the engine and the
//! error is handed to the logger port instead.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The score has a shape no command may produce (e.g. no staves).
    #[error("Invalid score structure: {0}")]
    InvalidStructure(String),

    /// Staves no longer share index-aligned measures.
    #[error("Staff {staff} has {found} measures, expected {expected}")]
    MisalignedStaves {
        staff: usize,
        expected: usize,
        found: usize,
    },

    /// An event breaks the rest/chord/tuplet invariants.
    #[error("Invalid event '{event_id}' in staff {staff}, measure {measure}: {message}")]
    InvalidEvent {
        staff: usize,
        measure: usize,
        event_id: String,
        message: String,
    },

    #[error("Invalid pitch '{0}'")]
    InvalidPitch(String),

    #[error("Invalid time signature '{0}'")]
    InvalidTimeSignature(String),

    #[error("Invalid key signature '{0}'")]
    InvalidKeySignature(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Json(e.to_string())
    }
}
