//! scorekit: layout and edit-command engine for common-practice notation.
//!
//! The crate has two halves sharing one score model:
//! - [`engine`] applies [`commands::Command`]s to a [`Score`] with linear
//!   undo/redo; every revision structurally shares untouched staves and
//!   measures.
//! - [`layout`] computes notehead, stem, beam, tuplet-bracket and spacing
//!   geometry, with grand-staff synchronization across staves.
//!
//! # Example
//! ```no_run
//! use scorekit::commands::Command;
//! use scorekit::{DurationKind, Event, KeySignature, Score, ScoreEngine, TimeSignature};
//!
//! let score = Score::new("Etude", TimeSignature::COMMON, KeySignature::default());
//! let mut engine = ScoreEngine::new(score);
//! engine.dispatch(Command::add_event(0, 0, None, Event::note(DurationKind::Quarter, "C4")));
//! let layout = scorekit::layout_score(engine.state(), None);
//! println!("systems: {}", layout.systems.len());
//! ```

pub mod commands;
pub mod duration;
pub mod engine;
pub mod error;
pub mod ids;
pub mod layout;
pub mod logging;
pub mod migrate;
pub mod model;
pub mod pitch;
pub mod reflow;
pub mod selection;

pub use engine::{Dispatch, ScoreEngine, SubscriptionId};
pub use error::EngineError;
pub use layout::{layout_score, ScoreLayout};
pub use logging::{EngineLogger, LogCrateLogger, NoopLogger};
pub use migrate::{load_score_json, score_to_json};
pub use model::*;
pub use selection::{NoteRef, Selection};

/// Load a score document and lay it out, returning the layout as JSON.
///
/// `page_width` sets the line width in user units. Pass `None` to use the
/// default (820).
pub fn layout_score_json(json: &str, page_width: Option<f64>) -> Result<String, EngineError> {
    let score = load_score_json(json)?;
    let layout = layout_score(&score, page_width);
    Ok(serde_json::to_string(&layout)?)
}

// ═══════════════════════════════════════════════════════════════════════
// C FFI for static library / cdylib embedding
// ═══════════════════════════════════════════════════════════════════════

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// Lay out a score given as JSON and return the layout as a JSON C string.
/// The caller must free the returned string with `scorekit_free_string`.
///
/// `page_width` sets the line width in user units. Pass 0.0 to use the default.
///
/// # Safety
/// `json` must be a valid null-terminated UTF-8 C string.
#[no_mangle]
pub unsafe extern "C" fn scorekit_layout_score_json(
    json: *const c_char,
    page_width: f64,
) -> *mut c_char {
    if json.is_null() {
        return std::ptr::null_mut();
    }
    let c_str = unsafe { CStr::from_ptr(json) };
    let json_str = match c_str.to_str() {
        Ok(s) => s,
        Err(_) => return std::ptr::null_mut(),
    };

    let pw = if page_width > 0.0 { Some(page_width) } else { None };

    match layout_score_json(json_str, pw) {
        Ok(out) => CString::new(out).unwrap_or_default().into_raw(),
        Err(e) => {
            log::warn!("layout request rejected: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Free a string previously returned by scorekit functions.
///
/// # Safety
/// `ptr` must be a string previously returned by a scorekit function, or null.
#[no_mangle]
pub unsafe extern "C" fn scorekit_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}
