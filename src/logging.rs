//! Logger port for the command engine.
//!
//! The engine reports what it did through this trait and never branches on
//! it. [`LogCrateLogger`] forwards to the `log` facade so any backend the
//! host installs picks the messages up; [`NoopLogger`] discards them.

use crate::error::EngineError;

pub trait EngineLogger: Send + Sync {
    /// A command changed the score.
    fn command(&self, name: &str);

    /// A command ran but left the score unchanged (index miss or guard).
    fn no_op(&self, name: &str);

    fn undo(&self, name: &str);

    fn redo(&self, name: &str);

    /// A command produced a structurally invalid score and was rejected.
    fn validation_failure(&self, name: &str, error: &EngineError);
}

/// Forwards to `log::debug!` / `log::warn!`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCrateLogger;

impl EngineLogger for LogCrateLogger {
    fn command(&self, name: &str) {
        log::debug!("command {name} applied");
    }

    fn no_op(&self, name: &str) {
        log::debug!("command {name} left the score unchanged");
    }

    fn undo(&self, name: &str) {
        log::debug!("undo {name}");
    }

    fn redo(&self, name: &str) {
        log::debug!("redo {name}");
    }

    fn validation_failure(&self, name: &str, error: &EngineError) {
        log::warn!("command {name} rejected: {error}");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl EngineLogger for NoopLogger {
    fn command(&self, _name: &str) {}
    fn no_op(&self, _name: &str) {}
    fn undo(&self, _name: &str) {}
    fn redo(&self, _name: &str) {}
    fn validation_failure(&self, _name: &str, _error: &EngineError) {}
}
