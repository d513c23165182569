//! The command engine: current score, linear undo history and redo stack.
//!
//! The engine is single-threaded; `dispatch`, `undo` and `redo` update the
//! state/history/redo triple as a unit, so a host sharing an engine across
//! threads must wrap it in a mutex (or give it a single owner).

use crate::commands::{Command, UndoRecord};
use crate::error::EngineError;
use crate::logging::{EngineLogger, LogCrateLogger};
use crate::model::Score;

/// Score-change callback.
pub type Listener = Box<dyn FnMut(&Score) + Send>;

/// Handle returned by [`ScoreEngine::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Result of [`ScoreEngine::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// The score changed and the command is on the history.
    Applied,
    /// The command resolved to a no-op; nothing was recorded.
    Unchanged,
    /// The command produced an invalid score; state is untouched.
    Rejected(EngineError),
}

struct Applied {
    command: Command,
    undo: UndoRecord,
}

pub struct ScoreEngine {
    state: Score,
    history: Vec<Applied>,
    redo_stack: Vec<Command>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_listener: u64,
    logger: Box<dyn EngineLogger>,
}

impl ScoreEngine {
    /// Engine reporting through the `log` facade.
    pub fn new(score: Score) -> Self {
        Self::with_logger(score, LogCrateLogger)
    }

    pub fn with_logger<L: EngineLogger + 'static>(score: Score, logger: L) -> Self {
        ScoreEngine {
            state: score,
            history: Vec::new(),
            redo_stack: Vec::new(),
            listeners: Vec::new(),
            next_listener: 0,
            logger: Box::new(logger),
        }
    }

    pub fn state(&self) -> &Score {
        &self.state
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Run `command` against the current state. A valid, changed result
    /// replaces the state, goes on the history and clears the redo stack.
    pub fn dispatch(&mut self, command: Command) -> Dispatch {
        let name = command.name();
        let outcome = command.execute(&self.state);
        if outcome.is_unchanged() {
            self.logger.no_op(name);
            return Dispatch::Unchanged;
        }
        if let Err(e) = outcome.score.validate() {
            self.logger.validation_failure(name, &e);
            return Dispatch::Rejected(e);
        }

        self.state = outcome.score;
        self.history.push(Applied {
            command,
            undo: outcome.undo,
        });
        self.redo_stack.clear();
        self.logger.command(name);
        self.publish();
        Dispatch::Applied
    }

    /// Revert the most recent command. Returns `false` when there is none.
    pub fn undo(&mut self) -> bool {
        let Some(applied) = self.history.pop() else {
            return false;
        };
        self.state = applied.command.undo(&self.state, &applied.undo);
        self.logger.undo(applied.command.name());
        self.redo_stack.push(applied.command);
        self.publish();
        true
    }

    /// Re-execute the most recently undone command. Returns `false` when
    /// there is none or it no longer applies.
    pub fn redo(&mut self) -> bool {
        let Some(command) = self.redo_stack.pop() else {
            return false;
        };
        let name = command.name();
        let outcome = command.execute(&self.state);
        if outcome.is_unchanged() {
            self.logger.no_op(name);
            return false;
        }
        if let Err(e) = outcome.score.validate() {
            self.logger.validation_failure(name, &e);
            return false;
        }

        self.state = outcome.score;
        self.history.push(Applied {
            command,
            undo: outcome.undo,
        });
        self.logger.redo(name);
        self.publish();
        true
    }

    /// Register a callback invoked with the new state after every change.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&Score) + Send + 'static,
    {
        let id = SubscriptionId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    fn publish(&mut self) {
        for (_, listener) in &mut self.listeners {
            listener(&self.state);
        }
    }
}
