use thiserror::Error;

use crate::task::TaskStatus;

/// Errors raised by a [`crate::task::ServerTask`] or [`crate::streaming::StreamingTask`]
/// state machine transition (§7.A).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    /// Attempted an action not valid from the task's current status.
    #[error("cannot {action} a task in status {from:?}")]
    InvalidTransition { from: TaskStatus, action: &'static str },
}
