//! `ServerTask<T>`: the idle/running/complete/error/cancelled state machine behind a
//! server-invoked async action (§3).

use tracing::instrument;

use crate::error::TaskError;

/// A server task's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Idle,
    Running,
    Complete,
    Error,
    Cancelled,
}

/// A single server-invoked action and its result.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerTask<T> {
    status: TaskStatus,
    result: Option<T>,
    error: Option<String>,
}

impl<T> ServerTask<T> {
    /// A freshly constructed, not-yet-started task.
    pub fn idle() -> Self {
        ServerTask {
            status: TaskStatus::Idle,
            result: None,
            error: None,
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Move from `Idle`, `Error`, or `Cancelled` into `Running`, clearing any prior
    /// result/error.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> Result<(), TaskError> {
        match self.status {
            TaskStatus::Idle | TaskStatus::Error | TaskStatus::Cancelled => {
                self.status = TaskStatus::Running;
                self.result = None;
                self.error = None;
                Ok(())
            }
            TaskStatus::Running | TaskStatus::Complete => Err(TaskError::InvalidTransition {
                from: self.status,
                action: "start",
            }),
        }
    }

    /// `start` followed by clearing state — a convenience for the common "retry" UI action.
    pub fn retry(&mut self) -> Result<(), TaskError> {
        match self.status {
            TaskStatus::Error | TaskStatus::Cancelled => self.start(),
            _ => Err(TaskError::InvalidTransition {
                from: self.status,
                action: "retry",
            }),
        }
    }

    /// Move from `Running` to `Complete` with a result.
    #[instrument(skip(self, value))]
    pub fn complete(&mut self, value: T) -> Result<(), TaskError> {
        if self.status != TaskStatus::Running {
            return Err(TaskError::InvalidTransition {
                from: self.status,
                action: "complete",
            });
        }
        self.status = TaskStatus::Complete;
        self.result = Some(value);
        Ok(())
    }

    /// Move from `Running` to `Error` with a message.
    #[instrument(skip(self))]
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), TaskError> {
        if self.status != TaskStatus::Running {
            return Err(TaskError::InvalidTransition {
                from: self.status,
                action: "fail",
            });
        }
        self.status = TaskStatus::Error;
        self.error = Some(message.into());
        Ok(())
    }

    /// Move from `Running` to `Cancelled`.
    #[instrument(skip(self))]
    pub fn cancel(&mut self) -> Result<(), TaskError> {
        if self.status != TaskStatus::Running {
            return Err(TaskError::InvalidTransition {
                from: self.status,
                action: "cancel",
            });
        }
        self.status = TaskStatus::Cancelled;
        Ok(())
    }
}

impl<T> Default for ServerTask<T> {
    fn default() -> Self {
        Self::idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_idle_running_complete() {
        let mut task: ServerTask<u32> = ServerTask::idle();
        task.start().unwrap();
        assert_eq!(task.status(), TaskStatus::Running);
        task.complete(42).unwrap();
        assert_eq!(task.status(), TaskStatus::Complete);
        assert_eq!(task.result(), Some(&42));
    }

    #[test]
    fn cannot_complete_without_starting() {
        let mut task: ServerTask<u32> = ServerTask::idle();
        let err = task.complete(1).unwrap_err();
        assert_eq!(
            err,
            TaskError::InvalidTransition {
                from: TaskStatus::Idle,
                action: "complete"
            }
        );
    }

    #[test]
    fn retry_from_error_restarts_and_clears_message() {
        let mut task: ServerTask<u32> = ServerTask::idle();
        task.start().unwrap();
        task.fail("boom").unwrap();
        assert_eq!(task.error_message(), Some("boom"));
        task.retry().unwrap();
        assert_eq!(task.status(), TaskStatus::Running);
        assert_eq!(task.error_message(), None);
    }

    #[test]
    fn cancel_only_valid_while_running() {
        let mut task: ServerTask<u32> = ServerTask::idle();
        assert!(task.cancel().is_err());
        task.start().unwrap();
        assert!(task.cancel().is_ok());
        assert_eq!(task.status(), TaskStatus::Cancelled);
    }
}
