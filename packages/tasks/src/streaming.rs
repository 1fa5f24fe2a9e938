//! The streaming variant of [`crate::task::ServerTask`] (§3): a task whose result arrives as
//! a sequence of chunks rather than a single value.

use std::collections::VecDeque;

use tracing::instrument;

use crate::error::TaskError;
use crate::task::TaskStatus;

/// A server task whose result streams in as chunks.
pub struct StreamingTask<T> {
    status: TaskStatus,
    /// A bounded window of the most recent chunks, for UI display.
    chunks: VecDeque<T>,
    /// Total chunks received so far, including any evicted from `chunks`.
    chunk_count: usize,
    /// The full ordered history of chunks received, used to build the partial result.
    partial: Vec<T>,
    estimated_chunks: Option<usize>,
    max_chunks_in_memory: usize,
    error: Option<String>,
}

impl<T: Clone> StreamingTask<T> {
    /// A freshly constructed, not-yet-started streaming task.
    pub fn idle(max_chunks_in_memory: usize) -> Self {
        StreamingTask {
            status: TaskStatus::Idle,
            chunks: VecDeque::new(),
            chunk_count: 0,
            partial: Vec::new(),
            estimated_chunks: None,
            max_chunks_in_memory,
            error: None,
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn chunks(&self) -> &VecDeque<T> {
        &self.chunks
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    pub fn partial(&self) -> &[T] {
        &self.partial
    }

    pub fn estimated_chunks(&self) -> Option<usize> {
        self.estimated_chunks
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Move from `Idle`, `Error`, or `Cancelled` into `Running`, clearing all prior chunks.
    #[instrument(skip(self))]
    pub fn start(&mut self, estimated_chunks: Option<usize>) -> Result<(), TaskError> {
        match self.status {
            TaskStatus::Idle | TaskStatus::Error | TaskStatus::Cancelled => {
                self.status = TaskStatus::Running;
                self.chunks.clear();
                self.partial.clear();
                self.chunk_count = 0;
                self.estimated_chunks = estimated_chunks;
                self.error = None;
                Ok(())
            }
            TaskStatus::Running | TaskStatus::Complete => Err(TaskError::InvalidTransition {
                from: self.status,
                action: "start",
            }),
        }
    }

    /// Append an incoming chunk. `on_chunk`, if given, is invoked with the chunk before it's
    /// stored — this is the spec's `onChunk` hook, expressed as a caller-supplied callback
    /// rather than a stored closure field.
    #[instrument(skip(self, chunk, on_chunk))]
    pub fn push_chunk(&mut self, chunk: T, on_chunk: Option<impl FnOnce(&T)>) -> Result<(), TaskError> {
        if self.status != TaskStatus::Running {
            return Err(TaskError::InvalidTransition {
                from: self.status,
                action: "push_chunk",
            });
        }
        if let Some(callback) = on_chunk {
            callback(&chunk);
        }
        self.chunk_count += 1;
        self.partial.push(chunk.clone());
        self.chunks.push_back(chunk);
        while self.chunks.len() > self.max_chunks_in_memory {
            self.chunks.pop_front();
        }
        Ok(())
    }

    /// Move from `Running` to `Complete`.
    pub fn complete(&mut self) -> Result<(), TaskError> {
        if self.status != TaskStatus::Running {
            return Err(TaskError::InvalidTransition {
                from: self.status,
                action: "complete",
            });
        }
        self.status = TaskStatus::Complete;
        Ok(())
    }

    /// Move from `Running` to `Error`.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_window_is_bounded_but_partial_keeps_everything() {
        let mut task: StreamingTask<u32> = StreamingTask::idle(2);
        task.start(Some(3)).unwrap();
        for chunk in [1u32, 2, 3] {
            task.push_chunk(chunk, None::<fn(&u32)>).unwrap();
        }
        assert_eq!(task.chunk_count(), 3);
        assert_eq!(task.chunks().iter().copied().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(task.partial(), &[1, 2, 3]);
    }

    #[test]
    fn on_chunk_callback_runs_before_storage() {
        let mut seen = Vec::new();
        let mut task: StreamingTask<u32> = StreamingTask::idle(10);
        task.start(None).unwrap();
        task.push_chunk(7, Some(|c: &u32| seen.push(*c))).unwrap();
        assert_eq!(seen, vec![7]);
    }

    #[test]
    fn push_chunk_requires_running() {
        let mut task: StreamingTask<u32> = StreamingTask::idle(10);
        assert!(task.push_chunk(1, None::<fn(&u32)>).is_err());
    }
}
