//! Server task and server reducer state machines for the minimact client runtime.

pub mod error;
pub mod paginated;
pub mod reducer;
pub mod streaming;
pub mod task;

pub use error::TaskError;
pub use paginated::PaginatedTasks;
pub use reducer::ServerReducer;
pub use streaming::StreamingTask;
pub use task::{ServerTask, TaskStatus};
