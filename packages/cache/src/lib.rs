//! The speculative hint cache for the minimact client runtime.

pub mod error;
pub mod hints;

pub use error::HintError;
pub use hints::{Hint, HintQueue, DEFAULT_HINT_TTL_MILLIS};
