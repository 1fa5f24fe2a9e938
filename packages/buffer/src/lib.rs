//! The reliable outgoing message buffer for the minimact client runtime.
//!
//! Wraps an [`minimact_transport::adapter::TransportAdapter`] with sequence-id assignment,
//! unacked-message retention for resend-on-reconnect, and byte-bounded backpressure.

pub mod buffer;

pub use buffer::{
    DrainReady, MessageBuffer, ACK_COALESCE_MILLIS, DEFAULT_HIGH_WATER_MARK,
};
