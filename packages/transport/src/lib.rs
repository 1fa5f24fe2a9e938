//! Hub protocol codec and transport adapter contract for the minimact client runtime.
//!
//! This crate knows how to frame and parse [`protocol::HubMessage`]s and defines the
//! [`adapter::TransportAdapter`] trait concrete transports implement. It does not own a
//! socket, a reconnect loop, or sequencing state — see `minimact-buffer` for that.

pub mod adapter;
pub mod error;
pub mod protocol;

pub use adapter::{TransportAdapter, TransportEvent, TransportFeatures, MAX_REDIRECTS};
pub use error::TransportError;
pub use protocol::{
    decode_frames, encode_frame, rpc, HandshakeRequest, HandshakeResponse, HubMessage,
    HubMessageType, RECORD_SEPARATOR,
};
