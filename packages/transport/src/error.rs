use thiserror::Error;

/// Errors raised by the hub protocol codec and the transport adapter contract (§7.A).
#[derive(Debug, Error)]
pub enum TransportError {
    /// A frame did not contain valid JSON.
    #[error("malformed frame: {0}")]
    Framing(String),

    /// The handshake response rejected the requested protocol/version.
    #[error("handshake rejected: {0}")]
    Handshake(String),

    /// A redirect chain exceeded the ceiling in §3 (100 hops).
    #[error("exceeded maximum redirect count ({0})")]
    TooManyRedirects(u32),

    /// The connection closed and the adapter does not support (or has exhausted)
    /// reconnection.
    #[error("connection closed: {0}")]
    Closed(String),

    /// A message failed to serialize to JSON.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// A frame failed to deserialize into a [`crate::protocol::HubMessage`].
    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),
}
