//! The transport adapter contract (§3 Transport Adapter): the seam between the hub
//! protocol and whatever actually owns a socket (a `web-sys::WebSocket` in `minimact-web`,
//! an in-memory channel pair in tests).

use crate::protocol::HubMessage;

/// The maximum number of server-issued redirects a single connection attempt will follow
/// before giving up (§3).
pub const MAX_REDIRECTS: u32 = 100;

/// Feature flags an adapter advertises about the underlying transport (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransportFeatures {
    /// The transport can re-establish a dropped connection on its own (e.g. browser
    /// WebSocket auto-reconnect logic layered on top).
    pub reconnect: bool,
    /// The transport already sends its own keep-alive frames, so the hub protocol's
    /// `Ping` cadence can be relaxed.
    pub inherent_keep_alive: bool,
}

/// An event surfaced by a [`TransportAdapter`] between explicit `send`/`poll` calls.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A full [`HubMessage`] frame arrived.
    Message(HubMessage),
    /// The underlying connection dropped.
    Disconnected,
    /// The peer is asking the buffer layer to resend everything after `sequence_id`.
    ResendRequested { sequence_id: u64 },
}

/// The contract a concrete transport (WebSocket, long-poll, in-memory test double, …)
/// must satisfy to carry the hub protocol.
///
/// This trait is deliberately synchronous and non-blocking: `minimact-buffer` drives it
/// from its own cooperative event loop rather than this crate owning an executor.
pub trait TransportAdapter {
    /// The adapter's own error type (connection failures, handshake rejection, …).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Feature flags this adapter advertises.
    fn features(&self) -> TransportFeatures;

    /// Whether the adapter currently believes it has a live connection.
    fn is_connected(&self) -> bool;

    /// Send one already-framed message.
    fn send(&mut self, message: &HubMessage) -> Result<(), Self::Error>;

    /// Non-blockingly pull the next event, if one is ready.
    fn poll_event(&mut self) -> Option<TransportEvent>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::VecDeque;
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("in-memory adapter closed")]
    pub struct MemoryAdapterError;

    /// A loopback adapter for exercising code against [`TransportAdapter`] without a real
    /// socket: everything `send` writes is immediately visible via `sent`, and events can
    /// be queued up front with `push_event`.
    #[derive(Default)]
    pub struct MemoryAdapter {
        pub sent: Vec<HubMessage>,
        pub events: VecDeque<TransportEvent>,
        pub connected: bool,
        pub features: TransportFeatures,
    }

    impl TransportAdapter for MemoryAdapter {
        type Error = MemoryAdapterError;

        fn features(&self) -> TransportFeatures {
            self.features
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn send(&mut self, message: &HubMessage) -> Result<(), Self::Error> {
            if !self.connected {
                return Err(MemoryAdapterError);
            }
            self.sent.push(message.clone());
            Ok(())
        }

        fn poll_event(&mut self) -> Option<TransportEvent> {
            self.events.pop_front()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::MemoryAdapter;
    use super::*;

    #[test]
    fn send_fails_while_disconnected() {
        let mut adapter = MemoryAdapter::default();
        let err = adapter.send(&HubMessage::Ping);
        assert!(err.is_err());
    }

    #[test]
    fn send_records_message_once_connected() {
        let mut adapter = MemoryAdapter {
            connected: true,
            ..Default::default()
        };
        adapter.send(&HubMessage::Ack { sequence_id: 3 }).unwrap();
        assert_eq!(adapter.sent, vec![HubMessage::Ack { sequence_id: 3 }]);
    }

    #[test]
    fn poll_event_drains_in_order() {
        let mut adapter = MemoryAdapter::default();
        adapter.events.push_back(TransportEvent::Disconnected);
        adapter
            .events
            .push_back(TransportEvent::ResendRequested { sequence_id: 5 });
        assert_eq!(adapter.poll_event(), Some(TransportEvent::Disconnected));
        assert_eq!(
            adapter.poll_event(),
            Some(TransportEvent::ResendRequested { sequence_id: 5 })
        );
        assert_eq!(adapter.poll_event(), None);
    }
}
