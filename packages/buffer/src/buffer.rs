//! The outgoing message buffer (§3 Message Buffer): assigns per-direction sequence ids,
//! holds unacked messages for resend on reconnect, and exposes byte-bounded backpressure as
//! an awaitable future rather than a blocking call — this crate assumes a single-threaded,
//! cooperative executor the way `minimact-core`'s patch engine does, so `Rc`/`RefCell`
//! stand in for `Arc`/`Mutex`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use tracing::{debug, instrument};

use minimact_transport::HubMessage;

/// Default byte high-water mark past which new sends are delayed via [`DrainReady`] (§3).
pub const DEFAULT_HIGH_WATER_MARK: usize = 100_000;

/// How long the client waits after receiving a message before sending a coalesced `Ack`
/// for everything received so far (§3).
pub const ACK_COALESCE_MILLIS: u64 = 1_000;

struct UnackedEntry {
    sequence_id: u64,
    message: HubMessage,
    bytes: usize,
}

#[derive(Default)]
struct BackpressureState {
    blocked: bool,
    waker: Option<Waker>,
}

/// A future that resolves once the buffer has drained below its high-water mark.
pub struct DrainReady(Rc<RefCell<BackpressureState>>);

impl Future for DrainReady {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.0.borrow_mut();
        if state.blocked {
            state.waker = Some(cx.waker().clone());
            Poll::Pending
        } else {
            Poll::Ready(())
        }
    }
}

/// Tracks per-direction sequence numbers, unacked outgoing messages, and backpressure.
pub struct MessageBuffer {
    high_water_mark: usize,
    next_outgoing_seq: u64,
    unacked: VecDeque<UnackedEntry>,
    buffered_bytes: usize,
    backpressure: Rc<RefCell<BackpressureState>>,
    highest_received: Option<u64>,
    ack_scheduled: bool,
}

impl MessageBuffer {
    /// A buffer with the default 100,000-byte high-water mark.
    pub fn new() -> Self {
        Self::with_high_water_mark(DEFAULT_HIGH_WATER_MARK)
    }

    /// A buffer with a custom high-water mark, mainly for tests.
    pub fn with_high_water_mark(high_water_mark: usize) -> Self {
        MessageBuffer {
            high_water_mark,
            next_outgoing_seq: 1,
            unacked: VecDeque::new(),
            buffered_bytes: 0,
            backpressure: Rc::new(RefCell::new(BackpressureState::default())),
            highest_received: None,
            ack_scheduled: false,
        }
    }

    /// Allocate the next outgoing sequence id. Sequence ids start at 1 and are never reused.
    pub fn assign_sequence(&mut self) -> u64 {
        let seq = self.next_outgoing_seq;
        self.next_outgoing_seq += 1;
        seq
    }

    /// Current number of bytes held in the unacked buffer.
    pub fn buffered_bytes(&self) -> usize {
        self.buffered_bytes
    }

    /// Whether the buffer is currently over its high-water mark.
    pub fn is_backpressured(&self) -> bool {
        self.buffered_bytes >= self.high_water_mark
    }

    /// A future that resolves once the buffer drops back under its high-water mark.
    pub fn drain_ready(&self) -> DrainReady {
        DrainReady(self.backpressure.clone())
    }

    /// Hold `message` (already carrying `sequence_id`) for resend until it is acked.
    ///
    /// Always enqueues the message, even once the buffer is already over its high-water
    /// mark — the mark only gates *new* sends via [`Self::drain_ready`]; it never drops a
    /// message that was already handed to the transport, which would leave a permanent gap
    /// in the sequence space the server can't recover via resend.
    #[instrument(skip(self, message), fields(sequence_id))]
    pub fn track_unacked(&mut self, sequence_id: u64, message: HubMessage) {
        let bytes = message.to_json().map(|s| s.len()).unwrap_or(0);
        self.buffered_bytes += bytes;
        self.unacked.push_back(UnackedEntry {
            sequence_id,
            message,
            bytes,
        });
        if self.is_backpressured() {
            self.backpressure.borrow_mut().blocked = true;
        }
        debug!(sequence_id, bytes, total = self.buffered_bytes, "buffered outgoing message");
    }

    /// Evict every unacked entry with `sequence_id <= acked_through`, releasing its bytes
    /// and waking any pending [`DrainReady`] if backpressure has cleared.
    #[instrument(skip(self))]
    pub fn on_ack(&mut self, acked_through: u64) {
        while let Some(front) = self.unacked.front() {
            if front.sequence_id > acked_through {
                break;
            }
            let entry = self.unacked.pop_front().unwrap();
            self.buffered_bytes = self.buffered_bytes.saturating_sub(entry.bytes);
        }
        if !self.is_backpressured() {
            let mut state = self.backpressure.borrow_mut();
            if state.blocked {
                state.blocked = false;
                if let Some(waker) = state.waker.take() {
                    waker.wake();
                }
            }
        }
    }

    /// Every still-unacked message whose sequence id is greater than `after`, in send
    /// order — used to answer a `Sequence` request on reconnect (§3).
    pub fn resend_after(&self, after: u64) -> Vec<HubMessage> {
        self.unacked
            .iter()
            .filter(|e| e.sequence_id > after)
            .map(|e| e.message.clone())
            .collect()
    }

    /// The lowest sequence id still unacked, if any — what a reconnecting client reports
    /// via its own `Sequence` message.
    pub fn lowest_unacked(&self) -> Option<u64> {
        self.unacked.front().map(|e| e.sequence_id)
    }

    /// Record that an incoming message numbered `seq` has arrived. Returns `true` the
    /// first time since the last flush that an ack timer needs to be (re)armed.
    pub fn note_received(&mut self, seq: u64) -> bool {
        self.highest_received = Some(match self.highest_received {
            Some(current) => current.max(seq),
            None => seq,
        });
        if self.ack_scheduled {
            false
        } else {
            self.ack_scheduled = true;
            true
        }
    }

    /// Called when the coalescing ack timer fires: returns the highest received sequence
    /// id to ack, if any arrived since the last flush, and resets the timer state.
    pub fn take_pending_ack(&mut self) -> Option<u64> {
        self.ack_scheduled = false;
        self.highest_received.take()
    }
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}
