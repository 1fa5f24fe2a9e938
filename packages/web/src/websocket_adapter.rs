//! The concrete `web_sys::WebSocket`-backed [`TransportAdapter`] (§4.A): negotiates the
//! hub handshake, frames/deframes messages with [`minimact_transport::RECORD_SEPARATOR`],
//! and surfaces connect/message/close lifecycle as non-blocking [`TransportEvent`]s the
//! way the teacher's liveview client pushes socket events into a channel the render loop
//! polls rather than reacting inline from the callback.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::warn;
use wasm_bindgen::prelude::Closure;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket};

use minimact_transport::{
    decode_frames, encode_frame, HandshakeRequest, HandshakeResponse, HubMessage,
    TransportAdapter, TransportEvent, TransportFeatures,
};

use crate::error::WebError;

struct Shared {
    connected: bool,
    handshake_done: bool,
    incoming: String,
    events: VecDeque<TransportEvent>,
}

/// A [`TransportAdapter`] over a live `WebSocket`, performing the `{protocol:"json"}`
/// handshake before the connection is reported as usable.
pub struct WebSocketAdapter {
    socket: WebSocket,
    shared: Rc<RefCell<Shared>>,
    _on_open: Closure<dyn FnMut(Event)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
    _on_error: Closure<dyn FnMut(Event)>,
}

impl WebSocketAdapter {
    /// Open a connection to `url` and wire up the handshake/framing state machine. The
    /// adapter is not yet [`TransportAdapter::is_connected`] until the handshake response
    /// arrives — poll `poll_event` to observe that transition (it surfaces no explicit
    /// "connected" event, only the first real `Message`, mirroring §4.A's "core only
    /// observes the lifecycle").
    pub fn connect(url: &str) -> Result<Self, WebError> {
        let socket = WebSocket::new(url).map_err(|err| WebError::SocketInit(url.to_string(), format!("{err:?}")))?;
        let shared = Rc::new(RefCell::new(Shared {
            connected: false,
            handshake_done: false,
            incoming: String::new(),
            events: VecDeque::new(),
        }));

        let on_open = {
            let socket = socket.clone();
            Closure::wrap(Box::new(move |_event: Event| {
                let request = HandshakeRequest::default();
                let payload = match serde_json::to_string(&request) {
                    Ok(p) => p,
                    Err(err) => {
                        warn!(?err, "failed to encode handshake request");
                        return;
                    }
                };
                if let Err(err) = socket.send_with_str(&encode_frame(&payload)) {
                    warn!(?err, "failed to send handshake request");
                }
            }) as Box<dyn FnMut(Event)>)
        };

        let on_message = {
            let shared = shared.clone();
            Closure::wrap(Box::new(move |event: MessageEvent| {
                let Some(text) = event.data().as_string() else {
                    warn!("ignoring non-text websocket frame");
                    return;
                };
                let mut state = shared.borrow_mut();
                state.incoming.push_str(&text);
                let frames = decode_frames(&mut state.incoming);
                for frame in frames {
                    if !state.handshake_done {
                        match serde_json::from_str::<HandshakeResponse>(&frame) {
                            Ok(response) if response.error.is_none() => {
                                state.handshake_done = true;
                                state.connected = true;
                            }
                            Ok(response) => {
                                warn!(error = ?response.error, "hub rejected handshake");
                                state.events.push_back(TransportEvent::Disconnected);
                            }
                            Err(err) => warn!(?err, "malformed handshake response"),
                        }
                        continue;
                    }
                    match HubMessage::from_json(&frame) {
                        Ok(message) => state.events.push_back(TransportEvent::Message(message)),
                        Err(err) => warn!(?err, "malformed hub message frame"),
                    }
                }
            }) as Box<dyn FnMut(MessageEvent)>)
        };

        let on_close = {
            let shared = shared.clone();
            Closure::wrap(Box::new(move |_event: CloseEvent| {
                let mut state = shared.borrow_mut();
                state.connected = false;
                state.events.push_back(TransportEvent::Disconnected);
            }) as Box<dyn FnMut(CloseEvent)>)
        };

        let on_error = Closure::wrap(Box::new(move |_event: Event| {
            warn!("websocket error event");
        }) as Box<dyn FnMut(Event)>);

        socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));
        socket.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        Ok(WebSocketAdapter {
            socket,
            shared,
            _on_open: on_open,
            _on_message: on_message,
            _on_close: on_close,
            _on_error: on_error,
        })
    }

    pub fn close(&self) {
        let _ = self.socket.close();
    }
}

impl TransportAdapter for WebSocketAdapter {
    type Error = WebError;

    fn features(&self) -> TransportFeatures {
        // The browser's own WebSocket never auto-reconnects and sends no keep-alive frames
        // of its own; both are left to higher layers.
        TransportFeatures {
            reconnect: false,
            inherent_keep_alive: false,
        }
    }

    fn is_connected(&self) -> bool {
        self.shared.borrow().connected
    }

    fn send(&mut self, message: &HubMessage) -> Result<(), Self::Error> {
        if !self.is_connected() {
            return Err(WebError::Dom("send on a closed websocket".into()));
        }
        let payload = message
            .to_json()
            .map_err(|err| WebError::Dom(err.to_string()))?;
        self.socket
            .send_with_str(&encode_frame(&payload))
            .map_err(|err| WebError::Dom(format!("{err:?}")))
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.shared.borrow_mut().events.pop_front()
    }
}
