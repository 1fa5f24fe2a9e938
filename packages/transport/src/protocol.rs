//! The hub message protocol: a small, numerically-tagged JSON envelope format (§3), framed
//! with an ASCII record separator the way SignalR's JSON hub protocol is, since the teacher's
//! own server-push liveview channel and this spec's duplex connection solve the same problem
//! (a persistent stream carrying many independently-acked messages).

use serde_json::{json, Value};

use minimact_core::Patch;

use crate::error::TransportError;

/// The byte that terminates every frame on the wire.
pub const RECORD_SEPARATOR: u8 = 0x1E;

/// The hub protocol's numeric message type tags (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HubMessageType {
    Invocation = 1,
    StreamItem = 2,
    Completion = 3,
    StreamInvocation = 4,
    CancelInvocation = 5,
    Ping = 6,
    Close = 7,
    Ack = 8,
    Sequence = 9,
}

impl HubMessageType {
    fn from_u8(tag: u8) -> Option<Self> {
        Some(match tag {
            1 => Self::Invocation,
            2 => Self::StreamItem,
            3 => Self::Completion,
            4 => Self::StreamInvocation,
            5 => Self::CancelInvocation,
            6 => Self::Ping,
            7 => Self::Close,
            8 => Self::Ack,
            9 => Self::Sequence,
            _ => return None,
        })
    }
}

/// The names of the application-level hub methods carried inside an [`HubMessage::Invocation`]
/// `target` field (§6). Neither direction is a closed set on the wire — `target` is just a
/// string — but these are the names this implementation knows how to send or dispatch.
pub mod rpc {
    // Client -> server.
    pub const REGISTER_COMPONENT: &str = "RegisterComponent";
    pub const INVOKE_COMPONENT_METHOD: &str = "InvokeComponentMethod";
    pub const UPDATE_CLIENT_STATE: &str = "UpdateClientState";
    pub const UPDATE_CLIENT_COMPUTED_STATE: &str = "UpdateClientComputedState";
    pub const UPDATE_COMPONENT_STATE: &str = "UpdateComponentState";
    pub const UPDATE_COMPONENT_STATE_WITH_OPERATION: &str = "UpdateComponentStateWithOperation";
    pub const UPDATE_DOM_ELEMENT_STATE: &str = "UpdateDomElementState";
    pub const UPDATE_QUERY_RESULTS: &str = "UpdateQueryResults";
    pub const START_SERVER_TASK: &str = "StartServerTask";
    pub const RETRY_SERVER_TASK: &str = "RetryServerTask";
    pub const CANCEL_SERVER_TASK: &str = "CancelServerTask";
    pub const DISPATCH_SERVER_REDUCER: &str = "DispatchServerReducer";
    pub const UPDATE_CONTEXT: &str = "UpdateContext";
    pub const CLEAR_CONTEXT: &str = "ClearContext";

    // Server -> client.
    pub const UPDATE_COMPONENT: &str = "UpdateComponent";
    pub const APPLY_PATCHES: &str = "ApplyPatches";
    pub const APPLY_PREDICTION: &str = "ApplyPrediction";
    pub const APPLY_CORRECTION: &str = "ApplyCorrection";
    pub const QUEUE_HINT: &str = "QueueHint";
    pub const ERROR: &str = "Error";
}

/// One message of the hub protocol.
///
/// Unlike the rest of this crate's wire types, `HubMessage` is hand-serialized rather than
/// `#[derive(Serialize, Deserialize)]`'d: its discriminant is a numeric `"type"` field, not a
/// string tag, which `serde`'s internally-tagged representation can't express directly.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    /// An invocation of a named hub method (§6), in either direction. Non-blocking calls
    /// (most pushes from the server, most fire-and-forget calls from the client) carry no
    /// `invocation_id`; calls expecting a [`HubMessage::Completion`] do.
    Invocation {
        sequence_id: u64,
        invocation_id: Option<String>,
        target: String,
        arguments: Vec<Value>,
    },
    /// One chunk of a streaming server task result (§3 `ServerTask` streaming variant).
    StreamItem {
        sequence_id: u64,
        invocation_id: String,
        item: Value,
    },
    /// The terminal result (or error) of an invocation or stream.
    Completion {
        sequence_id: u64,
        invocation_id: String,
        result: Option<Value>,
        error: Option<String>,
    },
    /// A client-initiated call into a server task or reducer.
    StreamInvocation {
        sequence_id: u64,
        invocation_id: String,
        target: String,
        arguments: Vec<Value>,
    },
    /// A client request to cancel an in-flight invocation.
    CancelInvocation { sequence_id: u64, invocation_id: String },
    /// Keep-alive heartbeat; carries no sequence id and is never acked.
    Ping,
    /// The server is closing the connection.
    Close { error: Option<String>, allow_reconnect: bool },
    /// Acknowledges receipt of every message up to and including `sequence_id`.
    Ack { sequence_id: u64 },
    /// Sent on reconnect: "resend everything after `sequence_id`" (§3 Message Buffer).
    Sequence { sequence_id: u64 },
}

impl HubMessage {
    /// Build the server-push `ApplyPatches` invocation carrying a batch of concrete or
    /// template patches.
    pub fn apply_patches(sequence_id: u64, patches: Vec<Patch>) -> Self {
        HubMessage::Invocation {
            sequence_id,
            invocation_id: None,
            target: rpc::APPLY_PATCHES.to_string(),
            arguments: vec![json!(patches)],
        }
    }

    /// Build the server-push `QueueHint` invocation (§3 Hint Queue).
    pub fn queue_hint(
        sequence_id: u64,
        key: &str,
        predicted_state: Value,
        patches: Vec<Patch>,
        confidence: f64,
        queued_at_millis: u64,
    ) -> Self {
        HubMessage::Invocation {
            sequence_id,
            invocation_id: None,
            target: rpc::QUEUE_HINT.to_string(),
            arguments: vec![
                json!(key),
                predicted_state,
                json!(patches),
                json!(confidence),
                json!(queued_at_millis),
            ],
        }
    }

    /// Build a fire-and-forget client-to-server invocation of `target` with `arguments`.
    pub fn invoke(sequence_id: u64, target: impl Into<String>, arguments: Vec<Value>) -> Self {
        HubMessage::Invocation {
            sequence_id,
            invocation_id: None,
            target: target.into(),
            arguments,
        }
    }

    fn type_tag(&self) -> HubMessageType {
        match self {
            HubMessage::Invocation { .. } => HubMessageType::Invocation,
            HubMessage::StreamItem { .. } => HubMessageType::StreamItem,
            HubMessage::Completion { .. } => HubMessageType::Completion,
            HubMessage::StreamInvocation { .. } => HubMessageType::StreamInvocation,
            HubMessage::CancelInvocation { .. } => HubMessageType::CancelInvocation,
            HubMessage::Ping => HubMessageType::Ping,
            HubMessage::Close { .. } => HubMessageType::Close,
            HubMessage::Ack { .. } => HubMessageType::Ack,
            HubMessage::Sequence { .. } => HubMessageType::Sequence,
        }
    }

    /// The sequence id this message carries, if any. `Ping` and `Close` are unsequenced.
    pub fn sequence_id(&self) -> Option<u64> {
        match self {
            HubMessage::Invocation { sequence_id, .. }
            | HubMessage::StreamItem { sequence_id, .. }
            | HubMessage::Completion { sequence_id, .. }
            | HubMessage::StreamInvocation { sequence_id, .. }
            | HubMessage::CancelInvocation { sequence_id, .. }
            | HubMessage::Ack { sequence_id }
            | HubMessage::Sequence { sequence_id } => Some(*sequence_id),
            HubMessage::Ping | HubMessage::Close { .. } => None,
        }
    }

    /// Serialize this message to a JSON value with a numeric `"type"` discriminant.
    pub fn to_value(&self) -> Result<Value, TransportError> {
        let tag = self.type_tag() as u8;
        let body = match self {
            HubMessage::Invocation {
                sequence_id,
                invocation_id,
                target,
                arguments,
            } => json!({
                "type": tag,
                "sequenceId": sequence_id,
                "invocationId": invocation_id,
                "target": target,
                "arguments": arguments,
            }),
            HubMessage::StreamItem {
                sequence_id,
                invocation_id,
                item,
            } => json!({
                "type": tag,
                "sequenceId": sequence_id,
                "invocationId": invocation_id,
                "item": item,
            }),
            HubMessage::Completion {
                sequence_id,
                invocation_id,
                result,
                error,
            } => json!({
                "type": tag,
                "sequenceId": sequence_id,
                "invocationId": invocation_id,
                "result": result,
                "error": error,
            }),
            HubMessage::StreamInvocation {
                sequence_id,
                invocation_id,
                target,
                arguments,
            } => json!({
                "type": tag,
                "sequenceId": sequence_id,
                "invocationId": invocation_id,
                "target": target,
                "arguments": arguments,
            }),
            HubMessage::CancelInvocation {
                sequence_id,
                invocation_id,
            } => json!({
                "type": tag,
                "sequenceId": sequence_id,
                "invocationId": invocation_id,
            }),
            HubMessage::Ping => json!({ "type": tag }),
            HubMessage::Close {
                error,
                allow_reconnect,
            } => json!({
                "type": tag,
                "error": error,
                "allowReconnect": allow_reconnect,
            }),
            HubMessage::Ack { sequence_id } => json!({
                "type": tag,
                "sequenceId": sequence_id,
            }),
            HubMessage::Sequence { sequence_id } => json!({
                "type": tag,
                "sequenceId": sequence_id,
            }),
        };
        Ok(body)
    }

    /// Serialize this message to a JSON string.
    pub fn to_json(&self) -> Result<String, TransportError> {
        serde_json::to_string(&self.to_value()?).map_err(TransportError::Encode)
    }

    /// Parse a message from its JSON value representation.
    pub fn from_value(value: &Value) -> Result<Self, TransportError> {
        let tag = value
            .get("type")
            .and_then(Value::as_u64)
            .and_then(|t| u8::try_from(t).ok())
            .and_then(HubMessageType::from_u8)
            .ok_or_else(|| TransportError::Framing("missing or unknown type tag".into()))?;

        let seq = |v: &Value| -> Result<u64, TransportError> {
            v.get("sequenceId")
                .and_then(Value::as_u64)
                .ok_or_else(|| TransportError::Framing("missing sequenceId".into()))
        };
        let string_field = |v: &Value, name: &str| -> Result<String, TransportError> {
            v.get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| TransportError::Framing(format!("missing {name}")))
        };

        Ok(match tag {
            HubMessageType::Invocation => HubMessage::Invocation {
                sequence_id: seq(value)?,
                invocation_id: value
                    .get("invocationId")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                target: string_field(value, "target")?,
                arguments: value
                    .get("arguments")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
            },
            HubMessageType::StreamItem => HubMessage::StreamItem {
                sequence_id: seq(value)?,
                invocation_id: string_field(value, "invocationId")?,
                item: value.get("item").cloned().unwrap_or(Value::Null),
            },
            HubMessageType::Completion => HubMessage::Completion {
                sequence_id: seq(value)?,
                invocation_id: string_field(value, "invocationId")?,
                result: value.get("result").cloned().filter(|v| !v.is_null()),
                error: value
                    .get("error")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            HubMessageType::StreamInvocation => HubMessage::StreamInvocation {
                sequence_id: seq(value)?,
                invocation_id: string_field(value, "invocationId")?,
                target: string_field(value, "target")?,
                arguments: value
                    .get("arguments")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
            },
            HubMessageType::CancelInvocation => HubMessage::CancelInvocation {
                sequence_id: seq(value)?,
                invocation_id: string_field(value, "invocationId")?,
            },
            HubMessageType::Ping => HubMessage::Ping,
            HubMessageType::Close => HubMessage::Close {
                error: value
                    .get("error")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                allow_reconnect: value
                    .get("allowReconnect")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            },
            HubMessageType::Ack => HubMessage::Ack {
                sequence_id: seq(value)?,
            },
            HubMessageType::Sequence => HubMessage::Sequence {
                sequence_id: seq(value)?,
            },
        })
    }

    /// Parse a message from its JSON string representation.
    pub fn from_json(raw: &str) -> Result<Self, TransportError> {
        let value: Value = serde_json::from_str(raw).map_err(TransportError::Decode)?;
        Self::from_value(&value)
    }
}

/// The handshake request sent immediately after the connection opens, before any
/// [`HubMessage`] (§3).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HandshakeRequest {
    pub protocol: String,
    pub version: u32,
}

impl Default for HandshakeRequest {
    fn default() -> Self {
        HandshakeRequest {
            protocol: "json".to_string(),
            version: 1,
        }
    }
}

/// The server's reply to a [`HandshakeRequest`]. An `error` present means the protocol or
/// version was rejected.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HandshakeResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Split `buf` on [`RECORD_SEPARATOR`] bytes, returning every complete frame found and
/// leaving any trailing partial frame in `buf` for the next read.
pub fn decode_frames(buf: &mut String) -> Vec<String> {
    let mut frames = Vec::new();
    while let Some(pos) = buf.find(RECORD_SEPARATOR as char) {
        let frame = buf[..pos].to_string();
        *buf = buf[pos + 1..].to_string();
        if !frame.is_empty() {
            frames.push(frame);
        }
    }
    frames
}

/// Append the record separator to `payload`, producing a single wire frame.
pub fn encode_frame(payload: &str) -> String {
    let mut framed = String::with_capacity(payload.len() + 1);
    framed.push_str(payload);
    framed.push(RECORD_SEPARATOR as char);
    framed
}
