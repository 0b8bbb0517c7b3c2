//! Message framing for the engine channel.
//!
//! Outgoing: `{"id": n, "cmd": {...}}` or `{"id": n, "event": {...}}`.
//! Incoming: the same shapes echoing the id, plus one unsolicited id-less
//! `{"event": {"type": "InitializeDone", "config": {...}}}` once the engine
//! has finished loading.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::command::{Command, Config, Output};

pub const INITIALIZE_DONE: &str = "InitializeDone";

/// Engine-specific queries that do not go through a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    GetVersionInfo,
    IsValidReading { data: String },
    GetPosList,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RequestBody {
    #[serde(rename = "cmd")]
    Command(Command),
    #[serde(rename = "event")]
    Event(EngineEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub id: u32,
    #[serde(flatten)]
    pub body: RequestBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosEntry {
    pub name: String,
}

/// Reply to an [`EngineEvent`], or the init signal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventResult {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pos_list: Vec<PosEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Config>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response payload: either a filled command output or an event result.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    Command(Output),
    Event(EventResult),
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Initialized {
        config: Config,
        version: Option<String>,
    },
    Response {
        id: u32,
        payload: ResponsePayload,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message has neither a command nor an event payload")]
    EmptyPayload,
    #[error("message carries both a command and an event payload")]
    AmbiguousPayload,
    #[error("response without a correlation id")]
    MissingId,
}

#[derive(Deserialize)]
struct RawCommand {
    #[serde(default)]
    output: Output,
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(default)]
    id: Option<u32>,
    #[serde(default)]
    cmd: Option<RawCommand>,
    #[serde(default)]
    event: Option<EventResult>,
}

pub fn encode_request(request: &Request) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(request)?)
}

pub fn decode_inbound(text: &str) -> Result<Inbound, ProtocolError> {
    let raw: RawMessage = serde_json::from_str(text)?;
    let payload = match (raw.cmd, raw.event) {
        (Some(_), Some(_)) => return Err(ProtocolError::AmbiguousPayload),
        (None, None) => return Err(ProtocolError::EmptyPayload),
        (Some(cmd), None) => ResponsePayload::Command(cmd.output),
        (None, Some(event)) => {
            if raw.id.is_none() && event.kind == INITIALIZE_DONE {
                return Ok(Inbound::Initialized {
                    config: event.config.unwrap_or_default(),
                    version: event.version,
                });
            }
            ResponsePayload::Event(event)
        }
    };
    let id = raw.id.ok_or(ProtocolError::MissingId)?;
    Ok(Inbound::Response { id, payload })
}
