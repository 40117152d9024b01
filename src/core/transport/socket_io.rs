//! Engine.IO v4 / Socket.IO v5 text packets for the default namespace.
//!
//! Only what the persistent channel needs is understood: the open handshake,
//! namespace connect, heartbeats, plain events and close. Acks and binary
//! attachments decode to [`Packet::Other`].

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CONNECT: &str = "40";
pub const PONG: &str = "3";

const HANDSHAKE_QUERY: &str = "EIO=4&transport=websocket";

/// Server handshake carried by the Engine.IO open packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    #[serde(default)]
    pub sid: String,
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

impl OpenInfo {
    /// Longest silence allowed between two server pings.
    pub fn heartbeat_window(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(OpenInfo),
    Close,
    Ping,
    Pong,
    Noop,
    Connect,
    ConnectError(String),
    Disconnect,
    Event { name: String, data: Option<Value> },
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketError(String);

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed frame: {}", self.0)
    }
}

impl std::error::Error for PacketError {}

/// Endpoint URL with the Engine.IO query that selects the WebSocket transport.
pub fn handshake_url(endpoint: &str) -> String {
    format!("{}/?{HANDSHAKE_QUERY}", endpoint.trim_end_matches('/'))
}

/// Encode an event emitted on the default namespace.
pub fn encode_event<T: Serialize>(name: &str, data: &T) -> Result<String, serde_json::Error> {
    Ok(format!("42{}", serde_json::to_string(&(name, data))?))
}

pub fn decode(text: &str) -> Result<Packet, PacketError> {
    let mut chars = text.chars();
    let kind = chars.next();
    let rest = chars.as_str();
    match kind {
        Some('0') => serde_json::from_str(rest)
            .map(Packet::Open)
            .map_err(|err| PacketError(format!("open packet: {err}"))),
        Some('1') => Ok(Packet::Close),
        Some('2') => Ok(Packet::Ping),
        Some('3') => Ok(Packet::Pong),
        Some('4') => decode_message(rest),
        Some('5') => Ok(Packet::Other),
        Some('6') => Ok(Packet::Noop),
        _ => Err(PacketError(format!("unknown packet {text:?}"))),
    }
}

fn decode_message(body: &str) -> Result<Packet, PacketError> {
    let mut chars = body.chars();
    let kind = chars.next();
    let rest = chars.as_str();
    let Some(rest) = strip_default_namespace(rest) else {
        return Ok(Packet::Other);
    };
    match kind {
        Some('0') => Ok(Packet::Connect),
        Some('1') => Ok(Packet::Disconnect),
        Some('2') => decode_event(rest),
        Some('4') => {
            let message = serde_json::from_str::<Value>(rest)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| rest.to_string());
            Ok(Packet::ConnectError(message))
        }
        Some('3' | '5' | '6') => Ok(Packet::Other),
        _ => Err(PacketError(format!("unknown message {body:?}"))),
    }
}

/// Drop a `/,` prefix. Packets for any other namespace yield `None`.
fn strip_default_namespace(rest: &str) -> Option<&str> {
    if !rest.starts_with('/') {
        return Some(rest);
    }
    let (namespace, tail) = rest.split_once(',').unwrap_or((rest, ""));
    (namespace == "/").then_some(tail)
}

fn decode_event(rest: &str) -> Result<Packet, PacketError> {
    let payload = rest.trim_start_matches(|c: char| c.is_ascii_digit());
    let value: Value = serde_json::from_str(payload)
        .map_err(|err| PacketError(format!("event payload: {err}")))?;
    let Value::Array(mut items) = value else {
        return Err(PacketError("event payload is not an array".to_string()));
    };
    if items.is_empty() {
        return Err(PacketError("event without a name".to_string()));
    }
    let data = (items.len() > 1).then(|| items.swap_remove(1));
    match items.swap_remove(0) {
        Value::String(name) => Ok(Packet::Event { name, data }),
        _ => Err(PacketError("event name is not a string".to_string())),
    }
}
