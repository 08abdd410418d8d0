//! Wire format for the relay socket.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`; events
//! without a payload omit `data`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ConnectionId, RelayError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub user: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    pub room_code: String,
    pub user_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    JoinRoom(JoinRoom),
    Message(ChatMessage),
    Offer { to: ConnectionId, offer: Value },
    Answer { to: ConnectionId, answer: Value },
    IceCandidate { to: ConnectionId, candidate: Value },
    /// Carries the room code the sender believes it is in.
    CutCake(String),
}

impl ClientEvent {
    pub fn parse(frame: &str) -> Result<Self, RelayError> {
        serde_json::from_str(frame).map_err(|err| RelayError::Malformed(err.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// First frame on every socket; tells the client its own id.
    Connected { id: ConnectionId },
    UserJoined {
        id: ConnectionId,
        name: String,
        #[serde(rename = "isHost")]
        is_host: bool,
    },
    UserLeft(ConnectionId),
    Message(ChatMessage),
    Offer { from: ConnectionId, offer: Value },
    Answer { from: ConnectionId, answer: Value },
    IceCandidate { from: ConnectionId, candidate: Value },
    CakeCut,
}

impl ServerEvent {
    /// Wire name of the event, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Connected { .. } => "connected",
            ServerEvent::UserJoined { .. } => "user-joined",
            ServerEvent::UserLeft(_) => "user-left",
            ServerEvent::Message(_) => "message",
            ServerEvent::Offer { .. } => "offer",
            ServerEvent::Answer { .. } => "answer",
            ServerEvent::IceCandidate { .. } => "ice-candidate",
            ServerEvent::CakeCut => "cake-cut",
        }
    }
}

/// WebRTC handshake messages the relay forwards without looking inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

impl SignalKind {
    pub(crate) fn envelope(self, from: ConnectionId, payload: Value) -> ServerEvent {
        match self {
            SignalKind::Offer => ServerEvent::Offer { from, offer: payload },
            SignalKind::Answer => ServerEvent::Answer { from, answer: payload },
            SignalKind::IceCandidate => ServerEvent::IceCandidate { from, candidate: payload },
        }
    }
}
