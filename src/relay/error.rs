use super::{ConnectionId, RoomId};

/// Why an inbound event was not applied. None of these close the socket.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("connection {0} is not registered")]
    NotFound(ConnectionId),

    #[error("connection {0} has not joined a room")]
    NotJoined(ConnectionId),

    #[error("connection is in room {joined}, not {requested}")]
    RoomMismatch { joined: RoomId, requested: RoomId },

    #[error("malformed event: {0}")]
    Malformed(String),
}
