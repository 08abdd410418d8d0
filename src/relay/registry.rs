use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use super::{RelayError, RoomId, ServerEvent};

/// Events a socket may have queued before further deliveries are dropped.
pub const OUTBOX_CAPACITY: usize = 1000;

/// Channel the transport drains to write events back onto a socket.
pub type Outbox = mpsc::Sender<ServerEvent>;

/// Opaque per-socket identifier. Time-ordered, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

pub(crate) struct Connection {
    outbox: Outbox,
    // rooms this socket's session created
    hosted: HashSet<RoomId>,
    joined: Option<(RoomId, String)>,
}

impl Connection {
    pub(crate) fn room(&self) -> Option<&RoomId> {
        self.joined.as_ref().map(|(room, _)| room)
    }

    pub(crate) fn hosts(&self, room: &RoomId) -> bool {
        self.hosted.contains(room)
    }

    /// Queues without waiting. Returns false when the event was dropped,
    /// either because the reader fell behind or because it is gone.
    pub(crate) fn send(&self, event: ServerEvent) -> bool {
        match self.outbox.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::debug!(event = event.name(), "outbox full, event dropped");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

#[derive(Default)]
pub(crate) struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    pub(crate) fn register(&mut self, id: ConnectionId, outbox: Outbox, hosted: HashSet<RoomId>) {
        self.connections.insert(id, Connection { outbox, hosted, joined: None });
    }

    /// Records the room and display name, handing back the room the
    /// connection was in before, if any.
    pub(crate) fn set_join(
        &mut self,
        id: ConnectionId,
        room: RoomId,
        name: String,
    ) -> Result<Option<RoomId>, RelayError> {
        let conn = self.connections.get_mut(&id).ok_or(RelayError::NotFound(id))?;
        Ok(conn.joined.replace((room, name)).map(|(previous, _)| previous))
    }

    pub(crate) fn lookup(&self, id: ConnectionId) -> Result<(&RoomId, &str), RelayError> {
        let conn = self.connections.get(&id).ok_or(RelayError::NotFound(id))?;
        conn.joined
            .as_ref()
            .map(|(room, name)| (room, name.as_str()))
            .ok_or(RelayError::NotJoined(id))
    }

    pub(crate) fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub(crate) fn unregister(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    pub(crate) fn send(&self, id: ConnectionId, event: ServerEvent) -> bool {
        self.connections.get(&id).is_some_and(|conn| conn.send(event))
    }

    pub(crate) fn len(&self) -> usize {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(code: &str) -> RoomId {
        RoomId::new(code).unwrap()
    }

    #[test]
    fn lookup_before_connect_is_not_found() {
        let registry = ConnectionRegistry::default();
        let id = ConnectionId::new();
        assert!(matches!(registry.lookup(id), Err(RelayError::NotFound(missing)) if missing == id));
    }

    #[test]
    fn lookup_before_join_is_not_joined() {
        let mut registry = ConnectionRegistry::default();
        let (tx, _rx) = mpsc::channel(OUTBOX_CAPACITY);
        let id = ConnectionId::new();
        registry.register(id, tx, HashSet::new());

        assert!(matches!(registry.lookup(id), Err(RelayError::NotJoined(_))));
    }

    #[test]
    fn set_join_overwrites_and_returns_previous_room() {
        let mut registry = ConnectionRegistry::default();
        let (tx, _rx) = mpsc::channel(OUTBOX_CAPACITY);
        let id = ConnectionId::new();
        registry.register(id, tx, HashSet::new());

        assert_eq!(registry.set_join(id, room("ABC123"), "Alice".into()).unwrap(), None);
        let previous = registry.set_join(id, room("XYZ789"), "Alicia".into()).unwrap();
        assert_eq!(previous, Some(room("ABC123")));

        let (current, name) = registry.lookup(id).unwrap();
        assert_eq!(current, &room("XYZ789"));
        assert_eq!(name, "Alicia");
    }

    #[test]
    fn unregister_twice_is_a_no_op() {
        let mut registry = ConnectionRegistry::default();
        let (tx, _rx) = mpsc::channel(OUTBOX_CAPACITY);
        let id = ConnectionId::new();
        registry.register(id, tx, HashSet::new());

        assert!(registry.unregister(id).is_some());
        assert!(registry.unregister(id).is_none());
        assert_eq!(registry.len(), 0);
        assert!(matches!(registry.lookup(id), Err(RelayError::NotFound(_))));
    }

    #[test]
    fn send_reports_closed_outbox() {
        let mut registry = ConnectionRegistry::default();
        let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);
        let id = ConnectionId::new();
        registry.register(id, tx, HashSet::new());

        assert!(registry.send(id, ServerEvent::CakeCut));
        drop(rx);
        assert!(!registry.send(id, ServerEvent::CakeCut));
        assert!(!registry.send(ConnectionId::new(), ServerEvent::CakeCut));
    }

    #[test]
    fn send_drops_instead_of_growing_a_full_outbox() {
        let mut registry = ConnectionRegistry::default();
        let (tx, mut rx) = mpsc::channel(2);
        let id = ConnectionId::new();
        registry.register(id, tx, HashSet::new());

        assert!(registry.send(id, ServerEvent::CakeCut));
        assert!(registry.send(id, ServerEvent::UserLeft(id)));
        assert!(!registry.send(id, ServerEvent::CakeCut));

        assert_eq!(rx.try_recv().unwrap(), ServerEvent::CakeCut);
        assert_eq!(rx.try_recv().unwrap(), ServerEvent::UserLeft(id));
        assert!(rx.try_recv().is_err());

        // room frees up once the reader catches up
        assert!(registry.send(id, ServerEvent::CakeCut));
    }
}
