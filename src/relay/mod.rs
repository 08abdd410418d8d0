//! Room signaling relay.
//!
//! Tracks which socket is in which room and fans chat, WebRTC signaling and
//! the cake-cut trigger out to the right sockets. Connection registry and
//! membership table sit behind one lock so every transition, including the
//! fan-out it causes, is applied atomically.

mod error;
mod event;
mod membership;
mod registry;
pub mod ws;

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde_json::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub use error::RelayError;
pub use event::{ChatMessage, ClientEvent, JoinRoom, ServerEvent, SignalKind};
pub use membership::RoomId;
pub use registry::{ConnectionId, OUTBOX_CAPACITY, Outbox};

use membership::MembershipTable;
use registry::ConnectionRegistry;

#[derive(Default)]
struct RelayState {
    registry: ConnectionRegistry,
    membership: MembershipTable,
}

impl RelayState {
    fn broadcast(&self, recipients: HashSet<ConnectionId>, event: &ServerEvent) -> usize {
        recipients
            .into_iter()
            .filter(|id| self.registry.send(*id, event.clone()))
            .count()
    }

    fn depart(&mut self, id: ConnectionId, room: &RoomId) {
        self.membership.leave(room, id);
        let remaining = self.membership.members(room);
        self.broadcast(remaining, &ServerEvent::UserLeft(id));
    }
}

/// Shared handle to the relay. Cheap to clone; all clones see the same rooms.
#[derive(Clone, Default)]
pub struct Relay {
    state: Arc<Mutex<RelayState>>,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RelayState> {
        // state is never left half-updated across a panic point
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a freshly opened socket and greets it with its id.
    pub fn connect(&self, outbox: Outbox, hosted: HashSet<RoomId>) -> ConnectionId {
        let id = ConnectionId::new();
        let mut state = self.lock();
        state.registry.register(id, outbox, hosted);
        state.registry.send(id, ServerEvent::Connected { id });
        tracing::debug!(conn_id = %id, "connection registered");
        id
    }

    pub fn handle(&self, id: ConnectionId, event: ClientEvent) -> Result<(), RelayError> {
        match event {
            ClientEvent::JoinRoom(JoinRoom { room_code, user_name }) => {
                let room = RoomId::new(&room_code)
                    .ok_or_else(|| RelayError::Malformed("empty room code".into()))?;
                self.join(id, room, user_name)
            }
            ClientEvent::Message(message) => self.chat(id, message),
            ClientEvent::Offer { to, offer } => self.signal(id, SignalKind::Offer, to, offer),
            ClientEvent::Answer { to, answer } => self.signal(id, SignalKind::Answer, to, answer),
            ClientEvent::IceCandidate { to, candidate } => {
                self.signal(id, SignalKind::IceCandidate, to, candidate)
            }
            ClientEvent::CutCake(room_code) => {
                let room = RoomId::new(&room_code)
                    .ok_or_else(|| RelayError::Malformed("empty room code".into()))?;
                self.cut_cake(id, &room)
            }
        }
    }

    /// Puts the connection in `room` and announces it to everyone already
    /// there. A connection that is already in a room leaves it first.
    pub fn join(&self, id: ConnectionId, room: RoomId, name: String) -> Result<(), RelayError> {
        let name = name.trim().to_owned();
        if name.is_empty() {
            return Err(RelayError::Malformed("empty user name".into()));
        }

        let mut state = self.lock();
        if let Some(previous) = state.registry.set_join(id, room.clone(), name.clone())? {
            state.depart(id, &previous);
            tracing::info!(conn_id = %id, from = %previous, to = %room, "connection re-joined");
        }

        // insert before announcing so the joiner never hears about itself
        state.membership.join(room.clone(), id);
        let is_host = state.registry.get(id).is_some_and(|conn| conn.hosts(&room));
        let others = state.membership.others_in(&room, id);
        state.broadcast(others, &ServerEvent::UserJoined { id, name: name.clone(), is_host });

        tracing::info!(conn_id = %id, room = %room, name = %name, is_host, "joined room");
        Ok(())
    }

    /// Echoes a chat message to every member of the sender's room, the
    /// sender included.
    pub fn chat(&self, id: ConnectionId, mut message: ChatMessage) -> Result<(), RelayError> {
        let state = self.lock();
        let (room, name) = state.registry.lookup(id)?;
        if message.user.trim().is_empty() {
            message.user = name.to_owned();
        }
        if message.timestamp.is_none() {
            message.timestamp = OffsetDateTime::now_utc().format(&Rfc3339).ok();
        }

        let members = state.membership.members(room);
        let delivered = state.broadcast(members, &ServerEvent::Message(message));
        tracing::debug!(conn_id = %id, room = %room, delivered, "chat relayed");
        Ok(())
    }

    /// Forwards a handshake payload to one connection. A target that is gone
    /// is not an error.
    pub fn signal(
        &self,
        id: ConnectionId,
        kind: SignalKind,
        to: ConnectionId,
        payload: Value,
    ) -> Result<(), RelayError> {
        let state = self.lock();
        state.registry.lookup(id)?;
        if !state.registry.send(to, kind.envelope(id, payload)) {
            tracing::debug!(conn_id = %id, target = %to, ?kind, "signal target gone, dropped");
        }
        Ok(())
    }

    /// Fires the group-wide cake-cut at every member of the sender's room.
    /// Any member may fire it.
    pub fn cut_cake(&self, id: ConnectionId, room: &RoomId) -> Result<(), RelayError> {
        let state = self.lock();
        let (joined, _) = state.registry.lookup(id)?;
        if joined != room {
            return Err(RelayError::RoomMismatch {
                joined: joined.clone(),
                requested: room.clone(),
            });
        }

        let members = state.membership.members(room);
        let delivered = state.broadcast(members, &ServerEvent::CakeCut);
        tracing::info!(conn_id = %id, room = %room, delivered, "cake cut");
        Ok(())
    }

    /// Drops every trace of the connection and tells its room. Safe to call
    /// more than once.
    pub fn disconnect(&self, id: ConnectionId) {
        let mut state = self.lock();
        let Some(conn) = state.registry.unregister(id) else {
            return;
        };

        match conn.room() {
            Some(room) => {
                state.depart(id, room);
                tracing::info!(conn_id = %id, room = %room, "left room");
            }
            None => tracing::debug!(conn_id = %id, "disconnected before joining"),
        }
    }

    pub fn members(&self, room: &RoomId) -> HashSet<ConnectionId> {
        self.lock().membership.members(room)
    }

    pub fn member_count(&self, room: &RoomId) -> usize {
        self.lock().membership.member_count(room)
    }

    pub fn room_count(&self) -> usize {
        self.lock().membership.room_count()
    }

    pub fn connection_count(&self) -> usize {
        self.lock().registry.len()
    }
}
