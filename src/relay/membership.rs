use std::{collections::{HashMap, HashSet}, fmt};

use serde::Serialize;

use super::ConnectionId;

/// Live room key. Codes are matched trimmed and upper-cased; the relay does
/// not check them against the room store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(raw: &str) -> Option<Self> {
        let code = raw.trim().to_uppercase();
        (!code.is_empty()).then_some(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Room -> joined connections. An entry exists only while its set is
/// non-empty.
#[derive(Default)]
pub(crate) struct MembershipTable {
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
}

impl MembershipTable {
    pub(crate) fn join(&mut self, room: RoomId, id: ConnectionId) -> bool {
        self.rooms.entry(room).or_default().insert(id)
    }

    pub(crate) fn leave(&mut self, room: &RoomId, id: ConnectionId) -> bool {
        let Some(members) = self.rooms.get_mut(room) else {
            return false;
        };
        let removed = members.remove(&id);
        if members.is_empty() {
            self.rooms.remove(room);
        }
        removed
    }

    pub(crate) fn members(&self, room: &RoomId) -> HashSet<ConnectionId> {
        self.rooms.get(room).cloned().unwrap_or_default()
    }

    pub(crate) fn others_in(&self, room: &RoomId, exclude: ConnectionId) -> HashSet<ConnectionId> {
        self.rooms
            .get(room)
            .map(|members| members.iter().copied().filter(|id| *id != exclude).collect())
            .unwrap_or_default()
    }

    pub(crate) fn member_count(&self, room: &RoomId) -> usize {
        self.rooms.get(room).map_or(0, HashSet::len)
    }

    pub(crate) fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
