//! Process-wide room registry.
//!
//! Rooms are created on first client arrival and forget themselves when
//! their task disposes (last client gone past the reconnect window). The
//! registry is the only shared map in the process; everything else is owned
//! by a room task.

use crate::room::{Room, RoomHandle};
use dashmap::DashMap;
use pit_core::RoomId;
use std::sync::{Arc, Weak};

#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, RoomHandle>,
}

impl RoomRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn get(&self, room_id: &str) -> Option<RoomHandle> {
        self.rooms.get(room_id).map(|entry| entry.clone())
    }

    /// Fetch the room's handle, spawning the room task on first arrival.
    pub fn get_or_create(self: &Arc<Self>, room_id: &str) -> RoomHandle {
        let registry = Arc::downgrade(self);
        self.rooms
            .entry(room_id.to_string())
            .or_insert_with(|| {
                tracing::info!(room = room_id, "creating room");
                Room::spawn(
                    RoomId::new(room_id),
                    Some(Arc::new(move |id: &RoomId| {
                        if let Some(registry) = Weak::upgrade(&registry) {
                            registry.remove(id);
                        }
                    })),
                )
            })
            .clone()
    }

    pub fn remove(&self, room_id: &RoomId) {
        self.rooms.remove(room_id.as_str());
        tracing::info!(room = %room_id, "room removed from registry");
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
