//! Registry of all active rooms - code minting, lookup, and discovery

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

use crate::game::world::MAX_SLOTS;
use crate::ws::protocol::{RoomPhase, RoomSummary};

use super::{Room, RoomHandle};

/// Length of a shareable room code
const CODE_LEN: usize = 6;

/// Maps room codes to running rooms. Entries are inserted on creation and
/// removed when the room's task exits.
pub struct RoomRegistry {
    rooms: DashMap<String, RoomHandle>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Create a room, register it, and spawn its task. The registry entry
    /// is removed when the last client leaves and the task exits.
    pub fn create_room(self: &Arc<Self>) -> RoomHandle {
        let code = self.mint_code();
        let (room, handle) = Room::new(code.clone());
        self.rooms.insert(code.clone(), handle.clone());

        let registry = Arc::clone(self);
        tokio::spawn(async move {
            room.run().await;
            registry.rooms.remove(&code);
            info!(room = %code, "Room removed from registry");
        });

        handle
    }

    /// Case-insensitive lookup by room code
    pub fn lookup(&self, code: &str) -> Option<RoomHandle> {
        self.rooms
            .get(&code.to_ascii_uppercase())
            .map(|entry| entry.value().clone())
    }

    /// Rooms open for discovery: lobby phase only, so matches in progress
    /// cannot be joined.
    pub fn open_rooms(&self) -> Vec<RoomSummary> {
        self.rooms
            .iter()
            .filter(|entry| entry.value().phase() == RoomPhase::Lobby)
            .map(|entry| RoomSummary {
                room_id: entry.key().clone(),
                players: entry.value().occupied_slots(),
                max_players: MAX_SLOTS,
            })
            .collect()
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_players(&self) -> usize {
        self.rooms
            .iter()
            .map(|entry| entry.value().occupied_slots())
            .sum()
    }

    /// Mint a code not currently in use
    fn mint_code(&self) -> String {
        loop {
            let code = room_code_from(Uuid::new_v4());
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive a short human-shareable code from a fresh UUID
fn room_code_from(id: Uuid) -> String {
    id.simple().to_string()[..CODE_LEN].to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn codes_are_short_and_uppercase() {
        let code = room_code_from(Uuid::new_v4());
        assert_eq!(code.len(), CODE_LEN);
        assert_eq!(code, code.to_ascii_uppercase());
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn lookup_is_case_insensitive() {
        let registry = Arc::new(RoomRegistry::new());
        let handle = registry.create_room();

        let found = registry.lookup(&handle.code.to_ascii_lowercase()).unwrap();
        assert_eq!(found.code, handle.code);
    }

    #[tokio::test]
    async fn unknown_code_is_not_found() {
        let registry = Arc::new(RoomRegistry::new());
        assert!(registry.lookup("ZZZZZZ").is_none());
    }

    #[tokio::test]
    async fn discovery_lists_lobby_rooms_only() {
        let registry = Arc::new(RoomRegistry::new());
        let lobby = registry.create_room();
        let playing = registry.create_room();
        playing
            .phase
            .store(RoomPhase::Playing.as_u8(), Ordering::Relaxed);
        lobby.occupied.store(2, Ordering::Relaxed);

        let open = registry.open_rooms();

        assert_eq!(open.len(), 1);
        assert_eq!(open[0].room_id, lobby.code);
        assert_eq!(open[0].players, 2);
        assert_eq!(open[0].max_players, MAX_SLOTS);
    }
}
