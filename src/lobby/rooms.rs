//! Lobby/Room Manager
//!
//! Waiting rooms and the "one room or session per player" rule. A room is
//! created by one player and discarded the moment a second player joins;
//! the pair is then handed to the session manager.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::ids::{PlayerId, RoomId};

/// Room capacity.
pub const ROOM_CAPACITY: usize = 2;

/// What a player is currently tied up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engagement {
    /// Sitting alone in a room.
    Waiting(RoomId),
    /// Seated in a session.
    Matched,
}

/// A room occupant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMember {
    /// Player id.
    pub player_id: PlayerId,
    /// Name shown in the lobby.
    pub name: String,
}

/// A pending match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// Room id.
    pub id: RoomId,
    /// Occupants, creator first. Never more than [`ROOM_CAPACITY`].
    pub members: Vec<RoomMember>,
}

impl Room {
    /// Whether the room can take another player.
    pub fn is_open(&self) -> bool {
        self.members.len() < ROOM_CAPACITY
    }
}

/// Room rejections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// Player is already waiting in a room or playing.
    #[error("You are already in a room or game")]
    AlreadyInRoomOrSession,

    /// No such room.
    #[error("Room not found")]
    RoomNotFound,

    /// Room already has two players.
    #[error("Room is full")]
    RoomFull,

    /// Creator tried to join their own room.
    #[error("You cannot join your own room")]
    SelfJoin,
}

/// Open rooms and player engagement.
#[derive(Debug, Default)]
pub struct RoomManager {
    /// Creation order.
    rooms: Vec<Room>,
    engaged: BTreeMap<PlayerId, Engagement>,
}

impl RoomManager {
    /// Create an empty lobby.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a room with `player_id` as its only member.
    pub fn create_room(&mut self, player_id: PlayerId, name: &str) -> Result<Room, RoomError> {
        if self.engaged.contains_key(&player_id) {
            return Err(RoomError::AlreadyInRoomOrSession);
        }

        let room = Room {
            id: RoomId::random(),
            members: vec![RoomMember {
                player_id,
                name: name.to_string(),
            }],
        };
        self.engaged.insert(player_id, Engagement::Waiting(room.id));
        self.rooms.push(room.clone());
        Ok(room)
    }

    /// Add `player_id` as the second member.
    ///
    /// On success the full room is removed from the lobby and returned; both
    /// members become `Matched`. A joiner waiting in a room of their own has
    /// that room withdrawn.
    pub fn join_room(
        &mut self,
        room_id: &RoomId,
        player_id: PlayerId,
        name: &str,
    ) -> Result<Room, RoomError> {
        let index = self
            .rooms
            .iter()
            .position(|r| &r.id == room_id)
            .ok_or(RoomError::RoomNotFound)?;

        let room = &self.rooms[index];
        if room.members.iter().any(|m| m.player_id == player_id) {
            return Err(RoomError::SelfJoin);
        }
        if !room.is_open() {
            return Err(RoomError::RoomFull);
        }
        if self.engaged.get(&player_id) == Some(&Engagement::Matched) {
            return Err(RoomError::AlreadyInRoomOrSession);
        }

        let mut room = self.rooms.remove(index);
        self.withdraw(&player_id);

        room.members.push(RoomMember {
            player_id,
            name: name.to_string(),
        });
        for member in &room.members {
            self.engaged.insert(member.player_id, Engagement::Matched);
        }
        Ok(room)
    }

    /// Rooms waiting for a second player, in creation order.
    pub fn available_rooms(&self) -> Vec<&Room> {
        self.rooms.iter().filter(|r| r.is_open()).collect()
    }

    /// Discard the room `player_id` is waiting in. Returns its id.
    pub fn withdraw(&mut self, player_id: &PlayerId) -> Option<RoomId> {
        let Some(Engagement::Waiting(room_id)) = self.engaged.get(player_id).copied() else {
            return None;
        };
        self.engaged.remove(player_id);
        self.rooms.retain(|r| r.id != room_id);
        Some(room_id)
    }

    /// Free players whose session finished.
    pub fn release(&mut self, players: &[PlayerId]) {
        for player_id in players {
            if self.engaged.get(player_id) == Some(&Engagement::Matched) {
                self.engaged.remove(player_id);
            }
        }
    }

    /// Current engagement.
    pub fn engagement(&self, player_id: &PlayerId) -> Option<Engagement> {
        self.engaged.get(player_id).copied()
    }

    /// Whether the player is waiting or playing.
    pub fn is_engaged(&self, player_id: &PlayerId) -> bool {
        self.engaged.contains_key(player_id)
    }
}
