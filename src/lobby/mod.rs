//! Lobby
//!
//! Process-wide state shared by every connection: who the players are and
//! which rooms are waiting for an opponent. Both are plain owned structures;
//! the network hub decides how they are locked.

pub mod registry;
pub mod rooms;

pub use registry::{Player, PlayerRegistry, RegistryError};
pub use rooms::{Engagement, Room, RoomError, RoomManager, RoomMember, ROOM_CAPACITY};
