//! Core primitives.
//!
//! Identifiers, board geometry and the seeded RNG shared by the game engine
//! and the lobby.

pub mod grid;
pub mod ids;
pub mod rng;

// Re-export core types
pub use grid::{Cell, BOARD_SIZE, BOARD_CELLS};
pub use ids::{ConnectionId, PlayerId, RoomId, SessionId};
pub use rng::{derive_session_seed, DeterministicRng};
