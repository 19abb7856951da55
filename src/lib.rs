//! # Broadside Game Server
//!
//! Authoritative server for a turn-based two-player naval combat game.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     BROADSIDE SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Shared primitives                         │
//! │  ├── ids.rs      - Player, room, session, connection ids     │
//! │  ├── grid.rs     - 10x10 board geometry                      │
//! │  └── rng.rs      - Seeded Xorshift128+ PRNG                  │
//! │                                                              │
//! │  game/           - Game rules (deterministic)                │
//! │  ├── ship.rs     - Ship classes and hulls                    │
//! │  ├── fleet.rs    - Fleet placement validation                │
//! │  ├── state.rs    - Session phases and fleet submission       │
//! │  └── combat.rs   - Shot resolution and victory               │
//! │                                                              │
//! │  lobby/          - Shared lobby state                        │
//! │  ├── registry.rs - Player identities and win counts          │
//! │  └── rooms.rs    - Waiting rooms and pairing                 │
//! │                                                              │
//! │  network/        - Networking (non-deterministic)            │
//! │  ├── server.rs   - WebSocket server                          │
//! │  ├── protocol.rs - Message types                             │
//! │  ├── hub.rs      - Command routing                           │
//! │  ├── session.rs  - Per-game workers                          │
//! │  └── fanout.rs   - Outbound event delivery                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! `core/` and `game/` do no I/O and read no clock. Given the same seed and
//! the same commands, a session resolves identically.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod lobby;
pub mod network;

// Re-export commonly used types
pub use core::grid::{Cell, BOARD_SIZE};
pub use core::ids::{ConnectionId, PlayerId, RoomId, SessionId};
pub use core::rng::DeterministicRng;
pub use game::{AttackStatus, Fleet, Session, SessionError, Ship, ShipClass, TurnPolicy};
pub use lobby::{PlayerRegistry, RoomManager};
pub use network::{GameServer, ServerConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
