//! Network Layer
//!
//! WebSocket transport, wire protocol and the async plumbing around the
//! game engine. Game rules live in `game/`; this layer only routes.

pub mod fanout;
pub mod hub;
pub mod protocol;
pub mod server;
pub mod session;

pub use fanout::{Fanout, Outbox};
pub use hub::{ErrorKind, Hub, HubError};
pub use protocol::{ClientMessage, Envelope, ServerMessage};
pub use server::{Connections, GameServer, GameServerError, ServerConfig};
pub use session::{DispatchError, SessionCommand, SessionContext, SessionManager};
