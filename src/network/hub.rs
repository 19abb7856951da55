//! Command Hub
//!
//! Routes decoded client commands to the registry, the lobby and the session
//! workers, and reports every rejection back to the connection it came from.
//! The hub never touches sockets; it only sees [`ConnectionId`]s and talks
//! back through the [`Outbox`] it was built with.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::core::ids::{ConnectionId, PlayerId, RoomId};
use crate::game::ship::Ship;
use crate::game::state::TurnPolicy;
use crate::lobby::registry::{PlayerRegistry, RegistryError};
use crate::lobby::rooms::{RoomError, RoomManager};
use crate::network::fanout::{self, Fanout, Outbox};
use crate::network::protocol::{
    AddShipsRequest, AttackRequest, ClientMessage, JoinRoomRequest, RandomAttackRequest,
    RegRequest, RegResponse, ServerMessage,
};
use crate::network::session::{DispatchError, SessionContext, SessionManager};

/// Error category, deciding how loudly a rejection is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad request from the client.
    UserInput,
    /// Game or room command before registering.
    NotRegistered,
    /// Server-side inconsistency.
    LogicFault,
}

/// Command rejections.
#[derive(Debug, Error)]
pub enum HubError {
    /// Connection has no registered player.
    #[error("You must register first")]
    NotRegistered,

    /// Join request without a room id.
    #[error("Room ID is required")]
    MissingRoomId,

    /// `indexPlayer` names someone other than the sender.
    #[error("Invalid player index")]
    PlayerMismatch,

    /// Lobby rejection.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Registry rejection.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Session rejection or routing failure.
    #[error(transparent)]
    Session(#[from] DispatchError),

    /// Broken internal invariant.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HubError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HubError::NotRegistered => ErrorKind::NotRegistered,
            HubError::Session(DispatchError::GameNotFound | DispatchError::WorkerGone)
            | HubError::Registry(RegistryError::UnknownPlayer)
            | HubError::Internal(_) => ErrorKind::LogicFault,
            _ => ErrorKind::UserInput,
        }
    }
}

/// The registered player behind a connection.
struct Caller {
    id: PlayerId,
    name: String,
}

/// Process-wide game state and command routing.
pub struct Hub {
    players: Arc<RwLock<PlayerRegistry>>,
    rooms: Arc<RwLock<RoomManager>>,
    sessions: SessionManager,
    fanout: Fanout,
}

impl Hub {
    /// Create a hub delivering through `outbox`.
    pub fn new(outbox: Arc<dyn Outbox>, policy: TurnPolicy, entropy: u64) -> Self {
        let players = Arc::new(RwLock::new(PlayerRegistry::new()));
        let rooms = Arc::new(RwLock::new(RoomManager::new()));
        let fanout = Fanout::new(outbox);

        let context = SessionContext {
            players: players.clone(),
            rooms: rooms.clone(),
            fanout: fanout.clone(),
        };

        Self {
            players,
            rooms,
            sessions: SessionManager::new(context, policy, entropy),
            fanout,
        }
    }

    /// Handle one decoded command. Rejections are sent back as `error` events.
    pub async fn handle(&self, conn: ConnectionId, message: ClientMessage) {
        let kind = message.kind();
        debug!("{} -> {}", conn, kind);

        let result = match message {
            ClientMessage::Register(req) => {
                self.register(conn, req).await;
                Ok(())
            }
            ClientMessage::CreateRoom => self.create_room(conn).await,
            ClientMessage::JoinRoom(req) => self.join_room(conn, req).await,
            ClientMessage::AddShips(req) => self.add_ships(conn, req).await,
            ClientMessage::Attack(req) => self.attack(conn, req).await,
            ClientMessage::RandomAttack(req) => self.random_attack(conn, req).await,
        };

        if let Err(e) = result {
            match e.kind() {
                ErrorKind::LogicFault => warn!("{} {} failed: {}", conn, kind, e),
                _ => debug!("{} {} rejected: {}", conn, kind, e),
            }
            self.fanout.send(conn, ServerMessage::error(e.to_string()));
        }
    }

    /// Report an undecodable frame.
    pub fn malformed(&self, conn: ConnectionId, error: &serde_json::Error) {
        debug!("{} sent an invalid message: {}", conn, error);
        self.fanout
            .send(conn, ServerMessage::error("Invalid message format"));
    }

    /// Forget a closed connection and withdraw its waiting room.
    pub async fn connection_closed(&self, conn: ConnectionId) {
        let Some(player) = self.players.write().await.unbind(conn) else {
            return;
        };

        let list = {
            let mut rooms = self.rooms.write().await;
            rooms.withdraw(&player).map(|_| fanout::room_list(&rooms))
        };
        if let Some(list) = list {
            self.fanout.broadcast(list);
        }
        info!("{} closed, player {} unbound", conn, player.short());
    }

    /// Number of running sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.session_count().await
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    async fn register(&self, conn: ConnectionId, req: RegRequest) {
        let result = self
            .players
            .write()
            .await
            .register(&req.name, &req.password, conn);

        match result {
            Ok(player) => {
                info!("{} registered as {} ({})", conn, player.name, player.id.short());
                self.fanout.send(
                    conn,
                    ServerMessage::Reg(RegResponse {
                        name: player.name,
                        index: Some(player.id),
                        error: false,
                        error_text: String::new(),
                    }),
                );
                let winners = fanout::winners_table(&*self.players.read().await);
                self.fanout.send(conn, winners);
                let rooms = fanout::room_list(&*self.rooms.read().await);
                self.fanout.send(conn, rooms);
            }
            Err(e) => {
                debug!("{} registration as {:?} rejected: {}", conn, req.name, e);
                self.fanout.send(
                    conn,
                    ServerMessage::Reg(RegResponse {
                        name: req.name,
                        index: None,
                        error: true,
                        error_text: e.to_string(),
                    }),
                );
            }
        }
    }

    async fn create_room(&self, conn: ConnectionId) -> Result<(), HubError> {
        let caller = self.caller(conn).await?;

        let list = {
            let mut rooms = self.rooms.write().await;
            let room = rooms.create_room(caller.id, &caller.name)?;
            info!("Room {} opened by {}", room.id.short(), caller.name);
            fanout::room_list(&rooms)
        };
        self.fanout.broadcast(list);
        Ok(())
    }

    async fn join_room(&self, conn: ConnectionId, req: JoinRoomRequest) -> Result<(), HubError> {
        let caller = self.caller(conn).await?;
        let raw = req.index_room.ok_or(HubError::MissingRoomId)?;
        let room_id = RoomId::parse(&raw).ok_or(RoomError::RoomNotFound)?;

        let (room, list) = {
            let mut rooms = self.rooms.write().await;
            let room = rooms.join_room(&room_id, caller.id, &caller.name)?;
            (room, fanout::room_list(&rooms))
        };
        self.fanout.broadcast(list);

        let pair = match room.members.as_slice() {
            [first, second] => [first.player_id, second.player_id],
            members => {
                return Err(HubError::Internal(format!(
                    "room {} promoted with {} members",
                    room.id.short(),
                    members.len()
                )))
            }
        };

        let session_id = self.sessions.create_session(pair).await;
        let players = self.players.read().await;
        for player in pair {
            self.fanout
                .to_player(&players, &player, fanout::create_game(session_id, player));
        }
        Ok(())
    }

    async fn add_ships(&self, conn: ConnectionId, req: AddShipsRequest) -> Result<(), HubError> {
        let caller = self.caller(conn).await?;
        check_claim(req.index_player, caller.id)?;

        let ships: Vec<Ship> = req.ships.into_iter().map(Ship::from).collect();
        self.sessions
            .submit_fleet(&req.game_id, caller.id, ships)
            .await?;
        Ok(())
    }

    async fn attack(&self, conn: ConnectionId, req: AttackRequest) -> Result<(), HubError> {
        let caller = self.caller(conn).await?;
        check_claim(req.index_player, caller.id)?;

        self.sessions
            .attack(&req.game_id, caller.id, req.x, req.y)
            .await?;
        Ok(())
    }

    async fn random_attack(&self, conn: ConnectionId, req: RandomAttackRequest) -> Result<(), HubError> {
        let caller = self.caller(conn).await?;
        check_claim(req.index_player, caller.id)?;

        self.sessions.random_attack(&req.game_id, caller.id).await?;
        Ok(())
    }

    async fn caller(&self, conn: ConnectionId) -> Result<Caller, HubError> {
        self.players
            .read()
            .await
            .lookup_by_connection(conn)
            .map(|p| Caller {
                id: p.id,
                name: p.name.clone(),
            })
            .ok_or(HubError::NotRegistered)
    }
}

/// A client may name itself in `indexPlayer`; it must be the registered player.
fn check_claim(claimed: Option<PlayerId>, actual: PlayerId) -> Result<(), HubError> {
    match claimed {
        Some(id) if id != actual => Err(HubError::PlayerMismatch),
        _ => Ok(()),
    }
}

// =============================================================================
// TESTS
// =============================================================================
