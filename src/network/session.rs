//! Session Management
//!
//! Every running game is owned by one tokio task. Commands for that game
//! are queued on an mpsc channel and applied one at a time, so turn order and
//! shot sets never see interleaved writers. Each command carries a oneshot
//! reply that resolves after the resulting events have been handed to the
//! transport.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::core::ids::{PlayerId, SessionId};
use crate::core::rng::derive_session_seed;
use crate::game::combat::AttackReport;
use crate::game::ship::Ship;
use crate::game::state::{FleetOutcome, Session, SessionError, TurnPolicy};
use crate::lobby::registry::PlayerRegistry;
use crate::lobby::rooms::RoomManager;
use crate::network::fanout::{self, Fanout};

/// Reply channel for a queued command.
pub type Reply = oneshot::Sender<Result<(), SessionError>>;

/// A command for one session's worker.
#[derive(Debug)]
pub enum SessionCommand {
    /// Place a fleet.
    SubmitFleet {
        /// Submitting player.
        player: PlayerId,
        /// Ships as submitted.
        ships: Vec<Ship>,
        /// Outcome.
        reply: Reply,
    },
    /// Fire at a cell.
    Attack {
        /// Attacker.
        player: PlayerId,
        /// Column.
        x: i32,
        /// Row.
        y: i32,
        /// Outcome.
        reply: Reply,
    },
    /// Fire at a random unshot cell.
    RandomAttack {
        /// Attacker.
        player: PlayerId,
        /// Outcome.
        reply: Reply,
    },
}

/// Failure to get a command applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No session with that id ever existed.
    #[error("Game not found")]
    GameNotFound,

    /// The worker stopped before replying.
    #[error("Game is no longer running")]
    WorkerGone,

    /// The engine rejected the command.
    #[error(transparent)]
    Rejected(#[from] SessionError),
}

/// Shared lobby state a worker touches when its game ends.
#[derive(Clone)]
pub struct SessionContext {
    /// Player records and connection bindings.
    pub players: Arc<RwLock<PlayerRegistry>>,
    /// Rooms and engagement.
    pub rooms: Arc<RwLock<RoomManager>>,
    /// Outbound events.
    pub fanout: Fanout,
}

/// How many finished session ids are remembered for "already finished" replies.
pub const FINISHED_RETENTION: usize = 4096;

struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionCommand>,
    players: [PlayerId; 2],
}

struct SessionTable {
    running: BTreeMap<SessionId, SessionHandle>,
    finished: BTreeSet<SessionId>,
    finished_order: VecDeque<SessionId>,
    retention: usize,
}

impl SessionTable {
    fn new(retention: usize) -> Self {
        Self {
            running: BTreeMap::new(),
            finished: BTreeSet::new(),
            finished_order: VecDeque::new(),
            retention,
        }
    }

    /// Move a session from running to finished, forgetting the oldest
    /// finished ids beyond the retention limit.
    fn retire(&mut self, id: SessionId) {
        self.running.remove(&id);
        if self.finished.insert(id) {
            self.finished_order.push_back(id);
        }
        while self.finished_order.len() > self.retention {
            if let Some(oldest) = self.finished_order.pop_front() {
                self.finished.remove(&oldest);
            }
        }
    }
}

/// Owner of all session workers.
pub struct SessionManager {
    table: Arc<RwLock<SessionTable>>,
    context: SessionContext,
    policy: TurnPolicy,
    entropy: u64,
    sequence: AtomicU64,
}

impl SessionManager {
    /// Create a manager. `entropy` seeds every session's RNG.
    pub fn new(context: SessionContext, policy: TurnPolicy, entropy: u64) -> Self {
        Self {
            table: Arc::new(RwLock::new(SessionTable::new(FINISHED_RETENTION))),
            context,
            policy,
            entropy,
            sequence: AtomicU64::new(0),
        }
    }

    /// Start a session for a matched pair and spawn its worker.
    pub async fn create_session(&self, players: [PlayerId; 2]) -> SessionId {
        let id = SessionId::random();
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let seed = derive_session_seed(self.entropy, sequence);
        let session = Session::new(id, players, seed, self.policy);

        let (tx, rx) = mpsc::unbounded_channel();
        self.table
            .write()
            .await
            .running
            .insert(id, SessionHandle { tx, players });

        let worker = tokio::spawn(run_worker(session, rx, self.context.clone(), self.table.clone()));
        tokio::spawn(supervise(id, players, worker, self.context.clone(), self.table.clone()));

        info!(
            "Session {} created for {} vs {}",
            id.short(),
            players[0].short(),
            players[1].short()
        );
        id
    }

    /// Queue a fleet submission and wait for the outcome.
    pub async fn submit_fleet(
        &self,
        id: &SessionId,
        player: PlayerId,
        ships: Vec<Ship>,
    ) -> Result<(), DispatchError> {
        self.dispatch(id, |reply| SessionCommand::SubmitFleet { player, ships, reply })
            .await
    }

    /// Queue a targeted shot and wait for the outcome.
    pub async fn attack(&self, id: &SessionId, player: PlayerId, x: i32, y: i32) -> Result<(), DispatchError> {
        self.dispatch(id, |reply| SessionCommand::Attack { player, x, y, reply })
            .await
    }

    /// Queue a random shot and wait for the outcome.
    pub async fn random_attack(&self, id: &SessionId, player: PlayerId) -> Result<(), DispatchError> {
        self.dispatch(id, |reply| SessionCommand::RandomAttack { player, reply })
            .await
    }

    async fn dispatch(
        &self,
        id: &SessionId,
        command: impl FnOnce(Reply) -> SessionCommand,
    ) -> Result<(), DispatchError> {
        let tx = {
            let table = self.table.read().await;
            match table.running.get(id) {
                Some(handle) => handle.tx.clone(),
                None if table.finished.contains(id) => {
                    return Err(SessionError::GameAlreadyFinished.into());
                }
                None => return Err(DispatchError::GameNotFound),
            }
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        let delivered = match tx.send(command(reply_tx)) {
            Ok(()) => reply_rx.await.ok(),
            Err(_) => None,
        };
        match delivered {
            Some(result) => Ok(result?),
            None => Err(self.worker_gone(id).await),
        }
    }

    /// Explain a worker that stopped before replying.
    async fn worker_gone(&self, id: &SessionId) -> DispatchError {
        if self.table.read().await.finished.contains(id) {
            SessionError::GameAlreadyFinished.into()
        } else {
            DispatchError::WorkerGone
        }
    }

    /// Participants of a running session.
    pub async fn players_of(&self, id: &SessionId) -> Option<[PlayerId; 2]> {
        self.table.read().await.running.get(id).map(|h| h.players)
    }

    /// Number of running sessions.
    pub async fn session_count(&self) -> usize {
        self.table.read().await.running.len()
    }
}

// =============================================================================
// WORKER
// =============================================================================

/// Apply commands until the game is won or the queue closes.
/// Returns whether the game reached a winner.
async fn run_worker(
    mut session: Session,
    mut rx: mpsc::UnboundedReceiver<SessionCommand>,
    ctx: SessionContext,
    table: Arc<RwLock<SessionTable>>,
) -> bool {
    while let Some(command) = rx.recv().await {
        match command {
            SessionCommand::SubmitFleet { player, ships, reply } => {
                let result = session.submit_fleet(&player, ships);
                if let Ok(FleetOutcome::Started { turn_owner }) = result {
                    announce_start(&session, turn_owner, &ctx).await;
                }
                debug!("Session {} fleet from {}: {:?}", session.id.short(), player.short(), result);
                let _ = reply.send(result.map(|_| ()));
            }
            SessionCommand::Attack { player, x, y, reply } => {
                let result = session.attack(&player, x, y);
                let _ = reply.send(publish(&session, result, &ctx, &table).await);
            }
            SessionCommand::RandomAttack { player, reply } => {
                let result = session.random_attack(&player);
                let _ = reply.send(publish(&session, result, &ctx, &table).await);
            }
        }

        if session.is_finished() {
            break;
        }
    }

    // Commands queued behind the winning shot.
    rx.close();
    while let Some(command) = rx.recv().await {
        let _ = command.into_reply().send(Err(SessionError::GameAlreadyFinished));
    }

    debug!("Session {} worker stopped", session.id.short());
    session.is_finished()
}

/// Wait for a worker and clean up after it however it stopped.
async fn supervise(
    id: SessionId,
    players: [PlayerId; 2],
    worker: JoinHandle<bool>,
    ctx: SessionContext,
    table: Arc<RwLock<SessionTable>>,
) {
    match worker.await {
        Ok(true) => return,
        Ok(false) => debug!("Session {} closed without a winner", id.short()),
        Err(e) => error!("Session {} worker failed: {}", id.short(), e),
    }

    table.write().await.running.remove(&id);
    ctx.rooms.write().await.release(&players);
}

impl SessionCommand {
    fn into_reply(self) -> Reply {
        match self {
            SessionCommand::SubmitFleet { reply, .. }
            | SessionCommand::Attack { reply, .. }
            | SessionCommand::RandomAttack { reply, .. } => reply,
        }
    }
}

async fn announce_start(session: &Session, turn_owner: PlayerId, ctx: &SessionContext) {
    let players = ctx.players.read().await;
    for player in session.players() {
        let ships = session
            .slot(&player)
            .and_then(|slot| slot.fleet.as_ref())
            .map(|fleet| fleet.ships().to_vec())
            .unwrap_or_default();
        ctx.fanout.to_player(&players, &player, fanout::start_game(&ships, player));
    }
    ctx.fanout
        .to_players(&players, &session.players(), &[fanout::turn(turn_owner)]);

    info!("Session {} started, {} moves first", session.id.short(), turn_owner.short());
}

async fn publish(
    session: &Session,
    result: Result<AttackReport, SessionError>,
    ctx: &SessionContext,
    table: &Arc<RwLock<SessionTable>>,
) -> Result<(), SessionError> {
    let report = result?;
    debug!(
        "Session {} {} fires at ({}, {}): {:?}",
        session.id.short(),
        report.attacker.short(),
        report.cell.x,
        report.cell.y,
        report.status
    );

    {
        let players = ctx.players.read().await;
        ctx.fanout
            .to_players(&players, &session.players(), &fanout::attack_events(&report));
    }

    if let Some(winner) = report.winner {
        finish(session, winner, ctx, table).await;
    }
    Ok(())
}

/// Record the win, rebroadcast the table and retire the session.
async fn finish(session: &Session, winner: PlayerId, ctx: &SessionContext, table: &Arc<RwLock<SessionTable>>) {
    let winners = {
        let mut players = ctx.players.write().await;
        if let Err(e) = players.record_win(&winner) {
            warn!("Session {} could not record win: {}", session.id.short(), e);
        }
        fanout::winners_table(&players)
    };
    ctx.fanout.broadcast(winners);

    ctx.rooms.write().await.release(&session.players());

    table.write().await.retire(session.id);

    info!("Session {} finished, winner {}", session.id.short(), winner.short());
}

// =============================================================================
// TESTS
// =============================================================================
