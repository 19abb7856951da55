//! WebSocket Game Server
//!
//! Async WebSocket transport. Accepts connections, decodes frames into
//! [`ClientMessage`]s for the [`Hub`], and drains each connection's outbound
//! queue back onto its socket.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::core::ids::ConnectionId;
use crate::game::state::TurnPolicy;
use crate::network::fanout::Outbox;
use crate::network::hub::Hub;
use crate::network::protocol::{ClientMessage, ServerMessage};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Turn passing after hits.
    pub turn_policy: TurnPolicy,
    /// Fixed RNG entropy; random per process when unset.
    pub seed: Option<u64>,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_connections: 1000,
            turn_policy: TurnPolicy::default(),
            seed: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables, falling back to defaults.
    ///
    /// - `BROADSIDE_BIND_ADDR` (e.g. `127.0.0.1:3000`)
    /// - `BROADSIDE_MAX_CONNECTIONS`
    /// - `BROADSIDE_TURN_POLICY` (`shoot_again` | `alternate`)
    /// - `BROADSIDE_SEED`
    pub fn from_env() -> Result<Self, GameServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, GameServerError> {
        let mut config = Self::default();

        if let Some(addr) = lookup("BROADSIDE_BIND_ADDR") {
            config.bind_addr = addr
                .parse()
                .map_err(|_| GameServerError::Config(format!("invalid BROADSIDE_BIND_ADDR: {addr}")))?;
        }
        if let Some(max) = lookup("BROADSIDE_MAX_CONNECTIONS") {
            config.max_connections = max
                .parse()
                .map_err(|_| GameServerError::Config(format!("invalid BROADSIDE_MAX_CONNECTIONS: {max}")))?;
        }
        if let Some(policy) = lookup("BROADSIDE_TURN_POLICY") {
            config.turn_policy = TurnPolicy::from_name(&policy)
                .ok_or_else(|| GameServerError::Config(format!("invalid BROADSIDE_TURN_POLICY: {policy}")))?;
        }
        if let Some(seed) = lookup("BROADSIDE_SEED") {
            config.seed = Some(
                seed.parse()
                    .map_err(|_| GameServerError::Config(format!("invalid BROADSIDE_SEED: {seed}")))?,
            );
        }

        Ok(config)
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Bad configuration value.
    #[error("Configuration error: {0}")]
    Config(String),
}

// =============================================================================
// CONNECTION TABLE
// =============================================================================

/// Outbound queues of every open connection.
#[derive(Default)]
pub struct Connections {
    next_id: AtomicU64,
    senders: RwLock<BTreeMap<ConnectionId, mpsc::UnboundedSender<ServerMessage>>>,
}

impl Connections {
    /// Allocate a handle and its outbound queue.
    pub fn open(&self) -> (ConnectionId, mpsc::UnboundedReceiver<ServerMessage>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.write().insert(id, tx);
        (id, rx)
    }

    /// Drop a connection's queue.
    pub fn close(&self, id: ConnectionId) {
        self.senders.write().remove(&id);
    }

    /// Number of open connections.
    pub fn len(&self) -> usize {
        self.senders.read().len()
    }

    /// Whether no connection is open.
    pub fn is_empty(&self) -> bool {
        self.senders.read().is_empty()
    }
}

impl Outbox for Connections {
    fn send(&self, to: ConnectionId, message: ServerMessage) {
        if let Some(tx) = self.senders.read().get(&to) {
            let _ = tx.send(message);
        }
    }

    fn broadcast(&self, message: ServerMessage) {
        for tx in self.senders.read().values() {
            let _ = tx.send(message.clone());
        }
    }
}

// =============================================================================
// SERVER
// =============================================================================

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Command routing and game state.
    hub: Arc<Hub>,
    /// Open connections.
    connections: Arc<Connections>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let connections = Arc::new(Connections::default());
        let entropy = config.seed.unwrap_or_else(|| Uuid::new_v4().as_u128() as u64);
        let hub = Arc::new(Hub::new(connections.clone(), config.turn_policy, entropy));

        Self {
            config,
            hub,
            connections,
            shutdown_tx,
        }
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown.
    #[instrument(skip(self, listener))]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!(
            "Broadside server v{} listening on {} ({:?})",
            self.config.version,
            listener.local_addr()?,
            self.config.turn_policy
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.connections.len() >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let hub = self.hub.clone();
        let connections = self.connections.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (conn, mut msg_rx) = connections.open();
            debug!("{} assigned to {}", addr, conn);

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                match ClientMessage::from_json(&text) {
                                    Ok(client_msg) => hub.handle(conn, client_msg).await,
                                    Err(e) => hub.malformed(conn, &e),
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                warn!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            // Cleanup
            connections.close(conn);
            hub.connection_closed(conn).await;
            sender_task.abort();

            info!("Client {} cleaned up", addr);
        });
    }

    /// The command hub.
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
