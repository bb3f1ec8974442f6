//! WebTransport server implementation
//!
//! One task per connection reads framed client messages; every mutation of
//! the shared registry happens inside a handler holding the state lock, and
//! the broadcasts it mandates are enqueued on per-connection outboxes before
//! the lock is released. Handlers never await under the lock, so message
//! handling is serialized and every client observes registry changes in
//! causal order. Actual socket writes are drained by per-connection writer
//! tasks, fire-and-forget.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::game::constants::net;
use crate::game::registry::{ConnectionId, PlayerRegistry, PlayerState, RegistryError};
use crate::metrics::Metrics;
use crate::net::connection::{Connection, ConnectionManager};
use crate::net::framing::{self, FramingError};
use crate::net::protocol::{self, ClientMessage, ServerMessage, PROTOCOL_VERSION};
use crate::net::tls::TlsConfig;
use crate::world::level::Level;

/// Shared mutable server state: the player registry, the connection table
/// and the per-connection outboxes
pub struct ServerState {
    pub registry: PlayerRegistry,
    pub connections: ConnectionManager,
    outboxes: hashbrown::HashMap<ConnectionId, mpsc::UnboundedSender<ServerMessage>>,
    metrics: Arc<Metrics>,
}

impl ServerState {
    pub fn new(levels: &[Level], metrics: Arc<Metrics>) -> Self {
        Self {
            registry: PlayerRegistry::from_levels(levels),
            connections: ConnectionManager::new(),
            outboxes: hashbrown::HashMap::new(),
            metrics,
        }
    }

    /// Register a connection's outbox
    fn attach(&mut self, id: ConnectionId, tx: mpsc::UnboundedSender<ServerMessage>) {
        self.connections.insert(Connection::new(id));
        self.outboxes.insert(id, tx);
    }

    /// Queue a message for one connection
    fn send_to(&self, id: ConnectionId, message: ServerMessage) {
        if let Some(tx) = self.outboxes.get(&id) {
            if tx.send(message).is_ok() {
                self.metrics.messages_sent.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Queue a message for every connection
    fn broadcast(&self, message: &ServerMessage) {
        for tx in self.outboxes.values() {
            if tx.send(message.clone()).is_ok() {
                self.metrics.messages_sent.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.metrics.broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    /// Connect-time sequence: identity, level metadata, exit geometry for
    /// the starting level, then the current player snapshot
    fn greet(&self, id: ConnectionId, levels: &[Level]) {
        self.send_to(
            id,
            ServerMessage::Welcome {
                id,
                protocol_version: PROTOCOL_VERSION,
            },
        );
        self.send_to(id, ServerMessage::LevelInfo(levels.to_vec()));
        if let Some(exit) = levels.first().and_then(|l| l.exits.first()) {
            self.send_to(id, ServerMessage::UpdateExit(exit.clone()));
        }
        self.send_to(id, ServerMessage::UpdatePlayers(self.registry.snapshot()));
    }

    /// Handle one decoded client message
    fn dispatch(&mut self, id: ConnectionId, message: ClientMessage) {
        match message {
            ClientMessage::NewPlayer(player) => self.handle_new_player(id, player),
            ClientMessage::MovePlayer(player) => self.handle_move(id, player),
            ClientMessage::RequestChunk { chunk_x, chunk_y } => {
                // Chunks are generated client-side from the shared seed;
                // there is no server-side chunk authority
                debug!("connection {} entered chunk ({}, {})", id, chunk_x, chunk_y);
            }
            ClientMessage::FinishedLevel => self.handle_finished_level(id),
            ClientMessage::VoiceData { player_id, data } => self.handle_voice(player_id, data),
        }
    }

    fn handle_new_player(&mut self, id: ConnectionId, player: PlayerState) {
        if !player.is_finite() {
            warn!("dropping newPlayer with non-finite position from {}", id);
            self.metrics.invalid_payloads.fetch_add(1, Ordering::Relaxed);
            return;
        }
        let Some(conn) = self.connections.get_mut(id) else {
            return;
        };
        conn.mark_joined();

        self.registry.join(id, player);
        self.metrics
            .players_registered
            .store(self.registry.len() as u64, Ordering::Relaxed);
        info!("player joined: {}", id);

        self.broadcast(&ServerMessage::UpdatePlayers(self.registry.snapshot()));
    }

    fn handle_move(&mut self, id: ConnectionId, proposed: PlayerState) {
        if !proposed.is_finite() {
            warn!("dropping movePlayer with non-finite position from {}", id);
            self.metrics.invalid_payloads.fetch_add(1, Ordering::Relaxed);
            return;
        }
        let Some(conn) = self.connections.get_mut(id) else {
            return;
        };
        if !conn.is_joined() {
            warn!("movePlayer before newPlayer from {}, dropped", id);
            return;
        }
        conn.mark_moving();

        match self.registry.apply_move(id, &proposed) {
            Ok(delta) => {
                if delta.x != proposed.x || delta.y != proposed.y {
                    self.metrics.moves_clamped.fetch_add(1, Ordering::Relaxed);
                }
                // The delta carries the stored post-clamp position
                self.broadcast(&ServerMessage::UpdatePlayerPosition(delta));
            }
            Err(RegistryError::UnknownConnection(_)) => {
                debug!("movePlayer for unregistered connection {}, ignored", id);
            }
        }
    }

    fn handle_finished_level(&mut self, id: ConnectionId) {
        let Some(conn) = self.connections.get_mut(id) else {
            return;
        };
        if !conn.is_joined() {
            warn!("finishedLevel before newPlayer from {}, dropped", id);
            return;
        }
        conn.mark_transitioning();
        // No server-side level transition exists; the client drives its own
        // level changes
        debug!("connection {} reported finishedLevel", id);
    }

    fn handle_voice(&mut self, player_id: ConnectionId, data: Vec<u8>) {
        self.metrics
            .voice_frames_relayed
            .fetch_add(1, Ordering::Relaxed);
        self.broadcast(&ServerMessage::VoiceData { player_id, data });
    }

    /// Tear down a connection: drop its outbox, forget the connection, and
    /// if a player was registered remove it and snapshot-broadcast
    fn handle_disconnect(&mut self, id: ConnectionId) {
        self.outboxes.remove(&id);
        if let Some(mut conn) = self.connections.remove(id) {
            conn.mark_disconnected();
        }
        if self.registry.leave(id).is_some() {
            self.metrics
                .players_registered
                .store(self.registry.len() as u64, Ordering::Relaxed);
            info!("player left: {}", id);
            self.broadcast(&ServerMessage::UpdatePlayers(self.registry.snapshot()));
        }
    }
}

/// WebTransport game server
pub struct GameServer {
    config: ServerConfig,
    tls_config: TlsConfig,
    levels: Arc<Vec<Level>>,
    state: Arc<RwLock<ServerState>>,
    metrics: Arc<Metrics>,
}

impl GameServer {
    /// Create a new server around a static level set
    pub async fn new(
        config: ServerConfig,
        levels: Vec<Level>,
        metrics: Arc<Metrics>,
    ) -> anyhow::Result<Self> {
        let tls_config = TlsConfig::load(&config).await?;
        let state = Arc::new(RwLock::new(ServerState::new(&levels, metrics.clone())));

        Ok(Self {
            config,
            tls_config,
            levels: Arc::new(levels),
            state,
            metrics,
        })
    }

    /// Get the certificate hash for client configuration
    pub fn cert_hash(&self) -> &str {
        self.tls_config.get_cert_hash()
    }

    /// Run the server
    pub async fn run(self) -> anyhow::Result<()> {
        use anyhow::Context;
        use wtransport::Endpoint;
        use wtransport::ServerConfig;

        // The QUIC keep-alive plus idle timeout is the liveness probe: a
        // silent peer is torn down by the transport and surfaces here as
        // stream EOF
        let server_config = ServerConfig::builder()
            .with_bind_default(self.config.port)
            .with_identity(self.tls_config.identity)
            .keep_alive_interval(Some(Duration::from_secs(net::KEEP_ALIVE_INTERVAL_SECS)))
            .max_idle_timeout(Some(Duration::from_secs(net::IDLE_TIMEOUT_SECS)))
            .context("invalid idle timeout")?
            .build();

        let server = Endpoint::server(server_config)?;

        info!("WebTransport server listening on port {}", self.config.port);
        info!("Certificate hash: {}", self.tls_config.cert_hash);

        loop {
            let incoming = server.accept().await;

            let levels = self.levels.clone();
            let state = self.state.clone();
            let metrics = self.metrics.clone();
            let max_connections = self.config.max_connections;

            tokio::spawn(async move {
                if let Err(e) =
                    handle_connection(incoming, levels, state, metrics, max_connections).await
                {
                    warn!("Connection error: {}", e);
                }
            });
        }
    }
}

/// Handle a single WebTransport connection for its whole lifetime
async fn handle_connection(
    incoming: wtransport::endpoint::IncomingSession,
    levels: Arc<Vec<Level>>,
    state: Arc<RwLock<ServerState>>,
    metrics: Arc<Metrics>,
    max_connections: usize,
) -> anyhow::Result<()> {
    let session_request = incoming.await?;
    debug!(
        "New connection from: {:?}, path: {}",
        session_request.authority(),
        session_request.path()
    );
    let connection = session_request.accept().await?;

    let id: ConnectionId = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    {
        let mut st = state.write();
        if st.connections.count() >= max_connections {
            warn!("Connection refused: at capacity ({})", max_connections);
            return Ok(());
        }
        st.attach(id, tx);
        st.greet(id, &levels);
    }
    metrics.connections_active.fetch_add(1, Ordering::Relaxed);
    info!("Connection accepted: {}", id);

    // Drive the streams in an inner block so teardown always runs, even
    // when the client never opens its stream
    let session = async {
        // The client opens one bidirectional stream for the session
        let (send_stream, mut recv_stream) = connection.accept_bi().await?;

        // Writer task drains this connection's outbox in enqueue order
        let writer = tokio::spawn(async move {
            let mut send = send_stream;
            while let Some(message) = rx.recv().await {
                let data = match protocol::encode(&message) {
                    Ok(data) => data,
                    Err(e) => {
                        warn!("Failed to encode outbound message: {}", e);
                        continue;
                    }
                };
                if let Err(e) = framing::write_message(&mut send, &data).await {
                    debug!("Writer stopped: {}", e);
                    break;
                }
            }
        });

        // Read loop; ends on transport EOF, including liveness-probe
        // timeouts
        loop {
            let data = match framing::read_message(&mut recv_stream).await {
                Ok(data) => data,
                Err(FramingError::ConnectionClosed) => break,
                Err(FramingError::MessageTooLarge(size, max)) => {
                    warn!("Oversized frame from {}: {} bytes (max {})", id, size, max);
                    metrics.invalid_payloads.fetch_add(1, Ordering::Relaxed);
                    break;
                }
                Err(FramingError::Io(e)) => {
                    debug!("Stream read error from {}: {}", id, e);
                    break;
                }
            };
            metrics.messages_received.fetch_add(1, Ordering::Relaxed);

            let message: ClientMessage = match protocol::decode(&data) {
                Ok(message) => message,
                Err(e) => {
                    // Malformed payloads are dropped, never fatal to the
                    // registry
                    warn!("Undecodable message from {}, dropped: {}", id, e);
                    metrics.invalid_payloads.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            };

            let mut st = state.write();
            if let Some(conn) = st.connections.get_mut(id) {
                conn.record_received(data.len());
            }
            st.dispatch(id, message);
        }

        Ok::<_, anyhow::Error>(writer)
    }
    .await;

    // Removing the outbox drops the sender; the writer drains and exits
    state.write().handle_disconnect(id);
    metrics.connections_active.fetch_sub(1, Ordering::Relaxed);
    match session {
        Ok(writer) => {
            let _ = writer.await;
        }
        Err(e) => debug!("Stream setup failed for {}: {}", id, e),
    }

    info!("Connection closed: {}", id);
    Ok(())
}
