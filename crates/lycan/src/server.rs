//! `LycanServer` builder and server loop.
//!
//! This is the entry point for running a Lycan game server. It ties
//! together all the layers: transport → protocol → gateway → rooms.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lycan_protocol::{Codec, JsonCodec, PlayerId};
use lycan_room::{PhaseDurations, RoomRegistry};
use lycan_transport::{Transport, WebSocketTransport};

use crate::LycanError;
use crate::handler::handle_connection;

/// Server-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,
    /// Phase deadlines applied to every room this server opens.
    pub durations: PhaseDurations,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            durations: PhaseDurations::default(),
        }
    }
}

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) registry: RoomRegistry,
    pub(crate) codec: C,
    pub(crate) durations: PhaseDurations,
    next_player_id: AtomicU64,
}

impl<C: Codec> ServerState<C> {
    /// Hands out a fresh id for every connection. Ids are never reused
    /// within a process.
    pub(crate) fn allocate_player_id(&self) -> PlayerId {
        PlayerId(self.next_player_id.fetch_add(1, Ordering::Relaxed))
    }
}

/// Builder for configuring and starting a Lycan server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), lycan::LycanError> {
/// use lycan::prelude::*;
///
/// let server = LycanServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Default)]
pub struct LycanServerBuilder {
    config: ServerConfig,
}

impl LycanServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the phase deadlines for every room.
    pub fn durations(mut self, durations: PhaseDurations) -> Self {
        self.config.durations = durations;
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener and builds the server with the JSON codec.
    pub async fn build(self) -> Result<LycanServer<JsonCodec>, LycanError> {
        self.build_with_codec(JsonCodec).await
    }

    /// Binds the listener and builds the server with a custom codec.
    pub async fn build_with_codec<C: Codec>(self, codec: C) -> Result<LycanServer<C>, LycanError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry: RoomRegistry::new(),
            codec,
            durations: self.config.durations,
            next_player_id: AtomicU64::new(1),
        });

        Ok(LycanServer { transport, state })
    }
}

/// A running Lycan game server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct LycanServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl LycanServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> LycanServerBuilder {
        LycanServerBuilder::new()
    }
}

impl<C: Codec> LycanServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The registry of live rooms, shared with every connection.
    pub fn registry(&self) -> &RoomRegistry {
        &self.state.registry
    }

    /// Runs the server accept loop.
    ///
    /// Spawns a handler task for each accepted connection. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), LycanError> {
        tracing::info!(addr = ?self.local_addr().ok(), "Lycan server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }
}
