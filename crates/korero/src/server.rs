//! `KoreroServer` builder, accept loop and timer loop.
//!
//! The server ties the layers together: transport → protocol → rooms.
//! One [`SessionManager`] owns every room and is shared by the
//! connection tasks and the timer loop behind a single lock. The lock
//! is held only to read or change the room maps; awaiting room actors
//! happens on cloned handles after it is released.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use korero_game::{StarterVocabulary, Vocabulary};
use korero_protocol::{Codec, JsonCodec};
use korero_room::{
    BotPolicy, CasualBot, RoomConfig, RoomHandle, SessionManager, release_seats, stale_rooms,
};
use korero_session::SessionConfig;
use korero_timer::{TickConfig, TickScheduler, unix_millis};
use korero_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::KoreroError;
use crate::config::ServerConfig;
use crate::handler::handle_connection;
use crate::leaderboard::Leaderboard;

/// State shared by every connection task and the timer loop.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) leaderboard: Mutex<Leaderboard>,
    pub(crate) codec: C,
    pub(crate) connection_idle_timeout: Duration,
}

/// Builder for configuring and starting a Korero server.
///
/// # Example
///
/// ```rust,ignore
/// use korero::prelude::*;
///
/// let server = KoreroServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct KoreroServerBuilder {
    config: ServerConfig,
    vocabulary: Arc<dyn Vocabulary>,
    bot_policy: Arc<dyn BotPolicy>,
}

impl KoreroServerBuilder {
    pub fn new() -> Self {
        Self::from_config(ServerConfig::default())
    }

    pub fn from_config(config: ServerConfig) -> Self {
        Self {
            config,
            vocabulary: Arc::new(StarterVocabulary::new()),
            bot_policy: Arc::new(CasualBot::default()),
        }
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind = addr.to_string();
        self
    }

    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    pub fn tick_config(mut self, config: TickConfig) -> Self {
        self.config.tick = config;
        self
    }

    pub fn leaderboard_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.leaderboard_path = Some(path.into());
        self
    }

    pub fn connection_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_idle_timeout = timeout;
        self
    }

    /// Replaces the built-in starter word list.
    pub fn vocabulary(mut self, vocabulary: Arc<dyn Vocabulary>) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    pub fn bot_policy(mut self, policy: Arc<dyn BotPolicy>) -> Self {
        self.bot_policy = policy;
        self
    }

    /// Binds the listener and loads the leaderboard.
    pub async fn build(self) -> Result<KoreroServer<JsonCodec>, KoreroError> {
        let ServerConfig {
            bind,
            leaderboard_path,
            connection_idle_timeout,
            room,
            session,
            tick,
        } = self.config;

        let leaderboard = match leaderboard_path {
            Some(path) => Leaderboard::load(path)?,
            None => Leaderboard::in_memory(),
        };
        let transport = WebSocketTransport::bind(&bind).await?;

        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::with_content(
                room,
                session,
                self.vocabulary,
                self.bot_policy,
            )),
            leaderboard: Mutex::new(leaderboard),
            codec: JsonCodec,
            connection_idle_timeout,
        });

        Ok(KoreroServer {
            transport,
            state,
            tick,
        })
    }
}

impl Default for KoreroServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Korero server. Call [`run`](Self::run) to start serving.
pub struct KoreroServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
    tick: TickConfig,
}

impl KoreroServer<JsonCodec> {
    pub fn builder() -> KoreroServerBuilder {
        KoreroServerBuilder::new()
    }
}

impl<C: Codec> KoreroServer<C> {
    pub fn local_addr(&self) -> Result<SocketAddr, KoreroError> {
        Ok(self.transport.local_addr()?)
    }

    /// Starts the timer loop and accepts connections until the process
    /// is terminated.
    pub async fn run(mut self) -> Result<(), KoreroError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "korero server running");

        tokio::spawn(run_timers(Arc::clone(&self.state), self.tick.clone()));

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
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Once per tick: post a timer tick to every room, release seats whose
/// reconnect grace has passed, and reap abandoned or idle rooms.
async fn run_timers<C: Codec>(state: Arc<ServerState<C>>, config: TickConfig) {
    let mut scheduler = TickScheduler::new(config);
    loop {
        let info = scheduler.wait_for_tick().await;
        let (handles, expired, idle_timeout) = {
            let mut sessions = state.sessions.lock().await;
            sessions.tick_all(unix_millis());
            (
                sessions.room_handles(),
                sessions.take_expired(Instant::now()),
                sessions.config().idle_timeout,
            )
        };

        release_seats(&handles, &expired).await;
        let stale = stale_rooms(&handles, idle_timeout).await;
        let doomed: Vec<RoomHandle> = if stale.is_empty() {
            Vec::new()
        } else {
            let mut sessions = state.sessions.lock().await;
            stale
                .iter()
                .filter_map(|code| sessions.remove_room(code))
                .collect()
        };
        for handle in &doomed {
            let _ = handle.shutdown().await;
        }

        if !expired.is_empty() || !doomed.is_empty() {
            tracing::debug!(
                tick = info.tick,
                released = expired.len(),
                reaped = doomed.len(),
                rooms = handles.len().saturating_sub(doomed.len()),
                "maintenance pass"
            );
        }
        scheduler.record_tick_end();
    }
}
