//! # Korero
//!
//! Authoritative server for a multiplayer, turn-based Māori
//! sentence-building card game.
//!
//! Players build sentences together on a shared table, speak them aloud,
//! and the rest of the table votes on whether they got it right. This
//! crate wires the layers into a running WebSocket server:
//!
//! ```text
//! korero-transport → korero-protocol → korero-room → korero-game
//!                                          ↑
//!                                     korero-timer
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use korero::prelude::*;
//!
//! # async fn serve() -> Result<(), KoreroError> {
//! let server = KoreroServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod dispatch;
mod error;
mod handler;
mod leaderboard;
mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::KoreroError;
pub use leaderboard::{
    BLOCKED_INITIALS, Leaderboard, LeaderboardError, MAX_ENTRIES, validate_initials,
};
pub use server::{KoreroServer, KoreroServerBuilder};

/// Everything needed to configure and run a server, plus the wire types
/// clients exchange with it.
pub mod prelude {
    pub use crate::{KoreroError, KoreroServer, KoreroServerBuilder, ServerConfig};
    pub use korero_game::{GameAction, Phase, PlayerId, StarterVocabulary, Vocabulary};
    pub use korero_protocol::{
        ClientMessage, Envelope, ErrorKind, GameView, RoomCode, RoomView, ServerMessage,
    };
    pub use korero_room::{BotPolicy, CasualBot, RoomConfig};
    pub use korero_session::SessionConfig;
    pub use korero_timer::TickConfig;
}
