//! Error types for the session layer.

use korero_protocol::RoomCode;

/// Why a reconnect attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Nobody under this name dropped recently.
    #[error("no session to resume for {0}")]
    NoSession(String),

    /// The grace period ran out before the player came back.
    #[error("session for {0} has expired")]
    Expired(String),

    /// The seat was held but its room no longer exists.
    #[error("room {0} no longer exists")]
    RoomGone(RoomCode),
}
