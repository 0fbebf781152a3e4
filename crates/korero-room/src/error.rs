//! Error types for the room layer.

use korero_game::{GameError, PlayerId};
use korero_protocol::RoomCode;
use korero_session::SessionError;

/// Errors that can occur during room operations.
///
/// Every variant is reported to the requesting connection only.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    #[error("room {0} is full")]
    Full(RoomCode),

    /// Joining by code is closed while a game runs.
    #[error("room {0} already has a game in progress")]
    AlreadyStarted(RoomCode),

    #[error("only the host can do that")]
    NotHost(PlayerId),

    #[error("player {0} already in room {1}")]
    AlreadyInRoom(PlayerId, RoomCode),

    #[error("player {0} not in room {1}")]
    NotInRoom(PlayerId, RoomCode),

    /// The connection has not joined any room.
    #[error("you are not in a room")]
    NoRoom,

    #[error("no game is running")]
    NoGame,

    #[error("waiting for {0} to be ready")]
    NotReady(String),

    #[error("player name must not be empty")]
    EmptyName,

    /// The game rejected the action.
    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The room's command channel is full or closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}
