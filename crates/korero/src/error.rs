//! Unified error type for the Korero server.

use korero_protocol::ProtocolError;
use korero_room::RoomError;
use korero_session::SessionError;
use korero_transport::TransportError;

use crate::config::ConfigError;
use crate::leaderboard::LeaderboardError;

/// Top-level error wrapping every layer's error.
#[derive(Debug, thiserror::Error)]
pub enum KoreroError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Leaderboard(#[from] LeaderboardError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use korero_protocol::RoomCode;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::SendFailed("gone".into());
        let err: KoreroError = err.into();
        assert!(matches!(err, KoreroError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_room_error_keeps_message() {
        let err: KoreroError = RoomError::NotFound(RoomCode::new("ABCD")).into();
        assert!(matches!(err, KoreroError::Room(_)));
        assert!(err.to_string().contains("ABCD"));
    }

    #[test]
    fn test_from_leaderboard_error() {
        let err: KoreroError = LeaderboardError::InvalidInitials("ab".into()).into();
        assert!(matches!(err, KoreroError::Leaderboard(_)));
    }
}
