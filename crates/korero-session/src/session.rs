//! What the server remembers about a player who dropped mid-game.

use std::time::{Duration, Instant};

use korero_game::PlayerId;
use korero_protocol::RoomCode;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a dropped player's seat is held for them.
    ///
    /// Default: 60 seconds.
    pub reconnect_grace: Duration,

    /// How long an expired seat is remembered after the sweep releases
    /// it, so a late reconnect is told it expired rather than that it
    /// never existed.
    ///
    /// Default: 10 minutes.
    pub expired_memory: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace: Duration::from_secs(60),
            expired_memory: Duration::from_secs(10 * 60),
        }
    }
}

/// A seat held for a disconnected player.
///
/// Players have no accounts, so the seat is found again by display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldSeat {
    pub player_id: PlayerId,
    pub room_code: RoomCode,
    /// Display name as the player originally typed it.
    pub name: String,
    pub since: Instant,
}

impl HeldSeat {
    /// Returns `true` once more than `grace` has passed since the drop.
    pub fn is_expired(&self, grace: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.since) > grace
    }
}

/// Lookup key for a display name: trimmed and lower-cased.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}
