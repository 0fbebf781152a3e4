//! Room configuration.

use std::time::Duration;

use korero_game::GameConfig;
use korero_timer::TimerSettings;
use serde::{Deserialize, Serialize};

/// Settings shared by every room a server creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Minimum players required to start a game.
    pub min_players: usize,

    /// Maximum members (humans and bots) allowed in a room.
    pub max_players: usize,

    /// Cards dealt per player, at start and on a mid-game join.
    pub hand_size: usize,

    /// Seconds the current player has in `playing` before an auto-pass.
    pub turn_time_limit: Duration,

    /// Seconds the selector has in `topicSelect` before a random pick.
    pub topic_time_limit: Duration,

    /// A room with no activity for this long is reaped.
    pub idle_timeout: Duration,

    /// Pause before a bot acts, so humans can follow along.
    pub bot_delay: Duration,

    /// Seeds every room's RNG. `None` draws a fresh seed per room.
    pub seed: Option<u64>,

    /// Capacity of each room's command mailbox.
    pub mailbox_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 6,
            hand_size: 7,
            turn_time_limit: Duration::from_secs(30),
            topic_time_limit: Duration::from_secs(15),
            idle_timeout: Duration::from_secs(5 * 60),
            bot_delay: Duration::from_millis(1500),
            seed: None,
            mailbox_size: 64,
        }
    }
}

impl RoomConfig {
    pub fn with_max_players(mut self, max_players: usize) -> Self {
        self.max_players = max_players;
        self
    }

    pub fn with_turn_time_limit(mut self, limit: Duration) -> Self {
        self.turn_time_limit = limit;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_bot_delay(mut self, delay: Duration) -> Self {
        self.bot_delay = delay;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// The per-game settings a new game in this room is created with.
    pub fn game_config(&self) -> GameConfig {
        GameConfig {
            hand_size: self.hand_size,
            turn_time_limit_secs: self.turn_time_limit.as_secs(),
        }
    }

    pub fn timer_settings(&self, chill_mode: bool) -> TimerSettings {
        TimerSettings {
            topic_select_secs: self.topic_time_limit.as_secs(),
            chill_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.min_players, 2);
        assert_eq!(config.max_players, 6);
        assert_eq!(config.hand_size, 7);
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_game_config_carries_turn_limit() {
        let config = RoomConfig::default().with_turn_time_limit(Duration::from_secs(45));
        let game = config.game_config();
        assert_eq!(game.turn_time_limit_secs, 45);
        assert_eq!(game.hand_size, 7);
    }

    #[test]
    fn test_timer_settings_reflect_chill_mode() {
        let config = RoomConfig::default();
        assert!(config.timer_settings(true).chill_mode);
        assert_eq!(config.timer_settings(false).topic_select_secs, 15);
    }
}
