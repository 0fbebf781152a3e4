//! Game rule constants and tunables.

use serde::{Deserialize, Serialize};

/// Cards dealt to each player at the start and on a mid-game join.
pub const DEFAULT_HAND_SIZE: usize = 7;
/// Cards a speaker draws when their sentence is rejected.
pub const PENALTY_DRAW: usize = 3;
/// Most cards a round winner may throw away.
pub const MAX_DISCARD: usize = 2;
/// Percentage of a redealt hand that must match the new pattern's colors.
pub const PATTERN_MATCH_PERCENT: usize = 60;
pub const MIN_PLAYERS: usize = 2;

/// Per-game settings fixed at game creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub hand_size: usize,
    pub turn_time_limit_secs: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            hand_size: DEFAULT_HAND_SIZE,
            turn_time_limit_secs: 30,
        }
    }
}
