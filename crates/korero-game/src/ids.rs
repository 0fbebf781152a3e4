//! Identity newtypes shared by every layer.
//!
//! All identities are strings on the wire. They are wrapped so a card id
//! can never be passed where a slot id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reserved socket-identity prefix marking a simulated player.
pub const BOT_ID_PREFIX: &str = "bot-";

/// A player's identity, bound to the socket that created it.
///
/// Reconnecting players get their old identity back, so this outlives
/// any single connection.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identity for the n-th connection accepted by the server.
    pub fn for_socket(n: u64) -> Self {
        Self(format!("sock-{n}"))
    }

    /// Identity for a simulated player.
    pub fn bot(n: u64) -> Self {
        Self(format!("{BOT_ID_PREFIX}{n}"))
    }

    /// Returns `true` if this identity carries the reserved bot prefix.
    pub fn is_bot(&self) -> bool {
        self.0.starts_with(BOT_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identity of one dealt card instance. Two cards with the same text
    /// still have different ids.
    CardId
);

string_id!(
    /// Identity of a table slot. Regenerated slots get fresh ids.
    SlotId
);

string_id!(
    /// Identity of a round topic (e.g. `kai`, `kura`).
    TopicId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_bot_prefix_detected() {
        assert!(PlayerId::bot(3).is_bot());
        assert!(!PlayerId::for_socket(3).is_bot());
        assert!(!PlayerId::new("robot-1").is_bot());
    }

    #[test]
    fn test_player_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&PlayerId::for_socket(7)).unwrap();
        assert_eq!(json, "\"sock-7\"");
    }

    #[test]
    fn test_card_id_display() {
        assert_eq!(CardId::new("card-12").to_string(), "card-12");
    }
}
