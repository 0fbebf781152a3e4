//! Every message that crosses the socket.
//!
//! Client → server messages are bare [`ClientMessage`] objects.
//! Server → client messages are [`ServerMessage`]s wrapped in an
//! [`Envelope`] carrying a per-connection sequence number.
//!
//! Both enums are internally tagged on `type` with SCREAMING_SNAKE_CASE
//! tags and camelCase fields, which is what the browser client expects:
//!
//! ```json
//! { "type": "JOIN_ROOM", "roomCode": "KTRW", "playerName": "Aroha" }
//! ```

use std::fmt;

use korero_game::{CardId, GameAction, GameEvent, Phase, PlayerId, SlotId, TopicId};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{GameView, RoomView};

// ---------------------------------------------------------------------------
// Room codes
// ---------------------------------------------------------------------------

/// Symbols a room code may use: A–Z without the easily confused I and O.
pub const ROOM_CODE_ALPHABET: &[u8; 24] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
pub const ROOM_CODE_LEN: usize = 4;

/// A short, human-typable room identifier such as `KTRW`.
///
/// Codes are case-insensitive on input and always stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    /// Returns `true` for exactly four symbols from [`ROOM_CODE_ALPHABET`].
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == ROOM_CODE_LEN && self.0.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    // -- Lobby --
    /// Join any room with space, or create one.
    FindGame { player_name: String },
    /// Reclaim a seat held since a recent disconnect.
    Reconnect { player_name: String },
    CreateRoom { player_name: String },
    JoinRoom { room_code: RoomCode, player_name: String },
    LeaveRoom,
    ListRooms,
    SetReady { ready: bool },
    AddBot {
        #[serde(default)]
        bot_name: Option<String>,
    },
    StartGame,
    SetChillMode { enabled: bool },

    // -- Game actions --
    RevealTurnOrderCard,
    SelectTopic { topic_id: TopicId },
    PlayCard { card_id: CardId, slot_id: SlotId },
    StackCard { card_id: CardId, slot_id: SlotId },
    CreateSlot { card_id: CardId },
    SubmitTurn { spoken: String, translation: String },
    Vote { approved: bool },
    PassTurn,
    Undo,
    ConfirmTurnEnd,
    DiscardCards { card_ids: Vec<CardId> },
    SkipDiscard,

    // -- Social --
    Chat { content: String },
    Reaction { emoji: String },
    Ping,
    /// Relayed verbatim to one other player in the same room.
    VoiceSignal {
        target_player_id: PlayerId,
        payload: serde_json::Value,
    },

    // -- Leaderboard --
    SubmitScore { initials: String, score: u32 },
    GetLeaderboard,
}

impl ClientMessage {
    /// The game action this message asks for, if it is one.
    pub fn to_game_action(&self) -> Option<GameAction> {
        let action = match self {
            Self::RevealTurnOrderCard => GameAction::RevealTurnOrderCard,
            Self::SelectTopic { topic_id } => GameAction::SelectTopic {
                topic_id: topic_id.clone(),
            },
            Self::PlayCard { card_id, slot_id } => GameAction::PlayCard {
                card_id: card_id.clone(),
                slot_id: slot_id.clone(),
            },
            Self::StackCard { card_id, slot_id } => GameAction::StackCard {
                card_id: card_id.clone(),
                slot_id: slot_id.clone(),
            },
            Self::CreateSlot { card_id } => GameAction::CreateSlot {
                card_id: card_id.clone(),
            },
            Self::SubmitTurn {
                spoken,
                translation,
            } => GameAction::SubmitTurn {
                spoken: spoken.clone(),
                translation: translation.clone(),
            },
            Self::Vote { approved } => GameAction::Vote {
                approved: *approved,
            },
            Self::PassTurn => GameAction::PassTurn,
            Self::Undo => GameAction::Undo,
            Self::ConfirmTurnEnd => GameAction::ConfirmTurnEnd,
            Self::DiscardCards { card_ids } => GameAction::DiscardCards {
                card_ids: card_ids.clone(),
            },
            Self::SkipDiscard => GameAction::SkipDiscard,
            _ => return None,
        };
        Some(action)
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The request was understood but not allowed right now.
    PreconditionViolation,
    /// The request could not be parsed.
    TransportFault,
}

/// One row of the room browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListEntry {
    pub room_code: RoomCode,
    pub player_count: usize,
    pub max_players: usize,
    pub in_game: bool,
    pub host_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub initials: String,
    pub score: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub achieved_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// First message on every connection.
    Connected { player_id: PlayerId },
    RoomJoined {
        room_code: RoomCode,
        player_id: PlayerId,
        is_host: bool,
    },
    RoomLeft,
    RoomList { rooms: Vec<RoomListEntry> },
    Reconnected {
        room_code: RoomCode,
        player_id: PlayerId,
    },
    /// Full sanitized snapshot, sent after every committed change.
    RoomState {
        room: RoomView,
        game: Option<GameView>,
    },
    TimerUpdate { phase: Phase, remaining_secs: u64 },
    Event { event: GameEvent },
    Chat {
        from: PlayerId,
        name: String,
        content: String,
    },
    Reaction { from: PlayerId, emoji: String },
    Pong { server_time: u64 },
    VoiceSignal {
        from: PlayerId,
        payload: serde_json::Value,
    },
    Leaderboard { entries: Vec<LeaderboardEntry> },
    /// `rank` is 1-based, or `None` if the score did not make the board.
    ScoreSubmitted { rank: Option<usize> },
    /// Sent only to the connection whose request failed.
    Error { kind: ErrorKind, message: String },
}

impl ServerMessage {
    pub fn precondition(message: impl fmt::Display) -> Self {
        Self::Error {
            kind: ErrorKind::PreconditionViolation,
            message: message.to_string(),
        }
    }

    pub fn transport_fault(message: impl fmt::Display) -> Self {
        Self::Error {
            kind: ErrorKind::TransportFault,
            message: message.to_string(),
        }
    }
}

/// Outbound wrapper. `seq` increases by one per message on a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub seq: u64,
    /// Unix milliseconds at send time.
    pub timestamp: u64,
    pub payload: ServerMessage,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    // =====================================================================
    // Room codes
    // =====================================================================

    #[test]
    fn test_room_code_normalizes_case() {
        let code = RoomCode::new(" ktrw ");
        assert_eq!(code.as_str(), "KTRW");
        assert!(code.is_well_formed());
    }

    #[test]
    fn test_room_code_rejects_ambiguous_glyphs() {
        assert!(!RoomCode::new("KOIW").is_well_formed());
        assert!(!RoomCode::new("KTR").is_well_formed());
        assert!(!RoomCode::new("KTR1").is_well_formed());
    }

    #[test]
    fn test_room_code_alphabet_has_24_symbols() {
        assert_eq!(ROOM_CODE_ALPHABET.len(), 24);
        assert!(!ROOM_CODE_ALPHABET.contains(&b'I'));
        assert!(!ROOM_CODE_ALPHABET.contains(&b'O'));
    }

    // =====================================================================
    // ClientMessage wire shapes
    // =====================================================================

    #[test]
    fn test_join_room_json_format() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "JOIN_ROOM",
            "roomCode": "ktrw",
            "playerName": "Aroha"
        }))
        .unwrap();
        // Deserialization is transparent; normalization happens in `RoomCode::new`.
        let ClientMessage::JoinRoom {
            room_code,
            player_name,
        } = msg
        else {
            panic!("wrong variant");
        };
        assert_eq!(RoomCode::new(room_code.as_str()).as_str(), "KTRW");
        assert_eq!(player_name, "Aroha");
    }

    #[test]
    fn test_unit_messages_need_only_type() {
        let msg: ClientMessage = serde_json::from_value(json!({"type": "LEAVE_ROOM"})).unwrap();
        assert_eq!(msg, ClientMessage::LeaveRoom);
        let msg: ClientMessage =
            serde_json::from_value(json!({"type": "CONFIRM_TURN_END"})).unwrap();
        assert_eq!(msg, ClientMessage::ConfirmTurnEnd);
    }

    #[test]
    fn test_add_bot_name_is_optional() {
        let msg: ClientMessage = serde_json::from_value(json!({"type": "ADD_BOT"})).unwrap();
        assert_eq!(msg, ClientMessage::AddBot { bot_name: None });
    }

    #[test]
    fn test_play_card_fields_are_camel_case() {
        let msg = ClientMessage::PlayCard {
            card_id: CardId::new("card-3"),
            slot_id: SlotId::new("slot-1"),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"type": "PLAY_CARD", "cardId": "card-3", "slotId": "slot-1"})
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result: Result<ClientMessage, _> =
            serde_json::from_value(json!({"type": "FLY_TO_MOON"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_field_rejected() {
        let result: Result<ClientMessage, _> =
            serde_json::from_value(json!({"type": "PLAY_CARD", "cardId": "card-1"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_to_game_action_covers_game_messages_only() {
        let vote = ClientMessage::Vote { approved: true };
        assert_eq!(
            vote.to_game_action(),
            Some(GameAction::Vote { approved: true })
        );
        assert_eq!(ClientMessage::Ping.to_game_action(), None);
        assert_eq!(ClientMessage::StartGame.to_game_action(), None);
    }

    // =====================================================================
    // ServerMessage wire shapes
    // =====================================================================

    #[test]
    fn test_timer_update_json_format() {
        let msg = ServerMessage::TimerUpdate {
            phase: Phase::TopicSelect,
            remaining_secs: 7,
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "TIMER_UPDATE", "phase": "topicSelect", "remainingSecs": 7})
        );
    }

    #[test]
    fn test_precondition_error_json_format() {
        let msg = ServerMessage::precondition("it is not sock-2's turn");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "ERROR",
                "kind": "PRECONDITION_VIOLATION",
                "message": "it is not sock-2's turn"
            })
        );
    }

    #[test]
    fn test_leaderboard_entry_uses_rfc3339() {
        let entry = LeaderboardEntry {
            initials: "ABC".into(),
            score: 120,
            achieved_at: OffsetDateTime::UNIX_EPOCH,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["achievedAt"], "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_envelope_wraps_payload() {
        let env = Envelope {
            seq: 3,
            timestamp: 1_000,
            payload: ServerMessage::Pong { server_time: 1_000 },
        };
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["seq"], 3);
        assert_eq!(value["payload"]["type"], "PONG");
        assert_eq!(value["payload"]["serverTime"], 1_000);
    }
}
