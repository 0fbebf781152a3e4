//! Game model and rules for Korero, a turn-based sentence-building card game.
//!
//! Players build te reo Māori sentences on a shared table of color-coded
//! slots, say them aloud, and let the other players vote on them.
//!
//! Everything here is synchronous and free of I/O:
//!
//! - [`Game`] is an immutable snapshot of one game.
//! - [`apply`] validates a [`GameAction`] and returns the next snapshot
//!   plus the [`GameEvent`]s it produced.
//! - [`start_game`], [`seat_player`], and [`remove_player`] manage the
//!   roster around the turn loop.
//! - [`score_sentence`] turns an approved sentence into points.
//! - [`Vocabulary`] supplies cards, topics, and color patterns.
//!
//! Randomness is injected as `&mut dyn RngCore` so a seeded generator
//! replays a game exactly.

mod card;
pub mod config;
mod error;
mod event;
mod ids;
mod lifecycle;
mod machine;
mod model;
pub mod scoring;
mod vocabulary;

pub use card::{Card, CardColor, WordType};
pub use config::GameConfig;
pub use error::GameError;
pub use event::{ContributorScore, GameEvent};
pub use ids::{BOT_ID_PREFIX, CardId, PlayerId, SlotId, TopicId};
pub use lifecycle::{
    AWAY_AFTER_SKIPS, note_player_action, record_auto_skip, remove_player, seat_player,
    set_connection, start_game,
};
pub use machine::{GameAction, Transition, apply};
pub use model::{
    ConnectionStatus, Game, Phase, PlayedCard, Player, TableSlot, TurnOrderCard, TurnState,
};
pub use scoring::{ScoreBreakdown, SentenceFlags, score_sentence};
pub use vocabulary::{StarterVocabulary, Topic, Vocabulary, WordEntry};
