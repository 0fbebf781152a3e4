//! Per-player projections of room and game state.
//!
//! The server never sends a raw [`Game`]. Each member receives a
//! [`GameView`] built for them: other players' hands are replaced by
//! same-length placeholders, the draw pile is always empty (only its size
//! is shown), and rank cards still face down are valueless unless they
//! belong to the viewer.

use std::collections::BTreeMap;

use korero_game::{
    Card, CardColor, ConnectionStatus, Game, Phase, PlayedCard, PlayerId, TableSlot, TopicId,
};
use serde::{Deserialize, Serialize};

use crate::RoomCode;

/// A card as one viewer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CardView {
    Visible(Card),
    /// Serialized as `{"hidden": true}`.
    Hidden { hidden: bool },
}

impl CardView {
    pub fn hidden() -> Self {
        Self::Hidden { hidden: true }
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self, Self::Hidden { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub hand: Vec<CardView>,
    pub is_active: bool,
    pub position: usize,
    pub connection_status: ConnectionStatus,
    pub consecutive_auto_skips: u32,
    pub score: u32,
    pub sentence_streak: u32,
    pub is_bot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOrderCardView {
    pub player_id: PlayerId,
    /// `None` while face down, unless the card is the viewer's own.
    pub value: Option<u32>,
    pub revealed: bool,
    pub placeholder: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnStateView {
    pub cards_played: Vec<PlayedCard>,
    /// Sorted; the in-memory set becomes a list only here.
    pub colors_played_this_turn: Vec<CardColor>,
    pub awaiting_verification: bool,
    pub spoken_sentence: Option<String>,
    pub translation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub id: String,
    /// Whose view this is.
    pub viewer: PlayerId,
    pub players: Vec<PlayerView>,
    pub current_player_index: usize,
    pub current_player_id: Option<PlayerId>,
    pub table_slots: Vec<TableSlot>,
    /// Always empty on the wire.
    pub draw_pile: Vec<Card>,
    pub draw_pile_count: usize,
    pub discard_pile: Vec<Card>,
    pub starting_pattern: Vec<CardColor>,
    pub phase: Phase,
    pub turn_state: TurnStateView,
    pub verification_votes: BTreeMap<PlayerId, bool>,
    pub winners_in_order: Vec<PlayerId>,
    pub loser_id: Option<PlayerId>,
    pub timer_started_at: Option<u64>,
    pub turn_time_limit_secs: u64,
    pub turn_order_cards: Vec<TurnOrderCardView>,
    pub turn_order_winner: Option<PlayerId>,
    pub current_topic: Option<TopicId>,
    pub current_pattern: Vec<CardColor>,
}

impl GameView {
    /// Builds the view `viewer` is allowed to see.
    ///
    /// A viewer who is not seated (a spectator) sees every hand hidden.
    pub fn for_viewer(game: &Game, viewer: &PlayerId) -> Self {
        let players = game
            .players
            .iter()
            .map(|p| {
                let hand = if &p.id == viewer {
                    p.hand.iter().cloned().map(CardView::Visible).collect()
                } else {
                    vec![CardView::hidden(); p.hand.len()]
                };
                PlayerView {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    hand,
                    is_active: p.is_active,
                    position: p.position,
                    connection_status: p.connection_status,
                    consecutive_auto_skips: p.consecutive_auto_skips,
                    score: p.score,
                    sentence_streak: p.sentence_streak,
                    is_bot: p.is_bot(),
                }
            })
            .collect();

        let turn_order_cards = game
            .turn_order_cards
            .iter()
            .map(|c| TurnOrderCardView {
                player_id: c.player_id.clone(),
                value: (c.revealed || &c.player_id == viewer).then_some(c.value),
                revealed: c.revealed,
                placeholder: c.placeholder,
            })
            .collect();

        let turn_state = TurnStateView {
            cards_played: game.turn_state.cards_played.clone(),
            colors_played_this_turn: game
                .turn_state
                .colors_played_this_turn
                .iter()
                .copied()
                .collect(),
            awaiting_verification: game.turn_state.awaiting_verification,
            spoken_sentence: game.turn_state.spoken_sentence.clone(),
            translation: game.turn_state.translation.clone(),
        };

        Self {
            id: game.id.clone(),
            viewer: viewer.clone(),
            players,
            current_player_index: game.current_player_index,
            current_player_id: game.current_player_id().cloned(),
            table_slots: game.table_slots.clone(),
            draw_pile: Vec::new(),
            draw_pile_count: game.draw_pile.len(),
            discard_pile: game.discard_pile.clone(),
            starting_pattern: game.starting_pattern.clone(),
            phase: game.phase,
            turn_state,
            verification_votes: game.verification_votes.clone(),
            winners_in_order: game.winners_in_order.clone(),
            loser_id: game.loser_id.clone(),
            timer_started_at: game.timer_started_at,
            turn_time_limit_secs: game.turn_time_limit_secs,
            turn_order_cards,
            turn_order_winner: game.turn_order_winner.clone(),
            current_topic: game.current_topic.clone(),
            current_pattern: game.current_pattern.clone(),
        }
    }

    pub fn player(&self, id: &PlayerId) -> Option<&PlayerView> {
        self.players.iter().find(|p| &p.id == id)
    }
}

/// A room member as shown in the lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub id: PlayerId,
    pub name: String,
    pub is_ready: bool,
    pub is_bot: bool,
    pub is_host: bool,
    /// Seat status while a game runs; `None` in the lobby.
    pub connection_status: Option<ConnectionStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub code: RoomCode,
    pub members: Vec<MemberView>,
    pub host_id: Option<PlayerId>,
    pub chill_mode: bool,
    pub max_players: usize,
    pub in_game: bool,
}
