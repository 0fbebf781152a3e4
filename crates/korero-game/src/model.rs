//! The game snapshot and everything it is made of.
//!
//! A [`Game`] is treated as an immutable value: every transition in
//! [`crate::machine`] clones it, mutates the clone, and hands the clone
//! back. The room commits the new snapshot as a whole.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Card, CardColor, CardId, PlayerId, SlotId, TopicId};

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// The turn-level state machine of a game.
///
/// ```text
/// setup → dealing → turnOrder → topicSelect → playing → verification
///                                    ↑           ↑  ↓         │
///                                    │       turnEnd ←┘       │
///                                    │                        ├─ failure → playing
///                                    └── discardSelect ←──────┤
///                                                             └─ success → topicSelect | finished
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Setup,
    Dealing,
    TurnOrder,
    TopicSelect,
    Playing,
    Verification,
    DiscardSelect,
    TurnEnd,
    Finished,
}

impl Phase {
    /// Returns `true` once the game can no longer change.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Setup => "setup",
            Self::Dealing => "dealing",
            Self::TurnOrder => "turnOrder",
            Self::TopicSelect => "topicSelect",
            Self::Playing => "playing",
            Self::Verification => "verification",
            Self::DiscardSelect => "discardSelect",
            Self::TurnEnd => "turnEnd",
            Self::Finished => "finished",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// Connection state of a seated player, as shown to other players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    /// Soft-kicked after repeated timeouts. Still seated.
    Away,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub hand: Vec<Card>,
    /// `false` once the player has emptied their hand or left.
    pub is_active: bool,
    pub position: usize,
    pub connection_status: ConnectionStatus,
    pub consecutive_auto_skips: u32,
    pub score: u32,
    pub sentence_streak: u32,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, position: usize) -> Self {
        Self {
            id,
            name: name.into(),
            hand: Vec::new(),
            is_active: true,
            position,
            connection_status: ConnectionStatus::Connected,
            consecutive_auto_skips: 0,
            score: 0,
            sentence_streak: 0,
        }
    }

    pub fn is_bot(&self) -> bool {
        self.id.is_bot()
    }

    pub fn hand_index(&self, card_id: &CardId) -> Option<usize> {
        self.hand.iter().position(|c| &c.id == card_id)
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// A color-tagged position in the shared sentence.
///
/// `cards` and `owners` are parallel append-only stacks; the last element
/// is the word currently showing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSlot {
    pub id: SlotId,
    pub color: CardColor,
    pub cards: Vec<Card>,
    pub owners: Vec<PlayerId>,
    pub position: usize,
}

impl TableSlot {
    pub fn new(id: SlotId, color: CardColor, position: usize) -> Self {
        Self {
            id,
            color,
            cards: Vec::new(),
            owners: Vec::new(),
            position,
        }
    }

    pub fn top(&self) -> Option<(&Card, &PlayerId)> {
        self.cards.last().zip(self.owners.last())
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub(crate) fn push(&mut self, card: Card, owner: PlayerId) {
        self.cards.push(card);
        self.owners.push(owner);
    }

    /// Removes a specific card (and its owner entry) from the stack.
    pub(crate) fn remove_card(&mut self, card_id: &CardId) -> Option<Card> {
        let idx = self.cards.iter().position(|c| &c.id == card_id)?;
        self.owners.remove(idx);
        Some(self.cards.remove(idx))
    }
}

/// A turn-order rank card. Dealt once per game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOrderCard {
    pub player_id: PlayerId,
    pub value: u32,
    pub revealed: bool,
    /// Display-only card handed to players seated after turn order was set.
    #[serde(default)]
    pub placeholder: bool,
}

/// One card placed by the acting player during their own turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayedCard {
    pub card: Card,
    pub slot_id: SlotId,
    pub player_id: PlayerId,
    /// Whether this play created `slot_id`.
    #[serde(default)]
    pub created_slot: bool,
    /// Where the card sat in the hand, so undo puts it back in place.
    #[serde(default)]
    pub hand_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnState {
    pub cards_played: Vec<PlayedCard>,
    /// At most one card per color per turn. Kept as a set in memory; the
    /// wire view flattens it to a list.
    pub colors_played_this_turn: BTreeSet<CardColor>,
    pub awaiting_verification: bool,
    pub spoken_sentence: Option<String>,
    pub translation: Option<String>,
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub players: Vec<Player>,
    pub current_player_index: usize,
    pub table_slots: Vec<TableSlot>,
    pub draw_pile: Vec<Card>,
    pub discard_pile: Vec<Card>,
    /// Slots at positions below this pattern's length are structural.
    pub starting_pattern: Vec<CardColor>,
    pub phase: Phase,
    pub turn_state: TurnState,
    pub verification_votes: BTreeMap<PlayerId, bool>,
    pub winners_in_order: Vec<PlayerId>,
    pub loser_id: Option<PlayerId>,
    /// Unix milliseconds at which the current phase timer started.
    pub timer_started_at: Option<u64>,
    pub turn_time_limit_secs: u64,
    pub turn_order_cards: Vec<TurnOrderCard>,
    pub turn_order_winner: Option<PlayerId>,
    pub current_topic: Option<TopicId>,
    pub current_pattern: Vec<CardColor>,
    /// Longest sentence completed since the last topic was chosen.
    pub round_longest_sentence: usize,
    pub(crate) next_slot_seq: u64,
}

impl Game {
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn player_index(&self, id: &PlayerId) -> Option<usize> {
        self.players.iter().position(|p| &p.id == id)
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_player_index)
    }

    pub fn current_player_id(&self) -> Option<&PlayerId> {
        self.current_player().map(|p| &p.id)
    }

    pub fn is_current(&self, id: &PlayerId) -> bool {
        self.current_player_id() == Some(id)
    }

    pub fn active_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_active).count()
    }

    pub fn slot(&self, id: &SlotId) -> Option<&TableSlot> {
        self.table_slots.iter().find(|s| &s.id == id)
    }

    /// Players allowed to vote on the current speaker's sentence.
    pub fn eligible_voters(&self) -> impl Iterator<Item = &Player> {
        let speaker = self.current_player_id().cloned();
        self.players
            .iter()
            .filter(move |p| p.is_active && Some(&p.id) != speaker.as_ref())
    }

    /// Index of the next active player after `from`, wrapping around.
    ///
    /// The scan is bounded by the number of seats. Returns `None` only
    /// when nobody is active, which the game never allows while running.
    pub fn next_active_index(&self, from: usize) -> Option<usize> {
        let n = self.players.len();
        if n == 0 {
            return None;
        }
        (1..=n)
            .map(|step| (from + step) % n)
            .find(|&idx| self.players[idx].is_active)
    }

    /// Total number of cards in hands, piles, and on the table.
    pub fn card_count(&self) -> usize {
        self.players.iter().map(|p| p.hand.len()).sum::<usize>()
            + self.draw_pile.len()
            + self.discard_pile.len()
            + self.table_slots.iter().map(|s| s.cards.len()).sum::<usize>()
    }

    /// Every card id in the game, for conservation checks.
    pub fn all_card_ids(&self) -> BTreeSet<CardId> {
        self.players
            .iter()
            .flat_map(|p| p.hand.iter())
            .chain(self.draw_pile.iter())
            .chain(self.discard_pile.iter())
            .chain(self.table_slots.iter().flat_map(|s| s.cards.iter()))
            .map(|c| c.id.clone())
            .collect()
    }

    pub(crate) fn fresh_slot_id(&mut self) -> SlotId {
        self.next_slot_seq += 1;
        SlotId(format!("slot-{}", self.next_slot_seq))
    }

    /// Replaces the table with empty structural slots for `pattern`.
    pub(crate) fn lay_pattern(&mut self, pattern: Vec<CardColor>) {
        let slots = pattern
            .iter()
            .enumerate()
            .map(|(position, color)| {
                let id = self.fresh_slot_id();
                TableSlot::new(id, *color, position)
            })
            .collect();
        self.table_slots = slots;
        self.starting_pattern = pattern.clone();
        self.current_pattern = pattern;
    }

    /// Draws up to `n` cards from the top of the draw pile. Short when
    /// the pile runs out.
    pub(crate) fn draw(&mut self, n: usize) -> Vec<Card> {
        let take = n.min(self.draw_pile.len());
        let split = self.draw_pile.len() - take;
        self.draw_pile.split_off(split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WordType;

    fn card(n: u32) -> Card {
        Card {
            id: CardId(format!("card-{n}")),
            maori: "kai".into(),
            english: "eat".into(),
            word_type: WordType::Verb,
            color: CardColor::Yellow,
            topic: None,
        }
    }

    fn bare_game(active: &[bool]) -> Game {
        let players = active
            .iter()
            .enumerate()
            .map(|(i, a)| {
                let mut p = Player::new(PlayerId(format!("p{i}")), "x", i);
                p.is_active = *a;
                p
            })
            .collect();
        Game {
            id: "g".into(),
            players,
            current_player_index: 0,
            table_slots: Vec::new(),
            draw_pile: Vec::new(),
            discard_pile: Vec::new(),
            starting_pattern: Vec::new(),
            phase: Phase::Playing,
            turn_state: TurnState::default(),
            verification_votes: BTreeMap::new(),
            winners_in_order: Vec::new(),
            loser_id: None,
            timer_started_at: None,
            turn_time_limit_secs: 30,
            turn_order_cards: Vec::new(),
            turn_order_winner: None,
            current_topic: None,
            current_pattern: Vec::new(),
            round_longest_sentence: 0,
            next_slot_seq: 0,
        }
    }

    #[test]
    fn test_next_active_index_skips_inactive() {
        let game = bare_game(&[true, false, true]);
        assert_eq!(game.next_active_index(0), Some(2));
        assert_eq!(game.next_active_index(2), Some(0));
    }

    #[test]
    fn test_next_active_index_wraps_to_self_when_alone() {
        let game = bare_game(&[false, true, false]);
        assert_eq!(game.next_active_index(1), Some(1));
    }

    #[test]
    fn test_next_active_index_none_when_nobody_active() {
        let game = bare_game(&[false, false]);
        assert_eq!(game.next_active_index(0), None);
    }

    #[test]
    fn test_draw_short_pile_returns_what_is_left() {
        let mut game = bare_game(&[true]);
        game.draw_pile = vec![card(1), card(2)];
        let drawn = game.draw(3);
        assert_eq!(drawn.len(), 2);
        assert!(game.draw_pile.is_empty());
    }

    #[test]
    fn test_lay_pattern_sets_structural_positions() {
        let mut game = bare_game(&[true]);
        game.lay_pattern(vec![CardColor::Red, CardColor::Yellow]);
        assert_eq!(game.table_slots.len(), 2);
        assert_eq!(game.table_slots[1].position, 1);
        assert_eq!(game.starting_pattern.len(), 2);
        assert_ne!(game.table_slots[0].id, game.table_slots[1].id);
    }

    #[test]
    fn test_phase_serializes_camel_case() {
        let json = serde_json::to_string(&Phase::DiscardSelect).unwrap();
        assert_eq!(json, "\"discardSelect\"");
        assert_eq!(Phase::TurnOrder.to_string(), "turnOrder");
    }
}
