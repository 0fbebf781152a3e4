//! The turn state machine.
//!
//! [`apply`] is a pure transition: it never mutates the snapshot it is
//! given. On success it returns a new snapshot plus the events the
//! transition produced; on failure the caller still holds the untouched
//! original.
//!
//! Randomness (topic patterns, redeals) comes in through an injected RNG
//! so transitions are reproducible under a seeded generator.

use std::collections::BTreeSet;

use rand::RngCore;
use rand::seq::SliceRandom;

use crate::config::{MAX_DISCARD, PATTERN_MATCH_PERCENT, PENALTY_DRAW};
use crate::scoring::score_sentence;
use crate::{
    Card, CardColor, CardId, ContributorScore, Game, GameError, GameEvent, Phase,
    PlayedCard, PlayerId, SlotId, TableSlot, TopicId, TurnState, Vocabulary,
};

/// Everything a seated player can ask the game to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameAction {
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
}

impl GameAction {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RevealTurnOrderCard => "reveal_turn_order_card",
            Self::SelectTopic { .. } => "select_topic",
            Self::PlayCard { .. } => "play_card",
            Self::StackCard { .. } => "stack_card",
            Self::CreateSlot { .. } => "create_slot",
            Self::SubmitTurn { .. } => "submit_turn",
            Self::Vote { .. } => "vote",
            Self::PassTurn => "pass_turn",
            Self::Undo => "undo",
            Self::ConfirmTurnEnd => "confirm_turn_end",
            Self::DiscardCards { .. } => "discard_cards",
            Self::SkipDiscard => "skip_discard",
        }
    }
}

/// The result of a successful transition.
#[derive(Debug, Clone)]
pub struct Transition {
    pub game: Game,
    pub events: Vec<GameEvent>,
}

/// Applies `action` on behalf of `actor` to a copy of `game`.
pub fn apply(
    game: &Game,
    actor: &PlayerId,
    action: GameAction,
    vocabulary: &dyn Vocabulary,
    rng: &mut dyn RngCore,
) -> Result<Transition, GameError> {
    if game.phase.is_terminal() {
        return Err(GameError::GameFinished);
    }
    if game.player(actor).is_none() {
        return Err(GameError::PlayerNotFound(actor.clone()));
    }

    let mut next = game.clone();
    let mut events = Vec::new();

    match action {
        GameAction::RevealTurnOrderCard => {
            reveal_turn_order_card(&mut next, actor, &mut events)?
        }
        GameAction::SelectTopic { topic_id } => {
            select_topic(&mut next, actor, topic_id, vocabulary, rng, &mut events)?
        }
        GameAction::PlayCard { card_id, slot_id } => {
            play_card(&mut next, actor, &card_id, &slot_id)?
        }
        GameAction::StackCard { card_id, slot_id } => {
            stack_card(&mut next, actor, &card_id, &slot_id)?
        }
        GameAction::CreateSlot { card_id } => create_slot(&mut next, actor, &card_id)?,
        GameAction::SubmitTurn { spoken, translation } => {
            submit_turn(&mut next, actor, spoken, translation, &mut events)?
        }
        GameAction::Vote { approved } => vote(&mut next, actor, approved, &mut events)?,
        GameAction::PassTurn => pass_turn(&mut next, actor)?,
        GameAction::Undo => undo_last_card(&mut next, actor)?,
        GameAction::ConfirmTurnEnd => confirm_turn_end(&mut next)?,
        GameAction::DiscardCards { card_ids } => {
            discard_cards(&mut next, actor, &card_ids, &mut events)?
        }
        GameAction::SkipDiscard => skip_discard(&mut next, actor, &mut events)?,
    }

    Ok(Transition { game: next, events })
}

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

fn require_phase(game: &Game, expected: Phase) -> Result<(), GameError> {
    if game.phase != expected {
        return Err(GameError::WrongPhase {
            expected,
            actual: game.phase,
        });
    }
    Ok(())
}

fn require_current(game: &Game, actor: &PlayerId) -> Result<usize, GameError> {
    if !game.is_current(actor) {
        return Err(GameError::NotYourTurn(actor.clone()));
    }
    Ok(game.current_player_index)
}

fn require_active(game: &Game, actor: &PlayerId) -> Result<usize, GameError> {
    let idx = game
        .player_index(actor)
        .ok_or_else(|| GameError::PlayerNotFound(actor.clone()))?;
    if !game.players[idx].is_active {
        return Err(GameError::PlayerInactive(actor.clone()));
    }
    Ok(idx)
}

fn require_turn_order_winner(game: &Game, actor: &PlayerId) -> Result<usize, GameError> {
    if game.turn_order_winner.as_ref() != Some(actor) {
        return Err(GameError::NotTurnOrderWinner);
    }
    require_active(game, actor)
}

fn hand_position(game: &Game, player_idx: usize, card_id: &CardId) -> Result<usize, GameError> {
    game.players[player_idx]
        .hand_index(card_id)
        .ok_or_else(|| GameError::CardNotInHand(card_id.clone()))
}

fn slot_position(game: &Game, slot_id: &SlotId) -> Result<usize, GameError> {
    game.table_slots
        .iter()
        .position(|s| &s.id == slot_id)
        .ok_or_else(|| GameError::SlotNotFound(slot_id.clone()))
}

fn check_color(card: CardColor, slot: CardColor) -> Result<(), GameError> {
    if card != slot {
        return Err(GameError::ColorMismatch { card, slot });
    }
    Ok(())
}

fn check_budget(game: &Game, color: CardColor) -> Result<(), GameError> {
    if game.turn_state.colors_played_this_turn.contains(&color) {
        return Err(GameError::ColorAlreadyPlayed(color));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Turn order and topics
// ---------------------------------------------------------------------------

fn reveal_turn_order_card(
    game: &mut Game,
    actor: &PlayerId,
    events: &mut Vec<GameEvent>,
) -> Result<(), GameError> {
    require_phase(game, Phase::TurnOrder)?;
    let card = game
        .turn_order_cards
        .iter_mut()
        .find(|c| &c.player_id == actor)
        .ok_or_else(|| GameError::PlayerNotFound(actor.clone()))?;
    if card.revealed {
        return Err(GameError::AlreadyRevealed);
    }
    card.revealed = true;

    decide_turn_order_if_revealed(game, events);
    Ok(())
}

/// Once every rank card is face up, the highest value starts and picks
/// the first topic. Ties go to whoever was dealt first.
pub(crate) fn decide_turn_order_if_revealed(game: &mut Game, events: &mut Vec<GameEvent>) {
    if game.phase != Phase::TurnOrder || !game.turn_order_cards.iter().all(|c| c.revealed) {
        return;
    }

    let mut best: Option<(u32, usize)> = None;
    for card in game.turn_order_cards.iter().filter(|c| !c.placeholder) {
        let Some(idx) = game.player_index(&card.player_id) else {
            continue;
        };
        if !game.players[idx].is_active {
            continue;
        }
        if best.is_none_or(|(value, _)| card.value > value) {
            best = Some((card.value, idx));
        }
    }

    let Some((_, idx)) = best else {
        tracing::error!(game_id = %game.id, "turn order revealed with no active holder");
        return;
    };
    let winner = game.players[idx].id.clone();
    game.current_player_index = idx;
    game.turn_order_winner = Some(winner.clone());
    game.phase = Phase::TopicSelect;
    tracing::debug!(game_id = %game.id, %winner, "turn order decided");
    events.push(GameEvent::TurnOrderDecided { winner });
}

fn select_topic(
    game: &mut Game,
    actor: &PlayerId,
    topic_id: TopicId,
    vocabulary: &dyn Vocabulary,
    rng: &mut dyn RngCore,
    events: &mut Vec<GameEvent>,
) -> Result<(), GameError> {
    require_phase(game, Phase::TopicSelect)?;
    let selector_idx = require_turn_order_winner(game, actor)?;
    if !vocabulary.has_topic(&topic_id) {
        return Err(GameError::UnknownTopic(topic_id));
    }

    let pattern = vocabulary.pattern_for(Some(&topic_id), rng);
    redeal_for_pattern(game, &pattern, rng);
    game.lay_pattern(pattern);

    game.current_topic = Some(topic_id.clone());
    game.round_longest_sentence = 0;
    game.current_player_index = selector_idx;
    game.turn_state = TurnState::default();
    game.verification_votes.clear();
    game.phase = Phase::Playing;

    events.push(GameEvent::TopicChosen {
        topic_id,
        chosen_by: actor.clone(),
    });
    Ok(())
}

/// Gathers the table, the draw pile, and every active hand, then deals
/// each active player a hand of the same size biased toward `pattern`.
///
/// At least [`PATTERN_MATCH_PERCENT`] percent of each hand matches a pattern color
/// when enough matching cards exist; the rest is filled from any color.
fn redeal_for_pattern(game: &mut Game, pattern: &[CardColor], rng: &mut dyn RngCore) {
    let wanted: BTreeSet<CardColor> = pattern.iter().copied().collect();

    let mut pool: Vec<Card> = std::mem::take(&mut game.draw_pile);
    for slot in &mut game.table_slots {
        pool.append(&mut slot.cards);
        slot.owners.clear();
    }
    let mut sizes = Vec::with_capacity(game.players.len());
    for player in &mut game.players {
        let size = if player.is_active { player.hand.len() } else { 0 };
        sizes.push(size);
        if player.is_active {
            pool.append(&mut player.hand);
        }
    }
    pool.shuffle(rng);

    let (mut matching, mut other): (Vec<Card>, Vec<Card>) =
        pool.into_iter().partition(|c| wanted.contains(&c.color));

    for (player, size) in game.players.iter_mut().zip(sizes) {
        if size == 0 {
            continue;
        }
        let need = (size * PATTERN_MATCH_PERCENT).div_ceil(100);
        let from_matching = need.min(matching.len());
        player.hand.extend(matching.drain(..from_matching));

        let rest = size - from_matching;
        let from_other = rest.min(other.len());
        player.hand.extend(other.drain(..from_other));

        let shortfall = rest - from_other;
        let top_up = shortfall.min(matching.len());
        player.hand.extend(matching.drain(..top_up));
    }

    matching.append(&mut other);
    matching.shuffle(rng);
    game.draw_pile = matching;
}

// ---------------------------------------------------------------------------
// Building the sentence
// ---------------------------------------------------------------------------

fn play_card(
    game: &mut Game,
    actor: &PlayerId,
    card_id: &CardId,
    slot_id: &SlotId,
) -> Result<(), GameError> {
    require_phase(game, Phase::Playing)?;
    let idx = require_current(game, actor)?;
    let hand_idx = hand_position(game, idx, card_id)?;
    let slot_idx = slot_position(game, slot_id)?;
    let color = game.players[idx].hand[hand_idx].color;
    check_color(color, game.table_slots[slot_idx].color)?;
    check_budget(game, color)?;

    let card = game.players[idx].hand.remove(hand_idx);
    game.table_slots[slot_idx].push(card.clone(), actor.clone());
    game.turn_state.colors_played_this_turn.insert(color);
    game.turn_state.cards_played.push(PlayedCard {
        card,
        slot_id: slot_id.clone(),
        player_id: actor.clone(),
        created_slot: false,
        hand_index: hand_idx,
    });
    Ok(())
}

/// Any active player may correct the shared sentence by covering an
/// occupied slot. Stacking does not touch the caller's color budget.
fn stack_card(
    game: &mut Game,
    actor: &PlayerId,
    card_id: &CardId,
    slot_id: &SlotId,
) -> Result<(), GameError> {
    require_phase(game, Phase::Playing)?;
    let idx = require_active(game, actor)?;
    let hand_idx = hand_position(game, idx, card_id)?;
    let slot_idx = slot_position(game, slot_id)?;
    if game.table_slots[slot_idx].is_empty() {
        return Err(GameError::SlotEmpty(slot_id.clone()));
    }
    check_color(
        game.players[idx].hand[hand_idx].color,
        game.table_slots[slot_idx].color,
    )?;

    let card = game.players[idx].hand.remove(hand_idx);
    game.table_slots[slot_idx].push(card, actor.clone());
    Ok(())
}

fn create_slot(game: &mut Game, actor: &PlayerId, card_id: &CardId) -> Result<(), GameError> {
    require_phase(game, Phase::Playing)?;
    let idx = require_current(game, actor)?;
    let hand_idx = hand_position(game, idx, card_id)?;
    let color = game.players[idx].hand[hand_idx].color;
    check_budget(game, color)?;

    let card = game.players[idx].hand.remove(hand_idx);
    let slot_id = game.fresh_slot_id();
    let mut slot = TableSlot::new(slot_id.clone(), color, game.table_slots.len());
    slot.push(card.clone(), actor.clone());
    game.table_slots.push(slot);

    game.turn_state.colors_played_this_turn.insert(color);
    game.turn_state.cards_played.push(PlayedCard {
        card,
        slot_id,
        player_id: actor.clone(),
        created_slot: true,
        hand_index: hand_idx,
    });
    Ok(())
}

fn undo_last_card(game: &mut Game, actor: &PlayerId) -> Result<(), GameError> {
    require_phase(game, Phase::Playing)?;
    let idx = require_current(game, actor)?;
    let played = game
        .turn_state
        .cards_played
        .pop()
        .ok_or(GameError::NothingToUndo)?;

    if let Some(slot_idx) = game.table_slots.iter().position(|s| s.id == played.slot_id) {
        let slot = &mut game.table_slots[slot_idx];
        slot.remove_card(&played.card.id);
        let structural = slot.position < game.starting_pattern.len();
        if slot.is_empty() && !structural {
            game.table_slots.remove(slot_idx);
            for (position, slot) in game.table_slots.iter_mut().enumerate() {
                slot.position = position;
            }
        }
    }

    game.turn_state
        .colors_played_this_turn
        .remove(&played.card.color);
    let hand = &mut game.players[idx].hand;
    let at = played.hand_index.min(hand.len());
    hand.insert(at, played.card);
    Ok(())
}

// ---------------------------------------------------------------------------
// Submitting and voting
// ---------------------------------------------------------------------------

fn submit_turn(
    game: &mut Game,
    actor: &PlayerId,
    spoken: String,
    translation: String,
    events: &mut Vec<GameEvent>,
) -> Result<(), GameError> {
    require_phase(game, Phase::Playing)?;
    require_current(game, actor)?;
    // The table outlives a rejected turn, so check this turn's plays.
    if game.turn_state.cards_played.is_empty() {
        return Err(GameError::EmptySentence);
    }

    game.phase = Phase::Verification;
    game.verification_votes.clear();
    game.turn_state.awaiting_verification = true;
    game.turn_state.spoken_sentence = Some(spoken);
    game.turn_state.translation = Some(translation);

    resolve_votes_if_complete(game, events);
    Ok(())
}

fn vote(
    game: &mut Game,
    voter: &PlayerId,
    approved: bool,
    events: &mut Vec<GameEvent>,
) -> Result<(), GameError> {
    require_phase(game, Phase::Verification)?;
    require_active(game, voter)?;
    if game.is_current(voter) {
        return Err(GameError::SpeakerCannotVote);
    }
    if game.verification_votes.contains_key(voter) {
        return Err(GameError::AlreadyVoted(voter.clone()));
    }
    game.verification_votes.insert(voter.clone(), approved);

    resolve_votes_if_complete(game, events);
    Ok(())
}

/// Tallies once every eligible voter has voted.
///
/// Approved iff strictly more than half of the cast votes approve, so
/// a tie rejects. Votes from players who have since left are ignored.
pub(crate) fn resolve_votes_if_complete(game: &mut Game, events: &mut Vec<GameEvent>) {
    if game.phase != Phase::Verification {
        return;
    }
    let eligible: Vec<PlayerId> = game.eligible_voters().map(|p| p.id.clone()).collect();
    let cast: Vec<bool> = eligible
        .iter()
        .filter_map(|id| game.verification_votes.get(id).copied())
        .collect();
    if cast.len() < eligible.len() {
        return;
    }

    let approvals = cast.iter().filter(|a| **a).count();
    let approved = approvals * 2 > cast.len() || eligible.is_empty();
    let unanimous = !cast.is_empty() && approvals == cast.len();

    let speaker = game.current_player_id().cloned();
    tracing::debug!(
        game_id = %game.id,
        approvals,
        votes = cast.len(),
        approved,
        "verification resolved"
    );
    if let Some(speaker) = speaker {
        events.push(GameEvent::VerificationResolved {
            speaker,
            approved,
        });
    }

    if approved {
        on_turn_success(game, unanimous, events);
    } else {
        on_turn_failure(game, events);
    }
}

fn on_turn_success(game: &mut Game, unanimous: bool, events: &mut Vec<GameEvent>) {
    let speaker_idx = game.current_player_index;
    let speaker = game.players[speaker_idx].id.clone();

    let mut slots: Vec<&TableSlot> = game.table_slots.iter().collect();
    slots.sort_by_key(|s| s.position);
    let sentence: Vec<(Card, PlayerId)> = slots
        .iter()
        .filter_map(|s| s.top())
        .map(|(card, owner)| (card.clone(), owner.clone()))
        .collect();

    let emptied = game.players[speaker_idx].hand.is_empty();
    let first_to_empty = emptied && game.winners_in_order.is_empty();
    let longest = sentence.len() > game.round_longest_sentence;
    if longest {
        game.round_longest_sentence = sentence.len();
    }

    let scores = score_sentence(
        &sentence,
        game.current_topic.as_ref(),
        unanimous,
        first_to_empty,
        longest,
    );
    let mut contributors = Vec::with_capacity(scores.len());
    for (player_id, breakdown) in scores {
        if let Some(idx) = game.player_index(&player_id) {
            game.players[idx].score += breakdown.total;
        }
        contributors.push(ContributorScore {
            player_id,
            breakdown,
        });
    }
    game.players[speaker_idx].sentence_streak += 1;
    events.push(GameEvent::TurnScored {
        speaker: speaker.clone(),
        scores: contributors,
    });

    game.turn_state = TurnState::default();
    game.verification_votes.clear();

    if emptied {
        finish_player(game, speaker_idx, events);
    } else {
        game.turn_order_winner = Some(speaker);
        game.phase = Phase::DiscardSelect;
    }
}

/// The speaker keeps the table as it is, draws a penalty, and play moves on.
fn on_turn_failure(game: &mut Game, events: &mut Vec<GameEvent>) {
    let speaker_idx = game.current_player_index;
    let penalty = game.draw(PENALTY_DRAW);
    let drawn = penalty.len();
    let speaker = &mut game.players[speaker_idx];
    speaker.hand.extend(penalty);
    speaker.sentence_streak = 0;
    events.push(GameEvent::PenaltyDrawn {
        player_id: speaker.id.clone(),
        cards: drawn,
    });

    game.turn_state = TurnState::default();
    game.verification_votes.clear();
    advance_turn(game);
    game.phase = Phase::Playing;
}

/// Records a player who has run out of cards and decides what happens
/// next: the game ends when one active player is left, otherwise the
/// next active player picks the next topic.
pub(crate) fn finish_player(game: &mut Game, idx: usize, events: &mut Vec<GameEvent>) {
    let player_id = game.players[idx].id.clone();
    game.players[idx].is_active = false;
    game.winners_in_order.push(player_id.clone());
    events.push(GameEvent::PlayerFinished {
        player_id,
        place: game.winners_in_order.len(),
    });

    if game.active_count() <= 1 {
        let loser = game.players.iter().find(|p| p.is_active).map(|p| p.id.clone());
        finish_game(game, loser, events);
        return;
    }

    match game.next_active_index(idx) {
        Some(next) => {
            game.current_player_index = next;
            game.turn_order_winner = Some(game.players[next].id.clone());
            game.phase = Phase::TopicSelect;
        }
        None => tracing::error!(game_id = %game.id, "no active player after a finish"),
    }
}

pub(crate) fn finish_game(game: &mut Game, loser: Option<PlayerId>, events: &mut Vec<GameEvent>) {
    game.loser_id = loser.clone();
    game.phase = Phase::Finished;
    game.timer_started_at = None;
    tracing::info!(game_id = %game.id, winners = game.winners_in_order.len(), "game finished");
    events.push(GameEvent::GameOver {
        winners: game.winners_in_order.clone(),
        loser,
    });
}

// ---------------------------------------------------------------------------
// Passing and the turn-end gate
// ---------------------------------------------------------------------------

fn pass_turn(game: &mut Game, actor: &PlayerId) -> Result<(), GameError> {
    require_phase(game, Phase::Playing)?;
    let idx = require_current(game, actor)?;
    let drawn = game.draw(1);
    game.players[idx].hand.extend(drawn);

    game.turn_state = TurnState::default();
    advance_turn(game);
    game.phase = Phase::TurnEnd;
    Ok(())
}

/// Lets the next player's device show a privacy screen before their hand
/// is revealed.
fn confirm_turn_end(game: &mut Game) -> Result<(), GameError> {
    require_phase(game, Phase::TurnEnd)?;
    game.turn_state = TurnState::default();
    game.phase = Phase::Playing;
    Ok(())
}

/// Moves `current_player_index` to the next active player.
pub(crate) fn advance_turn(game: &mut Game) {
    match game.next_active_index(game.current_player_index) {
        Some(next) => game.current_player_index = next,
        None => tracing::error!(game_id = %game.id, "turn rotation found no active player"),
    }
}

// ---------------------------------------------------------------------------
// Discarding
// ---------------------------------------------------------------------------

fn discard_cards(
    game: &mut Game,
    actor: &PlayerId,
    card_ids: &[CardId],
    events: &mut Vec<GameEvent>,
) -> Result<(), GameError> {
    require_phase(game, Phase::DiscardSelect)?;
    let idx = require_turn_order_winner(game, actor)?;

    let unique: BTreeSet<&CardId> = card_ids.iter().collect();
    if unique.len() > MAX_DISCARD {
        return Err(GameError::TooManyDiscards {
            max: MAX_DISCARD,
            got: unique.len(),
        });
    }
    for id in &unique {
        hand_position(game, idx, id)?;
    }

    for id in unique {
        if let Some(pos) = game.players[idx].hand_index(id) {
            let card = game.players[idx].hand.remove(pos);
            game.discard_pile.push(card);
        }
    }
    after_discard(game, idx, events);
    Ok(())
}

fn skip_discard(
    game: &mut Game,
    actor: &PlayerId,
    events: &mut Vec<GameEvent>,
) -> Result<(), GameError> {
    require_phase(game, Phase::DiscardSelect)?;
    let idx = require_turn_order_winner(game, actor)?;
    after_discard(game, idx, events);
    Ok(())
}

fn after_discard(game: &mut Game, idx: usize, events: &mut Vec<GameEvent>) {
    if game.players[idx].hand.is_empty() {
        finish_player(game, idx, events);
    } else {
        game.phase = Phase::TopicSelect;
    }
}
