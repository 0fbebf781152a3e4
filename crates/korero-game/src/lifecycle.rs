//! Starting a game and changing who sits at it.
//!
//! These run outside the per-turn action set: the room calls them when
//! the host starts, when someone joins or leaves mid-game, and when the
//! connection layer reports a drop or a timeout.

use std::collections::BTreeMap;

use rand::RngCore;
use rand::seq::SliceRandom;

use crate::config::{GameConfig, MIN_PLAYERS};
use crate::machine::{
    Transition, advance_turn, decide_turn_order_if_revealed, finish_game,
    resolve_votes_if_complete,
};
use crate::{
    ConnectionStatus, Game, GameError, GameEvent, Phase, Player, PlayerId, TurnOrderCard,
    TurnState, Vocabulary,
};

/// Rank values are drawn from `1..=max(TURN_ORDER_RANKS, players)`.
const TURN_ORDER_RANKS: u32 = 20;

/// Consecutive timed-out turns before a player is marked away.
pub const AWAY_AFTER_SKIPS: u32 = 3;

/// Creates a game for `seats` and runs it through setup and dealing.
///
/// The returned game is in [`Phase::TurnOrder`] with every player holding
/// `config.hand_size` cards and one face-down rank card.
pub fn start_game(
    id: impl Into<String>,
    seats: &[(PlayerId, String)],
    vocabulary: &dyn Vocabulary,
    config: &GameConfig,
    rng: &mut dyn RngCore,
) -> Result<Game, GameError> {
    if seats.len() < MIN_PLAYERS {
        return Err(GameError::NotEnoughPlayers {
            min: MIN_PLAYERS,
            have: seats.len(),
        });
    }

    let mut game = Game {
        id: id.into(),
        players: seats
            .iter()
            .enumerate()
            .map(|(position, (id, name))| Player::new(id.clone(), name.clone(), position))
            .collect(),
        current_player_index: 0,
        table_slots: Vec::new(),
        draw_pile: Vec::new(),
        discard_pile: Vec::new(),
        starting_pattern: Vec::new(),
        phase: Phase::Setup,
        turn_state: TurnState::default(),
        verification_votes: BTreeMap::new(),
        winners_in_order: Vec::new(),
        loser_id: None,
        timer_started_at: None,
        turn_time_limit_secs: config.turn_time_limit_secs,
        turn_order_cards: Vec::new(),
        turn_order_winner: None,
        current_topic: None,
        current_pattern: Vec::new(),
        round_longest_sentence: 0,
        next_slot_seq: 0,
    };

    game.phase = Phase::Dealing;
    let mut deck = vocabulary.build_deck();
    deck.shuffle(rng);
    game.draw_pile = deck;
    for idx in 0..game.players.len() {
        let hand = game.draw(config.hand_size);
        game.players[idx].hand = hand;
    }

    let top = TURN_ORDER_RANKS.max(game.players.len() as u32);
    let mut ranks: Vec<u32> = (1..=top).collect();
    ranks.shuffle(rng);
    game.turn_order_cards = game
        .players
        .iter()
        .zip(ranks)
        .map(|(p, value)| TurnOrderCard {
            player_id: p.id.clone(),
            value,
            revealed: false,
            placeholder: false,
        })
        .collect();

    game.lay_pattern(vocabulary.pattern_for(None, rng));
    game.phase = Phase::TurnOrder;

    tracing::info!(
        game_id = %game.id,
        players = game.players.len(),
        deck = game.card_count(),
        "game started"
    );
    Ok(game)
}

/// Seats a newcomer in a running game.
///
/// The player is appended to the rotation, dealt up to `hand_size` cards
/// from the draw pile, and given an already-revealed placeholder rank
/// card so every seat has one.
pub fn seat_player(
    game: &Game,
    id: PlayerId,
    name: impl Into<String>,
    hand_size: usize,
) -> Result<Game, GameError> {
    if game.phase.is_terminal() {
        return Err(GameError::GameFinished);
    }
    if game.player(&id).is_some() {
        return Err(GameError::AlreadySeated(id));
    }

    let mut next = game.clone();
    let mut player = Player::new(id.clone(), name, next.players.len());
    player.hand = next.draw(hand_size);
    next.players.push(player);
    next.turn_order_cards.push(TurnOrderCard {
        player_id: id.clone(),
        value: 0,
        revealed: true,
        placeholder: true,
    });

    tracing::info!(game_id = %next.id, player = %id, "player seated mid-game");
    Ok(next)
}

/// Takes a departing player out of the rotation.
///
/// Their hand goes to the bottom of the draw pile and their seat stays
/// behind, inactive, so indices of the remaining players do not shift.
/// Whatever the departure interrupts is repaired: the turn moves on, a
/// pending vote is re-tallied, and a vacant topic choice passes to the
/// next player. With one active player left the game ends, the same way
/// it does when everyone else has emptied their hand.
pub fn remove_player(game: &Game, id: &PlayerId) -> Result<Transition, GameError> {
    let idx = game
        .player_index(id)
        .ok_or_else(|| GameError::PlayerNotFound(id.clone()))?;

    let mut next = game.clone();
    let mut events = Vec::new();

    let was_active = next.players[idx].is_active;
    let mut pile = std::mem::take(&mut next.players[idx].hand);
    pile.append(&mut next.draw_pile);
    next.draw_pile = pile;
    next.players[idx].is_active = false;
    next.players[idx].connection_status = ConnectionStatus::Disconnected;

    if !was_active || next.phase.is_terminal() {
        return Ok(Transition { game: next, events });
    }

    if next.phase == Phase::TurnOrder {
        next.turn_order_cards.retain(|c| &c.player_id != id);
        decide_turn_order_if_revealed(&mut next, &mut events);
    }

    if next.active_count() <= 1 {
        let last = next.players.iter().find(|p| p.is_active).map(|p| p.id.clone());
        finish_game(&mut next, last, &mut events);
        return Ok(Transition { game: next, events });
    }

    let was_current = next.current_player_index == idx;
    match next.phase {
        Phase::Playing | Phase::TurnEnd | Phase::Verification if was_current => {
            next.turn_state = TurnState::default();
            next.verification_votes.clear();
            advance_turn(&mut next);
            if next.phase == Phase::Verification {
                next.phase = Phase::Playing;
            }
        }
        Phase::Verification => {
            next.verification_votes.remove(id);
            resolve_votes_if_complete(&mut next, &mut events);
        }
        Phase::TopicSelect | Phase::DiscardSelect
            if next.turn_order_winner.as_ref() == Some(id) =>
        {
            if let Some(successor) = next.next_active_index(idx) {
                next.current_player_index = successor;
                next.turn_order_winner = Some(next.players[successor].id.clone());
                next.phase = Phase::TopicSelect;
            }
        }
        _ => {
            if was_current {
                advance_turn(&mut next);
            }
        }
    }

    tracing::info!(game_id = %next.id, player = %id, phase = %next.phase, "player left mid-game");
    Ok(Transition { game: next, events })
}

/// Records a connection change for a seated player.
///
/// Coming back resets the timeout counter.
pub fn set_connection(
    game: &Game,
    id: &PlayerId,
    status: ConnectionStatus,
) -> Result<Game, GameError> {
    let idx = game
        .player_index(id)
        .ok_or_else(|| GameError::PlayerNotFound(id.clone()))?;
    let mut next = game.clone();
    let player = &mut next.players[idx];
    player.connection_status = status;
    if status == ConnectionStatus::Connected {
        player.consecutive_auto_skips = 0;
    }
    Ok(next)
}

/// Counts one timed-out turn against `id`, marking them away once the
/// count reaches [`AWAY_AFTER_SKIPS`].
pub fn record_auto_skip(game: &mut Game, id: &PlayerId, events: &mut Vec<GameEvent>) {
    let Some(idx) = game.player_index(id) else {
        return;
    };
    let player = &mut game.players[idx];
    player.consecutive_auto_skips += 1;
    if player.consecutive_auto_skips >= AWAY_AFTER_SKIPS
        && player.connection_status == ConnectionStatus::Connected
    {
        player.connection_status = ConnectionStatus::Away;
        tracing::info!(game_id = %game.id, player = %id, "player marked away");
        events.push(GameEvent::PlayerAway {
            player_id: id.clone(),
        });
    }
}

/// Clears the timeout counter after a player acts on their own.
pub fn note_player_action(game: &mut Game, id: &PlayerId) {
    if let Some(idx) = game.player_index(id) {
        let player = &mut game.players[idx];
        player.consecutive_auto_skips = 0;
        if player.connection_status == ConnectionStatus::Away {
            player.connection_status = ConnectionStatus::Connected;
        }
    }
}
