//! Phase timers.
//!
//! A timer is nothing more than `Game::timer_started_at`. Starting or
//! restarting overwrites the timestamp; remaining time is recomputed from
//! it on every tick. There is no cancel: a phase that is not timed simply
//! ignores the timestamp.
//!
//! Only two phases are timed. `topicSelect` auto-picks a random topic for
//! the selector. `playing` auto-passes for the current player, unless the
//! room is in chill mode or the current player is a bot.

use korero_game::{
    Game, GameAction, GameError, Phase, PlayerId, Transition, Vocabulary, apply,
    record_auto_skip,
};
use rand::RngCore;
use rand::seq::IndexedRandom;
use tracing::debug;

/// Countdown updates are sent once this many seconds or fewer remain.
pub const COUNTDOWN_FROM_SECS: u64 = 10;

/// Room-level inputs to timer evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    pub topic_select_secs: u64,
    /// Disables every timer-driven action in the room.
    pub chill_mode: bool,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            topic_select_secs: 15,
            chill_mode: false,
        }
    }
}

/// What a timer asks the room to do once it runs out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeoutEffect {
    AutoPickTopic { selector: PlayerId },
    AutoPass { player: PlayerId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerOutcome {
    /// No timer applies, or plenty of time is left.
    Quiet,
    /// Time is running low; clients should show a countdown.
    Countdown { phase: Phase, remaining_secs: u64 },
    Expired(TimeoutEffect),
}

fn is_timed(phase: Phase) -> bool {
    matches!(phase, Phase::TopicSelect | Phase::Playing)
}

/// The timer that governs `game` right now, if any: its limit and the
/// effect to run when it expires.
fn active_timer(game: &Game, settings: TimerSettings) -> Option<(u64, TimeoutEffect)> {
    if settings.chill_mode {
        return None;
    }
    match game.phase {
        Phase::TopicSelect => {
            let selector = game.turn_order_winner.clone()?;
            Some((settings.topic_select_secs, TimeoutEffect::AutoPickTopic { selector }))
        }
        Phase::Playing => {
            let current = game.current_player()?;
            if current.is_bot() {
                return None;
            }
            Some((
                game.turn_time_limit_secs,
                TimeoutEffect::AutoPass {
                    player: current.id.clone(),
                },
            ))
        }
        _ => None,
    }
}

/// Seconds left on the running timer, saturating at zero.
pub fn remaining_secs(started_at_ms: u64, limit_secs: u64, now_ms: u64) -> u64 {
    let elapsed_secs = now_ms.saturating_sub(started_at_ms) / 1000;
    limit_secs.saturating_sub(elapsed_secs)
}

/// Evaluates the phase timer at `now_ms` (unix milliseconds).
pub fn evaluate(game: &Game, now_ms: u64, settings: TimerSettings) -> TimerOutcome {
    let Some((limit, effect)) = active_timer(game, settings) else {
        return TimerOutcome::Quiet;
    };
    let Some(started) = game.timer_started_at else {
        return TimerOutcome::Quiet;
    };

    match remaining_secs(started, limit, now_ms) {
        0 => TimerOutcome::Expired(effect),
        remaining if remaining <= COUNTDOWN_FROM_SECS => TimerOutcome::Countdown {
            phase: game.phase,
            remaining_secs: remaining,
        },
        _ => TimerOutcome::Quiet,
    }
}

/// Restarts the timer when a commit moves the game into a timed phase or
/// hands the turn to someone else; clears it outside timed phases.
pub fn sync_timer(previous: Option<&Game>, next: &mut Game, now_ms: u64) {
    if !is_timed(next.phase) {
        next.timer_started_at = None;
        return;
    }
    let changed = match previous {
        None => true,
        Some(prev) => {
            prev.phase != next.phase
                || prev.current_player_index != next.current_player_index
                || prev.turn_order_winner != next.turn_order_winner
                || prev.timer_started_at.is_none()
        }
    };
    if changed {
        next.timer_started_at = Some(now_ms);
    }
}

/// Runs a timeout effect against `game`.
///
/// The effect is re-validated first: if a human action already moved the
/// phase on or changed who is to act, the timeout is stale and `Ok(None)`
/// is returned. On success the timer is restarted at `now_ms`, so a later
/// tick that still sees the old timestamp cannot fire again.
pub fn fire_timeout(
    game: &Game,
    effect: &TimeoutEffect,
    vocabulary: &dyn Vocabulary,
    rng: &mut dyn RngCore,
    now_ms: u64,
) -> Result<Option<Transition>, GameError> {
    let outcome = match effect {
        TimeoutEffect::AutoPickTopic { selector } => {
            if game.phase != Phase::TopicSelect || game.turn_order_winner.as_ref() != Some(selector)
            {
                debug!(game_id = %game.id, %selector, "stale topic timeout dropped");
                return Ok(None);
            }
            let Some(topic) = vocabulary.topics().choose(rng) else {
                return Ok(None);
            };
            let action = GameAction::SelectTopic {
                topic_id: topic.id.clone(),
            };
            apply(game, selector, action, vocabulary, rng)?
        }
        TimeoutEffect::AutoPass { player } => {
            if game.phase != Phase::Playing || !game.is_current(player) {
                debug!(game_id = %game.id, %player, "stale turn timeout dropped");
                return Ok(None);
            }
            let passed = apply(game, player, GameAction::PassTurn, vocabulary, rng)?;
            let mut confirmed =
                apply(&passed.game, player, GameAction::ConfirmTurnEnd, vocabulary, rng)?;
            let mut events = passed.events;
            events.append(&mut confirmed.events);
            record_auto_skip(&mut confirmed.game, player, &mut events);
            Transition {
                game: confirmed.game,
                events,
            }
        }
    };

    let mut next = outcome.game;
    next.timer_started_at = is_timed(next.phase).then_some(now_ms);
    Ok(Some(Transition {
        game: next,
        events: outcome.events,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_secs_counts_whole_seconds() {
        assert_eq!(remaining_secs(0, 30, 0), 30);
        assert_eq!(remaining_secs(0, 30, 999), 30);
        assert_eq!(remaining_secs(0, 30, 1_000), 29);
        assert_eq!(remaining_secs(0, 30, 30_000), 0);
    }

    #[test]
    fn test_remaining_secs_saturates() {
        assert_eq!(remaining_secs(0, 30, 90_000), 0);
        // A clock that went backwards never yields more than the limit.
        assert_eq!(remaining_secs(5_000, 30, 1_000), 30);
    }
}
