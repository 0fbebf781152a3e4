//! Phase-timer rules: countdowns, expiry, and exactly-once timeouts.

use korero_game::{
    ConnectionStatus, Game, GameAction, GameConfig, GameEvent, Phase, PlayerId,
    StarterVocabulary, TopicId, apply, start_game,
};
use korero_timer::{
    TimeoutEffect, TimerOutcome, TimerSettings, evaluate, fire_timeout, sync_timer,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

// =========================================================================
// Helpers
// =========================================================================

fn pid(s: &str) -> PlayerId {
    PlayerId::new(s)
}

/// A game waiting for `ids[0]` to pick a topic, timer started at t=0.
fn topic_select_game(ids: &[&str], rng: &mut StdRng) -> Game {
    let vocab = StarterVocabulary::new();
    let seats: Vec<(PlayerId, String)> = ids.iter().map(|id| (pid(id), id.to_string())).collect();
    let mut game = start_game("g", &seats, &vocab, &GameConfig::default(), rng).unwrap();
    for (i, card) in game.turn_order_cards.iter_mut().enumerate() {
        card.value = 20 - i as u32;
    }
    for id in ids {
        game = apply(&game, &pid(id), GameAction::RevealTurnOrderCard, &vocab, rng)
            .unwrap()
            .game;
    }
    assert_eq!(game.phase, Phase::TopicSelect);
    game.timer_started_at = Some(0);
    game
}

/// A game in `playing` with `ids[0]` to act, timer started at t=0.
fn playing_game(ids: &[&str], rng: &mut StdRng) -> Game {
    let vocab = StarterVocabulary::new();
    let game = topic_select_game(ids, rng);
    let mut game = apply(
        &game,
        &pid(ids[0]),
        GameAction::SelectTopic {
            topic_id: TopicId::new("kura"),
        },
        &vocab,
        rng,
    )
    .unwrap()
    .game;
    game.timer_started_at = Some(0);
    game
}

fn settings() -> TimerSettings {
    TimerSettings::default()
}

// =========================================================================
// Topic selection
// =========================================================================

#[test]
fn test_topic_timer_quiet_until_ten_seconds_left() {
    let mut rng = StdRng::seed_from_u64(1);
    let game = topic_select_game(&["a", "b"], &mut rng);

    assert_eq!(evaluate(&game, 4_000, settings()), TimerOutcome::Quiet);
    assert_eq!(
        evaluate(&game, 5_000, settings()),
        TimerOutcome::Countdown {
            phase: Phase::TopicSelect,
            remaining_secs: 10
        }
    );
    assert_eq!(
        evaluate(&game, 14_999, settings()),
        TimerOutcome::Countdown {
            phase: Phase::TopicSelect,
            remaining_secs: 1
        }
    );
}

#[test]
fn test_topic_timer_expiry_picks_topic_exactly_once() {
    let mut rng = StdRng::seed_from_u64(2);
    let vocab = StarterVocabulary::new();
    let game = topic_select_game(&["a", "b"], &mut rng);

    let TimerOutcome::Expired(effect) = evaluate(&game, 15_000, settings()) else {
        panic!("timer should have expired");
    };
    assert_eq!(effect, TimeoutEffect::AutoPickTopic { selector: pid("a") });

    let fired = fire_timeout(&game, &effect, &vocab, &mut rng, 15_000)
        .unwrap()
        .expect("effect applies");
    let next = fired.game;
    assert_eq!(next.phase, Phase::Playing);
    assert!(next.current_topic.is_some());
    assert_eq!(next.timer_started_at, Some(15_000));

    // The same tick seen again does not fire a second effect.
    assert_eq!(evaluate(&next, 15_000, settings()), TimerOutcome::Quiet);
    // Replaying the old effect is stale.
    assert!(fire_timeout(&next, &effect, &vocab, &mut rng, 15_000).unwrap().is_none());
}

// =========================================================================
// Playing
// =========================================================================

#[test]
fn test_turn_timeout_auto_passes_and_restarts() {
    let mut rng = StdRng::seed_from_u64(3);
    let vocab = StarterVocabulary::new();
    let game = playing_game(&["a", "b", "c"], &mut rng);
    let hand_before = game.players[0].hand.len();

    assert!(matches!(
        evaluate(&game, 20_000, settings()),
        TimerOutcome::Countdown { remaining_secs: 10, .. }
    ));
    let TimerOutcome::Expired(effect) = evaluate(&game, 30_000, settings()) else {
        panic!("turn timer should have expired");
    };
    assert_eq!(effect, TimeoutEffect::AutoPass { player: pid("a") });

    let next = fire_timeout(&game, &effect, &vocab, &mut rng, 30_000)
        .unwrap()
        .unwrap()
        .game;

    assert_eq!(next.phase, Phase::Playing);
    assert_eq!(next.current_player_index, 1);
    assert_eq!(next.players[0].hand.len(), hand_before + 1);
    assert_eq!(next.players[0].consecutive_auto_skips, 1);
    assert_eq!(next.timer_started_at, Some(30_000));
    assert_eq!(evaluate(&next, 30_000, settings()), TimerOutcome::Quiet);
}

#[test]
fn test_third_timeout_marks_player_away() {
    let mut rng = StdRng::seed_from_u64(4);
    let vocab = StarterVocabulary::new();
    let mut game = playing_game(&["a", "b"], &mut rng);
    let mut now = 0;
    let mut away_events = Vec::new();

    for _ in 0..6 {
        now += 30_000;
        let TimerOutcome::Expired(effect) = evaluate(&game, now, settings()) else {
            panic!("expected expiry at {now}");
        };
        let fired = fire_timeout(&game, &effect, &vocab, &mut rng, now).unwrap().unwrap();
        away_events.extend(
            fired
                .events
                .into_iter()
                .filter(|e| matches!(e, GameEvent::PlayerAway { .. })),
        );
        game = fired.game;
    }

    assert_eq!(game.players[0].consecutive_auto_skips, 3);
    assert_eq!(game.players[0].connection_status, ConnectionStatus::Away);
    assert_eq!(game.players[1].connection_status, ConnectionStatus::Away);
    assert_eq!(away_events.len(), 2);
    // Away players stay seated.
    assert!(game.players.iter().all(|p| p.is_active));
}

#[test]
fn test_turn_timer_skipped_in_chill_mode() {
    let mut rng = StdRng::seed_from_u64(5);
    let game = playing_game(&["a", "b"], &mut rng);
    let chill = TimerSettings {
        chill_mode: true,
        ..settings()
    };
    assert_eq!(evaluate(&game, 60_000, chill), TimerOutcome::Quiet);
}

#[test]
fn test_turn_timer_skipped_for_bot() {
    let mut rng = StdRng::seed_from_u64(6);
    let game = playing_game(&["bot-1", "a"], &mut rng);
    assert!(game.current_player().unwrap().is_bot());
    assert_eq!(evaluate(&game, 60_000, settings()), TimerOutcome::Quiet);
}

#[test]
fn test_timeout_after_human_action_is_noop() {
    let mut rng = StdRng::seed_from_u64(7);
    let vocab = StarterVocabulary::new();
    let game = playing_game(&["a", "b"], &mut rng);
    let TimerOutcome::Expired(effect) = evaluate(&game, 30_000, settings()) else {
        panic!("turn timer should have expired");
    };

    // The human passes first; the timeout arrives afterwards.
    let moved = apply(&game, &pid("a"), GameAction::PassTurn, &vocab, &mut rng)
        .unwrap()
        .game;

    assert!(fire_timeout(&moved, &effect, &vocab, &mut rng, 30_000).unwrap().is_none());
}

// =========================================================================
// sync_timer
// =========================================================================

#[test]
fn test_sync_timer_restarts_on_turn_change_only() {
    let mut rng = StdRng::seed_from_u64(8);
    let vocab = StarterVocabulary::new();
    let game = playing_game(&["a", "b"], &mut rng);

    let mut same_turn = game.clone();
    sync_timer(Some(&game), &mut same_turn, 9_000);
    assert_eq!(same_turn.timer_started_at, Some(0));

    let passed = apply(&game, &pid("a"), GameAction::PassTurn, &vocab, &mut rng)
        .unwrap()
        .game;
    let mut turn_end = passed.clone();
    sync_timer(Some(&game), &mut turn_end, 9_000);
    assert_eq!(turn_end.timer_started_at, None);

    let mut resumed = apply(&passed, &pid("b"), GameAction::ConfirmTurnEnd, &vocab, &mut rng)
        .unwrap()
        .game;
    sync_timer(Some(&turn_end), &mut resumed, 12_000);
    assert_eq!(resumed.timer_started_at, Some(12_000));
}
