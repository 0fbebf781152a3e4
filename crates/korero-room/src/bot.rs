//! Computer-controlled players.
//!
//! A bot is an ordinary seat whose id carries the bot prefix. The room
//! asks [`bots_due`] which bots have something to do after every commit,
//! schedules each one on a short delay, and when the delay is up asks a
//! [`BotPolicy`] for the concrete action. The action then goes through
//! the same `apply` path as a human's.

use korero_game::{Game, GameAction, Phase, PlayerId, Vocabulary};
use rand::seq::IndexedRandom;
use rand::{Rng, RngCore};

/// Chooses a bot's next action.
///
/// Implementations see the full, unsanitized snapshot. Returning `None`
/// means the bot has nothing to do right now.
pub trait BotPolicy: Send + Sync + 'static {
    fn decide(
        &self,
        game: &Game,
        bot: &PlayerId,
        vocabulary: &dyn Vocabulary,
        rng: &mut dyn RngCore,
    ) -> Option<GameAction>;
}

/// A relaxed opponent: never plays a card, usually approves.
#[derive(Debug, Clone, Copy)]
pub struct CasualBot {
    /// Probability of voting to approve a sentence.
    pub approve_probability: f64,
}

impl Default for CasualBot {
    fn default() -> Self {
        Self {
            approve_probability: 0.8,
        }
    }
}

impl BotPolicy for CasualBot {
    fn decide(
        &self,
        game: &Game,
        bot: &PlayerId,
        vocabulary: &dyn Vocabulary,
        rng: &mut dyn RngCore,
    ) -> Option<GameAction> {
        if !needs_bot(game, bot) {
            return None;
        }
        match game.phase {
            Phase::TurnOrder => Some(GameAction::RevealTurnOrderCard),
            Phase::TopicSelect => {
                let topic = vocabulary.topics().choose(rng)?;
                Some(GameAction::SelectTopic {
                    topic_id: topic.id.clone(),
                })
            }
            Phase::Playing => Some(GameAction::PassTurn),
            Phase::TurnEnd => Some(GameAction::ConfirmTurnEnd),
            Phase::Verification => Some(GameAction::Vote {
                approved: rng.random_bool(self.approve_probability.clamp(0.0, 1.0)),
            }),
            Phase::DiscardSelect => Some(GameAction::SkipDiscard),
            Phase::Setup | Phase::Dealing | Phase::Finished => None,
        }
    }
}

/// Whether `bot` is expected to act in the current phase.
fn needs_bot(game: &Game, bot: &PlayerId) -> bool {
    let Some(player) = game.player(bot) else {
        return false;
    };
    if !player.is_bot() || !player.is_active {
        return false;
    }
    match game.phase {
        Phase::TurnOrder => game
            .turn_order_cards
            .iter()
            .any(|c| &c.player_id == bot && !c.revealed),
        Phase::TopicSelect | Phase::DiscardSelect => game.turn_order_winner.as_ref() == Some(bot),
        Phase::Playing | Phase::TurnEnd => game.is_current(bot),
        Phase::Verification => {
            !game.verification_votes.contains_key(bot)
                && game.eligible_voters().any(|p| &p.id == bot)
        }
        Phase::Setup | Phase::Dealing | Phase::Finished => false,
    }
}

/// Bots that have something to do in `game` right now.
pub fn bots_due(game: &Game) -> Vec<PlayerId> {
    game.players
        .iter()
        .filter(|p| needs_bot(game, &p.id))
        .map(|p| p.id.clone())
        .collect()
}
