//! Error types for the game layer.

use crate::{CardColor, CardId, Phase, PlayerId, SlotId, TopicId};

/// A rejected transition.
///
/// Every variant is a precondition violation: the snapshot the action
/// was applied to is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("action not allowed during {actual} (expected {expected})")]
    WrongPhase { expected: Phase, actual: Phase },

    #[error("game is already finished")]
    GameFinished,

    #[error("it is not {0}'s turn")]
    NotYourTurn(PlayerId),

    #[error("player {0} is not in this game")]
    PlayerNotFound(PlayerId),

    #[error("player {0} is no longer active")]
    PlayerInactive(PlayerId),

    #[error("card {0} is not in your hand")]
    CardNotInHand(CardId),

    #[error("slot {0} not found")]
    SlotNotFound(SlotId),

    #[error("a {card} card cannot go on a {slot} slot")]
    ColorMismatch { card: CardColor, slot: CardColor },

    #[error("you already played a {0} card this turn")]
    ColorAlreadyPlayed(CardColor),

    #[error("slot {0} is empty; nothing to stack on")]
    SlotEmpty(SlotId),

    #[error("the speaker cannot vote on their own sentence")]
    SpeakerCannotVote,

    #[error("player {0} has already voted")]
    AlreadyVoted(PlayerId),

    #[error("no cards played this turn")]
    NothingToUndo,

    #[error("no cards played this turn to submit")]
    EmptySentence,

    #[error("at most {max} cards may be discarded, got {got}")]
    TooManyDiscards { max: usize, got: usize },

    #[error("only the round winner may do that")]
    NotTurnOrderWinner,

    #[error("unknown topic {0}")]
    UnknownTopic(TopicId),

    #[error("turn-order card already revealed")]
    AlreadyRevealed,

    #[error("need at least {min} players, have {have}")]
    NotEnoughPlayers { min: usize, have: usize },

    #[error("player {0} is already seated")]
    AlreadySeated(PlayerId),
}
