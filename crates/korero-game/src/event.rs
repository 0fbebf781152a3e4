//! Notable things that happened during a transition.
//!
//! Events are advisory: the snapshot is the source of truth. The room
//! forwards them to clients for toasts and sounds.

use serde::{Deserialize, Serialize};

use crate::{PlayerId, ScoreBreakdown, TopicId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GameEvent {
    TurnOrderDecided { winner: PlayerId },
    TopicChosen { topic_id: TopicId, chosen_by: PlayerId },
    VerificationResolved { speaker: PlayerId, approved: bool },
    TurnScored { speaker: PlayerId, scores: Vec<ContributorScore> },
    PenaltyDrawn { player_id: PlayerId, cards: usize },
    PlayerFinished { player_id: PlayerId, place: usize },
    PlayerAway { player_id: PlayerId },
    GameOver { winners: Vec<PlayerId>, loser: Option<PlayerId> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributorScore {
    pub player_id: PlayerId,
    pub breakdown: ScoreBreakdown,
}
