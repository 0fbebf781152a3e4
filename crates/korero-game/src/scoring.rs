//! Turn-completion scoring.
//!
//! ```text
//! subtotal = (BASE + WORD_POINTS × cards) × topic multiplier
//! total    = subtotal + first-to-empty + longest-sentence + unanimous
//! ```
//!
//! When several players contributed words (via stacking), each of them is
//! scored on their own card count. The topic multiplier and the bonuses
//! are decided once for the whole sentence and shared.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Card, PlayerId, TopicId};

pub const BASE_POINTS: u32 = 10;
pub const POINTS_PER_WORD: u32 = 2;
pub const TOPIC_MULTIPLIER: u32 = 2;
pub const FIRST_TO_EMPTY_BONUS: u32 = 20;
pub const LONGEST_SENTENCE_BONUS: u32 = 10;
pub const UNANIMOUS_BONUS: u32 = 5;

/// Round-wide flags shared by every contributor to a sentence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentenceFlags {
    pub topic_matched: bool,
    pub all_votes_approved: bool,
    pub is_first_to_empty: bool,
    pub is_longest_sentence: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub base: u32,
    pub word_points: u32,
    pub topic_multiplier: u32,
    pub subtotal: u32,
    pub first_to_empty_bonus: u32,
    pub longest_sentence_bonus: u32,
    pub unanimous_bonus: u32,
    pub total: u32,
}

/// Returns `true` if any card carries the round's topic tag.
pub fn topic_matches(cards: &[Card], current_topic: Option<&TopicId>) -> bool {
    match current_topic {
        Some(topic) => cards.iter().any(|c| c.topic.as_ref() == Some(topic)),
        None => false,
    }
}

/// Scores `card_count` words under the given shared flags.
pub fn score(card_count: usize, flags: SentenceFlags) -> ScoreBreakdown {
    let word_points = POINTS_PER_WORD * card_count as u32;
    let topic_multiplier = if flags.topic_matched { TOPIC_MULTIPLIER } else { 1 };
    let subtotal = (BASE_POINTS + word_points) * topic_multiplier;

    let first_to_empty_bonus = if flags.is_first_to_empty { FIRST_TO_EMPTY_BONUS } else { 0 };
    let longest_sentence_bonus = if flags.is_longest_sentence { LONGEST_SENTENCE_BONUS } else { 0 };
    let unanimous_bonus = if flags.all_votes_approved { UNANIMOUS_BONUS } else { 0 };

    ScoreBreakdown {
        base: BASE_POINTS,
        word_points,
        topic_multiplier,
        subtotal,
        first_to_empty_bonus,
        longest_sentence_bonus,
        unanimous_bonus,
        total: subtotal + first_to_empty_bonus + longest_sentence_bonus + unanimous_bonus,
    }
}

/// Scores every contributor to a completed sentence.
///
/// `sentence` lists each word with the player who placed it. The topic
/// multiplier is decided over the whole sentence, not per contributor.
pub fn score_sentence(
    sentence: &[(Card, PlayerId)],
    current_topic: Option<&TopicId>,
    all_votes_approved: bool,
    is_first_to_empty: bool,
    is_longest_sentence: bool,
) -> BTreeMap<PlayerId, ScoreBreakdown> {
    let cards: Vec<Card> = sentence.iter().map(|(c, _)| c.clone()).collect();
    let flags = SentenceFlags {
        topic_matched: topic_matches(&cards, current_topic),
        all_votes_approved,
        is_first_to_empty,
        is_longest_sentence,
    };

    let mut counts: BTreeMap<PlayerId, usize> = BTreeMap::new();
    for (_, owner) in sentence {
        *counts.entry(owner.clone()).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(player, n)| (player, score(n, flags)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CardColor, CardId, WordType};

    fn card(id: &str, topic: Option<&str>) -> Card {
        Card {
            id: CardId::new(id),
            maori: "ngeru".into(),
            english: "cat".into(),
            word_type: WordType::Subject,
            color: CardColor::Green,
            topic: topic.map(TopicId::new),
        }
    }

    fn pid(s: &str) -> PlayerId {
        PlayerId::new(s)
    }

    #[test]
    fn test_score_plain_three_words() {
        let s = score(3, SentenceFlags::default());
        assert_eq!(s.word_points, 6);
        assert_eq!(s.topic_multiplier, 1);
        assert_eq!(s.total, 16);
    }

    #[test]
    fn test_score_topic_doubles_subtotal_not_bonuses() {
        let s = score(
            3,
            SentenceFlags {
                topic_matched: true,
                all_votes_approved: true,
                ..Default::default()
            },
        );
        assert_eq!(s.subtotal, 32);
        assert_eq!(s.total, 37);
    }

    #[test]
    fn test_score_all_bonuses() {
        let s = score(
            4,
            SentenceFlags {
                topic_matched: false,
                all_votes_approved: true,
                is_first_to_empty: true,
                is_longest_sentence: true,
            },
        );
        assert_eq!(s.subtotal, 18);
        assert_eq!(s.total, 18 + 20 + 10 + 5);
    }

    #[test]
    fn test_score_sentence_splits_word_points_by_owner() {
        let sentence = vec![
            (card("c1", None), pid("a")),
            (card("c2", None), pid("a")),
            (card("c3", Some("kai")), pid("b")),
        ];
        let topic = TopicId::new("kai");
        let scores = score_sentence(&sentence, Some(&topic), false, false, false);

        // Topic flag is shared: b's card matches, so a is doubled too.
        assert_eq!(scores[&pid("a")].total, (10 + 4) * 2);
        assert_eq!(scores[&pid("b")].total, (10 + 2) * 2);
    }

    #[test]
    fn test_topic_matches_requires_current_topic() {
        let cards = vec![card("c1", Some("kai"))];
        assert!(!topic_matches(&cards, None));
        assert!(!topic_matches(&cards, Some(&TopicId::new("kura"))));
    }
}
