//! The content seam: words, topics, and sentence patterns.
//!
//! Vocabulary authoring lives outside the engine. The engine only needs
//! to build a deck, list topics, and pick a color pattern for a round,
//! which is what [`Vocabulary`] exposes. [`StarterVocabulary`] is a small
//! built-in set so a server is playable without external content.

use rand::RngCore;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::{Card, CardColor, CardId, TopicId, WordType};

/// A word printed on one or more cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordEntry {
    pub maori: String,
    pub english: String,
    pub word_type: WordType,
    pub topic: Option<TopicId>,
    /// How many physical cards carry this word.
    pub copies: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: TopicId,
    pub label: String,
}

/// Source of cards, topics, and sentence patterns.
pub trait Vocabulary: Send + Sync + 'static {
    fn words(&self) -> &[WordEntry];

    fn topics(&self) -> &[Topic];

    /// Candidate color patterns for a round. `None` is the pattern pool
    /// used before any topic has been chosen. Must never be empty.
    fn patterns(&self, topic: Option<&TopicId>) -> Vec<Vec<CardColor>>;

    /// Picks one pattern uniformly at random.
    fn pattern_for(
        &self,
        topic: Option<&TopicId>,
        rng: &mut dyn RngCore,
    ) -> Vec<CardColor> {
        let patterns = self.patterns(topic);
        patterns
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| vec![CardColor::Red, CardColor::Yellow, CardColor::Green])
    }

    fn has_topic(&self, id: &TopicId) -> bool {
        self.topics().iter().any(|t| &t.id == id)
    }

    /// Expands every word into its copies, each with a unique card id.
    fn build_deck(&self) -> Vec<Card> {
        let mut deck = Vec::new();
        for word in self.words() {
            for _ in 0..word.copies {
                deck.push(Card {
                    id: CardId(format!("card-{}", deck.len() + 1)),
                    maori: word.maori.clone(),
                    english: word.english.clone(),
                    word_type: word.word_type,
                    color: word.word_type.color(),
                    topic: word.topic.clone(),
                });
            }
        }
        deck
    }
}

/// Beginner vocabulary across five everyday topics.
#[derive(Debug, Clone)]
pub struct StarterVocabulary {
    words: Vec<WordEntry>,
    topics: Vec<Topic>,
}

impl StarterVocabulary {
    pub fn new() -> Self {
        use WordType::*;

        #[rustfmt::skip]
        let table: &[(&str, &str, WordType, Option<&str>, usize)] = &[
            ("Kei te", "is/are (now)", TenseMarker, None, 6),
            ("I", "did (past)", TenseMarker, None, 6),
            ("Ka", "will", TenseMarker, None, 6),
            ("Kua", "has", TenseMarker, None, 4),

            ("haere", "go", Verb, None, 3),
            ("kai", "eat", Verb, Some("kai"), 3),
            ("inu", "drink", Verb, Some("kai"), 3),
            ("pānui", "read", Verb, Some("kura"), 3),
            ("ako", "learn", Verb, Some("kura"), 3),
            ("moe", "sleep", Verb, Some("whanau"), 3),
            ("waiata", "sing", Verb, Some("whanau"), 3),
            ("tākaro", "play", Verb, Some("takaro"), 3),
            ("oma", "run", Verb, Some("takaro"), 3),
            ("kite", "see", Verb, Some("taiao"), 3),

            ("te", "the (one)", Article, None, 5),
            ("ngā", "the (many)", Article, None, 4),
            ("he", "a", Article, None, 4),

            ("ahau", "I", Subject, None, 3),
            ("koe", "you", Subject, None, 3),
            ("ia", "he/she", Subject, None, 3),
            ("rātou", "they", Subject, None, 3),
            ("kaiako", "teacher", Subject, Some("kura"), 3),
            ("tamariki", "children", Subject, Some("whanau"), 3),
            ("kuia", "grandmother", Subject, Some("whanau"), 2),
            ("manu", "bird", Subject, Some("taiao"), 3),

            ("āporo", "apple", Object, Some("kai"), 3),
            ("wai", "water", Object, Some("kai"), 3),
            ("parāoa", "bread", Object, Some("kai"), 2),
            ("pukapuka", "book", Object, Some("kura"), 3),
            ("pōro", "ball", Object, Some("takaro"), 3),
            ("rākau", "tree", Object, Some("taiao"), 3),
            ("ika", "fish", Object, Some("taiao"), 3),

            ("ki te kura", "to school", Location, Some("kura"), 3),
            ("ki te kāinga", "home", Location, Some("whanau"), 3),
            ("ki te moana", "to the sea", Location, Some("taiao"), 3),
            ("ki te ngahere", "to the forest", Location, Some("taiao"), 2),
            ("ki te papa tākaro", "to the playground", Location, Some("takaro"), 3),
            ("i te wharekai", "at the restaurant", Location, Some("kai"), 2),
        ];

        let words = table
            .iter()
            .map(|(maori, english, word_type, topic, copies)| WordEntry {
                maori: (*maori).to_string(),
                english: (*english).to_string(),
                word_type: *word_type,
                topic: (*topic).map(TopicId::new),
                copies: *copies,
            })
            .collect();

        let topics = [
            ("kai", "Food"),
            ("kura", "School"),
            ("whanau", "Family"),
            ("takaro", "Play"),
            ("taiao", "Nature"),
        ]
        .into_iter()
        .map(|(id, label)| Topic {
            id: TopicId::new(id),
            label: label.to_string(),
        })
        .collect();

        Self { words, topics }
    }
}

impl Default for StarterVocabulary {
    fn default() -> Self {
        Self::new()
    }
}

impl Vocabulary for StarterVocabulary {
    fn words(&self) -> &[WordEntry] {
        &self.words
    }

    fn topics(&self) -> &[Topic] {
        &self.topics
    }

    fn patterns(&self, topic: Option<&TopicId>) -> Vec<Vec<CardColor>> {
        use CardColor::*;

        let Some(topic) = topic else {
            return vec![vec![Red, Yellow, Green]];
        };
        match topic.as_str() {
            "kai" | "takaro" => vec![
                vec![Red, Yellow, Green],
                vec![Red, Yellow, Green, Blue, Orange],
                vec![Red, Yellow, Blue, Green],
            ],
            "kura" => vec![
                vec![Red, Yellow, Blue, Green],
                vec![Red, Yellow, Green, Purple],
                vec![Red, Yellow, Green, Blue, Orange],
            ],
            _ => vec![
                vec![Red, Yellow, Green],
                vec![Red, Yellow, Green, Purple],
                vec![Red, Yellow, Blue, Green, Purple],
            ],
        }
    }
}
