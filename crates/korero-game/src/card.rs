//! Cards and their slot-matching colors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CardId, TopicId};

/// The slot-matching key of a card.
///
/// Each color corresponds to one grammatical role in a sentence, so a
/// pattern of colors reads as a sentence template.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CardColor {
    /// Tense/aspect markers (`Kei te`, `I`, `Ka`).
    Red,
    /// Verbs.
    Yellow,
    /// Articles and determiners.
    Blue,
    /// Subjects (pronouns, people, animals).
    Green,
    /// Objects.
    Orange,
    /// Locative phrases.
    Purple,
}

impl CardColor {
    pub const ALL: [CardColor; 6] = [
        CardColor::Red,
        CardColor::Yellow,
        CardColor::Blue,
        CardColor::Green,
        CardColor::Orange,
        CardColor::Purple,
    ];
}

impl fmt::Display for CardColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Orange => "orange",
            Self::Purple => "purple",
        };
        f.write_str(name)
    }
}

/// Grammatical word type printed on the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WordType {
    TenseMarker,
    Verb,
    Article,
    Subject,
    Object,
    Location,
}

impl WordType {
    /// The color cards of this word type are printed in.
    pub fn color(self) -> CardColor {
        match self {
            Self::TenseMarker => CardColor::Red,
            Self::Verb => CardColor::Yellow,
            Self::Article => CardColor::Blue,
            Self::Subject => CardColor::Green,
            Self::Object => CardColor::Orange,
            Self::Location => CardColor::Purple,
        }
    }
}

/// One dealt card instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub maori: String,
    pub english: String,
    #[serde(rename = "type")]
    pub word_type: WordType,
    pub color: CardColor,
    /// Topic this word belongs to, if any. A sentence containing a card
    /// tagged with the round's topic scores double.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<TopicId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_type_color_is_stable() {
        assert_eq!(WordType::TenseMarker.color(), CardColor::Red);
        assert_eq!(WordType::Location.color(), CardColor::Purple);
    }

    #[test]
    fn test_card_serializes_type_field() {
        let card = Card {
            id: CardId::new("card-1"),
            maori: "kai".into(),
            english: "eat".into(),
            word_type: WordType::Verb,
            color: CardColor::Yellow,
            topic: None,
        };
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["type"], "verb");
        assert_eq!(json["color"], "yellow");
        assert!(json.get("topic").is_none());
    }
}
