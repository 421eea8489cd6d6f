use serde::{Deserialize, Serialize};

mod answers;
mod conversation;
mod recommendation;

pub use answers::{Answers, MOOD_OPTIONS};
pub use conversation::{ConversationHistory, ConversationTurn, Role};
pub use recommendation::{Recommendation, RecommendationSlot};

/// One passage returned by the similarity search, most similar first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchedPassage {
    pub content: String,
    pub similarity: f64,
}

/// Joins matched passages into the newline-delimited grounding string
/// consumed by the recommendation generator. Zero matches yield an
/// empty string; the generator is still invoked with it.
pub fn join_matches(matches: &[MatchedPassage]) -> String {
    matches
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_matches_newline_delimited() {
        let matches = vec![
            MatchedPassage {
                content: "Shutter Island: a marshal on an island asylum.".to_string(),
                similarity: 0.91,
            },
            MatchedPassage {
                content: "Inception: dreams within dreams.".to_string(),
                similarity: 0.88,
            },
        ];
        let joined = join_matches(&matches);
        assert_eq!(
            joined,
            "Shutter Island: a marshal on an island asylum.\nInception: dreams within dreams."
        );
    }

    #[test]
    fn test_join_matches_empty() {
        assert_eq!(join_matches(&[]), "");
    }

    #[test]
    fn test_matched_passage_deserialization() {
        let json = r#"{"content": "Arrival: first contact linguistics.", "similarity": 0.74}"#;
        let passage: MatchedPassage = serde_json::from_str(json).unwrap();
        assert_eq!(passage.content, "Arrival: first contact linguistics.");
        assert!(passage.similarity > 0.7);
    }
}
