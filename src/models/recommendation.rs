use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// A single movie recommendation produced by the generator.
///
/// Always replaced wholesale; never partially updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
}

impl Recommendation {
    /// Parses raw completion output into a recommendation.
    ///
    /// The generator is instructed to answer with a JSON object holding
    /// exactly `title` and `description`; anything else is rejected
    /// outright rather than partially extracted.
    pub fn from_completion(raw: &str) -> AppResult<Self> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Payload {
            title: String,
            description: String,
        }

        let payload: Payload = serde_json::from_str(raw).map_err(|e| {
            AppError::Generation(format!("Model response is not the expected schema: {}", e))
        })?;

        if payload.title.trim().is_empty() || payload.description.trim().is_empty() {
            return Err(AppError::Generation(
                "Model response has empty title or description".to_string(),
            ));
        }

        Ok(Self {
            title: payload.title,
            description: payload.description,
        })
    }
}

/// Session-held recommendation slot.
///
/// A discriminated value instead of an empty-title sentinel, so the
/// error path cannot overload the recommendation shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RecommendationSlot {
    /// No active recommendation; the questionnaire is showing.
    #[default]
    None,
    /// A recommendation is ready to present.
    Ready(Recommendation),
    /// The last generation attempt failed; holds the user-visible message.
    Failed { message: String },
}

impl RecommendationSlot {
    /// The active title, if a recommendation is ready.
    pub fn title(&self) -> Option<&str> {
        match self {
            RecommendationSlot::Ready(rec) => Some(&rec.title),
            _ => None,
        }
    }
}
