use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        join_matches, Answers, ConversationHistory, ConversationTurn, Recommendation, Role,
    },
    services::providers::{CompletionProvider, EmbeddingProvider, MatchProvider},
};

/// System prompt for the first recommendation of a session. v1.
const RECOMMEND_PROMPT_V1: &str = "You are an enthusiastic movie expert who loves recommending movies to people. \
You will be given context on a movie that was matched to the user's preferences using a vector database. \
Write a title and short 1-2 line description for the movie recommendation given. Only recommend ONE movie \
at a time. Return your output as a JSON object with exactly the fields \"title\" and \"description\" every time.";

/// System prompt for follow-up recommendations; the serialized prior
/// conversation is appended after the `###` marker. v1.
const REFINE_PROMPT_V1: &str = "You are an enthusiastic movie expert who loves recommending movies to people. \
You will be given context on a movie that was matched to the user's preferences, but they did not like it. \
The full chat history follows so you can make a better recommendation. Recommend a different movie with a \
title and short 1-2 line description. Return your output as a JSON object with exactly the fields \
\"title\" and \"description\" every time.";

/// Result of the full first-submission pipeline: the parsed
/// recommendation plus the complete history to install on the session
/// (system prompt, matched context, and the assistant's raw reply).
pub struct FirstRecommendation {
    pub recommendation: Recommendation,
    pub history: ConversationHistory,
}

/// Result of a follow-up generation: the parsed recommendation plus
/// the single assistant turn to append to the existing history.
pub struct NextRecommendation {
    pub recommendation: Recommendation,
    pub assistant_turn: ConversationTurn,
}

/// Drives the embedding → similarity search → generation pipeline.
///
/// The engine never mutates session state; both operations hand back the
/// values the session controller applies atomically, so a failed call
/// leaves the session's recommendation and history untouched.
pub struct RecommendationEngine {
    embeddings: Arc<dyn EmbeddingProvider>,
    matches: Arc<dyn MatchProvider>,
    completions: Arc<dyn CompletionProvider>,
}

impl RecommendationEngine {
    pub fn new(
        embeddings: Arc<dyn EmbeddingProvider>,
        matches: Arc<dyn MatchProvider>,
        completions: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            embeddings,
            matches,
            completions,
        }
    }

    /// Runs the full pipeline for freshly submitted answers.
    ///
    /// A search with zero matches still invokes the generator with an
    /// empty grounding string rather than short-circuiting.
    pub async fn first_recommendation(&self, answers: &Answers) -> AppResult<FirstRecommendation> {
        let embedding = self.embeddings.embed(&answers.embedding_input()).await?;
        let passages = self.matches.find_matches(&embedding).await?;
        let matched_text = join_matches(&passages);

        if matched_text.is_empty() {
            tracing::warn!("Similarity search returned no passages; generating ungrounded");
        }

        let mut history = ConversationHistory::initialize(RECOMMEND_PROMPT_V1, &matched_text);

        let raw = self.completions.complete(history.turns()).await?;
        let recommendation = Recommendation::from_completion(&raw)?;
        history.append(ConversationTurn::new(Role::Assistant, raw))?;

        tracing::info!(title = %recommendation.title, "First recommendation generated");

        Ok(FirstRecommendation {
            recommendation,
            history,
        })
    }

    /// Generates a replacement recommendation from the accumulated
    /// history and the original answers. No embedding or search here.
    pub async fn next_recommendation(
        &self,
        answers: &Answers,
        history: &ConversationHistory,
    ) -> AppResult<NextRecommendation> {
        let system = format!("{}\n###\n{}", REFINE_PROMPT_V1, history.serialize());
        let answers_json =
            serde_json::to_string(answers).map_err(|e| AppError::Internal(e.to_string()))?;

        let messages = [
            ConversationTurn::new(Role::System, system),
            ConversationTurn::new(Role::User, answers_json),
        ];

        let raw = self.completions.complete(&messages).await?;
        let recommendation = Recommendation::from_completion(&raw)?;

        tracing::info!(title = %recommendation.title, "Follow-up recommendation generated");

        Ok(NextRecommendation {
            recommendation,
            assistant_turn: ConversationTurn::new(Role::Assistant, raw),
        })
    }
}
