/// External provider abstractions
///
/// Each external dependency of the recommendation pipeline sits behind its
/// own trait so the pipeline and session controller can be exercised against
/// mocks. Real implementations live in this module: OpenAI (embeddings and
/// chat completions), Supabase (vector similarity RPC), and TMDB (posters).
use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{ConversationTurn, MatchedPassage},
};

pub mod openai;
pub mod supabase;
pub mod tmdb;

/// Minimum similarity score for a passage to qualify as a match.
pub const MATCH_THRESHOLD: f64 = 0.5;

/// Maximum number of passages returned per search.
pub const MATCH_COUNT: u32 = 4;

/// Converts free text into a fixed-length semantic vector.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, input: &str) -> AppResult<Vec<f32>>;
}

/// Maps an embedding to ranked text passages above the similarity threshold.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MatchProvider: Send + Sync {
    /// Returns passages scoring at or above [`MATCH_THRESHOLD`], most
    /// similar first, truncated to [`MATCH_COUNT`]. Zero matches is a
    /// valid, empty result.
    async fn find_matches(&self, embedding: &[f32]) -> AppResult<Vec<MatchedPassage>>;
}

/// Produces one chat-completion message for a conversation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Returns the raw content of the model's reply. The caller owns
    /// schema validation.
    async fn complete(&self, messages: &[ConversationTurn]) -> AppResult<String>;
}

/// Resolves a movie title to a poster image URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PosterProvider: Send + Sync {
    /// `None` when the catalog has no result or no poster path for the
    /// title. Only transport-level failures are errors.
    async fn poster_url(&self, title: &str) -> AppResult<Option<String>>;
}
