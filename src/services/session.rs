use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Answers, ConversationHistory, RecommendationSlot},
    services::{providers::PosterProvider, recommender::RecommendationEngine},
};

/// User-visible message for any failed generation pipeline. The
/// underlying error goes to diagnostics only.
const GENERIC_FAILURE_MESSAGE: &str = "Sorry, something went wrong. Please try again.";

/// Where a session currently is in the questionnaire cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Showing the questionnaire, collecting answers.
    Collecting,
    /// A generation pipeline is in flight; further triggers are rejected.
    Generating,
    /// Showing a recommendation (or a generation failure message).
    Presenting,
}

/// One user's questionnaire session.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub phase: Phase,
    pub answers: Answers,
    pub history: ConversationHistory,
    pub recommendation: RecommendationSlot,
    /// Bumped on every return-home; in-flight pipeline results carrying
    /// an older epoch are discarded instead of applied.
    epoch: u64,
}

impl Session {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            phase: Phase::Collecting,
            answers: Answers::new(),
            history: ConversationHistory::new(),
            recommendation: RecommendationSlot::None,
            epoch: 0,
        }
    }
}

/// Poster lookup result for the current recommendation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Poster {
    pub title: String,
    pub poster_url: Option<String>,
}

/// Owns all sessions and drives their state machines.
///
/// All transitions go through the operations below; nothing else mutates
/// session fields. Generation runs without holding the session lock, with
/// a phase guard serializing triggers and an epoch check discarding
/// results that a reset overtook.
pub struct SessionController {
    sessions: RwLock<HashMap<Uuid, Session>>,
    engine: RecommendationEngine,
    posters: Arc<dyn PosterProvider>,
}

impl SessionController {
    pub fn new(engine: RecommendationEngine, posters: Arc<dyn PosterProvider>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            engine,
            posters,
        }
    }

    pub async fn create(&self) -> Session {
        let session = Session::new();
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id, session.clone());
        session
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Session> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("No session {}", id)))
    }

    /// Submits questionnaire answers and runs the full pipeline:
    /// embedding, similarity search, then generation.
    ///
    /// Incomplete answers are rejected before any external call and
    /// leave the session untouched.
    pub async fn submit(&self, id: Uuid, answers: Answers) -> AppResult<Session> {
        let epoch = {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(&id)
                .ok_or_else(|| AppError::NotFound(format!("No session {}", id)))?;

            if session.phase == Phase::Generating {
                return Err(AppError::Busy("A recommendation is already being generated".into()));
            }
            answers.validate()?;

            session.answers = answers.clone();
            session.phase = Phase::Generating;
            session.epoch
        };

        let outcome = self.engine.first_recommendation(&answers).await;

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("No session {}", id)))?;

        if session.epoch != epoch {
            tracing::info!(session_id = %id, "Discarding stale pipeline result after reset");
            return Ok(session.clone());
        }

        match outcome {
            Ok(first) => {
                session.recommendation = RecommendationSlot::Ready(first.recommendation);
                session.history = first.history;
            }
            Err(e) => {
                tracing::error!(session_id = %id, error = %e, "Recommendation pipeline failed");
                session.recommendation = RecommendationSlot::Failed {
                    message: GENERIC_FAILURE_MESSAGE.to_string(),
                };
            }
        }
        session.phase = Phase::Presenting;

        Ok(session.clone())
    }

    /// Requests a replacement recommendation, grounded on the accumulated
    /// conversation history and the original answers. Never re-runs the
    /// embedding or similarity search.
    pub async fn request_next(&self, id: Uuid) -> AppResult<Session> {
        let (answers, history, epoch) = {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(&id)
                .ok_or_else(|| AppError::NotFound(format!("No session {}", id)))?;

            match session.phase {
                Phase::Generating => {
                    return Err(AppError::Busy(
                        "A recommendation is already being generated".into(),
                    ))
                }
                Phase::Collecting => {
                    return Err(AppError::Validation(
                        "Submit the questionnaire before requesting another movie".into(),
                    ))
                }
                Phase::Presenting => {}
            }

            session.phase = Phase::Generating;
            (session.answers.clone(), session.history.clone(), session.epoch)
        };

        let outcome = self.engine.next_recommendation(&answers, &history).await;

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("No session {}", id)))?;

        if session.epoch != epoch {
            tracing::info!(session_id = %id, "Discarding stale pipeline result after reset");
            return Ok(session.clone());
        }

        match outcome {
            Ok(next) => {
                session.history.append(next.assistant_turn)?;
                session.recommendation = RecommendationSlot::Ready(next.recommendation);
            }
            Err(e) => {
                tracing::error!(session_id = %id, error = %e, "Follow-up generation failed");
                session.recommendation = RecommendationSlot::Failed {
                    message: GENERIC_FAILURE_MESSAGE.to_string(),
                };
            }
        }
        session.phase = Phase::Presenting;

        Ok(session.clone())
    }

    /// Returns the session to the questionnaire: answers, recommendation
    /// and conversation history all reset. Any in-flight pipeline result
    /// is invalidated.
    pub async fn return_home(&self, id: Uuid) -> AppResult<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("No session {}", id)))?;

        session.answers = Answers::new();
        session.recommendation = RecommendationSlot::None;
        session.history = ConversationHistory::new();
        session.phase = Phase::Collecting;
        session.epoch += 1;

        Ok(session.clone())
    }

    /// Looks up the poster for the currently presented recommendation.
    ///
    /// The lookup runs lock-free; if the presented title changed while it
    /// was in flight, the stale result is discarded.
    pub async fn poster(&self, id: Uuid) -> AppResult<Poster> {
        let title = {
            let sessions = self.sessions.read().await;
            let session = sessions
                .get(&id)
                .ok_or_else(|| AppError::NotFound(format!("No session {}", id)))?;

            session
                .recommendation
                .title()
                .map(str::to_string)
                .ok_or_else(|| {
                    AppError::Validation("No recommendation to look up a poster for".into())
                })?
        };

        let poster_url = self.posters.poster_url(&title).await?;

        let sessions = self.sessions.read().await;
        let session = sessions
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("No session {}", id)))?;

        if session.recommendation.title() != Some(title.as_str()) {
            return Err(AppError::Busy(
                "Recommendation changed during poster lookup".into(),
            ));
        }

        Ok(Poster { title, poster_url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{MatchedPassage, Role};
    use crate::services::providers::{
        CompletionProvider, EmbeddingProvider, MatchProvider, MockPosterProvider,
        MockEmbeddingProvider, MockMatchProvider,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct StubEmbeddings {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for StubEmbeddings {
        async fn embed(&self, _input: &str) -> AppResult<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0.1, 0.2])
        }
    }

    struct StubMatches {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl MatchProvider for StubMatches {
        async fn find_matches(&self, _embedding: &[f32]) -> AppResult<Vec<MatchedPassage>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![MatchedPassage {
                content: "Shutter Island: an island asylum.".to_string(),
                similarity: 0.9,
            }])
        }
    }

    enum Reply {
        Fixed(&'static str),
        Gated {
            started: Arc<Notify>,
            release: Arc<Notify>,
        },
    }

    struct StubCompletions {
        calls: AtomicUsize,
        reply: Reply,
    }

    #[async_trait::async_trait]
    impl CompletionProvider for StubCompletions {
        async fn complete(&self, _messages: &[crate::models::ConversationTurn]) -> AppResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Reply::Fixed(raw) => Ok(raw.to_string()),
                Reply::Gated { started, release } => {
                    started.notify_one();
                    release.notified().await;
                    Ok(r#"{"title":"Shutter Island","description":"An island asylum."}"#.to_string())
                }
            }
        }
    }

    fn valid_answers() -> Answers {
        Answers {
            favorite_movie: "Inception".to_string(),
            favorite_actor: "Leonardo DiCaprio".to_string(),
            moods: vec!["Thriller".to_string()],
        }
    }

    struct Harness {
        controller: Arc<SessionController>,
        embeddings: Arc<StubEmbeddings>,
        matches: Arc<StubMatches>,
        completions: Arc<StubCompletions>,
    }

    fn harness(reply: Reply) -> Harness {
        let embeddings = Arc::new(StubEmbeddings {
            calls: AtomicUsize::new(0),
        });
        let matches = Arc::new(StubMatches {
            calls: AtomicUsize::new(0),
        });
        let completions = Arc::new(StubCompletions {
            calls: AtomicUsize::new(0),
            reply,
        });
        let engine = RecommendationEngine::new(
            embeddings.clone(),
            matches.clone(),
            completions.clone(),
        );
        let controller = Arc::new(SessionController::new(
            engine,
            Arc::new(MockPosterProvider::new()),
        ));
        Harness {
            controller,
            embeddings,
            matches,
            completions,
        }
    }

    const OK_REPLY: &str = r#"{"title":"Shutter Island","description":"An island asylum."}"#;

    #[tokio::test]
    async fn test_invalid_submit_makes_no_external_calls() {
        let h = harness(Reply::Fixed(OK_REPLY));
        let session = h.controller.create().await;

        let result = h.controller.submit(session.id, Answers::new()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let session = h.controller.get(session.id).await.unwrap();
        assert_eq!(session.phase, Phase::Collecting);
        assert_eq!(h.embeddings.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.matches.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.completions.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_submit_runs_pipeline_once_and_presents() {
        let h = harness(Reply::Fixed(OK_REPLY));
        let session = h.controller.create().await;

        let session = h.controller.submit(session.id, valid_answers()).await.unwrap();

        assert_eq!(session.phase, Phase::Presenting);
        assert_eq!(session.recommendation.title(), Some("Shutter Island"));
        assert_eq!(session.history.len(), 3);
        assert_eq!(h.embeddings.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.matches.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.completions.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_request_next_only_invokes_generation() {
        let h = harness(Reply::Fixed(OK_REPLY));
        let session = h.controller.create().await;
        h.controller.submit(session.id, valid_answers()).await.unwrap();

        let before = h.controller.get(session.id).await.unwrap();
        let after = h.controller.request_next(session.id).await.unwrap();

        assert_eq!(after.phase, Phase::Presenting);
        // History grew by exactly the one assistant turn.
        assert_eq!(after.history.len(), before.history.len() + 1);
        assert_eq!(
            after.history.turns().last().unwrap().role,
            Role::Assistant
        );
        assert_eq!(h.embeddings.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.matches.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.completions.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_request_next_before_submit_rejected() {
        let h = harness(Reply::Fixed(OK_REPLY));
        let session = h.controller.create().await;

        let result = h.controller.request_next(session.id).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(h.completions.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generation_failure_leaves_history_unchanged() {
        let h = harness(Reply::Fixed("not a json object"));
        let session = h.controller.create().await;

        let session = h.controller.submit(session.id, valid_answers()).await.unwrap();

        assert_eq!(session.phase, Phase::Presenting);
        assert!(matches!(
            session.recommendation,
            RecommendationSlot::Failed { .. }
        ));
        // Atomicity: the failed call must not have installed any history.
        assert!(session.history.is_empty());
    }

    #[tokio::test]
    async fn test_return_home_resets_everything() {
        let h = harness(Reply::Fixed(OK_REPLY));
        let session = h.controller.create().await;
        h.controller.submit(session.id, valid_answers()).await.unwrap();

        let session = h.controller.return_home(session.id).await.unwrap();

        assert_eq!(session.phase, Phase::Collecting);
        assert_eq!(session.answers, Answers::new());
        assert_eq!(session.recommendation, RecommendationSlot::None);
        assert!(session.history.is_empty());
    }

    #[tokio::test]
    async fn test_submit_while_generating_is_rejected() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let h = harness(Reply::Gated {
            started: started.clone(),
            release: release.clone(),
        });
        let session = h.controller.create().await;
        let id = session.id;

        let controller = h.controller.clone();
        let task = tokio::spawn(async move { controller.submit(id, valid_answers()).await });

        started.notified().await;

        let result = h.controller.submit(id, valid_answers()).await;
        assert!(matches!(result, Err(AppError::Busy(_))));
        let result = h.controller.request_next(id).await;
        assert!(matches!(result, Err(AppError::Busy(_))));

        release.notify_one();
        let session = task.await.unwrap().unwrap();
        assert_eq!(session.phase, Phase::Presenting);
        assert_eq!(h.completions.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reset_during_flight_discards_result() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let h = harness(Reply::Gated {
            started: started.clone(),
            release: release.clone(),
        });
        let session = h.controller.create().await;
        let id = session.id;

        let controller = h.controller.clone();
        let task = tokio::spawn(async move { controller.submit(id, valid_answers()).await });

        started.notified().await;
        h.controller.return_home(id).await.unwrap();
        release.notify_one();
        task.await.unwrap().unwrap();

        let session = h.controller.get(id).await.unwrap();
        assert_eq!(session.phase, Phase::Collecting);
        assert_eq!(session.recommendation, RecommendationSlot::None);
        assert!(session.history.is_empty());
    }

    fn controller_with_poster(poster: MockPosterProvider) -> Arc<SessionController> {
        let mut embeddings = MockEmbeddingProvider::new();
        embeddings.expect_embed().returning(|_| Ok(vec![0.1]));
        let mut matches = MockMatchProvider::new();
        matches.expect_find_matches().returning(|_| Ok(vec![]));
        let completions = StubCompletions {
            calls: AtomicUsize::new(0),
            reply: Reply::Fixed(OK_REPLY),
        };
        let engine = RecommendationEngine::new(
            Arc::new(embeddings),
            Arc::new(matches),
            Arc::new(completions),
        );
        Arc::new(SessionController::new(engine, Arc::new(poster)))
    }

    #[tokio::test]
    async fn test_poster_for_current_recommendation() {
        let mut poster = MockPosterProvider::new();
        poster
            .expect_poster_url()
            .withf(|title| title == "Shutter Island")
            .times(1)
            .returning(|_| Ok(Some("https://image.tmdb.org/t/p/w500/abc.jpg".to_string())));

        let controller = controller_with_poster(poster);
        let session = controller.create().await;
        controller.submit(session.id, valid_answers()).await.unwrap();

        let poster = controller.poster(session.id).await.unwrap();
        assert_eq!(poster.title, "Shutter Island");
        assert_eq!(
            poster.poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/abc.jpg")
        );
    }

    #[tokio::test]
    async fn test_poster_without_recommendation_rejected() {
        let controller = controller_with_poster(MockPosterProvider::new());
        let session = controller.create().await;

        let result = controller.poster(session.id).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
