use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::services::providers::openai::OpenAiProvider;
use crate::services::providers::supabase::SupabaseMatchProvider;
use crate::services::providers::tmdb::TmdbPosterProvider;
use crate::services::{RecommendationEngine, SessionController};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<SessionController>,
}

impl AppState {
    /// Creates state around an existing controller (used by tests to
    /// inject stub providers).
    pub fn new(controller: SessionController) -> Self {
        Self {
            controller: Arc::new(controller),
        }
    }

    /// Wires real provider clients from configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let openai = Arc::new(OpenAiProvider::new(
            http_client.clone(),
            config.openai_api_key.clone(),
            config.openai_api_url.clone(),
            config.embedding_model.clone(),
            config.chat_model.clone(),
        ));

        let supabase = Arc::new(SupabaseMatchProvider::new(
            http_client.clone(),
            config.supabase_url.clone(),
            config.supabase_anon_key.clone(),
        ));

        let tmdb = Arc::new(TmdbPosterProvider::new(
            http_client,
            config.tmdb_token.clone(),
            config.tmdb_api_url.clone(),
        ));

        let engine = RecommendationEngine::new(openai.clone(), supabase, openai);

        Ok(Self::new(SessionController::new(engine, tmdb)))
    }
}
