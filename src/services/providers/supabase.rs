/// Supabase similarity search provider
///
/// Calls the `match_movies` Postgres function through the PostgREST RPC
/// endpoint. The function takes a query embedding plus the fixed threshold
/// and result cap, and returns movie description passages ordered by
/// similarity, most similar first.
use reqwest::Client as HttpClient;
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    models::MatchedPassage,
    services::providers::{MatchProvider, MATCH_COUNT, MATCH_THRESHOLD},
};

#[derive(Clone)]
pub struct SupabaseMatchProvider {
    http_client: HttpClient,
    project_url: String,
    anon_key: String,
}

#[derive(Serialize)]
struct MatchRequest<'a> {
    query_embedding: &'a [f32],
    match_threshold: f64,
    match_count: u32,
}

impl SupabaseMatchProvider {
    pub fn new(http_client: HttpClient, project_url: String, anon_key: String) -> Self {
        Self {
            http_client,
            project_url,
            anon_key,
        }
    }
}

#[async_trait::async_trait]
impl MatchProvider for SupabaseMatchProvider {
    async fn find_matches(&self, embedding: &[f32]) -> AppResult<Vec<MatchedPassage>> {
        let url = format!("{}/rest/v1/rpc/match_movies", self.project_url);

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(&MatchRequest {
                query_embedding: embedding,
                match_threshold: MATCH_THRESHOLD,
                match_count: MATCH_COUNT,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Search(format!(
                "Supabase RPC returned status {}: {}",
                status, body
            )));
        }

        let matches: Vec<MatchedPassage> = response.json().await?;

        tracing::info!(
            matches = matches.len(),
            threshold = MATCH_THRESHOLD,
            "Similarity search completed"
        );

        Ok(matches)
    }
}
