/// TMDB poster provider
///
/// Resolves a movie title to a poster image URL via TMDB's movie search.
/// The poster URL is the fixed image base joined with the `poster_path`
/// of the first search result. Missing results and missing poster paths
/// are a `None`, not an error; the presentation view degrades to text.
use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    services::providers::PosterProvider,
};

const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

#[derive(Clone)]
pub struct TmdbPosterProvider {
    http_client: HttpClient,
    token: String,
    api_url: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    poster_path: Option<String>,
}

impl TmdbPosterProvider {
    pub fn new(http_client: HttpClient, token: String, api_url: String) -> Self {
        Self {
            http_client,
            token,
            api_url,
        }
    }
}

#[async_trait::async_trait]
impl PosterProvider for TmdbPosterProvider {
    async fn poster_url(&self, title: &str) -> AppResult<Option<String>> {
        let url = format!("{}/search/movie", self.api_url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[
                ("query", title),
                ("include_adult", "false"),
                ("language", "en-US"),
                ("page", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::PosterLookup(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        let search: SearchResponse = response.json().await?;

        let poster = search
            .results
            .first()
            .and_then(|r| r.poster_path.as_deref())
            .map(|path| format!("{}{}", IMAGE_BASE_URL, path));

        tracing::info!(
            title = %title,
            found = poster.is_some(),
            provider = "tmdb",
            "Poster lookup completed"
        );

        Ok(poster)
    }
}
