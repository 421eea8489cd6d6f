/// OpenAI provider
///
/// Implements both pipeline model calls against the OpenAI REST API:
/// - Embeddings: POST {base}/embeddings
/// - Chat completions: POST {base}/chat/completions
///
/// Completions are always requested in JSON-object mode with the fixed
/// sampling parameters the recommendation prompts were tuned for.
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::ConversationTurn,
    services::providers::{CompletionProvider, EmbeddingProvider},
};

const TEMPERATURE: f64 = 0.65;
const FREQUENCY_PENALTY: f64 = 0.5;

#[derive(Clone)]
pub struct OpenAiProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    embedding_model: String,
    chat_model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    response_format: ResponseFormat,
    messages: &'a [ConversationTurn],
    temperature: f64,
    frequency_penalty: f64,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: String,
}

impl OpenAiProvider {
    pub fn new(
        http_client: HttpClient,
        api_key: String,
        api_url: String,
        embedding_model: String,
        chat_model: String,
    ) -> Self {
        Self {
            http_client,
            api_key,
            api_url,
            embedding_model,
            chat_model,
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, input: &str) -> AppResult<Vec<f32>> {
        let url = format!("{}/embeddings", self.api_url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.embedding_model,
                input,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Embedding(format!(
                "OpenAI embeddings API returned status {}: {}",
                status, body
            )));
        }

        let embedding_response: EmbeddingResponse = response.json().await?;

        let embedding = embedding_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AppError::Embedding("Empty embedding response".to_string()))?;

        tracing::debug!(
            dimensions = embedding.len(),
            model = %self.embedding_model,
            "Embedding created"
        );

        Ok(embedding)
    }
}

#[async_trait::async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, messages: &[ConversationTurn]) -> AppResult<String> {
        let url = format!("{}/chat/completions", self.api_url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest {
                model: &self.chat_model,
                response_format: ResponseFormat {
                    format_type: "json_object",
                },
                messages,
                temperature: TEMPERATURE,
                frequency_penalty: FREQUENCY_PENALTY,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Generation(format!(
                "OpenAI completions API returned status {}: {}",
                status, body
            )));
        }

        let completion: CompletionResponse = response.json().await?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::Generation("Completion response had no choices".to_string()))?;

        tracing::debug!(
            model = %self.chat_model,
            messages = messages.len(),
            "Chat completion received"
        );

        Ok(content)
    }
}
