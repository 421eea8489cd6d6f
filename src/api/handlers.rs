use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Answers, RecommendationSlot};
use crate::services::{Phase, Session};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub favorite_movie: String,
    pub favorite_actor: String,
    pub moods: Vec<String>,
}

impl From<SubmitRequest> for Answers {
    fn from(request: SubmitRequest) -> Self {
        Answers {
            favorite_movie: request.favorite_movie,
            favorite_actor: request.favorite_actor,
            moods: request.moods,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub phase: Phase,
    pub answers: Answers,
    pub recommendation: RecommendationSlot,
    pub history_len: usize,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            created_at: session.created_at,
            phase: session.phase,
            answers: session.answers.clone(),
            recommendation: session.recommendation.clone(),
            history_len: session.history.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PosterResponse {
    pub title: String,
    pub poster_url: Option<String>,
    /// Inline degradation message when no poster exists.
    pub message: Option<String>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Create a new questionnaire session
pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionResponse>) {
    let session = state.controller.create().await;
    tracing::info!(session_id = %session.id, "Session created");
    (StatusCode::CREATED, Json(SessionResponse::from(&session)))
}

/// Get the current session view
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionResponse>> {
    let session = state.controller.get(id).await?;
    Ok(Json(SessionResponse::from(&session)))
}

/// Submit questionnaire answers and generate the first recommendation
pub async fn submit_answers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SubmitRequest>,
) -> AppResult<Json<SessionResponse>> {
    let session = state.controller.submit(id, request.into()).await?;
    Ok(Json(SessionResponse::from(&session)))
}

/// Request a replacement recommendation ("next movie")
pub async fn next_movie(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionResponse>> {
    let session = state.controller.request_next(id).await?;
    Ok(Json(SessionResponse::from(&session)))
}

/// Return to the questionnaire, resetting the session
pub async fn return_home(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionResponse>> {
    let session = state.controller.return_home(id).await?;
    Ok(Json(SessionResponse::from(&session)))
}

/// Look up the poster for the current recommendation
pub async fn get_poster(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PosterResponse>> {
    let poster = state.controller.poster(id).await?;
    let message = poster
        .poster_url
        .is_none()
        .then(|| "No image available.".to_string());

    Ok(Json(PosterResponse {
        title: poster.title,
        poster_url: poster.poster_url,
        message,
    }))
}
