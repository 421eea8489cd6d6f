use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// The fixed mood vocabulary offered by the questionnaire.
pub const MOOD_OPTIONS: [&str; 8] = [
    "Action",
    "Comedy",
    "Drama",
    "Fantasy",
    "Horror",
    "Romance",
    "Science Fiction",
    "Thriller",
];

/// Questionnaire answers collected before the first recommendation.
///
/// All three fields must be populated before a submission is accepted;
/// moods must come from [`MOOD_OPTIONS`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Answers {
    pub favorite_movie: String,
    pub favorite_actor: String,
    pub moods: Vec<String>,
}

impl Answers {
    /// Creates empty answers (the Collecting-phase initial value).
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates that every field is populated and moods are known.
    pub fn validate(&self) -> AppResult<()> {
        if self.favorite_movie.trim().is_empty()
            || self.favorite_actor.trim().is_empty()
            || self.moods.is_empty()
        {
            return Err(AppError::Validation(
                "Please fill in all the answers before submitting.".to_string(),
            ));
        }

        for mood in &self.moods {
            if !MOOD_OPTIONS.contains(&mood.as_str()) {
                return Err(AppError::Validation(format!("Unknown mood: {}", mood)));
            }
        }

        Ok(())
    }

    /// Concatenated free-text form used as embedding input.
    pub fn embedding_input(&self) -> String {
        format!(
            "Favorite Movie: {}\nFavorite Actor: {}\nMood: {}",
            self.favorite_movie,
            self.favorite_actor,
            self.moods.join(", ")
        )
    }
}
