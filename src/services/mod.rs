pub mod providers;
pub mod recommender;
pub mod session;

pub use recommender::RecommendationEngine;
pub use session::{Phase, Poster, Session, SessionController};
