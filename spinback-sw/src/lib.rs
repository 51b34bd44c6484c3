//! # Spinback swipe recommendations
//!
//! Ranks catalog recommendations against the user's top track and serves
//! them as a like/pass deck.

pub mod deck;
pub mod recommender;
pub mod scoring;

pub use deck::{Swipe, SwipeDeck};
pub use recommender::{RecommendationSet, Recommender};
pub use scoring::{RecommendationMatch, ScoringWeights};
