//! # Spinback guess-the-song engine
//!
//! - [`difficulty`]: difficulty table and penalty constants
//! - [`matcher`]: guess normalization, similarity and turn scoring
//! - [`session`]: pure session reducer
//! - [`countdown`]: cancellable per-turn countdown
//! - [`pool`] and [`pipeline`]: progressive track acquisition with preview backfill
//! - [`engine`]: the driver tying reducer, countdown and persistence together
//! - [`services`]: preview lookup and leaderboard store
//! - [`playback`]: single-slot preview player

pub mod countdown;
pub mod difficulty;
pub mod engine;
pub mod matcher;
pub mod pipeline;
pub mod playback;
pub mod pool;
pub mod services;
pub mod session;

pub use difficulty::{Difficulty, DifficultySettings, Penalties};
pub use engine::{EngineOptions, GameEngine};
pub use pipeline::AcquisitionPipeline;
pub use pool::TrackPool;
pub use session::{GameSession, Rejection};
