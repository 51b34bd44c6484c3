//! # Spinback Common Library
//!
//! Shared code for the Spinback front-ends including:
//! - Catalog models (tracks, artists, audio features, leaderboard entries)
//! - Event types (SpinbackEvent enum) and the EventBus
//! - Catalog API client and bearer-token store
//! - Configuration loading
//! - Timestamp helpers

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod time;

pub use error::{Error, Result};
pub use models::{Track, TimeRange};
