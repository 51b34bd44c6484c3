//! Catalog API access shared by the Spinback front-ends
//!
//! # Design Principle
//!
//! This module contains ONLY:
//! - The catalog collaborator trait and its HTTP client
//! - Bearer-token lifecycle (obtain, persist, expire, clear)
//!
//! The OAuth redirect flow that produces a token happens elsewhere; Spinback
//! only consumes the resulting access token.

pub mod auth;
pub mod catalog;

pub use auth::{AuthToken, TokenStore};
pub use catalog::{CatalogClient, TrackCatalog};

/// Leaderboard name of the token's owner
///
/// Falls back to `fallback` when the profile cannot be fetched.
pub async fn resolve_player_name(catalog: &dyn TrackCatalog, fallback: &str) -> String {
    match catalog.current_user().await {
        Ok(profile) => profile.player_name().to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Current user lookup failed, using {}", fallback);
            fallback.to_string()
        }
    }
}
