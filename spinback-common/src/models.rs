//! Catalog and leaderboard data models
//!
//! Shapes follow the streaming catalog's JSON payloads. Fields the catalog only
//! sometimes includes are `Option`s (or default to empty) so partial responses
//! deserialize cleanly; consumers treat absence as "not known".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Top-tracks listening window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    /// Roughly the last four weeks
    ShortTerm,
    /// Roughly the last six months
    MediumTerm,
    /// Several years of history
    LongTerm,
}

impl TimeRange {
    /// Query-string value understood by the catalog
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Artist credit on a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistRef {
    pub id: String,
    pub name: String,
}

/// Cover art or artist image reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    pub height: Option<u32>,
    pub width: Option<u32>,
}

/// Album metadata embedded in a track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub name: String,
    /// `YYYY`, `YYYY-MM` or `YYYY-MM-DD`
    pub release_date: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

/// Catalog track
///
/// Immutable once fetched except `preview_url`, which the enhancement pipeline
/// may fill in later (matched by `id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub album: Album,
    /// 0-100
    #[serde(default)]
    pub popularity: u8,
    pub preview_url: Option<String>,
    #[serde(default)]
    pub external_urls: HashMap<String, String>,
}

impl Track {
    /// First credited artist
    pub fn primary_artist(&self) -> Option<&ArtistRef> {
        self.artists.first()
    }

    /// First credited artist name, empty when the catalog sent no credits
    pub fn primary_artist_name(&self) -> &str {
        self.primary_artist().map(|a| a.name.as_str()).unwrap_or("")
    }

    pub fn has_preview(&self) -> bool {
        self.preview_url.is_some()
    }

    /// Deep link into the streaming service
    pub fn deep_link(&self) -> Option<&str> {
        self.external_urls
            .get("spotify")
            .or_else(|| self.external_urls.values().next())
            .map(String::as_str)
    }

    /// Catalog URI used by playlist calls
    pub fn uri(&self) -> String {
        format!("spotify:track:{}", self.id)
    }
}

/// Artist follower count wrapper
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Followers {
    #[serde(default)]
    pub total: u64,
}

/// Full artist record from `getArtist`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistDetails {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub followers: Followers,
}

impl ArtistDetails {
    /// Leading (first listed) genre tag
    pub fn leading_genre(&self) -> Option<&str> {
        self.genres.first().map(String::as_str)
    }
}

/// Audio descriptor vector for one track (all values 0-1)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub energy: f64,
    pub valence: f64,
    pub danceability: f64,
    pub acousticness: f64,
}

/// Current-user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
}

impl UserProfile {
    /// Name shown on the leaderboard
    pub fn player_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.id)
    }
}

/// Recommendation request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendationRequest {
    pub seed_tracks: Vec<String>,
    pub limit: u32,
    pub target_energy: Option<f64>,
    pub target_valence: Option<f64>,
    pub target_danceability: Option<f64>,
}

/// Created playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub external_urls: HashMap<String, String>,
}

/// Finished-game leaderboard row
///
/// Created once per finished session and never mutated. Leaderboards order
/// entries by `score` descending, then `best_streak` descending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player_name: String,
    pub score: u32,
    /// Game variant tag, e.g. `guess_quiz`
    pub game_variant: String,
    /// Difficulty tag, e.g. `medium`
    pub difficulty: String,
    pub best_streak: u32,
    pub turns_completed: u32,
    pub created_at: DateTime<Utc>,
}

/// Aggregate statistics for one player
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub best_score: u32,
    pub best_streak: u32,
    pub total_games: u32,
    pub average_score: f64,
}

/// Deduplicate tracks by identifier; the first occurrence wins
pub fn dedup_by_id(tracks: impl IntoIterator<Item = Track>) -> Vec<Track> {
    let mut seen = HashSet::new();
    tracks
        .into_iter()
        .filter(|t| seen.insert(t.id.clone()))
        .collect()
}

/// Append `incoming` to `existing`, keeping only unseen identifiers, then cap at `limit`
///
/// Entries already in `existing` always win over incoming duplicates.
pub fn merge_unique(
    existing: Vec<Track>,
    incoming: impl IntoIterator<Item = Track>,
    limit: usize,
) -> Vec<Track> {
    let mut merged = dedup_by_id(existing.into_iter().chain(incoming));
    merged.truncate(limit);
    merged
}
