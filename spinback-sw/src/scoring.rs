//! Recommendation similarity scoring
//!
//! Scores a candidate track against the seed (the user's top track) from
//! shared artist, shared leading genre, popularity and audio descriptors. The
//! result is an integer in `[0, 100]` plus the human-readable reasons that
//! contributed. Absent descriptor or genre data never contributes.

use serde::Serialize;
use spinback_common::config::RecommendationConfig;
use spinback_common::models::AudioFeatures;
use spinback_common::Track;
use std::collections::HashSet;

/// Popularity difference below which tracks count as similar
pub const POPULARITY_TOLERANCE: u8 = 15;

/// Per-descriptor difference below which tracks count as similar
pub const DESCRIPTOR_TOLERANCE: f64 = 0.2;

/// Candidate popularity strictly inside this range earns the sweet-spot bonus
pub const POPULARITY_SWEET_SPOT: (u8, u8) = (20, 80);

pub const MAX_SCORE: u32 = 100;

/// Matches kept after ranking
pub const MAX_MATCHES: usize = 20;

pub const REASON_SAME_ARTIST: &str = "Same artist";
pub const REASON_POPULARITY: &str = "Similar popularity level";
pub const REASON_ENERGY: &str = "Similar energy level";
pub const REASON_VALENCE: &str = "Similar mood/vibe";
pub const REASON_DANCEABILITY: &str = "Similar danceability";
pub const REASON_PREVIEW: &str = "Preview available";
pub const REASON_FALLBACK: &str = "Recommended from your top track";

/// Tunable weight table
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoringWeights {
    pub base: f64,
    pub same_artist: f64,
    pub popularity: f64,
    pub genre: f64,
    pub energy: f64,
    pub valence: f64,
    pub danceability: f64,
    pub dual_preview: f64,
    /// Scales `1 - mean descriptor difference`
    pub descriptor_similarity: f64,
    pub popularity_sweet_spot: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base: 50.0,
            same_artist: 40.0,
            popularity: 10.0,
            genre: 15.0,
            energy: 12.0,
            valence: 12.0,
            danceability: 8.0,
            dual_preview: 5.0,
            descriptor_similarity: 15.0,
            popularity_sweet_spot: 5.0,
        }
    }
}

impl ScoringWeights {
    /// Defaults overridden by the `[recommendations]` section
    pub fn from_config(config: &RecommendationConfig) -> Self {
        let d = Self::default();
        Self {
            base: config.base_score.unwrap_or(d.base),
            same_artist: config.same_artist.unwrap_or(d.same_artist),
            popularity: config.popularity.unwrap_or(d.popularity),
            genre: config.genre.unwrap_or(d.genre),
            energy: config.energy.unwrap_or(d.energy),
            valence: config.valence.unwrap_or(d.valence),
            danceability: config.danceability.unwrap_or(d.danceability),
            dual_preview: config.dual_preview.unwrap_or(d.dual_preview),
            descriptor_similarity: config
                .descriptor_similarity
                .unwrap_or(d.descriptor_similarity),
            popularity_sweet_spot: config
                .popularity_sweet_spot
                .unwrap_or(d.popularity_sweet_spot),
        }
    }
}

/// Seed-side scoring context, computed once per deck
#[derive(Debug, Clone, Copy)]
pub struct SeedProfile<'a> {
    pub track: &'a Track,
    pub features: Option<&'a AudioFeatures>,
    /// Leading genre of the seed's primary artist
    pub leading_genre: Option<&'a str>,
}

/// Candidate-side inputs
#[derive(Debug, Clone, Copy)]
pub struct CandidateProfile<'a> {
    pub track: &'a Track,
    pub features: Option<&'a AudioFeatures>,
    /// Genre tags of the candidate's primary artist
    pub genres: &'a [String],
}

/// Ranked recommendation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationMatch {
    pub track: Track,
    pub score: u32,
    pub reasons: Vec<String>,
}

/// Score one candidate
pub fn score_candidate(
    seed: &SeedProfile<'_>,
    candidate: &CandidateProfile<'_>,
    weights: &ScoringWeights,
) -> (u32, Vec<String>) {
    let mut score = weights.base;
    let mut reasons = Vec::new();

    let seed_artists: HashSet<&str> = seed.track.artists.iter().map(|a| a.id.as_str()).collect();
    if candidate
        .track
        .artists
        .iter()
        .any(|a| seed_artists.contains(a.id.as_str()))
    {
        score += weights.same_artist;
        reasons.push(REASON_SAME_ARTIST.to_string());
    }

    if let Some(genre) = seed.leading_genre {
        if candidate.genres.iter().any(|g| g.eq_ignore_ascii_case(genre)) {
            score += weights.genre;
            reasons.push(format!("Both {}", genre));
        }
    }

    if seed.track.popularity.abs_diff(candidate.track.popularity) < POPULARITY_TOLERANCE {
        score += weights.popularity;
        reasons.push(REASON_POPULARITY.to_string());
    }

    if let (Some(a), Some(b)) = (seed.features, candidate.features) {
        let energy = (a.energy - b.energy).abs();
        let valence = (a.valence - b.valence).abs();
        let danceability = (a.danceability - b.danceability).abs();

        if energy < DESCRIPTOR_TOLERANCE {
            score += weights.energy;
            reasons.push(REASON_ENERGY.to_string());
        }
        if valence < DESCRIPTOR_TOLERANCE {
            score += weights.valence;
            reasons.push(REASON_VALENCE.to_string());
        }
        if danceability < DESCRIPTOR_TOLERANCE {
            score += weights.danceability;
            reasons.push(REASON_DANCEABILITY.to_string());
        }

        let mean_diff = (energy + valence + danceability) / 3.0;
        score += (1.0 - mean_diff) * weights.descriptor_similarity;
    }

    if seed.track.has_preview() && candidate.track.has_preview() {
        score += weights.dual_preview;
        reasons.push(REASON_PREVIEW.to_string());
    }

    let (low, high) = POPULARITY_SWEET_SPOT;
    if candidate.track.popularity > low && candidate.track.popularity < high {
        score += weights.popularity_sweet_spot;
    }

    if reasons.is_empty() {
        reasons.push(REASON_FALLBACK.to_string());
    }

    let clamped = score.round().clamp(0.0, MAX_SCORE as f64) as u32;
    (clamped, reasons)
}

/// Deduplicate by track id (first wins), sort by score descending, keep the top [`MAX_MATCHES`]
///
/// The sort is stable, so equal scores keep catalog order.
pub fn rank_matches(matches: Vec<RecommendationMatch>) -> Vec<RecommendationMatch> {
    let mut seen = HashSet::new();
    let mut unique: Vec<RecommendationMatch> = matches
        .into_iter()
        .filter(|m| seen.insert(m.track.id.clone()))
        .collect();
    unique.sort_by(|a, b| b.score.cmp(&a.score));
    unique.truncate(MAX_MATCHES);
    unique
}
