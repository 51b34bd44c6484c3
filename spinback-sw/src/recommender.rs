//! Recommendation assembly
//!
//! Picks the seed (top short-term track, falling back to medium-term), gathers
//! the seed's genre and descriptors, asks the catalog for recommendations
//! targeted at those descriptors, then scores and ranks the candidates.
//! Enrichment lookups that fail only remove their contribution.

use crate::scoring::{
    rank_matches, score_candidate, CandidateProfile, RecommendationMatch, ScoringWeights,
    SeedProfile,
};
use futures::stream::{self, StreamExt};
use spinback_common::api::TrackCatalog;
use spinback_common::models::{AudioFeatures, RecommendationRequest};
use spinback_common::{Error, Result, TimeRange, Track};
use std::collections::HashMap;
use std::sync::Arc;

/// Candidates requested from the catalog
pub const DEFAULT_CANDIDATE_LIMIT: u32 = 30;

/// Concurrent artist lookups
const ARTIST_LOOKUP_CONCURRENCY: usize = 4;

/// Seed plus its ranked matches
#[derive(Debug, Clone)]
pub struct RecommendationSet {
    pub seed: Track,
    pub seed_genre: Option<String>,
    pub matches: Vec<RecommendationMatch>,
}

pub struct Recommender {
    catalog: Arc<dyn TrackCatalog>,
    weights: ScoringWeights,
    candidate_limit: u32,
}

impl Recommender {
    pub fn new(catalog: Arc<dyn TrackCatalog>, weights: ScoringWeights) -> Self {
        Self {
            catalog,
            weights,
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
        }
    }

    pub fn with_candidate_limit(mut self, limit: u32) -> Self {
        self.candidate_limit = limit.max(1);
        self
    }

    /// Build a ranked deck from the user's top track
    pub async fn recommend(&self) -> Result<RecommendationSet> {
        let seed = self.seed_track().await?;
        tracing::info!(track_id = %seed.id, name = %seed.name, "Seed track selected");

        let seed_genre = self.leading_genre(&seed).await;
        let seed_features = self
            .features_for(std::slice::from_ref(&seed.id))
            .await
            .remove(&seed.id);

        let request = RecommendationRequest {
            seed_tracks: vec![seed.id.clone()],
            limit: self.candidate_limit,
            target_energy: seed_features.map(|f| f.energy),
            target_valence: seed_features.map(|f| f.valence),
            target_danceability: seed_features.map(|f| f.danceability),
        };
        let candidates: Vec<Track> = self
            .catalog
            .recommendations(&request)
            .await?
            .into_iter()
            .filter(|t| t.id != seed.id)
            .collect();

        let ids: Vec<String> = candidates.iter().map(|t| t.id.clone()).collect();
        let features = self.features_for(&ids).await;
        let genres = match seed_genre {
            Some(_) => self.artist_genres(&candidates).await,
            None => HashMap::new(),
        };

        let matches = self.score_all(
            &seed,
            seed_features.as_ref(),
            seed_genre.as_deref(),
            &candidates,
            &features,
            &genres,
        );
        tracing::info!(
            candidates = candidates.len(),
            kept = matches.len(),
            "Recommendations ranked"
        );

        Ok(RecommendationSet {
            seed,
            seed_genre,
            matches,
        })
    }

    /// Score and rank candidates against the seed
    pub fn score_all(
        &self,
        seed: &Track,
        seed_features: Option<&AudioFeatures>,
        seed_genre: Option<&str>,
        candidates: &[Track],
        features: &HashMap<String, AudioFeatures>,
        genres: &HashMap<String, Vec<String>>,
    ) -> Vec<RecommendationMatch> {
        let seed_profile = SeedProfile {
            track: seed,
            features: seed_features,
            leading_genre: seed_genre,
        };

        let scored = candidates
            .iter()
            .map(|track| {
                let artist_genres = track
                    .primary_artist()
                    .and_then(|a| genres.get(&a.id))
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                let profile = CandidateProfile {
                    track,
                    features: features.get(&track.id),
                    genres: artist_genres,
                };
                let (score, reasons) = score_candidate(&seed_profile, &profile, &self.weights);
                RecommendationMatch {
                    track: track.clone(),
                    score,
                    reasons,
                }
            })
            .collect();

        rank_matches(scored)
    }

    async fn seed_track(&self) -> Result<Track> {
        for range in [TimeRange::ShortTerm, TimeRange::MediumTerm] {
            match self.catalog.top_tracks(range, 1).await {
                Ok(tracks) => {
                    if let Some(track) = tracks.into_iter().next() {
                        return Ok(track);
                    }
                    tracing::debug!(range = %range, "No top track in range");
                }
                Err(e @ Error::Auth(_)) => return Err(e),
                Err(e) => tracing::warn!(range = %range, error = %e, "Top track request failed"),
            }
        }
        Err(Error::NotFound("top track".to_string()))
    }

    async fn leading_genre(&self, seed: &Track) -> Option<String> {
        let artist = seed.primary_artist()?;
        match self.catalog.artist(&artist.id).await {
            Ok(details) => details.leading_genre().map(String::from),
            Err(e) => {
                tracing::warn!(artist_id = %artist.id, error = %e, "Seed artist lookup failed");
                None
            }
        }
    }

    async fn features_for(&self, ids: &[String]) -> HashMap<String, AudioFeatures> {
        if ids.is_empty() {
            return HashMap::new();
        }
        match self.catalog.audio_features(ids).await {
            Ok(features) => features,
            Err(e) => {
                tracing::warn!(count = ids.len(), error = %e, "Audio features request failed");
                HashMap::new()
            }
        }
    }

    /// Genre tags per primary artist id
    async fn artist_genres(&self, candidates: &[Track]) -> HashMap<String, Vec<String>> {
        let mut artist_ids: Vec<String> = candidates
            .iter()
            .filter_map(|t| t.primary_artist().map(|a| a.id.clone()))
            .collect();
        artist_ids.sort();
        artist_ids.dedup();

        stream::iter(artist_ids)
            .map(|id| async move {
                let result = self.catalog.artist(&id).await;
                (id, result)
            })
            .buffer_unordered(ARTIST_LOOKUP_CONCURRENCY)
            .filter_map(|(id, result)| async move {
                match result {
                    Ok(details) => Some((id, details.genres)),
                    Err(e) => {
                        tracing::debug!(artist_id = %id, error = %e, "Artist lookup failed");
                        None
                    }
                }
            })
            .collect()
            .await
    }
}
