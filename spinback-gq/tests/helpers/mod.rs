//! Shared fakes for spinback-gq integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use spinback_common::api::TrackCatalog;
use spinback_common::models::{
    Album, ArtistDetails, ArtistRef, AudioFeatures, LeaderboardEntry, Playlist,
    RecommendationRequest, UserProfile, UserStats,
};
use spinback_common::{Error, Result, TimeRange, Track};
use spinback_gq::services::{
    PreviewError, PreviewLookup, PreviewQuery, SaveResult, ScoreMetadata, ScoreStore,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn track(id: &str, title: &str, artist: &str, preview: Option<&str>) -> Track {
    Track {
        id: id.to_string(),
        name: title.to_string(),
        artists: vec![ArtistRef {
            id: format!("artist-{}", id),
            name: artist.to_string(),
        }],
        album: Album {
            name: format!("{} (Album)", title),
            release_date: Some("2004-05-06".to_string()),
            images: Vec::new(),
        },
        popularity: 60,
        preview_url: preview.map(String::from),
        external_urls: HashMap::new(),
    }
}

/// `n` tracks with ids `{prefix}0..`, all playable when `playable`
pub fn tracks(prefix: &str, n: usize, playable: bool) -> Vec<Track> {
    (0..n)
        .map(|i| {
            let id = format!("{}{}", prefix, i);
            let preview = playable.then(|| format!("http://preview/{}", id));
            track(&id, &format!("Title {}", id), &format!("Artist {}", id), preview.as_deref())
        })
        .collect()
}

/// Catalog serving canned top tracks per time range
#[derive(Default)]
pub struct FakeCatalog {
    pub top: HashMap<TimeRange, Vec<Track>>,
    pub failing: HashSet<TimeRange>,
    pub profile: Option<UserProfile>,
    pub requests: Mutex<Vec<(TimeRange, u32)>>,
}

impl FakeCatalog {
    pub fn with_range(mut self, range: TimeRange, tracks: Vec<Track>) -> Self {
        self.top.insert(range, tracks);
        self
    }

    pub fn failing(mut self, range: TimeRange) -> Self {
        self.failing.insert(range);
        self
    }

    pub fn requests(&self) -> Vec<(TimeRange, u32)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrackCatalog for FakeCatalog {
    async fn top_tracks(&self, range: TimeRange, limit: u32) -> Result<Vec<Track>> {
        self.requests.lock().unwrap().push((range, limit));
        if self.failing.contains(&range) {
            return Err(Error::Network("connection reset".to_string()));
        }
        Ok(self
            .top
            .get(&range)
            .map(|t| t.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn artist(&self, id: &str) -> Result<ArtistDetails> {
        Err(Error::NotFound(id.to_string()))
    }

    async fn recommendations(&self, _request: &RecommendationRequest) -> Result<Vec<Track>> {
        Ok(Vec::new())
    }

    async fn audio_features(&self, _ids: &[String]) -> Result<HashMap<String, AudioFeatures>> {
        Ok(HashMap::new())
    }

    async fn current_user(&self) -> Result<UserProfile> {
        self.profile
            .clone()
            .ok_or_else(|| Error::Auth("no access token".to_string()))
    }

    async fn create_playlist(&self, _: &str, _: &str, _: &str) -> Result<Playlist> {
        Err(Error::InvalidInput("not supported".to_string()))
    }

    async fn add_tracks(&self, _: &str, _: &[String]) -> Result<()> {
        Err(Error::InvalidInput("not supported".to_string()))
    }
}

/// Preview lookup answering from a title → URL table
#[derive(Default)]
pub struct FakePreviews {
    pub urls: HashMap<String, String>,
    pub failing_titles: HashSet<String>,
    pub warm_fails: bool,
    pub calls: AtomicUsize,
    pub batch_calls: AtomicUsize,
    pub warm_calls: AtomicUsize,
}

impl FakePreviews {
    /// Answers every title with `http://found/{title}`
    pub fn for_tracks(tracks: &[Track]) -> Self {
        Self {
            urls: tracks
                .iter()
                .map(|t| (t.name.clone(), format!("http://found/{}", t.id)))
                .collect(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PreviewLookup for FakePreviews {
    async fn find_preview_url(
        &self,
        _artist: &str,
        title: &str,
    ) -> std::result::Result<Option<String>, PreviewError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_titles.contains(title) {
            return Err(PreviewError::NetworkError("timeout".to_string()));
        }
        Ok(self.urls.get(title).cloned())
    }

    async fn find_preview_urls(
        &self,
        queries: &[PreviewQuery],
    ) -> std::result::Result<Vec<Option<String>>, PreviewError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        let mut results = Vec::with_capacity(queries.len());
        for q in queries {
            results.push(self.find_preview_url(&q.artist, &q.title).await?);
        }
        Ok(results)
    }

    async fn warm(&self) -> std::result::Result<(), PreviewError> {
        self.warm_calls.fetch_add(1, Ordering::SeqCst);
        if self.warm_fails {
            return Err(PreviewError::ApiError(503, "cold".to_string()));
        }
        Ok(())
    }
}

/// One saved row
#[derive(Debug, Clone, PartialEq)]
pub struct SavedScore {
    pub player_name: String,
    pub score: u32,
    pub game_variant: String,
    pub metadata: ScoreMetadata,
}

/// In-memory score store
#[derive(Default)]
pub struct MemoryScoreStore {
    pub saved: Mutex<Vec<SavedScore>>,
    /// Simulated write latency
    pub delay: Option<Duration>,
}

impl MemoryScoreStore {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn saved(&self) -> Vec<SavedScore> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScoreStore for MemoryScoreStore {
    async fn save_score(
        &self,
        player_name: &str,
        score: u32,
        game_variant: &str,
        metadata: &ScoreMetadata,
    ) -> Result<SaveResult> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.saved.lock().unwrap().push(SavedScore {
            player_name: player_name.to_string(),
            score,
            game_variant: game_variant.to_string(),
            metadata: metadata.clone(),
        });
        Ok(SaveResult {
            success: true,
            message: "saved".to_string(),
        })
    }

    async fn leaderboard(
        &self,
        _: Option<&str>,
        _: Option<&str>,
        _: u32,
    ) -> Result<Vec<LeaderboardEntry>> {
        Ok(Vec::new())
    }

    async fn user_stats(&self, _: &str, _: Option<&str>) -> Result<UserStats> {
        Ok(UserStats::default())
    }
}

/// Store whose saves always fail
#[derive(Default)]
pub struct FailingScoreStore {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl ScoreStore for FailingScoreStore {
    async fn save_score(&self, _: &str, _: u32, _: &str, _: &ScoreMetadata) -> Result<SaveResult> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(Error::Network("store offline".to_string()))
    }

    async fn leaderboard(
        &self,
        _: Option<&str>,
        _: Option<&str>,
        _: u32,
    ) -> Result<Vec<LeaderboardEntry>> {
        Err(Error::Network("store offline".to_string()))
    }

    async fn user_stats(&self, _: &str, _: Option<&str>) -> Result<UserStats> {
        Err(Error::Network("store offline".to_string()))
    }
}
