//! Swipe deck over ranked recommendations

use crate::scoring::RecommendationMatch;
use spinback_common::api::TrackCatalog;
use spinback_common::models::Playlist;
use spinback_common::{Result, Track};
use std::collections::VecDeque;

/// Swipe decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Swipe {
    Like,
    Pass,
}

/// Deck consumed front to back
#[derive(Debug, Clone)]
pub struct SwipeDeck {
    seed: Track,
    queue: VecDeque<RecommendationMatch>,
    liked: Vec<Track>,
    passed: usize,
}

impl SwipeDeck {
    pub fn new(seed: Track, matches: Vec<RecommendationMatch>) -> Self {
        Self {
            seed,
            queue: matches.into(),
            liked: Vec::new(),
            passed: 0,
        }
    }

    /// Keep only the best `size` cards
    pub fn truncate(&mut self, size: usize) {
        self.queue.truncate(size);
    }

    pub fn seed(&self) -> &Track {
        &self.seed
    }

    /// Card on top of the deck
    pub fn current(&self) -> Option<&RecommendationMatch> {
        self.queue.front()
    }

    /// Consume the top card; returns it, or `None` when the deck is empty
    pub fn swipe(&mut self, swipe: Swipe) -> Option<RecommendationMatch> {
        let card = self.queue.pop_front()?;
        match swipe {
            Swipe::Like => self.liked.push(card.track.clone()),
            Swipe::Pass => self.passed += 1,
        }
        Some(card)
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn is_finished(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn liked(&self) -> &[Track] {
        &self.liked
    }

    pub fn passed(&self) -> usize {
        self.passed
    }

    pub fn default_playlist_name(&self) -> String {
        format!("Spinback: more like {}", self.seed.name)
    }

    /// Save liked tracks as a new private playlist
    ///
    /// Returns `None` without touching the catalog when nothing was liked.
    pub async fn save_liked_as_playlist(
        &self,
        catalog: &dyn TrackCatalog,
        name: &str,
    ) -> Result<Option<Playlist>> {
        if self.liked.is_empty() {
            return Ok(None);
        }

        let user = catalog.current_user().await?;
        let description = format!(
            "Liked while swiping recommendations for {} by {}",
            self.seed.name,
            self.seed.primary_artist_name()
        );
        let playlist = catalog.create_playlist(&user.id, name, &description).await?;

        let uris: Vec<String> = self.liked.iter().map(Track::uri).collect();
        catalog.add_tracks(&playlist.id, &uris).await?;

        tracing::info!(
            playlist_id = %playlist.id,
            tracks = uris.len(),
            "Liked tracks saved"
        );
        Ok(Some(playlist))
    }
}
