//! Shared candidate track pool
//!
//! The acquisition pipeline writes, the game engine reads snapshots. Preview
//! updates are applied by track id so concurrent enrichment never depends on
//! positions. Once closed, every write is silently discarded.

use crate::session::MIN_PLAYABLE_TRACKS;
use spinback_common::models::merge_unique;
use spinback_common::Track;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug)]
struct PoolState {
    tracks: Vec<Track>,
    capacity: usize,
    closed: bool,
}

/// Cloneable handle to the pool
#[derive(Debug, Clone)]
pub struct TrackPool {
    state: Arc<RwLock<PoolState>>,
}

impl TrackPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(PoolState {
                tracks: Vec::new(),
                capacity,
                closed: false,
            })),
        }
    }

    /// Pool seeded with tracks (deduplicated, capped)
    pub fn with_tracks(capacity: usize, tracks: Vec<Track>) -> Self {
        let pool = Self::new(capacity);
        if let Ok(mut state) = pool.state.try_write() {
            state.tracks = merge_unique(Vec::new(), tracks, capacity);
        }
        pool
    }

    pub async fn capacity(&self) -> usize {
        self.state.read().await.capacity
    }

    /// Merge tracks into the pool, first occurrence wins
    ///
    /// Returns the number of tracks actually added.
    pub async fn merge(&self, incoming: Vec<Track>) -> usize {
        let mut state = self.state.write().await;
        if state.closed {
            return 0;
        }
        let before = state.tracks.len();
        let existing = std::mem::take(&mut state.tracks);
        state.tracks = merge_unique(existing, incoming, state.capacity);
        state.tracks.len() - before
    }

    /// Set a missing preview URL on the track with `track_id`
    ///
    /// Returns false when the pool is closed, the id is unknown, or the track
    /// already has a preview.
    pub async fn apply_preview(&self, track_id: &str, preview_url: String) -> bool {
        let mut state = self.state.write().await;
        if state.closed {
            return false;
        }
        match state.tracks.iter_mut().find(|t| t.id == track_id) {
            Some(track) if track.preview_url.is_none() => {
                track.preview_url = Some(preview_url);
                true
            }
            _ => false,
        }
    }

    /// Copy of the current tracks
    pub async fn snapshot(&self) -> Vec<Track> {
        self.state.read().await.tracks.clone()
    }

    /// Copy of the tracks starting at `offset`
    pub async fn tracks_from(&self, offset: usize) -> Vec<Track> {
        let state = self.state.read().await;
        state.tracks.iter().skip(offset).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.tracks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn playable_count(&self) -> usize {
        self.state
            .read()
            .await
            .tracks
            .iter()
            .filter(|t| t.has_preview())
            .count()
    }

    /// Enough playable tracks to start a session
    pub async fn is_startable(&self) -> bool {
        self.playable_count().await >= MIN_PLAYABLE_TRACKS
    }

    /// Discard every later write
    pub async fn close(&self) {
        self.state.write().await.closed = true;
    }

    pub async fn is_closed(&self) -> bool {
        self.state.read().await.closed
    }
}
