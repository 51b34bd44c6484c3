//! Track acquisition and preview enhancement
//!
//! The pipeline fills the [`TrackPool`] in stages:
//!
//! 1. `load_initial_batch` fetches a quarter of the target pool from the
//!    medium-term window and returns as soon as it arrives.
//! 2. `enhance_quickly` backfills previews for the first few tracks so a game
//!    can start without waiting for the rest.
//! 3. `load_background_batch` pulls short-term and long-term windows
//!    concurrently and merges them (first occurrence wins, capped).
//! 4. `enhance_remaining` backfills everything else in throttled batches.
//!
//! A failed request only means fewer tracks or fewer previews; nothing here
//! aborts the pipeline. Updates land by track id, and writes arriving after the
//! pool is closed are dropped.

use crate::difficulty::Difficulty;
use crate::pool::TrackPool;
use crate::services::preview_client::{PreviewLookup, PreviewQuery, MAX_BATCH_SIZE};
use futures::future::join_all;
use spinback_common::api::TrackCatalog;
use spinback_common::config::PreviewConfig;
use spinback_common::events::{EventBus, SpinbackEvent};
use spinback_common::{TimeRange, Track};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Tracks enhanced before the game becomes startable
pub const QUICK_ENHANCE_COUNT: usize = 3;

/// Hard cap on the pool size
pub const MAX_POOL_SIZE: usize = 25;

/// Pool size ceiling: enough for the longest session plus slack
pub fn pool_ceiling() -> usize {
    (Difficulty::max_turns_across_difficulties() as usize + 10).min(MAX_POOL_SIZE)
}

/// Size of the first medium-term request
pub fn initial_batch_size() -> usize {
    pool_ceiling().div_ceil(4)
}

/// Throttling for preview lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnhanceThrottle {
    pub batch_size: usize,
    pub batch_delay: Duration,
}

impl Default for EnhanceThrottle {
    fn default() -> Self {
        Self::from_config(&PreviewConfig::default())
    }
}

impl EnhanceThrottle {
    pub fn from_config(config: &PreviewConfig) -> Self {
        Self {
            batch_size: config.batch_size.clamp(1, MAX_BATCH_SIZE),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
        }
    }
}

/// Progressive pool loader
pub struct AcquisitionPipeline {
    catalog: Arc<dyn TrackCatalog>,
    previews: Arc<dyn PreviewLookup>,
    pool: TrackPool,
    events: EventBus,
    throttle: EnhanceThrottle,
}

impl AcquisitionPipeline {
    pub fn new(
        catalog: Arc<dyn TrackCatalog>,
        previews: Arc<dyn PreviewLookup>,
        pool: TrackPool,
        events: EventBus,
        throttle: EnhanceThrottle,
    ) -> Self {
        Self {
            catalog,
            previews,
            pool,
            events,
            throttle,
        }
    }

    pub fn pool(&self) -> &TrackPool {
        &self.pool
    }

    /// Warm the preview service, load the initial slice and enhance its head
    ///
    /// Returns the number of playable tracks afterwards.
    pub async fn prepare(&self) -> usize {
        if let Err(e) = self.previews.warm().await {
            tracing::warn!(error = %e, "Preview service warm-up failed");
        }

        let initial = self.load_initial_batch().await;
        self.enhance_quickly(&initial).await;

        let tracks = self.pool.len().await;
        let playable = self.pool.playable_count().await;
        tracing::info!(tracks, playable, "Initial pool ready");
        playable
    }

    /// Continue filling and enhancing the pool in the background
    pub fn spawn_background(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let needed = pool_ceiling().saturating_sub(self.pool.len().await);
            self.load_background_batch(needed).await;
            self.enhance_remaining().await;

            let tracks = self.pool.len().await;
            let playable = self.pool.playable_count().await;
            tracing::info!(tracks, playable, "Background acquisition finished");
        })
    }

    /// Fetch the medium-term slice and merge it into the pool
    pub async fn load_initial_batch(&self) -> Vec<Track> {
        let tracks = self
            .fetch_top_tracks(TimeRange::MediumTerm, initial_batch_size())
            .await;
        self.pool.merge(tracks.clone()).await;
        self.publish_pool().await;
        tracks
    }

    /// Backfill previews for the first [`QUICK_ENHANCE_COUNT`] tracks, concurrently
    pub async fn enhance_quickly(&self, tracks: &[Track]) {
        let head: Vec<&Track> = tracks
            .iter()
            .take(QUICK_ENHANCE_COUNT)
            .filter(|t| !t.has_preview())
            .collect();
        if head.is_empty() {
            return;
        }

        let applied = join_all(head.into_iter().map(|t| self.enhance_one(t)))
            .await
            .into_iter()
            .filter(|applied| *applied)
            .count();

        tracing::debug!(applied, "Quick enhancement done");
        self.publish_pool().await;
    }

    /// Fetch short-term and long-term slices concurrently and merge them
    ///
    /// Returns the number of tracks added to the pool.
    pub async fn load_background_batch(&self, additional_needed: usize) -> usize {
        if additional_needed == 0 {
            return 0;
        }
        let short_count = additional_needed.div_ceil(2);
        let long_count = additional_needed / 2;

        let (short, long) = tokio::join!(
            self.fetch_top_tracks(TimeRange::ShortTerm, short_count),
            self.fetch_top_tracks(TimeRange::LongTerm, long_count),
        );

        let added = self.pool.merge(short.into_iter().chain(long).collect()).await;
        tracing::debug!(added, "Background batch merged");
        self.publish_pool().await;
        added
    }

    /// Backfill every pool track past the quick head, in throttled batches
    pub async fn enhance_remaining(&self) {
        let pending: Vec<Track> = self
            .pool
            .tracks_from(QUICK_ENHANCE_COUNT)
            .await
            .into_iter()
            .filter(|t| !t.has_preview())
            .collect();

        for (i, batch) in pending.chunks(self.throttle.batch_size).enumerate() {
            if self.pool.is_closed().await {
                tracing::debug!("Pool closed, stopping enhancement");
                return;
            }
            if i > 0 {
                tokio::time::sleep(self.throttle.batch_delay).await;
            }

            self.enhance_batch(batch).await;
            self.publish_pool().await;
        }
    }

    async fn fetch_top_tracks(&self, range: TimeRange, count: usize) -> Vec<Track> {
        if count == 0 {
            return Vec::new();
        }
        match self.catalog.top_tracks(range, count as u32).await {
            Ok(tracks) => tracks,
            Err(e) => {
                tracing::warn!(range = %range, error = %e, "Top tracks request failed");
                Vec::new()
            }
        }
    }

    /// Look up a throttled chunk through the batch endpoint
    ///
    /// A failed batch falls back to per-track lookups so one bad track only
    /// loses its own preview.
    async fn enhance_batch(&self, batch: &[Track]) {
        let queries: Vec<PreviewQuery> = batch
            .iter()
            .map(|t| PreviewQuery::new(t.primary_artist_name(), &t.name))
            .collect();

        match self.previews.find_preview_urls(&queries).await {
            Ok(urls) => {
                for (track, url) in batch.iter().zip(urls) {
                    match url {
                        Some(url) => {
                            self.pool.apply_preview(&track.id, url).await;
                        }
                        None => tracing::debug!(track_id = %track.id, "No preview found"),
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    count = batch.len(),
                    error = %e,
                    "Batch preview lookup failed, retrying per track"
                );
                join_all(batch.iter().map(|t| self.enhance_one(t))).await;
            }
        }
    }

    /// Look up and apply one preview; true when the pool changed
    async fn enhance_one(&self, track: &Track) -> bool {
        let lookup = self
            .previews
            .find_preview_url(track.primary_artist_name(), &track.name)
            .await;

        match lookup {
            Ok(Some(url)) => self.pool.apply_preview(&track.id, url).await,
            Ok(None) => {
                tracing::debug!(track_id = %track.id, "No preview found");
                false
            }
            Err(e) => {
                tracing::warn!(track_id = %track.id, error = %e, "Preview lookup failed");
                false
            }
        }
    }

    async fn publish_pool(&self) {
        let total = self.pool.len().await;
        let playable = self.pool.playable_count().await;
        self.events.emit_lossy(SpinbackEvent::PoolUpdated {
            total,
            playable,
            timestamp: spinback_common::time::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_sizes() {
        assert_eq!(pool_ceiling(), 25);
        assert_eq!(initial_batch_size(), 7);
    }

    #[test]
    fn test_throttle_clamps_batch_size() {
        let config = PreviewConfig {
            batch_size: 50,
            batch_delay_ms: 10,
            ..Default::default()
        };
        let throttle = EnhanceThrottle::from_config(&config);
        assert_eq!(throttle.batch_size, MAX_BATCH_SIZE);
        assert_eq!(throttle.batch_delay, Duration::from_millis(10));

        let zero = PreviewConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert_eq!(EnhanceThrottle::from_config(&zero).batch_size, 1);
    }
}
