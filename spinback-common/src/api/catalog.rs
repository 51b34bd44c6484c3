//! Streaming catalog client
//!
//! [`TrackCatalog`] is the seam the game pipeline and the recommender depend on;
//! [`CatalogClient`] implements it over the catalog's REST API with the bearer
//! token held by a [`TokenStore`].

use crate::api::auth::TokenStore;
use crate::models::{
    ArtistDetails, AudioFeatures, Playlist, RecommendationRequest, TimeRange, Track, UserProfile,
};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const USER_AGENT: &str = concat!("spinback/", env!("CARGO_PKG_VERSION"));

/// Catalog caps ids-per-request for audio features and playlist additions
const MAX_IDS_PER_REQUEST: usize = 100;

/// Catalog caps top-tracks page size
const MAX_TOP_TRACKS: u32 = 50;

/// Track catalog collaborator
#[async_trait]
pub trait TrackCatalog: Send + Sync {
    /// User's top tracks for a listening window
    async fn top_tracks(&self, range: TimeRange, limit: u32) -> Result<Vec<Track>>;

    /// Artist record including genre tags
    async fn artist(&self, id: &str) -> Result<ArtistDetails>;

    /// Tracks recommended from seed tracks and optional descriptor targets
    async fn recommendations(&self, request: &RecommendationRequest) -> Result<Vec<Track>>;

    /// Descriptor vectors keyed by track id; tracks without analysis are absent
    async fn audio_features(&self, ids: &[String]) -> Result<HashMap<String, AudioFeatures>>;

    /// Profile of the token's owner
    async fn current_user(&self) -> Result<UserProfile>;

    /// Create an empty private playlist
    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
    ) -> Result<Playlist>;

    /// Append tracks (catalog URIs) to a playlist
    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<()>;
}

#[derive(Deserialize)]
struct TopTracksResponse {
    #[serde(default)]
    items: Vec<Track>,
}

#[derive(Deserialize)]
struct RecommendationsResponse {
    #[serde(default)]
    tracks: Vec<Track>,
}

#[derive(Deserialize)]
struct AudioFeaturesResponse {
    #[serde(default)]
    audio_features: Vec<Option<AudioFeaturesRow>>,
}

#[derive(Deserialize)]
struct AudioFeaturesRow {
    id: String,
    energy: f64,
    valence: f64,
    danceability: f64,
    #[serde(default)]
    acousticness: f64,
}

/// REST client for the streaming catalog
#[derive(Clone)]
pub struct CatalogClient {
    http_client: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenStore>,
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>, tokens: Arc<TokenStore>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let token = self.tokens.bearer()?;
        let url = self.url(path);
        tracing::debug!(url = %url, "Catalog GET");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        self.decode(path, response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let token = self.tokens.bearer()?;
        let url = self.url(path);
        tracing::debug!(url = %url, "Catalog POST");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        self.decode(path, response).await
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        path: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.tokens.expire();
            return Err(Error::Auth("catalog rejected access token".to_string()));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(path.to_string()));
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| Error::Parse(format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl TrackCatalog for CatalogClient {
    async fn top_tracks(&self, range: TimeRange, limit: u32) -> Result<Vec<Track>> {
        let limit = limit.clamp(1, MAX_TOP_TRACKS);
        let response: TopTracksResponse = self
            .get_json(
                "me/top/tracks",
                &[
                    ("time_range", range.as_str().to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        tracing::debug!(range = %range, count = response.items.len(), "Top tracks fetched");
        Ok(response.items)
    }

    async fn artist(&self, id: &str) -> Result<ArtistDetails> {
        self.get_json(&format!("artists/{}", id), &[]).await
    }

    async fn recommendations(&self, request: &RecommendationRequest) -> Result<Vec<Track>> {
        if request.seed_tracks.is_empty() {
            return Err(Error::InvalidInput("at least one seed track required".to_string()));
        }

        let mut query = vec![
            ("seed_tracks", request.seed_tracks.join(",")),
            ("limit", request.limit.to_string()),
        ];
        if let Some(energy) = request.target_energy {
            query.push(("target_energy", energy.to_string()));
        }
        if let Some(valence) = request.target_valence {
            query.push(("target_valence", valence.to_string()));
        }
        if let Some(danceability) = request.target_danceability {
            query.push(("target_danceability", danceability.to_string()));
        }

        let response: RecommendationsResponse = self.get_json("recommendations", &query).await?;
        Ok(response.tracks)
    }

    async fn audio_features(&self, ids: &[String]) -> Result<HashMap<String, AudioFeatures>> {
        let mut features = HashMap::new();

        for chunk in ids.chunks(MAX_IDS_PER_REQUEST) {
            let response: AudioFeaturesResponse = self
                .get_json("audio-features", &[("ids", chunk.join(","))])
                .await?;

            for row in response.audio_features.into_iter().flatten() {
                features.insert(
                    row.id,
                    AudioFeatures {
                        energy: row.energy,
                        valence: row.valence,
                        danceability: row.danceability,
                        acousticness: row.acousticness,
                    },
                );
            }
        }

        Ok(features)
    }

    async fn current_user(&self) -> Result<UserProfile> {
        self.get_json("me", &[]).await
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
    ) -> Result<Playlist> {
        self.post_json(
            &format!("users/{}/playlists", user_id),
            json!({
                "name": name,
                "description": description,
                "public": false,
            }),
        )
        .await
    }

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<()> {
        for chunk in uris.chunks(MAX_IDS_PER_REQUEST) {
            let _: serde_json::Value = self
                .post_json(
                    &format!("playlists/{}/tracks", playlist_id),
                    json!({ "uris": chunk }),
                )
                .await?;
        }
        Ok(())
    }
}
