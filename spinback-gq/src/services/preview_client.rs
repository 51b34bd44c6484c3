//! Preview-search client
//!
//! Backfills audio-preview URLs the catalog left empty. The search service is
//! a small HTTP proxy:
//!
//! - `GET  {base}/preview?artist=..&title=..` → `{"previewUrl": "..." | null}`
//! - `POST {base}/previews` with `{"tracks": [{"artist", "title"}]}` →
//!   `{"results": [{"previewUrl": ...}]}` in request order
//! - `GET  {base}/ping` keeps the service warm

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const USER_AGENT: &str = concat!("spinback/", env!("CARGO_PKG_VERSION"));
const RATE_LIMIT_MS: u64 = 100;

/// Largest batch the search service accepts
pub const MAX_BATCH_SIZE: usize = 10;

/// Preview lookup errors
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Batch of {0} exceeds the limit of 10")]
    BatchTooLarge(usize),
}

/// Artist/title pair to look up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewQuery {
    pub artist: String,
    pub title: String,
}

impl PreviewQuery {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
        }
    }
}

/// Preview lookup collaborator
#[async_trait]
pub trait PreviewLookup: Send + Sync {
    /// Preview URL for one track, `None` when the service has none
    async fn find_preview_url(&self, artist: &str, title: &str)
        -> Result<Option<String>, PreviewError>;

    /// Up to [`MAX_BATCH_SIZE`] lookups; results keep request order
    async fn find_preview_urls(
        &self,
        queries: &[PreviewQuery],
    ) -> Result<Vec<Option<String>>, PreviewError> {
        if queries.len() > MAX_BATCH_SIZE {
            return Err(PreviewError::BatchTooLarge(queries.len()));
        }
        let mut results = Vec::with_capacity(queries.len());
        for q in queries {
            results.push(self.find_preview_url(&q.artist, &q.title).await?);
        }
        Ok(results)
    }

    /// Keep-warm ping
    async fn warm(&self) -> Result<(), PreviewError> {
        Ok(())
    }
}

/// Lookup used when no search service is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPreviewLookup;

#[async_trait]
impl PreviewLookup for NoPreviewLookup {
    async fn find_preview_url(&self, _: &str, _: &str) -> Result<Option<String>, PreviewError> {
        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreviewResponse {
    #[serde(default)]
    preview_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    results: Vec<PreviewResponse>,
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    tracks: &'a [PreviewQuery],
}

/// Minimum spacing between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Preview rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// HTTP client for the preview-search service
pub struct PreviewSearchClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
}

impl PreviewSearchClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, PreviewError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| PreviewError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, PreviewError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PreviewError::ApiError(status.as_u16(), error_text));
        }
        Ok(response)
    }
}

#[async_trait]
impl PreviewLookup for PreviewSearchClient {
    async fn find_preview_url(
        &self,
        artist: &str,
        title: &str,
    ) -> Result<Option<String>, PreviewError> {
        self.rate_limiter.wait().await;
        tracing::debug!(artist, title, "Preview lookup");

        let response = self
            .http_client
            .get(self.url("preview"))
            .query(&[("artist", artist), ("title", title)])
            .send()
            .await
            .map_err(|e| PreviewError::NetworkError(e.to_string()))?;

        let body: PreviewResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| PreviewError::ParseError(e.to_string()))?;

        Ok(body.preview_url.filter(|url| !url.is_empty()))
    }

    async fn find_preview_urls(
        &self,
        queries: &[PreviewQuery],
    ) -> Result<Vec<Option<String>>, PreviewError> {
        if queries.len() > MAX_BATCH_SIZE {
            return Err(PreviewError::BatchTooLarge(queries.len()));
        }
        if queries.is_empty() {
            return Ok(Vec::new());
        }

        self.rate_limiter.wait().await;
        let response = self
            .http_client
            .post(self.url("previews"))
            .json(&BatchRequest { tracks: queries })
            .send()
            .await
            .map_err(|e| PreviewError::NetworkError(e.to_string()))?;

        let body: BatchResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| PreviewError::ParseError(e.to_string()))?;

        let mut results: Vec<Option<String>> = body
            .results
            .into_iter()
            .map(|r| r.preview_url.filter(|url| !url.is_empty()))
            .collect();
        // Short replies leave the tail unresolved
        results.resize(queries.len(), None);
        Ok(results)
    }

    async fn warm(&self) -> Result<(), PreviewError> {
        let response = self
            .http_client
            .get(self.url("ping"))
            .send()
            .await
            .map_err(|e| PreviewError::NetworkError(e.to_string()))?;
        Self::check(response).await?;
        tracing::debug!("Preview service warmed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new(100);
        assert_eq!(limiter.min_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_client_trims_base_url() {
        let client = PreviewSearchClient::new("http://localhost:8888/api/").unwrap();
        assert_eq!(client.url("ping"), "http://localhost:8888/api/ping");
    }

    #[test]
    fn test_response_parsing() {
        let one: PreviewResponse = serde_json::from_str(r#"{"previewUrl":"http://p/1"}"#).unwrap();
        assert_eq!(one.preview_url.as_deref(), Some("http://p/1"));

        let none: PreviewResponse = serde_json::from_str(r#"{"previewUrl":null}"#).unwrap();
        assert!(none.preview_url.is_none());

        let batch: BatchResponse =
            serde_json::from_str(r#"{"results":[{"previewUrl":"a"},{}]}"#).unwrap();
        assert_eq!(batch.results.len(), 2);
        assert!(batch.results[1].preview_url.is_none());
    }

    #[tokio::test]
    async fn test_batch_limit_enforced() {
        let client = PreviewSearchClient::new("http://127.0.0.1:9").unwrap();
        let queries = vec![PreviewQuery::new("a", "b"); 11];
        let result = client.find_preview_urls(&queries).await;
        assert!(matches!(result, Err(PreviewError::BatchTooLarge(11))));
    }

    #[tokio::test]
    async fn test_default_batch_preserves_order() {
        struct Echo;

        #[async_trait]
        impl PreviewLookup for Echo {
            async fn find_preview_url(
                &self,
                artist: &str,
                title: &str,
            ) -> Result<Option<String>, PreviewError> {
                Ok((artist != "none").then(|| format!("{}-{}", artist, title)))
            }
        }

        let queries = vec![
            PreviewQuery::new("x", "1"),
            PreviewQuery::new("none", "2"),
            PreviewQuery::new("y", "3"),
        ];
        let results = Echo.find_preview_urls(&queries).await.unwrap();
        assert_eq!(
            results,
            vec![Some("x-1".to_string()), None, Some("y-3".to_string())]
        );
    }

    #[tokio::test]
    async fn test_no_preview_lookup() {
        assert_eq!(NoPreviewLookup.find_preview_url("a", "b").await.unwrap(), None);
        assert!(NoPreviewLookup.warm().await.is_ok());
    }
}
