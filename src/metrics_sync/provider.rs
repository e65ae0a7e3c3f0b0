use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::videos::models::Platform;

static INSTAGRAM_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(?:www\.)?instagram\.com/(?:reel|reels|p)/([A-Za-z0-9_-]+)")
        .expect("instagram url pattern")
});

static TIKTOK_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(?:www\.)?tiktok\.com/@[\w.-]+/video/(\d+)")
        .expect("tiktok url pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedVideoUrl {
    pub platform: Platform,
    pub remote_video_id: String,
}

/// Recognize a creator-post URL on a supported platform. Returns None for
/// anything else (profile links, shortened links, other hosts).
pub fn parse_url(url: &str) -> Option<ParsedVideoUrl> {
    let url = url.trim();
    if let Some(caps) = INSTAGRAM_URL.captures(url) {
        return Some(ParsedVideoUrl {
            platform: Platform::Instagram,
            remote_video_id: caps[1].to_string(),
        });
    }
    if let Some(caps) = TIKTOK_URL.captures(url) {
        return Some(ParsedVideoUrl {
            platform: Platform::Tiktok,
            remote_video_id: caps[1].to_string(),
        });
    }
    None
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request timed out")]
    Timeout,
    #[error("rate limited by provider")]
    RateLimited,
    #[error("remote video not found")]
    RemoteNotFound,
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("unexpected provider response: {0}")]
    BadResponse(String),
}

/// Raw counters and optional enrichment returned by the provider for one
/// remote video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetrics {
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_handle: Option<String>,
}

#[async_trait]
pub trait MetricsProvider: Send + Sync {
    async fn fetch_metrics(
        &self,
        platform: Platform,
        remote_video_id: &str,
    ) -> Result<ProviderMetrics, ProviderError>;
}

/// reqwest-backed provider client. Expects a JSON endpoint shaped
/// `GET {base}/{platform}/{remote_id}` returning the counter payload.
pub struct HttpMetricsProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpMetricsProvider {
    pub fn new(base_url: String, api_key: Option<String>, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("creatorserver/0.4")
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl MetricsProvider for HttpMetricsProvider {
    async fn fetch_metrics(
        &self,
        platform: Platform,
        remote_video_id: &str,
    ) -> Result<ProviderMetrics, ProviderError> {
        let url = format!("{}/{}/{}", self.base_url, platform, remote_video_id);
        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::Request(e.to_string())
            }
        })?;

        match response.status() {
            s if s.is_success() => response
                .json::<ProviderMetrics>()
                .await
                .map_err(|e| ProviderError::BadResponse(e.to_string())),
            reqwest::StatusCode::NOT_FOUND => Err(ProviderError::RemoteNotFound),
            reqwest::StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::RateLimited),
            s => Err(ProviderError::Request(format!("status {s}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_instagram_reel() {
        let parsed = parse_url("https://www.instagram.com/reel/Cx1YzAbCdEf/").unwrap();
        assert_eq!(parsed.platform, Platform::Instagram);
        assert_eq!(parsed.remote_video_id, "Cx1YzAbCdEf");
    }

    #[test]
    fn test_parse_instagram_post() {
        let parsed = parse_url("http://instagram.com/p/Bq2XyZ_123").unwrap();
        assert_eq!(parsed.platform, Platform::Instagram);
        assert_eq!(parsed.remote_video_id, "Bq2XyZ_123");
    }

    #[test]
    fn test_parse_tiktok_video() {
        let parsed =
            parse_url("https://www.tiktok.com/@some.creator/video/7312345678901234567").unwrap();
        assert_eq!(parsed.platform, Platform::Tiktok);
        assert_eq!(parsed.remote_video_id, "7312345678901234567");
    }

    #[test]
    fn test_parse_rejects_unsupported() {
        assert!(parse_url("https://youtube.com/watch?v=abc123").is_none());
        assert!(parse_url("https://www.instagram.com/some_profile/").is_none());
        assert!(parse_url("https://tiktok.com/@creator").is_none());
        assert!(parse_url("not a url").is_none());
    }

    #[tokio::test]
    async fn test_fetch_metrics_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/instagram/Cx1YzAbCdEf")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"views":1000,"likes":50,"comments":20,"shares":10,"creator_handle":"@maria"}"#)
            .create_async()
            .await;

        let provider = HttpMetricsProvider::new(server.url(), None, 5).unwrap();
        let metrics = provider
            .fetch_metrics(Platform::Instagram, "Cx1YzAbCdEf")
            .await
            .unwrap();
        assert_eq!(metrics.views, 1000);
        assert_eq!(metrics.shares, 10);
        assert_eq!(metrics.creator_handle.as_deref(), Some("@maria"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_metrics_remote_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/tiktok/999")
            .with_status(404)
            .create_async()
            .await;

        let provider = HttpMetricsProvider::new(server.url(), None, 5).unwrap();
        let err = provider.fetch_metrics(Platform::Tiktok, "999").await.unwrap_err();
        assert!(matches!(err, ProviderError::RemoteNotFound));
    }

    #[tokio::test]
    async fn test_fetch_metrics_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/instagram/abc")
            .with_status(429)
            .create_async()
            .await;

        let provider = HttpMetricsProvider::new(server.url(), None, 5).unwrap();
        let err = provider
            .fetch_metrics(Platform::Instagram, "abc")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited));
    }
}
