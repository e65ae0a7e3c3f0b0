pub mod provider;

use log::{info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::shared::error::ApiError;
use crate::videos::models::MetricsSnapshot;
use crate::videos::registry::VideoRegistry;
use provider::{MetricsProvider, ProviderMetrics};

/// Outcome of one refresh attempt. Fetch failures are reported here and
/// absorbed into the video entity; they never surface as HTTP errors.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ProviderMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// True when this call found another refresh already in flight for the
    /// same video and collapsed into it without touching the entity.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub already_refreshing: bool,
}

impl RefreshOutcome {
    fn collapsed() -> Self {
        Self {
            success: false,
            metrics: None,
            error: None,
            already_refreshing: true,
        }
    }
}

/// Keeps metrics fresh for approved/tracking videos against an unreliable
/// provider. One engine instance serves both the HTTP handler and the
/// periodic sweep, so both call sites share the same in-flight guard.
#[derive(Clone)]
pub struct MetricsSyncEngine {
    registry: VideoRegistry,
    provider: Arc<dyn MetricsProvider>,
    // Lease table keyed by video id: at most one in-flight refresh per
    // video, regardless of which caller triggered it.
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
}

impl MetricsSyncEngine {
    pub fn new(registry: VideoRegistry, provider: Arc<dyn MetricsProvider>) -> Self {
        Self {
            registry,
            provider,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    async fn acquire(&self, video_id: Uuid) -> bool {
        self.in_flight.lock().await.insert(video_id)
    }

    async fn release(&self, video_id: Uuid) {
        self.in_flight.lock().await.remove(&video_id);
    }

    /// Fetch current counters for one video and commit them. The network
    /// call runs without holding any registry lock; a concurrent call for
    /// the same id collapses instead of racing the write.
    pub async fn refresh(&self, video_id: Uuid) -> Result<RefreshOutcome, ApiError> {
        if !self.acquire(video_id).await {
            return Ok(RefreshOutcome::collapsed());
        }
        let outcome = self.refresh_inner(video_id).await;
        self.release(video_id).await;
        outcome
    }

    async fn refresh_inner(&self, video_id: Uuid) -> Result<RefreshOutcome, ApiError> {
        let video = self.registry.get(video_id).await?;

        let fetched = self
            .provider
            .fetch_metrics(video.platform, &video.remote_video_id)
            .await;

        match fetched {
            Ok(metrics) => {
                let snapshot = MetricsSnapshot {
                    views: metrics.views,
                    likes: metrics.likes,
                    comments: metrics.comments,
                    shares: metrics.shares,
                };
                self.registry.commit_sync_success(video_id, snapshot).await?;
                Ok(RefreshOutcome {
                    success: true,
                    metrics: Some(metrics),
                    error: None,
                    already_refreshing: false,
                })
            }
            Err(e) => {
                let message = e.to_string();
                warn!("metrics fetch failed for video {}: {}", video_id, message);
                // The video may have been deleted while the fetch was in
                // flight; there is nothing left to record in that case.
                if let Err(ApiError::NotFound(_)) =
                    self.registry.commit_sync_failure(video_id, &message).await
                {
                    return Err(ApiError::NotFound(format!("video {video_id}")));
                }
                Ok(RefreshOutcome {
                    success: false,
                    metrics: None,
                    error: Some(message),
                    already_refreshing: false,
                })
            }
        }
    }

    /// One pass of the background sweep: refresh every approved/tracking
    /// video, continuing past per-video failures.
    pub async fn sweep_once(&self) -> usize {
        let targets = self.registry.sync_targets().await;
        let total = targets.len();
        let mut refreshed = 0;
        for video_id in targets {
            match self.refresh(video_id).await {
                Ok(outcome) if outcome.success => refreshed += 1,
                Ok(_) => {}
                Err(e) => warn!("sweep skipped video {}: {}", video_id, e),
            }
        }
        if total > 0 {
            info!("metrics sweep refreshed {}/{} videos", refreshed, total);
        }
        refreshed
    }

    /// Periodic sweep loop; spawned once at startup.
    pub async fn run_sweep(self, interval_secs: u64) {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.sweep_once().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use provider::{ProviderError, ProviderMetrics};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::metrics_sync::provider::ParsedVideoUrl;
    use crate::videos::models::{CreatorAssignment, Platform, SyncState, VideoStatus};

    struct StubProvider {
        views: u64,
        fail: bool,
        delay_ms: u64,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn ok(views: u64) -> Self {
            Self { views, fail: false, delay_ms: 0, calls: AtomicUsize::new(0) }
        }

        fn failing() -> Self {
            Self { views: 0, fail: true, delay_ms: 0, calls: AtomicUsize::new(0) }
        }

        fn slow(views: u64, delay_ms: u64) -> Self {
            Self { views, fail: false, delay_ms, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl MetricsProvider for StubProvider {
        async fn fetch_metrics(
            &self,
            _platform: Platform,
            _remote_video_id: &str,
        ) -> Result<ProviderMetrics, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.fail {
                return Err(ProviderError::Timeout);
            }
            Ok(ProviderMetrics {
                views: self.views,
                likes: 5,
                comments: 2,
                shares: 1,
                thumbnail_url: None,
                description: None,
                creator_handle: None,
            })
        }
    }

    async fn approved_video(registry: &VideoRegistry) -> Uuid {
        let video = registry
            .submit(
                Uuid::new_v4(),
                CreatorAssignment::Unassigned,
                "https://instagram.com/reel/abc".to_string(),
                ParsedVideoUrl {
                    platform: Platform::Instagram,
                    remote_video_id: "abc".to_string(),
                },
            )
            .await;
        registry.approve(video.id).await.unwrap();
        video.id
    }

    #[tokio::test]
    async fn test_refresh_success_commits_and_tracks() {
        let registry = VideoRegistry::new();
        let id = approved_video(&registry).await;
        let engine = MetricsSyncEngine::new(registry.clone(), Arc::new(StubProvider::ok(1200)));

        let outcome = engine.refresh(id).await.unwrap();
        assert!(outcome.success);

        let video = registry.get(id).await.unwrap();
        assert_eq!(video.status, VideoStatus::Tracking);
        assert_eq!(video.sync_state, SyncState::Synced);
        assert_eq!(video.metrics.unwrap().views, 1200);
        assert!(video.last_fetch_error.is_none());
    }

    #[tokio::test]
    async fn test_refresh_failure_is_absorbed() {
        let registry = VideoRegistry::new();
        let id = approved_video(&registry).await;
        let engine = MetricsSyncEngine::new(registry.clone(), Arc::new(StubProvider::failing()));

        let outcome = engine.refresh(id).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("request timed out"));

        let video = registry.get(id).await.unwrap();
        // First refresh resolved (as a failure), so the video is no longer
        // awaiting its first sync, and it never reached tracking.
        assert_eq!(video.sync_state, SyncState::FetchFailed);
        assert_eq!(video.status, VideoStatus::Approved);
        assert!(video.metrics.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_refresh_collapses() {
        let registry = VideoRegistry::new();
        let id = approved_video(&registry).await;
        let provider = Arc::new(StubProvider::slow(900, 100));
        let engine = MetricsSyncEngine::new(registry.clone(), provider.clone());

        let first = tokio::spawn({
            let engine = engine.clone();
            async move { engine.refresh(id).await.unwrap() }
        });
        // Give the first call time to take the lease and start fetching.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = engine.refresh(id).await.unwrap();
        assert!(second.already_refreshing);
        assert!(!second.success);

        let first = first.await.unwrap();
        assert!(first.success);
        // Exactly one fetch hit the provider: one effective write, no
        // interleaved mix of two responses.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        let video = registry.get(id).await.unwrap();
        assert_eq!(video.metrics.unwrap().views, 900);
    }

    #[tokio::test]
    async fn test_refresh_releases_lease_after_failure() {
        let registry = VideoRegistry::new();
        let id = approved_video(&registry).await;
        let engine = MetricsSyncEngine::new(registry.clone(), Arc::new(StubProvider::failing()));

        engine.refresh(id).await.unwrap();
        // Lease must be free again: a manual retry is just another refresh.
        let retry = engine.refresh(id).await.unwrap();
        assert!(!retry.already_refreshing);
    }

    #[tokio::test]
    async fn test_refresh_unknown_video() {
        let registry = VideoRegistry::new();
        let engine = MetricsSyncEngine::new(registry, Arc::new(StubProvider::ok(1)));
        let err = engine.refresh(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_sweep_covers_ledger_states_only() {
        let registry = VideoRegistry::new();
        let approved = approved_video(&registry).await;
        // A pending video stays out of the sweep.
        registry
            .submit(
                Uuid::new_v4(),
                CreatorAssignment::Unassigned,
                "https://instagram.com/reel/xyz".to_string(),
                ParsedVideoUrl {
                    platform: Platform::Instagram,
                    remote_video_id: "xyz".to_string(),
                },
            )
            .await;
        let provider = Arc::new(StubProvider::ok(10));
        let engine = MetricsSyncEngine::new(registry.clone(), provider.clone());

        let refreshed = engine.sweep_once().await;
        assert_eq!(refreshed, 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            registry.get(approved).await.unwrap().status,
            VideoStatus::Tracking
        );
    }
}
