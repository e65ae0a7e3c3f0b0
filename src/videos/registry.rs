use chrono::Utc;
use log::info;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::metrics_sync::provider::ParsedVideoUrl;
use crate::shared::error::ApiError;
use crate::videos::models::{
    CreatorAssignment, MetricsSnapshot, SyncState, Video, VideoStatus,
};

/// Canonical store of video entities plus the approval state machine.
///
/// Each entry is the unit of mutation: every transition re-validates the
/// current status under the write lock, so a decision raced by another
/// reviewer surfaces as a Conflict instead of silently overwriting.
#[derive(Clone, Default)]
pub struct VideoRegistry {
    videos: Arc<RwLock<HashMap<Uuid, Video>>>,
}

impl VideoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn submit(
        &self,
        campaign_id: Uuid,
        creator: CreatorAssignment,
        source_url: String,
        parsed: ParsedVideoUrl,
    ) -> Video {
        let video = Video {
            id: Uuid::new_v4(),
            campaign_id,
            creator,
            platform: parsed.platform,
            source_url,
            remote_video_id: parsed.remote_video_id,
            status: VideoStatus::Pending,
            rejection_feedback: None,
            metrics: None,
            sync_state: SyncState::NeverSynced,
            last_fetch_at: None,
            last_fetch_error: None,
            added_at: Utc::now(),
        };
        let mut videos = self.videos.write().await;
        videos.insert(video.id, video.clone());
        info!(
            "video {} submitted for campaign {} ({})",
            video.id, campaign_id, video.platform
        );
        video
    }

    /// Insert a video produced by the scheduled-content workflow. Slot review
    /// already happened, so the entry enters at Approved and waits for its
    /// first sync.
    pub async fn insert_approved(
        &self,
        campaign_id: Uuid,
        creator_id: Uuid,
        source_url: String,
        parsed: ParsedVideoUrl,
    ) -> Video {
        let video = Video {
            id: Uuid::new_v4(),
            campaign_id,
            creator: CreatorAssignment::Assigned(creator_id),
            platform: parsed.platform,
            source_url,
            remote_video_id: parsed.remote_video_id,
            status: VideoStatus::Approved,
            rejection_feedback: None,
            metrics: None,
            sync_state: SyncState::AwaitingFirstSync,
            last_fetch_at: None,
            last_fetch_error: None,
            added_at: Utc::now(),
        };
        let mut videos = self.videos.write().await;
        videos.insert(video.id, video.clone());
        info!(
            "video {} entered approved from schedule slot (campaign {})",
            video.id, campaign_id
        );
        video
    }

    pub async fn get(&self, video_id: Uuid) -> Result<Video, ApiError> {
        let videos = self.videos.read().await;
        videos
            .get(&video_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("video {video_id}")))
    }

    /// Consistent snapshot of one campaign's videos, taken in a single
    /// read-lock pass so a concurrent transition cannot be half-observed.
    pub async fn campaign_snapshot(&self, campaign_id: Uuid) -> Vec<Video> {
        let videos = self.videos.read().await;
        let mut entries: Vec<Video> = videos
            .values()
            .filter(|v| v.campaign_id == campaign_id)
            .cloned()
            .collect();
        entries.sort_by_key(|v| v.added_at);
        entries
    }

    /// Ids the background sweep should refresh: everything approved or
    /// tracking, across all campaigns.
    pub async fn sync_targets(&self) -> Vec<Uuid> {
        let videos = self.videos.read().await;
        videos
            .values()
            .filter(|v| v.status.counts_toward_ledger())
            .map(|v| v.id)
            .collect()
    }

    /// Pending → Approved. Idempotent when the video is already approved or
    /// tracking. Approval never waits on metrics availability.
    pub async fn approve(&self, video_id: Uuid) -> Result<(), ApiError> {
        let mut videos = self.videos.write().await;
        let video = videos
            .get_mut(&video_id)
            .ok_or_else(|| ApiError::NotFound(format!("video {video_id}")))?;
        match video.status {
            VideoStatus::Pending => {
                video.status = VideoStatus::Approved;
                if video.sync_state == SyncState::NeverSynced {
                    video.sync_state = SyncState::AwaitingFirstSync;
                }
                info!("video {} approved", video_id);
                Ok(())
            }
            VideoStatus::Approved | VideoStatus::Tracking => Ok(()),
            VideoStatus::Rejected => Err(ApiError::Conflict(
                "video was already rejected; re-read before retrying".to_string(),
            )),
        }
    }

    /// Pending → Rejected, with mandatory feedback for the creator.
    pub async fn reject(&self, video_id: Uuid, feedback: &str) -> Result<(), ApiError> {
        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Err(ApiError::Validation(
                "rejection feedback is required".to_string(),
            ));
        }
        let mut videos = self.videos.write().await;
        let video = videos
            .get_mut(&video_id)
            .ok_or_else(|| ApiError::NotFound(format!("video {video_id}")))?;
        match video.status {
            VideoStatus::Pending => {
                video.status = VideoStatus::Rejected;
                video.rejection_feedback = Some(feedback.to_string());
                info!("video {} rejected", video_id);
                Ok(())
            }
            _ => Err(ApiError::Conflict(
                "only pending videos can be rejected; re-read before retrying".to_string(),
            )),
        }
    }

    /// Remove an entry in any state. Deleting an id that no longer exists is
    /// a no-op: the ledger reads current registry state, so the contribution
    /// is retracted exactly once either way.
    pub async fn delete(&self, video_id: Uuid) -> bool {
        let mut videos = self.videos.write().await;
        let existed = videos.remove(&video_id).is_some();
        if existed {
            info!("video {} deleted", video_id);
        }
        existed
    }

    /// Creator assignment may change at any non-terminal point; the next
    /// ledger read picks up the new deal-terms lookup.
    pub async fn assign_creator(&self, video_id: Uuid, creator_id: Uuid) -> Result<(), ApiError> {
        let mut videos = self.videos.write().await;
        let video = videos
            .get_mut(&video_id)
            .ok_or_else(|| ApiError::NotFound(format!("video {video_id}")))?;
        if video.status == VideoStatus::Rejected {
            return Err(ApiError::Validation(
                "cannot assign a creator to a rejected video".to_string(),
            ));
        }
        video.creator = CreatorAssignment::Assigned(creator_id);
        Ok(())
    }

    /// Commit a successful metrics fetch. Overwrites the snapshot, clears
    /// the last error, and performs the one automatic status transition in
    /// the machine: Approved → Tracking on first success.
    pub async fn commit_sync_success(
        &self,
        video_id: Uuid,
        snapshot: MetricsSnapshot,
    ) -> Result<Video, ApiError> {
        let mut videos = self.videos.write().await;
        let video = videos
            .get_mut(&video_id)
            .ok_or_else(|| ApiError::NotFound(format!("video {video_id}")))?;
        video.metrics = Some(snapshot);
        video.sync_state = SyncState::Synced;
        video.last_fetch_error = None;
        video.last_fetch_at = Some(Utc::now());
        if video.status == VideoStatus::Approved {
            video.status = VideoStatus::Tracking;
            info!("video {} is now tracking", video_id);
        }
        Ok(video.clone())
    }

    /// Record a failed fetch. The previous snapshot is sticky: only the sync
    /// bookkeeping fields change.
    pub async fn commit_sync_failure(&self, video_id: Uuid, error: &str) -> Result<(), ApiError> {
        let mut videos = self.videos.write().await;
        let video = videos
            .get_mut(&video_id)
            .ok_or_else(|| ApiError::NotFound(format!("video {video_id}")))?;
        video.sync_state = SyncState::FetchFailed;
        video.last_fetch_error = Some(error.to_string());
        video.last_fetch_at = Some(Utc::now());
        Ok(())
    }
}
