use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Tiktok,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Tiktok => "tiktok",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle of a submitted video. `Tracking` is the steady state of an
/// approved video once at least one metrics sync has succeeded; it shares
/// all ledger semantics with `Approved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    Pending,
    Approved,
    Tracking,
    Rejected,
}

impl VideoStatus {
    /// Approved and Tracking count identically toward the budget ledger.
    pub fn counts_toward_ledger(&self) -> bool {
        matches!(self, Self::Approved | Self::Tracking)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Tracking)
    }
}

/// Where the video stands with the external metrics provider.
/// `AwaitingFirstSync` is set at approval time and is distinct from a prior
/// failure: it means no refresh attempt has resolved yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    NeverSynced,
    AwaitingFirstSync,
    Synced,
    FetchFailed,
}

/// Creator assignment is a tagged sum rather than a nullable id so every
/// consumer handles the unassigned case explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "creator_id", rename_all = "snake_case")]
pub enum CreatorAssignment {
    Unassigned,
    Assigned(Uuid),
}

impl CreatorAssignment {
    pub fn creator_id(&self) -> Option<Uuid> {
        match self {
            Self::Assigned(id) => Some(*id),
            Self::Unassigned => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
}

impl MetricsSnapshot {
    /// (likes + comments + shares) / views × 100. Undefined when there are
    /// no views. No upper clamp: viral share/comment volume can legitimately
    /// push this past 100 and the raw value is preserved; clamping is a
    /// presentation concern.
    pub fn engagement_rate(&self) -> Option<f64> {
        if self.views == 0 {
            return None;
        }
        let interactions = (self.likes + self.comments + self.shares) as f64;
        Some(interactions / self.views as f64 * 100.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub creator: CreatorAssignment,
    pub platform: Platform,
    pub source_url: String,
    pub remote_video_id: String,
    pub status: VideoStatus,
    pub rejection_feedback: Option<String>,
    pub metrics: Option<MetricsSnapshot>,
    pub sync_state: SyncState,
    pub last_fetch_at: Option<DateTime<Utc>>,
    pub last_fetch_error: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl Video {
    pub fn engagement_rate(&self) -> Option<f64> {
        self.metrics.as_ref().and_then(MetricsSnapshot::engagement_rate)
    }
}
