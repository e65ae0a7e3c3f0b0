use chrono::{DateTime, Duration, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::metrics_sync::provider;
use crate::shared::error::ApiError;
use crate::videos::models::Video;
use crate::videos::registry::VideoRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Scheduled,
    DraftSubmitted,
    RevisionNeeded,
    Approved,
    Completed,
    Missed,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::DraftSubmitted => "draft_submitted",
            Self::RevisionNeeded => "revision_needed",
            Self::Approved => "approved",
            Self::Completed => "completed",
            Self::Missed => "missed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Missed)
    }
}

/// Events that drive a slot. Deadline expiry is time-driven (lazy read
/// evaluation or the periodic sweep), never user-triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotEvent {
    SubmitDraft,
    RequestRevision,
    ApproveDraft,
    ConfirmPublished,
    DeadlineElapsed,
}

/// The workflow's single source of truth: (state, event) → next state.
/// Everything not listed is an invalid transition.
pub fn next_status(current: SlotStatus, event: SlotEvent) -> Result<SlotStatus, ApiError> {
    use SlotEvent::*;
    use SlotStatus::*;
    match (current, event) {
        (Scheduled, SubmitDraft) | (RevisionNeeded, SubmitDraft) => Ok(DraftSubmitted),
        (DraftSubmitted, RequestRevision) => Ok(RevisionNeeded),
        (DraftSubmitted, ApproveDraft) => Ok(Approved),
        (Approved, ConfirmPublished) => Ok(Completed),
        (Scheduled, DeadlineElapsed) | (RevisionNeeded, DeadlineElapsed) => Ok(Missed),
        (state, _) => Err(ApiError::Validation(format!(
            "slot in state {} does not accept this action",
            state.as_str()
        ))),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledPost {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub creator_id: Uuid,
    pub scheduled_date: DateTime<Utc>,
    pub status: SlotStatus,
    pub brief_id: Option<Uuid>,
    pub draft_url: Option<String>,
    pub revision_feedback: Option<String>,
    pub linked_video_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

/// Calendar-slot deliverables for creators. On completion a slot produces a
/// Video Registry entry; the slot layer already reviewed the content, so
/// that entry enters at approved.
#[derive(Clone)]
pub struct ScheduleBoard {
    slots: Arc<RwLock<HashMap<Uuid, ScheduledPost>>>,
    grace: Duration,
}

impl ScheduleBoard {
    pub fn new(grace_hours: i64) -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
            grace: Duration::hours(grace_hours),
        }
    }

    fn deadline_of(&self, slot: &ScheduledPost) -> DateTime<Utc> {
        slot.scheduled_date + self.grace
    }

    /// Lazy missed evaluation: a slot past its deadline with no submission
    /// in hand flips to Missed the moment anything looks at it.
    fn apply_deadline(&self, slot: &mut ScheduledPost, now: DateTime<Utc>) {
        if matches!(slot.status, SlotStatus::Scheduled | SlotStatus::RevisionNeeded)
            && now > self.deadline_of(slot)
        {
            slot.status = SlotStatus::Missed;
            slot.updated_at = now;
        }
    }

    pub async fn create_slot(
        &self,
        campaign_id: Uuid,
        creator_id: Uuid,
        scheduled_date: DateTime<Utc>,
        brief_id: Option<Uuid>,
    ) -> ScheduledPost {
        let slot = ScheduledPost {
            id: Uuid::new_v4(),
            campaign_id,
            creator_id,
            scheduled_date,
            status: SlotStatus::Scheduled,
            brief_id,
            draft_url: None,
            revision_feedback: None,
            linked_video_id: None,
            updated_at: Utc::now(),
        };
        self.slots.write().await.insert(slot.id, slot.clone());
        slot
    }

    pub async fn get(&self, slot_id: Uuid) -> Result<ScheduledPost, ApiError> {
        let now = Utc::now();
        let mut slots = self.slots.write().await;
        let slot = slots
            .get_mut(&slot_id)
            .ok_or_else(|| ApiError::NotFound(format!("scheduled post {slot_id}")))?;
        self.apply_deadline(slot, now);
        Ok(slot.clone())
    }

    /// Ordered upcoming-to-oldest schedule for one creator in one campaign,
    /// with deadline evaluation applied on the way out.
    pub async fn creator_schedule(&self, campaign_id: Uuid, creator_id: Uuid) -> Vec<ScheduledPost> {
        let now = Utc::now();
        let mut slots = self.slots.write().await;
        let mut result: Vec<ScheduledPost> = slots
            .values_mut()
            .filter(|s| s.campaign_id == campaign_id && s.creator_id == creator_id)
            .map(|s| {
                self.apply_deadline(s, now);
                s.clone()
            })
            .collect();
        result.sort_by_key(|s| s.scheduled_date);
        result
    }

    pub async fn submit_to_slot(&self, slot_id: Uuid, content_url: &str) -> Result<ScheduledPost, ApiError> {
        let content_url = content_url.trim();
        if content_url.is_empty() {
            return Err(ApiError::Validation("draft content url is required".to_string()));
        }
        let now = Utc::now();
        let mut slots = self.slots.write().await;
        let slot = slots
            .get_mut(&slot_id)
            .ok_or_else(|| ApiError::NotFound(format!("scheduled post {slot_id}")))?;
        self.apply_deadline(slot, now);
        slot.status = next_status(slot.status, SlotEvent::SubmitDraft)?;
        slot.draft_url = Some(content_url.to_string());
        slot.updated_at = now;
        Ok(slot.clone())
    }

    pub async fn request_revision(&self, slot_id: Uuid, feedback: &str) -> Result<ScheduledPost, ApiError> {
        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Err(ApiError::Validation("revision feedback is required".to_string()));
        }
        let mut slots = self.slots.write().await;
        let slot = slots
            .get_mut(&slot_id)
            .ok_or_else(|| ApiError::NotFound(format!("scheduled post {slot_id}")))?;
        slot.status = next_status(slot.status, SlotEvent::RequestRevision)?;
        slot.revision_feedback = Some(feedback.to_string());
        slot.updated_at = Utc::now();
        Ok(slot.clone())
    }

    pub async fn approve_slot(&self, slot_id: Uuid) -> Result<ScheduledPost, ApiError> {
        let mut slots = self.slots.write().await;
        let slot = slots
            .get_mut(&slot_id)
            .ok_or_else(|| ApiError::NotFound(format!("scheduled post {slot_id}")))?;
        slot.status = next_status(slot.status, SlotEvent::ApproveDraft)?;
        slot.updated_at = Utc::now();
        Ok(slot.clone())
    }

    /// Confirm the approved content went live. This is the point where the
    /// workflow produces its Video Registry entry and links it.
    pub async fn complete_slot(
        &self,
        slot_id: Uuid,
        published_url: &str,
        registry: &VideoRegistry,
    ) -> Result<(ScheduledPost, Video), ApiError> {
        let parsed = provider::parse_url(published_url).ok_or_else(|| {
            ApiError::Validation("published url is not a supported platform video".to_string())
        })?;

        let mut slots = self.slots.write().await;
        let slot = slots
            .get_mut(&slot_id)
            .ok_or_else(|| ApiError::NotFound(format!("scheduled post {slot_id}")))?;
        // Validate the transition before creating the video so an invalid
        // slot state leaves no orphaned registry entry.
        let next = next_status(slot.status, SlotEvent::ConfirmPublished)?;

        let video = registry
            .insert_approved(
                slot.campaign_id,
                slot.creator_id,
                published_url.trim().to_string(),
                parsed,
            )
            .await;

        slot.status = next;
        slot.linked_video_id = Some(video.id);
        slot.updated_at = Utc::now();
        info!("slot {} completed, linked video {}", slot_id, video.id);
        Ok((slot.clone(), video))
    }

    /// Periodic counterpart to the lazy read evaluation.
    pub async fn sweep_missed(&self) -> usize {
        let now = Utc::now();
        let mut slots = self.slots.write().await;
        let mut missed = 0;
        for slot in slots.values_mut() {
            let before = slot.status;
            self.apply_deadline(slot, now);
            if before != slot.status {
                info!("slot {} missed its deadline", slot.id);
                missed += 1;
            }
        }
        missed
    }

    pub async fn run_sweep(self, interval_secs: u64) {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.sweep_missed().await;
        }
    }
}
