pub mod workflow;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::error::ApiError;
use crate::shared::state::AppState;
use workflow::ScheduledPost;

#[derive(Debug, Deserialize)]
pub struct CreateSlotRequest {
    pub campaign_id: Uuid,
    pub creator_id: Uuid,
    pub scheduled_date: DateTime<Utc>,
    pub brief_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitDraftRequest {
    pub content_url: String,
}

#[derive(Debug, Deserialize)]
pub struct RevisionRequest {
    pub feedback: String,
}

#[derive(Debug, Deserialize)]
pub struct CompleteSlotRequest {
    pub published_url: String,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    pub campaign_id: Uuid,
    pub creator_id: Uuid,
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/schedule", post(create_slot).get(get_creator_schedule))
        .route("/api/schedule/:id/submit", post(submit_to_slot))
        .route("/api/schedule/:id/revision", put(request_revision))
        .route("/api/schedule/:id/approve", put(approve_slot))
        .route("/api/schedule/:id/complete", put(complete_slot))
}

async fn create_slot(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateSlotRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    // Slots only exist under a real campaign.
    state.campaigns.get(request.campaign_id).await?;
    let slot = state
        .schedule
        .create_slot(
            request.campaign_id,
            request.creator_id,
            request.scheduled_date,
            request.brief_id,
        )
        .await;
    Ok((StatusCode::CREATED, Json(slot)))
}

async fn get_creator_schedule(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<Vec<ScheduledPost>>, ApiError> {
    Ok(Json(
        state
            .schedule
            .creator_schedule(query.campaign_id, query.creator_id)
            .await,
    ))
}

async fn submit_to_slot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<SubmitDraftRequest>,
) -> Result<Json<ScheduledPost>, ApiError> {
    Ok(Json(
        state.schedule.submit_to_slot(id, &request.content_url).await?,
    ))
}

async fn request_revision(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<RevisionRequest>,
) -> Result<Json<ScheduledPost>, ApiError> {
    Ok(Json(
        state.schedule.request_revision(id, &request.feedback).await?,
    ))
}

async fn approve_slot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScheduledPost>, ApiError> {
    Ok(Json(state.schedule.approve_slot(id).await?))
}

async fn complete_slot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<CompleteSlotRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (slot, video) = state
        .schedule
        .complete_slot(id, &request.published_url, &state.videos)
        .await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "slot": slot,
        "video_id": video.id,
    })))
}
