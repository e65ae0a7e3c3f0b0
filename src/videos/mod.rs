pub mod models;
pub mod registry;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::metrics_sync::provider::{self, ProviderMetrics};
use crate::metrics_sync::RefreshOutcome;
use crate::shared::error::ApiError;
use crate::shared::state::AppState;
use models::{CreatorAssignment, Video};

#[derive(Debug, Deserialize)]
pub struct SubmitVideoRequest {
    pub campaign_id: Uuid,
    pub creator_id: Option<Uuid>,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct RejectVideoRequest {
    pub feedback: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignCreatorRequest {
    pub creator_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ListVideosQuery {
    pub campaign_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SubmitVideoResponse {
    pub success: bool,
    pub video_id: Uuid,
    pub video: Video,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_metrics: Option<ProviderMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_handle: Option<String>,
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/videos", post(submit_video).get(list_videos))
        .route("/api/videos/:id", get(get_video).delete(delete_video))
        .route("/api/videos/:id/approve", put(approve_video))
        .route("/api/videos/:id/reject", put(reject_video))
        .route("/api/videos/:id/creator", put(assign_creator))
        .route("/api/videos/:id/refresh", post(refresh_video))
}

/// Submit a video by URL. The URL must resolve to a supported platform; an
/// initial metrics fetch is attempted opportunistically so the reviewer sees
/// counters right away, but its failure never fails the submission.
async fn submit_video(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitVideoRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let parsed = provider::parse_url(&request.url).ok_or_else(|| {
        ApiError::Validation("url is not a supported instagram or tiktok video".to_string())
    })?;
    state.campaigns.get(request.campaign_id).await?;

    let creator = match request.creator_id {
        Some(id) => CreatorAssignment::Assigned(id),
        None => CreatorAssignment::Unassigned,
    };
    let video = state
        .videos
        .submit(request.campaign_id, creator, request.url.trim().to_string(), parsed)
        .await;

    let initial = state.sync.refresh(video.id).await.ok();
    let initial_metrics = initial.and_then(|o| o.metrics);
    let creator_handle = initial_metrics
        .as_ref()
        .and_then(|m| m.creator_handle.clone());

    // Re-read so the response reflects the initial fetch, if it landed.
    let video = state.videos.get(video.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitVideoResponse {
            success: true,
            video_id: video.id,
            video,
            initial_metrics,
            creator_handle,
        }),
    ))
}

async fn list_videos(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListVideosQuery>,
) -> Result<Json<Vec<Video>>, ApiError> {
    Ok(Json(state.videos.campaign_snapshot(query.campaign_id).await))
}

async fn get_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Video>, ApiError> {
    Ok(Json(state.videos.get(id).await?))
}

async fn approve_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.videos.approve(id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn reject_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<RejectVideoRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.videos.reject(id, &request.feedback).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn delete_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Json<serde_json::Value> {
    // Idempotent: deleting an already-deleted id is a success, not an error.
    let existed = state.videos.delete(id).await;
    Json(serde_json::json!({ "success": true, "existed": existed }))
}

async fn assign_creator(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignCreatorRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.videos.assign_creator(id, request.creator_id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Manual refresh from the UI shares the engine (and its per-video guard)
/// with the background sweep. Fetch failures come back as a success=false
/// outcome, not an HTTP error.
async fn refresh_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RefreshOutcome>, ApiError> {
    Ok(Json(state.sync.refresh(id).await?))
}
