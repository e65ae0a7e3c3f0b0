use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::shared::error::ApiError;
use crate::shared::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    /// Integer minor currency units (cents). All money in this service is
    /// integral to avoid floating-point drift.
    pub total_budget: i64,
    pub created_at: DateTime<Utc>,
}

/// Payment basis for a (campaign, creator) deal. A deal always carries at
/// least one rate; "no terms" is the absence of the record itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DealRate {
    /// Fixed amount owed once per approved video.
    Flat { per_video: i64 },
    /// Amount owed per 1000 views, recomputed from the current snapshot.
    Rpm { per_mille: i64 },
    /// Both components, summed.
    FlatPlusRpm { per_video: i64, per_mille: i64 },
}

impl DealRate {
    pub fn flat_component(&self) -> i64 {
        match self {
            Self::Flat { per_video } | Self::FlatPlusRpm { per_video, .. } => *per_video,
            Self::Rpm { .. } => 0,
        }
    }

    pub fn rpm_component(&self) -> i64 {
        match self {
            Self::Rpm { per_mille } | Self::FlatPlusRpm { per_mille, .. } => *per_mille,
            Self::Flat { .. } => 0,
        }
    }

    fn from_parts(flat: Option<i64>, rpm: Option<i64>) -> Result<Self, ApiError> {
        match (flat, rpm) {
            (Some(f), _) if f < 0 => {
                Err(ApiError::Validation("flat rate must be non-negative".to_string()))
            }
            (_, Some(r)) if r < 0 => {
                Err(ApiError::Validation("rpm rate must be non-negative".to_string()))
            }
            (Some(f), Some(r)) => Ok(Self::FlatPlusRpm { per_video: f, per_mille: r }),
            (Some(f), None) => Ok(Self::Flat { per_video: f }),
            (None, Some(r)) => Ok(Self::Rpm { per_mille: r }),
            (None, None) => Err(ApiError::Validation(
                "deal terms need a flat rate, an rpm rate, or both".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealTerms {
    pub campaign_id: Uuid,
    pub creator_id: Uuid,
    pub rate: DealRate,
    pub required_videos: u32,
}

/// Campaigns plus deal terms keyed by (campaign, creator).
#[derive(Clone, Default)]
pub struct CampaignStore {
    campaigns: Arc<RwLock<HashMap<Uuid, Campaign>>>,
    deals: Arc<RwLock<HashMap<(Uuid, Uuid), DealTerms>>>,
}

impl CampaignStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, name: String, total_budget: i64) -> Result<Campaign, ApiError> {
        if name.trim().is_empty() {
            return Err(ApiError::Validation("campaign name is required".to_string()));
        }
        if total_budget < 0 {
            return Err(ApiError::Validation(
                "total budget must be non-negative".to_string(),
            ));
        }
        let campaign = Campaign {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            total_budget,
            created_at: Utc::now(),
        };
        self.campaigns.write().await.insert(campaign.id, campaign.clone());
        Ok(campaign)
    }

    pub async fn get(&self, campaign_id: Uuid) -> Result<Campaign, ApiError> {
        self.campaigns
            .read()
            .await
            .get(&campaign_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("campaign {campaign_id}")))
    }

    pub async fn set_deal_terms(&self, terms: DealTerms) -> Result<(), ApiError> {
        if terms.required_videos == 0 {
            return Err(ApiError::Validation(
                "required videos must be at least 1".to_string(),
            ));
        }
        // Terms only make sense against an existing campaign.
        self.get(terms.campaign_id).await?;
        self.deals
            .write()
            .await
            .insert((terms.campaign_id, terms.creator_id), terms);
        Ok(())
    }

    pub async fn deal_terms(&self, campaign_id: Uuid, creator_id: Uuid) -> Option<DealTerms> {
        self.deals
            .read()
            .await
            .get(&(campaign_id, creator_id))
            .cloned()
    }

    /// All deals for one campaign, for a single-pass ledger read.
    pub async fn deals_for_campaign(&self, campaign_id: Uuid) -> HashMap<Uuid, DealTerms> {
        self.deals
            .read()
            .await
            .values()
            .filter(|d| d.campaign_id == campaign_id)
            .map(|d| (d.creator_id, d.clone()))
            .collect()
    }
}

// ============================================================================
// HTTP surface
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub name: String,
    pub total_budget: i64,
}

#[derive(Debug, Deserialize)]
pub struct SetDealTermsRequest {
    pub flat_rate_per_video: Option<i64>,
    pub rpm_rate: Option<i64>,
    pub required_videos: u32,
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/campaigns", post(create_campaign))
        .route("/api/campaigns/:id", get(get_campaign))
        .route(
            "/api/campaigns/:id/deals/:creator_id",
            put(set_deal_terms).get(get_deal_terms),
        )
}

async fn create_campaign(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateCampaignRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let campaign = state
        .campaigns
        .create(request.name, request.total_budget)
        .await?;
    Ok((StatusCode::CREATED, Json(campaign)))
}

async fn get_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Campaign>, ApiError> {
    Ok(Json(state.campaigns.get(id).await?))
}

async fn set_deal_terms(
    State(state): State<Arc<AppState>>,
    Path((id, creator_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<SetDealTermsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let rate = DealRate::from_parts(request.flat_rate_per_video, request.rpm_rate)?;
    state
        .campaigns
        .set_deal_terms(DealTerms {
            campaign_id: id,
            creator_id,
            rate,
            required_videos: request.required_videos,
        })
        .await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn get_deal_terms(
    State(state): State<Arc<AppState>>,
    Path((id, creator_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<DealTerms>, ApiError> {
    state
        .campaigns
        .deal_terms(id, creator_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("deal terms for creator {creator_id}")))
        .map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_campaign_validates_budget() {
        let store = CampaignStore::new();
        let err = store.create("Spring Launch".to_string(), -1).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_deal_rate_from_parts() {
        assert_eq!(
            DealRate::from_parts(Some(20000), None).unwrap(),
            DealRate::Flat { per_video: 20000 }
        );
        assert_eq!(
            DealRate::from_parts(None, Some(500)).unwrap(),
            DealRate::Rpm { per_mille: 500 }
        );
        assert_eq!(
            DealRate::from_parts(Some(20000), Some(500)).unwrap(),
            DealRate::FlatPlusRpm { per_video: 20000, per_mille: 500 }
        );
        assert!(DealRate::from_parts(None, None).is_err());
        assert!(DealRate::from_parts(Some(-5), None).is_err());
    }

    #[tokio::test]
    async fn test_deal_terms_require_existing_campaign() {
        let store = CampaignStore::new();
        let err = store
            .set_deal_terms(DealTerms {
                campaign_id: Uuid::new_v4(),
                creator_id: Uuid::new_v4(),
                rate: DealRate::Flat { per_video: 100 },
                required_videos: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_deal_terms_upsert_and_lookup() {
        let store = CampaignStore::new();
        let campaign = store.create("Q3 Push".to_string(), 100000).await.unwrap();
        let creator = Uuid::new_v4();
        store
            .set_deal_terms(DealTerms {
                campaign_id: campaign.id,
                creator_id: creator,
                rate: DealRate::Flat { per_video: 20000 },
                required_videos: 3,
            })
            .await
            .unwrap();

        let terms = store.deal_terms(campaign.id, creator).await.unwrap();
        assert_eq!(terms.rate.flat_component(), 20000);
        assert_eq!(terms.rate.rpm_component(), 0);

        // Re-setting replaces the record.
        store
            .set_deal_terms(DealTerms {
                campaign_id: campaign.id,
                creator_id: creator,
                rate: DealRate::FlatPlusRpm { per_video: 15000, per_mille: 300 },
                required_videos: 3,
            })
            .await
            .unwrap();
        let terms = store.deal_terms(campaign.id, creator).await.unwrap();
        assert_eq!(terms.rate.rpm_component(), 300);
    }
}
