pub mod ledger;
pub mod wallet;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use log::warn;
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::error::ApiError;
use crate::shared::state::AppState;
use ledger::BudgetUtilization;

pub fn configure() -> Router<Arc<AppState>> {
    Router::new().route("/api/campaigns/:id/budget", get(get_budget_utilization))
}

/// The ledger is evaluated here, on demand: one consistent registry
/// snapshot, one deals lookup, one wallet read, one pure computation.
async fn get_budget_utilization(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<BudgetUtilization>, ApiError> {
    let campaign = state.campaigns.get(id).await?;
    let videos = state.videos.campaign_snapshot(id).await;
    let deals = state.campaigns.deals_for_campaign(id).await;

    // A wallet outage degrades paid to zero rather than failing the read;
    // the identity paid + committed + remaining == total still holds over
    // the degraded value.
    let paid = match state.wallet.settled_total(id).await {
        Ok(total) => total,
        Err(e) => {
            warn!("wallet read failed for campaign {}: {}", id, e);
            0
        }
    };

    Ok(Json(ledger::compute_utilization(
        campaign.total_budget,
        paid,
        &videos,
        &deals,
    )))
}
