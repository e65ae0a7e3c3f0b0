use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::campaigns::{DealRate, DealTerms};
use crate::videos::models::Video;

/// Advisory signal for the presentation layer. Nothing is ever blocked by
/// budget state; the ledger always computes a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetAlert {
    NearLimit,
    OverBudget,
}

/// Derived view of a campaign's budget. Computed on demand from current
/// registry state, never stored or incrementally maintained, so deletions
/// and corrections are reflected for free and nothing can drift.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetUtilization {
    pub total_budget: i64,
    pub paid: i64,
    pub committed: i64,
    pub remaining: i64,
    pub paid_percent: f64,
    pub committed_percent: f64,
    pub remaining_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<BudgetAlert>,
}

/// Accrued obligation for one video under one rate. The flat component is
/// owed once per approved/tracking video; the RPM component follows the
/// current snapshot (zero until the first sync, and it may go down if a
/// later sync corrects views downward).
pub fn video_commitment(video: &Video, rate: DealRate) -> i64 {
    let flat = rate.flat_component();
    let views = video.metrics.map_or(0, |m| m.views);
    // i128 intermediate: a viral view count times a rate in cents can
    // overflow i64 before the /1000.
    let rpm = (views as i128 * rate.rpm_component() as i128 / 1000) as i64;
    flat + rpm
}

/// Compute the ledger view from a consistent snapshot of one campaign's
/// videos. Only approved/tracking videos with an assigned creator and
/// resolvable deal terms contribute.
pub fn compute_utilization(
    total_budget: i64,
    paid: i64,
    videos: &[Video],
    deals: &HashMap<Uuid, DealTerms>,
) -> BudgetUtilization {
    let mut committed: i64 = 0;
    for video in videos {
        if !video.status.counts_toward_ledger() {
            continue;
        }
        let Some(creator_id) = video.creator.creator_id() else {
            continue;
        };
        let Some(terms) = deals.get(&creator_id) else {
            continue;
        };
        committed += video_commitment(video, terms.rate);
    }

    let remaining = total_budget - paid - committed;
    let percent = |amount: i64| {
        if total_budget == 0 {
            0.0
        } else {
            amount as f64 / total_budget as f64 * 100.0
        }
    };

    let alert = if paid + committed > total_budget {
        Some(BudgetAlert::OverBudget)
    } else if remaining >= 0 && (remaining as i128) * 10 < total_budget as i128 {
        Some(BudgetAlert::NearLimit)
    } else {
        None
    };

    BudgetUtilization {
        total_budget,
        paid,
        committed,
        remaining,
        paid_percent: percent(paid),
        committed_percent: percent(committed),
        remaining_percent: percent(remaining),
        alert,
    }
}
