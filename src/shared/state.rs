use std::sync::Arc;

use crate::budget::wallet::WalletClient;
use crate::campaigns::CampaignStore;
use crate::config::AppConfig;
use crate::metrics_sync::provider::MetricsProvider;
use crate::metrics_sync::MetricsSyncEngine;
use crate::schedule::workflow::ScheduleBoard;
use crate::videos::registry::VideoRegistry;

pub struct AppState {
    pub config: AppConfig,
    pub campaigns: CampaignStore,
    pub videos: VideoRegistry,
    pub schedule: ScheduleBoard,
    pub sync: MetricsSyncEngine,
    pub wallet: Arc<dyn WalletClient>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        provider: Arc<dyn MetricsProvider>,
        wallet: Arc<dyn WalletClient>,
    ) -> Self {
        let videos = VideoRegistry::new();
        let sync = MetricsSyncEngine::new(videos.clone(), provider);
        let schedule = ScheduleBoard::new(config.schedule.grace_hours);
        Self {
            config,
            campaigns: CampaignStore::new(),
            videos,
            schedule,
            sync,
            wallet,
        }
    }
}
