use axum::Router;
use dotenvy::dotenv;
use log::info;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use creatorserver::budget;
use creatorserver::budget::wallet::{HttpWalletClient, NullWalletClient, WalletClient};
use creatorserver::campaigns;
use creatorserver::config::AppConfig;
use creatorserver::metrics_sync::provider::HttpMetricsProvider;
use creatorserver::schedule;
use creatorserver::shared::state::AppState;
use creatorserver::videos;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::load()?;

    let provider = Arc::new(HttpMetricsProvider::new(
        config.metrics.api_url.clone(),
        config.metrics.api_key.clone(),
        config.metrics.fetch_timeout_secs,
    )?);
    let wallet: Arc<dyn WalletClient> = match &config.wallet.api_url {
        Some(url) => Arc::new(HttpWalletClient::new(url.clone(), config.wallet.timeout_secs)?),
        None => {
            info!("no wallet endpoint configured, paid totals read as zero");
            Arc::new(NullWalletClient)
        }
    };

    let state = Arc::new(AppState::new(config, provider, wallet));

    // Background processes: the metrics sweep over approved/tracking videos
    // and the missed-slot sweep. Both share the same code paths as the
    // user-triggered operations.
    tokio::spawn(
        state
            .sync
            .clone()
            .run_sweep(state.config.metrics.sweep_interval_secs),
    );
    tokio::spawn(
        state
            .schedule
            .clone()
            .run_sweep(state.config.schedule.sweep_interval_secs),
    );

    let app = Router::new()
        .merge(campaigns::configure())
        .merge(videos::configure())
        .merge(budget::configure())
        .merge(schedule::configure())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    let bind_addr = state.config.server.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("creatorserver listening on {}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
