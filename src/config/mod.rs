use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub metrics: MetricsConfig,
    pub wallet: WalletConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub fetch_timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct WalletConfig {
    /// When unset, the server runs with the null wallet and every campaign
    /// reads as unpaid.
    pub api_url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub grace_hours: i64,
    pub sweep_interval_secs: u64,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => Ok(raw.parse()?),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        dotenv().ok();

        Ok(Self {
            server: ServerConfig {
                bind_addr: var_or("SERVER_BIND", "0.0.0.0:8080"),
            },
            metrics: MetricsConfig {
                api_url: env::var("METRICS_API_URL")?,
                api_key: env::var("METRICS_API_KEY").ok(),
                fetch_timeout_secs: parsed_or("METRICS_FETCH_TIMEOUT_SECS", 10)?,
                sweep_interval_secs: parsed_or("METRICS_SWEEP_INTERVAL_SECS", 900)?,
            },
            wallet: WalletConfig {
                api_url: env::var("WALLET_API_URL").ok(),
                timeout_secs: parsed_or("WALLET_TIMEOUT_SECS", 5)?,
            },
            schedule: ScheduleConfig {
                grace_hours: parsed_or("SLOT_GRACE_HOURS", 24)?,
                sweep_interval_secs: parsed_or("SLOT_SWEEP_INTERVAL_SECS", 3600)?,
            },
        })
    }
}
