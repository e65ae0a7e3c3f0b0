pub mod budget;
pub mod campaigns;
pub mod config;
pub mod metrics_sync;
pub mod schedule;
pub mod shared;
pub mod videos;
