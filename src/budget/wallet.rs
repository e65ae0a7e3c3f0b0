use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

/// Read-only view onto the external wallet/payout ledger. This service never
/// initiates a transfer; it only reads settled totals.
#[async_trait]
pub trait WalletClient: Send + Sync {
    async fn settled_total(&self, campaign_id: Uuid) -> Result<i64, WalletError>;
}

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("wallet request failed: {0}")]
    Request(String),
    #[error("unexpected wallet response: {0}")]
    BadResponse(String),
}

#[derive(Debug, Deserialize)]
struct SettledTotalResponse {
    settled_total: i64,
}

pub struct HttpWalletClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpWalletClient {
    pub fn new(base_url: String, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl WalletClient for HttpWalletClient {
    async fn settled_total(&self, campaign_id: Uuid) -> Result<i64, WalletError> {
        let url = format!("{}/campaigns/{}/settled", self.base_url, campaign_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| WalletError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(WalletError::Request(format!("status {}", response.status())));
        }
        let payload: SettledTotalResponse = response
            .json()
            .await
            .map_err(|e| WalletError::BadResponse(e.to_string()))?;
        Ok(payload.settled_total)
    }
}

/// Used when no wallet endpoint is configured: every campaign reads as
/// unpaid, which keeps the budget identity intact.
pub struct NullWalletClient;

#[async_trait]
impl WalletClient for NullWalletClient {
    async fn settled_total(&self, _campaign_id: Uuid) -> Result<i64, WalletError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_settled_total_parses_payload() {
        let campaign_id = Uuid::new_v4();
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", format!("/campaigns/{campaign_id}/settled").as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"settled_total":42000}"#)
            .create_async()
            .await;

        let wallet = HttpWalletClient::new(server.url(), 5).unwrap();
        assert_eq!(wallet.settled_total(campaign_id).await.unwrap(), 42000);
    }

    #[tokio::test]
    async fn test_settled_total_surfaces_http_errors() {
        let campaign_id = Uuid::new_v4();
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", format!("/campaigns/{campaign_id}/settled").as_str())
            .with_status(503)
            .create_async()
            .await;

        let wallet = HttpWalletClient::new(server.url(), 5).unwrap();
        assert!(wallet.settled_total(campaign_id).await.is_err());
    }

    #[tokio::test]
    async fn test_null_wallet_reads_zero() {
        let wallet = NullWalletClient;
        assert_eq!(wallet.settled_total(Uuid::new_v4()).await.unwrap(), 0);
    }
}
