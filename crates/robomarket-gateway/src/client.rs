//! Gateway client implementation.

use std::time::Duration;

use async_trait::async_trait;
use robomarket_core::{
    Address, Bid, BlockSource, FinishStatus, LiabilityLedger, MarketError, Result, SigningGateway,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Client for the remote signing/ledger gateway.
#[derive(Clone)]
pub struct HttpGateway {
    /// Base URL of the gateway.
    base_url: String,

    /// HTTP client.
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct BlockResponse {
    number: u64,
}

#[derive(Debug, Serialize)]
struct FinishRequest {
    success: bool,
}

impl HttpGateway {
    /// Create a client; `timeout` bounds every request.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(MarketError::ConfigError("gateway_url must not be empty".into()));
        }
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MarketError::ConfigError(e.to_string()))?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn liability_url(&self, address: &Address, action: &str) -> String {
        format!("{}/liabilities/{}/{}", self.base_url, address, action)
    }

    async fn post_json<T: Serialize + ?Sized>(&self, operation: &str, url: &str, body: &T) -> Result<reqwest::Response> {
        debug!(operation, url, "Gateway request");
        let response = self
            .http_client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| send_error(operation, e))?;
        check_status(operation, response).await
    }
}

fn send_error(operation: &str, err: reqwest::Error) -> MarketError {
    if err.is_timeout() {
        MarketError::Timeout {
            duration_ms: 0,
            operation: operation.to_string(),
        }
    } else {
        MarketError::ConnectionError(err.to_string())
    }
}

/// 5xx is worth retrying; 4xx is not.
async fn check_status(operation: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response.text().await.unwrap_or_default();
    let message = format!("{}: {}", status, error_text);
    if status.is_server_error() {
        Err(MarketError::transient(operation, message))
    } else {
        Err(MarketError::Internal(format!("{} rejected: {}", operation, message)))
    }
}

#[async_trait]
impl SigningGateway for HttpGateway {
    async fn submit(&self, bid: Bid) -> Result<()> {
        let url = format!("{}/bids", self.base_url);
        self.post_json("submit", &url, &bid).await?;
        Ok(())
    }
}

#[async_trait]
impl LiabilityLedger for HttpGateway {
    async fn start(&self, address: &Address) -> Result<()> {
        let url = self.liability_url(address, "start");
        self.post_json("start", &url, &serde_json::json!({}))
            .await
            .map_err(|e| MarketError::StartFailed {
                address: address.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn finish(&self, address: &Address, status: FinishStatus) -> Result<()> {
        let url = self.liability_url(address, "finish");
        let body = FinishRequest {
            success: status.is_success(),
        };
        self.post_json("finish", &url, &body)
            .await
            .map_err(|e| MarketError::FinishFailed {
                address: address.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}

#[async_trait]
impl BlockSource for HttpGateway {
    async fn current_block(&self) -> Result<u64> {
        let url = format!("{}/block", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| send_error("current_block", e))?;
        let response = check_status("current_block", response).await?;
        let block: BlockResponse = response
            .json()
            .await
            .map_err(|e| MarketError::SerializationError(e.to_string()))?;
        Ok(block.number)
    }
}
