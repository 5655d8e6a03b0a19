//! Off-chain orderbook dependencies.
//!
//! Two protocols cannot be encoded from the signed order alone:
//! - X2Y2 fills need a fresh server-co-signed input blob per order, fetched
//!   from the X2Y2 API with an API key.
//! - ZeroExV4 orders held by an off-chain custodian ("cb orders") must be
//!   released through the custody API before they become fillable.
//!
//! Both are plain JSON-over-HTTP calls; both are the only build steps that
//! can fail per-item rather than per-batch.

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::BuildError;
use crate::order::SignedOrder;

// ============================================
// CONSTANTS
// ============================================

/// X2Y2 order-signing API
const X2Y2_API_URL: &str = "https://api.x2y2.org";

/// Custody release API for cb-held ZeroExV4 orders
const CUSTODY_API_URL: &str = "https://api.nft.coinbase.com";

/// Timeout for orderbook calls
const API_TIMEOUT_SECS: u64 = 10;

// ============================================
// API RESPONSE TYPES
// ============================================

#[derive(Debug, Deserialize)]
struct X2Y2SignResponse {
    success: bool,
    data: Option<Vec<X2Y2SignedInput>>,
    code: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct X2Y2SignedInput {
    input: String,
}

#[derive(Debug, Deserialize)]
struct CustodyReleaseResponse {
    success: bool,
    message: Option<String>,
}

// ============================================
// ORDERBOOK CLIENT
// ============================================

/// Off-chain lookups the build suspends on.
#[async_trait]
pub trait OrderbookClient: Send + Sync {
    /// Fetch the server-co-signed fill input for one X2Y2 order.
    async fn sign_x2y2_input(
        &self,
        order: &SignedOrder,
        taker: Address,
    ) -> Result<Bytes, BuildError>;

    /// Release a custodied ZeroExV4 order so it becomes fillable.
    async fn release_cb_order(&self, order_hash: B256) -> Result<(), BuildError>;
}

/// `OrderbookClient` over HTTP, API keys injected through configuration.
pub struct HttpOrderbookClient {
    http_client: Client,
    x2y2_url: String,
    custody_url: String,
    x2y2_api_key: Option<String>,
    custody_api_key: Option<String>,
}

impl HttpOrderbookClient {
    pub fn new(x2y2_api_key: Option<String>, custody_api_key: Option<String>) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(Duration::from_secs(API_TIMEOUT_SECS))
                .build()
                .unwrap_or_else(|_| Client::new()),
            x2y2_url: X2Y2_API_URL.to_string(),
            custody_url: CUSTODY_API_URL.to_string(),
            x2y2_api_key,
            custody_api_key,
        }
    }

    /// Point the client at non-default endpoints.
    pub fn with_endpoints(mut self, x2y2_url: String, custody_url: String) -> Self {
        self.x2y2_url = x2y2_url;
        self.custody_url = custody_url;
        self
    }
}

#[async_trait]
impl OrderbookClient for HttpOrderbookClient {
    async fn sign_x2y2_input(
        &self,
        order: &SignedOrder,
        taker: Address,
    ) -> Result<Bytes, BuildError> {
        let api_key = self
            .x2y2_api_key
            .as_ref()
            .ok_or_else(|| BuildError::Orderbook("X2Y2 API key not configured".to_string()))?;

        let body = serde_json::json!({
            "caller": format!("{:?}", taker),
            "op": 1,
            "items": [{ "orderId": format!("{:?}", order.order_hash()) }],
        });

        debug!("requesting x2y2 co-signed input for {:?}", order.order_hash());

        let response = self
            .http_client
            .post(format!("{}/api/orders/sign", self.x2y2_url))
            .header("X-API-KEY", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BuildError::Orderbook(format!("x2y2 sign request failed: {}", e)))?;

        let parsed: X2Y2SignResponse = response
            .json()
            .await
            .map_err(|e| BuildError::Orderbook(format!("malformed x2y2 response: {}", e)))?;

        if !parsed.success {
            return Err(BuildError::Orderbook(format!(
                "x2y2 refused to sign (code {:?})",
                parsed.code
            )));
        }

        let input = parsed
            .data
            .and_then(|mut inputs| (!inputs.is_empty()).then(|| inputs.remove(0)))
            .ok_or_else(|| BuildError::Orderbook("x2y2 returned no signed input".to_string()))?;

        let raw = hex::decode(input.input.trim_start_matches("0x"))
            .map_err(|e| BuildError::Orderbook(format!("x2y2 input is not hex: {}", e)))?;

        Ok(Bytes::from(raw))
    }

    async fn release_cb_order(&self, order_hash: B256) -> Result<(), BuildError> {
        let api_key = self
            .custody_api_key
            .as_ref()
            .ok_or_else(|| BuildError::Orderbook("custody API key not configured".to_string()))?;

        let body = serde_json::json!({ "orderHash": format!("{:?}", order_hash) });

        let response = self
            .http_client
            .post(format!("{}/api/v1/orders/release", self.custody_url))
            .header("X-API-KEY", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BuildError::Orderbook(format!("custody release failed: {}", e)))?;

        let parsed: CustodyReleaseResponse = response
            .json()
            .await
            .map_err(|e| BuildError::Orderbook(format!("malformed custody response: {}", e)))?;

        if !parsed.success {
            warn!("custody refused release for {:?}: {:?}", order_hash, parsed.message);
            return Err(BuildError::Orderbook(format!(
                "custody refused release: {}",
                parsed.message.unwrap_or_default()
            )));
        }

        Ok(())
    }
}
