use http::header::{CONTENT_TYPE, WWW_AUTHENTICATE};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::chain::Address;
use crate::networks::SolanaNetwork;
use crate::proto::X402Version1;

/// Scheme name carried by every option this crate emits.
pub const SOLANA_SCHEME: &str = "solana";

/// One purchasable set of payment terms.
///
/// `amount` is a decimal string in display units; `decimals` tells the payer how to
/// scale it into base units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOption {
    pub id: String,
    pub scheme: String,
    pub network: SolanaNetwork,
    pub recipient: Address,
    /// Mint address, or `native` for SOL.
    pub token: String,
    pub amount: String,
    pub decimals: u8,
}

/// HTTP 402 response body. Options are listed in preference order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    pub version: X402Version1,
    pub payment_options: Vec<PaymentOption>,
}

/// Everything needed to answer a request with `402 Payment Required`.
#[derive(Debug, Clone)]
pub struct PaymentRequiredResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: PaymentRequirements,
}

impl PaymentRequiredResponse {
    pub fn new(body: PaymentRequirements) -> Self {
        let mut headers = HeaderMap::with_capacity(2);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            WWW_AUTHENTICATE,
            HeaderValue::from_static(X402Version1::WWW_AUTHENTICATE),
        );
        Self {
            status: StatusCode::PAYMENT_REQUIRED,
            headers,
            body,
        }
    }

    /// JSON rendering for hosts that relay the challenge as data rather than over HTTP.
    pub fn to_json(&self) -> serde_json::Value {
        let headers: serde_json::Map<String, serde_json::Value> = self
            .headers
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_string(), json!(value)))
            })
            .collect();
        json!({
            "statusCode": self.status.as_u16(),
            "headers": headers,
            "body": self.body,
        })
    }
}
