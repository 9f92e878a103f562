//! Payment gateway HTTP client.
//!
//! Provides charge intent creation and webhook signature verification.

use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, error, instrument};

use super::{ChargeCorrelation, ChargeIntent};
use crate::config::GatewayConfig;

/// Maximum webhook timestamp skew, in seconds (replay protection).
const MAX_TIMESTAMP_SKEW_SECS: i64 = 300;

/// Errors that can occur when interacting with the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("Gateway request failed: {0}")]
    Request(String),

    /// Failed to parse response.
    #[error("Gateway response error: {0}")]
    Response(String),

    /// Gateway API returned an error.
    #[error("Gateway API error: {0}")]
    Api(String),

    /// Invalid webhook signature.
    #[error("Invalid gateway signature: {0}")]
    InvalidSignature(String),

    /// The charge amount does not fit the gateway's integer minor units.
    #[error("Charge amount out of range")]
    AmountOutOfRange,
}

/// Outbound charge intent request body.
#[derive(Debug, Serialize)]
struct ChargeIntentRequest<'a> {
    /// Amount in minor currency units (centavos/cents).
    amount: i64,
    currency: &'a str,
    metadata: &'a ChargeCorrelation,
}

/// Raw charge intent response.
#[derive(Debug, Deserialize)]
struct ChargeIntentResponse {
    #[serde(flatten)]
    intent: Option<ChargeIntentBody>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChargeIntentBody {
    id: String,
    client_secret: String,
}

/// Payment gateway API client.
#[derive(Clone)]
pub struct GatewayClient {
    /// HTTP client.
    client: Client,
    /// Gateway API base URL.
    base_url: String,
    /// API key for authentication.
    api_key: SecretString,
    /// Shared secret for verifying webhook signatures.
    webhook_secret: SecretString,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl GatewayClient {
    /// Create a new gateway client.
    #[must_use]
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
        }
    }

    /// Create a charge intent for a card payment.
    ///
    /// The amount is in minor currency units; the order/payment ids travel
    /// as correlation metadata and come back in webhook events.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the gateway refuses the
    /// charge.
    #[instrument(skip(self), fields(order_id = %correlation.order_id, payment_id = %correlation.payment_id))]
    pub async fn create_charge_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        correlation: &ChargeCorrelation,
    ) -> Result<ChargeIntent, GatewayError> {
        let request = ChargeIntentRequest {
            amount: amount_minor,
            currency,
            metadata: correlation,
        };

        let response = self
            .client
            .post(format!("{}/v1/charge_intents", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        let result: ChargeIntentResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Response(e.to_string()))?;

        if let Some(message) = result.error {
            error!(error = %message, "Gateway refused charge intent");
            return Err(GatewayError::Api(message));
        }

        let body = result
            .intent
            .ok_or_else(|| GatewayError::Response("missing charge intent body".to_string()))?;

        debug!(transaction_id = %body.id, "Charge intent created");

        Ok(ChargeIntent {
            id: body.id,
            client_secret: body.client_secret,
        })
    }

    /// Verify a webhook signature.
    ///
    /// The gateway signs `v1:{timestamp}:{body}` with HMAC-SHA256 over the
    /// shared secret and sends `v1={hex}`. Deliveries older than five
    /// minutes are rejected to bound replays.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::InvalidSignature` if the timestamp is
    /// malformed, too old, or the signature does not match.
    pub fn verify_webhook_signature(
        &self,
        timestamp: &str,
        body: &str,
        signature: &str,
    ) -> Result<(), GatewayError> {
        let ts: i64 = timestamp
            .parse()
            .map_err(|_| GatewayError::InvalidSignature("Invalid timestamp".to_string()))?;

        let now_secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| GatewayError::InvalidSignature(e.to_string()))?
            .as_secs();

        let now = i64::try_from(now_secs)
            .map_err(|_| GatewayError::InvalidSignature("System time overflow".to_string()))?;

        if (now - ts).abs() > MAX_TIMESTAMP_SKEW_SECS {
            return Err(GatewayError::InvalidSignature(
                "Request timestamp too old".to_string(),
            ));
        }

        let sig_basestring = format!("v1:{timestamp}:{body}");

        let mut mac =
            Hmac::<Sha256>::new_from_slice(self.webhook_secret.expose_secret().as_bytes())
                .map_err(|e| GatewayError::InvalidSignature(e.to_string()))?;

        mac.update(sig_basestring.as_bytes());

        let expected = format!("v1={}", hex::encode(mac.finalize().into_bytes()));

        if !constant_time_compare(&expected, signature) {
            return Err(GatewayError::InvalidSignature(
                "Signature mismatch".to_string(),
            ));
        }

        debug!("Gateway webhook signature verified");

        Ok(())
    }
}

/// Compare two strings in constant time.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> GatewayClient {
        GatewayClient::new(&GatewayConfig {
            base_url: "https://api.gateway.test".to_string(),
            api_key: SecretString::from("gw_test_key".to_string()),
            webhook_secret: SecretString::from("test-webhook-shared-key".to_string()),
        })
    }

    fn sign(timestamp: &str, body: &str) -> String {
        let sig_basestring = format!("v1:{timestamp}:{body}");
        let mut mac =
            Hmac::<Sha256>::new_from_slice(b"test-webhook-shared-key").expect("valid key length");
        mac.update(sig_basestring.as_bytes());
        format!("v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn now_timestamp() -> String {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time before epoch")
            .as_secs()
            .to_string()
    }

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(constant_time_compare("", ""));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hell"));
        assert!(!constant_time_compare("hello", "helloo"));
    }

    #[test]
    fn test_signature_verification_valid() {
        let client = test_client();
        let timestamp = now_timestamp();
        let body = r#"{"id":"evt_01"}"#;
        let signature = sign(&timestamp, body);

        assert!(
            client
                .verify_webhook_signature(&timestamp, body, &signature)
                .is_ok()
        );
    }

    #[test]
    fn test_signature_verification_invalid_signature() {
        let client = test_client();
        let timestamp = now_timestamp();

        let result = client.verify_webhook_signature(
            &timestamp,
            r#"{"id":"evt_01"}"#,
            "v1=invalid_signature_hash",
        );
        assert!(matches!(result, Err(GatewayError::InvalidSignature(_))));
    }

    #[test]
    fn test_signature_verification_tampered_body() {
        let client = test_client();
        let timestamp = now_timestamp();
        let signature = sign(&timestamp, r#"{"amount":100}"#);

        let result =
            client.verify_webhook_signature(&timestamp, r#"{"amount":99999}"#, &signature);
        assert!(matches!(result, Err(GatewayError::InvalidSignature(_))));
    }

    #[test]
    fn test_signature_verification_invalid_timestamp() {
        let client = test_client();
        let result = client.verify_webhook_signature("not-a-number", "body", "v1=sig");
        assert!(matches!(result, Err(GatewayError::InvalidSignature(_))));
    }

    #[test]
    fn test_signature_verification_old_timestamp() {
        let client = test_client();

        // Timestamp from 10 minutes ago
        let old_timestamp = (std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time before epoch")
            .as_secs()
            - 600)
            .to_string();

        let body = r#"{"id":"evt_01"}"#;
        let signature = sign(&old_timestamp, body);

        let result = client.verify_webhook_signature(&old_timestamp, body, &signature);
        assert!(matches!(result, Err(GatewayError::InvalidSignature(_))));
    }
}
