//! Payment gateway integration.
//!
//! Outbound: create charge intents for card payments. Inbound: webhook
//! events confirming or declining a charge, authenticated with an
//! HMAC-SHA256 signature over a timestamped payload.

pub mod client;

use serde::{Deserialize, Serialize};

use altiplano_core::{OrderId, PaymentId};

pub use client::{GatewayClient, GatewayError};

/// Correlation metadata attached to a charge intent and echoed back in
/// webhook events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeCorrelation {
    pub order_id: OrderId,
    pub payment_id: PaymentId,
}

/// A charge intent created at the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct ChargeIntent {
    /// Gateway-issued transaction id; webhook events carry it back.
    pub id: String,
    /// Secret the frontend uses to collect the card.
    pub client_secret: String,
}

/// Webhook event types the handler understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayEventType {
    #[serde(rename = "charge.succeeded")]
    ChargeSucceeded,
    #[serde(rename = "charge.failed")]
    ChargeFailed,
}

/// A webhook event delivered by the gateway (at-least-once).
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayEvent {
    /// Gateway event id.
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: GatewayEventType,
    /// Transaction id of the charge this event is about.
    pub transaction_id: String,
    /// Correlation metadata from the original charge intent.
    pub metadata: ChargeCorrelation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_succeeded_event_payload() {
        let body = r#"{
            "id": "evt_01",
            "type": "charge.succeeded",
            "transaction_id": "txn_abc123",
            "metadata": {
                "order_id": "0193d3c4-7a10-7bb0-93c8-111111111111",
                "payment_id": "0193d3c4-7a10-7bb0-93c8-222222222222"
            }
        }"#;

        let event: GatewayEvent = serde_json::from_str(body).expect("valid payload");
        assert_eq!(event.event_type, GatewayEventType::ChargeSucceeded);
        assert_eq!(event.transaction_id, "txn_abc123");
    }

    #[test]
    fn rejects_unknown_event_types() {
        let body = r#"{
            "id": "evt_01",
            "type": "charge.refunded",
            "transaction_id": "txn_abc123",
            "metadata": {
                "order_id": "0193d3c4-7a10-7bb0-93c8-111111111111",
                "payment_id": "0193d3c4-7a10-7bb0-93c8-222222222222"
            }
        }"#;

        assert!(serde_json::from_str::<GatewayEvent>(body).is_err());
    }
}
