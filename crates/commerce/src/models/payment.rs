//! Payment models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use altiplano_core::{OrderId, PaymentId, PaymentMethod, PaymentStatus};

/// A payment attempt against an order.
///
/// One order may hold several attempts; `gateway_transaction_id` matches
/// webhook deliveries to the attempt they confirm, `proof_reference` points
/// at an uploaded QR transfer receipt.
#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A freshly created payment plus what the client needs to proceed.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedPayment {
    #[serde(flatten)]
    pub payment: Payment,
    /// Gateway client secret for card payments; the frontend uses it to
    /// collect the card. Absent for QR transfers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}
