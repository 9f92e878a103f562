//! Payment gateway webhook handler.
//!
//! The gateway delivers events at-least-once; the signature is verified
//! before anything is parsed or mutated, and duplicate deliveries resolve to
//! a no-op success so the gateway stops retrying.

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use tracing::{debug, info, instrument};

use crate::error::AppError;
use crate::gateway::GatewayEvent;
use crate::services::{PaymentService, WebhookOutcome};
use crate::state::AppState;

/// Header carrying the unix timestamp the signature covers.
const TIMESTAMP_HEADER: &str = "x-gateway-timestamp";
/// Header carrying the HMAC signature.
const SIGNATURE_HEADER: &str = "x-gateway-signature";

/// Create the webhook routes router.
pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks/gateway", post(handle_gateway_event))
}

/// Handle a payment gateway webhook delivery.
#[instrument(skip(state, headers, body))]
async fn handle_gateway_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    let timestamp = headers
        .get(TIMESTAMP_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing timestamp header".into()))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing signature header".into()))?;

    // Authenticity first; an unsigned payload never reaches the parser.
    state
        .gateway()
        .verify_webhook_signature(timestamp, &body, signature)?;

    debug!("Gateway signature verified");

    let event: GatewayEvent = serde_json::from_str(&body)
        .map_err(|e| AppError::BadRequest(format!("Failed to parse event: {e}")))?;

    let outcome = PaymentService::new(
        state.pool(),
        state.gateway(),
        state.config().currency,
        state.config().lock_timeout_ms,
    )
    .handle_gateway_event(&event)
    .await?;

    if outcome == WebhookOutcome::AlreadyProcessed {
        info!(event_id = %event.id, "Duplicate gateway delivery acknowledged");
    }

    // 200 either way - a duplicate delivery must look like success to the
    // gateway's retry policy.
    Ok(StatusCode::OK)
}
