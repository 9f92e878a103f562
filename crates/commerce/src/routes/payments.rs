//! Payment route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};
use serde::Deserialize;

use altiplano_core::{OrderId, PaymentId, PaymentMethod};

use crate::error::AppError;
use crate::identity::RequestIdentity;
use crate::models::payment::{CreatedPayment, Payment};
use crate::services::PaymentService;
use crate::state::AppState;

/// Create the payment routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/payments", post(create_payment))
        .route("/api/payments/{payment_id}/proof", post(attach_proof))
}

/// Payment creation request body.
#[derive(Debug, Deserialize)]
struct CreatePaymentRequest {
    order_id: OrderId,
    method: PaymentMethod,
}

/// Proof upload request body: a reference to the stored receipt image.
#[derive(Debug, Deserialize)]
struct AttachProofRequest {
    reference: String,
}

fn payment_service(state: &AppState) -> PaymentService<'_> {
    PaymentService::new(
        state.pool(),
        state.gateway(),
        state.config().currency,
        state.config().lock_timeout_ms,
    )
}

async fn create_payment(
    State(state): State<AppState>,
    identity: RequestIdentity,
    Json(body): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<CreatedPayment>), AppError> {
    let user_id = identity.require_user()?;
    let created = payment_service(&state)
        .create(user_id, body.order_id, body.method)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn attach_proof(
    State(state): State<AppState>,
    identity: RequestIdentity,
    Path(payment_id): Path<PaymentId>,
    Json(body): Json<AttachProofRequest>,
) -> Result<Json<Payment>, AppError> {
    let user_id = identity.require_user()?;
    let payment = payment_service(&state)
        .attach_proof(user_id, payment_id, &body.reference)
        .await?;
    Ok(Json(payment))
}
