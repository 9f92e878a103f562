//! Admin route handlers: order fulfillment and payment verification.
//!
//! Guarded by the `x-admin-token` shared secret; the admin UI itself lives
//! elsewhere.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use serde::Deserialize;

use altiplano_core::{OrderId, OrderStatus, PaymentId};

use crate::error::AppError;
use crate::identity::AdminAuth;
use crate::models::order::{Order, OrderDetail};
use crate::models::payment::Payment;
use crate::services::{OrderService, PaymentService, ReviewDecision};
use crate::state::AppState;

/// Create the admin routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/orders", get(list_orders))
        .route("/api/admin/orders/{order_id}", get(show_order))
        .route("/api/admin/orders/{order_id}/status", put(update_status))
        .route("/api/admin/payments/{payment_id}/review", post(review_payment))
}

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

const fn default_limit() -> i64 {
    50
}

/// Status update request body.
#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: OrderStatus,
}

/// Payment review request body.
#[derive(Debug, Deserialize)]
struct ReviewRequest {
    decision: ReviewDecision,
    notes: Option<String>,
}

async fn list_orders(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = OrderService::new(state.pool(), state.config().lock_timeout_ms)
        .list_all(query.limit, query.offset)
        .await?;
    Ok(Json(orders))
}

async fn show_order(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderDetail>, AppError> {
    let detail = OrderService::new(state.pool(), state.config().lock_timeout_ms)
        .get_any(order_id)
        .await?;
    Ok(Json(detail))
}

async fn update_status(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(order_id): Path<OrderId>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, AppError> {
    let order = OrderService::new(state.pool(), state.config().lock_timeout_ms)
        .advance_status(order_id, body.status)
        .await?;
    Ok(Json(order))
}

async fn review_payment(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(payment_id): Path<PaymentId>,
    Json(body): Json<ReviewRequest>,
) -> Result<Json<Payment>, AppError> {
    let payment = PaymentService::new(
        state.pool(),
        state.gateway(),
        state.config().currency,
        state.config().lock_timeout_ms,
    )
    .review(payment_id, body.decision, body.notes.as_deref())
    .await?;
    Ok(Json(payment))
}
