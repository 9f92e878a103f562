//! Order route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;

use altiplano_core::{AddressId, Email, OrderId};

use crate::error::AppError;
use crate::identity::RequestIdentity;
use crate::models::order::{Order, OrderDetail};
use crate::services::{CheckoutService, OrderService};
use crate::state::AppState;

/// Create the order routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", post(create_order).get(list_orders))
        .route("/api/orders/{order_id}", get(show_order))
}

/// Order commit request body.
#[derive(Debug, Deserialize)]
struct CreateOrderRequest {
    address_id: AddressId,
    /// Denormalized onto the order so it survives account deletion.
    email: String,
}

async fn create_order(
    State(state): State<AppState>,
    identity: RequestIdentity,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderDetail>), AppError> {
    let user_id = identity.require_user()?;

    let email = Email::parse(&body.email)
        .map_err(|e| AppError::BadRequest(format!("invalid email: {e}")))?;

    let detail = CheckoutService::new(state.pool(), state.config().lock_timeout_ms)
        .commit_order(user_id, &email, body.address_id)
        .await?;

    Ok((StatusCode::CREATED, Json(detail)))
}

async fn list_orders(
    State(state): State<AppState>,
    identity: RequestIdentity,
) -> Result<Json<Vec<Order>>, AppError> {
    let user_id = identity.require_user()?;
    let orders = OrderService::new(state.pool(), state.config().lock_timeout_ms)
        .list_for_user(user_id)
        .await?;
    Ok(Json(orders))
}

async fn show_order(
    State(state): State<AppState>,
    identity: RequestIdentity,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderDetail>, AppError> {
    let user_id = identity.require_user()?;
    let detail = OrderService::new(state.pool(), state.config().lock_timeout_ms)
        .get_for_user(user_id, order_id)
        .await?;
    Ok(Json(detail))
}
