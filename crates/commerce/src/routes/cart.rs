//! Cart route handlers.
//!
//! Anonymous visitors get a session token minted on first contact; the token
//! comes back in the cart body and must be replayed in `x-session-token`.
//! Authenticated requests that still carry the token trigger the
//! merge-on-login in the cart service.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use serde::Deserialize;

use altiplano_core::VariantId;

use crate::error::AppError;
use crate::identity::{RequestIdentity, mint_session_token};
use crate::models::cart::CartView;
use crate::services::CartService;
use crate::state::AppState;

/// Create the cart routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cart", get(show_cart))
        .route("/api/cart/lines", post(add_line))
        .route(
            "/api/cart/lines/{variant_id}",
            put(set_line).delete(remove_line),
        )
}

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
struct AddLineRequest {
    variant_id: VariantId,
    quantity: i32,
}

/// Set-quantity request body.
#[derive(Debug, Deserialize)]
struct SetQuantityRequest {
    quantity: i32,
}

/// Give first-contact visitors an identity to hang a cart on.
fn with_minted_token(mut identity: RequestIdentity) -> RequestIdentity {
    if !identity.is_present() {
        identity.session_token = Some(mint_session_token());
    }
    identity
}

async fn show_cart(
    State(state): State<AppState>,
    identity: RequestIdentity,
) -> Result<Json<CartView>, AppError> {
    let service = CartService::new(state.pool());
    let cart = service.resolve(&with_minted_token(identity)).await?;
    Ok(Json(service.view(&cart).await?))
}

async fn add_line(
    State(state): State<AppState>,
    identity: RequestIdentity,
    Json(body): Json<AddLineRequest>,
) -> Result<Json<CartView>, AppError> {
    let service = CartService::new(state.pool());
    let cart = service.resolve(&with_minted_token(identity)).await?;
    Ok(Json(
        service.add_line(&cart, body.variant_id, body.quantity).await?,
    ))
}

async fn set_line(
    State(state): State<AppState>,
    identity: RequestIdentity,
    Path(variant_id): Path<VariantId>,
    Json(body): Json<SetQuantityRequest>,
) -> Result<Json<CartView>, AppError> {
    let service = CartService::new(state.pool());
    let cart = service.resolve(&with_minted_token(identity)).await?;
    Ok(Json(
        service.set_line(&cart, variant_id, body.quantity).await?,
    ))
}

async fn remove_line(
    State(state): State<AppState>,
    identity: RequestIdentity,
    Path(variant_id): Path<VariantId>,
) -> Result<Json<CartView>, AppError> {
    let service = CartService::new(state.pool());
    let cart = service.resolve(&with_minted_token(identity)).await?;
    Ok(Json(service.remove_line(&cart, variant_id).await?))
}
