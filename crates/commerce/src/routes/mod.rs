//! HTTP route handlers for the commerce service.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness check (database ping)
//!
//! # Cart (anonymous or authenticated; merge-on-login)
//! GET    /api/cart                      - Current cart (mints a session token if needed)
//! POST   /api/cart/lines                - Add a variant (sums quantities)
//! PUT    /api/cart/lines/{variant_id}   - Set a line's quantity
//! DELETE /api/cart/lines/{variant_id}   - Remove a line
//!
//! # Addresses (requires user)
//! GET  /api/addresses                   - List the user's addresses
//! POST /api/addresses                   - Create an address
//!
//! # Orders (requires user)
//! POST /api/orders                      - Commit the cart into an order
//! GET  /api/orders                      - Order history
//! GET  /api/orders/{id}                 - Order with lines, snapshot, allocations
//!
//! # Payments (requires user)
//! POST /api/payments                    - Start a payment attempt
//! POST /api/payments/{id}/proof         - Attach a QR transfer proof
//!
//! # Admin (requires x-admin-token)
//! GET  /api/admin/orders                - All orders, paginated
//! GET  /api/admin/orders/{id}           - Any order's detail
//! PUT  /api/admin/orders/{id}/status    - Advance an order's status
//! POST /api/admin/payments/{id}/review  - Approve/reject a pending payment
//!
//! # Webhooks
//! POST /webhooks/gateway                - Signed payment gateway events
//! ```

pub mod addresses;
pub mod admin;
pub mod cart;
pub mod orders;
pub mod payments;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// Compose all route groups.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(cart::router())
        .merge(addresses::router())
        .merge(orders::router())
        .merge(payments::router())
        .merge(admin::router())
        .merge(webhooks::router())
}
