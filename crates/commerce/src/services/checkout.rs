//! The order commit engine.
//!
//! `commit_order` converts a cart into a durable order in one database
//! transaction: compute the total, create the order shell and address
//! snapshot, reserve stock per line through the allocator, materialize
//! order lines with price snapshots, record the allocation audit trail, and
//! delete the cart. Any failure rolls the whole thing back - no partial
//! orders, no partially decremented stock, and the cart survives for a
//! retry.

use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument};

use altiplano_core::{AddressId, Email, UserId, VariantId};

use super::allocation;
use crate::db::{self, AddressRepository, CartRepository, RepositoryError};
use crate::models::cart::cart_total;
use crate::models::order::{AddressSnapshot, OrderDetail};

/// Errors the commit engine can surface to the caller.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart has no lines; nothing to commit.
    #[error("cannot create an order from an empty cart")]
    EmptyCart,

    /// The ledger cannot cover a cart line, even after locking.
    ///
    /// Carries the shortfall so the client can adjust the quantity. Not
    /// retried automatically.
    #[error(
        "insufficient stock for variant {variant_id}: requested {requested}, short by {shortfall}"
    )]
    InsufficientStock {
        variant_id: VariantId,
        requested: i32,
        shortfall: i32,
    },

    /// The shipping address does not exist or belongs to someone else.
    #[error("shipping address does not belong to the requesting user")]
    AddressNotOwned,

    /// A stock row lock could not be acquired within the configured bound.
    #[error("timed out waiting for stock locks; try again")]
    StockLockTimeout,

    /// Underlying repository failure.
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CheckoutError {
    fn from(e: RepositoryError) -> Self {
        if e.is_lock_timeout() {
            Self::StockLockTimeout
        } else {
            Self::Repository(e)
        }
    }
}

/// The order assembler.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    lock_timeout_ms: u64,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, lock_timeout_ms: u64) -> Self {
        Self {
            pool,
            lock_timeout_ms,
        }
    }

    /// Convert the user's cart into an order.
    ///
    /// Retrying after a failure creates a fresh, independent order; there is
    /// no double-submit deduplication.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError`] per the taxonomy above; on any error no
    /// side effect persists.
    #[instrument(skip(self, email), fields(user_id = %user_id, address_id = %address_id))]
    pub async fn commit_order(
        &self,
        user_id: UserId,
        email: &Email,
        address_id: AddressId,
    ) -> Result<OrderDetail, CheckoutError> {
        // Ownership check on the live address, before any mutation.
        let address = AddressRepository::new(self.pool)
            .get(address_id)
            .await?
            .filter(|a| a.user_id == user_id)
            .ok_or(CheckoutError::AddressNotOwned)?;

        let cart = CartRepository::new(self.pool)
            .get_by_user(user_id)
            .await?
            .ok_or(CheckoutError::EmptyCart)?;

        let mut tx = db::begin_with_lock_timeout(self.pool, self.lock_timeout_ms).await?;

        let cart_lines = db::carts::priced_lines(&mut tx, cart.id).await?;
        if cart_lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let total = cart_total(&cart_lines);

        let order = db::orders::insert(&mut tx, user_id, email.as_str(), total).await?;
        db::orders::insert_address_snapshot(&mut tx, order.id, &address).await?;

        let mut order_lines = Vec::with_capacity(cart_lines.len());
        let mut allocations = Vec::new();

        for line in &cart_lines {
            let decrements =
                allocation::allocate(&mut tx, line.variant_id, line.quantity).await?;

            order_lines.push(
                db::orders::insert_line(
                    &mut tx,
                    order.id,
                    line.variant_id,
                    line.quantity,
                    line.unit_price,
                )
                .await?,
            );

            for decrement in decrements {
                allocations.push(
                    db::orders::insert_allocation(
                        &mut tx,
                        order.id,
                        line.variant_id,
                        decrement.warehouse_id,
                        decrement.quantity,
                    )
                    .await?,
                );
            }
        }

        db::carts::delete(&mut tx, cart.id).await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        info!(
            order_id = %order.id,
            total = %order.total,
            lines = order_lines.len(),
            "Order committed"
        );

        Ok(OrderDetail {
            shipping_address: AddressSnapshot::from(&address),
            order,
            lines: order_lines,
            allocations,
        })
    }
}
