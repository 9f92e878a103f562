//! Order queries and fulfillment transitions.

use sqlx::PgPool;
use tracing::{info, instrument};

use altiplano_core::{OrderId, OrderStatus, UserId};

use crate::db::{self, OrderRepository, RepositoryError};
use crate::error::AppError;
use crate::models::order::{Order, OrderDetail};

/// Order history reads and the admin-driven status transitions.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    lock_timeout_ms: u64,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, lock_timeout_ms: u64) -> Self {
        Self {
            pool,
            lock_timeout_ms,
        }
    }

    /// A user's order with lines, address snapshot, and allocation audit.
    ///
    /// Orders belonging to someone else surface as `NotFound` - ownership is
    /// not leaked.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the order doesn't exist or isn't
    /// owned by `user_id`.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<OrderDetail, AppError> {
        let orders = OrderRepository::new(self.pool);

        let order = orders
            .get(order_id)
            .await?
            .filter(|o| o.user_id == Some(user_id))
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        self.detail(order).await
    }

    /// A user's order history, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` on query failure.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, AppError> {
        Ok(OrderRepository::new(self.pool).list_for_user(user_id).await?)
    }

    /// All orders, paginated, for the admin surface.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` on query failure.
    pub async fn list_all(&self, limit: i64, offset: i64) -> Result<Vec<Order>, AppError> {
        Ok(OrderRepository::new(self.pool)
            .list_all(limit.clamp(1, 200), offset.max(0))
            .await?)
    }

    /// An order by id regardless of owner, for the admin surface.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the order doesn't exist.
    pub async fn get_any(&self, order_id: OrderId) -> Result<OrderDetail, AppError> {
        let order = OrderRepository::new(self.pool)
            .get(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        self.detail(order).await
    }

    /// Apply an admin-driven status transition (ship, deliver, cancel).
    ///
    /// Legality comes from [`OrderStatus::can_transition_to`]; the update
    /// runs under a row lock so concurrent transitions serialize.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown order and
    /// `AppError::BadRequest` for an illegal transition.
    #[instrument(skip(self), fields(order_id = %order_id, next = %next))]
    pub async fn advance_status(
        &self,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, AppError> {
        let mut tx = db::begin_with_lock_timeout(self.pool, self.lock_timeout_ms).await?;

        let order = db::orders::get_for_update(&mut tx, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        if !order.status.can_transition_to(next) {
            return Err(AppError::BadRequest(format!(
                "illegal order transition: {} -> {next}",
                order.status
            )));
        }

        let updated = db::orders::set_status(&mut tx, order_id, next).await?;
        tx.commit().await.map_err(RepositoryError::from)?;

        info!(from = %order.status, to = %next, "Order status advanced");

        Ok(updated)
    }

    async fn detail(&self, order: Order) -> Result<OrderDetail, AppError> {
        let orders = OrderRepository::new(self.pool);

        let lines = orders.lines(order.id).await?;
        let allocations = orders.allocations(order.id).await?;
        let shipping_address = orders.address(order.id).await?.ok_or_else(|| {
            AppError::Database(RepositoryError::DataCorruption(format!(
                "order {} has no address snapshot",
                order.id
            )))
        })?;

        Ok(OrderDetail {
            order,
            lines,
            shipping_address,
            allocations,
        })
    }
}
