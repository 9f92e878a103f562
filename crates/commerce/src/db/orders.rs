//! Database operations for orders, their snapshots, and the allocation
//! audit trail.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use altiplano_core::{
    AllocationId, OrderId, OrderLineId, OrderStatus, UserId, VariantId, WarehouseId,
};

use super::RepositoryError;
use crate::models::address::Address;
use crate::models::order::{AddressSnapshot, AllocationRecord, Order, OrderLine};

/// Internal row type for order queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Option<i32>,
    customer_email: String,
    total: Decimal,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: OrderId::new(row.id),
            user_id: row.user_id.map(UserId::new),
            customer_email: row.customer_email,
            total: row.total,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Internal row type for order line queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    id: i32,
    order_id: Uuid,
    variant_id: i32,
    quantity: i32,
    unit_price: Decimal,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        Self {
            id: OrderLineId::new(row.id),
            order_id: OrderId::new(row.order_id),
            variant_id: VariantId::new(row.variant_id),
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

/// Internal row type for address snapshot queries.
#[derive(Debug, sqlx::FromRow)]
struct AddressSnapshotRow {
    full_name: String,
    street: String,
    apartment: Option<String>,
    city: String,
    region: String,
    country: String,
    postal_code: String,
    phone: Option<String>,
}

impl From<AddressSnapshotRow> for AddressSnapshot {
    fn from(row: AddressSnapshotRow) -> Self {
        Self {
            full_name: row.full_name,
            street: row.street,
            apartment: row.apartment,
            city: row.city,
            region: row.region,
            country: row.country,
            postal_code: row.postal_code,
            phone: row.phone,
        }
    }
}

/// Internal row type for allocation queries.
#[derive(Debug, sqlx::FromRow)]
struct AllocationRow {
    id: i32,
    order_id: Uuid,
    variant_id: i32,
    warehouse_id: i32,
    quantity: i32,
}

impl From<AllocationRow> for AllocationRecord {
    fn from(row: AllocationRow) -> Self {
        Self {
            id: AllocationId::new(row.id),
            order_id: OrderId::new(row.order_id),
            variant_id: VariantId::new(row.variant_id),
            warehouse_id: WarehouseId::new(row.warehouse_id),
            quantity: row.quantity,
        }
    }
}

const ORDER_COLUMNS: &str = "id, user_id, customer_email, total, status, created_at, updated_at";

/// Repository for pool-scoped order reads.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM commerce.order WHERE id = $1"
        ))
        .bind(order_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// List a user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM commerce.order
            WHERE user_id = $1
            ORDER BY created_at DESC
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// List all orders, newest first, paginated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM commerce.order
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Lines of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderLineRow>(
            r"
            SELECT id, order_id, variant_id, quantity, unit_price
            FROM commerce.order_line
            WHERE order_id = $1
            ORDER BY id ASC
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The address snapshot of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn address(
        &self,
        order_id: OrderId,
    ) -> Result<Option<AddressSnapshot>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressSnapshotRow>(
            r"
            SELECT full_name, street, apartment, city, region, country, postal_code, phone
            FROM commerce.order_address
            WHERE order_id = $1
            ",
        )
        .bind(order_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// The per-warehouse allocation audit trail of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn allocations(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<AllocationRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, AllocationRow>(
            r"
            SELECT id, order_id, variant_id, warehouse_id, quantity
            FROM commerce.allocation
            WHERE order_id = $1
            ORDER BY id ASC
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Insert the order shell, inside the commit transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert(
    conn: &mut PgConnection,
    user_id: UserId,
    customer_email: &str,
    total: Decimal,
) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        r"
        INSERT INTO commerce.order (user_id, customer_email, total)
        VALUES ($1, $2, $3)
        RETURNING {ORDER_COLUMNS}
        "
    ))
    .bind(user_id)
    .bind(customer_email)
    .bind(total)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

/// Copy the live address into the order's immutable snapshot.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_address_snapshot(
    conn: &mut PgConnection,
    order_id: OrderId,
    address: &Address,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO commerce.order_address
            (order_id, full_name, street, apartment, city, region, country, postal_code, phone)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ",
    )
    .bind(order_id)
    .bind(&address.full_name)
    .bind(&address.street)
    .bind(&address.apartment)
    .bind(&address.city)
    .bind(&address.region)
    .bind(&address.country)
    .bind(&address.postal_code)
    .bind(&address.phone)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Materialize one order line with its price snapshot.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_line(
    conn: &mut PgConnection,
    order_id: OrderId,
    variant_id: VariantId,
    quantity: i32,
    unit_price: Decimal,
) -> Result<OrderLine, RepositoryError> {
    let row = sqlx::query_as::<_, OrderLineRow>(
        r"
        INSERT INTO commerce.order_line (order_id, variant_id, quantity, unit_price)
        VALUES ($1, $2, $3, $4)
        RETURNING id, order_id, variant_id, quantity, unit_price
        ",
    )
    .bind(order_id)
    .bind(variant_id)
    .bind(quantity)
    .bind(unit_price)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

/// Record one per-warehouse decrement from the allocator.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_allocation(
    conn: &mut PgConnection,
    order_id: OrderId,
    variant_id: VariantId,
    warehouse_id: WarehouseId,
    quantity: i32,
) -> Result<AllocationRecord, RepositoryError> {
    let row = sqlx::query_as::<_, AllocationRow>(
        r"
        INSERT INTO commerce.allocation (order_id, variant_id, warehouse_id, quantity)
        VALUES ($1, $2, $3, $4)
        RETURNING id, order_id, variant_id, warehouse_id, quantity
        ",
    )
    .bind(order_id)
    .bind(variant_id)
    .bind(warehouse_id)
    .bind(quantity)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

/// Lock an order row for a status transition.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_for_update(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<Option<Order>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM commerce.order WHERE id = $1 FOR UPDATE"
    ))
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Apply a status transition. Legality is the caller's responsibility
/// (`OrderStatus::can_transition_to`).
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order doesn't exist.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn set_status(
    conn: &mut PgConnection,
    order_id: OrderId,
    status: OrderStatus,
) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        r"
        UPDATE commerce.order
        SET status = $2, updated_at = now()
        WHERE id = $1
        RETURNING {ORDER_COLUMNS}
        "
    ))
    .bind(order_id)
    .bind(status)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    Ok(row.into())
}
