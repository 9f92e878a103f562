//! Database operations for the inventory ledger.

use sqlx::{PgConnection, PgPool};

use altiplano_core::{StockId, VariantId, WarehouseId};

use super::RepositoryError;
use crate::models::inventory::{StockLevel, Variant};

/// Internal row type for stock level queries.
#[derive(Debug, sqlx::FromRow)]
struct StockLevelRow {
    id: i32,
    variant_id: i32,
    warehouse_id: i32,
    quantity: i32,
}

impl From<StockLevelRow> for StockLevel {
    fn from(row: StockLevelRow) -> Self {
        Self {
            id: StockId::new(row.id),
            variant_id: VariantId::new(row.variant_id),
            warehouse_id: WarehouseId::new(row.warehouse_id),
            quantity: row.quantity,
        }
    }
}

/// Internal row type for variant queries.
#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    id: i32,
    sku: String,
    list_price: rust_decimal::Decimal,
    sale_price: Option<rust_decimal::Decimal>,
}

impl From<VariantRow> for Variant {
    fn from(row: VariantRow) -> Self {
        Self {
            id: VariantId::new(row.id),
            sku: row.sku,
            list_price: row.list_price,
            sale_price: row.sale_price,
        }
    }
}

/// Repository for pool-scoped inventory reads.
pub struct InventoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InventoryRepository<'a> {
    /// Create a new inventory repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a variant by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_variant(
        &self,
        variant_id: VariantId,
    ) -> Result<Option<Variant>, RepositoryError> {
        let row = sqlx::query_as::<_, VariantRow>(
            r"
            SELECT id, sku, list_price, sale_price
            FROM commerce.variant
            WHERE id = $1
            ",
        )
        .bind(variant_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Total quantity available for a variant across all warehouses.
    ///
    /// An unlocked read: good enough for the advisory pre-check when adding
    /// to a cart, never for the commit itself (the allocator rechecks under
    /// lock).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn total_available(&self, variant_id: VariantId) -> Result<i64, RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            r"
            SELECT COALESCE(SUM(quantity), 0)::bigint
            FROM commerce.stock
            WHERE variant_id = $1
            ",
        )
        .bind(variant_id)
        .fetch_one(self.pool)
        .await?;

        Ok(total)
    }
}

/// Lock all non-empty ledger rows for a variant, in ascending warehouse
/// order.
///
/// The fixed ordering is what keeps two concurrent commits against the same
/// variant from acquiring the rows in opposite order and deadlocking; it is
/// also the waterfall priority (lowest warehouse id drains first).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails or the lock wait
/// exceeds the transaction's `lock_timeout`.
pub async fn lock_levels(
    conn: &mut PgConnection,
    variant_id: VariantId,
) -> Result<Vec<StockLevel>, RepositoryError> {
    let rows = sqlx::query_as::<_, StockLevelRow>(
        r"
        SELECT id, variant_id, warehouse_id, quantity
        FROM commerce.stock
        WHERE variant_id = $1 AND quantity > 0
        ORDER BY warehouse_id ASC
        FOR UPDATE
        ",
    )
    .bind(variant_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Apply one planned decrement to a locked ledger row.
///
/// The `quantity >= $2` guard backs the CHECK constraint: a plan computed
/// from the locked rows can never violate it, so zero rows affected means
/// corruption, not a race.
///
/// # Errors
///
/// Returns `RepositoryError::DataCorruption` if the row no longer holds the
/// planned quantity, `RepositoryError::Database` for other failures.
pub async fn apply_decrement(
    conn: &mut PgConnection,
    stock_id: StockId,
    quantity: i32,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE commerce.stock
        SET quantity = quantity - $2
        WHERE id = $1 AND quantity >= $2
        ",
    )
    .bind(stock_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::DataCorruption(format!(
            "stock row {stock_id} no longer holds {quantity} units under lock"
        )));
    }

    Ok(())
}
