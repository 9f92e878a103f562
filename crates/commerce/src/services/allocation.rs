//! Waterfall stock allocation.
//!
//! Given a required quantity for a variant, drain the variant's ledger rows
//! in ascending warehouse order: take everything a warehouse has until the
//! requirement is met, partially decrementing the last warehouse touched.
//!
//! A total-quantity pre-check outside the transaction is never enough: two
//! concurrent commits can both pass it and jointly oversell. Correctness
//! comes from locking the rows (ascending warehouse order, so concurrent
//! commits cannot deadlock) and re-planning against the locked quantities.

use serde::Serialize;
use sqlx::PgConnection;
use tracing::debug;

use altiplano_core::{StockId, VariantId, WarehouseId};

use super::checkout::CheckoutError;
use crate::db;
use crate::models::inventory::StockLevel;

/// One planned decrement against a ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decrement {
    pub stock_id: StockId,
    pub warehouse_id: WarehouseId,
    pub quantity: i32,
}

/// Plan a waterfall allocation over ledger rows.
///
/// `levels` must already be in drain priority order (the locking query
/// orders by warehouse id ascending). Returns the per-warehouse decrements,
/// or the shortfall when the rows cannot cover `required`.
pub fn plan(levels: &[StockLevel], required: i32) -> Result<Vec<Decrement>, i32> {
    let mut remaining = required;
    let mut decrements = Vec::new();

    for level in levels {
        if remaining == 0 {
            break;
        }
        if level.quantity <= 0 {
            continue;
        }

        let take = remaining.min(level.quantity);
        decrements.push(Decrement {
            stock_id: level.id,
            warehouse_id: level.warehouse_id,
            quantity: take,
        });
        remaining -= take;
    }

    if remaining > 0 {
        return Err(remaining);
    }

    Ok(decrements)
}

/// Reserve `required` units of a variant inside the caller's transaction.
///
/// Locks the variant's ledger rows, plans the waterfall, and applies the
/// decrements. On `InsufficientStock` the caller's rollback undoes any
/// decrements already applied for earlier cart lines; there is no manual
/// compensation.
///
/// # Errors
///
/// Returns `CheckoutError::InsufficientStock` (with the shortfall) when the
/// locked rows cannot cover the requirement, `CheckoutError::StockLockTimeout`
/// when the row locks cannot be acquired within the configured bound.
pub async fn allocate(
    conn: &mut PgConnection,
    variant_id: VariantId,
    required: i32,
) -> Result<Vec<Decrement>, CheckoutError> {
    let levels = db::inventory::lock_levels(conn, variant_id).await?;

    let decrements = plan(&levels, required).map_err(|shortfall| {
        CheckoutError::InsufficientStock {
            variant_id,
            requested: required,
            shortfall,
        }
    })?;

    for decrement in &decrements {
        db::inventory::apply_decrement(conn, decrement.stock_id, decrement.quantity).await?;
    }

    debug!(
        %variant_id,
        required,
        warehouses = decrements.len(),
        "Stock allocated"
    );

    Ok(decrements)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(stock: i32, warehouse: i32, quantity: i32) -> StockLevel {
        StockLevel {
            id: StockId::new(stock),
            variant_id: VariantId::new(1),
            warehouse_id: WarehouseId::new(warehouse),
            quantity,
        }
    }

    #[test]
    fn drains_warehouses_in_priority_order() {
        // Warehouse1=3, Warehouse2=5, request 6: drain W1, take 3 from W2.
        let levels = [level(10, 1, 3), level(11, 2, 5)];

        let decrements = plan(&levels, 6).expect("feasible");

        assert_eq!(
            decrements,
            vec![
                Decrement {
                    stock_id: StockId::new(10),
                    warehouse_id: WarehouseId::new(1),
                    quantity: 3,
                },
                Decrement {
                    stock_id: StockId::new(11),
                    warehouse_id: WarehouseId::new(2),
                    quantity: 3,
                },
            ]
        );
        assert_eq!(decrements.iter().map(|d| d.quantity).sum::<i32>(), 6);
    }

    #[test]
    fn reports_shortfall_when_infeasible() {
        // Warehouse1=3, Warehouse2=5, request 9: short by 1, nothing planned.
        let levels = [level(10, 1, 3), level(11, 2, 5)];

        assert_eq!(plan(&levels, 9), Err(1));
    }

    #[test]
    fn exact_fit_empties_every_warehouse() {
        let levels = [level(10, 1, 3), level(11, 2, 5)];

        let decrements = plan(&levels, 8).expect("feasible");
        assert_eq!(decrements.iter().map(|d| d.quantity).sum::<i32>(), 8);
        assert_eq!(decrements.len(), 2);
    }

    #[test]
    fn single_warehouse_covers_without_touching_the_rest() {
        let levels = [level(10, 1, 10), level(11, 2, 5)];

        let decrements = plan(&levels, 4).expect("feasible");
        assert_eq!(
            decrements,
            vec![Decrement {
                stock_id: StockId::new(10),
                warehouse_id: WarehouseId::new(1),
                quantity: 4,
            }]
        );
    }

    #[test]
    fn empty_ledger_is_fully_short() {
        assert_eq!(plan(&[], 5), Err(5));
    }

    #[test]
    fn skips_exhausted_rows() {
        let levels = [level(10, 1, 0), level(11, 2, 5)];

        let decrements = plan(&levels, 2).expect("feasible");
        assert_eq!(decrements.len(), 1);
        assert_eq!(
            decrements.first().map(|d| d.warehouse_id),
            Some(WarehouseId::new(2))
        );
    }
}
