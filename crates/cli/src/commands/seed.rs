//! Inventory seeding.
//!
//! Stands in for the inventory-management collaborator: creates the demo
//! warehouses and variants and sets their stock levels. Idempotent - re-runs
//! update quantities in place.

use rust_decimal::Decimal;

use super::CommandError;

/// (warehouse name, address)
const WAREHOUSES: &[(&str, &str)] = &[
    ("Tienda Principal", "Av. 16 de Julio 1490, La Paz"),
    ("Bodega Online", "Parque Industrial, El Alto"),
];

/// (sku, list price, sale price)
const VARIANTS: &[(&str, &str, Option<&str>)] = &[
    ("POLERA-S-ROJO", "120.00", None),
    ("POLERA-M-ROJO", "120.00", Some("99.50")),
    ("POLERA-L-ROJO", "120.00", None),
    ("CHOMPA-M-GRIS", "280.00", None),
    ("CHOMPA-L-GRIS", "280.00", Some("240.00")),
];

/// (sku, warehouse name, quantity)
const STOCK: &[(&str, &str, i32)] = &[
    ("POLERA-S-ROJO", "Tienda Principal", 12),
    ("POLERA-S-ROJO", "Bodega Online", 30),
    ("POLERA-M-ROJO", "Tienda Principal", 3),
    ("POLERA-M-ROJO", "Bodega Online", 5),
    ("POLERA-L-ROJO", "Bodega Online", 18),
    ("CHOMPA-M-GRIS", "Tienda Principal", 7),
    ("CHOMPA-L-GRIS", "Tienda Principal", 2),
    ("CHOMPA-L-GRIS", "Bodega Online", 9),
];

/// Seed warehouses, variants, and stock levels.
///
/// # Errors
///
/// Returns `CommandError` if the database is unreachable or an insert fails.
pub async fn inventory() -> Result<(), CommandError> {
    let pool = super::connect().await?;

    for &(name, address) in WAREHOUSES {
        sqlx::query(
            r"
            INSERT INTO commerce.warehouse (name, address)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET address = EXCLUDED.address
            ",
        )
        .bind(name)
        .bind(address)
        .execute(&pool)
        .await?;
    }
    tracing::info!(count = WAREHOUSES.len(), "Warehouses seeded");

    for &(sku, list_price, sale_price) in VARIANTS {
        let list: Decimal = list_price
            .parse()
            .map_err(|_| CommandError::InvalidSeedData(format!("list price for {sku}")))?;
        let sale: Option<Decimal> = sale_price
            .map(str::parse)
            .transpose()
            .map_err(|_| CommandError::InvalidSeedData(format!("sale price for {sku}")))?;

        sqlx::query(
            r"
            INSERT INTO commerce.variant (sku, list_price, sale_price)
            VALUES ($1, $2, $3)
            ON CONFLICT (sku) DO UPDATE
                SET list_price = EXCLUDED.list_price,
                    sale_price = EXCLUDED.sale_price
            ",
        )
        .bind(sku)
        .bind(list)
        .bind(sale)
        .execute(&pool)
        .await?;
    }
    tracing::info!(count = VARIANTS.len(), "Variants seeded");

    for &(sku, warehouse, quantity) in STOCK {
        sqlx::query(
            r"
            INSERT INTO commerce.stock (variant_id, warehouse_id, quantity)
            SELECT v.id, w.id, $3
            FROM commerce.variant v, commerce.warehouse w
            WHERE v.sku = $1 AND w.name = $2
            ON CONFLICT (variant_id, warehouse_id)
                DO UPDATE SET quantity = EXCLUDED.quantity
            ",
        )
        .bind(sku)
        .bind(warehouse)
        .bind(quantity)
        .execute(&pool)
        .await?;
    }
    tracing::info!(count = STOCK.len(), "Stock levels seeded");

    Ok(())
}
