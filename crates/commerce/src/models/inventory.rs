//! Inventory ledger models: warehouses, variants, per-warehouse stock.

use rust_decimal::Decimal;
use serde::Serialize;

use altiplano_core::{StockId, VariantId, WarehouseId};

/// A physical or logical warehouse.
#[derive(Debug, Clone, Serialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    pub name: String,
    pub address: String,
    pub active: bool,
}

/// A purchasable SKU: a product plus a fixed attribute combination.
///
/// Only the fields the commit engine needs; the catalog proper lives
/// elsewhere.
#[derive(Debug, Clone, Serialize)]
pub struct Variant {
    pub id: VariantId,
    pub sku: String,
    pub list_price: Decimal,
    pub sale_price: Option<Decimal>,
}

impl Variant {
    /// The price a cart line is charged: the sale price when one is set,
    /// otherwise the list price.
    #[must_use]
    pub fn effective_unit_price(&self) -> Decimal {
        self.sale_price.unwrap_or(self.list_price)
    }
}

/// One ledger entry: available quantity of a variant in a warehouse.
///
/// Mutated only by the allocator under row locks; never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockLevel {
    pub id: StockId,
    pub variant_id: VariantId,
    pub warehouse_id: WarehouseId,
    pub quantity: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sale_price_wins_when_present() {
        let variant = Variant {
            id: VariantId::new(1),
            sku: "POLERA-M-ROJO".to_string(),
            list_price: Decimal::new(120_00, 2),
            sale_price: Some(Decimal::new(99_50, 2)),
        };
        assert_eq!(variant.effective_unit_price(), Decimal::new(99_50, 2));
    }

    #[test]
    fn list_price_applies_without_a_sale() {
        let variant = Variant {
            id: VariantId::new(1),
            sku: "POLERA-M-ROJO".to_string(),
            list_price: Decimal::new(120_00, 2),
            sale_price: None,
        };
        assert_eq!(variant.effective_unit_price(), Decimal::new(120_00, 2));
    }
}
