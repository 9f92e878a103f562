//! Order models.
//!
//! Orders are immutable after creation except for `status`. Line prices and
//! the shipping address are snapshots frozen at commit time; later edits to
//! the variant or the live address never touch a placed order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use altiplano_core::{
    AllocationId, OrderId, OrderLineId, OrderStatus, UserId, VariantId, WarehouseId,
};

/// An order.
///
/// `user_id` is nullable so the record survives account deletion;
/// `customer_email` is denormalized for the same reason.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    pub customer_email: String,
    pub total: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One purchased line: quantity and the unit price at time of purchase.
#[derive(Debug, Clone, Serialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub variant_id: VariantId,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl OrderLine {
    /// Line subtotal (quantity x snapshot unit price).
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}

/// The shipping address frozen at commit time, 1:1 with the order.
#[derive(Debug, Clone, Serialize)]
pub struct AddressSnapshot {
    pub full_name: String,
    pub street: String,
    pub apartment: Option<String>,
    pub city: String,
    pub region: String,
    pub country: String,
    pub postal_code: String,
    pub phone: Option<String>,
}

impl From<&crate::models::address::Address> for AddressSnapshot {
    fn from(address: &crate::models::address::Address) -> Self {
        Self {
            full_name: address.full_name.clone(),
            street: address.street.clone(),
            apartment: address.apartment.clone(),
            city: address.city.clone(),
            region: address.region.clone(),
            country: address.country.clone(),
            postal_code: address.postal_code.clone(),
            phone: address.phone.clone(),
        }
    }
}

/// One per-warehouse decrement recorded by the allocator.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationRecord {
    pub id: AllocationId,
    pub order_id: OrderId,
    pub variant_id: VariantId,
    pub warehouse_id: WarehouseId,
    pub quantity: i32,
}

/// An order with its lines, address snapshot, and allocation audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub shipping_address: AddressSnapshot,
    pub allocations: Vec<AllocationRecord>,
}
