//! Live shipping addresses.
//!
//! These rows are mutable and owned by a user; the commit engine reads one
//! once to produce the immutable per-order snapshot.

use serde::{Deserialize, Serialize};

use altiplano_core::{AddressId, UserId};

/// A user's shipping address.
#[derive(Debug, Clone, Serialize)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub full_name: String,
    pub street: String,
    pub apartment: Option<String>,
    pub city: String,
    pub region: String,
    pub country: String,
    pub postal_code: String,
    pub phone: Option<String>,
}

/// Input for creating an address.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAddress {
    pub full_name: String,
    pub street: String,
    pub apartment: Option<String>,
    pub city: String,
    pub region: String,
    pub country: String,
    pub postal_code: String,
    pub phone: Option<String>,
}
