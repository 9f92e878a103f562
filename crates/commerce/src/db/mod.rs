//! Database operations for the commerce `PostgreSQL` schema.
//!
//! # Tables (schema `commerce`)
//!
//! - `warehouse`, `variant`, `stock` - the inventory ledger
//! - `cart`, `cart_line` - mutable carts (user XOR session owned)
//! - `address` - live shipping addresses
//! - `order`, `order_address`, `order_line`, `allocation` - immutable orders
//! - `payment` - payment attempts
//!
//! # Migrations
//!
//! Migrations are stored in `crates/commerce/migrations/` and run via:
//! ```bash
//! cargo run -p altiplano-cli -- migrate run
//! ```
//!
//! Queries use sqlx's runtime-checked API with `FromRow` row types mapped
//! into the domain models. Functions that must participate in the commit
//! transaction take `&mut PgConnection`; pool-scoped repositories cover the
//! rest.

pub mod addresses;
pub mod carts;
pub mod inventory;
pub mod orders;
pub mod payments;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;

pub use addresses::AddressRepository;
pub use carts::CartRepository;
pub use inventory::InventoryRepository;
pub use orders::OrderRepository;
pub use payments::PaymentRepository;

/// `PostgreSQL` error code for a lock wait that exceeded `lock_timeout`.
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate cart line).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Whether this error is a row-lock wait that hit the configured
    /// `lock_timeout`.
    #[must_use]
    pub fn is_lock_timeout(&self) -> bool {
        if let Self::Database(sqlx::Error::Database(db_err)) = self {
            return db_err.code().as_deref() == Some(LOCK_NOT_AVAILABLE);
        }
        false
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Begin a transaction with an explicit bounded lock wait.
///
/// Every commit/transition transaction goes through here so a blocked stock
/// or payment row lock fails deterministically instead of inheriting the
/// engine default.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the transaction cannot be started.
pub async fn begin_with_lock_timeout(
    pool: &PgPool,
    lock_timeout_ms: u64,
) -> Result<Transaction<'_, Postgres>, RepositoryError> {
    let mut tx = pool.begin().await?;
    // SET LOCAL does not accept bind parameters; the value is a u64, not
    // user input.
    sqlx::query(&format!("SET LOCAL lock_timeout = '{lock_timeout_ms}ms'"))
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}
