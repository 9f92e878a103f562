//! Database operations for payment attempts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use altiplano_core::{OrderId, PaymentId, PaymentMethod, PaymentStatus};

use super::RepositoryError;
use crate::models::payment::Payment;

/// Internal row type for payment queries.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    order_id: Uuid,
    amount: Decimal,
    method: PaymentMethod,
    status: PaymentStatus,
    gateway_transaction_id: Option<String>,
    proof_reference: Option<String>,
    admin_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Self {
            id: PaymentId::new(row.id),
            order_id: OrderId::new(row.order_id),
            amount: row.amount,
            method: row.method,
            status: row.status,
            gateway_transaction_id: row.gateway_transaction_id,
            proof_reference: row.proof_reference,
            admin_notes: row.admin_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const PAYMENT_COLUMNS: &str = "id, order_id, amount, method, status, gateway_transaction_id, \
                               proof_reference, admin_notes, created_at, updated_at";

/// Repository for payment database operations.
pub struct PaymentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PaymentRepository<'a> {
    /// Create a new payment repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a pending payment attempt. The amount is copied from the
    /// order total by the caller, never taken from client input.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        order_id: OrderId,
        amount: Decimal,
        method: PaymentMethod,
    ) -> Result<Payment, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            r"
            INSERT INTO commerce.payment (order_id, amount, method)
            VALUES ($1, $2, $3)
            RETURNING {PAYMENT_COLUMNS}
            "
        ))
        .bind(order_id)
        .bind(amount)
        .bind(method)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Get a payment by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, payment_id: PaymentId) -> Result<Option<Payment>, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM commerce.payment WHERE id = $1"
        ))
        .bind(payment_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Store the gateway transaction id issued for a card charge intent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the payment doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_gateway_transaction_id(
        &self,
        payment_id: PaymentId,
        transaction_id: &str,
    ) -> Result<Payment, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            r"
            UPDATE commerce.payment
            SET gateway_transaction_id = $2, updated_at = now()
            WHERE id = $1
            RETURNING {PAYMENT_COLUMNS}
            "
        ))
        .bind(payment_id)
        .bind(transaction_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Mark a payment failed outside any order transition (gateway refused
    /// the charge intent outright).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the payment doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn mark_failed(&self, payment_id: PaymentId) -> Result<Payment, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            r"
            UPDATE commerce.payment
            SET status = 'failed', updated_at = now()
            WHERE id = $1
            RETURNING {PAYMENT_COLUMNS}
            "
        ))
        .bind(payment_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }
}

/// Lock a payment row for a state transition.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_for_update(
    conn: &mut PgConnection,
    payment_id: PaymentId,
) -> Result<Option<Payment>, RepositoryError> {
    let row = sqlx::query_as::<_, PaymentRow>(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM commerce.payment WHERE id = $1 FOR UPDATE"
    ))
    .bind(payment_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Lock the payment matching a gateway transaction id.
///
/// This is how webhook deliveries find the attempt they confirm; the lock
/// serializes duplicate deliveries of the same event.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_by_gateway_transaction_for_update(
    conn: &mut PgConnection,
    transaction_id: &str,
) -> Result<Option<Payment>, RepositoryError> {
    let row = sqlx::query_as::<_, PaymentRow>(&format!(
        r"
        SELECT {PAYMENT_COLUMNS}
        FROM commerce.payment
        WHERE gateway_transaction_id = $1
        FOR UPDATE
        "
    ))
    .bind(transaction_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Apply a payment status change inside a transition transaction.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the payment doesn't exist.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn set_status(
    conn: &mut PgConnection,
    payment_id: PaymentId,
    status: PaymentStatus,
    admin_notes: Option<&str>,
) -> Result<Payment, RepositoryError> {
    let row = sqlx::query_as::<_, PaymentRow>(&format!(
        r"
        UPDATE commerce.payment
        SET status = $2,
            admin_notes = COALESCE($3, admin_notes),
            updated_at = now()
        WHERE id = $1
        RETURNING {PAYMENT_COLUMNS}
        "
    ))
    .bind(payment_id)
    .bind(status)
    .bind(admin_notes)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    Ok(row.into())
}

/// Attach an uploaded proof-of-payment reference, inside the transition
/// transaction that also flips the order to awaiting verification.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the payment doesn't exist.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn attach_proof(
    conn: &mut PgConnection,
    payment_id: PaymentId,
    proof_reference: &str,
) -> Result<Payment, RepositoryError> {
    let row = sqlx::query_as::<_, PaymentRow>(&format!(
        r"
        UPDATE commerce.payment
        SET proof_reference = $2, updated_at = now()
        WHERE id = $1
        RETURNING {PAYMENT_COLUMNS}
        "
    ))
    .bind(payment_id)
    .bind(proof_reference)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    Ok(row.into())
}
