//! Database operations for carts and cart lines.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use altiplano_core::{CartId, CartLineId, UserId, VariantId};

use super::RepositoryError;
use crate::models::cart::{Cart, CartLine, PricedCartLine};

/// Internal row type for cart queries.
#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: Uuid,
    user_id: Option<i32>,
    session_token: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: CartId::new(row.id),
            user_id: row.user_id.map(UserId::new),
            session_token: row.session_token,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Internal row type for cart line queries.
#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: i32,
    cart_id: Uuid,
    variant_id: i32,
    quantity: i32,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        Self {
            id: CartLineId::new(row.id),
            cart_id: CartId::new(row.cart_id),
            variant_id: VariantId::new(row.variant_id),
            quantity: row.quantity,
        }
    }
}

/// Internal row type for priced cart line queries.
#[derive(Debug, sqlx::FromRow)]
struct PricedCartLineRow {
    variant_id: i32,
    sku: String,
    quantity: i32,
    unit_price: rust_decimal::Decimal,
}

impl From<PricedCartLineRow> for PricedCartLine {
    fn from(row: PricedCartLineRow) -> Self {
        Self {
            variant_id: VariantId::new(row.variant_id),
            sku: row.sku,
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

const PRICED_LINES_SQL: &str = r"
    SELECT
        l.variant_id,
        v.sku,
        l.quantity,
        COALESCE(v.sale_price, v.list_price) AS unit_price
    FROM commerce.cart_line l
    INNER JOIN commerce.variant v ON v.id = l.variant_id
    WHERE l.cart_id = $1
    ORDER BY l.id ASC
";

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the cart owned by a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, user_id, session_token, created_at, updated_at
            FROM commerce.cart
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Get the cart keyed by an anonymous session token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_session(&self, token: &str) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, user_id, session_token, created_at, updated_at
            FROM commerce.cart
            WHERE session_token = $1
            ",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Create a cart owned by a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already has a cart.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_for_user(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO commerce.cart (user_id)
            VALUES ($1)
            RETURNING id, user_id, session_token, created_at, updated_at
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await
        .map_err(unique_violation_to_conflict)?;

        Ok(row.into())
    }

    /// Create a cart keyed by an anonymous session token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the token already has a cart.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_for_session(&self, token: &str) -> Result<Cart, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO commerce.cart (session_token)
            VALUES ($1)
            RETURNING id, user_id, session_token, created_at, updated_at
            ",
        )
        .bind(token)
        .fetch_one(self.pool)
        .await
        .map_err(unique_violation_to_conflict)?;

        Ok(row.into())
    }

    /// Re-key an anonymous cart to a user (the "claim" half of
    /// merge-on-login).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cart doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn claim(&self, cart_id: CartId, user_id: UserId) -> Result<Cart, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            UPDATE commerce.cart
            SET user_id = $2, session_token = NULL, updated_at = now()
            WHERE id = $1
            RETURNING id, user_id, session_token, created_at, updated_at
            ",
        )
        .bind(cart_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Merge the source cart's lines into the target cart (quantities summed
    /// per variant) and delete the source. Both steps in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn merge_and_delete(
        &self,
        target: CartId,
        source: CartId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO commerce.cart_line (cart_id, variant_id, quantity)
            SELECT $1, variant_id, quantity
            FROM commerce.cart_line
            WHERE cart_id = $2
            ON CONFLICT (cart_id, variant_id)
            DO UPDATE SET quantity = cart_line.quantity + EXCLUDED.quantity
            ",
        )
        .bind(target)
        .bind(source)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM commerce.cart WHERE id = $1")
            .bind(source)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE commerce.cart SET updated_at = now() WHERE id = $1")
            .bind(target)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Current quantity of a variant in a cart, if the line exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn line_quantity(
        &self,
        cart_id: CartId,
        variant_id: VariantId,
    ) -> Result<Option<i32>, RepositoryError> {
        let quantity: Option<i32> = sqlx::query_scalar(
            r"
            SELECT quantity
            FROM commerce.cart_line
            WHERE cart_id = $1 AND variant_id = $2
            ",
        )
        .bind(cart_id)
        .bind(variant_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(quantity)
    }

    /// Add a variant to a cart, summing quantities if the line exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_line(
        &self,
        cart_id: CartId,
        variant_id: VariantId,
        quantity: i32,
    ) -> Result<CartLine, RepositoryError> {
        let row = sqlx::query_as::<_, CartLineRow>(
            r"
            INSERT INTO commerce.cart_line (cart_id, variant_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, variant_id)
            DO UPDATE SET quantity = cart_line.quantity + EXCLUDED.quantity
            RETURNING id, cart_id, variant_id, quantity
            ",
        )
        .bind(cart_id)
        .bind(variant_id)
        .bind(quantity)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Set the quantity of an existing cart line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_line_quantity(
        &self,
        cart_id: CartId,
        variant_id: VariantId,
        quantity: i32,
    ) -> Result<CartLine, RepositoryError> {
        let row = sqlx::query_as::<_, CartLineRow>(
            r"
            UPDATE commerce.cart_line
            SET quantity = $3
            WHERE cart_id = $1 AND variant_id = $2
            RETURNING id, cart_id, variant_id, quantity
            ",
        )
        .bind(cart_id)
        .bind(variant_id)
        .bind(quantity)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Remove a variant's line from a cart.
    ///
    /// # Returns
    ///
    /// Returns `true` if a line was removed, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove_line(
        &self,
        cart_id: CartId,
        variant_id: VariantId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM commerce.cart_line
            WHERE cart_id = $1 AND variant_id = $2
            ",
        )
        .bind(cart_id)
        .bind(variant_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Cart lines joined with SKU and effective unit price.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn priced_lines(
        &self,
        cart_id: CartId,
    ) -> Result<Vec<PricedCartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, PricedCartLineRow>(PRICED_LINES_SQL)
            .bind(cart_id)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Cart lines with pricing, read inside the commit transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn priced_lines(
    conn: &mut PgConnection,
    cart_id: CartId,
) -> Result<Vec<PricedCartLine>, RepositoryError> {
    let rows = sqlx::query_as::<_, PricedCartLineRow>(PRICED_LINES_SQL)
        .bind(cart_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Delete a cart (lines cascade), inside the commit transaction.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the cart was already gone - the
/// commit must fail loudly rather than silently double-convert.
pub async fn delete(conn: &mut PgConnection, cart_id: CartId) -> Result<(), RepositoryError> {
    let result = sqlx::query("DELETE FROM commerce.cart WHERE id = $1")
        .bind(cart_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }

    Ok(())
}

fn unique_violation_to_conflict(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict("cart already exists for this owner".to_string());
    }
    RepositoryError::Database(e)
}
