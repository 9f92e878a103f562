//! Database operations for live shipping addresses.

use sqlx::PgPool;

use altiplano_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::address::{Address, NewAddress};

/// Internal row type for address queries.
#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: i32,
    user_id: i32,
    full_name: String,
    street: String,
    apartment: Option<String>,
    city: String,
    region: String,
    country: String,
    postal_code: String,
    phone: Option<String>,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: AddressId::new(row.id),
            user_id: UserId::new(row.user_id),
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

const ADDRESS_COLUMNS: &str =
    "id, user_id, full_name, street, apartment, city, region, country, postal_code, phone";

/// Repository for address database operations.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an address for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        user_id: UserId,
        input: &NewAddress,
    ) -> Result<Address, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(&format!(
            r"
            INSERT INTO commerce.address
                (user_id, full_name, street, apartment, city, region, country, postal_code, phone)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ADDRESS_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(&input.full_name)
        .bind(&input.street)
        .bind(&input.apartment)
        .bind(&input.city)
        .bind(&input.region)
        .bind(&input.country)
        .bind(&input.postal_code)
        .bind(&input.phone)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Get an address by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, address_id: AddressId) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM commerce.address WHERE id = $1"
        ))
        .bind(address_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// List a user's addresses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows = sqlx::query_as::<_, AddressRow>(&format!(
            r"
            SELECT {ADDRESS_COLUMNS}
            FROM commerce.address
            WHERE user_id = $1
            ORDER BY id ASC
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
