//! Cart service: lazy creation, merge-on-login, line management.

use sqlx::PgPool;
use tracing::{info, instrument};

use altiplano_core::VariantId;

use crate::db::{CartRepository, InventoryRepository, RepositoryError};
use crate::error::AppError;
use crate::identity::RequestIdentity;
use crate::models::cart::{Cart, CartView, cart_total};

/// Cart operations for both anonymous visitors and authenticated users.
pub struct CartService<'a> {
    pool: &'a PgPool,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get or create the cart for this identity, merging on login.
    ///
    /// When the request carries both a user id and a session token, the
    /// anonymous cart (if any) is folded into the user's: quantities are
    /// summed per variant and the anonymous cart is deleted. A user with no
    /// cart of their own simply claims the anonymous one.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the request carries no identity at
    /// all; database failures map to `AppError::Database`.
    #[instrument(skip(self, identity))]
    pub async fn resolve(&self, identity: &RequestIdentity) -> Result<Cart, AppError> {
        let carts = CartRepository::new(self.pool);

        if let Some(user_id) = identity.user_id {
            let anonymous = match identity.session_token.as_deref() {
                Some(token) => carts.get_by_session(token).await?,
                None => None,
            };

            return match carts.get_by_user(user_id).await? {
                Some(cart) => {
                    if let Some(anon) = anonymous
                        && anon.id != cart.id
                    {
                        carts.merge_and_delete(cart.id, anon.id).await?;
                        info!(cart_id = %cart.id, merged_from = %anon.id, "Merged anonymous cart on login");
                    }
                    Ok(cart)
                }
                None => {
                    if let Some(anon) = anonymous {
                        // The anonymous cart becomes the user's cart.
                        let claimed = carts.claim(anon.id, user_id).await?;
                        info!(cart_id = %claimed.id, "Anonymous cart claimed on login");
                        Ok(claimed)
                    } else {
                        Ok(carts.create_for_user(user_id).await?)
                    }
                }
            };
        }

        let Some(token) = identity.session_token.as_deref() else {
            return Err(AppError::BadRequest(
                "request carries no identity".to_string(),
            ));
        };

        match carts.get_by_session(token).await? {
            Some(cart) => Ok(cart),
            None => Ok(carts.create_for_session(token).await?),
        }
    }

    /// The cart with priced lines and total, as returned to clients.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` on query failure.
    pub async fn view(&self, cart: &Cart) -> Result<CartView, AppError> {
        let lines = CartRepository::new(self.pool).priced_lines(cart.id).await?;
        let total = cart_total(&lines);

        Ok(CartView {
            id: cart.id,
            lines,
            total,
            session_token: cart.session_token.clone(),
        })
    }

    /// Add a variant to the cart, summing quantities if already present.
    ///
    /// The stock check here is advisory - a courtesy rejection for obviously
    /// unfillable lines. The allocator re-checks under lock at commit time.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a non-positive quantity or an
    /// unfillable total, `AppError::NotFound` for an unknown variant.
    pub async fn add_line(
        &self,
        cart: &Cart,
        variant_id: VariantId,
        quantity: i32,
    ) -> Result<CartView, AppError> {
        if quantity < 1 {
            return Err(AppError::BadRequest("quantity must be at least 1".to_string()));
        }

        let carts = CartRepository::new(self.pool);
        let existing = carts.line_quantity(cart.id, variant_id).await?.unwrap_or(0);
        self.check_available(variant_id, existing + quantity).await?;

        carts.upsert_line(cart.id, variant_id, quantity).await?;
        self.view(cart).await
    }

    /// Set the quantity of an existing cart line.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a non-positive or unfillable
    /// quantity, `AppError::NotFound` if the line doesn't exist.
    pub async fn set_line(
        &self,
        cart: &Cart,
        variant_id: VariantId,
        quantity: i32,
    ) -> Result<CartView, AppError> {
        if quantity < 1 {
            return Err(AppError::BadRequest("quantity must be at least 1".to_string()));
        }

        self.check_available(variant_id, quantity).await?;

        match CartRepository::new(self.pool)
            .set_line_quantity(cart.id, variant_id, quantity)
            .await
        {
            Ok(_) => self.view(cart).await,
            Err(RepositoryError::NotFound) => {
                Err(AppError::NotFound("cart line not found".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a variant's line from the cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the line doesn't exist.
    pub async fn remove_line(
        &self,
        cart: &Cart,
        variant_id: VariantId,
    ) -> Result<CartView, AppError> {
        let removed = CartRepository::new(self.pool)
            .remove_line(cart.id, variant_id)
            .await?;

        if !removed {
            return Err(AppError::NotFound("cart line not found".to_string()));
        }

        self.view(cart).await
    }

    /// Advisory check that the ledger can plausibly cover `requested` units.
    async fn check_available(
        &self,
        variant_id: VariantId,
        requested: i32,
    ) -> Result<(), AppError> {
        let inventory = InventoryRepository::new(self.pool);

        if inventory.get_variant(variant_id).await?.is_none() {
            return Err(AppError::NotFound(format!("variant {variant_id} not found")));
        }

        let available = inventory.total_available(variant_id).await?;
        if i64::from(requested) > available {
            return Err(AppError::BadRequest(format!(
                "insufficient stock: available {available}, requested {requested}"
            )));
        }

        Ok(())
    }
}
