//! Cart resolution and mutation.
//!
//! Every request works on exactly one cart: the signed-in user's, or the one
//! bound to the anonymous session key. Anonymous carts are emptied when they
//! sit idle longer than the configured window.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use thiserror::Error;

use novel_cart_core::{CartItemId, NovelId, Quantity, QuantityDelta, QuantityError, UserId};

use crate::config::CartPolicy;
use crate::db::{CartRepository, NovelRepository, RepositoryError};
use crate::models::{Cart, CartView};

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The novel to add does not exist.
    #[error("novel does not exist")]
    NovelNotFound,

    /// The line does not exist in the caller's cart.
    #[error("cart item does not exist")]
    ItemNotFound,

    /// The cart vanished between resolution and use.
    #[error("cart does not exist")]
    CartNotFound,

    /// The resulting line quantity is not storable.
    #[error(transparent)]
    Quantity(#[from] QuantityError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CartError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::CartNotFound,
            RepositoryError::OutOfRange(_) => Self::Quantity(QuantityError::OutOfRange),
            other => Self::Repository(other),
        }
    }
}

/// Who is asking for a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartRequester {
    /// A signed-in user.
    User(UserId),
    /// An anonymous session with its cart key and last cart access.
    Anonymous {
        session_key: String,
        last_activity: Option<DateTime<Utc>>,
    },
}

/// Whether an anonymous cart last touched at `last` has gone idle by `now`.
///
/// The window is exclusive: a cart idle for exactly the timeout is kept.
#[must_use]
pub fn idle_expired(policy: &CartPolicy, last: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    !policy.persist_after_idle && now - last > policy.idle_timeout
}

/// Cart service.
pub struct CartService<'a> {
    carts: CartRepository<'a>,
    novels: NovelRepository<'a>,
    policy: CartPolicy,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool, policy: CartPolicy) -> Self {
        Self {
            carts: CartRepository::new(pool),
            novels: NovelRepository::new(pool),
            policy,
        }
    }

    /// Locate or create the requester's cart.
    ///
    /// An existing anonymous cart that has been idle past the policy window
    /// is emptied before it is returned; the cart row itself is kept.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if a query fails.
    pub async fn resolve(
        &self,
        requester: &CartRequester,
        now: DateTime<Utc>,
    ) -> Result<Cart, CartError> {
        match requester {
            CartRequester::User(user_id) => Ok(self.carts.get_or_create_for_user(*user_id).await?),
            CartRequester::Anonymous {
                session_key,
                last_activity,
            } => {
                let Some(cart) = self.carts.find_by_session_key(session_key).await? else {
                    return Ok(self.carts.get_or_create_for_session(session_key).await?);
                };

                if let Some(last) = *last_activity
                    && idle_expired(&self.policy, last, now)
                {
                    let removed = self.carts.clear(cart.id).await?;
                    tracing::debug!(cart_id = %cart.id, removed, "emptied idle anonymous cart");
                }

                Ok(cart)
            }
        }
    }

    /// Current view of a cart, re-read so timestamps reflect the last write.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CartNotFound` if the cart has been deleted.
    /// Returns `CartError::Repository` if a query fails.
    pub async fn view(&self, cart: &Cart) -> Result<CartView, CartError> {
        let cart = self
            .carts
            .get(cart.id)
            .await?
            .ok_or(CartError::CartNotFound)?;
        let items = self.carts.items(cart.id).await?;
        Ok(CartView::new(&cart, items))
    }

    /// Add copies of a novel; an existing line grows by `quantity`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NovelNotFound` if the novel does not exist.
    /// Returns `CartError::Quantity` if the line would exceed the quantity
    /// limit.
    pub async fn add(
        &self,
        cart: &Cart,
        novel_id: NovelId,
        quantity: Quantity,
    ) -> Result<CartView, CartError> {
        if self.novels.get_by_id(novel_id).await?.is_none() {
            return Err(CartError::NovelNotFound);
        }

        let item_id = self.carts.add_item(cart.id, novel_id, quantity).await?;
        tracing::debug!(cart_id = %cart.id, %item_id, %novel_id, quantity = quantity.get(), "added to cart");

        self.view(cart).await
    }

    /// Change a line's quantity by `delta`, deleting it if the result is
    /// zero or less.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the line is not in this cart.
    /// Returns `CartError::Quantity` if the result exceeds the quantity limit.
    pub async fn adjust(
        &self,
        cart: &Cart,
        item_id: CartItemId,
        delta: QuantityDelta,
    ) -> Result<CartView, CartError> {
        let item = self
            .carts
            .find_item(cart.id, item_id)
            .await?
            .ok_or(CartError::ItemNotFound)?;

        let updated = match item.quantity.adjust(delta)? {
            Some(quantity) => self.carts.set_item_quantity(cart.id, item_id, quantity).await?,
            None => self.carts.remove_item(cart.id, item_id).await?,
        };
        if !updated {
            return Err(CartError::ItemNotFound);
        }

        self.view(cart).await
    }

    /// Delete a line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the line is not in this cart.
    pub async fn remove(&self, cart: &Cart, item_id: CartItemId) -> Result<CartView, CartError> {
        if !self.carts.remove_item(cart.id, item_id).await? {
            return Err(CartError::ItemNotFound);
        }
        self.view(cart).await
    }

    /// Delete every line, keeping the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if a query fails.
    pub async fn clear(&self, cart: &Cart) -> Result<CartView, CartError> {
        self.carts.clear(cart.id).await?;
        self.view(cart).await
    }

    /// Fold an anonymous session's cart into the user's cart after sign-in.
    ///
    /// An idle-expired anonymous cart is discarded instead of merged. Returns
    /// the number of lines moved.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if a query fails.
    pub async fn merge_into_user(
        &self,
        session_key: &str,
        last_activity: Option<DateTime<Utc>>,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<u64, CartError> {
        let Some(anonymous) = self.carts.find_by_session_key(session_key).await? else {
            return Ok(0);
        };

        if let Some(last) = last_activity
            && idle_expired(&self.policy, last, now)
        {
            self.carts.delete(anonymous.id).await?;
            return Ok(0);
        }

        let owned = self.carts.get_or_create_for_user(user_id).await?;
        let moved = self.carts.merge(anonymous.id, owned.id).await?;
        tracing::info!(%user_id, from = %anonymous.id, into = %owned.id, moved, "merged anonymous cart");

        Ok(moved)
    }

    /// Empty the user's cart, if they have one.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if a query fails.
    pub async fn clear_for_user(&self, user_id: UserId) -> Result<u64, CartError> {
        Ok(self.carts.clear_for_user(user_id).await?)
    }
}
