//! Cart and cart line repository.
//!
//! A cart is owned either by a user (`user_id`) or by an anonymous session
//! (`session_key`), never both. Lines are unique per `(cart_id, novel_id)`;
//! adding a novel that is already in the cart grows the existing line.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use novel_cart_core::{CartId, CartItemId, NovelId, Quantity, UserId};

use super::{RepositoryError, out_of_range_or};
use super::novels::{NOVEL_COLUMNS, NovelRow};
use crate::models::{Cart, CartItem, CartOwner, Novel};

const CART_COLUMNS: &str = "id, user_id, session_key, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartId,
    user_id: Option<UserId>,
    session_key: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartRow> for Cart {
    type Error = RepositoryError;

    fn try_from(r: CartRow) -> Result<Self, Self::Error> {
        let owner = match (r.user_id, r.session_key) {
            (Some(user_id), None) => CartOwner::User(user_id),
            (None, Some(key)) => CartOwner::Session(key),
            _ => {
                return Err(RepositoryError::DataCorruption(format!(
                    "cart {} must have exactly one owner",
                    r.id
                )));
            }
        };

        Ok(Self {
            id: r.id,
            owner,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    item_id: CartItemId,
    quantity: i64,
    #[sqlx(flatten)]
    novel: NovelRow,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(r: CartItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(r.quantity)
            .ok()
            .and_then(|q| Quantity::new(q).ok())
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "invalid quantity {} on cart item {}",
                    r.quantity, r.item_id
                ))
            })?;

        Ok(Self {
            id: r.item_id,
            novel: Novel::try_from(r.novel)?,
            quantity,
        })
    }
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the user's cart, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create_for_user(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let now = Utc::now();
        sqlx::query(
            r"
            INSERT INTO carts (user_id, created_at, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT (user_id) DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await?;

        let row: CartRow =
            sqlx::query_as(&format!("SELECT {CART_COLUMNS} FROM carts WHERE user_id = ?"))
                .bind(user_id)
                .fetch_one(self.pool)
                .await?;

        Cart::try_from(row)
    }

    /// Get a cart by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, cart_id: CartId) -> Result<Option<Cart>, RepositoryError> {
        let row: Option<CartRow> =
            sqlx::query_as(&format!("SELECT {CART_COLUMNS} FROM carts WHERE id = ?"))
                .bind(cart_id)
                .fetch_optional(self.pool)
                .await?;

        row.map(Cart::try_from).transpose()
    }

    /// Find the cart bound to an anonymous session key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_session_key(&self, key: &str) -> Result<Option<Cart>, RepositoryError> {
        let row: Option<CartRow> = sqlx::query_as(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE session_key = ?"
        ))
        .bind(key)
        .fetch_optional(self.pool)
        .await?;

        row.map(Cart::try_from).transpose()
    }

    /// Get the cart bound to an anonymous session key, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create_for_session(&self, key: &str) -> Result<Cart, RepositoryError> {
        let now = Utc::now();
        sqlx::query(
            r"
            INSERT INTO carts (session_key, created_at, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT (session_key) DO NOTHING
            ",
        )
        .bind(key)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await?;

        self.find_by_session_key(key)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// All lines of a cart with their novels, oldest line first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored line is invalid.
    pub async fn items(&self, cart_id: CartId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows: Vec<CartItemRow> = sqlx::query_as(&format!(
            r"
            SELECT ci.id AS item_id, ci.quantity, {NOVEL_COLUMNS}
            FROM cart_items ci
            JOIN novels n ON n.id = ci.novel_id
            WHERE ci.cart_id = ?
            ORDER BY ci.id ASC
            "
        ))
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(CartItem::try_from).collect()
    }

    /// Get one line, only if it belongs to the given cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let row: Option<CartItemRow> = sqlx::query_as(&format!(
            r"
            SELECT ci.id AS item_id, ci.quantity, {NOVEL_COLUMNS}
            FROM cart_items ci
            JOIN novels n ON n.id = ci.novel_id
            WHERE ci.cart_id = ? AND ci.id = ?
            "
        ))
        .bind(cart_id)
        .bind(item_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(CartItem::try_from).transpose()
    }

    /// Add copies of a novel, growing the existing line if there is one.
    ///
    /// Returns the ID of the line that now holds the novel.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::OutOfRange` if the line would grow past
    /// `u32::MAX` copies; nothing is changed in that case.
    /// Returns `RepositoryError::Database` if the upsert fails (including an
    /// unknown novel ID, which violates the foreign key).
    pub async fn add_item(
        &self,
        cart_id: CartId,
        novel_id: NovelId,
        quantity: Quantity,
    ) -> Result<CartItemId, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let item_id: CartItemId = sqlx::query_scalar(
            r"
            INSERT INTO cart_items (cart_id, novel_id, quantity, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (cart_id, novel_id) DO UPDATE SET
                quantity = cart_items.quantity + excluded.quantity,
                updated_at = excluded.updated_at
            RETURNING id
            ",
        )
        .bind(cart_id)
        .bind(novel_id)
        .bind(i64::from(quantity.get()))
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| out_of_range_or(e, "cart item quantity"))?;

        touch_in(&mut tx, cart_id, now).await?;
        tx.commit().await?;

        Ok(item_id)
    }

    /// Overwrite a line's quantity.
    ///
    /// Returns `false` if the line does not exist in this cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_item_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE cart_items SET quantity = ?, updated_at = ? WHERE id = ? AND cart_id = ?",
        )
        .bind(i64::from(quantity.get()))
        .bind(now)
        .bind(item_id)
        .bind(cart_id)
        .execute(&mut *tx)
        .await?;

        touch_in(&mut tx, cart_id, now).await?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete one line.
    ///
    /// Returns `false` if the line does not exist in this cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn remove_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<bool, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM cart_items WHERE id = ? AND cart_id = ?")
            .bind(item_id)
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        touch_in(&mut tx, cart_id, now).await?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every line of a cart, keeping the cart itself.
    ///
    /// Returns the number of lines deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self, cart_id: CartId) -> Result<u64, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = ?")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        touch_in(&mut tx, cart_id, now).await?;
        tx.commit().await?;

        Ok(result.rows_affected())
    }

    /// Delete every line of the user's cart, if they have one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear_for_user(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM cart_items WHERE cart_id IN (SELECT id FROM carts WHERE user_id = ?)",
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Move every line of `from` into `into`, then delete `from`.
    ///
    /// Lines for the same novel are combined by adding quantities, capped at
    /// `u32::MAX`. Runs in a single transaction. Returns the number of lines
    /// moved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; nothing is
    /// changed in that case.
    pub async fn merge(&self, from: CartId, into: CartId) -> Result<u64, RepositoryError> {
        if from == into {
            return Ok(0);
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // The WHERE clause is required for SQLite to parse the upsert after
        // an INSERT ... SELECT.
        let moved = sqlx::query(
            r"
            INSERT INTO cart_items (cart_id, novel_id, quantity, created_at, updated_at)
            SELECT ?, novel_id, quantity, ?, ?
            FROM cart_items
            WHERE cart_id = ?
            ON CONFLICT (cart_id, novel_id) DO UPDATE SET
                quantity = MIN(cart_items.quantity + excluded.quantity, 4294967295),
                updated_at = excluded.updated_at
            ",
        )
        .bind(into)
        .bind(now)
        .bind(now)
        .bind(from)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query("DELETE FROM carts WHERE id = ?")
            .bind(from)
            .execute(&mut *tx)
            .await?;

        touch_in(&mut tx, into, now).await?;
        tx.commit().await?;

        Ok(moved)
    }

    /// Delete a cart and its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, cart_id: CartId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM carts WHERE id = ?")
            .bind(cart_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

/// Bump a cart's `updated_at` inside an open transaction.
async fn touch_in(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    cart_id: CartId,
    now: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE carts SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(cart_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use novel_cart_core::Email;

    use super::*;
    use crate::db::novels::tests::new_novel;
    use crate::db::{NovelRepository, UserRepository, test_pool};

    async fn seed_novel(pool: &SqlitePool, name: &str, price: &str) -> Novel {
        NovelRepository::new(pool)
            .create(&new_novel(name, 1, price, "2025"))
            .await
            .unwrap()
    }

    async fn seed_user(pool: &SqlitePool, username: &str) -> UserId {
        let email = Email::parse(&format!("{username}@example.com")).unwrap();
        UserRepository::new(pool)
            .create_with_password(username, &email, "h")
            .await
            .unwrap()
            .id
    }

    fn qty(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_user_cart_is_created_once() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        let user = seed_user(&pool, "reader").await;

        let first = repo.get_or_create_for_user(user).await.unwrap();
        let second = repo.get_or_create_for_user(user).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.owner, CartOwner::User(user));
    }

    #[tokio::test]
    async fn test_session_cart_lookup() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);

        assert!(repo.find_by_session_key("abc").await.unwrap().is_none());
        let cart = repo.get_or_create_for_session("abc").await.unwrap();
        assert_eq!(cart.owner, CartOwner::Session("abc".to_string()));

        let found = repo.find_by_session_key("abc").await.unwrap().unwrap();
        assert_eq!(found.id, cart.id);
    }

    #[tokio::test]
    async fn test_add_item_accumulates_on_one_line() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        let novel = seed_novel(&pool, "A", "89.00").await;
        let cart = repo.get_or_create_for_session("k").await.unwrap();

        let first = repo.add_item(cart.id, novel.id, qty(1)).await.unwrap();
        let second = repo.add_item(cart.id, novel.id, qty(2)).await.unwrap();
        assert_eq!(first, second);

        let items = repo.items(cart.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity.get(), 3);
        assert_eq!(items[0].subtotal().to_string(), "267.00");
    }

    #[tokio::test]
    async fn test_add_item_past_limit_is_out_of_range() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        let novel = seed_novel(&pool, "A", "1.00").await;
        let cart = repo.get_or_create_for_session("k").await.unwrap();

        repo.add_item(cart.id, novel.id, qty(u32::MAX)).await.unwrap();
        assert!(matches!(
            repo.add_item(cart.id, novel.id, qty(1)).await,
            Err(RepositoryError::OutOfRange(_))
        ));

        let items = repo.items(cart.id).await.unwrap();
        assert_eq!(items[0].quantity.get(), u32::MAX);
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        let cart = repo.get_or_create_for_session("k").await.unwrap();

        assert_eq!(repo.get(cart.id).await.unwrap().unwrap().id, cart.id);
        repo.delete(cart.id).await.unwrap();
        assert!(repo.get(cart.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_unknown_novel_fails() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        let cart = repo.get_or_create_for_session("k").await.unwrap();

        let result = repo.add_item(cart.id, NovelId::new(404), qty(1)).await;
        assert!(matches!(result, Err(RepositoryError::Database(_))));
    }

    #[tokio::test]
    async fn test_items_are_scoped_to_their_cart() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        let novel = seed_novel(&pool, "A", "10.00").await;
        let mine = repo.get_or_create_for_session("mine").await.unwrap();
        let theirs = repo.get_or_create_for_session("theirs").await.unwrap();

        let item = repo.add_item(theirs.id, novel.id, qty(1)).await.unwrap();

        assert!(repo.find_item(mine.id, item).await.unwrap().is_none());
        assert!(!repo.set_item_quantity(mine.id, item, qty(5)).await.unwrap());
        assert!(!repo.remove_item(mine.id, item).await.unwrap());
        assert!(repo.find_item(theirs.id, item).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_set_quantity_and_remove() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        let novel = seed_novel(&pool, "A", "10.00").await;
        let cart = repo.get_or_create_for_session("k").await.unwrap();
        let item = repo.add_item(cart.id, novel.id, qty(1)).await.unwrap();

        assert!(repo.set_item_quantity(cart.id, item, qty(4)).await.unwrap());
        let line = repo.find_item(cart.id, item).await.unwrap().unwrap();
        assert_eq!(line.quantity.get(), 4);

        assert!(repo.remove_item(cart.id, item).await.unwrap());
        assert!(repo.items(cart.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_keeps_cart() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        let a = seed_novel(&pool, "A", "10.00").await;
        let b = seed_novel(&pool, "B", "20.00").await;
        let cart = repo.get_or_create_for_session("k").await.unwrap();
        repo.add_item(cart.id, a.id, qty(1)).await.unwrap();
        repo.add_item(cart.id, b.id, qty(1)).await.unwrap();

        assert_eq!(repo.clear(cart.id).await.unwrap(), 2);
        assert!(repo.items(cart.id).await.unwrap().is_empty());
        assert!(repo.find_by_session_key("k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_merge_combines_lines_and_drops_source() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        let a = seed_novel(&pool, "A", "10.00").await;
        let b = seed_novel(&pool, "B", "20.00").await;
        let user = seed_user(&pool, "reader").await;

        let anon = repo.get_or_create_for_session("k").await.unwrap();
        repo.add_item(anon.id, a.id, qty(2)).await.unwrap();
        repo.add_item(anon.id, b.id, qty(1)).await.unwrap();

        let owned = repo.get_or_create_for_user(user).await.unwrap();
        repo.add_item(owned.id, a.id, qty(1)).await.unwrap();

        assert_eq!(repo.merge(anon.id, owned.id).await.unwrap(), 2);

        let items = repo.items(owned.id).await.unwrap();
        let quantities: Vec<(String, u32)> = items
            .iter()
            .map(|i| (i.novel.name.clone(), i.quantity.get()))
            .collect();
        assert_eq!(
            quantities,
            [("A".to_string(), 3), ("B".to_string(), 1)]
        );
        assert!(repo.find_by_session_key("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deleting_novel_cascades_to_lines() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        let novel = seed_novel(&pool, "A", "10.00").await;
        let cart = repo.get_or_create_for_session("k").await.unwrap();
        repo.add_item(cart.id, novel.id, qty(1)).await.unwrap();

        NovelRepository::new(&pool).delete_all().await.unwrap();
        assert!(repo.items(cart.id).await.unwrap().is_empty());
    }
}
