//! Cart domain types and the JSON cart view.

use chrono::{DateTime, Utc};
use serde::Serialize;

use novel_cart_core::{CartId, CartItemId, Money, Quantity, UserId};

use super::Novel;

/// Who a cart belongs to. Exactly one owner per cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOwner {
    /// Bound to a signed-in account.
    User(UserId),
    /// Bound to the random key stored in an anonymous session.
    Session(String),
}

impl CartOwner {
    /// The owning user, if any.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Session(_) => None,
        }
    }
}

/// A cart record (without its lines).
#[derive(Debug, Clone)]
pub struct Cart {
    pub id: CartId,
    pub owner: CartOwner,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line in a cart.
#[derive(Debug, Clone)]
pub struct CartItem {
    pub id: CartItemId,
    pub novel: Novel,
    pub quantity: Quantity,
}

impl CartItem {
    /// Price times quantity. Derived, never stored.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.novel.price.times(self.quantity)
    }
}

/// Cart line as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    pub id: CartItemId,
    pub novel: Novel,
    pub quantity: Quantity,
    pub subtotal: Money,
}

impl From<CartItem> for CartItemView {
    fn from(item: CartItem) -> Self {
        let subtotal = item.subtotal();
        Self {
            id: item.id,
            novel: item.novel,
            quantity: item.quantity,
            subtotal,
        }
    }
}

/// Full cart representation returned by every cart endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub id: CartId,
    /// Owning user ID, `null` for anonymous carts.
    pub user: Option<UserId>,
    pub items: Vec<CartItemView>,
    /// Sum of line quantities.
    pub total_items: u64,
    /// Sum of line subtotals.
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartView {
    /// Assemble the view for a cart and its current lines.
    #[must_use]
    pub fn new(cart: &Cart, items: Vec<CartItem>) -> Self {
        let total_items = items
            .iter()
            .map(|item| u64::from(item.quantity.get()))
            .sum();
        let total_amount = items.iter().map(CartItem::subtotal).sum();

        Self {
            id: cart.id,
            user: cart.owner.user_id(),
            items: items.into_iter().map(CartItemView::from).collect(),
            total_items,
            total_amount,
            created_at: cart.created_at,
            updated_at: cart.updated_at,
        }
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use novel_cart_core::NovelId;

    use super::*;

    fn novel(id: i64, price: &str) -> Novel {
        Novel {
            id: NovelId::new(id),
            name: format!("Novel {id}"),
            author: "Author".to_string(),
            publisher: "Publisher".to_string(),
            rank: id,
            price: price.parse().unwrap(),
            year: "2025".to_string(),
        }
    }

    fn cart(owner: CartOwner) -> Cart {
        Cart {
            id: CartId::new(1),
            owner,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_subtotal_is_price_times_quantity() {
        let item = CartItem {
            id: CartItemId::new(1),
            novel: novel(1, "89.00"),
            quantity: Quantity::new(2).unwrap(),
        };
        assert_eq!(item.subtotal().to_string(), "178.00");
    }

    #[test]
    fn test_view_totals() {
        let items = vec![
            CartItem {
                id: CartItemId::new(1),
                novel: novel(1, "89.00"),
                quantity: Quantity::new(2).unwrap(),
            },
            CartItem {
                id: CartItemId::new(2),
                novel: novel(2, "75.50"),
                quantity: Quantity::ONE,
            },
        ];
        let view = CartView::new(&cart(CartOwner::User(UserId::new(5))), items);

        assert_eq!(view.total_items, 3);
        assert_eq!(view.total_amount.to_string(), "253.50");
        assert_eq!(view.user, Some(UserId::new(5)));
        assert_eq!(view.items.len(), 2);
    }

    #[test]
    fn test_empty_anonymous_view_serializes() {
        let view = CartView::new(&cart(CartOwner::Session("k".to_string())), Vec::new());
        assert!(view.is_empty());

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["user"], serde_json::Value::Null);
        assert_eq!(json["total_items"], 0);
        assert_eq!(json["total_amount"], "0.00");
        assert_eq!(json["items"], serde_json::json!([]));
    }
}
