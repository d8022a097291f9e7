use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::product::ProductId;

/// Identity handed out by the auth gate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(UserId)
    }
}

/// An order is a cart while `is_completed` is false and a purchase record
/// afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_price: Decimal,
}

impl Order {
    /// A fresh, empty cart for `user_id`.
    pub fn new_cart(user_id: UserId) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            created_at: Utc::now(),
            is_completed: false,
            completed_at: None,
            total_price: Decimal::ZERO,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.is_completed
    }

    /// ACTIVE -> COMPLETED. Completing twice keeps the first timestamp.
    pub fn complete(&mut self, at: DateTime<Utc>) {
        if self.is_completed {
            return;
        }
        self.is_completed = true;
        self.completed_at = Some(at);
    }
}

/// A line of an order with the product name and price snapshotted when it
/// was added.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub price_at_purchase: Decimal,
}

impl OrderItem {
    /// `None` when price times quantity overflows `Decimal`.
    pub fn subtotal(&self) -> Option<Decimal> {
        self.price_at_purchase.checked_mul(Decimal::from(self.quantity))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryItem {
    pub id: Uuid,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub price_at_purchase: Decimal,
}

impl From<OrderItem> for HistoryItem {
    fn from(item: OrderItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            product_name: item.product_name,
            quantity: item.quantity,
            price_at_purchase: item.price_at_purchase,
        }
    }
}

/// A completed order as shown in purchase history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_price: Decimal,
    pub order_items: Vec<HistoryItem>,
}

/// Newest completion first; orders without a completion stamp sink last.
pub fn sort_history(summaries: &mut [OrderSummary]) {
    summaries.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn new_cart_is_active_and_empty() {
        let order = Order::new_cart(UserId(7));
        assert!(order.is_active());
        assert_eq!(order.total_price, Decimal::ZERO);
        assert!(order.completed_at.is_none());
    }

    #[test]
    fn complete_is_one_shot() {
        let mut order = Order::new_cart(UserId(7));
        let first = Utc::now();
        order.complete(first);
        order.complete(first + Duration::seconds(5));
        assert!(!order.is_active());
        assert_eq!(order.completed_at, Some(first));
    }

    #[test]
    fn subtotal_multiplies_exactly() {
        let item = OrderItem {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            product_id: 1,
            product_name: "Classic".into(),
            quantity: 3,
            price_at_purchase: Decimal::new(110, 2),
        };
        assert_eq!(item.subtotal(), Some(Decimal::new(330, 2)));

        let huge = OrderItem {
            quantity: 2,
            price_at_purchase: Decimal::MAX,
            ..item
        };
        assert_eq!(huge.subtotal(), None);
    }

    #[test]
    fn user_id_parses_and_displays() {
        let id: UserId = " 42 ".parse().unwrap();
        assert_eq!(id, UserId(42));
        assert_eq!(id.to_string(), "42");
        assert!("abc".parse::<UserId>().is_err());
    }

    #[test]
    fn history_sorts_newest_first() {
        let now = Utc::now();
        let summary = |offset: i64| OrderSummary {
            id: Uuid::new_v4(),
            created_at: now,
            completed_at: Some(now + Duration::seconds(offset)),
            total_price: Decimal::ZERO,
            order_items: vec![],
        };
        let mut list = vec![summary(1), summary(3), summary(2)];
        sort_history(&mut list);
        let offsets: Vec<_> = list
            .iter()
            .map(|s| (s.completed_at.unwrap() - now).num_seconds())
            .collect();
        assert_eq!(offsets, vec![3, 2, 1]);
    }
}
