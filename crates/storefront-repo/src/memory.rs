use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use storefront_types::domain::cart::{select_cart, Cart, CartDraft};
use storefront_types::domain::order::{
    sort_history, HistoryItem, Order, OrderItem, OrderSummary, UserId,
};
use storefront_types::domain::product::{Product, ProductId};
use storefront_types::ports::catalog::CatalogStore;
use storefront_types::ports::order_repository::{OrderRepository, RepoError};

#[derive(Debug, Clone)]
struct StoredOrder {
    order: Order,
    items: Vec<OrderItem>,
}

/// Keeps every order of a user under a single map entry, so each operation
/// runs under that entry's lock and is atomic per user.
#[derive(Clone)]
pub struct InMemoryRepo {
    pub products: Arc<DashMap<ProductId, Product>>,
    orders: Arc<DashMap<UserId, Vec<StoredOrder>>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self {
            products: Arc::new(DashMap::new()),
            orders: Arc::new(DashMap::new()),
        }
    }

    pub async fn seed_products(&self, products: &[Product]) -> Result<(), RepoError> {
        for p in products {
            self.products.insert(p.id, p.clone());
        }
        Ok(())
    }

    /// Stores an order record as-is, bypassing the one-cart rule. Used to
    /// import existing data.
    pub fn insert_order(&self, order: Order, items: Vec<OrderItem>) {
        self.orders
            .entry(order.user_id)
            .or_default()
            .push(StoredOrder { order, items });
    }

}

impl Default for InMemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

/// Retires all but the newest active order and returns the index of the cart.
fn heal(user: UserId, orders: &mut [StoredOrder]) -> Option<usize> {
    let (keep, retire) =
        select_cart(orders.iter().map(|s| &s.order)).map(|(keep, retire)| (keep.id, retire))?;
    if !retire.is_empty() {
        tracing::warn!(%user, kept = %keep, retired = retire.len(), "retiring duplicate carts");
        let now = Utc::now();
        for s in orders.iter_mut().filter(|s| retire.contains(&s.order.id)) {
            s.order.complete(now);
        }
    }
    orders.iter().position(|s| s.order.id == keep)
}

#[async_trait]
impl OrderRepository for InMemoryRepo {
    async fn load_cart(&self, user: UserId) -> Result<Option<Cart>, RepoError> {
        let Some(mut entry) = self.orders.get_mut(&user) else {
            return Ok(None);
        };
        let Some(idx) = heal(user, entry.value_mut()) else {
            return Ok(None);
        };
        let stored = &entry[idx];
        Ok(Some(Cart {
            order: stored.order.clone(),
            lines: stored.items.clone(),
        }))
    }

    async fn replace_cart(&self, user: UserId, draft: CartDraft) -> Result<Order, RepoError> {
        let mut entry = self.orders.entry(user).or_default();
        let orders = entry.value_mut();
        let idx = match heal(user, orders) {
            Some(idx) => idx,
            None => {
                orders.push(StoredOrder {
                    order: Order::new_cart(user),
                    items: Vec::new(),
                });
                orders.len() - 1
            }
        };
        let stored = &mut orders[idx];
        let order_id = stored.order.id;
        stored.order.total_price = draft.total();
        stored.items = draft
            .items()
            .iter()
            .cloned()
            .map(|d| d.into_order_item(order_id))
            .collect();
        Ok(stored.order.clone())
    }

    async fn checkout(&self, user: UserId) -> Result<Order, RepoError> {
        let Some(mut entry) = self.orders.get_mut(&user) else {
            return Err(RepoError::NoActiveCart);
        };
        let orders = entry.value_mut();
        let idx = heal(user, orders).ok_or(RepoError::NoActiveCart)?;
        let stored = &mut orders[idx];
        if stored.items.is_empty() {
            return Err(RepoError::EmptyCart);
        }
        stored.order.complete(Utc::now());
        Ok(stored.order.clone())
    }

    async fn completed_orders(&self, user: UserId) -> Result<Vec<OrderSummary>, RepoError> {
        let Some(entry) = self.orders.get(&user) else {
            return Ok(Vec::new());
        };
        let mut summaries: Vec<OrderSummary> = entry
            .iter()
            .filter(|s| s.order.is_completed)
            .map(|s| OrderSummary {
                id: s.order.id,
                created_at: s.order.created_at,
                completed_at: s.order.completed_at,
                total_price: s.order.total_price,
                order_items: s.items.iter().cloned().map(HistoryItem::from).collect(),
            })
            .collect();
        // Later inserts first on equal completion stamps.
        summaries.reverse();
        sort_history(&mut summaries);
        Ok(summaries)
    }

    async fn active_orders(&self, user: UserId) -> Result<Vec<Order>, RepoError> {
        Ok(self
            .orders
            .get(&user)
            .map(|entry| {
                entry
                    .iter()
                    .filter(|s| s.order.is_active())
                    .map(|s| s.order.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl CatalogStore for InMemoryRepo {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepoError> {
        Ok(self.products.get(&id).map(|r| r.clone()))
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepoError> {
        let mut list: Vec<Product> = self.products.iter().map(|kv| kv.value().clone()).collect();
        list.sort_by_key(|p| p.id);
        Ok(list)
    }
}
