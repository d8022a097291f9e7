use async_trait::async_trait;

use crate::domain::cart::{Cart, CartDraft};
use crate::domain::order::{Order, OrderSummary, UserId};

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("db error: {0}")]
    DbError(String),

    #[error("no active cart")]
    NoActiveCart,

    #[error("cart is empty")]
    EmptyCart,
}

/// Storage of carts and completed orders.
///
/// Every method runs as one unit per user: either it fully applies or nothing
/// is committed. Methods that locate the active cart first retire any extra
/// active orders of that user, keeping the most recently created one.
#[async_trait]
pub trait OrderRepository: Send + Sync + 'static {
    /// The user's active cart with its lines, if any. Never creates one.
    async fn load_cart(&self, user: UserId) -> Result<Option<Cart>, RepoError>;

    /// Replaces the lines and total of the user's cart, creating the cart when
    /// the user has none.
    async fn replace_cart(&self, user: UserId, draft: CartDraft) -> Result<Order, RepoError>;

    /// Completes the user's cart. Fails with `NoActiveCart` or `EmptyCart`.
    async fn checkout(&self, user: UserId) -> Result<Order, RepoError>;

    /// Completed orders of the user, newest completion first.
    async fn completed_orders(&self, user: UserId) -> Result<Vec<OrderSummary>, RepoError>;

    /// Raw view of the user's active orders, without any repair.
    async fn active_orders(&self, user: UserId) -> Result<Vec<Order>, RepoError>;
}
