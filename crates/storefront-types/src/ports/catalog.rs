use async_trait::async_trait;

use super::order_repository::RepoError;
use crate::domain::product::{Product, ProductId};

#[async_trait]
pub trait CatalogStore: Send + Sync + 'static {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepoError>;

    /// All products, ordered by id.
    async fn list_products(&self) -> Result<Vec<Product>, RepoError>;
}
