use crate::errors::AppError;
use storefront_types::domain::cart::PriceSource;
use storefront_types::domain::product::Product;
use storefront_types::ports::catalog::CatalogStore;
use storefront_types::ports::order_repository::OrderRepository;

/// The storefront core: catalog reads, cart reconciliation, checkout and
/// purchase history over one storage adapter.
pub struct ShopService<R> {
    pub(crate) repo: R,
    pub(crate) price_source: PriceSource,
}

impl<R> ShopService<R>
where
    R: OrderRepository + CatalogStore,
{
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            price_source: PriceSource::default(),
        }
    }

    pub fn with_price_source(mut self, price_source: PriceSource) -> Self {
        self.price_source = price_source;
        self
    }

    pub fn price_source(&self) -> PriceSource {
        self.price_source
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        Ok(self.repo.list_products().await?)
    }
}
