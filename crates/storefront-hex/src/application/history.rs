use super::shop_service::ShopService;
use crate::errors::AppError;
use storefront_types::domain::order::{OrderSummary, UserId};
use storefront_types::ports::catalog::CatalogStore;
use storefront_types::ports::order_repository::OrderRepository;

impl<R> ShopService<R>
where
    R: OrderRepository + CatalogStore,
{
    /// Completed orders of the user, most recently completed first.
    pub async fn history(&self, user: UserId) -> Result<Vec<OrderSummary>, AppError> {
        Ok(self.repo.completed_orders(user).await?)
    }
}
