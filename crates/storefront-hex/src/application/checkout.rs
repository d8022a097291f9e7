use super::shop_service::ShopService;
use crate::errors::AppError;
use storefront_types::domain::order::{Order, UserId};
use storefront_types::ports::catalog::CatalogStore;
use storefront_types::ports::order_repository::OrderRepository;

impl<R> ShopService<R>
where
    R: OrderRepository + CatalogStore,
{
    /// Turns the user's cart into a completed order.
    pub async fn checkout(&self, user: UserId) -> Result<Order, AppError> {
        match self.repo.checkout(user).await {
            Ok(order) => {
                tracing::info!(%user, order_id = %order.id, total = %order.total_price, "checked out");
                Ok(order)
            }
            Err(e) => {
                let err = AppError::from(e);
                tracing::debug!(%user, code = err.code(), "checkout rejected");
                Err(err)
            }
        }
    }
}
