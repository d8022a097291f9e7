use std::collections::HashMap;

use super::shop_service::ShopService;
use crate::errors::AppError;
use storefront_types::domain::cart::{
    plan_cart, referenced_products, CartEntry, CartPlan, CartView, LineOutcome, PriceSource,
};
use storefront_types::domain::order::UserId;
use storefront_types::ports::catalog::CatalogStore;
use storefront_types::ports::order_repository::OrderRepository;

impl<R> ShopService<R>
where
    R: OrderRepository + CatalogStore,
{
    /// The user's current cart. A user without a cart gets an empty view.
    pub async fn read_cart(&self, user: UserId) -> Result<CartView, AppError> {
        let cart = self.repo.load_cart(user).await?;
        Ok(cart.map(CartView::from).unwrap_or_default())
    }

    /// Makes the user's cart hold exactly the valid `entries`.
    ///
    /// Entries that do not parse or name an unknown product are skipped and
    /// logged; the rest replace the previous cart contents in one step.
    pub async fn replace_cart(
        &self,
        user: UserId,
        entries: Vec<CartEntry>,
    ) -> Result<CartPlan, AppError> {
        let mut catalog = HashMap::new();
        for id in referenced_products(&entries) {
            if let Some(product) = self.repo.get_product(id).await? {
                catalog.insert(id, product);
            }
        }

        if self.price_source == PriceSource::Client {
            for line in entries.iter().flatten() {
                if let (Some(price), Some(product)) = (line.price, catalog.get(&line.product_id)) {
                    if price != product.price {
                        tracing::warn!(
                            %user,
                            product_id = line.product_id,
                            submitted = %price,
                            catalog = %product.price,
                            "cart price differs from catalog"
                        );
                    }
                }
            }
        }

        let plan = plan_cart(&entries, &catalog, self.price_source);
        for outcome in &plan.outcomes {
            match outcome {
                LineOutcome::Added { .. } => {}
                LineOutcome::UnknownProduct(id) => {
                    tracing::warn!(%user, product_id = id, "skipping entry for unknown product")
                }
                LineOutcome::Rejected(e) => {
                    tracing::warn!(%user, error = %e, "skipping malformed cart entry")
                }
            }
        }

        let order = self.repo.replace_cart(user, plan.draft.clone()).await?;
        tracing::info!(
            %user,
            order_id = %order.id,
            added = plan.added(),
            skipped = plan.skipped(),
            total = %order.total_price,
            "cart replaced"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;
    use storefront_repo::memory::InMemoryRepo;
    use storefront_types::domain::cart::CartLine;
    use storefront_types::domain::product::Product;

    async fn service() -> ShopService<InMemoryRepo> {
        let repo = InMemoryRepo::new();
        repo.seed_products(&[
            Product::new(1, "Classic", Decimal::new(500, 2)).unwrap(),
            Product::new(2, "Chili Dog", Decimal::new(650, 2)).unwrap(),
        ])
        .await
        .unwrap();
        ShopService::new(repo)
    }

    fn entries(values: serde_json::Value) -> Vec<CartEntry> {
        values
            .as_array()
            .unwrap()
            .iter()
            .map(CartLine::from_json)
            .collect()
    }

    #[tokio::test]
    async fn empty_user_reads_empty_cart_without_creating_one() {
        let svc = service().await;
        let view = svc.read_cart(UserId(1)).await.unwrap();
        assert!(view.cart_items.is_empty());
        assert!(svc.repo().active_orders(UserId(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replace_is_idempotent() {
        let svc = service().await;
        let user = UserId(1);
        let items = json!([{"id": 1, "quantity": 2, "price": 5.00}, {"id": 2}]);

        svc.replace_cart(user, entries(items.clone())).await.unwrap();
        let first = svc.repo().load_cart(user).await.unwrap().unwrap();
        svc.replace_cart(user, entries(items)).await.unwrap();
        let second = svc.repo().load_cart(user).await.unwrap().unwrap();

        assert_eq!(first.order.id, second.order.id);
        assert_eq!(first.order.total_price, second.order.total_price);
        assert_eq!(second.order.total_price, Decimal::new(1650, 2));
        let shape = |c: &storefront_types::domain::cart::Cart| {
            c.lines
                .iter()
                .map(|l| (l.product_id, l.quantity, l.price_at_purchase))
                .collect::<Vec<_>>()
        };
        assert_eq!(shape(&first), shape(&second));
    }

    #[tokio::test]
    async fn unknown_and_malformed_entries_are_skipped() {
        let svc = service().await;
        let user = UserId(2);
        let plan = svc
            .replace_cart(
                user,
                entries(json!([
                    {"id": 1, "quantity": 1, "price": 5.00},
                    {"id": 404, "quantity": 1, "price": 99.00},
                    {"id": 2, "quantity": "many"},
                ])),
            )
            .await
            .unwrap();
        assert_eq!(plan.added(), 1);
        assert_eq!(plan.skipped(), 2);

        let view = svc.read_cart(user).await.unwrap();
        assert_eq!(view.cart_items.len(), 1);
        let cart = svc.repo().load_cart(user).await.unwrap().unwrap();
        assert_eq!(cart.order.total_price, Decimal::new(500, 2));
    }

    #[tokio::test]
    async fn overflowing_price_skips_only_that_entry() {
        let svc = service().await;
        let user = UserId(5);
        let plan = svc
            .replace_cart(
                user,
                entries(json!([
                    {"id": 1, "quantity": 1, "price": 5.00},
                    {"id": 1, "quantity": 2, "price": "79228162514264337593543950335"},
                ])),
            )
            .await
            .unwrap();
        assert_eq!(plan.added(), 1);
        assert_eq!(plan.skipped(), 1);

        let cart = svc.repo().load_cart(user).await.unwrap().unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.order.total_price, Decimal::new(500, 2));
    }

    #[tokio::test]
    async fn catalog_price_source_ignores_submitted_price() {
        let svc = service().await.with_price_source(PriceSource::Catalog);
        let user = UserId(3);
        svc.replace_cart(user, entries(json!([{"id": 2, "quantity": 2, "price": 0.01}])))
            .await
            .unwrap();
        let view = svc.read_cart(user).await.unwrap();
        assert_eq!(view.cart_items[0].price, Decimal::new(650, 2));
        let cart = svc.repo().load_cart(user).await.unwrap().unwrap();
        assert_eq!(cart.order.total_price, Decimal::new(1300, 2));
    }

    #[tokio::test]
    async fn replacing_with_nothing_empties_the_cart() {
        let svc = service().await;
        let user = UserId(4);
        svc.replace_cart(user, entries(json!([{"id": 1}]))).await.unwrap();
        svc.replace_cart(user, Vec::new()).await.unwrap();
        let cart = svc.repo().load_cart(user).await.unwrap().unwrap();
        assert!(cart.lines.is_empty());
        assert_eq!(cart.order.total_price, Decimal::ZERO);
    }
}
