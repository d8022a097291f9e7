#![cfg(feature = "memory")]

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use storefront_repo::memory::InMemoryRepo;
use storefront_types::domain::cart::{CartDraft, DraftItem};
use storefront_types::domain::order::{Order, UserId};
use storefront_types::domain::product::Product;
use storefront_types::ports::catalog::CatalogStore;
use storefront_types::ports::order_repository::{OrderRepository, RepoError};

async fn seeded() -> InMemoryRepo {
    let repo = InMemoryRepo::new();
    repo.seed_products(&[
        Product::new(2, "Chili Dog", Decimal::new(650, 2)).unwrap(),
        Product::new(1, "Classic", Decimal::new(500, 2)).unwrap(),
    ])
    .await
    .unwrap();
    repo
}

fn draft(lines: &[(i64, u32, i64)]) -> CartDraft {
    CartDraft::new(
        lines
            .iter()
            .map(|&(product_id, quantity, cents)| DraftItem {
                product_id,
                product_name: name_of(product_id).into(),
                quantity,
                price_at_purchase: Decimal::new(cents, 2),
            })
            .collect(),
    )
    .expect("total fits")
}

fn name_of(product_id: i64) -> &'static str {
    match product_id {
        1 => "Classic",
        2 => "Chili Dog",
        _ => "Unknown",
    }
}

#[tokio::test]
async fn memory_repo_cart_flow() {
    let repo = seeded().await;
    let user = UserId(1);

    assert!(repo.load_cart(user).await.unwrap().is_none());

    let order = repo
        .replace_cart(user, draft(&[(1, 2, 500)]))
        .await
        .unwrap();
    assert_eq!(order.total_price, Decimal::new(1000, 2));

    let cart = repo.load_cart(user).await.unwrap().unwrap();
    assert_eq!(cart.order.id, order.id);
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.lines[0].product_name, "Classic");

    // Replacing keeps the same cart and swaps its lines.
    let again = repo
        .replace_cart(user, draft(&[(2, 1, 650)]))
        .await
        .unwrap();
    assert_eq!(again.id, order.id);
    let cart = repo.load_cart(user).await.unwrap().unwrap();
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.lines[0].product_id, 2);
    assert_eq!(cart.order.total_price, Decimal::new(650, 2));

    let done = repo.checkout(user).await.unwrap();
    assert!(done.is_completed);
    assert!(repo.load_cart(user).await.unwrap().is_none());

    let history = repo.completed_orders(user).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, order.id);
    assert_eq!(history[0].order_items[0].product_name, "Chili Dog");
}

#[tokio::test]
async fn memory_repo_checkout_preconditions() {
    let repo = seeded().await;
    let user = UserId(2);

    assert!(matches!(
        repo.checkout(user).await,
        Err(RepoError::NoActiveCart)
    ));

    repo.replace_cart(user, draft(&[])).await.unwrap();
    assert!(matches!(repo.checkout(user).await, Err(RepoError::EmptyCart)));
    assert_eq!(repo.active_orders(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn memory_repo_heals_duplicate_carts() {
    let repo = seeded().await;
    let user = UserId(3);
    let now = Utc::now();

    let mut older = Order::new_cart(user);
    older.created_at = now - Duration::minutes(10);
    let mut newer = Order::new_cart(user);
    newer.created_at = now;
    repo.insert_order(newer.clone(), vec![]);
    repo.insert_order(older.clone(), vec![]);
    assert_eq!(repo.active_orders(user).await.unwrap().len(), 2);

    repo.load_cart(user).await.unwrap().unwrap();
    let active = repo.active_orders(user).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, newer.id);

    let order = repo.replace_cart(user, draft(&[(1, 1, 500)])).await.unwrap();
    assert_eq!(order.id, newer.id);
}

#[tokio::test]
async fn memory_repo_concurrent_replaces_keep_one_cart() {
    let repo = seeded().await;
    let user = UserId(4);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.replace_cart(user, draft(&[(1, i + 1, 500)])).await })
        })
        .collect();
    for h in handles {
        h.await.unwrap().unwrap();
    }
    assert_eq!(repo.active_orders(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn memory_repo_lists_catalog_by_id() {
    let repo = seeded().await;
    let ids: Vec<_> = repo
        .list_products()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec![1, 2]);
    assert!(repo.get_product(42).await.unwrap().is_none());
}

#[tokio::test]
async fn memory_repo_history_keeps_name_after_rename() {
    let repo = seeded().await;
    let user = UserId(5);

    repo.replace_cart(user, draft(&[(1, 1, 500)])).await.unwrap();
    repo.checkout(user).await.unwrap();
    repo.seed_products(&[Product::new(1, "Renamed Dog", Decimal::new(500, 2)).unwrap()])
        .await
        .unwrap();

    let history = repo.completed_orders(user).await.unwrap();
    assert_eq!(history[0].order_items[0].product_name, "Classic");
}
