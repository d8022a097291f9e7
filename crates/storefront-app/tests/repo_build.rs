use rust_decimal::Decimal;
use storefront_repo::{build_repo, Repo};
use storefront_types::domain::order::UserId;
use storefront_types::domain::product::Product;
use storefront_types::ports::catalog::CatalogStore;
use storefront_types::ports::order_repository::OrderRepository;

#[tokio::test]
async fn builds_sqlite_repo_from_url() {
    // Use a temp DB path for isolation.
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("storefront-test.db");
    let url = format!("sqlite://{}", db_path.display());

    let repo: Repo = build_repo(Some(&url)).await.expect("build repo");
    assert_eq!(repo.kind(), "sqlite");
    assert!(repo.list_products().await.expect("list").is_empty());
    assert!(repo.active_orders(UserId(1)).await.unwrap().is_empty());
}

#[tokio::test]
async fn seeded_catalog_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("catalog.db").display());

    {
        let repo = build_repo(Some(&url)).await.unwrap();
        let hotdog = Product::new(1, "Classic", Decimal::new(500, 2)).unwrap();
        repo.seed_products(&[hotdog]).await.unwrap();
    }

    let reopened = build_repo(Some(&url)).await.unwrap();
    let products = reopened.list_products().await.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].price, Decimal::new(500, 2));
}
