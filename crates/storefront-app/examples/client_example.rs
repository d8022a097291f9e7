///  To run :
///  cargo r --example client_example
use std::sync::Arc;

use rust_decimal::Decimal;
use storefront_client::{CartItemInput, StorefrontClient};
use storefront_hex::application::shop_service::ShopService;
use storefront_hex::auth::TokenRegistry;
use storefront_hex::inbound::http::{HttpServer, HttpServerConfig};
use storefront_repo::build_repo;
use storefront_types::domain::order::UserId;
use storefront_types::domain::product::Product;
use tempfile::tempdir;

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let port = find_free_port();
    let addr = format!("http://127.0.0.1:{port}/");

    // Use a temp file-backed SQLite DB so multiple connections see the same data.
    let tmp = tempdir()?;
    let db_path = tmp.path().join("storefront.db");
    let db_url = format!("sqlite://{}", db_path.display());

    let repo = build_repo(Some(&db_url)).await?;
    repo.seed_products(&[
        Product::new(1, "Classic", Decimal::new(500, 2))?,
        Product::new(2, "Chili Dog", Decimal::new(750, 2))?.with_image("chili.png"),
    ])
    .await?;

    let tokens = TokenRegistry::new();
    let token = tokens.issue(UserId(1));
    let server = HttpServer::new(
        ShopService::new(repo),
        Arc::new(tokens),
        HttpServerConfig {
            port: port.to_string(),
        },
    )
    .await?;

    let handle = tokio::spawn(async move {
        server.run().await.expect("server run");
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let client = StorefrontClient::builder(&addr)?
        .with_bearer_token(&token)?
        .build()?;

    for p in client.list_products().await? {
        println!("#{} {} {}", p.id, p.name, p.price);
    }

    client
        .replace_cart(vec![
            CartItemInput::new(1, 2),
            CartItemInput::new(2, 1).at_price(Decimal::new(750, 2)),
        ])
        .await?;
    let cart = client.get_cart().await?;
    for line in &cart.cart_items {
        println!("{} {} x{} @ {}", line.emoji, line.name, line.quantity, line.price);
    }

    let placed = client.checkout().await?;
    println!("{} ({})", placed.message, placed.order_id);

    // The cart is gone after checkout; the order shows up in history.
    assert!(client.get_cart().await?.cart_items.is_empty());
    let history = client.history().await?;
    println!(
        "history: {} order(s), latest total {}",
        history.len(),
        history[0].total_price
    );

    handle.abort();
    Ok(())
}
