use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use storefront_hex::application::shop_service::ShopService;
use storefront_hex::auth::TokenRegistry;
use storefront_hex::config::Config;
use storefront_hex::inbound::http::{HttpServer, HttpServerConfig};
use storefront_repo::{build_repo, Repo};
use storefront_types::domain::product::Product;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for DATABASE_URL / SERVER_PORT / AUTH_TOKENS when present.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_string()))
        .init();

    let config = Config::from_env()?;
    let repo: Repo = build_repo(config.database_url.as_deref()).await?;
    tracing::info!(repo = repo.kind(), "storage ready");

    if let Some(path) = &config.catalog_seed {
        let products = load_catalog(path)?;
        repo.seed_products(&products).await?;
        tracing::info!(count = products.len(), path = %path.display(), "catalog seeded");
    }

    let service = ShopService::new(repo).with_price_source(config.price_source);

    let tokens = TokenRegistry::with_tokens(config.auth_tokens.clone());
    if tokens.is_empty() {
        tracing::warn!("AUTH_TOKENS is empty; every protected route will answer 401");
    }

    let server_cfg = HttpServerConfig {
        port: config.server_port.clone(),
    };

    let http = HttpServer::new(service, Arc::new(tokens), server_cfg).await?;
    http.run().await
}

fn load_catalog(path: &Path) -> anyhow::Result<Vec<Product>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading catalog seed {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing catalog seed {}", path.display()))
}
