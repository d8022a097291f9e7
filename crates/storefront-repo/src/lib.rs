#[cfg(not(any(feature = "memory", feature = "sqlite")))]
compile_error!("Enable a repo feature: `memory` or `sqlite`.");

use storefront_types::domain::cart::{Cart, CartDraft};
use storefront_types::domain::order::{Order, OrderSummary, UserId};
use storefront_types::domain::product::{Product, ProductId};
use storefront_types::ports::catalog::CatalogStore;
use storefront_types::ports::order_repository::{OrderRepository, RepoError};

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub const DEFAULT_SQLITE_URL: &str = "sqlite://storefront.db";

/// The storage adapter picked at startup.
pub enum Repo {
    #[cfg(feature = "memory")]
    Memory(memory::InMemoryRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteRepo),
}

macro_rules! dispatch {
    ($self:ident, $repo:ident => $call:expr) => {
        match $self {
            #[cfg(feature = "memory")]
            Repo::Memory($repo) => $call,
            #[cfg(feature = "sqlite")]
            Repo::Sqlite($repo) => $call,
        }
    };
}

pub async fn build_repo(url: Option<&str>) -> anyhow::Result<Repo> {
    Repo::build_repo(url).await
}

impl Repo {
    #[cfg(all(feature = "memory", not(feature = "sqlite")))]
    pub async fn build_repo(_: Option<&str>) -> anyhow::Result<Self> {
        Ok(Self::Memory(memory::InMemoryRepo::new()))
    }

    #[cfg(all(feature = "sqlite", not(feature = "memory")))]
    pub async fn build_repo(database_url: Option<&str>) -> anyhow::Result<Self> {
        let url = database_url.unwrap_or(DEFAULT_SQLITE_URL);
        Ok(Self::Sqlite(sqlite::SqliteRepo::new(url).await?))
    }

    // With both adapters compiled in, a database url selects sqlite.
    #[cfg(all(feature = "sqlite", feature = "memory"))]
    pub async fn build_repo(database_url: Option<&str>) -> anyhow::Result<Self> {
        match database_url {
            Some(url) => Ok(Self::Sqlite(sqlite::SqliteRepo::new(url).await?)),
            None => Ok(Self::Memory(memory::InMemoryRepo::new())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            #[cfg(feature = "memory")]
            Repo::Memory(_) => "memory",
            #[cfg(feature = "sqlite")]
            Repo::Sqlite(_) => "sqlite",
        }
    }

    pub async fn seed_products(&self, products: &[Product]) -> Result<(), RepoError> {
        dispatch!(self, r => r.seed_products(products).await)
    }
}

#[async_trait::async_trait]
impl OrderRepository for Repo {
    async fn load_cart(&self, user: UserId) -> Result<Option<Cart>, RepoError> {
        dispatch!(self, r => r.load_cart(user).await)
    }

    async fn replace_cart(&self, user: UserId, draft: CartDraft) -> Result<Order, RepoError> {
        dispatch!(self, r => r.replace_cart(user, draft).await)
    }

    async fn checkout(&self, user: UserId) -> Result<Order, RepoError> {
        dispatch!(self, r => r.checkout(user).await)
    }

    async fn completed_orders(&self, user: UserId) -> Result<Vec<OrderSummary>, RepoError> {
        dispatch!(self, r => r.completed_orders(user).await)
    }

    async fn active_orders(&self, user: UserId) -> Result<Vec<Order>, RepoError> {
        dispatch!(self, r => r.active_orders(user).await)
    }
}

#[async_trait::async_trait]
impl CatalogStore for Repo {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepoError> {
        dispatch!(self, r => r.get_product(id).await)
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepoError> {
        dispatch!(self, r => r.list_products().await)
    }
}
