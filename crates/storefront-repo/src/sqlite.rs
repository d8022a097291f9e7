use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Executor, FromRow, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use storefront_types::domain::cart::{Cart, CartDraft};
use storefront_types::domain::order::{HistoryItem, Order, OrderItem, OrderSummary, UserId};
use storefront_types::domain::product::{Product, ProductId};
use storefront_types::ports::catalog::CatalogStore;
use storefront_types::ports::order_repository::{OrderRepository, RepoError};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, user_id, created_at, is_completed, completed_at, total_price";

pub struct SqliteRepo {
    pool: SqlitePool,
}

fn db<E: std::fmt::Display>(e: E) -> RepoError {
    RepoError::DbError(e.to_string())
}

// Fixed-width UTC stamps so that text ordering matches time ordering.
fn stamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_stamp(s: &str) -> Result<DateTime<Utc>, RepoError> {
    Ok(DateTime::parse_from_rfc3339(s).map_err(db)?.with_timezone(&Utc))
}

fn parse_decimal(s: &str) -> Result<Decimal, RepoError> {
    Decimal::from_str(s).map_err(db)
}

#[derive(FromRow)]
struct DbOrder {
    id: String,
    user_id: i64,
    created_at: String,
    is_completed: bool,
    completed_at: Option<String>,
    total_price: String,
}

impl DbOrder {
    fn into_order(self) -> Result<Order, RepoError> {
        Ok(Order {
            id: Uuid::parse_str(&self.id).map_err(db)?,
            user_id: UserId(self.user_id),
            created_at: parse_stamp(&self.created_at)?,
            is_completed: self.is_completed,
            completed_at: self.completed_at.as_deref().map(parse_stamp).transpose()?,
            total_price: parse_decimal(&self.total_price)?,
        })
    }
}

const ITEM_COLUMNS: &str = "id, order_id, product_id, product_name, quantity, price_at_purchase";

#[derive(FromRow)]
struct DbItem {
    id: String,
    order_id: String,
    product_id: i64,
    product_name: String,
    quantity: i64,
    price_at_purchase: String,
}

impl DbItem {
    fn into_item(self) -> Result<OrderItem, RepoError> {
        Ok(OrderItem {
            id: Uuid::parse_str(&self.id).map_err(db)?,
            order_id: Uuid::parse_str(&self.order_id).map_err(db)?,
            product_id: self.product_id,
            product_name: self.product_name,
            quantity: u32::try_from(self.quantity).map_err(db)?,
            price_at_purchase: parse_decimal(&self.price_at_purchase)?,
        })
    }
}

#[derive(FromRow)]
struct DbProduct {
    id: i64,
    name: String,
    price: String,
    description: String,
    image_file: Option<String>,
}

impl DbProduct {
    fn into_product(self) -> Result<Product, RepoError> {
        Ok(Product {
            id: self.id,
            name: self.name,
            price: parse_decimal(&self.price)?,
            description: self.description,
            image_file: self.image_file,
        })
    }
}

impl SqliteRepo {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePool::connect_with(options).await?;

        let ddl = include_str!("../migrations/0001_create_storefront.sql");
        pool.execute(ddl).await?;

        Ok(Self { pool })
    }

    /// Upserts catalog rows.
    pub async fn seed_products(&self, products: &[Product]) -> Result<(), RepoError> {
        let mut tx = self.pool.begin().await.map_err(db)?;
        for p in products {
            sqlx::query(
                "INSERT INTO products (id, name, price, description, image_file)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT (id) DO UPDATE SET
                     name = excluded.name,
                     price = excluded.price,
                     description = excluded.description,
                     image_file = excluded.image_file",
            )
            .bind(p.id)
            .bind(&p.name)
            .bind(p.price.to_string())
            .bind(&p.description)
            .bind(&p.image_file)
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        }
        tx.commit().await.map_err(db)
    }
}

/// Retires every active order of `user` except the newest. Always issued as
/// the first statement of a transaction, which makes SQLite take the write
/// lock before anything is read. Duplicates only exist in databases that lack
/// the `orders_one_active_per_user` index; otherwise this updates nothing.
async fn heal(conn: &mut SqliteConnection, user: UserId) -> Result<(), RepoError> {
    let res = sqlx::query(
        "UPDATE orders SET is_completed = 1, completed_at = ?
         WHERE user_id = ? AND is_completed = 0 AND id <> (
             SELECT id FROM orders WHERE user_id = ? AND is_completed = 0
             ORDER BY created_at DESC, rowid DESC LIMIT 1
         )",
    )
    .bind(stamp(Utc::now()))
    .bind(user.0)
    .bind(user.0)
    .execute(conn)
    .await
    .map_err(db)?;
    if res.rows_affected() > 0 {
        tracing::warn!(%user, retired = res.rows_affected(), "retiring duplicate carts");
    }
    Ok(())
}

async fn active_order(conn: &mut SqliteConnection, user: UserId) -> Result<Option<Order>, RepoError> {
    let row: Option<DbOrder> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders
         WHERE user_id = ? AND is_completed = 0
         ORDER BY created_at DESC, rowid DESC LIMIT 1"
    ))
    .bind(user.0)
    .fetch_optional(conn)
    .await
    .map_err(db)?;
    row.map(|r| r.into_order()).transpose()
}

#[async_trait]
impl OrderRepository for SqliteRepo {
    async fn load_cart(&self, user: UserId) -> Result<Option<Cart>, RepoError> {
        let mut tx = self.pool.begin().await.map_err(db)?;
        heal(&mut tx, user).await?;
        let Some(order) = active_order(&mut tx, user).await? else {
            tx.commit().await.map_err(db)?;
            return Ok(None);
        };
        let rows: Vec<DbItem> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ? ORDER BY rowid"
        ))
        .bind(order.id.to_string())
        .fetch_all(&mut *tx)
        .await
        .map_err(db)?;
        tx.commit().await.map_err(db)?;

        let lines = rows
            .into_iter()
            .map(|r| r.into_item())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(Cart { order, lines }))
    }

    async fn replace_cart(&self, user: UserId, draft: CartDraft) -> Result<Order, RepoError> {
        let mut tx = self.pool.begin().await.map_err(db)?;
        heal(&mut tx, user).await?;

        // Ignored when the user already has a cart (unique active index).
        let fresh = Order::new_cart(user);
        sqlx::query(
            "INSERT OR IGNORE INTO orders (id, user_id, created_at, is_completed, completed_at, total_price)
             VALUES (?, ?, ?, 0, NULL, '0')",
        )
        .bind(fresh.id.to_string())
        .bind(user.0)
        .bind(stamp(fresh.created_at))
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        let mut order = active_order(&mut tx, user)
            .await?
            .ok_or_else(|| RepoError::DbError("cart vanished during replace".into()))?;

        sqlx::query("DELETE FROM order_items WHERE order_id = ?")
            .bind(order.id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db)?;

        for d in draft.items() {
            let item = d.clone().into_order_item(order.id);
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, product_name, quantity, price_at_purchase)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(item.id.to_string())
            .bind(item.order_id.to_string())
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(i64::from(item.quantity))
            .bind(item.price_at_purchase.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        }

        order.total_price = draft.total();
        sqlx::query("UPDATE orders SET total_price = ? WHERE id = ?")
            .bind(order.total_price.to_string())
            .bind(order.id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db)?;

        tx.commit().await.map_err(db)?;
        Ok(order)
    }

    async fn checkout(&self, user: UserId) -> Result<Order, RepoError> {
        let mut tx = self.pool.begin().await.map_err(db)?;
        heal(&mut tx, user).await?;
        let Some(mut order) = active_order(&mut tx, user).await? else {
            tx.commit().await.map_err(db)?;
            return Err(RepoError::NoActiveCart);
        };

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items WHERE order_id = ?")
            .bind(order.id.to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(db)?;
        if count == 0 {
            tx.commit().await.map_err(db)?;
            return Err(RepoError::EmptyCart);
        }

        order.complete(Utc::now());
        sqlx::query("UPDATE orders SET is_completed = 1, completed_at = ? WHERE id = ?")
            .bind(order.completed_at.map(stamp))
            .bind(order.id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        tx.commit().await.map_err(db)?;
        Ok(order)
    }

    async fn completed_orders(&self, user: UserId) -> Result<Vec<OrderSummary>, RepoError> {
        let orders: Vec<DbOrder> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE user_id = ? AND is_completed = 1
             ORDER BY completed_at DESC, rowid DESC"
        ))
        .bind(user.0)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let rows: Vec<DbItem> = sqlx::query_as(
            "SELECT oi.id, oi.order_id, oi.product_id, oi.product_name, oi.quantity,
                    oi.price_at_purchase
             FROM order_items oi
             JOIN orders o ON o.id = oi.order_id
             WHERE o.user_id = ? AND o.is_completed = 1
             ORDER BY oi.rowid",
        )
        .bind(user.0)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut items: HashMap<Uuid, Vec<HistoryItem>> = HashMap::new();
        for row in rows {
            let item = row.into_item()?;
            items.entry(item.order_id).or_default().push(item.into());
        }

        orders
            .into_iter()
            .map(|r| {
                let o = r.into_order()?;
                Ok(OrderSummary {
                    id: o.id,
                    created_at: o.created_at,
                    completed_at: o.completed_at,
                    total_price: o.total_price,
                    order_items: items.remove(&o.id).unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn active_orders(&self, user: UserId) -> Result<Vec<Order>, RepoError> {
        let rows: Vec<DbOrder> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ? AND is_completed = 0"
        ))
        .bind(user.0)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        rows.into_iter()
            .map(|r| r.into_order())
            .collect::<Result<Vec<_>, _>>()
    }
}

#[async_trait]
impl CatalogStore for SqliteRepo {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepoError> {
        let row: Option<DbProduct> = sqlx::query_as(
            "SELECT id, name, price, description, image_file FROM products WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;
        row.map(|r| r.into_product()).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepoError> {
        let rows: Vec<DbProduct> = sqlx::query_as(
            "SELECT id, name, price, description, image_file FROM products ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        rows.into_iter()
            .map(|r| r.into_product())
            .collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    async fn insert_raw_cart(repo: &SqliteRepo, order: &Order) {
        sqlx::query(
            "INSERT INTO orders (id, user_id, created_at, is_completed, completed_at, total_price)
             VALUES (?, ?, ?, 0, NULL, '0')",
        )
        .bind(order.id.to_string())
        .bind(order.user_id.0)
        .bind(stamp(order.created_at))
        .execute(&repo.pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn heal_retires_carts_imported_without_the_index() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("legacy.db").display());
        let repo = SqliteRepo::new(&url).await.unwrap();
        sqlx::query("DROP INDEX orders_one_active_per_user")
            .execute(&repo.pool)
            .await
            .unwrap();

        let user = UserId(9);
        let now = Utc::now();
        let mut older = Order::new_cart(user);
        older.created_at = now - ChronoDuration::minutes(10);
        let mut newer = Order::new_cart(user);
        newer.created_at = now;
        insert_raw_cart(&repo, &older).await;
        insert_raw_cart(&repo, &newer).await;
        assert_eq!(repo.active_orders(user).await.unwrap().len(), 2);

        let cart = repo.load_cart(user).await.unwrap().unwrap();
        assert_eq!(cart.order.id, newer.id);

        let active = repo.active_orders(user).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, newer.id);
        let retired = repo.completed_orders(user).await.unwrap();
        assert_eq!(retired.len(), 1);
        assert_eq!(retired[0].id, older.id);
    }
}
