//! Cart reconciliation rules.
//!
//! A submitted cart is a list of loosely-typed entries. Each entry is parsed on
//! its own into a [`CartEntry`]; [`plan_cart`] then resolves products and turns
//! the batch into a [`CartPlan`]: the line items to store plus one
//! [`LineOutcome`] per entry. Bad entries are skipped, never fatal.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::order::{Order, OrderItem};
use super::product::{Product, ProductId};

/// Decoration returned with every cart line.
pub const CART_EMOJI: &str = "🌭";

/// Where the price-at-purchase of a new line comes from.
///
/// `Client` trusts the submitted price (falling back to the catalog when the
/// entry has none). The storefront has always worked this way, but it lets a
/// client choose its own price. `Catalog` ignores the submitted price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    #[default]
    Client,
    Catalog,
}

impl FromStr for PriceSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(PriceSource::Client),
            "catalog" => Ok(PriceSource::Catalog),
            other => anyhow::bail!("unknown price source `{other}`"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("cart entry is not an object")]
    Malformed,

    #[error("cart entry has no usable product id")]
    MissingProductId,

    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("invalid price: {0}")]
    InvalidPrice(String),
}

/// One desired line of a cart, after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Option<Decimal>,
}

pub type CartEntry = Result<CartLine, LineError>;

impl CartLine {
    pub fn new(product_id: ProductId, quantity: i64, price: Option<Decimal>) -> CartEntry {
        if quantity < 1 {
            return Err(LineError::InvalidQuantity(quantity.to_string()));
        }
        let quantity =
            u32::try_from(quantity).map_err(|_| LineError::InvalidQuantity(quantity.to_string()))?;
        if let Some(p) = price {
            if p.is_sign_negative() && !p.is_zero() {
                return Err(LineError::InvalidPrice(p.to_string()));
            }
        }
        Ok(Self {
            product_id,
            quantity,
            price,
        })
    }

    /// Parses a submitted `{id, quantity, price}` object. `quantity` defaults
    /// to 1 and `price` is optional; numbers may also arrive as strings.
    pub fn from_json(value: &Value) -> CartEntry {
        let obj = value.as_object().ok_or(LineError::Malformed)?;

        let product_id = match obj.get("id") {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or(LineError::MissingProductId)?;

        let quantity = match obj.get("quantity") {
            None | Some(Value::Null) => 1,
            Some(v) => parse_quantity(v)?,
        };

        let price = match obj.get("price") {
            None | Some(Value::Null) => None,
            Some(v) => Some(parse_price(v)?),
        };

        CartLine::new(product_id, quantity, price)
    }
}

fn parse_quantity(v: &Value) -> Result<i64, LineError> {
    let invalid = || LineError::InvalidQuantity(v.to_string());
    match v {
        Value::Number(n) => match n.as_i64() {
            Some(q) => Ok(q),
            None => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
                .ok_or_else(invalid),
        },
        Value::String(s) => s.trim().parse().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

fn parse_price(v: &Value) -> Result<Decimal, LineError> {
    let raw = match v {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err(LineError::InvalidPrice(v.to_string())),
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|_| LineError::InvalidPrice(raw))
}

/// A line item that is ready to be stored on a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub price_at_purchase: Decimal,
}

impl DraftItem {
    pub fn new(product: &Product, quantity: u32, price_at_purchase: Decimal) -> Self {
        Self {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity,
            price_at_purchase,
        }
    }

    /// `None` when price times quantity overflows `Decimal`.
    pub fn subtotal(&self) -> Option<Decimal> {
        self.price_at_purchase.checked_mul(Decimal::from(self.quantity))
    }

    pub fn into_order_item(self, order_id: Uuid) -> OrderItem {
        OrderItem {
            id: Uuid::new_v4(),
            order_id,
            product_id: self.product_id,
            product_name: self.product_name,
            quantity: self.quantity,
            price_at_purchase: self.price_at_purchase,
        }
    }
}

/// The full replacement contents of a cart. The total is always derived from
/// the items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartDraft {
    items: Vec<DraftItem>,
    total: Decimal,
}

impl CartDraft {
    /// `None` when the total overflows `Decimal`.
    pub fn new(items: Vec<DraftItem>) -> Option<Self> {
        let mut draft = Self::default();
        for item in items {
            draft.push(item)?;
        }
        Some(draft)
    }

    /// Appends `item` and returns its subtotal. Leaves the draft untouched and
    /// returns `None` when the line or the running total overflows.
    pub fn push(&mut self, item: DraftItem) -> Option<Decimal> {
        let subtotal = item.subtotal()?;
        self.total = self.total.checked_add(subtotal)?;
        self.items.push(item);
        Some(subtotal)
    }

    pub fn items(&self) -> &[DraftItem] {
        &self.items
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Added {
        product_id: ProductId,
        subtotal: Decimal,
    },
    UnknownProduct(ProductId),
    Rejected(LineError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartPlan {
    pub draft: CartDraft,
    pub outcomes: Vec<LineOutcome>,
}

impl CartPlan {
    pub fn added(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, LineOutcome::Added { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.added()
    }
}

/// Product ids worth looking up for a batch of entries, deduplicated.
pub fn referenced_products(entries: &[CartEntry]) -> Vec<ProductId> {
    let mut ids: Vec<ProductId> = entries
        .iter()
        .filter_map(|e| e.as_ref().ok().map(|l| l.product_id))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Turns submitted entries into the replacement contents of a cart.
///
/// Entries that failed to parse, reference a product missing from `catalog`
/// or would overflow the cart total are recorded as skipped and contribute
/// nothing to the total.
pub fn plan_cart(
    entries: &[CartEntry],
    catalog: &HashMap<ProductId, Product>,
    source: PriceSource,
) -> CartPlan {
    let mut draft = CartDraft::default();
    let mut outcomes = Vec::with_capacity(entries.len());

    for entry in entries {
        let line = match entry {
            Ok(line) => line,
            Err(e) => {
                outcomes.push(LineOutcome::Rejected(e.clone()));
                continue;
            }
        };
        let Some(product) = catalog.get(&line.product_id) else {
            outcomes.push(LineOutcome::UnknownProduct(line.product_id));
            continue;
        };
        let price = match source {
            PriceSource::Client => line.price.unwrap_or(product.price),
            PriceSource::Catalog => product.price,
        };
        let outcome = match draft.push(DraftItem::new(product, line.quantity, price)) {
            Some(subtotal) => LineOutcome::Added {
                product_id: product.id,
                subtotal,
            },
            None => LineOutcome::Rejected(LineError::InvalidPrice(format!(
                "{price} x {} overflows the cart total",
                line.quantity
            ))),
        };
        outcomes.push(outcome);
    }

    CartPlan { draft, outcomes }
}

/// Among a user's orders, picks the active one to keep as the cart (most
/// recently created; on a tie the later one in `orders` wins) and lists the
/// other active orders, which must be retired.
pub fn select_cart<'a, I>(orders: I) -> Option<(&'a Order, Vec<Uuid>)>
where
    I: IntoIterator<Item = &'a Order>,
{
    let active: Vec<&Order> = orders.into_iter().filter(|o| o.is_active()).collect();
    let keep = active
        .iter()
        .copied()
        .reduce(|best, o| if o.created_at >= best.created_at { o } else { best })?;
    let retire = active
        .iter()
        .filter(|o| o.id != keep.id)
        .map(|o| o.id)
        .collect();
    Some((keep, retire))
}

/// The active order of a user together with its lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Cart {
    pub order: Order,
    pub lines: Vec<OrderItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItemView {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    pub emoji: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CartView {
    pub cart_items: Vec<CartItemView>,
}

impl From<Cart> for CartView {
    fn from(cart: Cart) -> Self {
        let cart_items = cart
            .lines
            .into_iter()
            .map(|l| CartItemView {
                id: l.product_id,
                name: l.product_name,
                price: l.price_at_purchase,
                quantity: l.quantity,
                emoji: CART_EMOJI.to_string(),
            })
            .collect();
        Self { cart_items }
    }
}
