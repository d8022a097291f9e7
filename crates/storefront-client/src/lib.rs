use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storefront_types::domain::cart::CartView;
use storefront_types::domain::order::OrderSummary;
use storefront_types::domain::product::{Product, ProductId};
use uuid::Uuid;

#[derive(Clone)]
pub struct StorefrontClientBuilder {
    base: Url,
    headers: HeaderMap,
    timeout: Option<Duration>,
    client: Option<reqwest::Client>,
}

#[derive(Clone)]
pub struct StorefrontClient {
    base: Url,
    client: reqwest::Client,
}

impl StorefrontClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::builder(base_url)?.build()
    }

    pub fn builder(base_url: &str) -> anyhow::Result<StorefrontClientBuilder> {
        let base = Url::parse(base_url).context("invalid base url")?;
        Ok(StorefrontClientBuilder {
            base,
            headers: HeaderMap::new(),
            timeout: None,
            client: None,
        })
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base.join(path).context("failed to join url")
    }

    pub async fn list_products(&self) -> anyhow::Result<Vec<Product>> {
        let res = self
            .client
            .get(self.url("products")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn get_cart(&self) -> anyhow::Result<CartView> {
        let res = self
            .client
            .get(self.url("cart")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    /// Replaces the whole cart with `items`.
    pub async fn replace_cart(&self, items: Vec<CartItemInput>) -> anyhow::Result<()> {
        self.client
            .post(self.url("cart")?)
            .json(&ReplaceCartRequest { cart_items: items })
            .send()
            .await?
            .error_for_status()?;
        tracing::debug!("cart replaced");
        Ok(())
    }

    pub async fn checkout(&self) -> anyhow::Result<CheckoutResponse> {
        let res = self
            .client
            .post(self.url("checkout")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    pub async fn history(&self) -> anyhow::Result<Vec<OrderSummary>> {
        let res = self
            .client
            .get(self.url("history")?)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }
}

impl StorefrontClientBuilder {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(
        mut self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> anyhow::Result<Self> {
        let header_name =
            HeaderName::from_bytes(key.as_ref().as_bytes()).context("invalid header name")?;
        let header_value = HeaderValue::from_str(value.as_ref()).context("invalid header value")?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Sends `Authorization: Bearer <token>` with every request.
    pub fn with_bearer_token(self, token: impl AsRef<str>) -> anyhow::Result<Self> {
        self.with_header(AUTHORIZATION, format!("Bearer {}", token.as_ref()))
    }

    pub fn with_reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> anyhow::Result<StorefrontClient> {
        if let Some(client) = self.client {
            return Ok(StorefrontClient {
                base: self.base,
                client,
            });
        }

        let mut builder = reqwest::Client::builder();
        if !self.headers.is_empty() {
            builder = builder.default_headers(self.headers);
        }
        if let Some(t) = self.timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build()?;
        Ok(StorefrontClient {
            base: self.base,
            client,
        })
    }
}

/// One desired cart line. Without a price the server uses the catalog price.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CartItemInput {
    pub id: ProductId,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
}

impl CartItemInput {
    pub fn new(id: ProductId, quantity: u32) -> Self {
        Self {
            id,
            quantity,
            price: None,
        }
    }

    pub fn at_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct ReplaceCartRequest {
    cart_items: Vec<CartItemInput>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CheckoutResponse {
    pub order_id: Uuid,
    pub message: String,
}
