use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    http::StatusCode,
    middleware,
    routing::{get, post, MethodRouter},
    serve, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::access::{authenticate, Access, Operation};
use crate::application::shop_service::ShopService;
use crate::errors::AppError;
use storefront_types::domain::cart::{CartLine, CartView};
use storefront_types::domain::order::{OrderSummary, UserId};
use storefront_types::domain::product::Product;
use storefront_types::ports::auth::AuthGate;
use storefront_types::ports::catalog::CatalogStore;
use storefront_types::ports::order_repository::OrderRepository;

#[derive(Clone)]
pub struct HttpServerConfig {
    pub port: String,
}

pub struct AppState<R> {
    pub service: Arc<ShopService<R>>,
    pub auth: Arc<dyn AuthGate>,
}

impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            auth: self.auth.clone(),
        }
    }
}

pub struct HttpServer<R> {
    pub state: AppState<R>,
    pub config: HttpServerConfig,
}

/// Desired cart contents. Entries stay raw JSON so that one bad entry does
/// not reject the whole request.
#[derive(Deserialize)]
pub struct ReplaceCartRequest {
    #[serde(default, alias = "cartItems")]
    pub cart_items: Vec<serde_json::Value>,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Serialize)]
struct CheckoutResponse {
    order_id: Uuid,
    message: String,
}

impl<R> HttpServer<R>
where
    R: OrderRepository + CatalogStore,
{
    pub async fn new(
        service: ShopService<R>,
        auth: Arc<dyn AuthGate>,
        config: HttpServerConfig,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            state: AppState {
                service: Arc::new(service),
                auth,
            },
            config,
        })
    }

    pub fn router(&self) -> Router {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                let request_id = Uuid::new_v4();
                tracing::info_span!(
                    "http_request",
                    %request_id,
                    method = %request.method(),
                    uri,
                    user = tracing::field::Empty
                )
            })
            .on_request(
                |request: &axum::extract::Request<_>, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        method = %request.method(),
                        uri = %request.uri(),
                        "request"
                    );
                },
            )
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &tracing::Span| {
                    tracing::info!(
                        parent: span,
                        status = %response.status(),
                        latency_ms = %latency.as_millis(),
                        "response"
                    );
                },
            );

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let mut public = Router::new();
        let mut protected = Router::new();
        for op in Operation::ALL {
            tracing::debug!(method = %op.method(), path = op.path(), access = ?op.access(), "route");
            match op.access() {
                Access::Public => public = public.route(op.path(), handler::<R>(op)),
                Access::RequiresIdentity => {
                    protected = protected.route(op.path(), handler::<R>(op))
                }
            }
        }
        let protected = protected.route_layer(middleware::from_fn_with_state(
            self.state.clone(),
            authenticate::<R>,
        ));

        public
            .merge(protected)
            .layer(trace_layer)
            .layer(cors)
            .with_state(self.state.clone())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let app = self.router();
        let addr: SocketAddr = format!("0.0.0.0:{}", self.config.port).parse()?;
        tracing::info!("starting server on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        serve(listener, app.into_make_service()).await?;
        Ok(())
    }
}

fn handler<R>(op: Operation) -> MethodRouter<AppState<R>>
where
    R: OrderRepository + CatalogStore,
{
    match op {
        Operation::Health => get(health),
        Operation::ListProducts => get(list_products::<R>),
        Operation::ReadCart => get(read_cart::<R>),
        Operation::ReplaceCart => post(replace_cart::<R>),
        Operation::Checkout => post(checkout::<R>),
        Operation::History => get(history::<R>),
    }
}

async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn list_products<R>(
    State(state): State<AppState<R>>,
) -> Result<Json<Vec<Product>>, AppError>
where
    R: OrderRepository + CatalogStore,
{
    let products = state.service.list_products().await?;
    Ok(Json(products))
}

async fn read_cart<R>(
    State(state): State<AppState<R>>,
    Extension(user): Extension<UserId>,
) -> Result<Json<CartView>, AppError>
where
    R: OrderRepository + CatalogStore,
{
    let view = state.service.read_cart(user).await?;
    Ok(Json(view))
}

async fn replace_cart<R>(
    State(state): State<AppState<R>>,
    Extension(user): Extension<UserId>,
    payload: Result<Json<ReplaceCartRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError>
where
    R: OrderRepository + CatalogStore,
{
    let Json(payload) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let entries = payload.cart_items.iter().map(CartLine::from_json).collect();
    state.service.replace_cart(user, entries).await?;
    Ok(Json(MessageResponse {
        message: "Cart updated successfully".into(),
    }))
}

async fn checkout<R>(
    State(state): State<AppState<R>>,
    Extension(user): Extension<UserId>,
) -> Result<Json<CheckoutResponse>, AppError>
where
    R: OrderRepository + CatalogStore,
{
    let order = state.service.checkout(user).await?;
    Ok(Json(CheckoutResponse {
        order_id: order.id,
        message: "Order placed successfully".into(),
    }))
}

async fn history<R>(
    State(state): State<AppState<R>>,
    Extension(user): Extension<UserId>,
) -> Result<Json<Vec<OrderSummary>>, AppError>
where
    R: OrderRepository + CatalogStore,
{
    let orders = state.service.history(user).await?;
    Ok(Json(orders))
}
