use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Method};
use axum::middleware::Next;
use axum::response::Response;
use storefront_types::ports::catalog::CatalogStore;
use storefront_types::ports::order_repository::OrderRepository;

use super::server::AppState;
use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    RequiresIdentity,
}

/// Every operation exposed over HTTP, with the access it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Health,
    ListProducts,
    ReadCart,
    ReplaceCart,
    Checkout,
    History,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Health,
        Operation::ListProducts,
        Operation::ReadCart,
        Operation::ReplaceCart,
        Operation::Checkout,
        Operation::History,
    ];

    pub fn access(self) -> Access {
        match self {
            Operation::Health | Operation::ListProducts => Access::Public,
            Operation::ReadCart
            | Operation::ReplaceCart
            | Operation::Checkout
            | Operation::History => Access::RequiresIdentity,
        }
    }

    pub fn method(self) -> Method {
        match self {
            Operation::ReplaceCart | Operation::Checkout => Method::POST,
            _ => Method::GET,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Operation::Health => "/health",
            Operation::ListProducts => "/products",
            Operation::ReadCart | Operation::ReplaceCart => "/cart",
            Operation::Checkout => "/checkout",
            Operation::History => "/history",
        }
    }
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolves the bearer credential and stores the caller's `UserId` in the
/// request extensions. Requests without a valid credential get a 401.
pub async fn authenticate<R>(
    State(state): State<AppState<R>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError>
where
    R: OrderRepository + CatalogStore,
{
    let token = bearer_token(request.headers())
        .map(str::to_owned)
        .ok_or(AppError::Unauthenticated)?;
    let user = state.auth.authenticate(&token).await.ok_or_else(|| {
        tracing::debug!("rejected bearer token");
        AppError::Unauthenticated
    })?;
    tracing::Span::current().record("user", tracing::field::display(user));
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn cart_operations_require_identity() {
        let protected: Vec<_> = Operation::ALL
            .into_iter()
            .filter(|op| op.access() == Access::RequiresIdentity)
            .collect();
        assert_eq!(
            protected,
            vec![
                Operation::ReadCart,
                Operation::ReplaceCart,
                Operation::Checkout,
                Operation::History
            ]
        );
        assert_eq!(Operation::ListProducts.access(), Access::Public);
    }

    #[test]
    fn parses_bearer_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer  xyz "));
        assert_eq!(bearer_token(&headers), Some("xyz"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
