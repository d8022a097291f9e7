use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use storefront_types::ports::order_repository::RepoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("No active cart")]
    NoActiveCart,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::Unauthenticated => "unauthenticated",
            AppError::NoActiveCart => "no_active_cart",
            AppError::EmptyCart => "empty_cart",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::EmptyCart => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::NoActiveCart => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NoActiveCart => AppError::NoActiveCart,
            RepoError::EmptyCart => AppError::EmptyCart,
            RepoError::DbError(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let msg = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = %e, "request failed");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::to_string(&ErrorBody {
            error: msg,
            code: self.code(),
        })
        .unwrap_or_else(|_| "{\"error\":\"internal serialization\"}".into());
        (self.status(), [("content-type", "application/json")], body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_errors_map_to_checkout_failures() {
        assert!(matches!(
            AppError::from(RepoError::NoActiveCart),
            AppError::NoActiveCart
        ));
        assert!(matches!(
            AppError::from(RepoError::EmptyCart),
            AppError::EmptyCart
        ));
        let internal = AppError::from(RepoError::DbError("disk full".into()));
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.code(), "internal");
    }

    #[test]
    fn internal_details_stay_out_of_the_response() {
        let res = AppError::Internal(anyhow::anyhow!("secret path")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            AppError::Unauthenticated.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
