//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that renders every failure as a
//! structured JSON body - `{"error": {"code", "message"}}` - with a
//! distinguishable code per error kind, and captures server-side errors to
//! Sentry before responding. All route handlers return `Result<T, AppError>`.
//!
//! Provider-side raw payloads never reach clients unbounded: rejection
//! details are truncated at the source and everything else is logged for
//! operators instead of echoed.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::checkout::CheckoutError;
use crate::services::coupons::CouponError;
use crate::services::money::MoneyError;
use crate::services::payments::PaymentError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Coupon did not apply.
    #[error("Coupon error: {0}")]
    Coupon(#[from] CouponError),

    /// Payment provider operation failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Currency conversion failed.
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    /// Referenced product does not exist or is inactive.
    #[error("Product not found")]
    ProductNotFound,

    /// Referenced variant does not exist, is inactive, or belongs to a
    /// different product.
    #[error("Variant not found")]
    VariantNotFound,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller identity is missing.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(RepositoryError::Database(err))
    }
}

/// The `(status, code, message)` triple a response is built from.
type ErrorParts = (StatusCode, &'static str, String);

fn repository_parts(err: &RepositoryError) -> ErrorParts {
    match err {
        RepositoryError::NotFound => (
            StatusCode::NOT_FOUND,
            "not_found",
            "Resource not found".to_string(),
        ),
        RepositoryError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal server error".to_string(),
        ),
    }
}

fn coupon_parts(err: &CouponError) -> ErrorParts {
    let code = match err {
        CouponError::NotFound => "coupon_not_found",
        CouponError::Expired => "coupon_expired",
        CouponError::Exhausted => "coupon_exhausted",
        CouponError::MinimumNotMet { .. } => "coupon_minimum_not_met",
        CouponError::CurrencyMismatch => "coupon_currency_mismatch",
    };
    (StatusCode::BAD_REQUEST, code, err.to_string())
}

fn checkout_parts(err: &CheckoutError) -> ErrorParts {
    match err {
        CheckoutError::EmptyCart => {
            (StatusCode::BAD_REQUEST, "empty_cart", err.to_string())
        }
        CheckoutError::UnresolvableItem { .. } => (
            StatusCode::CONFLICT,
            "unresolvable_cart_item",
            err.to_string(),
        ),
        CheckoutError::StationRequired => (
            StatusCode::BAD_REQUEST,
            "pickup_station_required",
            err.to_string(),
        ),
        CheckoutError::StationNotFound => (
            StatusCode::NOT_FOUND,
            "pickup_station_not_found",
            err.to_string(),
        ),
        CheckoutError::Coupon(inner) => coupon_parts(inner),
        CheckoutError::Repository(inner) => repository_parts(inner),
    }
}

fn money_parts(err: &MoneyError) -> ErrorParts {
    match err {
        MoneyError::RateNotFound { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "rate_not_found",
            "Exchange rate unavailable".to_string(),
        ),
        MoneyError::Repository(inner) => repository_parts(inner),
    }
}

fn payment_parts(err: &PaymentError) -> ErrorParts {
    match err {
        PaymentError::Auth(_) => (
            StatusCode::BAD_GATEWAY,
            "provider_auth_failed",
            "Payment provider authentication failed".to_string(),
        ),
        PaymentError::Timeout => (
            StatusCode::GATEWAY_TIMEOUT,
            "provider_timeout",
            "Payment provider timed out; the payment may still complete".to_string(),
        ),
        // Rejection details are pre-truncated at the provider boundary
        PaymentError::Rejected { .. } => {
            (StatusCode::BAD_REQUEST, "provider_rejected", err.to_string())
        }
        PaymentError::MalformedResponse(_) => (
            StatusCode::BAD_GATEWAY,
            "provider_error",
            "Payment provider returned an unexpected response".to_string(),
        ),
        PaymentError::Http(_) => (
            StatusCode::BAD_GATEWAY,
            "provider_unreachable",
            "Payment provider is unreachable".to_string(),
        ),
        PaymentError::AmountOutOfRange(_) => {
            (StatusCode::BAD_REQUEST, "invalid_amount", err.to_string())
        }
        PaymentError::Money(inner) => money_parts(inner),
        PaymentError::Repository(inner) => repository_parts(inner),
    }
}

impl AppError {
    fn parts(&self) -> ErrorParts {
        match self {
            Self::Database(err) => repository_parts(err),
            Self::Checkout(err) => checkout_parts(err),
            Self::Coupon(err) => coupon_parts(err),
            Self::Payment(err) => payment_parts(err),
            Self::Money(err) => money_parts(err),
            Self::ProductNotFound => (
                StatusCode::NOT_FOUND,
                "product_not_found",
                self.to_string(),
            ),
            Self::VariantNotFound => (
                StatusCode::NOT_FOUND,
                "variant_not_found",
                self.to_string(),
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if matches!(self, Self::Payment(_)) {
            tracing::warn!(error = %self, "Payment request failed");
        }

        let body = serde_json::json!({
            "error": {
                "code": code,
                "message": message,
            }
        });

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use duka_core::CartItemId;

    #[test]
    fn test_coupon_errors_are_distinguishable() {
        let (status, code, _) = AppError::Coupon(CouponError::Expired).parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "coupon_expired");

        let (_, code, _) = AppError::Coupon(CouponError::Exhausted).parts();
        assert_eq!(code, "coupon_exhausted");

        let (_, code, _) = AppError::Coupon(CouponError::CurrencyMismatch).parts();
        assert_eq!(code, "coupon_currency_mismatch");
    }

    #[test]
    fn test_checkout_error_mapping() {
        let (status, code, _) = AppError::Checkout(CheckoutError::EmptyCart).parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "empty_cart");

        let (status, code, _) = AppError::Checkout(CheckoutError::UnresolvableItem {
            item: CartItemId::new(7),
        })
        .parts();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code, "unresolvable_cart_item");

        // A coupon failure inside checkout keeps the coupon's own code
        let (_, code, _) = AppError::Checkout(CheckoutError::Coupon(CouponError::NotFound)).parts();
        assert_eq!(code, "coupon_not_found");
    }

    #[test]
    fn test_payment_error_mapping() {
        let (status, code, _) = AppError::Payment(PaymentError::Timeout).parts();
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(code, "provider_timeout");

        let (status, code, _) =
            AppError::Payment(PaymentError::Auth("401".to_string())).parts();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(code, "provider_auth_failed");

        let (status, code, message) = AppError::Payment(PaymentError::Rejected {
            detail: "insufficient funds".to_string(),
        })
        .parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "provider_rejected");
        assert!(message.contains("insufficient funds"));
    }

    #[test]
    fn test_internal_detail_is_hidden() {
        let (status, _, message) =
            AppError::Internal("connection pool exhausted".to_string()).parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal server error");

        let (_, _, message) = AppError::Database(RepositoryError::DataCorruption(
            "bad row 17".to_string(),
        ))
        .parts();
        assert_eq!(message, "Internal server error");
    }

    #[test]
    fn test_not_found_mapping() {
        let (status, code, _) = AppError::ProductNotFound.parts();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "product_not_found");

        let (status, _, _) = AppError::Database(RepositoryError::NotFound).parts();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
