//! Unified error handling for the commerce service.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::gateway::GatewayError;
use crate::services::checkout::CheckoutError;

/// Application-level error type for the commerce service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Order commit failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Payment gateway operation failed.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request lacks valid credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller lacks permission for the target resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Checkout(e) => match e {
                CheckoutError::EmptyCart => StatusCode::BAD_REQUEST,
                CheckoutError::InsufficientStock { .. } => StatusCode::CONFLICT,
                CheckoutError::AddressNotOwned => StatusCode::FORBIDDEN,
                CheckoutError::StockLockTimeout => StatusCode::SERVICE_UNAVAILABLE,
                CheckoutError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Gateway(e) => match e {
                GatewayError::InvalidSignature(_) => StatusCode::UNAUTHORIZED,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn body(&self) -> serde_json::Value {
        match self {
            // Don't expose internal error details to clients
            Self::Database(_)
            | Self::Internal(_)
            | Self::Checkout(CheckoutError::Repository(_)) => {
                json!({ "detail": "Internal server error" })
            }
            Self::Checkout(CheckoutError::InsufficientStock {
                variant_id,
                requested,
                shortfall,
            }) => json!({
                "detail": self.to_string(),
                "variant_id": variant_id,
                "requested": requested,
                "shortfall": shortfall,
            }),
            Self::Gateway(GatewayError::InvalidSignature(_)) => {
                json!({ "detail": "Invalid webhook signature" })
            }
            Self::Gateway(_) => json!({ "detail": "Payment gateway error" }),
            _ => json!({ "detail": self.to_string() }),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if self.status().is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Commerce request error"
            );
        }

        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use altiplano_core::VariantId;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(
            get_status(AppError::NotFound("order-123".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn checkout_errors_map_per_taxonomy() {
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::EmptyCart)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::InsufficientStock {
                variant_id: VariantId::new(1),
                requested: 9,
                shortfall: 1,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::AddressNotOwned)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::StockLockTimeout)),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn insufficient_stock_body_carries_shortfall() {
        let err = AppError::Checkout(CheckoutError::InsufficientStock {
            variant_id: VariantId::new(42),
            requested: 9,
            shortfall: 1,
        });
        let body = err.body();
        assert_eq!(body["variant_id"], 42);
        assert_eq!(body["requested"], 9);
        assert_eq!(body["shortfall"], 1);
    }

    #[test]
    fn invalid_signature_rejected_as_unauthorized() {
        assert_eq!(
            get_status(AppError::Gateway(GatewayError::InvalidSignature(
                "mismatch".to_string()
            ))),
            StatusCode::UNAUTHORIZED
        );
    }
}
