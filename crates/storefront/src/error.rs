//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cart::CartError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// The resource is not in a state that allows the request.
    Conflict(String),
    /// Cart operation or snapshot error.
    Cart(CartError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Cart(err) => cart_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn cart_error_to_response(err: CartError) -> (StatusCode, String) {
    match &err {
        CartError::ProductNotInCart(_) => (StatusCode::NOT_FOUND, err.to_string()),
        CartError::AmountOutOfRange(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        CartError::Snapshot(_) => {
            tracing::error!(error = %err, "failed to encode cart snapshot");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        ApiError::Cart(err)
    }
}

/// Converts a handler panic into a JSON 500.
///
/// Installed once around the whole router; it knows nothing about the
/// routes it wraps.
pub fn panic_response(panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %detail, "request handler panicked");
    metrics::counter!("http_handler_panics_total").increment(1);

    ApiError::Internal("Something went wrong. Please reload the page.".to_string())
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_errors_map_to_status() {
        let snapshot = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let cases = [
            (CartError::ProductNotInCart("SKU-1".into()), StatusCode::NOT_FOUND),
            (CartError::AmountOutOfRange("SKU-1".into()), StatusCode::BAD_REQUEST),
            (CartError::Snapshot(snapshot), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }
}
