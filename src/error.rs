//! Service error types with HTTP status code mapping.
//!
//! [`GateError`] is the central error type for the service. Each variant maps
//! to a specific HTTP status code and structured JSON error response.
//!
//! Business-level redemption rejections (`invalid`, `already_used`, `void`,
//! `refunded`) are deliberately **not** represented here: they are ordinary
//! results carried in the redemption response body with HTTP 200, so that
//! retrying delivery infrastructure never mistakes them for transient
//! failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1002,
///     "message": "invalid quantity: 0 (must be a positive integer)",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`GateError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                |
/// |-----------|-----------------|----------------------------|
/// | 1000–1099 | Validation      | 400 Bad Request            |
/// | 1100–1199 | Trust           | 401 / 403                  |
/// | 2000–2999 | Not Found       | 404 Not Found              |
/// | 3000–3999 | Server          | 500 / 503                  |
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// Caller lacks a valid identity or presented a wrong shared secret.
    #[error("unauthorized")]
    Unauthorized,

    /// Caller is authenticated but lacks the required role.
    #[error("forbidden: missing role {0}")]
    Forbidden(String),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Issuance quantity is not a positive integer.
    #[error("invalid quantity: {0} (must be a positive integer)")]
    InvalidQuantity(i64),

    /// Inbound event did not match any known shape; rejected at the trust
    /// boundary before reaching business logic.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// No purchase visible to the caller under the given session id.
    #[error("purchase not found: {0}")]
    PurchaseNotFound(String),

    /// Redemption compare-and-set lost repeatedly to concurrent writers.
    /// Retryable: re-scanning re-evaluates from the ticket lookup.
    #[error("redemption conflict on ticket {0}; retry")]
    RedemptionConflict(String),

    /// Store layer failure.
    #[error("store error: {0}")]
    Store(String),

    /// Internal invariant breach.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GateError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidQuantity(_) => 1002,
            Self::MalformedEvent(_) => 1003,
            Self::Unauthorized => 1101,
            Self::Forbidden(_) => 1102,
            Self::PurchaseNotFound(_) => 2001,
            Self::Internal(_) => 3000,
            Self::Store(_) => 3001,
            Self::RedemptionConflict(_) => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidQuantity(_) | Self::MalformedEvent(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::PurchaseNotFound(_) => StatusCode::NOT_FOUND,
            Self::RedemptionConflict(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_400() {
        assert_eq!(
            GateError::InvalidQuantity(0).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GateError::MalformedEvent("bad tag".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn trust_errors_map_to_401_and_403() {
        assert_eq!(GateError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            GateError::Forbidden("gate".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn transient_errors_are_retryable_statuses() {
        assert_eq!(
            GateError::RedemptionConflict("tkt_x".to_string()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            GateError::Store("down".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = [
            GateError::Unauthorized,
            GateError::Forbidden(String::new()),
            GateError::InvalidRequest(String::new()),
            GateError::InvalidQuantity(0),
            GateError::MalformedEvent(String::new()),
            GateError::PurchaseNotFound(String::new()),
            GateError::RedemptionConflict(String::new()),
            GateError::Store(String::new()),
            GateError::Internal(String::new()),
        ];
        let mut codes: Vec<u32> = errors.iter().map(GateError::error_code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
