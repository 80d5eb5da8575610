use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};

/// Standard error body returned to HTTP clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Not Found", "Conflict")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Menu {0} not found")]
    MenuNotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid composition: {0}")]
    InvalidComposition(String),

    #[error("No unit conversion for product {product_id} and unit {unit_id}")]
    ConversionNotFound { product_id: i64, unit_id: i64 },

    #[error("Insufficient stock for {product} (available: {available}, required: {required})")]
    InsufficientStock {
        product: String,
        available: i32,
        required: i32,
    },

    #[error("Insufficient payment (total: {total}, paid: {amount_paid})")]
    InsufficientPayment { total: Decimal, amount_paid: Decimal },

    #[error("Protected entry: {0}")]
    ProtectedEntry(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_)
            | Self::EventError(_)
            | Self::InternalError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) | Self::MenuNotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::InvalidComposition(_)
            | Self::ConversionNotFound { .. }
            | Self::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InsufficientPayment { .. } => StatusCode::PAYMENT_REQUIRED,
            Self::ProtectedEntry(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::EventError(_) | Self::InternalError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Whether the caller may retry the same request unchanged.
    /// Only commit-phase races qualify; validation failures need a changed
    /// request and infrastructure failures need operator attention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

/// API error type for the handler layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::ServiceError(err) => err.into_response(),
            ApiError::ValidationError(msg) => error_response(StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => error_response(StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => error_response(StatusCode::BAD_REQUEST, msg),
        }
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    let err = ErrorResponse {
        error: status.canonical_reason().unwrap_or("Error").to_string(),
        message,
        details: None,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    (status, Json(err)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_failures_map_to_client_errors() {
        let err = ServiceError::InsufficientStock {
            product: "Arabica beans".into(),
            available: 4,
            required: 5,
        };
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.response_message().contains("available: 4"));

        let err = ServiceError::InsufficientPayment {
            total: Decimal::new(15000, 0),
            amount_paid: Decimal::new(10000, 0),
        };
        assert_eq!(err.status_code(), StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn infrastructure_errors_stay_generic() {
        let err = ServiceError::db_error("connection reset");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.response_message(), "Database error");
        assert!(!err.is_retryable());
    }

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(ServiceError::Conflict("invoice number taken".into()).is_retryable());
        assert!(!ServiceError::ProtectedEntry("penjualan_kasir".into()).is_retryable());
    }
}
