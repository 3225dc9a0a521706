use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

/// Failure raised by the pricing core.
/// Either a positivity precondition is violated, or the unconstrained
/// rates push an output outside f64 range (e.g. r = -100, T = 10).
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum PricingError {
    #[error("{field} must be positive, got {value}")]
    InvalidParameter { field: &'static str, value: f64 },

    #[error("{field} is not finite ({value}); check riskFreeRate, dividendYield and maturity")]
    NonFinite { field: &'static str, value: f64 },
}

impl PricingError {
    /// Name of the input or output that failed.
    pub fn field(&self) -> &'static str {
        match self {
            Self::InvalidParameter { field, .. } | Self::NonFinite { field, .. } => *field,
        }
    }
}

/// Service-level errors. The server must:
/// - Reject malformed requests before pricing
/// - Surface pricing failures to the client unchanged
/// - Never leak a panic for a storage failure
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("{field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("{0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Pricing(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Config(_) | Self::Database(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
