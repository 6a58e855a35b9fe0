/// Error Handling Module
///
/// Unified error handling for the session service:
/// 1. Domain-specific error types (validation, configuration, authentication)
/// 2. A central `AppError` used for control flow
/// 3. HTTP response mapping with structured logging
///
/// Authentication failures keep their precise reason internally so it can be
/// logged, but every "who are you" failure collapses into the same outward
/// 401 response.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

use crate::store::StoreError;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for request fields
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    EmptyField(&'static str),
    #[error("{0} is too short (minimum {1} characters)")]
    TooShort(&'static str, usize),
    #[error("{0} is too long (maximum {1} characters)")]
    TooLong(&'static str, usize),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required config: {0}")]
    MissingRequired(String),
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
    #[error("Config parse error: {0}")]
    Parse(#[from] config::ConfigError),
}

/// Why a presented credential was refused.
///
/// Only ever logged; the HTTP layer never reveals which one occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("account no longer exists")]
    AccountNotFound,
    #[error("refresh token expired or reused")]
    FingerprintMismatch,
    #[error("no token presented")]
    MissingToken,
}

/// Authentication and session errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(RejectReason),
    #[error("account not found")]
    AccountNotFound,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("credential store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("token encoding failed: {0}")]
    TokenEncoding(String),
}

impl AuthError {
    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            AuthError::Unauthenticated(reason) => Some(*reason),
            _ => None,
        }
    }

    /// True for every failure the caller should see as a plain 401.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AuthError::Unauthenticated(_) | AuthError::AccountNotFound
        )
    }
}

impl From<RejectReason> for AuthError {
    fn from(reason: RejectReason) -> Self {
        AuthError::Unauthenticated(reason)
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AuthError::AccountNotFound,
            other => AuthError::StoreUnavailable(other.to_string()),
        }
    }
}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Central error type that route handlers return
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RejectReason> for AppError {
    fn from(reason: RejectReason) -> Self {
        AppError::Auth(AuthError::Unauthenticated(reason))
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

const UNAUTHENTICATED_MESSAGE: &str = "Unauthenticated request";

fn describe(error: &AppError) -> (StatusCode, &'static str, String) {
    match error {
        AppError::Validation(e) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),

        AppError::Store(e) => match e {
            StoreError::Conflict(_) => (StatusCode::CONFLICT, "DUPLICATE_ENTRY", e.to_string()),
            StoreError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", "Record not found".to_string()),
            StoreError::Unavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Credential store temporarily unavailable".to_string(),
            ),
        },

        AppError::Auth(e) => match e {
            AuthError::Unauthenticated(_) | AuthError::AccountNotFound => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                UNAUTHENTICATED_MESSAGE.to_string(),
            ),
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid email or password".to_string(),
            ),
            AuthError::StoreUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Credential store temporarily unavailable".to_string(),
            ),
            AuthError::TokenEncoding(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        },

        AppError::Config(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "CONFIG_ERROR",
            "Server configuration error".to_string(),
        ),

        AppError::Internal(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "Internal server error".to_string(),
        ),
    }
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = describe(self);
        let response = ErrorResponse::new(
            request_id.to_string(),
            message,
            code.to_string(),
            status.as_u16(),
        );
        (status, response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Store(StoreError::Conflict(_)) => {
                tracing::warn!(request_id = request_id, error = %self, "Duplicate entry attempt");
            }
            AppError::Store(e) => {
                tracing::error!(request_id = request_id, error = %e, "Credential store error");
            }
            AppError::Auth(AuthError::StoreUnavailable(msg)) => {
                tracing::error!(request_id = request_id, error = %msg, "Credential store unavailable");
            }
            AppError::Auth(AuthError::TokenEncoding(msg)) => {
                tracing::error!(request_id = request_id, error = %msg, "Token encoding failed");
            }
            AppError::Auth(e) => {
                tracing::warn!(
                    request_id = request_id,
                    reason = ?e.reason(),
                    error = %e,
                    "Authentication rejected"
                );
            }
            AppError::Config(e) => {
                tracing::error!(request_id = request_id, error = %e, "Configuration error");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

/// Implement ResponseError for Actix-web integration
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        describe(self).0
    }
}
