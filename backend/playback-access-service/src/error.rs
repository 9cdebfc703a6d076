/// Error types for Playback Access Service
///
/// Every dependency failure (cache, database, link issuer) is surfaced as a
/// server error and logged with full detail; the client receives a generic
/// message. Authorization failures collapse into one uniform response so the
/// caller cannot tell which check failed.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::cache::CacheError;

/// Result type for playback-access-service operations
pub type Result<T> = std::result::Result<T, AccessError>;

/// Why a request was denied. Logged, never sent to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    InvalidSignature,
    Expired,
    NonceReused,
    NoGrant,
    UnsupportedDerivation,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidSignature => "invalid_signature",
            Self::Expired => "expired",
            Self::NonceReused => "nonce_reused",
            Self::NoGrant => "no_grant",
            Self::UnsupportedDerivation => "unsupported_derivation",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(DenyReason),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Link issuer error: {0}")]
    LinkIssuer(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AccessError {
    /// Dependency failures; the caller may retry the whole request.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Cache(_) | Self::Database(_) | Self::LinkIssuer(_) | Self::Internal(_)
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Cache(_) | Self::Database(_) | Self::LinkIssuer(_) | Self::Internal(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    /// Message safe to show any caller
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "Bad request",
            Self::Unauthorized(_) => "Unauthorized",
            Self::NotFound(_) => "Video not found",
            Self::Cache(_) | Self::Database(_) | Self::LinkIssuer(_) | Self::Internal(_) => {
                "Internal server error"
            }
        }
    }

    /// Build the standard failure body. Internal text is attached only when
    /// `expose_details` is set, and never for authorization failures.
    pub fn to_body(&self, expose_details: bool) -> ErrorBody {
        let details = match self {
            Self::Unauthorized(_) => None,
            _ if expose_details => Some(self.to_string()),
            _ => None,
        };

        ErrorBody {
            success: false,
            error: ErrorDetail {
                message: self.public_message(),
                code: self.code(),
                details,
            },
        }
    }

    pub fn to_response(&self, expose_details: bool) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.to_body(expose_details))
    }
}

impl ResponseError for AccessError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Cache(_) | Self::Database(_) | Self::LinkIssuer(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        self.to_response(false)
    }
}

/// Failure response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub message: &'static str,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<CacheError> for AccessError {
    fn from(err: CacheError) -> Self {
        AccessError::Cache(err.to_string())
    }
}

impl From<sqlx::Error> for AccessError {
    fn from(err: sqlx::Error) -> Self {
        AccessError::Database(err.to_string())
    }
}
