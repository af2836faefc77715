// src/error.rs
//! Application error types with structured error handling.
//!
//! Error types form the vocabulary for failure modes in the system. The
//! split that matters most is between transport-level failures, which can
//! end a fetch, and item-level problems, which never do on their own.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::fault::RecoverableFailure;
use crate::retry::Retryable;
use crate::validate::SkipReason;

/// Microsoft Graph error codes as a typed vocabulary.
///
/// Graph reports both an HTTP status and a string `code`. The code wins
/// when it is recognized; otherwise the status decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphErrorCode {
    /// Throttled by the service; back off and retry
    TooManyRequests,
    /// The service is temporarily unavailable
    ServiceUnavailable,
    /// An upstream gateway timed out
    GatewayTimeout,
    /// An upstream gateway returned garbage
    BadGateway,
    /// Generic server-side failure
    InternalServerError,
    /// The requested resource does not exist
    ResourceNotFound,
    /// The access token is missing, invalid, or expired
    Unauthorized,
    /// The caller lacks permission for the resource
    AccessDenied,
    /// The request was rejected as malformed
    BadRequest,
    /// HTTP status code fallback when the error body is unparseable
    HttpStatus(u16),
    /// A code this client doesn't recognize yet
    Unknown(String),
}

impl GraphErrorCode {
    /// Parse a Graph error `code` string into the typed vocabulary.
    pub fn from_api_response(code: &str) -> Self {
        match code {
            "TooManyRequests" | "activityLimitReached" => Self::TooManyRequests,
            "serviceNotAvailable" | "ServiceUnavailable" => Self::ServiceUnavailable,
            "timeout" | "GatewayTimeout" => Self::GatewayTimeout,
            "generalException" | "InternalServerError" => Self::InternalServerError,
            "itemNotFound" | "ErrorItemNotFound" | "ResourceNotFound"
            | "Request_ResourceNotFound" => Self::ResourceNotFound,
            "InvalidAuthenticationToken" | "unauthenticated" => Self::Unauthorized,
            "accessDenied" | "ErrorAccessDenied" | "Authorization_RequestDenied" => {
                Self::AccessDenied
            }
            "BadRequest" | "Request_BadRequest" | "invalidRequest" => Self::BadRequest,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Create from an HTTP status code when the error body is unparseable.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            429 => Self::TooManyRequests,
            503 => Self::ServiceUnavailable,
            504 => Self::GatewayTimeout,
            502 => Self::BadGateway,
            500 => Self::InternalServerError,
            404 => Self::ResourceNotFound,
            401 => Self::Unauthorized,
            403 => Self::AccessDenied,
            400 => Self::BadRequest,
            other => Self::HttpStatus(other),
        }
    }

    /// Resolves the code for a failed response, falling back to the status
    /// when the body's code is not one we know.
    pub fn resolve(status: u16, code: Option<&str>) -> Self {
        match code.map(Self::from_api_response) {
            Some(Self::Unknown(_)) | None => Self::from_http_status(status),
            Some(known) => known,
        }
    }

    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TooManyRequests
                | Self::ServiceUnavailable
                | Self::GatewayTimeout
                | Self::BadGateway
                | Self::InternalServerError
                | Self::HttpStatus(408)
        )
    }

    /// Whether this error means the resource simply doesn't exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound)
    }
}

impl fmt::Display for GraphErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyRequests => write!(f, "too_many_requests"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::GatewayTimeout => write!(f, "gateway_timeout"),
            Self::BadGateway => write!(f, "bad_gateway"),
            Self::InternalServerError => write!(f, "internal_server_error"),
            Self::ResourceNotFound => write!(f, "resource_not_found"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::AccessDenied => write!(f, "access_denied"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::HttpStatus(code) => write!(f, "http_{}", code),
            Self::Unknown(code) => write!(f, "{}", code),
        }
    }
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("Graph API returned an error ({code}): {message}")]
    GraphService {
        code: GraphErrorCode,
        message: String,
        status: u16,
        retry_after: Option<Duration>,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("{id} was skipped: {reason}")]
    Skipped { id: String, reason: SkipReason },

    #[error("{0}")]
    InvalidItem(RecoverableFailure),

    #[error("Error budget exceeded after {failures} recoverable failures (budget: {budget})")]
    ErrorBudgetExceeded { failures: usize, budget: String },

    #[error("Cancelled during {operation}")]
    Cancelled { operation: String },

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl AppError {
    /// The Graph error code, when the failure came from the service itself.
    pub fn graph_code(&self) -> Option<&GraphErrorCode> {
        match self {
            Self::GraphService { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Whether this error ended a fetch by caller choice rather than by
    /// a transport problem.
    pub fn is_budget_exhaustion(&self) -> bool {
        matches!(self, Self::ErrorBudgetExceeded { .. })
    }
}

impl Retryable for AppError {
    fn is_transient(&self) -> bool {
        match self {
            Self::GraphService { code, .. } => code.is_retryable(),
            Self::NetworkFailure(err) => err.is_timeout(),
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::GraphService { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    fn cancelled(operation: &str) -> Self {
        Self::Cancelled {
            operation: operation.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(err.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::InvalidConfiguration(format!("invalid URL: {}", err))
    }
}

/// Result type alias for convenience
pub type Result<T, E = AppError> = std::result::Result<T, E>;
