//! Error types and HTTP response conversion

use axum::{
    extract::multipart::MultipartError,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::FilterParseError;
use crate::store::{RepositoryError, RepositoryErrorKind};

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Generic message returned for failures whose detail stays in the logs
const SERVER_ERROR: &str = "Server Error";

/// Service error types
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Structured document store error with operation context
    #[error("{0}")]
    Repository(RepositoryError),

    /// JWT encoding or decoding error
    #[error("JWT error: {0}")]
    Jwt(Box<jsonwebtoken::errors::Error>),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Authorization error
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Request body over the configured limit
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Unique constraint violated
    #[error("Duplicate field value entered: {0}")]
    Duplicate(String),

    /// Geocoding returned no results for a postal code
    #[error("No location found for zipcode {0}")]
    ZipcodeNotFound(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded {
        /// Seconds until the client may retry
        retry_after_secs: u64,
        /// Requests allowed per period
        limit: u32,
    },

    /// External service error (502)
    #[error("External service error: {0}")]
    External(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Repository(e) => match e.kind {
                RepositoryErrorKind::NotFound => StatusCode::NOT_FOUND,
                RepositoryErrorKind::AlreadyExists | RepositoryErrorKind::ValidationFailed => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Jwt(_) | Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) | Error::ZipcodeNotFound(_) => StatusCode::NOT_FOUND,
            Error::BadRequest(_) | Error::ValidationError(_) | Error::Duplicate(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::External(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_) | Error::Io(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to hand back to the client
    fn client_message(&self) -> String {
        match self {
            Error::Repository(e) => match e.kind {
                RepositoryErrorKind::NotFound => "Resource not found".to_string(),
                RepositoryErrorKind::AlreadyExists => "Duplicate field value entered".to_string(),
                RepositoryErrorKind::ValidationFailed => e.message.clone(),
                _ => SERVER_ERROR.to_string(),
            },
            Error::Jwt(_) => "Not authorized to access this route".to_string(),
            Error::Unauthorized(msg)
            | Error::Forbidden(msg)
            | Error::NotFound(msg)
            | Error::BadRequest(msg)
            | Error::PayloadTooLarge(msg)
            | Error::ValidationError(msg) => msg.clone(),
            Error::Duplicate(field) => format!("Duplicate field value entered: {field}"),
            Error::ZipcodeNotFound(zipcode) => format!("No location found for zipcode {zipcode}"),
            Error::RateLimitExceeded { .. } => {
                "Too many requests, please try again later".to_string()
            }
            Error::External(_) => "Upstream service unavailable".to_string(),
            Error::Config(_) | Error::Io(_) | Error::Internal(_) => SERVER_ERROR.to_string(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,

    /// Error message
    pub error: String,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            Error::Repository(e) if status.is_server_error() => {
                tracing::error!(
                    operation = %e.operation,
                    kind = %e.kind,
                    entity_type = ?e.entity_type,
                    entity_id = ?e.entity_id,
                    "Repository error: {}", e.message
                );
            }
            Error::External(detail) => tracing::warn!("External service error: {}", detail),
            _ if status.is_server_error() => tracing::error!("{}", self),
            _ => tracing::debug!(status = status.as_u16(), "{}", self),
        }

        let body = Json(ErrorResponse::new(self.client_message()));

        if let Error::RateLimitExceeded {
            retry_after_secs,
            limit,
        } = self
        {
            let mut response = (status, body).into_response();
            let headers = response.headers_mut();
            headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
            headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
            return response;
        }

        (status, body).into_response()
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<RepositoryError> for Error {
    fn from(err: RepositoryError) -> Self {
        match err.kind {
            RepositoryErrorKind::NotFound => Error::NotFound(match (&err.entity_type, &err.entity_id) {
                (Some(entity), Some(id)) => format!("{entity} not found with id of {id}"),
                _ => "Resource not found".to_string(),
            }),
            RepositoryErrorKind::AlreadyExists => {
                Error::Duplicate(err.entity_id.clone().unwrap_or_else(|| err.message.clone()))
            }
            _ => Error::Repository(err),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error::Jwt(Box::new(err))
    }
}

impl From<MultipartError> for Error {
    fn from(err: MultipartError) -> Self {
        Error::BadRequest(format!("Invalid upload: {}", err.body_text()))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::External(err.to_string())
    }
}

impl From<FilterParseError> for Error {
    fn from(err: FilterParseError) -> Self {
        Error::BadRequest(err.to_string())
    }
}
