//! Error types shared across the router.
//!
//! Registration failures ([`RouterError`]) are returned to setup code. Everything
//! that goes wrong while a request is being served travels as an `anyhow::Error`
//! through the handler chain and ends up at the error handler; [`DecodeError`] and
//! [`HttpError`] are the concrete types the crate itself produces there.

use http::StatusCode;
use thiserror::Error;

/// Failure while registering routes or groups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// The route pattern could not be parsed.
    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// The full pattern as it was registered (group prefixes included)
        pattern: String,
        /// What is wrong with it
        reason: String,
    },
    /// Routes can only be registered for the fixed verb set.
    #[error("cannot register `{method} {pattern}`: unsupported method")]
    UnsupportedMethod {
        /// Method of the rejected registration
        method: String,
        /// Pattern of the rejected registration
        pattern: String,
    },
    /// A route was registered without any handler.
    #[error("route `{method} {pattern}` has an empty handler chain")]
    EmptyChain {
        /// Method of the rejected registration
        method: String,
        /// Pattern of the rejected registration
        pattern: String,
    },
}

impl RouterError {
    pub(crate) fn invalid_pattern(pattern: &str, reason: impl Into<String>) -> Self {
        RouterError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure while decoding a request body.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body is not valid JSON or does not fit the target type.
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
    /// `body_parser` does not know how to decode this content type.
    #[error("unsupported content type `{0}`")]
    UnsupportedContentType(String),
    /// `multipart/form-data` without a usable `boundary` parameter.
    #[error("multipart body has no boundary")]
    MissingBoundary,
    /// The multipart body could not be split into parts.
    #[error("malformed multipart body: {0}")]
    MalformedMultipart(String),
    /// No multipart file part with the requested field name.
    #[error("no file part named `{0}`")]
    MissingPart(String),
    /// A form field that the handler requires is absent.
    #[error("missing form field `{0}`")]
    MissingField(String),
}

/// An error that carries the HTTP status it should be answered with.
///
/// The default error handler honours the status; any other error becomes a 500.
///
/// ```rust
/// use chainrouter::error::HttpError;
/// use http::StatusCode;
///
/// let err = HttpError::new(StatusCode::FORBIDDEN, "members only");
/// assert_eq!(err.status(), StatusCode::FORBIDDEN);
/// assert_eq!(err.to_string(), "members only");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    /// Create an error answered with `status` and `message` as the body.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Create an error whose message is the canonical reason phrase of `status`.
    #[must_use]
    pub fn from_status(status: StatusCode) -> Self {
        Self::new(status, status.canonical_reason().unwrap_or("Unknown Status"))
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}
