//! Error types for the orchestration layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::response::ErrorDescriptor;

/// Result alias used throughout the crate.
pub type ApiResult<T> = Result<T, ApiError>;

/// Failure reported by a [`Transport`](crate::Transport) before any response was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("transport error: {message}")]
pub struct TransportError {
    /// Error message.
    pub message: String,
    /// HTTP status code, if the transport saw one.
    pub status_code: Option<u16>,
    /// Whether the request timed out.
    pub is_timeout: bool,
    /// Whether the connection could not be established.
    pub is_connect: bool,
}

impl TransportError {
    /// Create a non-retryable transport error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
            is_timeout: false,
            is_connect: false,
        }
    }

    /// Create a timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            is_timeout: true,
            ..Self::new(message)
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connect(message: impl Into<String>) -> Self {
        Self {
            is_connect: true,
            ..Self::new(message)
        }
    }

    /// Attach the HTTP status code.
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    /// Returns `true` if retrying the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.is_timeout || self.is_connect
    }
}

/// Coarse classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing host or credential; never retried.
    Precondition,
    /// Rate limit, 5xx or network failure that outlived the retry budget.
    Transient,
    /// Response without the expected envelope.
    Malformed,
    /// The remote API returned error descriptors.
    Application,
    /// The expected result key was absent.
    SchemaMismatch,
    /// Local failure: configuration, aggregation, serialization.
    Internal,
}

/// Error type for orchestration calls.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Session is not usable.
    #[error("{message}")]
    Precondition {
        /// Details.
        message: String,
    },

    /// Transport failed in a way that is not worth retrying.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Transient failures persisted through every attempt.
    #[error(
        "Error {} occurred on [{method}]{endpoint} api request after {attempts} attempts: {response}",
        .status.map_or_else(|| "-".to_string(), |s| s.to_string())
    )]
    RetriesExhausted {
        /// Attempts performed.
        attempts: u32,
        /// HTTP method.
        method: String,
        /// Normalized endpoint.
        endpoint: String,
        /// Last observed status, if any.
        status: Option<u16>,
        /// Last observed response (serialized, redacted).
        response: String,
    },

    /// GraphQL envelope never arrived.
    #[error("Unable to fetch graphQL response after {attempts} attempts. {response}")]
    MalformedResponse {
        /// Attempts performed.
        attempts: u32,
        /// Last observed response or transport error.
        response: String,
    },

    /// REST response carried error descriptors.
    #[error("Error {status} occurred on [{method}]{endpoint} api request: {response}")]
    Application {
        /// HTTP method.
        method: String,
        /// Normalized endpoint.
        endpoint: String,
        /// HTTP status.
        status: u16,
        /// Offending response (serialized, redacted).
        response: String,
    },

    /// GraphQL response carried error descriptors.
    #[error("Error {status} occurred on query call: {}", describe_errors(.errors))]
    Graphql {
        /// HTTP status.
        status: u16,
        /// Error descriptors.
        errors: Vec<ErrorDescriptor>,
    },

    /// The response did not contain the expected key.
    #[error(
        "Error {status} occurred on {endpoint} api call, unable to detect shopify response object `{key}`: {body}"
    )]
    SchemaMismatch {
        /// Normalized endpoint (or `graphql`).
        endpoint: String,
        /// HTTP status.
        status: u16,
        /// Missing key.
        key: String,
        /// Offending body (serialized, redacted).
        body: String,
    },

    /// Pages could not be combined.
    #[error("unable to aggregate pages: {message}")]
    Aggregate {
        /// Details.
        message: String,
    },

    /// Invalid configuration or input.
    #[error("configuration error: {message}")]
    Config {
        /// Details.
        message: String,
    },
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config {
            message: format!("JSON error: {err}"),
        }
    }
}

impl ApiError {
    /// Build a precondition error.
    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    /// Build a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Precondition { .. } => ErrorKind::Precondition,
            Self::Transport(_) | Self::RetriesExhausted { .. } => ErrorKind::Transient,
            Self::MalformedResponse { .. } => ErrorKind::Malformed,
            Self::Application { .. } | Self::Graphql { .. } => ErrorKind::Application,
            Self::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            Self::Aggregate { .. } | Self::Config { .. } => ErrorKind::Internal,
        }
    }

    /// Returns `true` if re-running the whole operation later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_retryable(),
            Self::RetriesExhausted { .. } | Self::MalformedResponse { .. } => true,
            _ => false,
        }
    }
}

fn describe_errors(errors: &[ErrorDescriptor]) -> String {
    serde_json::to_string(errors).unwrap_or_else(|_| {
        errors
            .iter()
            .map(|err| err.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_retryability() {
        assert!(TransportError::timeout("slow").is_retryable());
        assert!(TransportError::connect("refused").is_retryable());
        assert!(!TransportError::new("bad url").is_retryable());
    }

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            ApiError::precondition("missing").kind(),
            ErrorKind::Precondition
        );
        let exhausted = ApiError::RetriesExhausted {
            attempts: 5,
            method: "GET".into(),
            endpoint: "/admin/api/2024-01/orders.json".into(),
            status: Some(503),
            response: "{}".into(),
        };
        assert_eq!(exhausted.kind(), ErrorKind::Transient);
        assert!(exhausted.is_retryable());

        let mismatch = ApiError::SchemaMismatch {
            endpoint: "/admin/api/2024-01/orders.json".into(),
            status: 200,
            key: "orders".into(),
            body: "{}".into(),
        };
        assert_eq!(mismatch.kind(), ErrorKind::SchemaMismatch);
        assert!(!mismatch.is_retryable());
    }

    #[test]
    fn messages_carry_diagnostics() {
        let err = ApiError::Application {
            method: "POST".into(),
            endpoint: "/admin/api/2024-01/products.json".into(),
            status: 422,
            response: r#"{"errors":"title can't be blank"}"#.into(),
        };
        let message = err.to_string();
        assert!(message.contains("422"));
        assert!(message.contains("[POST]/admin/api/2024-01/products.json"));
        assert!(message.contains("title can't be blank"));

        let exhausted = ApiError::RetriesExhausted {
            attempts: 5,
            method: "GET".into(),
            endpoint: "/x".into(),
            status: None,
            response: "timeout".into(),
        };
        assert!(exhausted.to_string().starts_with("Error - occurred"));
    }
}
