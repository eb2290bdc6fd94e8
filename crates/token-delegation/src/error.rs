//! Error types for the delegation exchange.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.

use std::time::Duration;

/// IdP error types that mean "the exchange was refused", as opposed to a fault.
const REJECTION_TYPES: &[&str] = &[
    "NotAuthorizedException",
    "UserNotFoundException",
    "CodeMismatchException",
    "ExpiredCodeException",
];

/// Errors from the HTTP client layer talking to the IdP.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Middleware error
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// Request timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Rate limited by the IdP (429 response)
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested wait time before retry
        retry_after: Duration,
    },

    /// The IdP answered with a typed error document (`__type` / `message`).
    #[error("IdP error {kind}: {message}")]
    Service {
        /// Error type reported by the IdP, e.g. `NotAuthorizedException`
        kind: String,
        /// Error message from the IdP
        message: String,
    },

    /// JSON parsing error
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response parsed but did not have the expected shape
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Server error (5xx response)
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Unexpected HTTP status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },

    /// A request needing a SigV4 signature could not be signed.
    #[error("Request signing failed: {0}")]
    Signing(String),
}

impl ClientError {
    /// Create a rate limited error with retry-after duration.
    #[must_use]
    pub fn rate_limited(seconds: u64) -> Self {
        Self::RateLimited { retry_after: Duration::from_secs(seconds) }
    }

    /// Create a typed IdP service error.
    #[must_use]
    pub fn service(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service { kind: kind.into(), message: message.into() }
    }

    /// Create a server error.
    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server { status, message: message.into() }
    }

    /// Create an unexpected-response error.
    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::UnexpectedResponse(message.into())
    }

    /// Returns true if the IdP refused the exchange rather than failing to serve it.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        match self {
            Self::Service { kind, .. } => {
                // AWS sometimes prefixes the type with a namespace ("ns#Type")
                let kind = kind.rsplit('#').next().unwrap_or(kind);
                REJECTION_TYPES.contains(&kind)
            }
            _ => false,
        }
    }
}

/// Why a presented token failed validation.
///
/// Only ever logged; the challenge verifier collapses every variant to `false`.
#[derive(thiserror::Error, Debug)]
pub enum VerifyError {
    /// The answer was empty.
    #[error("empty token")]
    Empty,

    /// JWT decode / signature / claim verification failed.
    #[error("JWT verification failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// The JWT header contains no `kid` field.
    #[error("JWT missing 'kid' field in header")]
    MissingKeyId,

    /// The `kid` is not in the published key set, even after a refresh.
    #[error("Unknown key ID: {0}")]
    UnknownKeyId(String),

    /// The key set could not be fetched.
    #[error("Signing key fetch failed: {0}")]
    KeySet(#[from] ClientError),
}

/// Errors from parameter lookups.
#[derive(thiserror::Error, Debug)]
pub enum ParameterError {
    /// No value stored under this name.
    #[error("Parameter not found: {0}")]
    NotFound(String),

    /// Stored value is present but unusable.
    #[error("Invalid parameter {name}: {message}")]
    Invalid {
        /// Parameter name
        name: String,
        /// What is wrong with the value
        message: String,
    },
}

/// Errors surfaced by [`crate::DelegationClient::acquire_delegation_token`].
#[derive(thiserror::Error, Debug)]
pub enum DelegationError {
    /// The request cannot be satisfied; detected before any network call.
    #[error("Precondition failed for '{field}': {message}")]
    Precondition {
        /// Input that is missing or invalid
        field: &'static str,
        /// Validation message
        message: String,
    },

    /// The IdP could not be reached or answered with a fault.
    #[error("Identity provider unavailable: {0}")]
    UpstreamUnavailable(#[source] ClientError),

    /// The IdP refused the exchange.
    ///
    /// Display is uniform; `reason` is for operational logs only.
    #[error("delegation denied")]
    AuthenticationRejected {
        /// Internal description of the refusal
        reason: String,
    },
}

impl DelegationError {
    /// Create a precondition error.
    #[must_use]
    pub fn precondition(field: &'static str, message: impl Into<String>) -> Self {
        Self::Precondition { field, message: message.into() }
    }

    /// Create an authentication-rejected error.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::AuthenticationRejected { reason: reason.into() }
    }

    /// Internal rejection reason, if this is a rejection.
    #[must_use]
    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            Self::AuthenticationRejected { reason } => Some(reason),
            _ => None,
        }
    }
}

impl From<ClientError> for DelegationError {
    fn from(err: ClientError) -> Self {
        if err.is_rejection() {
            Self::rejected(err.to_string())
        } else {
            Self::UpstreamUnavailable(err)
        }
    }
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for delegation operations.
pub type DelegationResult<T> = Result<T, DelegationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_types() {
        assert!(ClientError::service("NotAuthorizedException", "nope").is_rejection());
        assert!(ClientError::service("com.amazon#UserNotFoundException", "x").is_rejection());

        assert!(!ClientError::service("UserLambdaValidationException", "x").is_rejection());
        assert!(!ClientError::server(503, "down").is_rejection());
    }

    #[test]
    fn test_faults_are_not_rejections() {
        assert!(!ClientError::rate_limited(5).is_rejection());
        assert!(!ClientError::Timeout(Duration::from_secs(10)).is_rejection());
        assert!(!ClientError::Signing("no credentials".into()).is_rejection());
        assert!(!ClientError::unexpected("no session").is_rejection());
    }

    #[test]
    fn test_client_error_maps_to_delegation_error() {
        let err: DelegationError =
            ClientError::service("NotAuthorizedException", "bad answer").into();
        assert!(matches!(err, DelegationError::AuthenticationRejected { .. }));

        let err: DelegationError = ClientError::server(502, "bad gateway").into();
        assert!(matches!(err, DelegationError::UpstreamUnavailable(_)));
    }

    #[test]
    fn test_rejection_display_is_uniform() {
        let a = DelegationError::rejected("signature mismatch");
        let b = DelegationError::rejected("unknown kid");
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a.rejection_reason(), Some("signature mismatch"));
    }
}
