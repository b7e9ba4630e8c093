//! Error types used throughout the session layer

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse error categories used for user messaging and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Connectivity failures and timeouts
    Network,
    /// 401 outside impersonation, including terminated sessions
    Authentication,
    /// 401 received while an impersonation overlay was active
    ImpersonationExpired,
    /// Domain error code carried inside an otherwise successful envelope
    Business,
    /// 403
    Authorization,
    /// 404
    NotFound,
    /// 429
    RateLimit,
    /// 5xx
    Server,
    /// Other 4xx and malformed input
    Client,
    /// Configuration, storage, decoding and internal failures
    Internal,
}

/// Main error type for the request channel
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum StewardError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Impersonation session expired")]
    ImpersonationExpired,

    #[error("Session terminated: {0}")]
    SessionTerminated(String),

    #[error("Business error {code} ({status}): {message}")]
    Business { code: String, status: u16, message: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Client error ({status}): {message}")]
    Client { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StewardError {
    /// Get the error category for this error
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Network(_) | Self::Timeout(_) => ErrorCategory::Network,
            Self::Unauthorized(_) | Self::SessionTerminated(_) => ErrorCategory::Authentication,
            Self::ImpersonationExpired => ErrorCategory::ImpersonationExpired,
            Self::Business { .. } => ErrorCategory::Business,
            Self::Forbidden(_) => ErrorCategory::Authorization,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::RateLimited(_) => ErrorCategory::RateLimit,
            Self::Server { .. } => ErrorCategory::Server,
            Self::Client { .. } => ErrorCategory::Client,
            Self::Decode(_) | Self::Config(_) | Self::Storage(_) | Self::Internal(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// HTTP-equivalent status, when the error maps to one
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) | Self::ImpersonationExpired | Self::SessionTerminated(_) => {
                Some(401)
            }
            Self::Business { status, .. }
            | Self::Server { status, .. }
            | Self::Client { status, .. } => Some(*status),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::RateLimited(_) => Some(429),
            Self::Network(_)
            | Self::Timeout(_)
            | Self::Decode(_)
            | Self::Config(_)
            | Self::Storage(_)
            | Self::Internal(_) => None,
        }
    }

    /// Whether this is a 401 the token refresher may act on
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Message suitable for showing to the operator
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => {
                "Unable to reach the server. Check your network connection and try again."
                    .to_string()
            }
            Self::Timeout(_) => {
                "The server took too long to respond. Check your connection and try again."
                    .to_string()
            }
            Self::Unauthorized(_) | Self::SessionTerminated(_) => {
                "Your session has ended. Please sign in again.".to_string()
            }
            Self::ImpersonationExpired => {
                "The impersonation session has expired. You are acting as yourself again."
                    .to_string()
            }
            Self::Business { message, .. } => message.clone(),
            Self::Forbidden(_) => "You do not have permission to perform this action.".to_string(),
            Self::NotFound(_) => "The requested resource was not found.".to_string(),
            Self::RateLimited(_) => "Too many requests. Please wait a moment and retry.".to_string(),
            Self::Server { .. } => "The server encountered an error. Please try again later.".to_string(),
            Self::Client { message, .. } => message.clone(),
            Self::Decode(_) | Self::Config(_) | Self::Storage(_) | Self::Internal(_) => {
                "An unexpected error occurred.".to_string()
            }
        }
    }
}

/// Errors returned on the login and renewal paths
///
/// These paths return `Result<_, AuthError>` so callers can tell "no session"
/// apart from an authentication failure without unwinding through the request
/// channel.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum AuthError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Authentication rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Malformed authentication response: {0}")]
    MalformedResponse(String),

    #[error("Failed to persist session: {0}")]
    Storage(String),
}

impl From<AuthError> for StewardError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials(message) => Self::Unauthorized(message),
            AuthError::NotAuthenticated => Self::Unauthorized("not authenticated".to_string()),
            AuthError::Rejected { status: 401, message } => Self::Unauthorized(message),
            AuthError::Rejected { status, message } => Self::Client { status, message },
            AuthError::Transport(message) => Self::Network(message),
            AuthError::MalformedResponse(message) => Self::Decode(message),
            AuthError::Storage(message) => Self::Storage(message),
        }
    }
}

/// Result type alias for session-layer operations
pub type Result<T> = std::result::Result<T, StewardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(StewardError::Network("down".into()).category(), ErrorCategory::Network);
        assert_eq!(StewardError::Timeout(100).category(), ErrorCategory::Network);
        assert_eq!(
            StewardError::ImpersonationExpired.category(),
            ErrorCategory::ImpersonationExpired
        );
        assert_eq!(
            StewardError::Business { code: "X".into(), status: 400, message: "m".into() }
                .category(),
            ErrorCategory::Business
        );
        assert_eq!(StewardError::RateLimited("slow".into()).category(), ErrorCategory::RateLimit);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(StewardError::Forbidden("no".into()).status(), Some(403));
        assert_eq!(StewardError::Network("down".into()).status(), None);
        assert_eq!(
            StewardError::Server { status: 503, message: "busy".into() }.status(),
            Some(503)
        );
    }

    #[test]
    fn test_auth_error_conversion() {
        let err: StewardError =
            AuthError::Rejected { status: 401, message: "expired".into() }.into();
        assert!(err.is_unauthorized());

        let err: StewardError = AuthError::Transport("refused".into()).into();
        assert_eq!(err.category(), ErrorCategory::Network);
    }

    #[test]
    fn test_business_message_is_passed_through() {
        let err = StewardError::Business {
            code: "VALIDATION_ERROR".into(),
            status: 400,
            message: "name is required".into(),
        };
        assert_eq!(err.user_message(), "name is required");
    }
}
