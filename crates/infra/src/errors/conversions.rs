//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use steward_domain::StewardError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct InfraError(pub StewardError);

impl From<InfraError> for StewardError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<StewardError> for InfraError {
    fn from(value: StewardError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoStewardError {
    fn into_steward(self) -> StewardError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → StewardError */
/* -------------------------------------------------------------------------- */

impl IntoStewardError for HttpError {
    fn into_steward(self) -> StewardError {
        if self.is_timeout() {
            return StewardError::Network("HTTP request timed out".into());
        }

        #[cfg(not(target_arch = "wasm32"))]
        if self.is_connect() {
            return StewardError::Network("HTTP connection failure".into());
        }

        if self.is_decode() {
            return StewardError::Decode(self.to_string());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 => StewardError::Unauthorized(message),
                403 => StewardError::Forbidden(message),
                404 => StewardError::NotFound(message),
                429 => StewardError::RateLimited(message),
                500..=599 => StewardError::Server { status: code, message },
                _ => StewardError::Client { status: code, message },
            };
        }

        StewardError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_steward())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error / serde_json::Error → StewardError */
/* -------------------------------------------------------------------------- */

impl IntoStewardError for std::io::Error {
    fn into_steward(self) -> StewardError {
        StewardError::Storage(format!("{:?}: {self}", self.kind()))
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_steward())
    }
}

impl IntoStewardError for serde_json::Error {
    fn into_steward(self) -> StewardError {
        StewardError::Storage(format!("invalid session document: {self}"))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(value.into_steward())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
