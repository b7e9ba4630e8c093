//! Header names the session layer reads and writes

use http::header::{HeaderName, HeaderValue, InvalidHeaderValue};
use steward_domain::constants::{
    HEADER_AUTHORIZATION, HEADER_CLIENT_TYPE, HEADER_DOMAIN_KEY, HEADER_DOMAIN_TYPE,
    HEADER_PROJECT_ID, HEADER_TRACE_ID,
};
use steward_domain::{Result, StewardError};

pub const AUTHORIZATION: HeaderName = HeaderName::from_static(HEADER_AUTHORIZATION);
pub const DOMAIN_TYPE: HeaderName = HeaderName::from_static(HEADER_DOMAIN_TYPE);
pub const DOMAIN_KEY: HeaderName = HeaderName::from_static(HEADER_DOMAIN_KEY);
pub const PROJECT_ID: HeaderName = HeaderName::from_static(HEADER_PROJECT_ID);
pub const CLIENT_TYPE: HeaderName = HeaderName::from_static(HEADER_CLIENT_TYPE);
pub const TRACE_ID: HeaderName = HeaderName::from_static(HEADER_TRACE_ID);

/// Validate a header value for `name`.
///
/// # Errors
/// Returns `StewardError::Client` (400) if `raw` contains characters not
/// allowed in a header value.
pub fn header_value(name: &HeaderName, raw: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(raw).map_err(|e| invalid(name, &e))
}

/// Same as [`header_value`], marked sensitive so it is redacted from
/// `Debug` output.
///
/// # Errors
/// See [`header_value`].
pub fn sensitive_value(name: &HeaderName, raw: &str) -> Result<HeaderValue> {
    let mut value = header_value(name, raw)?;
    value.set_sensitive(true);
    Ok(value)
}

/// Parse a caller-supplied header name.
///
/// # Errors
/// Returns `StewardError::Client` (400) if `raw` is not a valid header name.
pub fn header_name(raw: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(raw.as_bytes()).map_err(|e| StewardError::Client {
        status: 400,
        message: format!("invalid header name {raw:?}: {e}"),
    })
}

fn invalid(name: &HeaderName, error: &InvalidHeaderValue) -> StewardError {
    StewardError::Client { status: 400, message: format!("invalid value for header {name}: {error}") }
}
