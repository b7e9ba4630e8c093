//! Response classification
//!
//! Turns a raw status + JSON body into either the unwrapped payload or a
//! typed [`StewardError`]. A 401 is classified but never surfaced here; the
//! API client hands it to the token refresher first.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use steward_domain::{ErrorCategory, Result, StewardError};
use tracing::{debug, warn};

use crate::notify::{Notice, Notifier};
use crate::request::RequestOptions;

/// Status and decoded body as received from transport
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value,
}

impl RawResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// A successful response after envelope handling
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// `data` from the envelope, or the whole body when not unwrapped
    pub data: Value,
    /// Envelope `meta`, kept for pagination
    pub meta: Option<Value>,
    pub status: u16,
}

impl ApiResponse {
    /// Deserialize the payload into `T`
    ///
    /// # Errors
    /// Returns `StewardError::Decode` if the payload does not match `T`.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T> {
        serde_json::from_value(self.data).map_err(|e| StewardError::Decode(e.to_string()))
    }

    /// Payload and meta recombined, the shape list normalization expects
    pub fn into_payload(self) -> Value {
        match self.meta {
            Some(meta) => serde_json::json!({ "data": self.data, "meta": meta }),
            None => self.data,
        }
    }
}

/// Map a domain error code to its HTTP-equivalent severity
pub fn business_status_for_code(code: &str) -> u16 {
    let code = code.trim().to_ascii_uppercase();
    match code.as_str() {
        "VALIDATION_ERROR" | "BAD_REQUEST" => 400,
        c if c.starts_with("INVALID_") => 400,
        "UNAUTHORIZED" | "TOKEN_EXPIRED" | "TOKEN_INVALID" => 401,
        "FORBIDDEN" | "PERMISSION_DENIED" => 403,
        "NOT_FOUND" => 404,
        "CONFLICT" => 409,
        "RATE_LIMITED" | "TOO_MANY_REQUESTS" => 429,
        _ => 500,
    }
}

/// Classifies responses and surfaces failures to the operator
pub struct ResponseClassifier {
    notifier: Arc<dyn Notifier>,
}

impl ResponseClassifier {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Classify without surfacing anything
    ///
    /// # Errors
    /// Business errors on 2xx and status errors otherwise.
    pub fn classify(&self, raw: RawResponse, options: &RequestOptions) -> Result<ApiResponse> {
        if !raw.is_success() {
            return Err(status_error(raw.status, &raw.body));
        }

        if let Some(error) = business_error(&raw.body) {
            return Err(error);
        }

        let status = raw.status;
        match raw.body {
            Value::Object(mut map) if !options.skip_unwrap && is_envelope(&map) => {
                let data = map.remove("data").unwrap_or(Value::Null);
                let meta = map.remove("meta").filter(|m| !m.is_null());
                Ok(ApiResponse { data, meta, status })
            }
            body => Ok(ApiResponse { data: body, meta: None, status }),
        }
    }

    /// Classify and notify the operator of any failure that is not
    /// handled elsewhere
    ///
    /// # Errors
    /// Same as [`Self::classify`].
    pub fn classify_and_surface(
        &self,
        raw: RawResponse,
        options: &RequestOptions,
    ) -> Result<ApiResponse> {
        self.classify(raw, options).map_err(|e| self.surface(e, options))
    }

    /// Emit a failure notice unless the caller opted out or the session
    /// layer already told the operator. Returns the error unchanged.
    pub fn surface(&self, error: StewardError, options: &RequestOptions) -> StewardError {
        let category = error.category();
        let handled_elsewhere = matches!(
            category,
            ErrorCategory::Authentication | ErrorCategory::ImpersonationExpired
        );

        if options.skip_error_handling || handled_elsewhere {
            debug!(error = %error, "request failed, not surfaced");
        } else {
            warn!(error = %error, category = ?category, "request failed");
            self.notifier.notify(Notice::RequestFailed { category, message: error.user_message() });
        }
        error
    }
}

/// `{data, ...}` with a null/absent `error` or a `meta` sibling
fn is_envelope(map: &serde_json::Map<String, Value>) -> bool {
    map.contains_key("data")
        && (map.get("error").map_or(true, Value::is_null) || map.contains_key("meta"))
}

fn business_error(body: &Value) -> Option<StewardError> {
    let error = body.get("error").filter(|e| !e.is_null() && **e != Value::Bool(false))?;
    let (code, message) = match error {
        Value::Object(obj) => {
            let code = obj.get("code").map(value_to_string).unwrap_or_default();
            let message = obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| code.clone());
            (code, message)
        }
        Value::String(s) => (s.clone(), body_message(body).unwrap_or_else(|| s.clone())),
        other => (value_to_string(other), body_message(body).unwrap_or_default()),
    };

    let code = if code.is_empty() { "UNKNOWN".to_string() } else { code };
    let status = business_status_for_code(&code);
    Some(StewardError::Business { code, status, message })
}

/// Map a non-2xx status to the error taxonomy
fn status_error(status: u16, body: &Value) -> StewardError {
    let message = error_message(body).unwrap_or_else(|| format!("HTTP {status}"));
    match status {
        401 => StewardError::Unauthorized(message),
        403 => StewardError::Forbidden(message),
        404 => StewardError::NotFound(message),
        429 => StewardError::RateLimited(message),
        500..=599 => StewardError::Server { status, message },
        _ => StewardError::Client { status, message },
    }
}

fn error_message(body: &Value) -> Option<String> {
    body.get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| body.get("error").and_then(Value::as_str).map(str::to_string))
        .or_else(|| body_message(body))
        .or_else(|| body.as_str().filter(|s| !s.is_empty()).map(str::to_string))
}

fn body_message(body: &Value) -> Option<String> {
    body.get("message").and_then(Value::as_str).map(str::to_string)
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
