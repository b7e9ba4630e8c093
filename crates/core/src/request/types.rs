//! Outbound request model
//!
//! Transport-neutral description of an API call plus the per-call flags the
//! resolver, refresher and classifier honour.

use http::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use steward_domain::{DomainContext, Result};

use super::headers::{header_name, header_value, DOMAIN_KEY, DOMAIN_TYPE, PROJECT_ID};

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Return the whole body instead of unwrapping the `data` envelope
    pub skip_unwrap: bool,
    /// Do not emit user-facing notices for failures of this call
    pub skip_error_handling: bool,
    /// Send without a bearer credential
    pub skip_auth: bool,
    /// Use the base identity even while impersonating
    pub skip_impersonation: bool,
}

/// A pending API call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL, e.g. `/users`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Caller-set headers; the resolver never overrides scope headers here
    pub headers: HeaderMap,
    pub options: RequestOptions,
    /// Number of times this call has been replayed after a 401
    pub retry_count: u8,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
            options: RequestOptions::default(),
            retry_count: 0,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Put, path).body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Patch, path).body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    #[must_use]
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Insert or replace a header
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Insert or replace a header given as strings.
    ///
    /// # Errors
    /// Returns `StewardError::Client` if the name or value is not valid in
    /// an HTTP header.
    pub fn try_header(self, name: &str, value: &str) -> Result<Self> {
        let name = header_name(name)?;
        let value = header_value(&name, value)?;
        Ok(self.header(name, value))
    }

    /// Target an explicit domain; the resolver will not override it.
    ///
    /// # Errors
    /// Returns `StewardError::Client` if the domain type or key cannot be
    /// sent as a header value.
    pub fn in_domain(self, domain: &DomainContext) -> Result<Self> {
        let domain_type = header_value(&DOMAIN_TYPE, &domain.domain_type)?;
        let key = header_value(&DOMAIN_KEY, &domain.key)?;
        Ok(self.header(DOMAIN_TYPE, domain_type).header(DOMAIN_KEY, key))
    }

    /// Target an explicit project; the resolver will not override it.
    ///
    /// # Errors
    /// Returns `StewardError::Client` if the id cannot be sent as a header
    /// value.
    pub fn in_project(self, project_id: &str) -> Result<Self> {
        let value = header_value(&PROJECT_ID, project_id)?;
        Ok(self.header(PROJECT_ID, value))
    }

    #[must_use]
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn skip_unwrap(mut self) -> Self {
        self.options.skip_unwrap = true;
        self
    }

    #[must_use]
    pub fn skip_error_handling(mut self) -> Self {
        self.options.skip_error_handling = true;
        self
    }

    #[must_use]
    pub fn skip_auth(mut self) -> Self {
        self.options.skip_auth = true;
        self
    }

    #[must_use]
    pub fn skip_impersonation(mut self) -> Self {
        self.options.skip_impersonation = true;
        self
    }
}

/// Identity a request was decorated with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectiveIdentity {
    /// No bearer credential was attached
    Anonymous,
    /// The operator's own access credential
    Base,
    /// An impersonation token for the given tenant
    Impersonating { target_tenant_id: String },
}

/// Output of the request context resolver
#[derive(Debug, Clone, PartialEq)]
pub struct DecoratedRequest {
    pub request: ApiRequest,
    pub trace_id: String,
    pub identity: EffectiveIdentity,
    /// Credential generation of the session when the request was decorated
    pub credential_generation: u64,
}
