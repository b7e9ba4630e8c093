//! Decorated API client
//!
//! The single request channel collaborators call into. Every request goes
//! through context resolution, one transport attempt, 401 recovery via the
//! token refresher, then response classification.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method as HttpMethod;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use steward_core::{
    normalize_list, ApiRequest, ApiResponse, CredentialRenewer, EndpointPolicy, Method, Navigator,
    NormalizedList, Notifier, PageDefaults, RawResponse, RequestContextResolver,
    ResponseClassifier, SessionStore, TokenRefresher, UnauthorizedRequest,
};
use steward_core::request::headers::TRACE_ID;
use steward_domain::{AuthEndpoints, Result, StewardConfig, StewardError};
use tracing::{debug, instrument};

use super::renewal::RenewalClient;
use crate::errors::InfraError;
use crate::http::HttpClient;
use crate::navigation::RouteNavigator;
use crate::notify::TracingNotifier;

/// Configuration for API client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL for API (e.g., "https://admin.example.com/api")
    pub base_url: String,
    /// Timeout for API requests
    pub timeout: Duration,
    /// Value of the client-type marker header
    pub client_type: String,
    pub endpoints: AuthEndpoints,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self::from_config(&StewardConfig::default())
    }
}

impl ApiClientConfig {
    pub fn from_config(config: &StewardConfig) -> Self {
        Self {
            base_url: config.api.base_url.clone(),
            timeout: Duration::from_millis(config.api.timeout_ms),
            client_type: config.api.client_type.clone(),
            endpoints: config.auth.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// API client carrying session context on every call
pub struct ApiClient {
    http: HttpClient,
    config: ApiClientConfig,
    store: Arc<SessionStore>,
    resolver: RequestContextResolver,
    refresher: Arc<TokenRefresher>,
    classifier: ResponseClassifier,
}

impl ApiClient {
    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn refresher(&self) -> &Arc<TokenRefresher> {
        &self.refresher
    }

    /// Send a request through the decorated channel.
    ///
    /// A 401 on an endpoint that triggers renewal is absorbed when the
    /// refresher renews the credential; the request is then replayed with it.
    ///
    /// # Errors
    /// Returns the classified error. Failures other than authentication are
    /// surfaced as notices unless the request opts out.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse> {
        loop {
            let decorated = match self.resolver.resolve(&request) {
                Ok(decorated) => decorated,
                Err(e) => return Err(self.classifier.surface(e, &request.options)),
            };
            // Replays keep the original trace id
            if let Some(trace) = decorated.request.headers.get(TRACE_ID) {
                request.headers.entry(TRACE_ID).or_insert_with(|| trace.clone());
            }

            let raw = match self.transmit(&decorated.request).await {
                Ok(raw) => raw,
                Err(e) => return Err(self.classifier.surface(e, &request.options)),
            };

            match self.classifier.classify(raw, &request.options) {
                Ok(response) => return Ok(response),
                Err(error)
                    if error.is_unauthorized()
                        && self.resolver.policy().triggers_refresh(&request.path) =>
                {
                    let failed = UnauthorizedRequest {
                        path: request.path.clone(),
                        trace_id: decorated.trace_id,
                        retry_count: request.retry_count,
                        identity: decorated.identity,
                        credential_generation: decorated.credential_generation,
                    };
                    match self.refresher.recover(failed, error).await {
                        Ok(()) => {
                            request.retry_count = request.retry_count.saturating_add(1);
                            debug!(retry_count = request.retry_count, "replaying after renewal");
                        }
                        Err(e) => return Err(self.classifier.surface(e, &request.options)),
                    }
                }
                Err(e) => return Err(self.classifier.surface(e, &request.options)),
            }
        }
    }

    /// Execute a GET request and deserialize the payload
    ///
    /// # Errors
    /// Returns error if request fails or response cannot be deserialized
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(ApiRequest::get(path)).await?.into_data()
    }

    /// Execute a POST request and deserialize the payload
    ///
    /// # Errors
    /// Returns error if the body cannot be serialized, the request fails, or
    /// the response cannot be deserialized
    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.send(ApiRequest::post(path, to_body(body)?)).await?.into_data()
    }

    /// Execute a PUT request and deserialize the payload
    ///
    /// # Errors
    /// Same as [`Self::post`].
    pub async fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.send(ApiRequest::put(path, to_body(body)?)).await?.into_data()
    }

    /// Execute a DELETE request
    ///
    /// # Errors
    /// Returns error if the request fails
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(ApiRequest::delete(path)).await.map(|_| ())
    }

    /// GET a paginated collection and normalize it
    ///
    /// # Errors
    /// Returns error if the request fails; shape mismatches fall back to
    /// defaults instead.
    pub async fn get_list(
        &self,
        request: ApiRequest,
        candidates: &[&str],
        defaults: PageDefaults,
    ) -> Result<NormalizedList> {
        let payload = self.send(request).await?.into_payload();
        Ok(normalize_list(&payload, candidates, defaults))
    }

    async fn transmit(&self, request: &ApiRequest) -> Result<RawResponse> {
        let url = self.config.url(&request.path);
        let mut builder = self.http.request(http_method(request.method), &url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = builder.headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = self.http.send(builder).await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| StewardError::from(InfraError::from(e)))?;

        Ok(RawResponse::new(status, decode_body(&bytes)))
    }
}

/// JSON when possible, otherwise the raw text (empty bodies become null)
fn decode_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

fn to_body<B: Serialize>(body: &B) -> Result<Value> {
    serde_json::to_value(body)
        .map_err(|e| StewardError::Client { status: 400, message: format!("Failed to serialize body: {e}") })
}

const fn http_method(method: Method) -> HttpMethod {
    match method {
        Method::Get => HttpMethod::GET,
        Method::Post => HttpMethod::POST,
        Method::Put => HttpMethod::PUT,
        Method::Patch => HttpMethod::PATCH,
        Method::Delete => HttpMethod::DELETE,
    }
}

/// Builder for API client
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ApiClientConfig>,
    store: Option<Arc<SessionStore>>,
    renewer: Option<Arc<dyn CredentialRenewer>>,
    notifier: Option<Arc<dyn Notifier>>,
    navigator: Option<Arc<dyn Navigator>>,
    policy: Option<EndpointPolicy>,
}

impl ApiClientBuilder {
    /// Set the API configuration
    pub fn config(mut self, config: ApiClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the session store shared with the rest of the host
    pub fn store(mut self, store: Arc<SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the renewal call (defaults to [`RenewalClient`])
    pub fn renewer(mut self, renewer: Arc<dyn CredentialRenewer>) -> Self {
        self.renewer = Some(renewer);
        self
    }

    /// Set the notice sink (defaults to [`TracingNotifier`])
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Set the sign-in navigator (defaults to [`RouteNavigator`])
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Override public/domain-exempt endpoint classification
    pub fn policy(mut self, policy: EndpointPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Build the API client
    ///
    /// # Errors
    ///
    /// Returns error if the session store is missing, the client type is not
    /// a valid header value, or the HTTP client cannot be created
    pub fn build(self) -> Result<ApiClient> {
        let config = self.config.unwrap_or_default();
        let store =
            self.store.ok_or_else(|| StewardError::Config("Session store not set".to_string()))?;

        let http = HttpClient::builder().timeout(config.timeout).build()?;

        let renewer = match self.renewer {
            Some(renewer) => renewer,
            None => Arc::new(RenewalClient::new(
                &config.base_url,
                &config.endpoints.refresh,
                config.timeout,
            )?),
        };
        let notifier = self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier));
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(RouteNavigator::new(config.endpoints.sign_in_route.clone())));
        let policy = self.policy.unwrap_or_else(|| EndpointPolicy::from_endpoints(&config.endpoints));

        let resolver =
            RequestContextResolver::new(store.clone(), policy, notifier.clone(), &config.client_type)?;
        let refresher =
            Arc::new(TokenRefresher::new(store.clone(), renewer, notifier.clone(), navigator));
        let classifier = ResponseClassifier::new(notifier);

        Ok(ApiClient { http, config, store, resolver, refresher, classifier })
    }
}
