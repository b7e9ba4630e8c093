//! Out-of-band credential renewal
//!
//! Talks to the renewal endpoint with its own cookie-aware HTTP client so a
//! 401 here can never re-enter the decorated client's refresh handling.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use steward_core::CredentialRenewer;
use steward_domain::{AuthError, StewardError, TokenGrant};
use tracing::{debug, instrument, warn};

use crate::http::HttpClient;

/// Renewal endpoint payload: `{data: {accessToken, refreshToken?}}`, or the
/// same fields at the top level
#[derive(Debug, Deserialize)]
struct RenewalEnvelope {
    data: Option<TokenGrant>,
}

/// POSTs to the renewal endpoint
pub struct RenewalClient {
    http: HttpClient,
    url: String,
}

impl RenewalClient {
    /// # Errors
    /// Returns `StewardError::Config` if the HTTP client cannot be built.
    pub fn new(base_url: &str, refresh_path: &str, timeout: Duration) -> Result<Self, StewardError> {
        let http = HttpClient::builder().timeout(timeout).cookie_store(true).build()?;
        Ok(Self { http, url: format!("{}{}", base_url.trim_end_matches('/'), refresh_path) })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CredentialRenewer for RenewalClient {
    #[instrument(skip(self, refresh_token), fields(url = %self.url))]
    async fn renew(&self, refresh_token: Option<&str>) -> Result<TokenGrant, AuthError> {
        let mut builder = self.http.request(Method::POST, &self.url);
        if let Some(token) = refresh_token {
            builder = builder.json(&json!({ "refreshToken": token }));
        }

        let response =
            self.http.send(builder).await.map_err(|e| AuthError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| AuthError::Transport(e.to_string()))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "renewal rejected");
            return Err(AuthError::Rejected { status: status.as_u16(), message: rejection_message(&body) });
        }

        let grant = parse_grant(&body)?;
        debug!(rotated = grant.refresh_token.is_some(), "renewal succeeded");
        Ok(grant)
    }
}

fn parse_grant(body: &str) -> Result<TokenGrant, AuthError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

    let grant = match serde_json::from_value::<RenewalEnvelope>(value.clone()) {
        Ok(RenewalEnvelope { data: Some(grant) }) => grant,
        _ => serde_json::from_value::<TokenGrant>(value)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?,
    };

    if grant.access_token.is_empty() {
        return Err(AuthError::MalformedResponse("empty access token".to_string()));
    }
    Ok(grant)
}

fn rejection_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| "renewal rejected".to_string())
}
