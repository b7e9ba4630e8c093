//! Authentication endpoints over the decorated client
//!
//! Sign-in, sign-out and identity loading. Sign-in returns
//! `Result<_, AuthError>` so callers can tell rejected credentials apart
//! from an unreachable backend.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use steward_core::{ApiRequest, AuthGateway};
use steward_domain::{AuthError, LoginCredentials, Result, SessionFragment, StewardError, UserInfo};
use tracing::{debug, info, instrument};

use super::client::ApiClient;

/// Sign-in payload after envelope unwrapping. Some backends nest the
/// identity under `userInfo`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginPayload {
    #[serde(alias = "token", alias = "access_token")]
    access_token: String,
    #[serde(default, alias = "refresh_token")]
    refresh_token: Option<String>,
    #[serde(default, alias = "userInfo")]
    user: Option<UserInfo>,
}

#[async_trait]
impl AuthGateway for ApiClient {
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    async fn login(
        &self,
        credentials: &LoginCredentials,
    ) -> std::result::Result<SessionFragment, AuthError> {
        let body = serde_json::to_value(credentials)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        let request = ApiRequest::post(self.config().endpoints.login.clone(), body)
            .skip_error_handling()
            .skip_impersonation();

        let response = self.send(request).await.map_err(login_error)?;
        let payload: LoginPayload = serde_json::from_value(response.data)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        info!(has_user = payload.user.is_some(), "sign-in accepted");
        Ok(SessionFragment {
            access_token: payload.access_token,
            refresh_token: payload.refresh_token,
            user: payload.user,
        })
    }

    /// Sign-out is refresh-exempt: a 401 here means the server session is
    /// already gone, so it never starts a renewal.
    async fn logout(&self) -> Result<()> {
        let request = ApiRequest::post(self.config().endpoints.logout.clone(), json!({}))
            .skip_error_handling()
            .skip_impersonation();
        self.send(request).await?;
        debug!("server session ended");
        Ok(())
    }

    async fn fetch_user_info(&self) -> Result<UserInfo> {
        let request = ApiRequest::get(self.config().endpoints.user_info.clone()).skip_impersonation();
        self.send(request).await?.into_data()
    }
}

fn login_error(error: StewardError) -> AuthError {
    match error {
        StewardError::Unauthorized(message) => AuthError::InvalidCredentials(message),
        StewardError::Business { status: 400 | 401, message, .. }
        | StewardError::Client { status: 400, message } => AuthError::InvalidCredentials(message),
        StewardError::Network(message) => AuthError::Transport(message),
        StewardError::Timeout(ms) => AuthError::Transport(format!("timed out after {ms} ms")),
        StewardError::Decode(message) => AuthError::MalformedResponse(message),
        other => AuthError::Rejected {
            status: other.status().unwrap_or(500),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use steward_core::{InMemorySessionStorage, SessionService, SessionStore};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::ApiClientConfig;
    use crate::navigation::RouteNavigator;

    fn service(server: &MockServer) -> (SessionService, Arc<SessionStore>) {
        let store = Arc::new(SessionStore::new(Arc::new(InMemorySessionStorage::new())));
        let config = ApiClientConfig { base_url: server.uri(), ..Default::default() };
        let client = ApiClient::builder().config(config).store(store.clone()).build().unwrap();
        (SessionService::new(store.clone(), Arc::new(client)), store)
    }

    #[tokio::test]
    async fn test_login_then_user_info_populates_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(body_json(json!({"username": "root", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"accessToken": "t0", "refreshToken": "r0"},
                "error": null
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .and(header("Authorization", "Bearer t0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"id": "u1", "username": "root", "roles": ["platform_admin"]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (service, store) = service(&server);
        service.login(&LoginCredentials::new("root", "pw")).await.unwrap();

        assert_eq!(store.access_token().as_deref(), Some("t0"));
        assert_eq!(store.refresh_token().as_deref(), Some("r0"));
        assert!(store.acting_domain().is_some_and(|d| d.is_platform()));
    }

    #[tokio::test]
    async fn test_rejected_login_is_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"code": "UNAUTHORIZED", "message": "bad password"}
            })))
            .mount(&server)
            .await;

        let (service, store) = service(&server);
        let err = service.login(&LoginCredentials::new("root", "nope")).await.unwrap_err();

        assert_eq!(err, AuthError::InvalidCredentials("bad password".into()));
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_clears_session_even_if_server_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let (service, store) = service(&server);
        store.set_credentials("t0".into(), None);
        service.logout().await;

        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_unauthorized_logout_never_renews() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .and(header("Authorization", "Bearer t0"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"code": "TOKEN_EXPIRED", "message": "token expired"}
            })))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"accessToken": "t1"}})))
            .expect(0)
            .mount(&server)
            .await;

        let store = Arc::new(SessionStore::new(Arc::new(InMemorySessionStorage::new())));
        store.set_credentials("t0".into(), Some("r0".into()));
        let navigator = Arc::new(RouteNavigator::new("/login"));
        navigator.set_route("/users");
        let config = ApiClientConfig { base_url: server.uri(), ..Default::default() };
        let client = ApiClient::builder()
            .config(config)
            .store(store.clone())
            .navigator(navigator.clone())
            .build()
            .unwrap();

        let err = client.logout().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(store.access_token().as_deref(), Some("t0"));
        assert_eq!(navigator.redirects(), 0);

        SessionService::new(store.clone(), Arc::new(client)).logout().await;
        assert!(!store.is_authenticated());
        assert_eq!(navigator.redirects(), 0);
    }
}
