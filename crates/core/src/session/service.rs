//! Network-backed session actions
//!
//! Sign-in, sign-out and identity loading need the backend; the store stays
//! a pure state container and this service sequences the two.

use std::sync::Arc;

use steward_domain::{AuthError, LoginCredentials, Result, SessionFragment, UserInfo};
use tracing::{info, instrument, warn};

use super::ports::AuthGateway;
use super::store::SessionStore;

/// Orchestrates the session store with the authentication backend
pub struct SessionService {
    store: Arc<SessionStore>,
    gateway: Arc<dyn AuthGateway>,
}

impl SessionService {
    pub fn new(store: Arc<SessionStore>, gateway: Arc<dyn AuthGateway>) -> Self {
        Self { store, gateway }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Sign in and populate the session.
    ///
    /// The identity is taken from the sign-in response when present,
    /// otherwise loaded from the user-info endpoint. A failed identity load
    /// does not undo the sign-in.
    ///
    /// # Errors
    /// Returns the gateway's `AuthError` if the credentials are rejected or
    /// the backend cannot be reached.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(
        &self,
        credentials: &LoginCredentials,
    ) -> std::result::Result<SessionFragment, AuthError> {
        let fragment = self.gateway.login(credentials).await?;
        if fragment.access_token.is_empty() {
            return Err(AuthError::MalformedResponse("empty access token".to_string()));
        }

        self.store.set_credentials(fragment.access_token.clone(), fragment.refresh_token.clone());

        match &fragment.user {
            Some(user) => self.store.set_user(user.clone()),
            None => {
                if let Err(e) = self.request_user_info().await {
                    warn!(error = %e, "signed in but failed to load identity");
                }
            }
        }

        info!("sign-in complete");
        Ok(fragment)
    }

    /// Notify the server (best effort) and clear the local session
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if self.store.is_authenticated() {
            if let Err(e) = self.gateway.logout().await {
                warn!(error = %e, "server logout failed, clearing local session anyway");
            }
        }
        self.store.clear();
    }

    /// Load the identity and re-derive the acting domain from it
    ///
    /// # Errors
    /// Propagates the request error from the user-info call.
    pub async fn request_user_info(&self) -> Result<UserInfo> {
        let user = self.gateway.fetch_user_info().await?;
        self.store.set_user(user.clone());
        Ok(user)
    }
}
