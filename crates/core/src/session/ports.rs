//! Port interfaces for session persistence and authentication
//!
//! These traits define the boundaries between the session store and the
//! infrastructure that persists it or talks to the backend.

use async_trait::async_trait;
use serde_json::Value;
use steward_domain::{AuthError, LoginCredentials, Result, SessionFragment, UserInfo};

use super::persistence::PersistedSession;

/// Durable storage for the persisted session record
///
/// `load` returns the raw stored document so the versioned migration can run
/// over whatever shape an older build left behind.
pub trait SessionStorage: Send + Sync {
    /// Read the stored document, `None` if nothing was ever saved
    fn load(&self) -> Result<Option<Value>>;

    /// Replace the stored document
    fn save(&self, session: &PersistedSession) -> Result<()>;
}

/// Backend calls behind the network-backed session actions
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Exchange credentials for a session
    async fn login(
        &self,
        credentials: &LoginCredentials,
    ) -> std::result::Result<SessionFragment, AuthError>;

    /// Tell the server the session is over
    async fn logout(&self) -> Result<()>;

    /// Load the identity behind the current credential
    async fn fetch_user_info(&self) -> Result<UserInfo>;
}
