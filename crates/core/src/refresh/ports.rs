//! Port for the out-of-band renewal call

use async_trait::async_trait;
use steward_domain::{AuthError, TokenGrant};

/// Exchanges the refresh credential (or the ambient cookie) for a new
/// access credential.
///
/// Implementations must not route through the decorated API client, or a
/// 401 on the renewal call would re-enter the refresher.
#[async_trait]
pub trait CredentialRenewer: Send + Sync {
    /// # Errors
    /// Returns `AuthError::Rejected` when the server refuses the renewal and
    /// `AuthError::Transport` when it cannot be reached.
    async fn renew(&self, refresh_token: Option<&str>) -> Result<TokenGrant, AuthError>;
}
