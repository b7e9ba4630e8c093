//! Ports for user-facing side effects
//!
//! The session layer never renders anything itself. Notices and sign-in
//! redirects are handed to the host through these traits.

use steward_domain::ErrorCategory;

/// A user-facing notice emitted by the session layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The impersonation overlay ended (lapsed or rejected with a 401)
    ImpersonationExpired { target_tenant_id: String },
    /// The base session could not be recovered and was cleared
    SessionExpired,
    /// A request failed in a way the operator should hear about
    RequestFailed { category: ErrorCategory, message: String },
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Self::ImpersonationExpired { target_tenant_id } => format!(
                "Impersonation of tenant {target_tenant_id} has expired. You are acting as yourself again."
            ),
            Self::SessionExpired => "Your session has expired. Please sign in again.".to_string(),
            Self::RequestFailed { message, .. } => message.clone(),
        }
    }
}

/// Receives user-facing notices
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Client-side navigation used on unrecoverable authentication failure
pub trait Navigator: Send + Sync {
    /// Whether the sign-in surface is currently shown
    fn is_on_sign_in(&self) -> bool;

    /// Navigate to the sign-in surface
    fn redirect_to_sign_in(&self);
}
