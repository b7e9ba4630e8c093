//! Identity types
//!
//! The authenticated operator as reported by the user-info endpoint.

use serde::{Deserialize, Serialize};

use crate::constants::{PLATFORM_ADMIN_PERMISSION, PLATFORM_ADMIN_ROLES};

/// Authenticated identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Home tenant, informational only
    #[serde(default)]
    pub tenant_id: Option<String>,
}

impl UserInfo {
    /// Whether this identity may act in the platform domain
    pub fn is_platform_admin(&self) -> bool {
        self.roles.iter().any(|role| PLATFORM_ADMIN_ROLES.contains(&role.as_str()))
            || self.permissions.iter().any(|p| p == PLATFORM_ADMIN_PERMISSION)
    }
}

/// Sign-in form input
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captcha_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captcha_code: Option<String>,
}

impl LoginCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            captcha_key: None,
            captcha_code: None,
        }
    }

    #[must_use]
    pub fn with_captcha(mut self, key: impl Into<String>, code: impl Into<String>) -> Self {
        self.captcha_key = Some(key.into());
        self.captcha_code = Some(code.into());
        self
    }
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("captcha_key", &self.captcha_key)
            .finish_non_exhaustive()
    }
}

/// What a successful sign-in yields
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFragment {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserInfo>,
}

impl std::fmt::Debug for SessionFragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFragment")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("user", &self.user)
            .finish()
    }
}
