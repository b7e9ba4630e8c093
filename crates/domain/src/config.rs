//! Configuration structures

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_TIMEOUT_MS, DEFAULT_CAPTCHA_PATH, DEFAULT_CLIENT_TYPE, DEFAULT_INIT_PATH,
    DEFAULT_LOGIN_PATH, DEFAULT_LOGOUT_PATH, DEFAULT_REFRESH_PATH, DEFAULT_REGISTER_PATH,
    DEFAULT_SESSION_FILE, DEFAULT_SIGN_IN_ROUTE, DEFAULT_USER_INFO_PATH,
};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StewardConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub auth: AuthEndpoints,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Backend API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every request path is appended to
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Value sent in the client-type marker header
    #[serde(default = "default_client_type")]
    pub client_type: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout_ms: DEFAULT_API_TIMEOUT_MS,
            client_type: DEFAULT_CLIENT_TYPE.to_string(),
        }
    }
}

/// Well-known authentication endpoints and routes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthEndpoints {
    pub login: String,
    pub logout: String,
    pub refresh: String,
    pub user_info: String,
    pub captcha: String,
    pub register: String,
    pub init: String,
    /// Client-side route of the sign-in surface
    pub sign_in_route: String,
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self {
            login: DEFAULT_LOGIN_PATH.to_string(),
            logout: DEFAULT_LOGOUT_PATH.to_string(),
            refresh: DEFAULT_REFRESH_PATH.to_string(),
            user_info: DEFAULT_USER_INFO_PATH.to_string(),
            captcha: DEFAULT_CAPTCHA_PATH.to_string(),
            register: DEFAULT_REGISTER_PATH.to_string(),
            init: DEFAULT_INIT_PATH.to_string(),
            sign_in_route: DEFAULT_SIGN_IN_ROUTE.to_string(),
        }
    }
}

/// Durable session storage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub storage_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { storage_path: DEFAULT_SESSION_FILE.to_string() }
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_API_TIMEOUT_MS
}

fn default_client_type() -> String {
    DEFAULT_CLIENT_TYPE.to_string()
}
