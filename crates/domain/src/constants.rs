//! Session-layer constants
//!
//! Header names, reserved domain identifiers and limits shared by the
//! resolver, the refresher and the persistence layer.

// Request headers (lowercase wire names)
pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_DOMAIN_TYPE: &str = "x-domain-type";
pub const HEADER_DOMAIN_KEY: &str = "x-domain-key";
pub const HEADER_PROJECT_ID: &str = "x-project-id";
pub const HEADER_CLIENT_TYPE: &str = "x-client-type";
pub const HEADER_TRACE_ID: &str = "x-trace-id";
pub const BEARER_PREFIX: &str = "Bearer ";
pub const DEFAULT_CLIENT_TYPE: &str = "web";

// Reserved domain identifiers
pub const PLATFORM_DOMAIN_TYPE: &str = "platform";
pub const PLATFORM_DOMAIN_KEY: &str = "platform";
pub const TENANT_DOMAIN_TYPE: &str = "tenant";

// Identity capabilities granting platform scope
pub const PLATFORM_ADMIN_ROLES: &[&str] = &["platform_admin", "super_admin"];
pub const PLATFORM_ADMIN_PERMISSION: &str = "platform:admin";

// Refresh coordination
pub const MAX_AUTH_RETRIES: u8 = 1;

// Persisted session schema
pub const SESSION_SCHEMA_VERSION: u32 = 2;
pub const LEGACY_SESSION_KEYS: &[&str] =
    &["tenantId", "tenant", "currentTenant", "projectId", "currentProject", "tenantCode"];

// Default endpoints
pub const DEFAULT_API_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";
pub const DEFAULT_LOGOUT_PATH: &str = "/auth/logout";
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";
pub const DEFAULT_USER_INFO_PATH: &str = "/auth/me";
pub const DEFAULT_CAPTCHA_PATH: &str = "/auth/captcha";
pub const DEFAULT_REGISTER_PATH: &str = "/auth/register";
pub const DEFAULT_INIT_PATH: &str = "/init";
pub const DEFAULT_SIGN_IN_ROUTE: &str = "/login";
pub const DEFAULT_SESSION_FILE: &str = "steward-session.json";
