//! Persisted session schema and its migration
//!
//! The stored document is versioned. [`migrate`] runs once at load time over
//! the raw JSON and always produces a usable record: legacy tenant/project
//! keys are dropped and malformed fields fall back to safe defaults.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use steward_domain::constants::{LEGACY_SESSION_KEYS, SESSION_SCHEMA_VERSION};
use steward_domain::{DomainContext, ImpersonationSession, Theme};
use tracing::debug;

/// The durable part of a session (everything except the live identity)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub version: u32,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub acting_domain: Option<DomainContext>,
    pub selected_project_id: Option<String>,
    pub impersonation: Option<ImpersonationSession>,
    pub theme: Theme,
}

impl Default for PersistedSession {
    fn default() -> Self {
        Self {
            version: SESSION_SCHEMA_VERSION,
            access_token: None,
            refresh_token: None,
            acting_domain: None,
            selected_project_id: None,
            impersonation: None,
            theme: Theme::default(),
        }
    }
}

/// Bring a stored document of any version up to the current schema.
///
/// Accepts both the bare record and a `{ "state": {...}, "version": n }`
/// wrapper.
pub fn migrate(raw: Value) -> PersistedSession {
    let Value::Object(mut map) = raw else {
        debug!("stored session is not an object, starting empty");
        return PersistedSession::default();
    };

    let from_version = map.get("version").and_then(Value::as_u64).unwrap_or(0);
    if let Some(Value::Object(inner)) = map.remove("state") {
        map = inner;
    }

    for key in LEGACY_SESSION_KEYS {
        if map.remove(*key).is_some() {
            debug!(key, "dropped legacy session key");
        }
    }

    let acting_domain = map.get("actingDomain").and_then(parse_domain);
    if acting_domain.is_none() && map.get("actingDomain").is_some_and(|v| !v.is_null()) {
        debug!("malformed acting domain nulled during migration");
    }

    // A project selection only means something inside its domain
    let selected_project_id =
        if acting_domain.is_some() { id_string(map.get("selectedProjectId")) } else { None };

    let migrated = PersistedSession {
        version: SESSION_SCHEMA_VERSION,
        access_token: non_empty_string(map.get("accessToken")),
        refresh_token: non_empty_string(map.get("refreshToken")),
        acting_domain,
        selected_project_id,
        impersonation: map.get("impersonation").and_then(parse_impersonation),
        theme: map
            .get("theme")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default(),
    };

    if from_version != u64::from(SESSION_SCHEMA_VERSION) {
        debug!(from_version, to_version = SESSION_SCHEMA_VERSION, "migrated stored session");
    }

    migrated
}

fn parse_domain(value: &Value) -> Option<DomainContext> {
    serde_json::from_value::<DomainContext>(value.clone()).ok().filter(DomainContext::is_valid)
}

fn parse_impersonation(value: &Value) -> Option<ImpersonationSession> {
    serde_json::from_value::<ImpersonationSession>(value.clone())
        .ok()
        .filter(|s| !s.token.is_empty() && !s.target_tenant_id.is_empty())
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
}

fn id_string(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::Number(n)) => Some(n.to_string()),
        other => non_empty_string(other),
    }
}

/// Serialize for storage. The `state` wrapper is not written back.
pub fn to_document(session: &PersistedSession) -> Value {
    serde_json::to_value(session).unwrap_or_else(|_| Value::Object(Map::new()))
}
