//! Session records: impersonation overlay, theme and token grants

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::domain_context::{DomainContext, DomainSource};

/// Time-boxed credential letting an operator act inside another tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpersonationSession {
    pub token: String,
    pub target_tenant_id: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    /// Acting domain captured when the overlay started
    #[serde(default)]
    pub source_domain_type: Option<String>,
    #[serde(default)]
    pub source_domain_key: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl ImpersonationSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Time left before expiry, zero once lapsed
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        let remaining = self.expires_at - now;
        if remaining < Duration::zero() {
            Duration::zero()
        } else {
            remaining
        }
    }

    /// The tenant scope requests are forced into while the overlay is live
    pub fn target_domain(&self) -> DomainContext {
        DomainContext::tenant(self.target_tenant_id.clone(), DomainSource::Explicit)
    }

    /// The acting domain the operator had before impersonating, if any
    pub fn source_domain(&self) -> Option<DomainContext> {
        match (&self.source_domain_type, &self.source_domain_key) {
            (Some(domain_type), Some(key)) => {
                let ctx = DomainContext::new(domain_type.clone(), key.clone(), DomainSource::Explicit);
                ctx.is_valid().then_some(ctx)
            }
            _ => None,
        }
    }
}

/// Input for starting an impersonation overlay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartImpersonation {
    pub token: String,
    pub target_tenant_id: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

/// UI theme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    System,
}

/// Credentials returned by the renewal endpoint
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
