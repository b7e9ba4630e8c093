//! Platform/tenant scope descriptor

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::constants::{PLATFORM_DOMAIN_KEY, PLATFORM_DOMAIN_TYPE, TENANT_DOMAIN_TYPE};

/// Where a domain context came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainSource {
    /// Chosen by the operator or forced by impersonation
    #[default]
    Explicit,
    /// Derived from the identity's capabilities
    Default,
    /// Recovered from a degraded state (e.g. migrated storage)
    Fallback,
}

/// The tenant or platform scope a request is addressed to.
///
/// Two contexts are equal iff `domain_type` and `key` match; `id`,
/// `display_name` and `source` are display-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainContext {
    #[serde(rename = "type")]
    pub domain_type: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub source: DomainSource,
}

impl DomainContext {
    pub fn new(
        domain_type: impl Into<String>,
        key: impl Into<String>,
        source: DomainSource,
    ) -> Self {
        Self {
            domain_type: domain_type.into(),
            key: key.into(),
            id: None,
            display_name: None,
            source,
        }
    }

    /// The platform-wide scope used by platform administrators
    pub fn platform(source: DomainSource) -> Self {
        Self::new(PLATFORM_DOMAIN_TYPE, PLATFORM_DOMAIN_KEY, source)
            .with_display_name("Platform")
    }

    /// A tenant scope keyed by tenant identifier
    pub fn tenant(key: impl Into<String>, source: DomainSource) -> Self {
        Self::new(TENANT_DOMAIN_TYPE, key, source)
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Valid only if both `type` and `key` are non-empty
    pub fn is_valid(&self) -> bool {
        !self.domain_type.trim().is_empty() && !self.key.trim().is_empty()
    }

    pub fn is_platform(&self) -> bool {
        self.domain_type == PLATFORM_DOMAIN_TYPE
    }

    /// Scope equality over optional contexts
    pub fn same_scope(a: Option<&Self>, b: Option<&Self>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => a == b,
            (None, None) => true,
            _ => false,
        }
    }
}

impl PartialEq for DomainContext {
    fn eq(&self, other: &Self) -> bool {
        self.domain_type == other.domain_type && self.key == other.key
    }
}

impl Eq for DomainContext {}

impl Hash for DomainContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.domain_type.hash(state);
        self.key.hash(state);
    }
}
