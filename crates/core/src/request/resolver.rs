//! Request context resolution
//!
//! Runs once per outbound request, before transport. Decides which bearer
//! credential and which domain/project scope the request carries. No network
//! I/O happens here and nothing persistent is mutated, apart from the lazy
//! clearing of an expired impersonation overlay.

use std::sync::Arc;

use http::HeaderValue;
use steward_domain::constants::BEARER_PREFIX;
use steward_domain::{DomainContext, Result};
use tracing::debug;
use uuid::Uuid;

use super::endpoints::EndpointPolicy;
use super::headers::{
    header_value, sensitive_value, AUTHORIZATION, CLIENT_TYPE, DOMAIN_KEY, DOMAIN_TYPE,
    PROJECT_ID, TRACE_ID,
};
use super::types::{ApiRequest, DecoratedRequest, EffectiveIdentity};
use crate::notify::{Notice, Notifier};
use crate::session::{ImpersonationStatus, SessionStore};

struct Scope {
    token: Option<String>,
    domain: Option<DomainContext>,
    project_id: Option<String>,
    impersonating: Option<String>,
    generation: u64,
}

/// Decorates requests with credential, scope, client and trace headers
pub struct RequestContextResolver {
    store: Arc<SessionStore>,
    policy: EndpointPolicy,
    notifier: Arc<dyn Notifier>,
    client_type: HeaderValue,
}

impl RequestContextResolver {
    /// # Errors
    /// Returns `StewardError::Client` if `client_type` cannot be sent as a
    /// header value.
    pub fn new(
        store: Arc<SessionStore>,
        policy: EndpointPolicy,
        notifier: Arc<dyn Notifier>,
        client_type: &str,
    ) -> Result<Self> {
        let client_type = header_value(&CLIENT_TYPE, client_type)?;
        Ok(Self { store, policy, notifier, client_type })
    }

    pub fn policy(&self) -> &EndpointPolicy {
        &self.policy
    }

    /// Produce the decorated copy of `request`.
    ///
    /// Explicit domain and project headers set by the caller always win.
    ///
    /// # Errors
    /// Returns `StewardError::Client` if a session value (token, domain or
    /// project id) cannot be sent as a header value.
    pub fn resolve(&self, request: &ApiRequest) -> Result<DecoratedRequest> {
        let mut decorated = request.clone();
        let scope = self.effective_scope(request.options.skip_impersonation);
        let public = self.policy.is_public(&request.path);
        let scope_exempt = self.policy.is_domain_exempt(&request.path);
        let headers = &mut decorated.headers;

        let mut identity = EffectiveIdentity::Anonymous;
        if !request.options.skip_auth && !public {
            if let Some(token) = &scope.token {
                let bearer = sensitive_value(&AUTHORIZATION, &format!("{BEARER_PREFIX}{token}"))?;
                headers.insert(AUTHORIZATION, bearer);
                identity = match &scope.impersonating {
                    Some(tenant) => {
                        EffectiveIdentity::Impersonating { target_tenant_id: tenant.clone() }
                    }
                    None => EffectiveIdentity::Base,
                };
            }
        }

        if !scope_exempt {
            let explicit_domain = headers.contains_key(DOMAIN_TYPE) || headers.contains_key(DOMAIN_KEY);
            if !explicit_domain {
                if let Some(domain) = scope.domain.as_ref().filter(|d| d.is_valid()) {
                    headers.insert(DOMAIN_TYPE, header_value(&DOMAIN_TYPE, &domain.domain_type)?);
                    headers.insert(DOMAIN_KEY, header_value(&DOMAIN_KEY, &domain.key)?);
                }
            }

            if let Some(project_id) = &scope.project_id {
                if !headers.contains_key(PROJECT_ID) {
                    headers.insert(PROJECT_ID, header_value(&PROJECT_ID, project_id)?);
                }
            }
        }

        headers.insert(CLIENT_TYPE, self.client_type.clone());
        let existing = headers.get(TRACE_ID).and_then(|v| v.to_str().ok()).map(str::to_string);
        let trace_id = match existing {
            Some(existing) => existing,
            None => {
                let generated = Uuid::new_v4().to_string();
                headers.insert(TRACE_ID, header_value(&TRACE_ID, &generated)?);
                generated
            }
        };

        debug!(
            method = %request.method,
            path = %request.path,
            trace_id = %trace_id,
            identity = ?identity,
            retry_count = request.retry_count,
            "request decorated"
        );

        Ok(DecoratedRequest {
            request: decorated,
            trace_id,
            identity,
            credential_generation: scope.generation,
        })
    }

    fn effective_scope(&self, skip_impersonation: bool) -> Scope {
        if !skip_impersonation {
            match self.store.impersonation_status() {
                ImpersonationStatus::Active(session) => {
                    return Scope {
                        generation: self.store.credential_generation(),
                        domain: Some(session.target_domain()),
                        impersonating: Some(session.target_tenant_id.clone()),
                        token: Some(session.token),
                        // Project selection belongs to the acting domain
                        project_id: None,
                    };
                }
                ImpersonationStatus::Lapsed(session) => {
                    self.notifier.notify(Notice::ImpersonationExpired {
                        target_tenant_id: session.target_tenant_id,
                    });
                }
                ImpersonationStatus::Inactive => {}
            }
        }

        let (session, generation) = self.store.versioned_snapshot();
        Scope {
            generation,
            token: session.access_token,
            domain: session.acting_domain,
            project_id: session.selected_project_id,
            impersonating: None,
        }
    }
}
