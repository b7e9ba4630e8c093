//! Endpoint classification

use steward_domain::AuthEndpoints;

/// Decides which endpoints are public (no credential, no refresh trigger),
/// which carry no domain scope and which are authenticated but must not
/// start a renewal on 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPolicy {
    public: Vec<String>,
    domain_exempt: Vec<String>,
    refresh_exempt: Vec<String>,
}

impl EndpointPolicy {
    pub fn new(public: Vec<String>, domain_exempt: Vec<String>) -> Self {
        Self { public, domain_exempt, refresh_exempt: Vec::new() }
    }

    #[must_use]
    pub fn with_refresh_exempt(mut self, paths: Vec<String>) -> Self {
        self.refresh_exempt = paths;
        self
    }

    /// Sign-in, CAPTCHA, registration, renewal and initialization are
    /// public; sign-in and registration also carry no domain scope.
    /// Sign-out is authenticated but a 401 on it never renews.
    pub fn from_endpoints(endpoints: &AuthEndpoints) -> Self {
        Self {
            refresh_exempt: vec![endpoints.logout.clone()],
            public: vec![
                endpoints.login.clone(),
                endpoints.captcha.clone(),
                endpoints.register.clone(),
                endpoints.refresh.clone(),
                endpoints.init.clone(),
            ],
            domain_exempt: vec![endpoints.login.clone(), endpoints.register.clone()],
        }
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public.iter().any(|prefix| path_matches(path, prefix))
    }

    pub fn is_domain_exempt(&self, path: &str) -> bool {
        self.domain_exempt.iter().any(|prefix| path_matches(path, prefix))
    }

    /// Whether a 401 on `path` should go through credential renewal
    pub fn triggers_refresh(&self, path: &str) -> bool {
        !self.is_public(path) && !self.refresh_exempt.iter().any(|prefix| path_matches(path, prefix))
    }
}

impl Default for EndpointPolicy {
    fn default() -> Self {
        Self::from_endpoints(&AuthEndpoints::default())
    }
}

/// Segment-aware prefix match, ignoring any query string
fn path_matches(path: &str, prefix: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return false;
    }
    path == prefix
        || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}
