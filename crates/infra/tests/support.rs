use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use steward_core::{InMemorySessionStorage, Notice, SessionStore};
use steward_domain::{DomainContext, DomainSource, StartImpersonation};
use steward_infra::{ApiClient, ApiClientConfig, ChannelNotifier, RouteNavigator};
use tokio::sync::mpsc::UnboundedReceiver;
use wiremock::MockServer;

/// A mock backend plus a client wired to it with observable notice and
/// navigation sinks.
pub struct Harness {
    pub server: MockServer,
    pub store: Arc<SessionStore>,
    pub navigator: Arc<RouteNavigator>,
    pub client: ApiClient,
    notices: UnboundedReceiver<Notice>,
}

impl Harness {
    /// Start a backend and sign in with `t0`/`r0` in tenant `acme`.
    pub async fn signed_in() -> Self {
        let harness = Self::start().await;
        harness.store.set_credentials("t0".into(), Some("r0".into()));
        harness
            .store
            .set_acting_domain(Some(DomainContext::tenant("acme", DomainSource::Explicit)))
            .expect("tenant domain should be accepted");
        harness.navigator.set_route("/users");
        harness
    }

    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let store = Arc::new(SessionStore::new(Arc::new(InMemorySessionStorage::new())));
        let (notifier, notices) = ChannelNotifier::new();
        let navigator = Arc::new(RouteNavigator::new("/login"));

        let config = ApiClientConfig { base_url: server.uri(), ..Default::default() };
        let client = ApiClient::builder()
            .config(config)
            .store(store.clone())
            .notifier(Arc::new(notifier))
            .navigator(navigator.clone())
            .build()
            .expect("client should build");

        Self { server, store, navigator, client, notices }
    }

    /// Overlay an impersonation of `target` that expires in `ttl`.
    pub fn impersonate(&self, target: &str, ttl: ChronoDuration) {
        self.store
            .start_impersonation(StartImpersonation {
                token: format!("imp-{target}"),
                target_tenant_id: target.to_string(),
                expires_at: Utc::now() + ttl,
                reason: Some("support ticket".into()),
                duration_minutes: None,
            })
            .expect("impersonation should start");
    }

    /// Notices emitted so far
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        let mut drained = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            drained.push(notice);
        }
        drained
    }
}
