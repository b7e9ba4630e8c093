//! Token refresher
//!
//! Two-state machine (Idle / Refreshing) with a FIFO queue of callers that
//! hit a 401 while a renewal was already in flight. Exactly one renewal call
//! runs at a time; every queued caller settles exactly once when it ends.
//!
//! A 401 whose request was sent with an access token that has since been
//! replaced or cleared never starts a renewal; it replays against the
//! current credential, or fails if the session is gone.
//!
//! The refresher does not replay requests itself. `recover` returning
//! `Ok(())` means the caller should re-decorate and resend with the
//! credential now in the session store.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use steward_domain::constants::MAX_AUTH_RETRIES;
use steward_domain::{AuthError, Result, StewardError};
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use super::ports::CredentialRenewer;
use crate::notify::{Navigator, Notice, Notifier};
use crate::request::EffectiveIdentity;
use crate::session::{ImpersonationStatus, SessionStore};

/// The call that received a 401
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnauthorizedRequest {
    pub path: String,
    pub trace_id: String,
    /// Replays already performed for this call
    pub retry_count: u8,
    /// Identity the failed attempt was sent with
    pub identity: EffectiveIdentity,
    /// Credential generation the failed attempt was decorated with
    pub credential_generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settlement {
    Renewed,
    Failed,
}

/// A caller parked while a renewal is in flight
#[derive(Debug)]
pub struct RefreshQueueEntry {
    pub request: UnauthorizedRequest,
    pub enqueued_at: Instant,
    outcome: oneshot::Sender<Settlement>,
}

impl RefreshQueueEntry {
    fn resolve(self) {
        // The receiver is gone only if the caller was dropped; nothing to do
        let _ = self.outcome.send(Settlement::Renewed);
    }

    fn reject(self) {
        let _ = self.outcome.send(Settlement::Failed);
    }
}

#[derive(Debug, Default)]
enum RefreshState {
    #[default]
    Idle,
    Refreshing {
        queue: VecDeque<RefreshQueueEntry>,
    },
}

/// Resets the machine if the leader's future is dropped mid-renewal.
/// Dropping the queued senders rejects every parked caller.
struct LeaderGuard<'a> {
    state: &'a Mutex<RefreshState>,
    settled: bool,
}

impl LeaderGuard<'_> {
    fn settle(mut self) -> VecDeque<RefreshQueueEntry> {
        self.settled = true;
        take_queue(self.state)
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let abandoned = take_queue(self.state);
            warn!(queued = abandoned.len(), "renewal abandoned, rejecting queued requests");
        }
    }
}

fn take_queue(state: &Mutex<RefreshState>) -> VecDeque<RefreshQueueEntry> {
    match std::mem::take(&mut *state.lock()) {
        RefreshState::Refreshing { queue } => queue,
        RefreshState::Idle => VecDeque::new(),
    }
}

/// Coordinates credential renewal across concurrently failing requests
pub struct TokenRefresher {
    store: Arc<SessionStore>,
    renewer: Arc<dyn CredentialRenewer>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    state: Mutex<RefreshState>,
    termination: Mutex<()>,
}

impl TokenRefresher {
    pub fn new(
        store: Arc<SessionStore>,
        renewer: Arc<dyn CredentialRenewer>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            store,
            renewer,
            notifier,
            navigator,
            state: Mutex::new(RefreshState::Idle),
            termination: Mutex::new(()),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.state.lock(), RefreshState::Refreshing { .. })
    }

    /// Number of callers parked behind the in-flight renewal
    pub fn queued(&self) -> usize {
        match &*self.state.lock() {
            RefreshState::Refreshing { queue } => queue.len(),
            RefreshState::Idle => 0,
        }
    }

    /// Handle a 401 on a non-public endpoint.
    ///
    /// Returns `Ok(())` when the caller should replay with the renewed
    /// credential.
    ///
    /// # Errors
    /// - `StewardError::ImpersonationExpired` if the overlay was active or
    ///   the failed attempt used an impersonation token; no renewal happens
    /// - the original `error` if the retry cap is reached or renewal fails;
    ///   the session is terminated in both cases
    /// - the original `error` if the failed attempt used a credential that
    ///   has since been cleared
    #[instrument(skip(self, error), fields(path = %request.path, trace_id = %request.trace_id))]
    pub async fn recover(&self, request: UnauthorizedRequest, error: StewardError) -> Result<()> {
        let overlay = match self.store.impersonation_status() {
            ImpersonationStatus::Active(session) | ImpersonationStatus::Lapsed(session) => {
                self.store.stop_impersonation();
                Some(session)
            }
            ImpersonationStatus::Inactive => None,
        };
        if let Some(session) = overlay {
            warn!(target_tenant_id = %session.target_tenant_id, "401 while impersonating, overlay ended");
            self.notifier.notify(Notice::ImpersonationExpired {
                target_tenant_id: session.target_tenant_id,
            });
            return Err(StewardError::ImpersonationExpired);
        }
        if matches!(request.identity, EffectiveIdentity::Impersonating { .. }) {
            // Overlay already torn down by a sibling request
            return Err(StewardError::ImpersonationExpired);
        }

        if request.retry_count >= MAX_AUTH_RETRIES {
            warn!(retry_count = request.retry_count, "401 after replay, giving up");
            self.terminate_session();
            return Err(error);
        }

        let parked = {
            let mut state = self.state.lock();
            let current = self.store.credential_generation();
            match &mut *state {
                RefreshState::Idle if current != request.credential_generation => {
                    debug!(
                        sent_with = request.credential_generation,
                        current, "401 for a superseded credential, not renewing"
                    );
                    return if self.store.is_authenticated() { Ok(()) } else { Err(error) };
                }
                RefreshState::Refreshing { queue } => {
                    let (tx, rx) = oneshot::channel();
                    queue.push_back(RefreshQueueEntry {
                        request: request.clone(),
                        enqueued_at: Instant::now(),
                        outcome: tx,
                    });
                    debug!(position = queue.len(), "renewal in flight, request queued");
                    Some(rx)
                }
                RefreshState::Idle => {
                    *state = RefreshState::Refreshing { queue: VecDeque::new() };
                    None
                }
            }
        };

        match parked {
            Some(rx) => match rx.await {
                Ok(Settlement::Renewed) => Ok(()),
                Ok(Settlement::Failed) | Err(_) => Err(error),
            },
            None => self.lead(error).await,
        }
    }

    async fn lead(&self, error: StewardError) -> Result<()> {
        let guard = LeaderGuard { state: &self.state, settled: false };
        let refresh_token = self.store.refresh_token();

        info!(has_refresh_token = refresh_token.is_some(), "renewing access credential");
        let outcome = match self.renewer.renew(refresh_token.as_deref()).await {
            Ok(grant) if grant.access_token.is_empty() => {
                Err(AuthError::MalformedResponse("empty access token".to_string()))
            }
            other => other,
        };

        match outcome {
            Ok(grant) => {
                self.store.update_access_token(grant.access_token);
                if let Some(rotated) = grant.refresh_token {
                    self.store.update_refresh_token(rotated);
                }
                let queue = guard.settle();
                info!(replaying = queue.len(), "access credential renewed");
                for entry in queue {
                    debug!(
                        trace_id = %entry.request.trace_id,
                        waited_ms = u64::try_from(entry.enqueued_at.elapsed().as_millis())
                            .unwrap_or(u64::MAX),
                        "releasing queued request"
                    );
                    entry.resolve();
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "credential renewal failed");
                // Cleared before going idle so a late 401 sees the ended session
                self.terminate_session();
                let queue = guard.settle();
                debug!(rejected = queue.len(), "rejecting queued requests");
                for entry in queue {
                    entry.reject();
                }
                Err(error)
            }
        }
    }

    /// Wipe the session and send the operator to sign-in, at most once
    /// while the sign-in surface is showing.
    fn terminate_session(&self) {
        let _serial = self.termination.lock();
        self.store.clear();
        if self.navigator.is_on_sign_in() {
            debug!("already on sign-in, redirect skipped");
            return;
        }
        self.notifier.notify(Notice::SessionExpired);
        self.navigator.redirect_to_sign_in();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use steward_domain::{StartImpersonation, TokenGrant};
    use tokio::sync::Semaphore;

    use super::*;
    use crate::notify::testing::{RecordingNavigator, RecordingNotifier};
    use crate::session::memory::InMemorySessionStorage;

    /// Renewer that blocks until the test releases it
    struct GatedRenewer {
        gate: Semaphore,
        calls: AtomicUsize,
        result: std::result::Result<TokenGrant, AuthError>,
    }

    impl GatedRenewer {
        fn new(result: std::result::Result<TokenGrant, AuthError>) -> Self {
            Self { gate: Semaphore::new(0), calls: AtomicUsize::new(0), result }
        }

        fn release(&self) {
            self.gate.add_permits(1);
        }
    }

    #[async_trait]
    impl CredentialRenewer for GatedRenewer {
        async fn renew(
            &self,
            _refresh_token: Option<&str>,
        ) -> std::result::Result<TokenGrant, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _permit = self.gate.acquire().await.map_err(|e| AuthError::Transport(e.to_string()))?;
            self.result.clone()
        }
    }

    struct Harness {
        refresher: Arc<TokenRefresher>,
        store: Arc<SessionStore>,
        renewer: Arc<GatedRenewer>,
        notifier: Arc<RecordingNotifier>,
        navigator: Arc<RecordingNavigator>,
    }

    fn harness(result: std::result::Result<TokenGrant, AuthError>) -> Harness {
        let store = Arc::new(SessionStore::new(Arc::new(InMemorySessionStorage::new())));
        store.set_credentials("t0".into(), Some("r0".into()));
        let renewer = Arc::new(GatedRenewer::new(result));
        let notifier = Arc::new(RecordingNotifier::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let refresher = Arc::new(TokenRefresher::new(
            store.clone(),
            renewer.clone(),
            notifier.clone(),
            navigator.clone(),
        ));
        Harness { refresher, store, renewer, notifier, navigator }
    }

    fn unauthorized(trace_id: &str, retry_count: u8) -> UnauthorizedRequest {
        UnauthorizedRequest {
            path: "/users".into(),
            trace_id: trace_id.into(),
            retry_count,
            identity: EffectiveIdentity::Base,
            credential_generation: 1,
        }
    }

    fn spawn_recover(
        refresher: &Arc<TokenRefresher>,
        request: UnauthorizedRequest,
    ) -> tokio::task::JoinHandle<Result<()>> {
        let r = refresher.clone();
        let error = StewardError::Unauthorized(request.trace_id.clone());
        tokio::spawn(async move { r.recover(request, error).await })
    }

    fn grant(access: &str) -> TokenGrant {
        TokenGrant { access_token: access.into(), refresh_token: None }
    }

    async fn wait_for(cond: impl Fn() -> bool) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_concurrent_401s_share_one_renewal() {
        let h = harness(Ok(grant("t1")));

        let leader = {
            let r = h.refresher.clone();
            tokio::spawn(async move {
                r.recover(unauthorized("a", 0), StewardError::Unauthorized("a".into())).await
            })
        };
        wait_for(|| h.refresher.is_refreshing()).await;

        let followers: Vec<_> = ["b", "c", "d"]
            .into_iter()
            .map(|id| {
                let r = h.refresher.clone();
                tokio::spawn(async move {
                    r.recover(unauthorized(id, 0), StewardError::Unauthorized(id.into())).await
                })
            })
            .collect();
        wait_for(|| h.refresher.queued() == 3).await;
        assert_eq!(h.store.access_token().as_deref(), Some("t0"));

        h.renewer.release();

        assert!(leader.await.unwrap().is_ok());
        for follower in futures::future::join_all(followers).await {
            assert!(follower.unwrap().is_ok());
        }
        assert_eq!(h.renewer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.store.access_token().as_deref(), Some("t1"));
        assert_eq!(h.store.refresh_token().as_deref(), Some("r0"));
        assert!(!h.refresher.is_refreshing());
        assert_eq!(h.navigator.redirects(), 0);
    }

    #[tokio::test]
    async fn test_rotated_refresh_token_is_stored() {
        let h = harness(Ok(TokenGrant { access_token: "t1".into(), refresh_token: Some("r1".into()) }));
        h.renewer.release();

        h.refresher
            .recover(unauthorized("a", 0), StewardError::Unauthorized("a".into()))
            .await
            .unwrap();
        assert_eq!(h.store.refresh_token().as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn test_renewal_failure_rejects_queue_and_redirects_once() {
        let h = harness(Err(AuthError::Rejected { status: 401, message: "expired".into() }));

        let leader = {
            let r = h.refresher.clone();
            tokio::spawn(async move {
                r.recover(unauthorized("a", 0), StewardError::Unauthorized("a".into())).await
            })
        };
        wait_for(|| h.refresher.is_refreshing()).await;
        let follower = {
            let r = h.refresher.clone();
            tokio::spawn(async move {
                r.recover(unauthorized("b", 0), StewardError::Unauthorized("b".into())).await
            })
        };
        wait_for(|| h.refresher.queued() == 1).await;

        h.renewer.release();

        assert_eq!(leader.await.unwrap(), Err(StewardError::Unauthorized("a".into())));
        assert_eq!(follower.await.unwrap(), Err(StewardError::Unauthorized("b".into())));
        assert!(!h.store.is_authenticated());
        assert_eq!(h.navigator.redirects(), 1);
        assert_eq!(h.notifier.count(|n| *n == Notice::SessionExpired), 1);
    }

    #[tokio::test]
    async fn test_retry_cap_terminates_without_renewal() {
        let h = harness(Ok(grant("t1")));

        let result = h
            .refresher
            .recover(unauthorized("a", 1), StewardError::Unauthorized("again".into()))
            .await;
        assert_eq!(result, Err(StewardError::Unauthorized("again".into())));
        assert_eq!(h.renewer.calls.load(Ordering::SeqCst), 0);
        assert!(!h.store.is_authenticated());
        assert_eq!(h.navigator.redirects(), 1);

        // Already on sign-in: a second failure does not redirect again
        let _ = h.refresher.recover(unauthorized("b", 1), StewardError::Unauthorized("b".into())).await;
        assert_eq!(h.navigator.redirects(), 1);
    }

    #[tokio::test]
    async fn test_401_while_impersonating_never_renews() {
        let h = harness(Ok(grant("t1")));
        h.store
            .start_impersonation(StartImpersonation {
                token: "imp".into(),
                target_tenant_id: "acme".into(),
                expires_at: Utc::now() + chrono::Duration::minutes(5),
                reason: None,
                duration_minutes: Some(5),
            })
            .unwrap();

        let request = UnauthorizedRequest {
            identity: EffectiveIdentity::Impersonating { target_tenant_id: "acme".into() },
            ..unauthorized("a", 0)
        };
        let first = h.refresher.recover(request.clone(), StewardError::Unauthorized("x".into())).await;
        let second = h.refresher.recover(request, StewardError::Unauthorized("y".into())).await;

        assert_eq!(first, Err(StewardError::ImpersonationExpired));
        assert_eq!(second, Err(StewardError::ImpersonationExpired));
        assert_eq!(h.renewer.calls.load(Ordering::SeqCst), 0);
        assert!(h.store.get_impersonation_session().is_none());
        assert_eq!(h.store.access_token().as_deref(), Some("t0"));
        assert_eq!(
            h.notifier.count(|n| matches!(n, Notice::ImpersonationExpired { .. })),
            1
        );
        assert_eq!(h.navigator.redirects(), 0);
    }

    #[tokio::test]
    async fn test_dropped_leader_rejects_queue() {
        let h = harness(Ok(grant("t1")));

        let leader = {
            let r = h.refresher.clone();
            tokio::spawn(async move {
                r.recover(unauthorized("a", 0), StewardError::Unauthorized("a".into())).await
            })
        };
        wait_for(|| h.refresher.is_refreshing()).await;
        let follower = {
            let r = h.refresher.clone();
            tokio::spawn(async move {
                r.recover(unauthorized("b", 0), StewardError::Unauthorized("b".into())).await
            })
        };
        wait_for(|| h.refresher.queued() == 1).await;

        leader.abort();
        assert_eq!(follower.await.unwrap(), Err(StewardError::Unauthorized("b".into())));
        assert!(!h.refresher.is_refreshing());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_queue_drains_in_arrival_order() {
        let h = harness(Ok(grant("t1")));
        let order = Arc::new(Mutex::new(Vec::new()));

        let leader = spawn_recover(&h.refresher, unauthorized("a", 0));
        wait_for(|| h.refresher.is_refreshing()).await;

        let mut followers = Vec::new();
        for (n, id) in ["b", "c", "d"].into_iter().enumerate() {
            let r = h.refresher.clone();
            let order = order.clone();
            followers.push(tokio::spawn(async move {
                let result = r.recover(unauthorized(id, 0), StewardError::Unauthorized(id.into())).await;
                order.lock().push(id);
                result
            }));
            wait_for(|| h.refresher.queued() == n + 1).await;
        }

        h.renewer.release();
        assert!(leader.await.unwrap().is_ok());
        for follower in followers {
            assert!(follower.await.unwrap().is_ok());
        }
        assert_eq!(*order.lock(), vec!["b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_late_401_for_renewed_credential_replays_without_renewal() {
        let h = harness(Ok(grant("t1")));
        h.renewer.release();
        let sent_with_t0 = h.store.credential_generation();
        let request = |id: &str| UnauthorizedRequest {
            credential_generation: sent_with_t0,
            ..unauthorized(id, 0)
        };

        spawn_recover(&h.refresher, request("a")).await.unwrap().unwrap();
        assert_eq!(h.store.access_token().as_deref(), Some("t1"));

        // Arrives after the renewal settled, still carrying t0
        spawn_recover(&h.refresher, request("b")).await.unwrap().unwrap();

        assert_eq!(h.renewer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.store.access_token().as_deref(), Some("t1"));
        assert_eq!(h.navigator.redirects(), 0);
    }

    #[tokio::test]
    async fn test_late_401_after_failed_renewal_does_not_renew_again() {
        let h = harness(Err(AuthError::Rejected { status: 401, message: "expired".into() }));
        h.renewer.release();
        let sent_with_t0 = h.store.credential_generation();
        let request = |id: &str| UnauthorizedRequest {
            credential_generation: sent_with_t0,
            ..unauthorized(id, 0)
        };

        let first = spawn_recover(&h.refresher, request("a")).await.unwrap();
        let late = spawn_recover(&h.refresher, request("b")).await.unwrap();

        assert_eq!(first, Err(StewardError::Unauthorized("a".into())));
        assert_eq!(late, Err(StewardError::Unauthorized("b".into())));
        assert_eq!(h.renewer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.navigator.redirects(), 1);
        assert_eq!(h.notifier.count(|n| *n == Notice::SessionExpired), 1);
    }
}
