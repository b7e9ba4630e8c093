//! Session store
//!
//! Owns credentials, the acting domain, the selected project, the
//! impersonation overlay and the theme. All reads and writes go through the
//! methods here; every mutation is persisted (minus the live identity) and
//! published to subscribers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use parking_lot::RwLock;
use steward_domain::{
    DomainContext, DomainSource, ImpersonationSession, Result, StartImpersonation, StewardError,
    Theme, UserInfo,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::persistence::{migrate, PersistedSession};
use super::ports::SessionStorage;

/// Point-in-time view of the session
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<UserInfo>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub acting_domain: Option<DomainContext>,
    pub selected_project_id: Option<String>,
    pub impersonation: Option<ImpersonationSession>,
    pub theme: Theme,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user.as_ref().map(|u| &u.username))
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("acting_domain", &self.acting_domain)
            .field("selected_project_id", &self.selected_project_id)
            .field("impersonating", &self.impersonation.as_ref().map(|i| &i.target_tenant_id))
            .field("theme", &self.theme)
            .finish()
    }
}

impl From<PersistedSession> for Session {
    fn from(p: PersistedSession) -> Self {
        Self {
            user: None,
            access_token: p.access_token,
            refresh_token: p.refresh_token,
            acting_domain: p.acting_domain,
            selected_project_id: p.selected_project_id,
            impersonation: p.impersonation,
            theme: p.theme,
        }
    }
}

impl From<&Session> for PersistedSession {
    fn from(s: &Session) -> Self {
        Self {
            access_token: s.access_token.clone(),
            refresh_token: s.refresh_token.clone(),
            acting_domain: s.acting_domain.clone(),
            selected_project_id: s.selected_project_id.clone(),
            impersonation: s.impersonation.clone(),
            theme: s.theme,
            ..Self::default()
        }
    }
}

/// Result of a lazy-expiry read of the impersonation overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImpersonationStatus {
    /// No overlay
    Inactive,
    /// Overlay present and not expired
    Active(ImpersonationSession),
    /// Overlay was expired and this read cleared it. Only the read that
    /// performs the clear observes this variant.
    Lapsed(ImpersonationSession),
}

impl ImpersonationStatus {
    pub fn active(self) -> Option<ImpersonationSession> {
        match self {
            Self::Active(session) => Some(session),
            Self::Inactive | Self::Lapsed(_) => None,
        }
    }
}

/// Observable, persisted session state container
pub struct SessionStore {
    state: RwLock<Session>,
    storage: Arc<dyn SessionStorage>,
    changes: watch::Sender<Session>,
    /// Bumped under the write lock whenever the access token changes
    generation: AtomicU64,
}

impl SessionStore {
    /// Create an empty store
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let (changes, _) = watch::channel(Session::default());
        Self { state: RwLock::new(Session::default()), storage, changes, generation: AtomicU64::new(0) }
    }

    /// Restore the store from durable storage, migrating older documents.
    ///
    /// # Errors
    /// Returns `StewardError::Storage` if the storage cannot be read.
    pub fn load(storage: Arc<dyn SessionStorage>) -> Result<Self> {
        let restored = match storage.load()? {
            Some(raw) => {
                let migrated = migrate(raw);
                storage.save(&migrated)?;
                info!(
                    has_access_token = migrated.access_token.is_some(),
                    acting_domain = ?migrated.acting_domain,
                    "session restored from storage"
                );
                Session::from(migrated)
            }
            None => {
                debug!("no stored session found");
                Session::default()
            }
        };

        let (changes, _) = watch::channel(restored.clone());
        Ok(Self { state: RwLock::new(restored), storage, changes, generation: AtomicU64::new(0) })
    }

    /// Receive a fresh snapshot after every mutation
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.changes.subscribe()
    }

    pub fn snapshot(&self) -> Session {
        self.state.read().clone()
    }

    /// Snapshot together with the credential generation it belongs to
    pub fn versioned_snapshot(&self) -> (Session, u64) {
        let state = self.state.read();
        (state.clone(), self.generation.load(Ordering::Acquire))
    }

    /// Counter that changes every time the access token is replaced or
    /// cleared. A 401 carrying an older generation was sent with a
    /// credential that is no longer current.
    pub fn credential_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn access_token(&self) -> Option<String> {
        self.state.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state.read().refresh_token.clone()
    }

    pub fn acting_domain(&self) -> Option<DomainContext> {
        self.state.read().acting_domain.clone()
    }

    pub fn selected_project_id(&self) -> Option<String> {
        self.state.read().selected_project_id.clone()
    }

    pub fn user(&self) -> Option<UserInfo> {
        self.state.read().user.clone()
    }

    pub fn theme(&self) -> Theme {
        self.state.read().theme
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().access_token.is_some()
    }

    // ------------------------------------------------------------------
    // Credential actions
    // ------------------------------------------------------------------

    /// Store the credentials obtained from a successful sign-in
    pub fn set_credentials(&self, access_token: String, refresh_token: Option<String>) {
        self.mutate(|s| {
            s.access_token = Some(access_token);
            s.refresh_token = refresh_token;
        });
        info!("session credentials stored");
    }

    pub fn update_access_token(&self, token: String) {
        self.mutate(|s| s.access_token = Some(token));
        debug!("access token updated");
    }

    pub fn update_refresh_token(&self, token: String) {
        self.mutate(|s| s.refresh_token = Some(token));
        debug!("refresh token rotated");
    }

    /// Record the authenticated identity and re-derive the acting domain.
    ///
    /// Platform administrators default to the platform domain unless a
    /// non-platform domain is already active. Everyone else keeps an active
    /// non-platform domain or ends up with none.
    pub fn set_user(&self, user: UserInfo) {
        let domain = self.mutate(|s| {
            let resolved = resolve_domain_for(&user, s.acting_domain.as_ref());
            apply_acting_domain(s, resolved);
            s.user = Some(user);
            s.acting_domain.clone()
        });
        info!(acting_domain = ?domain, "identity loaded");
    }

    /// Wipe credentials, identity, domain scope and impersonation.
    /// The theme preference survives.
    pub fn clear(&self) {
        self.mutate(|s| {
            *s = Session { theme: s.theme, ..Session::default() };
        });
        info!("session cleared");
    }

    // ------------------------------------------------------------------
    // Scope actions
    // ------------------------------------------------------------------

    /// Change the acting domain. A different domain resets the selected
    /// project; an equal one (same type and key) leaves it alone.
    ///
    /// # Errors
    /// Returns `StewardError::Client` if the domain lacks a type or key.
    pub fn set_acting_domain(&self, domain: Option<DomainContext>) -> Result<()> {
        if let Some(d) = &domain {
            if !d.is_valid() {
                return Err(StewardError::Client {
                    status: 400,
                    message: "domain context requires a type and a key".to_string(),
                });
            }
        }

        let changed = self.mutate(|s| apply_acting_domain(s, domain));
        if changed {
            debug!("acting domain changed, project selection reset");
        }
        Ok(())
    }

    pub fn set_selected_project_id(&self, id: Option<String>) {
        self.mutate(|s| s.selected_project_id = id.filter(|id| !id.is_empty()));
    }

    pub fn set_theme(&self, theme: Theme) {
        self.mutate(|s| s.theme = theme);
    }

    // ------------------------------------------------------------------
    // Impersonation
    // ------------------------------------------------------------------

    /// Start an impersonation overlay, capturing the current acting domain
    /// as its source.
    ///
    /// # Errors
    /// Returns `StewardError::Client` if the token or target is empty or the
    /// expiry is not in the future.
    pub fn start_impersonation(&self, input: StartImpersonation) -> Result<ImpersonationSession> {
        let now = Utc::now();
        if input.token.is_empty() || input.target_tenant_id.is_empty() {
            return Err(StewardError::Client {
                status: 400,
                message: "impersonation requires a token and a target tenant".to_string(),
            });
        }
        if input.expires_at <= now {
            return Err(StewardError::Client {
                status: 400,
                message: "impersonation expiry must be in the future".to_string(),
            });
        }

        let session = self.mutate(|s| {
            let source = s.acting_domain.as_ref();
            let session = ImpersonationSession {
                token: input.token,
                target_tenant_id: input.target_tenant_id,
                expires_at: input.expires_at,
                reason: input.reason,
                duration_minutes: input.duration_minutes,
                source_domain_type: source.map(|d| d.domain_type.clone()),
                source_domain_key: source.map(|d| d.key.clone()),
                started_at: now,
            };
            s.impersonation = Some(session.clone());
            session
        });

        info!(
            target_tenant_id = %session.target_tenant_id,
            expires_at = %session.expires_at,
            "impersonation started"
        );
        Ok(session)
    }

    /// End the overlay, returning it if one was present
    pub fn stop_impersonation(&self) -> Option<ImpersonationSession> {
        let stopped = self.mutate(|s| s.impersonation.take());
        if let Some(session) = &stopped {
            info!(target_tenant_id = %session.target_tenant_id, "impersonation stopped");
        }
        stopped
    }

    /// Lazy-expiry read of the overlay. An expired overlay is cleared
    /// atomically by the first read that sees it.
    pub fn impersonation_status(&self) -> ImpersonationStatus {
        let now = Utc::now();
        {
            let state = self.state.read();
            match &state.impersonation {
                None => return ImpersonationStatus::Inactive,
                Some(session) if !session.is_expired_at(now) => {
                    return ImpersonationStatus::Active(session.clone());
                }
                Some(_) => {}
            }
        }

        let mut state = self.state.write();
        match state.impersonation.take() {
            None => ImpersonationStatus::Inactive,
            Some(session) if !session.is_expired_at(now) => {
                state.impersonation = Some(session.clone());
                ImpersonationStatus::Active(session)
            }
            Some(session) => {
                self.publish(&state);
                drop(state);
                warn!(target_tenant_id = %session.target_tenant_id, "impersonation lapsed");
                ImpersonationStatus::Lapsed(session)
            }
        }
    }

    /// The live overlay, or `None` if absent or expired
    pub fn get_impersonation_session(&self) -> Option<ImpersonationSession> {
        self.impersonation_status().active()
    }

    /// Time left on the overlay, for countdown displays
    pub fn impersonation_remaining(&self) -> Option<Duration> {
        self.get_impersonation_session().map(|s| s.remaining_at(Utc::now()))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn mutate<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut state = self.state.write();
        let previous = state.access_token.clone();
        let result = f(&mut state);
        if state.access_token != previous {
            self.generation.fetch_add(1, Ordering::AcqRel);
        }
        self.publish(&state);
        result
    }

    /// Persist and broadcast. Called with the write lock held so writes reach
    /// storage in mutation order.
    fn publish(&self, session: &Session) {
        if let Err(e) = self.storage.save(&PersistedSession::from(session)) {
            warn!(error = %e, "failed to persist session");
        }
        self.changes.send_replace(session.clone());
    }
}

/// Returns whether the scope changed
fn apply_acting_domain(session: &mut Session, domain: Option<DomainContext>) -> bool {
    let changed = !DomainContext::same_scope(session.acting_domain.as_ref(), domain.as_ref());
    session.acting_domain = domain;
    if changed {
        session.selected_project_id = None;
    }
    changed
}

fn resolve_domain_for(user: &UserInfo, current: Option<&DomainContext>) -> Option<DomainContext> {
    let active_tenant = current.filter(|d| d.is_valid() && !d.is_platform()).cloned();
    if user.is_platform_admin() {
        let platform = current
            .filter(|d| d.is_platform())
            .cloned()
            .unwrap_or_else(|| DomainContext::platform(DomainSource::Default));
        Some(active_tenant.unwrap_or(platform))
    } else {
        active_tenant
    }
}
