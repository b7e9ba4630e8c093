//! # Steward Core
//!
//! Session and identity-context logic - no HTTP, no filesystem.
//!
//! This crate contains:
//! - The session store and its persistence schema
//! - Per-request context resolution (credential and domain scope)
//! - Single-flight token refresh coordination
//! - Response classification and list normalization
//! - Port interfaces (traits) implemented by `steward-infra`
//!
//! ## Architecture Principles
//! - Only depends on `steward-domain`
//! - All I/O via traits
//! - Shared state is owned by [`SessionStore`]; everything else reads and
//!   writes it through its action surface

pub mod notify;
pub mod refresh;
pub mod request;
pub mod response;
pub mod session;

// Re-export specific items to avoid ambiguity
pub use notify::{Navigator, Notice, Notifier};
pub use refresh::ports::CredentialRenewer;
pub use refresh::{RefreshQueueEntry, TokenRefresher, UnauthorizedRequest};
pub use request::{
    ApiRequest, DecoratedRequest, EffectiveIdentity, EndpointPolicy, Method,
    RequestContextResolver, RequestOptions,
};
pub use response::{
    business_status_for_code, normalize_list, ApiResponse, NormalizedList, PageDefaults,
    RawResponse, ResponseClassifier,
};
pub use session::memory::InMemorySessionStorage;
pub use session::persistence::{migrate, PersistedSession};
pub use session::ports::{AuthGateway, SessionStorage};
pub use session::{ImpersonationStatus, Session, SessionService, SessionStore};
