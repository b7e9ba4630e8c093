//! Domain types and models
//!
//! Scope descriptors, identity and session records shared by every layer.

pub mod domain_context;
pub mod session;
pub mod user;

pub use domain_context::{DomainContext, DomainSource};
pub use session::{ImpersonationSession, StartImpersonation, Theme, TokenGrant};
pub use user::{LoginCredentials, SessionFragment, UserInfo};
