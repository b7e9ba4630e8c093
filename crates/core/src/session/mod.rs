//! Session state, persistence and network-backed session actions

pub mod memory;
pub mod persistence;
pub mod ports;
pub mod service;
pub mod store;

pub use service::SessionService;
pub use store::{ImpersonationStatus, Session, SessionStore};
