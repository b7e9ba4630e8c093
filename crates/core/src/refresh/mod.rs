//! Single-flight credential renewal

pub mod ports;
mod refresher;

pub use refresher::{RefreshQueueEntry, TokenRefresher, UnauthorizedRequest};
