//! # Steward Infrastructure
//!
//! Infrastructure implementations of core session-layer ports.
//!
//! This crate contains:
//! - The decorated API client and the out-of-band renewal client
//! - The reqwest transport wrapper
//! - File-backed session storage
//! - Notice sinks and the route navigator
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `steward-core`
//! - Contains all "impure" code (network, filesystem, environment)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod navigation;
pub mod notify;
pub mod observability;
pub mod storage;

// Re-export commonly used items
pub use api::{ApiClient, ApiClientBuilder, ApiClientConfig, RenewalClient};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use navigation::RouteNavigator;
pub use notify::{ChannelNotifier, TracingNotifier};
pub use observability::{init_tracing, LogFormat};
pub use storage::FileSessionStorage;
