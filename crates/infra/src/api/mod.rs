//! Backend API access
//!
//! - `client`: the decorated request channel
//! - `auth`: sign-in, sign-out and identity endpoints
//! - `renewal`: the out-of-band credential renewal call

pub mod auth;
pub mod client;
pub mod renewal;

pub use client::{ApiClient, ApiClientBuilder, ApiClientConfig};
pub use renewal::RenewalClient;
