//! # Steward Domain
//!
//! Data types shared by the session layer.
//!
//! This crate contains:
//! - Domain context, identity and impersonation records
//! - Error types and Result definitions
//! - Configuration structures
//! - Header names and other constants
//!
//! ## Architecture
//! - No dependencies on other Steward crates
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
